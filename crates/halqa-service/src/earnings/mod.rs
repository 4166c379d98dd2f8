//! Teacher earnings for completed sessions.

pub mod calculator;
pub mod service;

pub use calculator::{EarningsCalculator, FlatRateEarningsCalculator};
pub use service::{EarningsOutcome, EarningsService, EarningsSweepSummary};
