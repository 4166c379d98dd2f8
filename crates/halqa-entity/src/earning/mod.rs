//! Teacher earning entities.

pub mod model;

pub use model::{CreateTeacherEarning, TeacherEarning};
