//! Join/leave recording and its retry path.

pub mod recorder;
pub mod retry;

pub use recorder::{AttendanceRecorder, MeetingAttendanceRecorder};
pub use retry::{RecordingError, RecordingRetryScheduler, RecordingRetryService};
