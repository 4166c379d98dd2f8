//! Attendance telemetry and verdict entities.

pub mod event;
pub mod meeting;
pub mod status;

pub use event::{AttendanceEvent, CreateAttendanceEvent};
pub use meeting::{AttendanceVerdict, JoinLeaveCycle, MeetingAttendance};
pub use status::{AttendanceOperation, AttendanceStatus, EventType, ParticipantRole};
