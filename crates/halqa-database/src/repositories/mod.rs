//! PostgreSQL repository implementations of the store traits.

pub mod attendance_event;
pub mod earning;
pub mod job;
pub mod meeting_attendance;
pub mod report;
pub mod session;
pub mod user;

pub use attendance_event::AttendanceEventRepository;
pub use earning::EarningRepository;
pub use job::JobRepository;
pub use meeting_attendance::MeetingAttendanceRepository;
pub use report::ReportRepository;
pub use session::SessionRepository;
pub use user::UserRepository;
