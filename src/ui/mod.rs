/// Presentation helpers: palette, status line and the activity log

pub mod activity;
pub mod style;

pub use activity::ActivityLog;
pub use style::Status;
