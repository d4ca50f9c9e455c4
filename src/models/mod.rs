pub mod class;
pub mod class_timer;
pub mod exam;
pub mod notification_log;
pub mod progress;
pub mod submission;
