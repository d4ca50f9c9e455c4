pub mod assessments;
pub mod classes;
pub mod exams;
pub mod health;
pub mod progress;
pub mod timers;
