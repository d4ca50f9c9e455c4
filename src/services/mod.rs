pub mod notification_service;
pub mod progression_service;
pub mod scoring_service;
pub mod timer_service;
pub mod unlock_service;
