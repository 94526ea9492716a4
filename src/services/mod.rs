pub mod dispatch;
pub mod health_service;
pub mod message_service;
pub mod submission_handler;
