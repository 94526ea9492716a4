pub mod database;
pub mod memory;
pub mod message_store;

pub use message_store::MessageRepository;
