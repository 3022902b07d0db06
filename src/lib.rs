// Re-export needed modules for testing
pub mod chat; // Message lifecycle: delivery, typing, expiry, inbox
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod runtime;
pub mod seed;
pub mod timers;

// Re-export main types for convenience
pub use chat::{ConversationSession, Inbox, SessionEvent};
pub use config::LifecycleConfig;
pub use error::ChatError;
pub use models::*;
