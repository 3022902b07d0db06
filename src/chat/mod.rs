// Message lifecycle module
// Everything a chat screen needs between "user pressed send" and "peer read it",
// split by concern the same way the screens use it.

pub mod delivery;
pub mod expiry;
pub mod inbox;
pub mod media;
pub mod projection;
pub mod session;
pub mod typing;

pub use expiry::ExpiryHorizon;
pub use inbox::Inbox;
pub use media::MediaPermissions;
pub use projection::{filter_conversations, sort_by_recency};
pub use session::ConversationSession;
pub use typing::TypingMode;

use crate::models::{DeliveryStatus, Message, Notice};

/// Everything a renderer needs to observe. Emitted in the order the
/// underlying state changed.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MessageAdded(Message),
    StatusChanged { id: String, status: DeliveryStatus },
    MessageUpdated(Message),
    MessageRemoved { id: String },
    TypingChanged(bool),
    Notice(Notice),
    Disposed,
}
