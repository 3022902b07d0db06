use std::time::Duration;

use thiserror::Error;

use crate::models::{AttachmentKind, DeliveryStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Recording too short: held {held:?}, need at least {min:?}")]
    RecordingTooShort { held: Duration, min: Duration },

    #[error("No recording in progress")]
    NoRecording,

    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("Permission denied for {0:?} attachments")]
    PermissionDenied(AttachmentKind),

    #[error("Unknown message: {0}")]
    UnknownMessage(String),

    #[error("Unknown conversation: {0}")]
    UnknownConversation(String),

    #[error("Illegal transition for message {id}: {from:?} -> {to:?}")]
    IllegalTransition {
        id: String,
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    #[error("Session has been disposed")]
    SessionDisposed,
}

impl ChatError {
    /// Errors caused by user input that are surfaced as a transient notice.
    pub fn is_user_rejection(&self) -> bool {
        matches!(
            self,
            ChatError::EmptyMessage
                | ChatError::RecordingTooShort { .. }
                | ChatError::NoRecording
                | ChatError::AlreadyRecording
                | ChatError::PermissionDenied(_)
        )
    }
}
