use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ChatError;

/// Text shown in place of a masked message until the user reveals it.
pub const MASKED_PLACEHOLDER: &str = "Sensitive message. Tap to reveal.";

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Sending = 1,   // Message is being sent
    Sent = 2,      // Accepted by the (simulated) server
    Delivered = 3, // Delivered to recipient's device
    Read = 4,      // Read by recipient
}

impl DeliveryStatus {
    /// The status that follows this one, or `None` once a message is read.
    pub fn next(self) -> Option<DeliveryStatus> {
        match self {
            DeliveryStatus::Sending => Some(DeliveryStatus::Sent),
            DeliveryStatus::Sent => Some(DeliveryStatus::Delivered),
            DeliveryStatus::Delivered => Some(DeliveryStatus::Read),
            DeliveryStatus::Read => None,
        }
    }

    /// Transitions only ever move forward.
    pub fn can_advance_to(self, to: DeliveryStatus) -> bool {
        to > self
    }

    /// Status as presented to the user. With read receipts hidden a read
    /// message still shows as delivered; the underlying state is untouched.
    pub fn display(self, show_read_status: bool) -> DeliveryStatus {
        if self == DeliveryStatus::Read && !show_read_status {
            DeliveryStatus::Delivered
        } else {
            self
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Sender {
    Me,
    Peer,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum AttachmentKind {
    Photo,
    Camera,
    Document,
    Location,
}

impl AttachmentKind {
    /// Whether picking this kind of attachment needs camera or media library access.
    pub fn requires_media_access(self) -> bool {
        matches!(self, AttachmentKind::Photo | AttachmentKind::Camera)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceClip {
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub body: String,
    pub sender: Sender,
    pub created_at: DateTime<Utc>,
    pub status: DeliveryStatus,
    pub attachment: Option<Attachment>,
    pub voice: Option<VoiceClip>,
    pub masked: bool,
    pub revealed: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Message {}

impl Message {
    /// A message typed by the local user. Always starts out as `Sending`.
    pub fn outgoing(body: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::build(body.into(), Sender::Me, DeliveryStatus::Sending, now)
    }

    /// A synthesized or historical peer message with a fixed status.
    pub fn incoming(body: impl Into<String>, status: DeliveryStatus, now: DateTime<Utc>) -> Self {
        Self::build(body.into(), Sender::Peer, status, now)
    }

    fn build(body: String, sender: Sender, status: DeliveryStatus, now: DateTime<Utc>) -> Self {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            body,
            sender,
            created_at: now,
            status,
            attachment: None,
            voice: None,
            masked: false,
            revealed: false,
            expires_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_status(mut self, status: DeliveryStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_voice(mut self, duration: Duration) -> Self {
        self.voice = Some(VoiceClip { duration });
        self
    }

    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Move the message forward to `to`. Backward or repeated transitions are rejected.
    pub fn advance_to(&mut self, to: DeliveryStatus) -> Result<(), ChatError> {
        if !self.status.can_advance_to(to) {
            return Err(ChatError::IllegalTransition {
                id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }

    /// Outgoing messages that have not reached `Read` still have simulated delivery ahead.
    pub fn needs_simulation(&self) -> bool {
        self.sender == Sender::Me && self.status != DeliveryStatus::Read
    }

    pub fn display_body(&self) -> &str {
        if self.masked && !self.revealed {
            MASKED_PLACEHOLDER
        } else {
            &self.body
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Presence {
    Online,
    Offline { last_seen: Option<DateTime<Utc>> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub avatar: Option<String>,
    pub presence: Presence,
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Participant {
            name: name.into(),
            avatar: None,
            presence: Presence::Offline { last_seen: None },
        }
    }

    pub fn is_online(&self) -> bool {
        self.presence == Presence::Online
    }
}

/// The property a conversation is about (a unit, a building).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant: Participant,
    pub messages: Vec<Message>,
    pub unread: u32,
    pub property: Option<PropertyRef>,
    pub last_activity: DateTime<Utc>,
}

impl Conversation {
    pub fn new(participant: Participant, property: Option<PropertyRef>, now: DateTime<Utc>) -> Self {
        Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            participant,
            messages: Vec::new(),
            unread: 0,
            property,
            last_activity: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Append in chronological order. A message whose id is already present is ignored.
    pub fn push(&mut self, message: Message) -> bool {
        if self.message(&message.id).is_some() {
            return false;
        }
        if message.created_at > self.last_activity {
            self.last_activity = message.created_at;
        }
        self.messages.push(message);
        true
    }

    pub fn remove_message(&mut self, id: &str) -> Option<Message> {
        let idx = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(idx))
    }

    pub fn mark_read(&mut self) {
        self.unread = 0;
    }

    pub fn property_name(&self) -> Option<&str> {
        self.property.as_ref().map(|p| p.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Rejected,
    PermissionDenied,
    Info,
}

/// A transient, user-facing notice (toast or alert).
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn rejected(text: impl Into<String>) -> Self {
        Notice { kind: NoticeKind::Rejected, text: text.into() }
    }

    pub fn permission_denied(text: impl Into<String>) -> Self {
        Notice { kind: NoticeKind::PermissionDenied, text: text.into() }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Notice { kind: NoticeKind::Info, text: text.into() }
    }
}
