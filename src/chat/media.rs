// Voice clips and attachments.

use chrono::{DateTime, Utc};
use log::{info, warn};
use std::time::Duration;

use super::session::ConversationSession;
use crate::error::ChatError;
use crate::models::{Attachment, AttachmentKind, Message, Notice};

/// Camera and media-library access as granted by the platform.
/// A refusal is terminal for the session; it is never re-requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaPermissions {
    pub camera: bool,
    pub media_library: bool,
}

impl Default for MediaPermissions {
    fn default() -> Self {
        MediaPermissions { camera: true, media_library: true }
    }
}

impl MediaPermissions {
    pub fn denied() -> Self {
        MediaPermissions { camera: false, media_library: false }
    }

    pub fn allows(&self, kind: AttachmentKind) -> bool {
        match kind {
            AttachmentKind::Camera => self.camera,
            AttachmentKind::Photo => self.media_library,
            AttachmentKind::Document | AttachmentKind::Location => true,
        }
    }
}

/// A voice recording in progress.
#[derive(Debug, Clone, Copy)]
pub struct Recording {
    pub started_at: DateTime<Utc>,
}

impl Recording {
    pub fn held(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).to_std().unwrap_or(Duration::ZERO)
    }
}

impl ConversationSession {
    pub fn start_recording(&mut self) -> Result<(), ChatError> {
        self.ensure_live()?;
        if self.recording.is_some() {
            return Err(ChatError::AlreadyRecording);
        }
        self.recording = Some(Recording { started_at: self.now() });
        info!("Voice recording started in {}", self.conversation.id);
        Ok(())
    }

    /// Finish the recording. Clips shorter than the configured minimum are
    /// discarded with a notice; otherwise a voice message is sent.
    pub fn stop_recording(&mut self) -> Result<String, ChatError> {
        self.ensure_live()?;
        let recording = self.recording.take().ok_or(ChatError::NoRecording)?;
        let held = recording.held(self.now());
        let min = self.config.min_recording();

        if held < min {
            warn!("Discarding voice clip of {:?} (minimum {:?})", held, min);
            self.notify(Notice::rejected("Recording too short. Hold to record."));
            return Err(ChatError::RecordingTooShort { held, min });
        }

        let message = Message::outgoing("", self.now()).with_voice(held);
        Ok(self.insert_outgoing(message))
    }

    /// Abandon the recording without sending anything.
    pub fn cancel_recording(&mut self) -> bool {
        self.recording.take().is_some()
    }

    /// Send an attachment. Picking from the camera or library needs the matching permission.
    pub fn send_attachment(&mut self, kind: AttachmentKind, name: &str) -> Result<String, ChatError> {
        self.ensure_live()?;
        if !self.permissions.allows(kind) {
            warn!("{:?} attachment blocked: permission denied", kind);
            self.notify(Notice::permission_denied(format!(
                "Allow {} access in Settings to share {:?} attachments.",
                if kind == AttachmentKind::Camera { "camera" } else { "photo library" },
                kind
            )));
            return Err(ChatError::PermissionDenied(kind));
        }

        let message = Message::outgoing("", self.now()).with_attachment(Attachment {
            kind,
            name: name.to_string(),
        });
        Ok(self.insert_outgoing(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_gate_only_media_kinds() {
        let denied = MediaPermissions::denied();
        assert!(!denied.allows(AttachmentKind::Camera));
        assert!(!denied.allows(AttachmentKind::Photo));
        assert!(denied.allows(AttachmentKind::Document));
        assert!(denied.allows(AttachmentKind::Location));
        assert!(MediaPermissions::default().allows(AttachmentKind::Camera));
    }

    #[test]
    fn test_recording_held_never_negative() {
        let now = Utc::now();
        let recording = Recording { started_at: now };
        assert_eq!(recording.held(now - chrono::Duration::seconds(1)), Duration::ZERO);
        assert_eq!(recording.held(now + chrono::Duration::seconds(2)), Duration::from_secs(2));
    }
}
