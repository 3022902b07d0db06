// ConversationSession: the state owner for one open conversation.
//
// All simulated latency lives in the session's own timer queue. Handlers
// look messages up by id when they fire, so several messages can be in
// flight at once without lost updates, and `dispose` drops every pending
// timer in one place.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::media::{MediaPermissions, Recording};
use super::typing::{ReplyPicker, TypingMode};
use super::SessionEvent;
use crate::clock::Clock;
use crate::config::LifecycleConfig;
use crate::error::ChatError;
use crate::models::{Conversation, DeliveryStatus, Message, Notice};
use crate::timers::{Fired, TimerQueue};

/// Work the session has scheduled for later.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SessionTimer {
    Advance { message_id: String, to: DeliveryStatus },
    TypingStart { reply: bool },
    TypingStop { reply: bool },
    ExpirySweep,
}

impl SessionTimer {
    fn concerns_message(&self, id: &str) -> bool {
        matches!(self, SessionTimer::Advance { message_id, .. } if message_id == id)
    }
}

pub struct ConversationSession {
    pub(super) conversation: Conversation,
    pub(super) config: LifecycleConfig,
    clock: Arc<dyn Clock>,
    pub(super) timers: TimerQueue<SessionTimer>,
    events: mpsc::UnboundedSender<SessionEvent>,
    pub(super) typing: bool,
    pub(super) typing_mode: TypingMode,
    pub(super) recording: Option<Recording>,
    pub(super) permissions: MediaPermissions,
    pub(super) replies: ReplyPicker,
    disposed: bool,
}

impl ConversationSession {
    /// Mount a session over `conversation`. Outgoing history that has not
    /// reached `Read` picks its delivery simulation back up; read history is
    /// left alone.
    pub fn new(
        conversation: Conversation,
        config: LifecycleConfig,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, event_rx) = mpsc::unbounded_channel();
        if let Err(e) = config.validate() {
            warn!("Conversation {} mounted with a questionable config: {}", conversation.id, e);
        }
        let replies = ReplyPicker::new(config.replies.clone(), config.reply_seed);

        let mut session = ConversationSession {
            conversation,
            config,
            clock,
            timers: TimerQueue::new(),
            events,
            typing: false,
            typing_mode: TypingMode::OneShot,
            recording: None,
            permissions: MediaPermissions::default(),
            replies,
            disposed: false,
        };

        info!(
            "Mounted conversation {} with {} ({} messages)",
            session.conversation.id,
            session.conversation.participant.name,
            session.conversation.messages.len()
        );

        let in_flight: Vec<String> = session
            .conversation
            .messages
            .iter()
            .filter(|m| m.needs_simulation())
            .map(|m| m.id.clone())
            .collect();
        for id in in_flight {
            debug!("Resuming delivery simulation for {}", id);
            if let Err(e) = session.simulate_delivery(&id) {
                warn!("Could not resume delivery for {}: {}", id, e);
            }
        }

        let now = session.now();
        session.arm_expiry_sweep(now);
        if session.config.typing_on_mount {
            session.schedule_typing(now, false);
        }

        (session, event_rx)
    }

    pub fn with_permissions(mut self, permissions: MediaPermissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        &self.conversation.messages
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.conversation.message(id)
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        if self.disposed {
            return None;
        }
        self.timers.next_due()
    }

    /// Status of a message as the user should see it, honouring `show_read_status`.
    pub fn displayed_status(&self, id: &str) -> Option<DeliveryStatus> {
        self.message(id).map(|m| m.status.display(self.config.show_read_status))
    }

    /// Send a text message. Blank input is rejected with a notice.
    pub fn send_text(&mut self, body: &str) -> Result<String, ChatError> {
        self.send_prepared(body, |m| m)
    }

    /// Send text that renders as a placeholder until revealed.
    pub fn send_masked_text(&mut self, body: &str) -> Result<String, ChatError> {
        self.send_prepared(body, |m| m.masked())
    }

    pub(super) fn send_prepared(
        &mut self,
        body: &str,
        prepare: impl FnOnce(Message) -> Message,
    ) -> Result<String, ChatError> {
        self.ensure_live()?;
        if body.trim().is_empty() {
            warn!("Rejected empty message in {}", self.conversation.id);
            self.notify(Notice::rejected("Type a message before sending."));
            return Err(ChatError::EmptyMessage);
        }
        let message = prepare(Message::outgoing(body.trim(), self.now()));
        Ok(self.insert_outgoing(message))
    }

    /// Append a locally created message and start simulating its delivery.
    pub(super) fn insert_outgoing(&mut self, message: Message) -> String {
        let id = message.id.clone();
        info!("Queued message {} in conversation {}", id, self.conversation.id);
        self.conversation.push(message.clone());
        self.publish(SessionEvent::MessageAdded(message));
        if let Err(e) = self.simulate_delivery(&id) {
            warn!("Could not start delivery for {}: {}", id, e);
        }
        id
    }

    /// Reveal a masked message. Revealing an unmasked message is a no-op.
    pub fn reveal(&mut self, id: &str) -> Result<(), ChatError> {
        self.ensure_live()?;
        let message = self
            .conversation
            .message_mut(id)
            .ok_or_else(|| ChatError::UnknownMessage(id.to_string()))?;
        if message.masked && !message.revealed {
            message.revealed = true;
            let updated = message.clone();
            debug!("Revealed masked message {}", id);
            self.publish(SessionEvent::MessageUpdated(updated));
        }
        Ok(())
    }

    pub fn mark_read(&mut self) {
        if self.conversation.unread > 0 {
            debug!("Marking {} unread message(s) read in {}", self.conversation.unread, self.conversation.id);
        }
        self.conversation.mark_read();
    }

    /// Delete a message and any simulation still pending for it.
    pub fn delete_message(&mut self, id: &str) -> Result<Message, ChatError> {
        self.ensure_live()?;
        let removed = self
            .conversation
            .remove_message(id)
            .ok_or_else(|| ChatError::UnknownMessage(id.to_string()))?;
        let cancelled = self.cancel_message_timers(id);
        debug!("Deleted message {} ({} pending timers cancelled)", id, cancelled);
        self.publish(SessionEvent::MessageRemoved { id: id.to_string() });
        Ok(removed)
    }

    /// Fire everything that is due at the clock's current time.
    /// Returns how many timers fired.
    pub fn tick(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        let now = self.now();
        let mut fired = 0;
        while let Some(Fired { due, event }) = self.timers.pop_due(now) {
            fired += 1;
            self.fire(event, due, now);
            if self.disposed {
                break;
            }
        }
        fired
    }

    fn fire(&mut self, event: SessionTimer, due: DateTime<Utc>, now: DateTime<Utc>) {
        match event {
            SessionTimer::Advance { message_id, to } => self.apply_transition(&message_id, to, due),
            SessionTimer::TypingStart { reply } => self.start_typing(reply, due),
            SessionTimer::TypingStop { reply } => self.stop_typing(reply, due),
            SessionTimer::ExpirySweep => {
                self.sweep_at(now);
                self.arm_expiry_sweep(now);
            }
        }
    }

    /// Unmount: cancel every outstanding timer and clear transient state.
    /// Idempotent. Nothing observable changes after this returns.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let pending = self.timers.len();
        self.timers.clear();
        self.recording = None;
        if self.typing {
            self.typing = false;
            self.publish(SessionEvent::TypingChanged(false));
        }
        self.disposed = true;
        self.publish(SessionEvent::Disposed);
        info!("Disposed conversation {} ({} pending timers cancelled)", self.conversation.id, pending);
    }

    /// Dispose and hand back the conversation state.
    pub fn into_conversation(mut self) -> Conversation {
        self.dispose();
        self.conversation.clone()
    }

    pub(super) fn cancel_message_timers(&mut self, id: &str) -> usize {
        self.timers.cancel_where(|t| t.concerns_message(id))
    }

    pub(super) fn ensure_live(&self) -> Result<(), ChatError> {
        if self.disposed {
            Err(ChatError::SessionDisposed)
        } else {
            Ok(())
        }
    }

    pub(super) fn notify(&self, notice: Notice) {
        self.publish(SessionEvent::Notice(notice));
    }

    pub(super) fn publish(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("No observer for conversation {} events", self.conversation.id);
        }
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
