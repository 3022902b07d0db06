// Simulated "peer is typing" indicator.
//
// Conversation screens use a one-shot burst (idle -> typing -> idle) that
// ends with a synthesized reply. The inbox uses an endless idle <-> typing
// loop per conversation purely for the preview.

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::time::Duration;

use super::session::{ConversationSession, SessionTimer};
use super::SessionEvent;
use crate::config::{LifecycleConfig, MIN_INTERVAL_MS};
use crate::error::ChatError;
use crate::models::{DeliveryStatus, Message};

const FALLBACK_REPLY: &str = "Thanks, got it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingMode {
    /// idle -> typing -> idle, then a reply is injected
    OneShot,
    /// idle <-> typing until disposed
    Looping { idle: Duration, typing: Duration },
}

impl TypingMode {
    pub fn looping(config: &LifecycleConfig) -> Self {
        TypingMode::Looping {
            idle: config.typing_idle(),
            typing: config.typing_duration(),
        }
    }

    /// Same mode with both loop phases at least one millisecond long.
    pub fn clamped(self) -> Self {
        let floor = Duration::from_millis(MIN_INTERVAL_MS);
        match self {
            TypingMode::OneShot => TypingMode::OneShot,
            TypingMode::Looping { idle, typing } => TypingMode::Looping {
                idle: idle.max(floor),
                typing: typing.max(floor),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypingPhase {
    #[default]
    Idle,
    Typing,
}

impl TypingPhase {
    pub fn toggled(self) -> Self {
        match self {
            TypingPhase::Idle => TypingPhase::Typing,
            TypingPhase::Typing => TypingPhase::Idle,
        }
    }
}

/// Per-conversation phases for the looping preview.
#[derive(Debug, Default)]
pub struct TypingLoop {
    phases: HashMap<String, TypingPhase>,
}

impl TypingLoop {
    pub fn toggle(&mut self, conversation_id: &str) -> TypingPhase {
        let phase = self.phases.entry(conversation_id.to_string()).or_default();
        *phase = phase.toggled();
        *phase
    }

    pub fn is_typing(&self, conversation_id: &str) -> bool {
        self.phases.get(conversation_id) == Some(&TypingPhase::Typing)
    }

    pub fn clear(&mut self, conversation_id: &str) {
        self.phases.remove(conversation_id);
    }

    pub fn clear_all(&mut self) {
        self.phases.clear();
    }
}

/// Chooses canned peer replies. Seeded for reproducible runs.
pub struct ReplyPicker {
    replies: Vec<String>,
    rng: StdRng,
}

impl ReplyPicker {
    pub fn new(replies: Vec<String>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        ReplyPicker { replies, rng }
    }

    pub fn pick(&mut self) -> String {
        if self.replies.is_empty() {
            return FALLBACK_REPLY.to_string();
        }
        let idx = self.rng.gen_range(0..self.replies.len());
        self.replies[idx].clone()
    }
}

impl ConversationSession {
    /// Switch how the peer's typing indicator behaves on this screen.
    /// Looping starts its first burst after one idle gap; a pending reply is kept.
    pub fn with_typing_mode(mut self, mode: TypingMode) -> Self {
        let mode = mode.clamped();
        self.typing_mode = mode;
        if self.ensure_live().is_err() {
            return self;
        }
        if let TypingMode::Looping { idle, .. } = mode {
            let reply = self.pending_reply();
            self.timers
                .cancel_where(|t| matches!(t, SessionTimer::TypingStart { .. } | SessionTimer::TypingStop { .. }));
            if self.typing {
                self.typing = false;
                self.publish(SessionEvent::TypingChanged(false));
            }
            let now = self.now();
            self.timers.schedule_after(now, idle, SessionTimer::TypingStart { reply });
        }
        self
    }

    pub fn typing_mode(&self) -> TypingMode {
        self.typing_mode
    }

    fn pending_reply(&self) -> bool {
        self.timers.iter().any(|t| {
            matches!(t, SessionTimer::TypingStart { reply: true } | SessionTimer::TypingStop { reply: true })
        })
    }

    /// Queue a typing burst. A burst already queued or running absorbs the
    /// request; if the request carries a reply, that burst now ends with one.
    pub(super) fn schedule_typing(&mut self, from: DateTime<Utc>, reply: bool) {
        let mut pending = false;
        for timer in self.timers.iter_mut() {
            if let SessionTimer::TypingStart { reply: queued } | SessionTimer::TypingStop { reply: queued } = timer {
                pending = true;
                *queued |= reply;
            }
        }
        if self.typing || pending {
            debug!("Typing burst already pending in {} (reply: {})", self.conversation.id, reply);
            return;
        }
        let delay = self.config.typing_delay();
        self.timers.schedule_after(from, delay, SessionTimer::TypingStart { reply });
    }

    pub(super) fn start_typing(&mut self, reply: bool, due: DateTime<Utc>) {
        self.typing = true;
        debug!("{} is typing", self.conversation.participant.name);
        self.publish(SessionEvent::TypingChanged(true));
        let duration = match self.typing_mode {
            TypingMode::OneShot => self.config.typing_duration(),
            TypingMode::Looping { typing, .. } => typing,
        };
        self.timers.schedule_after(due, duration, SessionTimer::TypingStop { reply });
    }

    pub(super) fn stop_typing(&mut self, reply: bool, due: DateTime<Utc>) {
        if self.typing {
            self.typing = false;
            self.publish(SessionEvent::TypingChanged(false));
        }
        if reply {
            let body = self.replies.pick();
            let message = Message::incoming(body, DeliveryStatus::Sent, due);
            info!("Injecting reply {} from {}", message.id, self.conversation.participant.name);
            self.deliver_inbound(message);
        }
        if let TypingMode::Looping { idle, .. } = self.typing_mode {
            self.timers.schedule_after(due, idle, SessionTimer::TypingStart { reply: false });
        }
    }

    /// Accept a message from the peer. Any typing burst in progress ends.
    pub fn receive_peer_message(&mut self, body: &str) -> Result<String, ChatError> {
        self.ensure_live()?;
        if body.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.timers
            .cancel_where(|t| matches!(t, SessionTimer::TypingStart { .. } | SessionTimer::TypingStop { .. }));
        if self.typing {
            self.typing = false;
            self.publish(SessionEvent::TypingChanged(false));
        }
        let now = self.now();
        if let TypingMode::Looping { idle, .. } = self.typing_mode {
            self.timers.schedule_after(now, idle, SessionTimer::TypingStart { reply: false });
        }
        let message = Message::incoming(body.trim(), DeliveryStatus::Sent, now);
        Ok(self.deliver_inbound(message))
    }

    /// The conversation is on screen, so inbound messages arrive already seen.
    fn deliver_inbound(&mut self, message: Message) -> String {
        let id = message.id.clone();
        self.conversation.push(message.clone());
        self.publish(SessionEvent::MessageAdded(message));
        id
    }
}
