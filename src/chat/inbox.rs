// The conversation list screen. Owns every conversation while it is not
// open, runs the looping typing preview, and hands one conversation at a
// time to a ConversationSession.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::projection::{filter_conversations, sort_by_recency, total_unread};
use super::session::ConversationSession;
use super::typing::{TypingLoop, TypingMode, TypingPhase};
use super::SessionEvent;
use crate::clock::Clock;
use crate::config::LifecycleConfig;
use crate::error::ChatError;
use crate::models::{Conversation, Participant, PropertyRef};
use crate::timers::{Fired, TimerId, TimerQueue};

#[derive(Debug, Clone, PartialEq)]
enum InboxTimer {
    TypingToggle { conversation_id: String },
}

pub struct Inbox {
    conversations: Vec<Conversation>,
    config: LifecycleConfig,
    clock: Arc<dyn Clock>,
    mode: Option<TypingMode>,
    timers: TimerQueue<InboxTimer>,
    /// The one pending preview toggle per conversation.
    preview_timers: HashMap<String, TimerId>,
    typing: TypingLoop,
    active: Option<ConversationSession>,
    disposed: bool,
}

impl Inbox {
    pub fn new(mut conversations: Vec<Conversation>, config: LifecycleConfig, clock: Arc<dyn Clock>) -> Self {
        if let Err(e) = config.validate() {
            warn!("Inbox loaded with a questionable config: {}", e);
        }
        sort_by_recency(&mut conversations);
        let mode = if config.inbox_typing_preview {
            Some(TypingMode::looping(&config).clamped())
        } else {
            None
        };

        let mut inbox = Inbox {
            conversations,
            config,
            clock,
            mode,
            timers: TimerQueue::new(),
            preview_timers: HashMap::new(),
            typing: TypingLoop::default(),
            active: None,
            disposed: false,
        };

        let ids: Vec<String> = inbox.conversations.iter().map(|c| c.id.clone()).collect();
        for id in &ids {
            inbox.arm_preview(id);
        }
        info!("Inbox loaded with {} conversations", inbox.conversations.len());
        inbox
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Conversations matching `query`, in display order.
    pub fn search(&self, query: &str) -> Vec<&Conversation> {
        filter_conversations(&self.conversations, query)
    }

    pub fn unread_total(&self) -> u32 {
        total_unread(&self.conversations)
    }

    /// Whether the list preview currently shows `id` as typing.
    pub fn is_typing(&self, id: &str) -> bool {
        self.typing.is_typing(id)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn active(&self) -> Option<&ConversationSession> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ConversationSession> {
        self.active.as_mut()
    }

    /// Start a brand-new conversation, placed at the top of the list.
    pub fn start_conversation(
        &mut self,
        participant: Participant,
        property: Option<PropertyRef>,
    ) -> Result<String, ChatError> {
        if self.disposed {
            return Err(ChatError::SessionDisposed);
        }
        let conversation = Conversation::new(participant, property, self.now());
        let id = conversation.id.clone();
        info!("Started conversation {} with {}", id, conversation.participant.name);
        self.conversations.insert(0, conversation);
        self.arm_preview(&id);
        Ok(id)
    }

    /// Open a conversation. Any conversation already open is disposed first.
    pub fn open(&mut self, id: &str) -> Result<mpsc::UnboundedReceiver<SessionEvent>, ChatError> {
        if self.disposed {
            return Err(ChatError::SessionDisposed);
        }
        if self.conversation(id).is_none() {
            return Err(ChatError::UnknownConversation(id.to_string()));
        }
        self.close_active();
        let conversation = self
            .conversation(id)
            .cloned()
            .ok_or_else(|| ChatError::UnknownConversation(id.to_string()))?;

        self.pause_preview(id);
        let (mut session, events) = ConversationSession::new(conversation, self.config.clone(), self.clock.clone());
        session.mark_read();
        self.active = Some(session);
        self.sync_active();
        Ok(events)
    }

    /// Dispose the open conversation and fold its state back into the list.
    pub fn close_active(&mut self) -> Option<String> {
        let session = self.active.take()?;
        let conversation = session.into_conversation();
        let id = conversation.id.clone();
        self.write_back(conversation);
        self.arm_preview(&id);
        debug!("Closed conversation {}", id);
        Some(id)
    }

    /// Copy the open conversation's latest state into the list.
    pub fn sync_active(&mut self) {
        if let Some(conversation) = self.active.as_ref().map(|s| s.conversation().clone()) {
            self.write_back(conversation);
        }
    }

    fn write_back(&mut self, conversation: Conversation) {
        if let Some(slot) = self.conversations.iter_mut().find(|c| c.id == conversation.id) {
            *slot = conversation;
        }
    }

    pub fn tick(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        let now = self.now();
        let mut fired = 0;
        while let Some(Fired { due, event }) = self.timers.pop_due(now) {
            fired += 1;
            match event {
                InboxTimer::TypingToggle { conversation_id } => self.toggle_preview(&conversation_id, due),
            }
        }
        if let Some(session) = self.active.as_mut() {
            fired += session.tick();
        }
        self.sync_active();
        fired
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        if self.disposed {
            return None;
        }
        let own = self.timers.next_due();
        let active = self.active.as_ref().and_then(|s| s.next_due());
        match (own, active) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Cancel the preview loop and close the open conversation.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.close_active();
        let pending = self.timers.len();
        self.timers.clear();
        self.preview_timers.clear();
        self.typing.clear_all();
        self.disposed = true;
        info!("Inbox disposed ({} pending timers cancelled)", pending);
    }

    fn arm_preview(&mut self, id: &str) {
        if let Some(TypingMode::Looping { idle, .. }) = self.mode {
            let now = self.now();
            self.schedule_toggle(id, now, idle);
        }
    }

    fn pause_preview(&mut self, id: &str) {
        if let Some(timer) = self.preview_timers.remove(id) {
            self.timers.cancel(timer);
        }
        self.typing.clear(id);
    }

    fn schedule_toggle(&mut self, id: &str, from: DateTime<Utc>, delay: Duration) {
        let timer = self
            .timers
            .schedule_after(from, delay, InboxTimer::TypingToggle { conversation_id: id.to_string() });
        if let Some(previous) = self.preview_timers.insert(id.to_string(), timer) {
            self.timers.cancel(previous);
        }
    }

    fn toggle_preview(&mut self, id: &str, due: DateTime<Utc>) {
        let Some(TypingMode::Looping { idle, typing }) = self.mode else {
            return;
        };
        if self.conversation(id).is_none() {
            self.preview_timers.remove(id);
            self.typing.clear(id);
            return;
        }
        let phase = self.typing.toggle(id);
        let next = match phase {
            TypingPhase::Typing => typing,
            TypingPhase::Idle => idle,
        };
        self.schedule_toggle(id, due, next);
    }
}

impl Drop for Inbox {
    fn drop(&mut self) {
        self.dispose();
    }
}
