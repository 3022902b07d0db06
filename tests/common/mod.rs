// Common test utilities for integration tests
// Shared session builders, virtual-time helpers and event draining

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use log::LevelFilter;
use tokio::sync::mpsc::UnboundedReceiver;

use tenantline::chat::{ConversationSession, SessionEvent};
use tenantline::clock::{Clock, ManualClock};
use tenantline::config::LifecycleConfig;
use tenantline::models::{Conversation, DeliveryStatus, Participant, PropertyRef};

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// Default delays, fixed reply seed, no auto reply
pub fn quiet_config() -> LifecycleConfig {
    LifecycleConfig {
        auto_reply: false,
        reply_seed: Some(42),
        ..LifecycleConfig::default()
    }
}

/// Default delays with the auto reply enabled
pub fn chatty_config() -> LifecycleConfig {
    LifecycleConfig {
        auto_reply: true,
        reply_seed: Some(42),
        ..LifecycleConfig::default()
    }
}

/// A session over an empty conversation, driven by a manual clock
pub struct TestSession {
    pub session: ConversationSession,
    pub events: UnboundedReceiver<SessionEvent>,
    pub clock: Arc<ManualClock>,
}

impl TestSession {
    pub fn new(config: LifecycleConfig) -> Self {
        let clock = Arc::new(ManualClock::default());
        Self::with_conversation(empty_conversation(clock.now()), config, clock)
    }

    pub fn with_conversation(conversation: Conversation, config: LifecycleConfig, clock: Arc<ManualClock>) -> Self {
        setup_logging();
        let (session, events) = ConversationSession::new(conversation, config, clock.clone());
        TestSession { session, events, clock }
    }

    /// Move virtual time forward and fire whatever became due
    pub fn advance(&mut self, by: Duration) -> usize {
        self.clock.advance(by);
        self.session.tick()
    }

    pub fn advance_ms(&mut self, ms: u64) -> usize {
        self.advance(Duration::from_millis(ms))
    }

    pub fn status_of(&self, id: &str) -> Option<DeliveryStatus> {
        self.session.message(id).map(|m| m.status)
    }

    pub fn drain(&mut self) -> Vec<SessionEvent> {
        drain(&mut self.events)
    }
}

pub fn empty_conversation(now: chrono::DateTime<chrono::Utc>) -> Conversation {
    Conversation::new(
        Participant::new("Sarah Johnson"),
        Some(PropertyRef { id: "prop-1".to_string(), name: "Sunset Apartments 4B".to_string() }),
        now,
    )
    .with_id("conv-test")
}

pub fn drain(rx: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

/// Status hops observed for one message, in order
pub fn hops_for(events: &[SessionEvent], message_id: &str) -> Vec<DeliveryStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::StatusChanged { id, status } if id == message_id => Some(*status),
            _ => None,
        })
        .collect()
}
