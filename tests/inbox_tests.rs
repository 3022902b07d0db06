// Inbox tests
// Conversation list projection, switching conversations and the looping typing preview

mod common;
use common::{quiet_config, setup_logging};

use std::sync::Arc;
use std::time::Duration;

use tenantline::chat::{filter_conversations, Inbox, SessionEvent};
use tenantline::clock::{Clock, ManualClock};
use tenantline::config::LifecycleConfig;
use tenantline::error::ChatError;
use tenantline::models::{DeliveryStatus, Participant, PropertyRef};
use tenantline::seed::seed_conversations;

fn inbox(config: LifecycleConfig) -> (Inbox, Arc<ManualClock>) {
    setup_logging();
    let clock = Arc::new(ManualClock::default());
    let inbox = Inbox::new(seed_conversations(clock.now()), config, clock.clone());
    (inbox, clock)
}

fn no_preview() -> LifecycleConfig {
    LifecycleConfig { inbox_typing_preview: false, ..quiet_config() }
}

fn ids<'a>(list: &[&'a tenantline::models::Conversation]) -> Vec<&'a str> {
    list.iter().map(|c| c.id.as_str()).collect()
}

/// An empty query is the identity projection
#[test]
fn test_empty_query_is_identity() {
    let (inbox, _) = inbox(no_preview());
    let all: Vec<&str> = inbox.conversations().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids(&inbox.search("")), all);
    assert_eq!(all, vec!["conv-sarah", "conv-mike", "conv-apex"], "Seed is ordered by recency");
}

/// A query matching nobody yields nothing
#[test]
fn test_unmatched_query_is_empty() {
    let (inbox, _) = inbox(no_preview());
    assert!(inbox.search("Nonexistent Tower").is_empty());
    assert!(filter_conversations(inbox.conversations(), "qqq").is_empty());
}

#[test]
fn test_search_by_property() {
    let (inbox, _) = inbox(no_preview());
    assert_eq!(ids(&inbox.search("maple court")), vec!["conv-apex"]);
    assert_eq!(ids(&inbox.search("LOFTS")), vec!["conv-mike"]);
}

/// Opening marks read; switching disposes the previous session and keeps its state
#[test]
fn test_switching_disposes_previous_session() {
    let (mut inbox, clock) = inbox(no_preview());
    assert_eq!(inbox.unread_total(), 1);

    let mut sarah_events = inbox.open("conv-sarah").unwrap();
    assert_eq!(inbox.conversation("conv-sarah").unwrap().unread, 0);

    let id = inbox.active_mut().unwrap().send_text("Plumber is on the way").unwrap();
    clock.advance(Duration::from_millis(600));
    inbox.tick();

    let _mike_events = inbox.open("conv-mike").unwrap();
    assert_eq!(inbox.active().unwrap().conversation().id, "conv-mike");

    // Sarah's session saw its disposal and then nothing more
    let events = common::drain(&mut sarah_events);
    assert_eq!(events.last(), Some(&SessionEvent::Disposed));

    clock.advance(Duration::from_secs(30));
    inbox.tick();
    assert!(common::drain(&mut sarah_events).is_empty());

    let sarah = inbox.conversation("conv-sarah").unwrap();
    let message = sarah.message(&id).unwrap();
    assert_eq!(message.status, DeliveryStatus::Sent, "Delivery stops when the conversation is switched away");
}

/// The list mirrors the open conversation while it runs
#[test]
fn test_active_state_synced_into_list() {
    let (mut inbox, clock) = inbox(no_preview());
    inbox.open("conv-mike").unwrap();
    let id = inbox.active_mut().unwrap().send_text("Signed copies received").unwrap();

    clock.advance(Duration::from_secs(4));
    inbox.tick();

    let mike = inbox.conversation("conv-mike").unwrap();
    assert_eq!(mike.message(&id).map(|m| m.status), Some(DeliveryStatus::Read));
    assert_eq!(inbox.close_active(), Some("conv-mike".to_string()));
    assert!(inbox.active().is_none());
}

#[test]
fn test_open_unknown_conversation() {
    let (mut inbox, _) = inbox(no_preview());
    inbox.open("conv-sarah").unwrap();
    assert!(matches!(inbox.open("conv-ghost"), Err(ChatError::UnknownConversation(_))));
    // The failed open leaves the current conversation untouched
    assert_eq!(inbox.active().unwrap().conversation().id, "conv-sarah");
}

/// New conversations go to the top and can be opened
#[test]
fn test_start_conversation() {
    let (mut inbox, _) = inbox(no_preview());
    let id = inbox
        .start_conversation(
            Participant::new("Dana Whitfield"),
            Some(PropertyRef { id: "prop-9".to_string(), name: "Harbor View 2A".to_string() }),
        )
        .unwrap();

    assert_eq!(inbox.conversations()[0].id, id);
    assert_eq!(ids(&inbox.search("harbor")), vec![id.as_str()]);
    assert!(inbox.open(&id).is_ok());
}

/// The list preview loops idle <-> typing until disposed
#[test]
fn test_looping_preview() {
    let config = quiet_config();
    let (mut inbox, clock) = inbox(config.clone());
    assert_eq!(inbox.pending_timers(), 3);
    assert!(!inbox.is_typing("conv-mike"));

    clock.advance(config.typing_idle());
    inbox.tick();
    assert!(inbox.is_typing("conv-mike"));

    clock.advance(config.typing_duration());
    inbox.tick();
    assert!(!inbox.is_typing("conv-mike"));

    clock.advance(config.typing_idle());
    inbox.tick();
    assert!(inbox.is_typing("conv-mike"), "Loop should start another burst");

    inbox.dispose();
    assert_eq!(inbox.pending_timers(), 0);
    assert!(!inbox.is_typing("conv-mike"));
    clock.advance(Duration::from_secs(60));
    assert_eq!(inbox.tick(), 0);
    assert!(matches!(inbox.open("conv-mike"), Err(ChatError::SessionDisposed)));
}

/// The open conversation is left out of the preview loop
#[test]
fn test_preview_paused_for_open_conversation() {
    let config = quiet_config();
    let (mut inbox, clock) = inbox(config.clone());
    inbox.open("conv-sarah").unwrap();
    assert_eq!(inbox.pending_timers(), 2);

    clock.advance(config.typing_idle());
    inbox.tick();
    assert!(!inbox.is_typing("conv-sarah"));
    assert!(inbox.is_typing("conv-apex"));

    inbox.close_active();
    assert_eq!(inbox.pending_timers(), 3);
}

/// Zero preview intervals are clamped, so a tick always returns
#[test]
fn test_zero_preview_intervals_do_not_spin() {
    let config = LifecycleConfig { typing_idle_ms: 0, typing_duration_ms: 0, ..quiet_config() };
    let (mut inbox, clock) = inbox(config);

    clock.advance(Duration::from_millis(1));
    assert_eq!(inbox.tick(), 3, "Each conversation toggles once per millisecond");
    assert!(inbox.is_typing("conv-mike"));

    clock.advance(Duration::from_millis(1));
    inbox.tick();
    assert!(!inbox.is_typing("conv-mike"));
    assert_eq!(inbox.pending_timers(), 3);
}

/// A reply that lands while the conversation is open does not count as unread
#[test]
fn test_reply_while_open_stays_read() {
    let config = LifecycleConfig { inbox_typing_preview: false, ..common::chatty_config() };
    let (mut inbox, clock) = inbox(config);
    let mut events = inbox.open("conv-mike").unwrap();
    inbox.active_mut().unwrap().send_text("Any questions about the lease?").unwrap();

    clock.advance(Duration::from_secs(20));
    inbox.tick();
    let replied = common::drain(&mut events)
        .iter()
        .any(|e| matches!(e, SessionEvent::MessageAdded(m) if m.sender == tenantline::models::Sender::Peer));
    assert!(replied, "Expected the peer to answer");

    inbox.close_active();
    assert_eq!(inbox.conversation("conv-mike").unwrap().unread, 0);
    assert_eq!(inbox.unread_total(), 1, "Only Sarah's untouched thread is unread");
}

/// Reopening a conversation restarts its preview exactly once
#[test]
fn test_preview_rearmed_once_per_conversation() {
    let config = quiet_config();
    let (mut inbox, clock) = inbox(config.clone());
    inbox.open("conv-apex").unwrap();
    inbox.close_active();
    inbox.open("conv-apex").unwrap();
    inbox.close_active();
    assert_eq!(inbox.pending_timers(), 3);

    clock.advance(config.typing_idle());
    inbox.tick();
    assert!(inbox.is_typing("conv-apex"));
}
