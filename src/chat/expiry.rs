// Disappearing messages: expiry horizons and the periodic sweep.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::session::{ConversationSession, SessionTimer};
use super::SessionEvent;
use crate::clock::to_chrono;
use crate::error::ChatError;
use crate::models::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryHorizon {
    OneHour,
    OneDay,
    SevenDays,
}

impl ExpiryHorizon {
    pub fn duration(self) -> Duration {
        match self {
            ExpiryHorizon::OneHour => Duration::from_secs(60 * 60),
            ExpiryHorizon::OneDay => Duration::from_secs(24 * 60 * 60),
            ExpiryHorizon::SevenDays => Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    pub fn expires_at(self, from: DateTime<Utc>) -> DateTime<Utc> {
        from + to_chrono(self.duration())
    }

    pub fn label(self) -> &'static str {
        match self {
            ExpiryHorizon::OneHour => "1 hour",
            ExpiryHorizon::OneDay => "24 hours",
            ExpiryHorizon::SevenDays => "7 days",
        }
    }
}

/// Remove every message whose expiry has passed. Messages without an expiry
/// always survive. Returns the removed ids in their original order.
pub fn sweep_expired(messages: &mut Vec<Message>, now: DateTime<Utc>) -> Vec<String> {
    let mut removed = Vec::new();
    messages.retain(|m| {
        if m.is_expired(now) {
            removed.push(m.id.clone());
            false
        } else {
            true
        }
    });
    removed
}

impl ConversationSession {
    /// Send text that disappears once `horizon` has elapsed.
    pub fn send_expiring_text(&mut self, body: &str, horizon: ExpiryHorizon) -> Result<String, ChatError> {
        let expires_at = horizon.expires_at(self.now());
        info!("Sending message that expires in {}", horizon.label());
        self.send_prepared(body, |m| m.expiring_at(expires_at))
    }

    /// Run one sweep immediately. Returns the ids that were removed.
    pub fn sweep_now(&mut self) -> Vec<String> {
        if self.is_disposed() {
            return Vec::new();
        }
        let now = self.now();
        self.sweep_at(now)
    }

    pub(super) fn sweep_at(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let removed = sweep_expired(&mut self.conversation.messages, now);
        for id in &removed {
            let cancelled = self.cancel_message_timers(id);
            debug!("Expired message {} removed ({} pending timers cancelled)", id, cancelled);
            self.publish(SessionEvent::MessageRemoved { id: id.clone() });
        }
        if !removed.is_empty() {
            info!("Expiry sweep removed {} message(s) from {}", removed.len(), self.conversation.id);
        }
        removed
    }

    pub(super) fn arm_expiry_sweep(&mut self, from: DateTime<Utc>) {
        let interval = self.config.expiry_sweep_interval();
        self.timers.schedule_after(from, interval, SessionTimer::ExpirySweep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeliveryStatus;

    #[test]
    fn test_sweep_removes_only_past_expiry() {
        let now = Utc::now();
        let mut messages = vec![
            Message::outgoing("gone", now).with_id("past").expiring_at(now - chrono::Duration::seconds(1)),
            Message::outgoing("stays", now).with_id("future").expiring_at(now + chrono::Duration::hours(1)),
            Message::incoming("forever", DeliveryStatus::Sent, now).with_id("none"),
        ];

        let removed = sweep_expired(&mut messages, now);
        assert_eq!(removed, vec!["past".to_string()]);
        let left: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(left, vec!["future", "none"]);
    }

    #[test]
    fn test_masked_messages_are_not_swept() {
        let now = Utc::now();
        let mut messages = vec![Message::outgoing("gate code 4411", now).masked()];
        assert!(sweep_expired(&mut messages, now + chrono::Duration::days(30)).is_empty());
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_horizon_durations() {
        assert_eq!(ExpiryHorizon::OneHour.duration(), Duration::from_secs(3600));
        assert_eq!(ExpiryHorizon::OneDay.duration(), Duration::from_secs(86_400));
        assert_eq!(ExpiryHorizon::SevenDays.duration(), Duration::from_secs(604_800));
    }
}
