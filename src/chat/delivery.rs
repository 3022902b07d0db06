// Simulated delivery receipts.
//
// A message walks sending -> sent -> delivered -> read. Only the next hop
// is ever scheduled; it is chained from inside the previous hop's handler,
// so a later status can never overtake an earlier one.

use chrono::{DateTime, Utc};
use log::{debug, info};
use std::time::Duration;

use super::session::{ConversationSession, SessionTimer};
use super::SessionEvent;
use crate::config::LifecycleConfig;
use crate::error::ChatError;
use crate::models::{DeliveryStatus, Sender};

/// How long the hop into `to` takes.
pub fn hop_delay(config: &LifecycleConfig, to: DeliveryStatus) -> Duration {
    match to {
        DeliveryStatus::Sending => Duration::ZERO,
        DeliveryStatus::Sent => config.sending_delay(),
        DeliveryStatus::Delivered => config.delivered_delay(),
        DeliveryStatus::Read => config.read_delay(),
    }
}

impl ConversationSession {
    /// Start (or restart) simulated delivery for a message already in the
    /// conversation, from whatever status it currently has.
    pub fn simulate_delivery(&mut self, message_id: &str) -> Result<(), ChatError> {
        self.ensure_live()?;
        let status = self
            .conversation
            .message(message_id)
            .map(|m| m.status)
            .ok_or_else(|| ChatError::UnknownMessage(message_id.to_string()))?;

        // Never keep two chains alive for one message
        self.cancel_message_timers(message_id);

        if let Some(next) = status.next() {
            let now = self.now();
            self.schedule_hop(message_id, next, now);
        }
        Ok(())
    }

    fn schedule_hop(&mut self, message_id: &str, to: DeliveryStatus, from: DateTime<Utc>) {
        let delay = hop_delay(&self.config, to);
        debug!("Scheduling {} -> {:?} in {:?}", message_id, to, delay);
        self.timers.schedule_after(
            from,
            delay,
            SessionTimer::Advance { message_id: message_id.to_string(), to },
        );
    }

    /// Timer handler for one hop. Missing messages and repeated hops are ignored.
    pub(super) fn apply_transition(&mut self, message_id: &str, to: DeliveryStatus, due: DateTime<Utc>) {
        let Some(message) = self.conversation.message_mut(message_id) else {
            debug!("Skipping {:?} for {}: message no longer present", to, message_id);
            return;
        };
        let from = message.status;
        if let Err(e) = message.advance_to(to) {
            debug!("Skipping stale transition: {}", e);
            return;
        }
        let outgoing = message.sender == Sender::Me;

        info!("Updating message {} status from {:?} to {:?}", message_id, from, to);
        self.publish(SessionEvent::StatusChanged { id: message_id.to_string(), status: to });

        match to.next() {
            Some(next) => self.schedule_hop(message_id, next, due),
            None => {
                if outgoing && self.config.auto_reply {
                    self.schedule_typing(due, true);
                }
            }
        }
    }
}
