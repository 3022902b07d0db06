// Demo conversations loaded when the inbox first mounts.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Conversation, DeliveryStatus, Message, Participant, Presence, PropertyRef};

fn property(id: &str, name: &str) -> Option<PropertyRef> {
    Some(PropertyRef { id: id.to_string(), name: name.to_string() })
}

/// A handful of tenant and vendor threads, all history already read.
pub fn seed_conversations(now: DateTime<Utc>) -> Vec<Conversation> {
    let mut sarah = Conversation::new(
        Participant {
            name: "Sarah Johnson".to_string(),
            avatar: Some("sj.png".to_string()),
            presence: Presence::Online,
        },
        property("prop-1", "Sunset Apartments 4B"),
        now,
    )
    .with_id("conv-sarah");
    sarah.push(
        Message::incoming("Hi, the kitchen sink is leaking again.", DeliveryStatus::Read, now - Duration::minutes(12))
            .with_id("seed-s1"),
    );
    sarah.push(
        Message::outgoing("Sorry to hear that. I'll send someone today.", now - Duration::minutes(10))
            .with_id("seed-s2")
            .with_status(DeliveryStatus::Read),
    );
    sarah.push(
        Message::incoming("Thank you! I'm home after 3pm.", DeliveryStatus::Read, now - Duration::minutes(5))
            .with_id("seed-s3"),
    );
    sarah.unread = 1;
    sarah.last_activity = now - Duration::minutes(5);

    let mut mike = Conversation::new(
        Participant {
            name: "Mike Chen".to_string(),
            avatar: Some("mc.png".to_string()),
            presence: Presence::Offline { last_seen: Some(now - Duration::hours(2)) },
        },
        property("prop-2", "Downtown Lofts 12"),
        now,
    )
    .with_id("conv-mike");
    mike.push(
        Message::outgoing("Lease renewal documents are ready to sign.", now - Duration::hours(3))
            .with_id("seed-m1")
            .with_status(DeliveryStatus::Read),
    );
    mike.push(
        Message::incoming("Great, I'll review them tonight.", DeliveryStatus::Read, now - Duration::hours(2))
            .with_id("seed-m2"),
    );
    mike.last_activity = now - Duration::hours(2);

    let mut vendor = Conversation::new(
        Participant {
            name: "Apex HVAC Services".to_string(),
            avatar: None,
            presence: Presence::Offline { last_seen: None },
        },
        property("prop-3", "Maple Court Building C"),
        now,
    )
    .with_id("conv-apex");
    vendor.push(
        Message::incoming("Quarterly filter replacement done for Building C.", DeliveryStatus::Read, now - Duration::days(1))
            .with_id("seed-a1"),
    );
    vendor.last_activity = now - Duration::days(1);

    vec![sarah, mike, vendor]
}
