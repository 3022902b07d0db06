// Conversation list projection: search filter and recency ordering for the inbox.

use crate::models::Conversation;

/// Filter conversations by participant or property name, keeping input order.
/// The query is trimmed first, so a blank query returns every conversation.
pub fn filter_conversations<'a>(conversations: &'a [Conversation], query: &str) -> Vec<&'a Conversation> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return conversations.iter().collect();
    }

    conversations
        .iter()
        .filter(|c| {
            c.participant.name.to_lowercase().contains(&needle)
                || c.property_name()
                    .map(|name| name.to_lowercase().contains(&needle))
                    .unwrap_or(false)
        })
        .collect()
}

/// Most recently active first. Stable, so equal timestamps keep their order.
pub fn sort_by_recency(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
}

pub fn total_unread(conversations: &[Conversation]) -> u32 {
    conversations.iter().map(|c| c.unread).fold(0u32, u32::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Participant, PropertyRef};
    use chrono::{Duration, Utc};

    fn conversation(id: &str, name: &str, property: Option<&str>, minutes_ago: i64) -> Conversation {
        let now = Utc::now();
        let property = property.map(|p| PropertyRef { id: format!("prop-{}", id), name: p.to_string() });
        let mut c = Conversation::new(Participant::new(name), property, now).with_id(id);
        c.last_activity = now - Duration::minutes(minutes_ago);
        c
    }

    fn sample() -> Vec<Conversation> {
        vec![
            conversation("c1", "Sarah Johnson", Some("Sunset Apartments"), 5),
            conversation("c2", "Mike Chen", Some("Downtown Lofts"), 30),
            conversation("c3", "Maintenance Team", None, 2),
        ]
    }

    #[test]
    fn test_empty_query_returns_everything_in_order() {
        let list = sample();
        let ids: Vec<&str> = filter_conversations(&list, "").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);

        let ids: Vec<&str> = filter_conversations(&list, "   ").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn test_matches_name_or_property_case_insensitively() {
        let list = sample();
        let by_name: Vec<&str> = filter_conversations(&list, "mike").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(by_name, vec!["c2"]);

        let by_property: Vec<&str> = filter_conversations(&list, "SUNSET").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(by_property, vec!["c1"]);

        // "n" hits all three names; order must be preserved
        let broad: Vec<&str> = filter_conversations(&list, "n").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(broad, vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn test_edge_whitespace_is_ignored() {
        let list = sample();
        let ids: Vec<&str> = filter_conversations(&list, "Sarah ").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1"]);

        // Inner spaces still count
        let ids: Vec<&str> = filter_conversations(&list, " chen mike").iter().map(|c| c.id.as_str()).collect();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_no_match_is_empty() {
        let list = sample();
        assert!(filter_conversations(&list, "zzz-nobody").is_empty());
    }

    #[test]
    fn test_sort_by_recency_is_stable() {
        let mut list = sample();
        list[1].last_activity = list[0].last_activity;
        sort_by_recency(&mut list);
        let ids: Vec<&str> = list.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c1", "c2"]);
    }

    #[test]
    fn test_total_unread() {
        let mut list = sample();
        list[0].unread = 2;
        list[2].unread = 3;
        assert_eq!(total_unread(&list), 5);
    }
}
