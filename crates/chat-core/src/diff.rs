use std::collections::{HashMap, HashSet};

use crate::types::Message;

/// Decide whether a freshly polled message set differs from the current one
/// in a way worth rendering.
///
/// Two collections are equivalent iff they contain exactly the same set of
/// message IDs and, for every shared ID, `like_count` and `liked_by_viewer`
/// are unchanged. Content, sender, reply target, timestamp and ordering
/// differences are deliberately not detected: messages cannot be edited in
/// this system, so the only fields that change under an existing ID are the
/// like fields. This is a contract of the function, not an omission.
pub fn messages_changed(current: &[Message], incoming: &[Message]) -> bool {
    if current.len() != incoming.len() {
        return true;
    }

    let current_by_id: HashMap<&str, &Message> = current
        .iter()
        .map(|message| (message.id.as_str(), message))
        .collect();
    let incoming_ids: HashSet<&str> = incoming
        .iter()
        .map(|message| message.id.as_str())
        .collect();

    if current
        .iter()
        .any(|message| !incoming_ids.contains(message.id.as_str()))
    {
        return true;
    }

    for message in incoming {
        let Some(existing) = current_by_id.get(message.id.as_str()) else {
            return true;
        };
        if existing.like_count != message.like_count
            || existing.liked_by_viewer != message.liked_by_viewer
        {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageSender;

    fn message(id: &str, like_count: u32, liked: bool) -> Message {
        Message {
            id: id.to_owned(),
            room_id: "room-1".to_owned(),
            sender: MessageSender {
                id: "user-1".to_owned(),
                nickname: "alice".to_owned(),
            },
            content: "hello".to_owned(),
            reply_to: None,
            created_at_ms: 1_700_000_000_000,
            like_count,
            liked_by_viewer: liked,
        }
    }

    #[test]
    fn identical_collections_are_unchanged() {
        let current = vec![message("a", 2, false), message("b", 0, true)];
        let incoming = vec![message("a", 2, false), message("b", 0, true)];
        assert!(!messages_changed(&current, &incoming));
    }

    #[test]
    fn reordering_alone_is_not_a_change() {
        let current = vec![message("a", 2, false), message("b", 0, true)];
        let incoming = vec![message("b", 0, true), message("a", 2, false)];
        assert!(!messages_changed(&current, &incoming));
    }

    #[test]
    fn added_or_removed_ids_are_changes() {
        let current = vec![message("a", 2, false)];
        let added = vec![message("a", 2, false), message("b", 0, false)];
        assert!(messages_changed(&current, &added));
        assert!(messages_changed(&added, &current));
    }

    #[test]
    fn swapped_id_at_same_length_is_a_change() {
        let current = vec![message("a", 2, false)];
        let incoming = vec![message("b", 2, false)];
        assert!(messages_changed(&current, &incoming));
    }

    #[test]
    fn like_count_difference_is_a_change() {
        let current = vec![message("a", 2, false)];
        let incoming = vec![message("a", 3, false)];
        assert!(messages_changed(&current, &incoming));
    }

    #[test]
    fn liked_flag_difference_is_a_change() {
        let current = vec![message("a", 2, false)];
        let incoming = vec![message("a", 2, true)];
        assert!(messages_changed(&current, &incoming));
    }

    #[test]
    fn content_differences_are_not_detected() {
        let current = vec![message("a", 2, false)];
        let mut edited = message("a", 2, false);
        edited.content = "edited elsewhere".to_owned();
        edited.created_at_ms += 1;
        assert!(!messages_changed(&current, &[edited]));
    }
}
