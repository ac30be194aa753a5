//! Tests for the Bot API object model.

use super::*;

#[test]
fn test_update_text_message() {
    let json = r#"{
        "update_id": 10,
        "message": {
            "message_id": 1,
            "from": {"id": 7, "is_bot": false, "first_name": "Ada"},
            "chat": {"id": 100, "type": "private"},
            "date": 1700000000,
            "text": "hello"
        }
    }"#;
    let update: Update = serde_json::from_str(json).unwrap();
    assert_eq!(update.id, 10);
    assert_eq!(update.kind.event_kind(), Some(EventKind::Message));
    let msg = update.message().unwrap();
    assert_eq!(msg.text.as_deref(), Some("hello"));
    assert_eq!(msg.time().timestamp(), 1700000000);
    assert_eq!(update.chat_id(), Some(100));
    assert_eq!(update.sender().map(|u| u.id), Some(7));
}

#[test]
fn test_update_first_populated_field_wins() {
    let json = r#"{
        "update_id": 11,
        "edited_message": {
            "message_id": 2,
            "chat": {"id": 100, "type": "private"},
            "text": "edited"
        },
        "callback_query": {
            "id": "cb1",
            "from": {"id": 7, "first_name": "Ada"},
            "data": "x"
        }
    }"#;
    let update: Update = serde_json::from_str(json).unwrap();
    assert!(matches!(update.kind, UpdateKind::EditedMessage(_)));
}

#[test]
fn test_update_unknown_payload() {
    let update: Update =
        serde_json::from_str(r#"{"update_id": 12, "message_reaction": {"x": 1}}"#).unwrap();
    assert_eq!(update.id, 12);
    assert_eq!(update.kind, UpdateKind::Unknown);
    assert_eq!(update.kind.event_kind(), None);
    assert_eq!(update.conversation_key(), None);
}

#[test]
fn test_callback_query_chat_and_sender() {
    let json = r#"{
        "update_id": 13,
        "callback_query": {
            "id": "cb1",
            "from": {"id": 7, "first_name": "Ada"},
            "message": {"message_id": 5, "chat": {"id": -100, "type": "group"}},
            "chat_instance": "abc",
            "data": "vote|yes"
        }
    }"#;
    let update: Update = serde_json::from_str(json).unwrap();
    let cb = update.callback_query().unwrap();
    assert_eq!(cb.data.as_deref(), Some("vote|yes"));
    assert_eq!(update.chat_id(), Some(-100));
    assert_eq!(update.conversation_key(), Some(-100));
}

#[test]
fn test_inline_query_keyed_by_sender() {
    let json = r#"{
        "update_id": 14,
        "inline_query": {
            "id": "q1",
            "from": {"id": 42, "first_name": "Bo"},
            "query": "cats",
            "offset": ""
        }
    }"#;
    let update: Update = serde_json::from_str(json).unwrap();
    assert_eq!(update.kind.event_kind(), Some(EventKind::InlineQuery));
    assert_eq!(update.chat_id(), None);
    assert_eq!(update.conversation_key(), Some(42));
}

#[test]
fn test_poll_defaults() {
    let json = r#"{
        "update_id": 15,
        "poll": {
            "id": "p1",
            "question": "Tea?",
            "options": [{"text": "yes", "voter_count": 2}],
            "total_voter_count": 2
        }
    }"#;
    let update: Update = serde_json::from_str(json).unwrap();
    let UpdateKind::Poll(poll) = update.kind else {
        panic!("expected poll");
    };
    assert!(poll.is_anonymous);
    assert!(!poll.is_closed);
    assert_eq!(poll.options[0].voter_count, 2);
}

#[test]
fn test_pre_checkout_query() {
    let json = r#"{
        "update_id": 16,
        "pre_checkout_query": {
            "id": "pc1",
            "from": {"id": 7, "first_name": "Ada"},
            "currency": "EUR",
            "total_amount": 1250,
            "invoice_payload": "order-9"
        }
    }"#;
    let update: Update = serde_json::from_str(json).unwrap();
    let UpdateKind::PreCheckoutQuery(q) = update.kind else {
        panic!("expected pre-checkout query");
    };
    assert_eq!(q.total_amount, 1250);
    assert!(q.order_info.is_none());
}

#[test]
fn test_chat_member_updated() {
    let json = r#"{
        "update_id": 17,
        "my_chat_member": {
            "chat": {"id": -5, "type": "supergroup", "title": "Ops"},
            "from": {"id": 7, "first_name": "Ada"},
            "date": 1700000000,
            "old_chat_member": {"user": {"id": 99, "is_bot": true, "first_name": "bot"}, "status": "left"},
            "new_chat_member": {"user": {"id": 99, "is_bot": true, "first_name": "bot"}, "status": "member"}
        }
    }"#;
    let update: Update = serde_json::from_str(json).unwrap();
    assert_eq!(update.kind.event_kind(), Some(EventKind::MyChatMember));
    assert_eq!(update.chat_id(), Some(-5));
}

#[test]
fn test_media_file_prefers_largest_photo() {
    let json = r#"{
        "message_id": 3,
        "chat": {"id": 100, "type": "private"},
        "photo": [
            {"file_id": "small", "file_unique_id": "s", "width": 90, "height": 90},
            {"file_id": "large", "file_unique_id": "l", "width": 800, "height": 800, "file_size": 20000}
        ],
        "caption": "Check this out"
    }"#;
    let msg: Message = serde_json::from_str(json).unwrap();
    let file = msg.media_file().unwrap();
    assert_eq!(file.file_id, "large");
    assert_eq!(file.file_size, Some(20000));
    assert_eq!(msg.text_or_caption(), Some("Check this out"));
}

#[test]
fn test_media_file_document() {
    let json = r#"{
        "message_id": 4,
        "chat": {"id": 100, "type": "private"},
        "document": {"file_id": "doc1", "file_unique_id": "d", "file_name": "a.pdf"}
    }"#;
    let msg: Message = serde_json::from_str(json).unwrap();
    assert_eq!(msg.media_file().unwrap().file_id, "doc1");
    assert_eq!(msg.document.unwrap().file_name.as_deref(), Some("a.pdf"));
}

#[test]
fn test_chat_type_helpers() {
    let group: Chat = serde_json::from_str(r#"{"id": -100123, "type": "group"}"#).unwrap();
    let private: Chat = serde_json::from_str(r#"{"id": 789, "type": "private"}"#).unwrap();
    let untyped: Chat = serde_json::from_str(r#"{"id": 1}"#).unwrap();
    assert!(group.is_group());
    assert!(private.is_private());
    assert!(!untyped.is_group());
    assert_eq!(untyped.chat_type, "");
}

#[test]
fn test_user_display_name() {
    let user: User =
        serde_json::from_str(r#"{"id": 1, "first_name": "Ada", "last_name": "L"}"#).unwrap();
    assert_eq!(user.display_name(), "Ada L");
    let user: User =
        serde_json::from_str(r#"{"id": 1, "first_name": "Ada", "username": "ada"}"#).unwrap();
    assert_eq!(user.display_name(), "@ada");
}

// --- UTF-16 entity slicing ---

#[test]
fn test_utf16_slice_surrogate_pair() {
    // U+1F600 is one visible char, two UTF-16 units.
    let text = "\u{1F600} bold";
    assert_eq!(utf16_len(text), 7);
    assert_eq!(utf16_slice(text, 0, 2).as_deref(), Some("\u{1F600}"));
    // Cutting the pair in half is rejected rather than corrupted.
    assert_eq!(utf16_slice(text, 0, 1), None);
    assert_eq!(utf16_slice(text, 1, 2), None);
}

#[test]
fn test_entity_after_emoji() {
    let json = r#"{
        "message_id": 1,
        "chat": {"id": 1, "type": "private"},
        "text": "😀 hi @ada!",
        "entities": [{"type": "mention", "offset": 6, "length": 4}]
    }"#;
    let msg: Message = serde_json::from_str(json).unwrap();
    let entity = &msg.entities_for_text()[0];
    assert_eq!(entity.kind, "mention");
    assert_eq!(msg.entity_text(entity).as_deref(), Some("@ada"));
}

#[test]
fn test_utf16_slice_out_of_range() {
    assert_eq!(utf16_slice("abc", 2, 5), None);
    assert_eq!(utf16_slice("abc", usize::MAX, 2), None);
    assert_eq!(utf16_slice("abc", 3, 0).as_deref(), Some(""));
}

#[test]
fn test_caption_entities_used_for_media() {
    let json = r#"{
        "message_id": 1,
        "chat": {"id": 1, "type": "private"},
        "caption": "é link",
        "caption_entities": [{"type": "url", "offset": 2, "length": 4}],
        "photo": [{"file_id": "p", "width": 1, "height": 1}]
    }"#;
    let msg: Message = serde_json::from_str(json).unwrap();
    let entity = &msg.entities_for_text()[0];
    assert_eq!(msg.entity_text(entity).as_deref(), Some("link"));
}
