use super::entity::MessageEntity;
use super::media::{Audio, Document, File, PhotoSize, Sticker, Video, Voice};
use super::poll::Poll;
use super::user::{Chat, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub horizontal_accuracy: Option<f64>,
    /// Seconds the live location will be updated for.
    pub live_period: Option<i64>,
}

/// A message in a chat. Also used for edited messages and channel posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    /// Empty for messages sent to channels.
    pub from: Option<User>,
    /// Sender when the message was sent on behalf of a chat.
    pub sender_chat: Option<Chat>,
    /// Unix seconds.
    #[serde(default)]
    pub date: i64,
    pub chat: Chat,
    pub reply_to_message: Option<Box<Message>>,
    pub via_bot: Option<User>,
    /// Unix seconds of the last edit.
    pub edit_date: Option<i64>,
    pub media_group_id: Option<String>,
    pub author_signature: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    pub caption: Option<String>,
    #[serde(default)]
    pub caption_entities: Vec<MessageEntity>,
    /// Available sizes, smallest first.
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
    pub document: Option<Document>,
    pub audio: Option<Audio>,
    pub voice: Option<Voice>,
    pub video: Option<Video>,
    pub sticker: Option<Sticker>,
    pub location: Option<Location>,
    pub poll: Option<Poll>,
    #[serde(default)]
    pub new_chat_members: Vec<User>,
    pub left_chat_member: Option<User>,
    pub new_chat_title: Option<String>,
    pub pinned_message: Option<Box<Message>>,
    pub migrate_to_chat_id: Option<i64>,
    pub migrate_from_chat_id: Option<i64>,
}

impl Message {
    /// Send time.
    pub fn time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.date, 0).unwrap_or_default()
    }

    /// Last edit time, if the message was edited.
    pub fn edited_at(&self) -> Option<DateTime<Utc>> {
        self.edit_date.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }

    /// Text for text messages, caption for media messages.
    pub fn text_or_caption(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }

    /// Entities matching [`Message::text_or_caption`].
    pub fn entities_for_text(&self) -> &[MessageEntity] {
        if self.text.is_some() {
            &self.entities
        } else {
            &self.caption_entities
        }
    }

    /// The substring an entity of this message annotates.
    pub fn entity_text(&self, entity: &MessageEntity) -> Option<String> {
        entity.text_in(self.text_or_caption()?)
    }

    /// The downloadable file attached to this message, if any.
    ///
    /// Telegram sends multiple photo sizes; the last is the largest.
    pub fn media_file(&self) -> Option<&File> {
        if let Some(largest) = self.photo.last() {
            return Some(&largest.file);
        }
        self.document
            .as_ref()
            .map(|d| &d.file)
            .or_else(|| self.audio.as_ref().map(|a| &a.file))
            .or_else(|| self.voice.as_ref().map(|v| &v.file))
            .or_else(|| self.video.as_ref().map(|v| &v.file))
            .or_else(|| self.sticker.as_ref().map(|s| &s.file))
    }

    pub fn is_private(&self) -> bool {
        self.chat.is_private()
    }
}
