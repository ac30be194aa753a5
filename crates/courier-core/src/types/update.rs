use super::member::ChatMemberUpdated;
use super::message::Message;
use super::payments::{PreCheckoutQuery, ShippingQuery};
use super::poll::{Poll, PollAnswer};
use super::query::{CallbackQuery, ChosenInlineResult, InlineQuery};
use super::user::User;
use serde::Deserialize;
use std::fmt;

/// An inbound event.
///
/// `id` is the server-assigned sequence number, strictly increasing per bot.
/// It is an acknowledgement cursor only, never a content key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawUpdate")]
pub struct Update {
    pub id: i64,
    pub kind: UpdateKind,
}

/// The payload of an [`Update`]. Exactly one per update.
///
/// Variant order is the classification priority.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateKind {
    Message(Message),
    EditedMessage(Message),
    ChannelPost(Message),
    EditedChannelPost(Message),
    CallbackQuery(CallbackQuery),
    InlineQuery(InlineQuery),
    ChosenInlineResult(ChosenInlineResult),
    ShippingQuery(ShippingQuery),
    PreCheckoutQuery(PreCheckoutQuery),
    Poll(Poll),
    PollAnswer(PollAnswer),
    MyChatMember(ChatMemberUpdated),
    ChatMember(ChatMemberUpdated),
    /// A payload this runtime does not model.
    Unknown,
}

/// Handler registry key: which kind of event a handler listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Message,
    EditedMessage,
    ChannelPost,
    EditedChannelPost,
    CallbackQuery,
    InlineQuery,
    ChosenInlineResult,
    ShippingQuery,
    PreCheckoutQuery,
    Poll,
    PollAnswer,
    MyChatMember,
    ChatMember,
}

impl EventKind {
    /// Name used by the Bot API (`allowed_updates`, JSON field).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::EditedMessage => "edited_message",
            Self::ChannelPost => "channel_post",
            Self::EditedChannelPost => "edited_channel_post",
            Self::CallbackQuery => "callback_query",
            Self::InlineQuery => "inline_query",
            Self::ChosenInlineResult => "chosen_inline_result",
            Self::ShippingQuery => "shipping_query",
            Self::PreCheckoutQuery => "pre_checkout_query",
            Self::Poll => "poll",
            Self::PollAnswer => "poll_answer",
            Self::MyChatMember => "my_chat_member",
            Self::ChatMember => "chat_member",
        }
    }

    /// Kinds whose payload is a [`Message`].
    pub fn carries_message(&self) -> bool {
        matches!(
            self,
            Self::Message | Self::EditedMessage | Self::ChannelPost | Self::EditedChannelPost
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl UpdateKind {
    /// Registry key, `None` for [`UpdateKind::Unknown`].
    pub fn event_kind(&self) -> Option<EventKind> {
        Some(match self {
            Self::Message(_) => EventKind::Message,
            Self::EditedMessage(_) => EventKind::EditedMessage,
            Self::ChannelPost(_) => EventKind::ChannelPost,
            Self::EditedChannelPost(_) => EventKind::EditedChannelPost,
            Self::CallbackQuery(_) => EventKind::CallbackQuery,
            Self::InlineQuery(_) => EventKind::InlineQuery,
            Self::ChosenInlineResult(_) => EventKind::ChosenInlineResult,
            Self::ShippingQuery(_) => EventKind::ShippingQuery,
            Self::PreCheckoutQuery(_) => EventKind::PreCheckoutQuery,
            Self::Poll(_) => EventKind::Poll,
            Self::PollAnswer(_) => EventKind::PollAnswer,
            Self::MyChatMember(_) => EventKind::MyChatMember,
            Self::ChatMember(_) => EventKind::ChatMember,
            Self::Unknown => return None,
        })
    }
}

impl Update {
    /// The message carried by message-like updates.
    pub fn message(&self) -> Option<&Message> {
        match &self.kind {
            UpdateKind::Message(m)
            | UpdateKind::EditedMessage(m)
            | UpdateKind::ChannelPost(m)
            | UpdateKind::EditedChannelPost(m) => Some(m),
            _ => None,
        }
    }

    pub fn callback_query(&self) -> Option<&CallbackQuery> {
        match &self.kind {
            UpdateKind::CallbackQuery(cb) => Some(cb),
            _ => None,
        }
    }

    /// The user who triggered this update, when there is one.
    pub fn sender(&self) -> Option<&User> {
        match &self.kind {
            UpdateKind::Message(m)
            | UpdateKind::EditedMessage(m)
            | UpdateKind::ChannelPost(m)
            | UpdateKind::EditedChannelPost(m) => m.from.as_ref(),
            UpdateKind::CallbackQuery(cb) => Some(&cb.from),
            UpdateKind::InlineQuery(q) => Some(&q.from),
            UpdateKind::ChosenInlineResult(r) => Some(&r.from),
            UpdateKind::ShippingQuery(q) => Some(&q.from),
            UpdateKind::PreCheckoutQuery(q) => Some(&q.from),
            UpdateKind::PollAnswer(a) => a.user.as_ref(),
            UpdateKind::MyChatMember(u) | UpdateKind::ChatMember(u) => Some(&u.from),
            UpdateKind::Poll(_) | UpdateKind::Unknown => None,
        }
    }

    /// The chat this update belongs to, when there is one.
    pub fn chat_id(&self) -> Option<i64> {
        match &self.kind {
            UpdateKind::CallbackQuery(cb) => cb.message.as_ref().map(|m| m.chat.id),
            UpdateKind::MyChatMember(u) | UpdateKind::ChatMember(u) => Some(u.chat.id),
            _ => self.message().map(|m| m.chat.id),
        }
    }

    /// Key that groups updates of one conversation: the chat, else the sender.
    pub fn conversation_key(&self) -> Option<i64> {
        self.chat_id().or_else(|| self.sender().map(|u| u.id))
    }
}

/// Wire shape: one optional field per kind.
#[derive(Deserialize)]
struct RawUpdate {
    update_id: i64,
    message: Option<Message>,
    edited_message: Option<Message>,
    channel_post: Option<Message>,
    edited_channel_post: Option<Message>,
    callback_query: Option<CallbackQuery>,
    inline_query: Option<InlineQuery>,
    chosen_inline_result: Option<ChosenInlineResult>,
    shipping_query: Option<ShippingQuery>,
    pre_checkout_query: Option<PreCheckoutQuery>,
    poll: Option<Poll>,
    poll_answer: Option<PollAnswer>,
    my_chat_member: Option<ChatMemberUpdated>,
    chat_member: Option<ChatMemberUpdated>,
}

impl From<RawUpdate> for Update {
    fn from(raw: RawUpdate) -> Self {
        // First populated field in priority order wins; the rest are dropped.
        let kind = if let Some(m) = raw.message {
            UpdateKind::Message(m)
        } else if let Some(m) = raw.edited_message {
            UpdateKind::EditedMessage(m)
        } else if let Some(m) = raw.channel_post {
            UpdateKind::ChannelPost(m)
        } else if let Some(m) = raw.edited_channel_post {
            UpdateKind::EditedChannelPost(m)
        } else if let Some(cb) = raw.callback_query {
            UpdateKind::CallbackQuery(cb)
        } else if let Some(q) = raw.inline_query {
            UpdateKind::InlineQuery(q)
        } else if let Some(r) = raw.chosen_inline_result {
            UpdateKind::ChosenInlineResult(r)
        } else if let Some(q) = raw.shipping_query {
            UpdateKind::ShippingQuery(q)
        } else if let Some(q) = raw.pre_checkout_query {
            UpdateKind::PreCheckoutQuery(q)
        } else if let Some(p) = raw.poll {
            UpdateKind::Poll(p)
        } else if let Some(a) = raw.poll_answer {
            UpdateKind::PollAnswer(a)
        } else if let Some(u) = raw.my_chat_member {
            UpdateKind::MyChatMember(u)
        } else if let Some(u) = raw.chat_member {
            UpdateKind::ChatMember(u)
        } else {
            UpdateKind::Unknown
        };
        Update {
            id: raw.update_id,
            kind,
        }
    }
}
