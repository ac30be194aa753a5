use super::message::{Location, Message};
use super::user::User;
use serde::{Deserialize, Serialize};

/// A press on an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    /// Set when the button was attached to a message sent by the bot.
    pub message: Option<Box<Message>>,
    /// Set when the button was attached to an inline-mode message.
    pub inline_message_id: Option<String>,
    #[serde(default)]
    pub chat_instance: String,
    /// Button data. Clients can send arbitrary bytes here.
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub offset: String,
    pub chat_type: Option<String>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenInlineResult {
    pub result_id: String,
    pub from: User,
    pub location: Option<Location>,
    pub inline_message_id: Option<String>,
    #[serde(default)]
    pub query: String,
}
