//! Outbound calls: messages, files, callback answers.

use crate::{bot::Bot, files::FileRef};
use courier_core::{
    error::CourierError,
    traits::Upload,
    types::{CallbackQuery, Chat, Message, User},
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

/// Something messages can be sent to.
pub trait Recipient {
    /// The `chat_id` parameter: a numeric id or `@channelusername`.
    fn chat_id(&self) -> Value;
}

impl Recipient for i64 {
    fn chat_id(&self) -> Value {
        json!(self)
    }
}

impl Recipient for str {
    fn chat_id(&self) -> Value {
        json!(self)
    }
}

impl Recipient for String {
    fn chat_id(&self) -> Value {
        json!(self)
    }
}

impl Recipient for Chat {
    fn chat_id(&self) -> Value {
        json!(self.id)
    }
}

impl Recipient for User {
    fn chat_id(&self) -> Value {
        json!(self.id)
    }
}

impl Recipient for Message {
    fn chat_id(&self) -> Value {
        json!(self.chat.id)
    }
}

/// Text formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    #[serde(rename = "MarkdownV2")]
    MarkdownV2,
    #[serde(rename = "HTML")]
    Html,
    /// Legacy Markdown.
    #[serde(rename = "Markdown")]
    Markdown,
}

/// One inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InlineButton {
    /// A button that sends `key|payload` back as callback data.
    pub fn callback(text: impl Into<String>, key: &str, payload: &str) -> Self {
        let data = if payload.is_empty() {
            key.to_string()
        } else {
            format!("{key}|{payload}")
        };
        Self {
            text: text.into(),
            callback_data: Some(data),
            url: None,
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            url: Some(url.into()),
        }
    }
}

/// Buttons attached under a message, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.inline_keyboard.push(buttons);
        self
    }
}

/// Optional parameters shared by the send methods.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub parse_mode: Option<ParseMode>,
    pub reply_to: Option<i64>,
    pub disable_notification: bool,
    pub disable_web_page_preview: bool,
    pub reply_markup: Option<InlineKeyboard>,
}

impl SendOptions {
    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    pub fn silent(mut self) -> Self {
        self.disable_notification = true;
        self
    }

    pub fn keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.reply_markup = Some(keyboard);
        self
    }

    fn apply(&self, params: &mut Map<String, Value>, text_message: bool) {
        if let Some(mode) = self.parse_mode {
            params.insert("parse_mode".into(), json!(mode));
        }
        if let Some(id) = self.reply_to {
            params.insert("reply_to_message_id".into(), json!(id));
        }
        if self.disable_notification {
            params.insert("disable_notification".into(), json!(true));
        }
        if text_message && self.disable_web_page_preview {
            params.insert("disable_web_page_preview".into(), json!(true));
        }
        if let Some(ref markup) = self.reply_markup {
            params.insert("reply_markup".into(), json!(markup));
        }
    }
}

/// Kind of file message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Document,
    Audio,
    Video,
    Voice,
}

impl MediaKind {
    /// API method and the parameter that carries the file.
    fn method_and_field(self) -> (&'static str, &'static str) {
        match self {
            Self::Photo => ("sendPhoto", "photo"),
            Self::Document => ("sendDocument", "document"),
            Self::Audio => ("sendAudio", "audio"),
            Self::Video => ("sendVideo", "video"),
            Self::Voice => ("sendVoice", "voice"),
        }
    }
}

impl Bot {
    /// Send a text message.
    pub async fn send<R: Recipient + ?Sized>(
        &self,
        to: &R,
        text: &str,
        opts: &SendOptions,
    ) -> Result<Message, CourierError> {
        let mut params = Map::new();
        params.insert("chat_id".into(), to.chat_id());
        params.insert("text".into(), json!(text));
        opts.apply(&mut params, true);
        self.raw("sendMessage", Value::Object(params)).await
    }

    /// Send a text message in reply to `to`.
    pub async fn reply(
        &self,
        to: &Message,
        text: &str,
        opts: &SendOptions,
    ) -> Result<Message, CourierError> {
        let opts = opts.clone().reply_to(to.message_id);
        self.send(to, text, &opts).await
    }

    /// Send a file. Remote files and URLs are sent by reference; local files
    /// and readers are uploaded.
    pub async fn send_file<R: Recipient + ?Sized>(
        &self,
        to: &R,
        kind: MediaKind,
        file: &FileRef,
        caption: Option<&str>,
        opts: &SendOptions,
    ) -> Result<Message, CourierError> {
        let (method, field) = kind.method_and_field();
        let mut params = Map::new();
        params.insert("chat_id".into(), to.chat_id());
        if let Some(caption) = caption {
            params.insert("caption".into(), json!(caption));
        }
        opts.apply(&mut params, false);

        let by_reference = match file {
            FileRef::Remote { file_id, .. } => Some(file_id.as_str()),
            FileRef::Url(url) => Some(url.as_str()),
            FileRef::Local(_) | FileRef::Reader(_) => None,
        };
        if let Some(reference) = by_reference {
            params.insert(field.into(), json!(reference));
            return self.raw(method, Value::Object(params)).await;
        }

        let bytes = self.files().read_all(file).await?;
        let file_name = file
            .upload_name()
            .unwrap_or_else(|| format!("{}.bin", Uuid::new_v4()));
        debug!("uploading {file_name} via {method}");
        let upload = Upload {
            field: field.to_string(),
            file_name,
            bytes,
        };
        let result = self
            .api()
            .upload(
                method,
                Value::Object(params),
                upload,
                self.settings().request_timeout,
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Answer a callback query so the client stops its progress indicator.
    pub async fn answer_callback(
        &self,
        query: &CallbackQuery,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), CourierError> {
        let mut params = json!({"callback_query_id": query.id});
        if let Some(text) = text {
            params["text"] = json!(text);
            params["show_alert"] = json!(show_alert);
        }
        self.api()
            .call("answerCallbackQuery", params, self.settings().request_timeout)
            .await?;
        Ok(())
    }

    /// Call any API method and decode its result.
    pub async fn raw<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, CourierError> {
        let result = self
            .api()
            .call(method, params, self.settings().request_timeout)
            .await?;
        Ok(serde_json::from_value(result)?)
    }
}
