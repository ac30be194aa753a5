//! Bot API object model.
//!
//! These are inert records deserialized from API responses. The only
//! behavior they carry is classification ([`Update`]) and UTF-16 aware
//! entity slicing ([`MessageEntity::text_in`]).

mod entity;
mod media;
mod member;
mod message;
mod payments;
mod poll;
mod query;
mod update;
mod user;

#[cfg(test)]
mod tests;

pub use entity::{utf16_len, utf16_slice, MessageEntity};
pub use media::{Audio, Document, File, PhotoSize, Sticker, Video, Voice};
pub use member::{ChatInviteLink, ChatMember, ChatMemberUpdated};
pub use message::{Location, Message};
pub use payments::{OrderInfo, PreCheckoutQuery, ShippingAddress, ShippingQuery};
pub use poll::{Poll, PollAnswer, PollOption};
pub use query::{CallbackQuery, ChosenInlineResult, InlineQuery};
pub use update::{EventKind, Update, UpdateKind};
pub use user::{Chat, User};
