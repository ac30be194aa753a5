//! # courier-bot
//!
//! Bot client runtime: a long-polling update engine, a dispatcher that
//! routes updates to async handlers, file resolution, and outbound calls.
//!
//! ```ignore
//! let bot = Bot::new(&config).await?;
//! bot.on_command("ping", |ctx: Context| async move {
//!     ctx.reply("pong").await?;
//!     Ok(())
//! });
//! bot.start().await?;
//! ```

pub mod bot;
pub mod dispatcher;
pub mod files;
pub mod handler;
pub mod poller;
pub mod send;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use bot::{Bot, Settings};
pub use dispatcher::Dispatcher;
pub use files::{FileRef, FileResolver};
pub use handler::{Context, Handler, HandlerRegistry, HandlerResult, Route};
pub use poller::{FilterPoller, LongPoller, Poller};
pub use send::{InlineButton, InlineKeyboard, MediaKind, ParseMode, Recipient, SendOptions};
pub use transport::HttpTransport;
