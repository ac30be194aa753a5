//! Handlers, their invocation context, and the routing table.

use crate::{bot::Bot, send::SendOptions};
use async_trait::async_trait;
use courier_core::{
    error::CourierError,
    types::{CallbackQuery, EventKind, Message, Update, User},
};
use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, PoisonError, RwLock},
};

/// What a handler returns. Errors are logged by the dispatcher, never
/// propagated.
pub type HandlerResult = anyhow::Result<()>;

/// Reacts to one update.
///
/// Implemented for every `Fn(Context) -> impl Future<Output = HandlerResult>`,
/// so plain async closures and functions work:
///
/// ```ignore
/// bot.on_command("ping", |ctx: Context| async move {
///     ctx.reply("pong").await?;
///     Ok(())
/// });
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, ctx: Context) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, ctx: Context) -> HandlerResult {
        (self)(ctx).await
    }
}

/// How an update was routed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    /// Matched command name or callback key. `None` when a kind-level
    /// handler took the update.
    pub discriminator: Option<String>,
    /// Command arguments, callback payload, inline query text, or the full
    /// message text for kind-level handlers.
    pub payload: String,
}

/// Everything a handler gets: the bot handle, the update, and its route.
#[derive(Clone)]
pub struct Context {
    bot: Bot,
    update: Arc<Update>,
    route: Route,
}

impl Context {
    pub fn new(bot: Bot, update: Arc<Update>, route: Route) -> Self {
        Self { bot, update, route }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn update(&self) -> &Update {
        &self.update
    }

    pub fn message(&self) -> Option<&Message> {
        self.update.message()
    }

    pub fn callback_query(&self) -> Option<&CallbackQuery> {
        self.update.callback_query()
    }

    pub fn sender(&self) -> Option<&User> {
        self.update.sender()
    }

    pub fn chat_id(&self) -> Option<i64> {
        self.update.chat_id()
    }

    /// The command or callback key this update matched.
    pub fn discriminator(&self) -> Option<&str> {
        self.route.discriminator.as_deref()
    }

    pub fn payload(&self) -> &str {
        &self.route.payload
    }

    /// Payload split on whitespace.
    pub fn args(&self) -> Vec<&str> {
        self.route.payload.split_whitespace().collect()
    }

    /// Send `text` to the chat this update came from.
    ///
    /// Replies to the triggering message when there is one.
    pub async fn reply(&self, text: &str) -> Result<Message, CourierError> {
        if let Some(msg) = self.message() {
            return self.bot.reply(msg, text, &SendOptions::default()).await;
        }
        let chat_id = self
            .update
            .conversation_key()
            .ok_or_else(|| CourierError::NotFound("update has no chat to reply to".into()))?;
        self.bot.send(&chat_id, text, &SendOptions::default()).await
    }

    /// Acknowledge a callback query, optionally showing `text` to the user.
    pub async fn answer(&self, text: Option<&str>) -> Result<(), CourierError> {
        let cb = self
            .callback_query()
            .ok_or_else(|| CourierError::NotFound("update is not a callback query".into()))?;
        self.bot.answer_callback(cb, text, false).await
    }
}

#[derive(Default)]
struct KindRoutes {
    /// One handler per discriminator; re-registering replaces it.
    exact: HashMap<String, Arc<dyn Handler>>,
    /// Kind-level handlers, in registration order.
    fallback: Vec<Arc<dyn Handler>>,
}

/// Handlers resolved for one update.
pub struct Resolved {
    pub handlers: Vec<Arc<dyn Handler>>,
    /// Whether the discriminator matched an exact registration.
    pub exact: bool,
}

/// Routing table keyed by event kind and optional discriminator.
///
/// Safe to mutate while updates are being dispatched; each lookup sees a
/// consistent snapshot.
#[derive(Default)]
pub struct HandlerRegistry {
    routes: RwLock<HashMap<EventKind, KindRoutes>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: EventKind, discriminator: Option<&str>, handler: Arc<dyn Handler>) {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        let entry = routes.entry(kind).or_default();
        match discriminator {
            Some(key) => {
                entry.exact.insert(key.to_string(), handler);
            }
            None => entry.fallback.push(handler),
        }
    }

    /// Exact discriminator match first, kind-level handlers otherwise.
    pub fn resolve(&self, kind: EventKind, discriminator: Option<&str>) -> Resolved {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = routes.get(&kind) else {
            return Resolved {
                handlers: Vec::new(),
                exact: false,
            };
        };
        if let Some(handler) = discriminator.and_then(|key| entry.exact.get(key)) {
            return Resolved {
                handlers: vec![handler.clone()],
                exact: true,
            };
        }
        Resolved {
            handlers: entry.fallback.clone(),
            exact: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .all(|r| r.exact.is_empty() && r.fallback.is_empty())
    }
}
