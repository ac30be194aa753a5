//! Update dispatch: routing, ordering, and handler isolation.

pub mod command;


pub use command::{parse_callback_data, parse_command, Command};

use crate::{
    bot::Bot,
    handler::{Context, Route},
};
use courier_core::{
    config::DispatchMode,
    types::{EventKind, Update, UpdateKind, User},
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, PoisonError},
};
use tokio::{
    sync::{mpsc, OwnedSemaphorePermit, Semaphore},
    task::JoinSet,
};
use tracing::{debug, error, info, warn};

/// An update plus the slot it occupies until its handlers finish.
type Slotted = (Update, OwnedSemaphorePermit);

/// Pending updates per conversation. A key is present while a worker is
/// draining that conversation.
type Lanes = Arc<Mutex<HashMap<i64, VecDeque<Slotted>>>>;

/// Consumes the update channel and invokes registered handlers.
///
/// At most `limit` updates are buffered or being handled at once; past
/// that the dispatcher stops receiving, the channel fills, and the poller
/// blocks.
#[derive(Clone)]
pub struct Dispatcher {
    bot: Bot,
    mode: DispatchMode,
    limit: usize,
}

impl Dispatcher {
    /// Dispatcher whose in-flight limit is the bot's channel capacity.
    pub fn new(bot: Bot, mode: DispatchMode) -> Self {
        let limit = bot.settings().channel_capacity.max(1);
        Self { bot, mode, limit }
    }

    /// Cap on updates buffered or being handled at once.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Dispatch until the channel closes, then wait for in-flight handlers.
    pub async fn run(self, mut updates: mpsc::Receiver<Update>) {
        let mut tasks = JoinSet::new();
        let lanes: Lanes = Arc::default();
        let slots = Arc::new(Semaphore::new(self.limit));
        info!(mode = ?self.mode, limit = self.limit, "dispatcher started");

        loop {
            // Take a slot before receiving, so a saturated dispatcher
            // leaves updates in the channel.
            let Ok(slot) = slots.clone().acquire_owned().await else {
                break;
            };
            let Some(update) = updates.recv().await else {
                break;
            };
            match self.mode {
                DispatchMode::Sequential => {
                    self.deliver(update).await;
                    drop(slot);
                }
                DispatchMode::Concurrent => self.spawn_one(&mut tasks, update, slot),
                DispatchMode::PerChat => match update.conversation_key() {
                    Some(key) => self.enqueue(&lanes, &mut tasks, key, (update, slot)),
                    None => self.spawn_one(&mut tasks, update, slot),
                },
            }
            // Reap finished workers so the set does not grow unbounded.
            while tasks.try_join_next().is_some() {}
        }

        let in_flight = tasks.len();
        if in_flight > 0 {
            debug!(in_flight, "waiting for handlers to finish");
        }
        while tasks.join_next().await.is_some() {}
        info!("dispatcher drained");
    }

    fn spawn_one(&self, tasks: &mut JoinSet<()>, update: Update, slot: OwnedSemaphorePermit) {
        let this = self.clone();
        tasks.spawn(async move {
            this.deliver(update).await;
            drop(slot);
        });
    }

    /// Queue `update` behind its conversation, starting a worker if that
    /// conversation is idle.
    fn enqueue(&self, lanes: &Lanes, tasks: &mut JoinSet<()>, key: i64, item: Slotted) {
        {
            let mut active = lanes.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(queue) = active.get_mut(&key) {
                debug!(chat = key, update_id = item.0.id, "conversation busy, buffering update");
                queue.push_back(item);
                return;
            }
            active.insert(key, VecDeque::new());
        }

        let this = self.clone();
        let lanes = lanes.clone();
        tasks.spawn(async move {
            let (update, slot) = item;
            this.deliver(update).await;
            drop(slot);
            loop {
                let next = {
                    let mut active = lanes.lock().unwrap_or_else(PoisonError::into_inner);
                    match active.get_mut(&key).and_then(VecDeque::pop_front) {
                        Some(next) => Some(next),
                        None => {
                            active.remove(&key);
                            None
                        }
                    }
                };
                match next {
                    Some((next, slot)) => {
                        this.deliver(next).await;
                        drop(slot);
                    }
                    None => break,
                }
            }
        });
    }

    /// Route one update and run its handlers to completion.
    ///
    /// Every handler runs in its own task, so a panic or error in one never
    /// reaches the others or the dispatch loop.
    pub async fn deliver(&self, update: Update) {
        let Some(kind) = update.kind.event_kind() else {
            debug!(update_id = update.id, "no handler for unknown update kind");
            return;
        };

        let mut route = route_for(&update, self.bot.me());
        let resolved = self
            .bot
            .registry()
            .resolve(kind, route.discriminator.as_deref());
        if resolved.handlers.is_empty() {
            debug!(update_id = update.id, %kind, "no handler registered");
            return;
        }
        if !resolved.exact && route.discriminator.take().is_some() {
            route.payload = fallback_payload(&update);
        }

        let update_id = update.id;
        let update = Arc::new(update);
        let mut running = Vec::with_capacity(resolved.handlers.len());
        for handler in resolved.handlers {
            let ctx = Context::new(self.bot.clone(), update.clone(), route.clone());
            running.push(tokio::spawn(async move { handler.handle(ctx).await }));
        }

        for task in running {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(update_id, %kind, "handler failed: {e:#}"),
                Err(e) if e.is_panic() => error!(update_id, %kind, "handler panicked"),
                Err(e) => warn!(update_id, %kind, "handler task aborted: {e}"),
            }
        }
    }
}

/// Discriminator and payload for `update`.
///
/// Commands addressed to a different bot carry no discriminator.
pub fn route_for(update: &Update, me: &User) -> Route {
    match &update.kind {
        UpdateKind::Message(m)
        | UpdateKind::EditedMessage(m)
        | UpdateKind::ChannelPost(m)
        | UpdateKind::EditedChannelPost(m) => {
            let text = m.text_or_caption().unwrap_or_default();
            match parse_command(text) {
                Some(cmd) if cmd.is_for(me.username.as_deref()) => Route {
                    discriminator: Some(cmd.name.to_string()),
                    payload: cmd.payload.to_string(),
                },
                _ => Route {
                    discriminator: None,
                    payload: text.to_string(),
                },
            }
        }
        UpdateKind::CallbackQuery(cb) => {
            let (key, payload) = parse_callback_data(cb.data.as_deref().unwrap_or_default());
            Route {
                discriminator: Some(key.to_string()).filter(|k| !k.is_empty()),
                payload: payload.to_string(),
            }
        }
        UpdateKind::InlineQuery(q) => Route {
            discriminator: None,
            payload: q.query.clone(),
        },
        UpdateKind::ChosenInlineResult(r) => Route {
            discriminator: None,
            payload: r.query.clone(),
        },
        _ => Route::default(),
    }
}

/// Payload handed to kind-level handlers: the raw text or callback data.
fn fallback_payload(update: &Update) -> String {
    match &update.kind {
        UpdateKind::CallbackQuery(cb) => cb.data.clone().unwrap_or_default(),
        _ => update
            .message()
            .and_then(|m| m.text_or_caption())
            .unwrap_or_default()
            .to_string(),
    }
}

/// Whether `kind` is routed by discriminator at all.
pub fn has_discriminator(kind: EventKind) -> bool {
    kind.carries_message() || kind == EventKind::CallbackQuery
}
