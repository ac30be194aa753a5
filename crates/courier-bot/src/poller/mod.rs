//! Update sources.
//!
//! A [`Poller`] fetches updates and pushes them, in ascending id order, into
//! a bounded channel until told to stop. [`LongPoller`] drives `getUpdates`
//! with an offset cursor; [`FilterPoller`] wraps any poller with a predicate.

pub mod backoff;
mod filter;


pub use backoff::{Backoff, BackoffPolicy};
pub use filter::FilterPoller;

use async_trait::async_trait;
use courier_core::{
    config::PollerConfig,
    error::CourierError,
    traits::{OffsetStore, Transport},
    types::Update,
};
use serde_json::{json, Value};
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Extra time the HTTP client waits beyond the server-side poll timeout.
const HTTP_MARGIN: Duration = Duration::from_secs(10);

/// A source of updates.
#[async_trait]
pub trait Poller: Send + Sync {
    /// Push updates into `updates` until `stop` fires, the receiver is
    /// dropped, or an unrecoverable error occurs.
    ///
    /// Returns `Ok(())` on a clean stop. Blocks on a full channel.
    async fn run(
        &self,
        api: Arc<dyn Transport>,
        updates: mpsc::Sender<Update>,
        stop: CancellationToken,
    ) -> Result<(), CourierError>;
}

/// Long-polling `getUpdates` loop.
///
/// The cursor only advances past updates that were handed to the channel,
/// and every request acknowledges everything below it.
///
/// Server-reported errors end the run, except 5xx gateway failures, which
/// are retried with backoff like network errors.
pub struct LongPoller {
    timeout: Duration,
    limit: u32,
    allowed_updates: Vec<String>,
    backoff: BackoffPolicy,
    store: Option<Arc<dyn OffsetStore>>,
    /// Cursor left by the previous `run`, picked up by the next one.
    resume: Mutex<Option<i64>>,
}

impl LongPoller {
    pub fn new(config: &PollerConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            limit: config.limit.clamp(1, 100),
            allowed_updates: config.allowed_updates.clone(),
            backoff: BackoffPolicy::from_config(config),
            store: None,
            resume: Mutex::new(None),
        }
    }

    /// Persist the cursor so a restarted process resumes where it left off.
    pub fn with_store(mut self, store: Arc<dyn OffsetStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Start from `offset` instead of 0 (or the stored cursor).
    pub fn with_offset(self, offset: i64) -> Self {
        *self.resume.lock().unwrap_or_else(PoisonError::into_inner) = Some(offset);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Cursor the next `run` starts from, if one is known in memory.
    pub fn offset(&self) -> Option<i64> {
        *self.resume.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn initial_cursor(&self) -> i64 {
        if let Some(offset) = self.offset() {
            return offset;
        }
        let Some(store) = &self.store else {
            return 0;
        };
        match store.load().await {
            Ok(Some(offset)) => {
                info!(offset, "resuming from stored offset");
                offset
            }
            Ok(None) => 0,
            Err(e) => {
                warn!("failed to load stored offset, starting from 0: {e}");
                0
            }
        }
    }

    async fn persist(&self, offset: i64) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(offset).await {
                warn!(offset, "failed to save offset: {e}");
            }
        }
    }

    fn request(&self, offset: i64) -> Value {
        let mut params = json!({
            "offset": offset,
            "timeout": self.timeout.as_secs(),
            "limit": self.limit,
        });
        if !self.allowed_updates.is_empty() {
            params["allowed_updates"] = json!(self.allowed_updates);
        }
        params
    }
}

/// A decoded `getUpdates` result.
#[derive(Debug, Default)]
struct Batch {
    /// Fresh updates, ascending by id.
    updates: Vec<Update>,
    /// Highest id seen + 1, counting entries that failed to decode.
    next_offset: Option<i64>,
}

/// Decode a batch entry by entry so one malformed update cannot stall the
/// cursor. Entries below `cursor` were already consumed and are dropped.
fn decode_batch(result: Value, cursor: i64) -> Result<Batch, CourierError> {
    let Value::Array(entries) = result else {
        return Err(CourierError::api(
            500,
            format!("getUpdates returned a non-array result: {result}"),
        ));
    };

    let mut batch = Batch::default();
    for entry in entries {
        let id = entry.get("update_id").and_then(Value::as_i64);
        if let Some(id) = id {
            batch.next_offset = Some(batch.next_offset.map_or(id + 1, |n| n.max(id + 1)));
        }
        match serde_json::from_value::<Update>(entry) {
            Ok(update) if update.id >= cursor => batch.updates.push(update),
            Ok(update) => debug!(update_id = update.id, cursor, "dropping redelivered update"),
            Err(e) => warn!(update_id = ?id, "skipping undecodable update: {e}"),
        }
    }
    batch.updates.sort_by_key(|u| u.id);
    batch.updates.dedup_by_key(|u| u.id);
    Ok(batch)
}

/// Sleep for `delay` unless `stop` fires first. Returns false when stopped.
async fn sleep_or_stop(delay: Duration, stop: &CancellationToken) -> bool {
    tokio::select! {
        _ = stop.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[async_trait]
impl Poller for LongPoller {
    async fn run(
        &self,
        api: Arc<dyn Transport>,
        updates: mpsc::Sender<Update>,
        stop: CancellationToken,
    ) -> Result<(), CourierError> {
        let mut cursor = self.initial_cursor().await;
        let mut backoff = Backoff::new(self.backoff);
        info!(offset = cursor, "long poller started");

        let result = loop {
            if stop.is_cancelled() {
                break Ok(());
            }

            let fetched = api
                .call("getUpdates", self.request(cursor), self.timeout + HTTP_MARGIN)
                .await
                .and_then(|result| decode_batch(result, cursor));

            let batch = match fetched {
                Ok(batch) => {
                    backoff.reset();
                    batch
                }
                Err(e) => {
                    let delay = if let Some(secs) = e.retry_after() {
                        warn!("rate limited, retrying in {secs}s");
                        Duration::from_secs(secs)
                    } else if e.is_transient() {
                        let delay = backoff.next_delay();
                        warn!(
                            attempt = backoff.attempt(),
                            "getUpdates failed, retrying in {delay:?}: {e}"
                        );
                        delay
                    } else {
                        error!("getUpdates failed permanently: {e}");
                        break Err(e);
                    };
                    if sleep_or_stop(delay, &stop).await {
                        continue;
                    }
                    break Ok(());
                }
            };

            // Hand the batch over in order. A full channel blocks here, which
            // in turn holds back the next fetch.
            let mut receiver_gone = false;
            for update in batch.updates {
                let id = update.id;
                if updates.send(update).await.is_err() {
                    receiver_gone = true;
                    break;
                }
                cursor = id + 1;
            }

            if receiver_gone {
                info!("update receiver dropped, stopping poller");
                self.persist(cursor).await;
                break Ok(());
            }

            if let Some(next) = batch.next_offset {
                cursor = cursor.max(next);
                self.persist(cursor).await;
            }
        };

        *self.resume.lock().unwrap_or_else(PoisonError::into_inner) = Some(cursor);
        info!(offset = cursor, "long poller stopped");
        result
    }
}
