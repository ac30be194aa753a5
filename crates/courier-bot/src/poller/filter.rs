use super::Poller;
use async_trait::async_trait;
use courier_core::{error::CourierError, traits::Transport, types::Update};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

type Predicate = dyn Fn(&Update) -> bool + Send + Sync;

/// Wraps a poller and forwards only the updates `filter` accepts.
///
/// Rejected updates are still consumed: the inner poller's cursor moves
/// past them.
pub struct FilterPoller<P> {
    inner: P,
    filter: Arc<Predicate>,
}

impl<P: Poller> FilterPoller<P> {
    pub fn new(inner: P, filter: impl Fn(&Update) -> bool + Send + Sync + 'static) -> Self {
        Self {
            inner,
            filter: Arc::new(filter),
        }
    }
}

#[async_trait]
impl<P: Poller> Poller for FilterPoller<P> {
    async fn run(
        &self,
        api: Arc<dyn Transport>,
        updates: mpsc::Sender<Update>,
        stop: CancellationToken,
    ) -> Result<(), CourierError> {
        // Single-slot hop so backpressure from `updates` reaches the inner
        // poller almost unchanged.
        let (tx, mut rx) = mpsc::channel::<Update>(1);
        let filter = self.filter.clone();

        let forward = async move {
            while let Some(update) = rx.recv().await {
                if !filter(&update) {
                    debug!(update_id = update.id, "update filtered out");
                    continue;
                }
                if updates.send(update).await.is_err() {
                    break;
                }
            }
        };

        let (result, ()) = tokio::join!(self.inner.run(api, tx, stop), forward);
        result
    }
}
