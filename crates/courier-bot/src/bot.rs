//! The bot façade: wiring, lifecycle, and handler registration.

use crate::{
    dispatcher::{has_discriminator, Dispatcher},
    files::{FileRef, FileResolver},
    handler::{Handler, HandlerRegistry},
    poller::{LongPoller, Poller},
    transport::HttpTransport,
};
use courier_core::{
    config::{validate_token, Config, DispatchMode},
    error::CourierError,
    traits::{FileStream, Transport},
    types::{EventKind, File, User},
};
use serde_json::json;
use std::{
    path::Path,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Runtime settings derived from [`Config`].
#[derive(Debug, Clone)]
pub struct Settings {
    /// Timeout for one-shot calls.
    pub request_timeout: Duration,
    /// Capacity of the poller-to-dispatcher channel.
    pub channel_capacity: usize,
    pub dispatch_mode: DispatchMode,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            request_timeout: config.bot.request_timeout(),
            channel_capacity: config.dispatch.channel_capacity.max(1),
            dispatch_mode: config.dispatch.mode,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

struct BotInner {
    api: Arc<dyn Transport>,
    poller: Arc<dyn Poller>,
    files: FileResolver,
    registry: HandlerRegistry,
    settings: Settings,
    me: User,
    /// Stop token of the current run; `None` while idle.
    running: Mutex<Option<CancellationToken>>,
    /// `true` whenever no run is in progress.
    idle: watch::Sender<bool>,
}

/// A bot: an authorized transport plus the poll/dispatch machinery.
///
/// Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

impl Bot {
    /// Validate the token, build the HTTP transport and long poller from
    /// `config`, and authorize with `getMe`.
    pub async fn new(config: &Config) -> Result<Self, CourierError> {
        validate_token(&config.bot.token)?;
        let api = Arc::new(HttpTransport::new(&config.bot.api_url, &config.bot.token));
        let poller = Arc::new(LongPoller::new(&config.poller));
        Self::connect(api, poller, Settings::from_config(config)).await
    }

    /// Authorize over `api` with `getMe` and assemble a bot.
    pub async fn connect(
        api: Arc<dyn Transport>,
        poller: Arc<dyn Poller>,
        settings: Settings,
    ) -> Result<Self, CourierError> {
        let me = api
            .call("getMe", json!({}), settings.request_timeout)
            .await
            .map_err(|e| match e {
                CourierError::Api { code: 401, .. } | CourierError::Api { code: 404, .. } => {
                    CourierError::Config(format!("bot token rejected: {e}"))
                }
                other => other,
            })?;
        let me: User = serde_json::from_value(me)?;
        info!("authorized as {} (id {})", me.display_name(), me.id);
        Ok(Self::from_parts(api, poller, settings, me))
    }

    /// Assemble a bot without contacting the API.
    pub fn from_parts(
        api: Arc<dyn Transport>,
        poller: Arc<dyn Poller>,
        settings: Settings,
        me: User,
    ) -> Self {
        let files = FileResolver::new(api.clone(), settings.request_timeout);
        let (idle, _) = watch::channel(true);
        Self {
            inner: Arc::new(BotInner {
                api,
                poller,
                files,
                registry: HandlerRegistry::new(),
                settings,
                me,
                running: Mutex::new(None),
                idle,
            }),
        }
    }

    /// The bot's own account, as returned by `getMe`.
    pub fn me(&self) -> &User {
        &self.inner.me
    }

    pub fn api(&self) -> &Arc<dyn Transport> {
        &self.inner.api
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }

    pub fn files(&self) -> &FileResolver {
        &self.inner.files
    }

    // --- Registration ---

    /// Register `handler` for `kind`, optionally only for one command name
    /// or callback key.
    ///
    /// A discriminator registration replaces any earlier one for the same
    /// key; kind-level registrations accumulate and all run.
    pub fn handle(&self, kind: EventKind, discriminator: Option<&str>, handler: impl Handler) {
        if discriminator.is_some() && !has_discriminator(kind) {
            warn!(%kind, "discriminator ignored: {kind} updates are never routed by key");
        }
        self.inner
            .registry
            .register(kind, discriminator, Arc::new(handler));
    }

    /// Handle every update of `kind` that no exact registration claims.
    pub fn on(&self, kind: EventKind, handler: impl Handler) {
        self.handle(kind, None, handler);
    }

    /// Handle `/name` messages. A leading slash in `name` is ignored.
    pub fn on_command(&self, name: &str, handler: impl Handler) {
        let name = name.trim_start_matches('/');
        self.handle(EventKind::Message, Some(name), handler);
    }

    /// Handle callback queries whose data key is `key`.
    pub fn on_callback(&self, key: &str, handler: impl Handler) {
        self.handle(EventKind::CallbackQuery, Some(key), handler);
    }

    // --- Lifecycle ---

    /// Poll and dispatch until [`Bot::stop`] is called or polling fails
    /// permanently.
    ///
    /// Returns after in-flight handlers have finished. Dropping the returned
    /// future stops the run; [`Bot::stop`] then waits for it to wind down.
    pub async fn start(&self) -> Result<(), CourierError> {
        let stop = {
            let mut running = self
                .inner
                .running
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if running.is_some() {
                return Err(CourierError::Runtime("bot is already running".into()));
            }
            let token = CancellationToken::new();
            *running = Some(token.clone());
            token
        };
        self.inner.idle.send_replace(false);

        let guard = stop.clone().drop_guard();
        let supervisor = tokio::spawn(self.clone().supervise(stop));
        let result = match supervisor.await {
            Ok(result) => result,
            Err(e) => {
                self.mark_idle();
                Err(CourierError::Runtime(format!("bot supervisor failed: {e}")))
            }
        };
        guard.disarm();
        result
    }

    /// Run the poller and dispatcher tasks of one run, then mark the bot idle.
    async fn supervise(self, stop: CancellationToken) -> Result<(), CourierError> {
        let (tx, rx) = mpsc::channel(self.inner.settings.channel_capacity);
        let dispatcher = Dispatcher::new(self.clone(), self.inner.settings.dispatch_mode);
        let dispatch_task = tokio::spawn(dispatcher.run(rx));

        let poller = self.inner.poller.clone();
        let api = self.inner.api.clone();
        let poll_task = {
            let stop = stop.clone();
            tokio::spawn(async move { poller.run(api, tx, stop).await })
        };
        info!("bot {} started", self.inner.me.display_name());

        let result = match poll_task.await {
            Ok(result) => result,
            Err(e) => Err(CourierError::Runtime(format!("poller task failed: {e}"))),
        };
        stop.cancel();

        // The poller dropped its sender; the dispatcher drains what is left.
        if let Err(e) = dispatch_task.await {
            error!("dispatcher task failed: {e}");
        }
        self.mark_idle();

        match &result {
            Ok(()) => info!("bot stopped"),
            Err(e) => error!("bot stopped: {e}"),
        }
        result
    }

    fn mark_idle(&self) {
        *self
            .inner
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.inner.idle.send_replace(true);
    }

    /// Signal a running bot to stop without waiting. Safe to call from
    /// inside a handler.
    pub fn request_stop(&self) {
        let running = self
            .inner
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = running.as_ref() {
            info!("stop requested");
            token.cancel();
        }
    }

    /// Stop polling and wait until every delivered update has been handled.
    ///
    /// No-op when the bot is not running. Calling this from a handler would
    /// wait on itself; use [`Bot::request_stop`] there.
    pub async fn stop(&self) {
        self.request_stop();
        let mut idle = self.inner.idle.subscribe();
        let _ = idle.wait_for(|idle| *idle).await;
    }

    pub fn is_running(&self) -> bool {
        !*self.inner.idle.borrow()
    }

    // --- Files ---

    /// File metadata for a server-side file id.
    pub async fn file_by_id(&self, file_id: &str) -> Result<File, CourierError> {
        self.inner.files.file_by_id(file_id).await
    }

    /// Open a stream for `file`. The caller owns and must drop it.
    pub async fn get_file(&self, file: &FileRef) -> Result<FileStream, CourierError> {
        self.inner.files.resolve(file).await
    }

    /// Save `file` to `dest`. Returns the number of bytes written.
    pub async fn download(&self, file: &FileRef, dest: &Path) -> Result<u64, CourierError> {
        self.inner.files.download(file, dest).await
    }
}
