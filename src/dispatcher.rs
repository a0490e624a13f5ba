//! Event Dispatcher
//!
//! The public face of the beacon. Logging calls never block and never fail: they
//! push a command onto a channel and return. A single worker task owns the
//! dispatch state and runs one command at a time, so session resolution,
//! client-id resolution, and the outbound GET for one event finish before the
//! next command starts. Callers get no completion or error signal; a failed send
//! is a lost event.

use crate::client_id;
use crate::config::TaggingConfig;
use crate::error::TaggingError;
use crate::event::{AnalyticsEvent, Hit};
use crate::platform::Platform;
use crate::session::SessionTracker;
use crate::store::{IdentityStore, KeyValueStore};
use crate::transport::{HttpTransport, Transport};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Work for the dispatch worker
enum Command {
    Event(AnalyticsEvent),
    SetExperimentId(String),
    Flush(oneshot::Sender<()>),
}

impl Command {
    fn kind(&self) -> &'static str {
        match self {
            Command::Event(_) => "event",
            Command::SetExperimentId(_) => "set_experiment_id",
            Command::Flush(_) => "flush",
        }
    }
}

/// State owned by the dispatch worker. Every write to identity or the
/// experiment id happens inside [`DispatchState::handle`].
struct DispatchState {
    config: Arc<TaggingConfig>,
    store: IdentityStore,
    sessions: SessionTracker,
    platform: Platform,
    transport: Arc<dyn Transport>,
    experiment_id: Arc<RwLock<Option<String>>>,
}

impl DispatchState {
    async fn run(self, mut commands: mpsc::UnboundedReceiver<Command>) {
        info!(
            base_url = %self.config.base_url,
            session_timeout_minutes = self.sessions.timeout_minutes(),
            "Started dispatch worker"
        );
        while let Some(command) = commands.recv().await {
            self.handle(command).await;
        }
        info!("Stopped dispatch worker");
    }

    async fn handle(&self, command: Command) {
        match command {
            Command::Event(event) => self.dispatch(event).await,
            Command::SetExperimentId(id) => self.assign_experiment(id),
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    async fn dispatch(&self, event: AnalyticsEvent) {
        let hit = self.build_hit(event);
        let query = hit.query();
        match self.transport.get(&self.config.base_url, &query).await {
            Ok(()) => debug!(
                action = %hit.event.name,
                session_id = %hit.session_id,
                "Sent event"
            ),
            Err(e) => debug!(action = %hit.event.name, error = %e, "Dropped event"),
        }
    }

    fn build_hit(&self, event: AnalyticsEvent) -> Hit {
        // Storage runs on a local copy; readers never wait on it.
        let before = self.experiment_id.read().clone();
        let mut experiment_id = before.clone();
        let session = self.sessions.resolve(&mut experiment_id);
        if experiment_id != before {
            *self.experiment_id.write() = experiment_id.clone();
        }
        let client_id = client_id::get_or_create(
            &self.store,
            self.platform.clock.as_ref(),
            self.platform.random.as_ref(),
        );

        Hit {
            tracking_id: self.config.tracking_id.clone(),
            client_id,
            session_id: session.session_id,
            user_id: self.store.user_id().unwrap_or_default(),
            braze_id: self.store.braze_id().unwrap_or_default(),
            user_agent: self.config.user_agent.clone(),
            experiment_id,
            platform: self.platform.name.clone(),
            event,
        }
    }

    /// Anchor the experiment to a new session boundary. The forced rotation
    /// keeps the id just assigned.
    fn assign_experiment(&self, id: String) {
        debug!(experiment_id = %id, "Assigned experiment id");
        *self.experiment_id.write() = Some(id);
        self.sessions.rotate();
    }
}

/// Sends analytics events to the collection endpoint
pub struct DataTaggingManager {
    config: Arc<TaggingConfig>,
    commands: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    experiment_id: Arc<RwLock<Option<String>>>,
}

impl DataTaggingManager {
    /// Wire a manager from explicit collaborators and start its worker on the
    /// current tokio runtime.
    pub fn new(
        config: TaggingConfig,
        storage: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
        platform: Platform,
    ) -> Result<Self, TaggingError> {
        config.validate()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TaggingError::RuntimeUnavailable)?;

        let config = Arc::new(config);
        let store = IdentityStore::new(storage);
        let experiment_id = Arc::new(RwLock::new(None));
        let state = DispatchState {
            config: Arc::clone(&config),
            sessions: SessionTracker::new(
                store.clone(),
                platform.clone(),
                config.session_timeout_minutes,
            ),
            store,
            platform,
            transport,
            experiment_id: Arc::clone(&experiment_id),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = runtime.spawn(state.run(rx));

        Ok(Self {
            config,
            commands: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            experiment_id,
        })
    }

    /// HTTP transport and the system platform.
    pub fn create(config: TaggingConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self, TaggingError> {
        let transport = HttpTransport::new(&config.http, &config.user_agent)?;
        Self::new(config, storage, Arc::new(transport), Platform::system())
    }

    pub fn development(storage: Arc<dyn KeyValueStore>) -> Result<Self, TaggingError> {
        Self::create(TaggingConfig::development(), storage)
    }

    pub fn uat(storage: Arc<dyn KeyValueStore>) -> Result<Self, TaggingError> {
        Self::create(TaggingConfig::uat(), storage)
    }

    pub fn production(storage: Arc<dyn KeyValueStore>) -> Result<Self, TaggingError> {
        Self::create(TaggingConfig::production(), storage)
    }

    pub fn config(&self) -> &TaggingConfig {
        &self.config
    }

    /// Log an analytics event
    pub fn log_event(&self, event: AnalyticsEvent) {
        self.schedule(Command::Event(event));
    }

    /// Log an event from its parts
    pub fn log_event_parts(
        &self,
        action: impl Into<String>,
        location: impl Into<String>,
        event_type: impl Into<String>,
        path: impl Into<String>,
        params: Option<BTreeMap<String, String>>,
    ) {
        let event = AnalyticsEvent::new(action, location, path)
            .with_type(event_type)
            .with_params(params.unwrap_or_default());
        self.log_event(event);
    }

    /// Log a screen view event
    pub fn log_screen_view(&self, path: impl Into<String>, params: Option<BTreeMap<String, String>>) {
        let event = AnalyticsEvent::screen_view(path).with_params(params.unwrap_or_default());
        self.log_event(event);
    }

    /// Set the experiment id for A/B testing; also starts a new session
    pub fn set_experiment_id(&self, id: impl Into<String>) {
        self.schedule(Command::SetExperimentId(id.into()));
    }

    /// Current experiment id. Reflects only commands the worker has finished.
    pub fn experiment_id(&self) -> Option<String> {
        self.experiment_id.read().clone()
    }

    /// Wait until every command scheduled before this call has run.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.schedule(Command::Flush(done)) {
            let _ = wait.await;
        }
    }

    /// Stop accepting commands, drain the queue, and wait for the worker to exit.
    pub async fn shutdown(&self) {
        drop(self.commands.lock().take());
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }

    fn schedule(&self, command: Command) -> bool {
        let commands = self.commands.lock();
        let Some(tx) = commands.as_ref() else {
            debug!(command = command.kind(), "Manager shut down, dropping command");
            return false;
        };
        match tx.send(command) {
            Ok(()) => true,
            Err(mpsc::error::SendError(command)) => {
                debug!(command = command.kind(), "Dispatch worker gone, dropping command");
                false
            }
        }
    }
}

impl std::fmt::Debug for DataTaggingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataTaggingManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
