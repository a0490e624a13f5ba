//! CLI route: single route table and run context. Drives the library and
//! hands results to presentation.

use crate::cli::parse::{Cli, Commands};
use crate::cli::presentation::{
    format_decode_text, format_identity_json, format_identity_text, IdentityReport,
};
use crate::config::{ConfigLoader, TaggingConfig};
use crate::dispatcher::DataTaggingManager;
use crate::error::TaggingError;
use crate::event::AnalyticsEvent;
use crate::identifier;
use crate::platform::Platform;
use crate::session;
use crate::store::{IdentityStore, SledStore};
use crate::transport::HttpTransport;
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Default identity store location under the user data directory.
pub fn default_store_path() -> PathBuf {
    ProjectDirs::from("com", "datatag", "datatag")
        .map(|dirs| dirs.data_dir().join("identity"))
        .unwrap_or_else(|| PathBuf::from(".datatag/identity"))
}

/// Runtime context for CLI execution: resolved config, store location, platform.
pub struct RunContext {
    config: TaggingConfig,
    store_path: PathBuf,
    platform: Platform,
}

impl RunContext {
    pub fn new(config: TaggingConfig, store_path: Option<PathBuf>, platform_name: Option<String>) -> Self {
        let platform = match platform_name {
            Some(name) => Platform::system().with_name(name),
            None => Platform::system(),
        };
        Self {
            config,
            store_path: store_path.unwrap_or_else(default_store_path),
            platform,
        }
    }

    /// Resolve config from `--env`, `--config` and `DATATAG_*` variables.
    pub fn from_cli(cli: &Cli) -> Result<Self, TaggingError> {
        let config = ConfigLoader::load(cli.env, cli.config.as_deref())?;
        Ok(Self::new(config, cli.store.clone(), cli.platform.clone()))
    }

    pub fn config(&self) -> &TaggingConfig {
        &self.config
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub async fn execute(&self, command: &Commands) -> Result<String, TaggingError> {
        match command {
            Commands::Event {
                action,
                location,
                event_type,
                path,
                params,
            } => {
                let event = AnalyticsEvent::new(action.as_str(), location.as_str(), path.as_str())
                    .with_type(event_type.as_str())
                    .with_params(collect_params(params));
                self.send(event).await
            }
            Commands::ScreenView { path, params } => {
                let event = AnalyticsEvent::screen_view(path.as_str()).with_params(collect_params(params));
                self.send(event).await
            }
            Commands::Experiment { id } => self.assign_experiment(id).await,
            Commands::Identify { user_id, braze_id } => self.identify(user_id.as_deref(), braze_id.as_deref()),
            Commands::Identity { format } => self.identity(format),
            Commands::Decode { identifier } => decode(identifier),
        }
    }

    fn open_store(&self) -> Result<Arc<SledStore>, TaggingError> {
        debug!(path = %self.store_path().display(), "Opening identity store");
        Ok(Arc::new(SledStore::open(self.store_path())?))
    }

    fn manager(&self, storage: Arc<SledStore>) -> Result<DataTaggingManager, TaggingError> {
        let transport = HttpTransport::new(&self.config.http, &self.config.user_agent)?;
        DataTaggingManager::new(
            self.config.clone(),
            storage,
            Arc::new(transport),
            self.platform.clone(),
        )
    }

    async fn send(&self, event: AnalyticsEvent) -> Result<String, TaggingError> {
        let storage = self.open_store()?;
        let manager = self.manager(Arc::clone(&storage))?;
        let summary = format!("Dispatched '{}' on {} to {}", event.name, event.path, self.config.base_url);
        manager.log_event(event);
        manager.shutdown().await;
        info!(base_url = %self.config.base_url, "Event dispatched");
        Ok(summary)
    }

    async fn assign_experiment(&self, id: &str) -> Result<String, TaggingError> {
        let storage = self.open_store()?;
        let manager = self.manager(Arc::clone(&storage))?;
        manager.set_experiment_id(id);
        manager.shutdown().await;

        let session_id = IdentityStore::new(storage).session_id().unwrap_or_default();
        Ok(format!("Experiment '{}' assigned; new session {}", id, session_id))
    }

    fn identify(&self, user_id: Option<&str>, braze_id: Option<&str>) -> Result<String, TaggingError> {
        if user_id.is_none() && braze_id.is_none() {
            return Err(TaggingError::InvalidArgument(
                "identify needs --user-id and/or --braze-id".to_string(),
            ));
        }
        let store = IdentityStore::new(self.open_store()?);
        let mut updated = Vec::new();
        if let Some(user_id) = user_id {
            store.set_user_id(user_id);
            updated.push("user id");
        }
        if let Some(braze_id) = braze_id {
            store.set_braze_id(braze_id);
            updated.push("braze id");
        }
        Ok(format!("Stored {}", updated.join(" and ")))
    }

    fn identity(&self, format: &str) -> Result<String, TaggingError> {
        let store = IdentityStore::new(self.open_store()?);
        let session_id = store.session_id();
        let report = IdentityReport {
            session_state: session::classify(
                session_id.as_deref(),
                self.platform.now_millis(),
                self.config.session_timeout_minutes,
            ),
            session_started_ms: session_id.as_deref().and_then(identifier::decode),
            session_id,
            session_timeout_minutes: self.config.session_timeout_minutes,
            client_id: store.client_id(),
            user_id: store.user_id(),
            braze_id: store.braze_id(),
        };
        match format {
            "json" => Ok(format_identity_json(&report)),
            "text" => Ok(format_identity_text(&report)),
            other => Err(TaggingError::InvalidArgument(format!(
                "unknown format '{}' (expected text or json)",
                other
            ))),
        }
    }
}

fn collect_params(params: &[(String, String)]) -> BTreeMap<String, String> {
    params.iter().cloned().collect()
}

fn decode(raw: &str) -> Result<String, TaggingError> {
    match identifier::decode(raw) {
        Some(millis) => Ok(format_decode_text(raw, millis)),
        None => Err(TaggingError::InvalidArgument(format!(
            "'{}' is not a session identifier",
            raw
        ))),
    }
}
