use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::ccs::server::run_crane_server;
use crate::ccs::{CcsPoller, HttpCraneClient};
use crate::config::TamsConfig;
use crate::error::{Result, TamsError};
use crate::metrics::MetricStore;
use crate::state::JobState;
use crate::storage::Storage;
use crate::web::{run_web_server, Messages, UiMode};

/// Shared handles passed to both HTTP listeners and the poller.
///
/// Whenever jobs and storage are both locked, `jobs` is taken first.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<RwLock<JobState>>,
    pub storage: Arc<RwLock<Storage>>,
    pub messages: Arc<Messages>,
    pub metrics: Arc<MetricStore>,
    pub mode: Arc<RwLock<UiMode>>,
}

impl AppState {
    pub fn new(jobs: JobState, storage: Storage) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(jobs)),
            storage: Arc::new(RwLock::new(storage)),
            messages: Arc::new(Messages::new()),
            metrics: Arc::new(MetricStore::new()),
            mode: Arc::new(RwLock::new(UiMode::default())),
        }
    }
}

/// The coordinator process: poller, crane listener and UI listener.
pub struct App {
    pub config: TamsConfig,
    state: AppState,
}

impl App {
    /// Load the yard from the snapshot file if there is one, otherwise seed it
    /// from the configured stacks.
    pub fn new(config: TamsConfig) -> Result<Self> {
        if config.poll_interval_ms == 0 {
            return Err(TamsError::Config("poll interval must be positive".to_string()));
        }

        let storage = if config.snapshot_path.exists() {
            Storage::import_json(&config.snapshot_path)?
        } else {
            tracing::info!(
                path = %config.snapshot_path.display(),
                stacks = config.stacks.len(),
                "No yard snapshot, seeding from configuration"
            );
            Storage::new(config.seed_stacks())
        };

        let state = AppState::new(JobState::new(config.verbose), storage);
        Ok(Self { config, state })
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run until `shutdown` is cancelled, then export the yard snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the crane client cannot be built or the final
    /// snapshot cannot be written. Listener failures are logged by the
    /// listeners themselves.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let crane = HttpCraneClient::new(
            &self.config.ccs_url,
            Duration::from_millis(self.config.request_timeout_ms),
        )?;

        let poller = CcsPoller::new(
            crane,
            self.state.clone(),
            Duration::from_millis(self.config.poll_interval_ms),
        );
        let poller_shutdown = shutdown.clone();
        let poller_task = tokio::spawn(async move {
            poller.run(poller_shutdown).await;
        });

        let crane_state = self.state.clone();
        let crane_addr = self.config.crane_listen_addr;
        let crane_shutdown = shutdown.clone();
        let log_calls = self.config.log_web_calls;
        let crane_task = tokio::spawn(async move {
            run_crane_server(crane_addr, crane_state, log_calls, crane_shutdown).await;
        });

        let web_state = self.state.clone();
        let web_addr = self.config.web_listen_addr;
        let web_shutdown = shutdown.clone();
        let web_task = tokio::spawn(async move {
            run_web_server(web_addr, web_state, log_calls, web_shutdown).await;
        });

        tracing::info!(ccs_url = %self.config.ccs_url, "TAMS running");
        shutdown.cancelled().await;

        for (name, task) in [
            ("poller", poller_task),
            ("crane server", crane_task),
            ("web server", web_task),
        ] {
            if let Err(e) = task.await {
                tracing::error!(task = name, error = %e, "Task ended abnormally");
            }
        }

        self.state
            .storage
            .read()
            .await
            .export_json(&self.config.snapshot_path)?;
        tracing::info!("Shutdown complete");
        Ok(())
    }
}
