//! Reusable stayline server runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: database init and migrations,
//! the booking services, the stay scheduler, the notification dispatcher,
//! the REST API and graceful shutdown.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{
    AvailabilityService, BookingService, LockRegistry, PricingService, RefundService,
    StayScheduler,
};
use crate::config::{AppConfig, LogFormat};
use crate::domain::RepositoryProvider;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::database::repositories::SeaOrmRepositoryProvider;
use crate::infrastructure::database::seed::seed_demo_catalog;
use crate::infrastructure::init_database;
use crate::interfaces::http::modules::health::HealthState;
use crate::interfaces::http::modules::metrics::MetricsState;
use crate::interfaces::http::{create_api_router, AppState};
use crate::notifications::{EventBus, LogNotificationSender, NotificationDispatcher, SharedEventBus};
use crate::shared::{listen_for_shutdown_signals, Clock, InfraError, ShutdownSignal, SystemClock};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the server.
pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
    /// Load the demo room catalog and discount codes (default: false).
    pub seed_demo: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            seed_demo: false,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running stayline server.
///
/// ```rust,no_run
/// use stayline::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.shutdown_signal().wait().await;
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub event_bus: SharedEventBus,
    pub repos: Arc<dyn RepositoryProvider>,
    pub bookings: Arc<BookingService>,
    pub config: AppConfig,
    pub api_port: u16,

    db: DatabaseConnection,
    shutdown: ShutdownSignal,
    api_task: JoinHandle<()>,
    background: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Start the server.
    ///
    /// 1. Install the Prometheus recorder
    /// 2. Connect to the database, migrate and optionally seed
    /// 3. Build the services on one lock registry and event bus
    /// 4. Start the notification dispatcher and the stay scheduler
    /// 5. Serve the REST API (with Swagger UI)
    pub async fn start(opts: ServerOptions) -> Result<Self, InfraError> {
        let config = opts.config;
        info!("Starting stayline...");

        let prometheus = prometheus_handle()?;
        info!("📊 Prometheus metrics recorder ready");

        config.validate()?;
        let policy = config.stay_policy()?;
        let status_codes = Arc::new(config.status_table()?);
        info!(
            timezone = %config.hotel.timezone,
            check_in_hour = config.hotel.check_in_hour,
            check_out_hour = config.hotel.check_out_hour,
            "🏨 Hotel calendar configured"
        );

        // ── Database ───────────────────────────────────────────
        let db = init_database(&config.database.to_database_config()).await?;

        if opts.auto_migrate {
            info!("Running database migrations...");
            Migrator::up(&db, None).await?;
            info!("Migrations completed");
        }

        if opts.seed_demo {
            seed_demo_catalog(&db).await?;
            info!("🌱 Demo catalog loaded");
        }

        // ── Services ───────────────────────────────────────────
        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let locks = Arc::new(LockRegistry::new(config.lock_wait_timeout()));
        let event_bus: SharedEventBus =
            Arc::new(EventBus::with_capacity(config.notifications.queue_size));
        info!("🔔 Event bus initialized");

        let bookings = Arc::new(BookingService::new(
            repos.clone(),
            locks.clone(),
            event_bus.clone(),
            clock.clone(),
            policy.clone(),
        ));
        let availability = Arc::new(AvailabilityService::new(
            repos.clone(),
            clock.clone(),
            policy.clone(),
        ));
        let pricing = Arc::new(PricingService::new(repos.clone(), clock.clone(), policy));
        let refunds = Arc::new(RefundService::new(
            repos.clone(),
            locks.clone(),
            event_bus.clone(),
            clock.clone(),
        ));

        // ── Background tasks ───────────────────────────────────
        let shutdown = ShutdownSignal::new();
        let mut background = Vec::new();

        let dispatcher =
            NotificationDispatcher::new(Arc::new(LogNotificationSender), config.retry_config());
        background.push(dispatcher.start(&event_bus, shutdown.clone()));

        let scheduler = Arc::new(StayScheduler::new(
            bookings.clone(),
            repos.clone(),
            locks,
            clock,
            config.scheduler_config(),
        ));
        if scheduler.config().enabled {
            background.push(scheduler.clone().start(shutdown.clone()));
        } else {
            warn!("Stay scheduler disabled; unpaid and no-show bookings will not expire");
        }

        // ── REST API server ────────────────────────────────────
        let router = create_api_router(AppState {
            bookings: bookings.clone(),
            availability,
            pricing,
            refunds,
            scheduler: scheduler.clone(),
            status_codes,
            health: HealthState {
                db: db.clone(),
                scheduler,
                started_at: Arc::new(Instant::now()),
            },
            metrics: MetricsState { handle: prometheus },
        });

        let api_addr = format!("{}:{}", config.server.api_host, config.server.api_port);
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        // port 0 binds an ephemeral port
        let api_port = listener.local_addr()?.port();
        info!("REST API server listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let api_shutdown = shutdown.clone();
        let api_server = axum::serve(listener, router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 stayline started");

        Ok(Self {
            event_bus,
            repos,
            bookings,
            config,
            api_port,
            db,
            shutdown,
            api_task,
            background,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        tokio::spawn(listen_for_shutdown_signals(self.shutdown.clone()));
    }

    /// Trigger graceful shutdown without waiting for it.
    pub fn trigger_shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Wait for every task to stop after shutdown has been triggered, then
    /// close the database.
    pub async fn wait(self) {
        info!("⏳ Waiting for server tasks to complete...");

        match self.api_task.await {
            Ok(()) => info!("REST API server stopped"),
            Err(e) => error!("REST API server task panicked: {}", e),
        }

        for task in self.background {
            if let Err(e) = task.await {
                error!("Background task panicked: {}", e);
            }
        }

        if let Err(e) = self.db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("✅ Database connection closed");
        }

        info!("👋 stayline shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down stayline...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global recorder can be installed once per process; a restart within
/// the same process reuses it.
fn prometheus_handle() -> Result<PrometheusHandle, InfraError> {
    static PROM_HANDLE: OnceLock<Result<PrometheusHandle, String>> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| {
            let installed = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| e.to_string());
            if installed.is_ok() {
                info!("📊 Prometheus metrics recorder installed");
            }
            installed
        })
        .clone()
        .map_err(InfraError::Metrics)
}

/// Initialize tracing from the application config.
///
/// Call once at process startup, before [`ServerHandle::start`].
/// `RUST_LOG` takes precedence over `logging.level`.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseSection;

    fn ephemeral_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.api_host = "127.0.0.1".to_string();
        config.server.api_port = 0;
        config.database = DatabaseSection {
            url: Some("sqlite::memory:".to_string()),
            max_connections: 1,
            ..DatabaseSection::default()
        };
        config.scheduler.enabled = false;
        config
    }

    #[tokio::test]
    async fn starts_and_shuts_down_cleanly() {
        let handle = ServerHandle::start(ServerOptions {
            config: ephemeral_config(),
            auto_migrate: true,
            seed_demo: true,
        })
        .await
        .expect("server starts");

        assert!(handle.is_running());
        assert_ne!(handle.api_port, 0);
        assert_eq!(handle.event_bus.subscriber_count(), 1);

        tokio::time::timeout(std::time::Duration::from_secs(5), handle.shutdown())
            .await
            .expect("shutdown completes");
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_binding() {
        let mut config = ephemeral_config();
        config.hotel.timezone = "Mars/Olympus".to_string();

        let result = ServerHandle::start(ServerOptions {
            config,
            ..ServerOptions::default()
        })
        .await;
        assert!(matches!(result, Err(InfraError::Config(_))));
    }
}
