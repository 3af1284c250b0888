//! Startup, wiring and shutdown of the desk services.

use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::catalog::{catalog_actor, UldCatalogClient};
use crate::config::DeskConfig;
use crate::confirm::Confirmer;
use crate::error::ConfigError;
use crate::order_desk::{OrderDeskClient, OrderDeskService};
use crate::stocktake::{StockTakeClient, StockTakeService};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};

/// Owns every spawned service.
///
/// Startup order: the catalog backend first (and its seed records), then the
/// stock take that depends on it, then the order desk. Shutdown runs the
/// other way round and waits for every task.
pub struct DeskSystem {
    pub order_desk: OrderDeskClient,
    pub stock_take: StockTakeClient,
    pub catalog: UldCatalogClient,
    catalog_handle: JoinHandle<()>,
    handles: Vec<JoinHandle<()>>,
}

impl DeskSystem {
    /// Starts on a [`FileStore`] under `config.data_dir`.
    pub async fn start(config: &DeskConfig, confirmer: Confirmer) -> Result<Self, ConfigError> {
        let store = FileStore::open(&config.data_dir).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::start_with_store(config, store, confirmer).await
    }

    /// Starts with nothing persisted beyond the process.
    pub async fn start_in_memory(config: &DeskConfig, confirmer: Confirmer) -> Result<Self, ConfigError> {
        Self::start_with_store(config, MemoryStore::new(), confirmer).await
    }

    #[instrument(name = "desk_system", skip_all, fields(mailbox_size = config.mailbox_size))]
    pub async fn start_with_store<S>(config: &DeskConfig, store: S, confirmer: Confirmer) -> Result<Self, ConfigError>
    where
        S: KeyValueStore + 'static,
    {
        info!("Starting desk system");
        let seed = config.load_catalog_seed()?;
        let mut handles = Vec::new();

        let (catalog_backend, catalog) = catalog_actor(config.mailbox_size);
        let catalog_handle = tokio::spawn(catalog_backend.run());
        let mut seeded = 0;
        for record in seed {
            match catalog.create(record).await {
                Ok(_) => seeded += 1,
                Err(e) => warn!(error = %e, "Skipping catalog seed record"),
            }
        }
        info!(seeded, "Catalog backend ready");

        let (stock_take_service, stock_take) =
            StockTakeService::new(config.mailbox_size, catalog.clone(), confirmer);
        handles.push(tokio::spawn(stock_take_service.run()));

        let (order_desk_service, order_desk) = OrderDeskService::new(
            config.mailbox_size,
            store,
            config.require_balanced_flow_to_publish,
        );
        handles.push(tokio::spawn(order_desk_service.run()));

        info!("Desk system started");
        Ok(Self {
            order_desk,
            stock_take,
            catalog,
            catalog_handle,
            handles,
        })
    }

    /// Stops the services in reverse start order. Errors are logged and the
    /// shutdown carries on.
    #[instrument(skip(self))]
    pub async fn shutdown(self) {
        info!("Shutting down desk system");

        if let Err(e) = self.order_desk.shutdown().await {
            warn!(error = %e, "Order desk already stopped");
        }
        if let Err(e) = self.stock_take.shutdown().await {
            warn!(error = %e, "Stock take already stopped");
        }
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = ?e, "Service shutdown error");
            }
        }

        if let Err(e) = self.catalog.shutdown().await {
            warn!(error = %e, "Catalog backend already stopped");
        }
        if let Err(e) = self.catalog_handle.await {
            error!(error = ?e, "Catalog backend shutdown error");
        }

        info!("Desk system shutdown complete");
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `default_filter`.
///
/// ```bash
/// RUST_LOG=debug cargo run
/// RUST_LOG=airfreight_desk::stocktake=debug,info cargo run
/// ```
pub fn setup_tracing(default_filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .compact()
        .try_init();
}
