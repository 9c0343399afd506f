//! ets-server: the job-search tool server

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{info, warn};

use ets::config::Config;
use ets::providers::{AdzunaClient, GraphStore, RecordingSearchService, SheetsApiClient};
use ets::server::{Router, Server};
use ets::tools::{
    GraphTool, JobAnalysisTool, JobSearchTool, PersistKeywordsTool, SheetsExportTool,
};

#[tokio::main]
async fn main() -> Result<()> {
    ets::initialize_logging()?;
    let config = Config::load()?;

    let store = GraphStore::new();
    let router = build_router(&config, store)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    let server = Server::new(config.server, router);
    server.run(shutdown_rx).await?;
    Ok(())
}

/// Register every tool against its configured collaborators
fn build_router(config: &Config, store: Arc<GraphStore>) -> Result<Router> {
    let mut router = Router::new();

    if config.adzuna.is_configured() {
        let client = AdzunaClient::new(&config.adzuna)?;
        let service = RecordingSearchService::new(client, store.clone());
        router.register(Arc::new(JobSearchTool::new(service)))?;
    } else {
        warn!("adzuna credentials missing, job_search not registered");
    }

    router.register(Arc::new(PersistKeywordsTool::new(store.clone())))?;
    router.register(Arc::new(JobAnalysisTool::new(store.clone())))?;
    router.register(Arc::new(GraphTool::new(Some(store.clone()))))?;

    let sheets = SheetsApiClient::new(&config.sheets);
    router.register(Arc::new(SheetsExportTool::new(sheets, store)))?;

    info!(tools = router.len(), "tools registered");
    Ok(router)
}
