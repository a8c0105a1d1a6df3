mod api;
mod config;
mod error;
mod ingest;
mod partition;
mod report;
mod scorer;
mod state;
mod stats;
mod types;

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::state::{AnalysisSession, Settings};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let session = Arc::new(AnalysisSession::new(Settings::new(
        cfg.default_normalization,
        cfg.default_strategy,
    )));
    info!(
        normalization = %cfg.default_normalization,
        strategy = %cfg.default_strategy,
        "Session ready"
    );

    // --- Preload exports named in PRELOAD_FILES ---
    if cfg.preload_files.is_empty() {
        info!("PRELOAD_FILES not set; starting with an empty session. Example: PRELOAD_FILES=exports/wall-art.csv=wall art,exports/mugs.csv");
    }
    for file in &cfg.preload_files {
        match session
            .add_file_from_path(Path::new(&file.path), file.keyword.as_deref())
            .await
        {
            Ok(summary) => info!(
                "[PRELOAD] {} ({}): {} listings, {} rows rejected",
                summary.file_name,
                summary.keyword,
                summary.listings,
                summary.normalize.rejected(),
            ),
            Err(e) => warn!("[PRELOAD] skipped {}: {e}", file.path),
        }
    }

    if session.file_count() > 0 {
        let result = session.analyze();
        info!(
            "Initial analysis: {} listings | A={} B={} C={} | keywords: {:?}",
            result.all_scored.len(),
            result.a_list.len(),
            result.b_list.len(),
            result.c_list.len(),
            result.selection_stats.keyword_distribution,
        );
    }

    // HTTP API server
    let app = router(ApiState::new(Arc::clone(&session)));
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
