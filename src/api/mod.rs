//! HTTP query API over the dataset snapshot
//!
//! Serves the scraped catalog read-only, plus a trigger endpoint that
//! re-runs the crawl as a background task. The API holds the dataset as
//! an immutable in-memory snapshot loaded at startup and swapped
//! wholesale after a successful triggered crawl.

mod ml;
mod routes;
mod state;

pub use ml::{predict_prices, PredictionRequestItem, PredictionResponseItem};
pub use routes::{router, ApiError};
pub use state::ApiState;

use crate::config::Settings;
use crate::Result;

/// Starts the API server and blocks until it exits
pub async fn serve(settings: Settings) -> Result<()> {
    let bind_addr = settings.bind_addr;
    let state = ApiState::new(settings);
    state.load_from_disk();

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("API listening on {}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
