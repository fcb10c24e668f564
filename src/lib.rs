pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod types;

use commands::AppState;
use config::Settings;
use error::AppError;
use tracing_subscriber::EnvFilter;

/// Open (and migrate) the configured database and wrap it in shared state.
pub fn open(settings: &Settings) -> Result<AppState, AppError> {
    let db_path = settings.db_path();
    let db = db::Db::new(db_path.clone())?;
    tracing::info!(path = %db_path.display(), "survey store ready");
    Ok(AppState::new(db))
}

/// Install a global fmt subscriber filtered by `filter`; a second call is a no-op.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
