//! `skillshare serve` — run the localhost control plane.

use std::path::Path;

use anyhow::{Context, Result};
use skillshare_server::AppState;

pub async fn serve(config_path: &Path, port: u16) -> Result<()> {
    let config = super::load_config(config_path)?;
    let state = AppState::new(config_path.to_path_buf(), config);
    skillshare_server::serve(state, port)
        .await
        .context("control plane exited")
}
