use std::path::PathBuf;

use alumni_match::{
    config::Config, embeddings, index, indexing::IndexingPipeline, profiles::ProfileTable,
    utils::init_logger,
};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

const DEFAULT_MAX_PROFILES: usize = 500;

#[derive(Parser, Debug)]
#[command(
    name = "index_profiles",
    about = "Load the alumni JSON and upsert one document per profile into the configured vector index"
)]
struct IndexCli {
    /// Path to the profile JSON array (defaults to SOURCING_DATA_PATH)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Index only the first N profiles (defaults to MAX_INDEX_PROFILES, else 500)
    #[arg(long)]
    max_profiles: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = IndexCli::parse();
    let config = Config::from_env()?;
    let _log_guard = init_logger("alumni_match=info,index_profiles=info", config.server.log_dir.as_deref());

    let data_path = cli.data.unwrap_or_else(|| config.indexing.data_path.clone());
    let max_profiles = cli
        .max_profiles
        .or(config.indexing.max_profiles)
        .unwrap_or(DEFAULT_MAX_PROFILES);

    // Credentials first, so a misconfigured run fails before touching the data
    let embedder = embeddings::from_config(&config.embedding);
    let index = index::connect(&config.index, &config.embedding, embedder)
        .context("failed to connect to the vector index")?;

    info!(path = %data_path.display(), "Loading profiles");
    let profiles = ProfileTable::load(&data_path)
        .await
        .with_context(|| format!("failed to load profiles from {}", data_path.display()))?;

    let report = IndexingPipeline::new(index, Some(max_profiles))
        .run(&profiles)
        .await
        .context("indexing failed")?;

    info!(
        backend = %report.backend,
        elapsed_ms = report.elapsed_ms as u64,
        "Done. Indexed {} alumni",
        report.indexed
    );
    Ok(())
}
