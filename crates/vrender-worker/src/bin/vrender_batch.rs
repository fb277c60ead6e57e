//! Render every combination of a composition locally.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vrender_compose::{generate_combinations_limited, GenerationPolicy, NamingConfig, RenderRequestBuilder};
use vrender_models::{CompositionSpec, JobId, VariationSet};
use vrender_queue::DownloadOutcome;
use vrender_worker::{LocalRenderWorker, LocalWorkerConfig};

#[derive(Parser)]
#[command(name = "vrender-batch", about = "Render all variations of a composition with the local render CLI")]
struct Cli {
    /// Composition JSON
    #[arg(long)]
    composition: PathBuf,
    /// Variation set JSON
    #[arg(long)]
    variations: PathBuf,
    /// Naming config JSON (numbers pattern when omitted)
    #[arg(long)]
    naming: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Policy::SingleAxis)]
    policy: Policy,
    /// Refuse to run when more combinations than this would be rendered
    #[arg(long, default_value_t = 200)]
    limit: usize,
    #[arg(long, default_value = "renders")]
    out_dir: PathBuf,
    /// Print the output names without rendering
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    SingleAxis,
    CrossProduct,
}

impl From<Policy> for GenerationPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::SingleAxis => GenerationPolicy::SingleAxis,
            Policy::CrossProduct => GenerationPolicy::CrossProduct,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let composition: CompositionSpec = read_json(&cli.composition).await?;
    let variations: VariationSet = read_json(&cli.variations).await?;
    let naming: NamingConfig = match &cli.naming {
        Some(path) => read_json(path).await?,
        None => NamingConfig::default(),
    };

    let builder = RenderRequestBuilder::new(&composition, &variations, &naming)?;
    let specs = generate_combinations_limited(&variations, cli.policy.into(), cli.limit)?
        .iter()
        .map(|combination| builder.build(combination))
        .collect::<Result<Vec<_>, _>>()?;
    info!(count = specs.len(), "Resolved render specs");

    if cli.dry_run {
        for spec in &specs {
            println!("{}", spec.variation.name);
        }
        return Ok(());
    }

    tokio::fs::create_dir_all(&cli.out_dir)
        .await
        .with_context(|| format!("creating {}", cli.out_dir.display()))?;

    let worker = LocalRenderWorker::new(LocalWorkerConfig::from_env());
    let ids = specs
        .into_iter()
        .map(|spec| worker.submit(spec))
        .collect::<Result<Vec<_>, _>>()?;

    {
        let worker = worker.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping renders");
                worker.shutdown();
            }
        });
    }

    let mut failed = 0usize;
    for id in &ids {
        match wait_and_save(&worker, id, &cli.out_dir).await {
            Ok(path) => info!(job_id = %id, "Wrote {}", path.display()),
            Err(e) => {
                failed += 1;
                error!(job_id = %id, "Render failed: {:#}", e);
            }
        }
    }

    info!(rendered = ids.len() - failed, failed, "Batch finished");
    if failed > 0 {
        bail!("{} of {} renders failed", failed, ids.len());
    }
    Ok(())
}

async fn wait_and_save(worker: &LocalRenderWorker, id: &JobId, out_dir: &Path) -> Result<PathBuf> {
    loop {
        match worker.download(id)? {
            DownloadOutcome::NotReady { .. } => tokio::time::sleep(Duration::from_millis(500)).await,
            DownloadOutcome::Failed { error, .. } => bail!(error),
            DownloadOutcome::Ready { file_name, data } => {
                let path = out_dir.join(file_name);
                tokio::fs::write(&path, data)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                return Ok(path);
            }
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(false))
            .with(env_filter)
            .init();
    }
}
