pub mod worker;

mod error;

pub use error::HandlerError;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tokio::{signal, sync::watch, task::JoinSet};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use tell_storage::db::Db;
use worker::{LogDispatcher, ReminderDispatcher, WorkerState};

#[derive(Debug, Parser)]
#[command(
	version = tell_cli::VERSION,
	rename_all = "kebab",
	styles = tell_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = tell_config::load(&args.config)?;
	let filter = EnvFilter::try_new(&config.service.log_level)
		.unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let prefix = config
		.scheduler
		.worker_id
		.clone()
		.unwrap_or_else(|| format!("worker-{}", Uuid::new_v4().simple()));
	let dispatcher: Arc<dyn ReminderDispatcher> = Arc::new(LogDispatcher);
	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let mut loops = JoinSet::new();

	for n in 1..=config.scheduler.workers {
		let state = WorkerState {
			db: Db { pool: db.pool.clone() },
			worker_id: format!("{prefix}-{n}"),
			scheduler: config.scheduler.clone(),
			dispatcher: Arc::clone(&dispatcher),
		};

		loops.spawn(worker::run_worker(state, shutdown_rx.clone()));
	}

	tracing::info!(workers = config.scheduler.workers, worker_id = %prefix, "Scheduler started.");

	signal::ctrl_c().await?;

	tracing::info!("Shutdown requested. Waiting for worker loops to finish.");

	let _ = shutdown_tx.send(true);

	while let Some(result) = loops.join_next().await {
		result??;
	}

	db.pool.close().await;

	Ok(())
}
