mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Postgres, Scheduler, Service, Storage};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	let scheduler = &cfg.scheduler;

	if scheduler.workers == 0 {
		return Err(Error::Validation {
			message: "scheduler.workers must be greater than zero.".to_string(),
		});
	}
	if scheduler.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "scheduler.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if scheduler.lease_timeout_seconds <= 0 {
		return Err(Error::Validation {
			message: "scheduler.lease_timeout_seconds must be greater than zero.".to_string(),
		});
	}
	if scheduler.max_attempts <= 0 {
		return Err(Error::Validation {
			message: "scheduler.max_attempts must be greater than zero.".to_string(),
		});
	}
	if scheduler.backoff_cap_seconds <= 0 {
		return Err(Error::Validation {
			message: "scheduler.backoff_cap_seconds must be greater than zero.".to_string(),
		});
	}
	// Each polling loop holds a connection while it claims.
	if cfg.storage.postgres.pool_max_conns < scheduler.workers {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be at least scheduler.workers."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.scheduler.worker_id.as_deref().map(|id| id.trim().is_empty()).unwrap_or(false) {
		cfg.scheduler.worker_id = None;
	}
	if let Some(worker_id) = cfg.scheduler.worker_id.as_mut() {
		*worker_id = worker_id.trim().to_string();
	}
}
