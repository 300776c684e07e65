use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub scheduler: Scheduler,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

/// Reminder scheduler tuning. Every field falls back to the production default.
#[derive(Debug, Clone, Deserialize)]
pub struct Scheduler {
	/// Prefix for worker lease holder ids. A random id is generated when absent.
	#[serde(default)]
	pub worker_id: Option<String>,
	/// Number of polling loops spawned by one worker process.
	#[serde(default = "default_workers")]
	pub workers: u32,
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// A `RUNNING` job whose lease is older than this becomes claimable again.
	#[serde(default = "default_lease_timeout_seconds")]
	pub lease_timeout_seconds: i64,
	#[serde(default = "default_max_attempts")]
	pub max_attempts: i32,
	#[serde(default = "default_backoff_cap_seconds")]
	pub backoff_cap_seconds: i64,
}
impl Default for Scheduler {
	fn default() -> Self {
		Self {
			worker_id: None,
			workers: default_workers(),
			poll_interval_ms: default_poll_interval_ms(),
			lease_timeout_seconds: default_lease_timeout_seconds(),
			max_attempts: default_max_attempts(),
			backoff_cap_seconds: default_backoff_cap_seconds(),
		}
	}
}

fn default_workers() -> u32 {
	1
}

fn default_poll_interval_ms() -> u64 {
	800
}

fn default_lease_timeout_seconds() -> i64 {
	300
}

fn default_max_attempts() -> i32 {
	8
}

fn default_backoff_cap_seconds() -> i64 {
	600
}
