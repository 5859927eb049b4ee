use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const BIND_ADDRESS: &str = "BIND_ADDRESS";
pub const DATABASE_MAX_CONNECTIONS: &str = "DATABASE_MAX_CONNECTIONS";
pub const DATABASE_ACQUIRE_TIMEOUT_SECS: &str = "DATABASE_ACQUIRE_TIMEOUT_SECS";
pub const STATIC_DIR: &str = "STATIC_DIR";

const DEFAULT_DATABASE_URL: &str = "sqlite://data/library.sqlite?mode=rwc";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 3;
const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value {value:?} for {key}")]
pub struct ConfigError {
	pub key: &'static str,
	pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub database_url: String,
	pub bind_address: SocketAddr,
	pub max_connections: u32,
	pub acquire_timeout: Duration,
	pub static_dir: PathBuf,
}

impl Config {
	/// Reads the process environment, after loading `.env` if there is one.
	pub fn from_env() -> Result<Self, ConfigError> {
		if let Err(err) = dotenvy::dotenv() {
			if !err.not_found() {
				tracing::warn!(error = %err, "couldn't load .env");
			}
		}
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where F: Fn(&str) -> Option<String> {
		let database_url = lookup(DATABASE_URL)
			.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
		let static_dir = lookup(STATIC_DIR)
			.unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
			.into();

		Ok(Config{
			database_url,
			bind_address: parse(&lookup, BIND_ADDRESS)?
				.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))),
			max_connections: parse(&lookup, DATABASE_MAX_CONNECTIONS)?
				.unwrap_or(DEFAULT_MAX_CONNECTIONS),
			acquire_timeout: Duration::from_secs(
				parse(&lookup, DATABASE_ACQUIRE_TIMEOUT_SECS)?
					.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS)
			),
			static_dir,
		})
	}
}

fn parse<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
	F: Fn(&str) -> Option<String>,
	T: std::str::FromStr,
{
	match lookup(key) {
		None => Ok(None),
		Some(value) => value.trim().parse()
			.map(Some)
			.map_err(|_| ConfigError{ key, value }),
	}
}
