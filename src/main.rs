// library catalog

use std::error::Error;

use tracing::info;
use tracing_subscriber::EnvFilter;

use bookshelf::{config::Config, store, web, Catalog};

const DEFAULT_LOG_FILTER: &str = "bookshelf=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
		)
		.init();

	let config = Config::from_env()?;

	// set up connection pool
	let pool = store::connect(&config.database_url, config.max_connections, config.acquire_timeout).await?;
	store::init_schema(&pool).await?;

	let catalog = Catalog::new(pool);
	let unknown = catalog.ensure_unknown_author().await?;
	info!(author_id = unknown.id, "placeholder author ready");

	let app = web::router(catalog, &config.static_dir);

	let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
	info!(address = %config.bind_address, "listening");
	axum::serve(listener, app).await?;

	Ok(())
}
