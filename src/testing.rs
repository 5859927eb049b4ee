use std::time::Duration;

use crate::catalog::Catalog;
use crate::store;

// a single connection, since every sqlite::memory: connection is its own database
pub(crate) async fn memory_catalog() -> Catalog {
	let pool = store::connect("sqlite::memory:", 1, Duration::from_secs(3)).await
		.expect("in-memory sqlite");
	store::init_schema(&pool).await.expect("schema");
	Catalog::new(pool)
}
