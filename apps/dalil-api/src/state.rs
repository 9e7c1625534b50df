use std::sync::Arc;

use dalil_service::SearchService;
use dalil_storage::{db::Db, pg::PgStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SearchService>,
}
impl AppState {
	pub async fn new(config: dalil_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;
		let store = Arc::new(PgStore::new(db.pool));

		Ok(Self::with_service(SearchService::new(config, store)))
	}

	/// Wraps an already-built service; the seam tests use to run the
	/// router without Postgres.
	pub fn with_service(service: SearchService) -> Self {
		Self { service: Arc::new(service) }
	}
}
