pub mod search;
pub mod time_serde;

use std::sync::Arc;

use dalil_config::{Config, SimilarityProviderConfig};
use dalil_providers::similarity::{self, CandidateIds, MultiSearchRequest};
use dalil_storage::store::EntityStore;

pub use dalil_domain::geo::LocationFilter;
pub use search::{
	AttributeFilters, CategoryFilter, EntityScope, PaginationBreakdown, PaginationMeta,
	PriceRange, ScoredEntity, SearchRequest, SearchResponse, SortMode,
};

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sqlx::Error> for ServiceError {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
impl From<dalil_storage::Error> for ServiceError {
	fn from(err: dalil_storage::Error) -> Self {
		match err {
			dalil_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			dalil_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
		}
	}
}

/// Seam for the external similarity service. The default implementation
/// calls the HTTP client in `dalil-providers`; tests substitute stubs.
pub trait SimilarityProvider
where
	Self: Send + Sync,
{
	fn multi_search<'a>(
		&'a self,
		cfg: &'a SimilarityProviderConfig,
		request: &'a MultiSearchRequest,
	) -> BoxFuture<'a, color_eyre::Result<CandidateIds>>;
}

#[derive(Clone)]
pub struct Providers {
	pub similarity: Arc<dyn SimilarityProvider>,
}
impl Providers {
	pub fn new(similarity: Arc<dyn SimilarityProvider>) -> Self {
		Self { similarity }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { similarity: Arc::new(DefaultProviders) }
	}
}

struct DefaultProviders;
impl SimilarityProvider for DefaultProviders {
	fn multi_search<'a>(
		&'a self,
		cfg: &'a SimilarityProviderConfig,
		request: &'a MultiSearchRequest,
	) -> BoxFuture<'a, color_eyre::Result<CandidateIds>> {
		Box::pin(similarity::multi_search(cfg, request))
	}
}

pub struct SearchService {
	pub cfg: Config,
	pub store: Arc<dyn EntityStore>,
	pub providers: Providers,
}
impl SearchService {
	pub fn new(cfg: Config, store: Arc<dyn EntityStore>) -> Self {
		Self { cfg, store, providers: Providers::default() }
	}

	pub fn with_providers(
		cfg: Config,
		store: Arc<dyn EntityStore>,
		providers: Providers,
	) -> Self {
		Self { cfg, store, providers }
	}
}
