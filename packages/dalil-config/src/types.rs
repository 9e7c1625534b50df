use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub similarity: SimilarityProviderConfig,
}

/// External semantic-similarity service reached over HTTP. The pipeline
/// treats it as best-effort; the timeout here is the degrade boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct SimilarityProviderConfig {
	pub api_base: String,
	pub path: String,
	pub api_key: Option<String>,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Maximum rows fetched when a sort/filter cannot be pushed to storage.
	pub scan_limit: u32,
	/// Cap on IDs produced by category-driven relational preselection.
	pub relational_candidate_cap: u32,
	/// Per-entity-type candidate limit sent to the similarity service.
	pub semantic_candidate_limit: u32,
	pub default_radius_km: f64,
	pub min_radius_km: f64,
	pub max_radius_km: f64,
	pub max_page_size: u32,
	/// Fixed UTC offset used for open-now evaluation.
	pub time_zone_offset_hours: i8,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			scan_limit: 2_000,
			relational_candidate_cap: 5_000,
			semantic_candidate_limit: 300,
			default_radius_km: 10.0,
			min_radius_km: 0.1,
			max_radius_km: 50.0,
			max_page_size: 100,
			time_zone_offset_hours: 2,
		}
	}
}
