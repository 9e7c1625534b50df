mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Postgres, Providers, Search, Service, SimilarityProviderConfig, Storage,
};

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
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::invalid("service.http_bind", "must be non-empty"));
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::invalid("storage.postgres.dsn", "must be non-empty"));
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::invalid("storage.postgres.pool_max_conns", "must be greater than zero"));
	}
	if cfg.providers.similarity.api_base.trim().is_empty() {
		return Err(Error::invalid("providers.similarity.api_base", "must be non-empty"));
	}
	if cfg.providers.similarity.timeout_ms == 0 {
		return Err(Error::invalid("providers.similarity.timeout_ms", "must be greater than zero"));
	}
	if cfg.search.scan_limit == 0 {
		return Err(Error::invalid("search.scan_limit", "must be greater than zero"));
	}
	if cfg.search.relational_candidate_cap == 0 {
		return Err(Error::invalid(
			"search.relational_candidate_cap",
			"must be greater than zero",
		));
	}
	if cfg.search.semantic_candidate_limit == 0 {
		return Err(Error::invalid(
			"search.semantic_candidate_limit",
			"must be greater than zero",
		));
	}
	if cfg.search.max_page_size == 0 {
		return Err(Error::invalid("search.max_page_size", "must be greater than zero"));
	}
	if !cfg.search.min_radius_km.is_finite() || cfg.search.min_radius_km <= 0.0 {
		return Err(Error::invalid("search.min_radius_km", "must be a positive finite number"));
	}
	if !cfg.search.max_radius_km.is_finite() || cfg.search.max_radius_km <= cfg.search.min_radius_km
	{
		return Err(Error::invalid(
			"search.max_radius_km",
			"must be greater than search.min_radius_km",
		));
	}
	if !cfg.search.default_radius_km.is_finite()
		|| cfg.search.default_radius_km < cfg.search.min_radius_km
		|| cfg.search.default_radius_km > cfg.search.max_radius_km
	{
		return Err(Error::invalid(
			"search.default_radius_km",
			"must lie within the configured radius bounds",
		));
	}
	if !(-12..=14).contains(&cfg.search.time_zone_offset_hours) {
		return Err(Error::invalid("search.time_zone_offset_hours", "must be between -12 and 14"));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.providers
		.similarity
		.api_key
		.as_deref()
		.map(|key| key.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.similarity.api_key = None;
	}
	if cfg.providers.similarity.path.trim().is_empty() {
		cfg.providers.similarity.path = "/multi_search".to_string();
	}
}
