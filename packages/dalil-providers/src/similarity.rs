//! Client for the external semantic-similarity service.
//!
//! One `POST {api_base}{path}` per search request covers every enabled
//! entity type. Callers treat any error from here as a degrade signal, not
//! a request failure.

use std::{collections::HashMap, time::Duration as StdDuration};

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;
use uuid::Uuid;

/// Per-entity-type slice of a multi_search request.
#[derive(Debug, Clone)]
pub struct EntityQuery {
	pub enabled: bool,
	pub query: String,
	pub limit: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct GeoHint {
	pub lat: f64,
	pub lon: f64,
	pub radius: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FilterHints {
	pub tags: Vec<String>,
	pub category_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct MultiSearchRequest {
	/// Keyed by entity-type label (`shop`, `service`, `person`, `product`).
	pub entities: HashMap<String, EntityQuery>,
	pub location: Option<GeoHint>,
	pub filters: FilterHints,
}

/// Ranked candidate IDs per entity-type label. Order is significant: it is
/// the vector rank used for re-ranking downstream.
pub type CandidateIds = HashMap<String, Vec<Uuid>>;

pub async fn multi_search(
	cfg: &dalil_config::SimilarityProviderConfig,
	request: &MultiSearchRequest,
) -> Result<CandidateIds> {
	let client = Client::builder().timeout(StdDuration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = build_body(request);
	let res = client
		.post(url)
		.headers(crate::auth_headers(cfg.api_key.as_deref())?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_multi_search_response(json)
}

fn build_body(request: &MultiSearchRequest) -> Value {
	let mut entities = serde_json::Map::new();

	for (label, entity) in &request.entities {
		entities.insert(
			label.clone(),
			serde_json::json!({
				"enabled": entity.enabled,
				"query": entity.query,
				"limit": entity.limit,
			}),
		);
	}

	let mut body = serde_json::Map::new();

	body.insert("entities".to_string(), Value::Object(entities));

	if let Some(location) = request.location {
		body.insert(
			"location".to_string(),
			serde_json::json!({
				"lat": location.lat,
				"lon": location.lon,
				"radius": location.radius,
			}),
		);
	}
	if !request.filters.tags.is_empty() || !request.filters.category_ids.is_empty() {
		body.insert(
			"filters".to_string(),
			serde_json::json!({
				"tags": request.filters.tags,
				"category_ids": request.filters.category_ids,
			}),
		);
	}

	Value::Object(body)
}

/// Best-effort parse: a missing type yields no candidates for that type,
/// and malformed IDs are skipped rather than failing the whole response.
fn parse_multi_search_response(json: Value) -> Result<CandidateIds> {
	let results = json
		.get("results")
		.and_then(|value| value.as_object())
		.ok_or_else(|| eyre::eyre!("multi_search response is missing results object."))?;
	let mut out = CandidateIds::new();

	for (label, entries) in results {
		let Some(entries) = entries.as_array() else { continue };
		let mut ids = Vec::with_capacity(entries.len());

		for entry in entries {
			let Some(raw) = entry.get("id").and_then(|value| value.as_str()) else { continue };

			if let Ok(id) = raw.parse::<Uuid>() {
				ids.push(id);
			}
		}

		out.insert(label.clone(), ids);
	}

	Ok(out)
}
