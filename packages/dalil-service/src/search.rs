//! The federated search pipeline.
//!
//! One request fans out across the four entity collections, blending
//! relational filters, the external similarity service, and geo distance,
//! and produces per-type paginated results under a bounded work budget.

pub(crate) mod executor;
pub(crate) mod pager;
pub(crate) mod preselect;
pub(crate) mod ranking;

use std::collections::HashMap;

use time::OffsetDateTime;
use uuid::Uuid;

use dalil_domain::{
	availability,
	geo::{self, LocationFilter, LocationSource, ReferencePoint},
};
use dalil_storage::models::{EntityRecord, EntityStats, EntityType};

use crate::{SearchService, ServiceError, ServiceResult};
use executor::{BranchContext, BranchOutcome};
use preselect::{AllowList, SemanticCandidates};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityScope {
	All,
	Shops,
	Services,
	People,
	Products,
}
impl EntityScope {
	pub fn includes(self, entity: EntityType) -> bool {
		match self {
			Self::All => true,
			Self::Shops => entity == EntityType::Shop,
			Self::Services => entity == EntityType::Service,
			Self::People => entity == EntityType::Person,
			Self::Products => entity == EntityType::Product,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
	Reviews,
	Rating,
	Customers,
	Recent,
	Location,
	Recommendation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceRange {
	pub min: Option<f64>,
	pub max: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryFilter {
	pub category_id: Option<Uuid>,
	pub sub_category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributeFilters {
	pub verified: Option<bool>,
	pub has_reviews: Option<bool>,
	pub open_now: Option<bool>,
	pub tags: Vec<String>,
	pub min_rating: Option<f64>,
	pub min_reviews: Option<i64>,
	pub price_range: Option<PriceRange>,
}
impl AttributeFilters {
	/// Filters that depend on computed statistics or wall-clock time and
	/// therefore cannot be expressed as storage predicates.
	pub fn requires_post_processing(&self) -> bool {
		self.open_now == Some(true) || self.min_rating.is_some() || self.min_reviews.is_some()
	}
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
	pub free_text_query: Option<String>,
	pub entity_scope: EntityScope,
	pub location: Option<LocationFilter>,
	pub category: CategoryFilter,
	pub sort_mode: SortMode,
	pub page: u32,
	pub limit: u32,
	pub attribute_filters: AttributeFilters,
}
impl Default for SearchRequest {
	fn default() -> Self {
		Self {
			free_text_query: None,
			entity_scope: EntityScope::All,
			location: None,
			category: CategoryFilter::default(),
			sort_mode: SortMode::Recommendation,
			page: 1,
			limit: 20,
			attribute_filters: AttributeFilters::default(),
		}
	}
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStatsView {
	pub total_reviews: i64,
	/// Rounded to one decimal for display.
	pub average_rating: f64,
	pub total_customers: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredEntity {
	pub id: Uuid,
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub city: Option<String>,
	pub verified: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub category_id: Option<Uuid>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sub_category_id: Option<Uuid>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub price: Option<f64>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	pub stats: EntityStatsView,
	/// Rounded to two decimals for display; ordering uses the unrounded
	/// value internally.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub distance_km: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub has_valid_location: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub location_source: Option<LocationSource>,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PaginationBreakdown {
	pub shops: i64,
	pub services: i64,
	pub users: i64,
	pub products: i64,
}

/// Pagination metadata.
///
/// Two documented bounds apply. When a branch required in-memory
/// post-processing, `total` counts post-filter matches among at most
/// `search.scan_limit` scanned rows; true match counts beyond the scan cap
/// are not reflected. For `entityScope=all`, the four per-type lists are
/// independently paginated: `total`/`pages` sum the per-type totals, and
/// page N means page N of each type's own ranking, not a slice of one
/// globally ranked list.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PaginationMeta {
	pub page: u32,
	pub limit: u32,
	pub total: i64,
	pub pages: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub breakdown: Option<PaginationBreakdown>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchResponse {
	pub success: bool,
	pub shops: Vec<ScoredEntity>,
	pub services: Vec<ScoredEntity>,
	pub users: Vec<ScoredEntity>,
	pub products: Vec<ScoredEntity>,
	pub pagination: PaginationMeta,
}

/// Per-request candidate projection carried through ranking and paging.
/// Built from one query result, discarded after response serialization.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
	pub record: EntityRecord,
	pub stats: EntityStats,
	pub distance_km: Option<f64>,
	pub has_valid_location: bool,
	pub location_source: LocationSource,
	pub open_now: Option<bool>,
}

impl SearchService {
	pub async fn search(&self, req: SearchRequest) -> ServiceResult<SearchResponse> {
		let req = normalize_request(req, &self.cfg.search);
		let reference = req
			.location
			.as_ref()
			.and_then(|location| {
				geo::resolve_reference_point(location, self.cfg.search.default_radius_km)
			});

		let (semantic, relational) = tokio::join!(
			preselect::semantic_candidates(self, &req, reference.as_ref()),
			preselect::relational_candidates(self, &req),
		);
		let relational = relational?;

		let isolate = req.entity_scope == EntityScope::All;
		let (shops, services, people, products) = tokio::join!(
			self.branch(EntityType::Shop, &req, reference, &semantic, &relational, isolate),
			self.branch(EntityType::Service, &req, reference, &semantic, &relational, isolate),
			self.branch(EntityType::Person, &req, reference, &semantic, &relational, isolate),
			self.branch(EntityType::Product, &req, reference, &semantic, &relational, isolate),
		);
		let shops = shops?;
		let services = services?;
		let people = people?;
		let products = products?;

		Ok(assemble_response(&req, shops, services, people, products))
	}

	async fn branch(
		&self,
		entity: EntityType,
		req: &SearchRequest,
		reference: Option<ReferencePoint>,
		semantic: &SemanticCandidates,
		relational: &HashMap<EntityType, AllowList>,
		isolate_failures: bool,
	) -> ServiceResult<BranchOutcome> {
		if !req.entity_scope.includes(entity) {
			return Ok(BranchOutcome::empty());
		}

		let allow = preselect::combine_allow_lists(
			semantic.allow_list(entity),
			relational.get(&entity).cloned().unwrap_or(AllowList::Absent),
		);
		let context = BranchContext {
			service: self,
			entity,
			req,
			reference,
			allow,
			vector_ranks: semantic.vector_ranks(entity),
		};

		match executor::run_branch(context).await {
			Ok(outcome) => Ok(outcome),
			Err(err @ ServiceError::Storage { .. }) => Err(err),
			Err(err) if isolate_failures => {
				tracing::warn!(
					error = %err,
					entity = entity.as_str(),
					"Search branch degraded to empty results."
				);

				Ok(BranchOutcome::empty())
			},
			Err(err) => Err(err),
		}
	}
}

/// Server-side clamps. Limit is bounded to `[1, search.max_page_size]` and
/// page to `>= 1` regardless of what the caller sent; blank queries are
/// dropped so they do not trigger semantic preselection.
fn normalize_request(mut req: SearchRequest, cfg: &dalil_config::Search) -> SearchRequest {
	req.limit = req.limit.clamp(1, cfg.max_page_size);
	req.page = req.page.max(1);
	req.free_text_query = req
		.free_text_query
		.take()
		.map(|query| query.trim().to_string())
		.filter(|query| !query.is_empty());

	req
}

/// Widened to `u64` so a hostile page number cannot overflow the
/// multiplication; the storage layer saturates anything past `i64::MAX`.
pub(crate) fn offset_for(req: &SearchRequest) -> u64 {
	u64::from(req.page.saturating_sub(1)) * u64::from(req.limit)
}

/// City predicate for named/legacy-city locations. Coordinate-based
/// requests have no storage-level location predicate; those are filtered
/// post-fetch by the distance engine.
pub(crate) fn city_predicate(location: Option<&LocationFilter>) -> Option<String> {
	match location {
		Some(LocationFilter::NamedPlace { text }) => Some(text.clone()),
		Some(LocationFilter::LegacyCity { city, .. }) => Some(city.clone()),
		Some(LocationFilter::Coordinates { .. }) | None => None,
	}
}

pub(crate) fn round_rating(value: f64) -> f64 {
	(value * 10.0).round() / 10.0
}

fn assemble_response(
	req: &SearchRequest,
	shops: BranchOutcome,
	services: BranchOutcome,
	people: BranchOutcome,
	products: BranchOutcome,
) -> SearchResponse {
	let breakdown = PaginationBreakdown {
		shops: shops.total,
		services: services.total,
		users: people.total,
		products: products.total,
	};
	let total = breakdown.shops + breakdown.services + breakdown.users + breakdown.products;
	let pagination = PaginationMeta {
		page: req.page,
		limit: req.limit,
		total,
		pages: pager::page_count(total, req.limit),
		breakdown: (req.entity_scope == EntityScope::All).then_some(breakdown),
	};

	SearchResponse {
		success: true,
		shops: shops.items.into_iter().map(scored_entity_view).collect(),
		services: services.items.into_iter().map(scored_entity_view).collect(),
		users: people.items.into_iter().map(scored_entity_view).collect(),
		products: products.items.into_iter().map(scored_entity_view).collect(),
		pagination,
	}
}

fn scored_entity_view(candidate: Candidate) -> ScoredEntity {
	let Candidate { record, stats, distance_km, has_valid_location, location_source, .. } =
		candidate;
	let located = location_source != LocationSource::None || distance_km.is_some();

	ScoredEntity {
		id: record.id,
		name: record.name,
		description: record.description,
		city: record.city,
		verified: record.verified,
		category_id: record.category_id,
		sub_category_id: record.sub_category_id,
		price: record.price,
		created_at: record.created_at,
		stats: EntityStatsView {
			total_reviews: stats.total_reviews,
			average_rating: round_rating(stats.average_rating),
			total_customers: stats.total_customers,
		},
		distance_km: distance_km.map(geo::round2),
		has_valid_location: located.then_some(has_valid_location),
		location_source: located.then_some(location_source),
	}
}

pub(crate) fn local_now(cfg: &dalil_config::Search) -> OffsetDateTime {
	availability::local_now(OffsetDateTime::now_utc(), cfg.time_zone_offset_hours)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn search_cfg() -> dalil_config::Search {
		dalil_config::Search::default()
	}

	#[test]
	fn limit_is_clamped_server_side() {
		let req =
			SearchRequest { limit: 500, page: 0, ..SearchRequest::default() };
		let normalized = normalize_request(req, &search_cfg());

		assert_eq!(normalized.limit, 100);
		assert_eq!(normalized.page, 1);

		let req = SearchRequest { limit: 0, ..SearchRequest::default() };

		assert_eq!(normalize_request(req, &search_cfg()).limit, 1);
	}

	#[test]
	fn blank_query_is_dropped() {
		let req = SearchRequest {
			free_text_query: Some("   ".to_string()),
			..SearchRequest::default()
		};

		assert!(normalize_request(req, &search_cfg()).free_text_query.is_none());
	}

	#[test]
	fn offset_is_zero_based() {
		let req = SearchRequest { page: 3, limit: 10, ..SearchRequest::default() };

		assert_eq!(offset_for(&req), 20);
	}

	#[test]
	fn offset_survives_maximum_page_number() {
		let req = SearchRequest { page: u32::MAX, limit: 100, ..SearchRequest::default() };

		assert_eq!(offset_for(&req), (u64::from(u32::MAX) - 1) * 100);
	}

	#[test]
	fn city_predicate_ignores_coordinates() {
		let named = LocationFilter::NamedPlace { text: "طنطا".to_string() };
		let coords = LocationFilter::Coordinates { latitude: 30.0, longitude: 31.0, radius: None };

		assert_eq!(city_predicate(Some(&named)), Some("طنطا".to_string()));
		assert_eq!(city_predicate(Some(&coords)), None);
		assert_eq!(city_predicate(None), None);
	}

	#[test]
	fn rating_rounds_to_one_decimal() {
		assert_eq!(round_rating(4.4499), 4.4);
		assert_eq!(round_rating(4.45), 4.5);
	}

	#[test]
	fn request_deserializes_spec_shape() {
		let raw = r#"{
			"freeTextQuery": "dentist",
			"entityScope": "services",
			"location": { "type": "coordinates", "latitude": 30.0444, "longitude": 31.2357, "radius": 5 },
			"sortMode": "recommendation",
			"page": 1,
			"limit": 10
		}"#;
		let req: SearchRequest = serde_json::from_str(raw).expect("request must deserialize");

		assert_eq!(req.entity_scope, EntityScope::Services);
		assert_eq!(req.sort_mode, SortMode::Recommendation);
		assert!(matches!(req.location, Some(LocationFilter::Coordinates { .. })));
	}
}
