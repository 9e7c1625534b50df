//! Per-entity-type branch execution: predicate composition, the
//! post-processing decision, the bounded fetch, and derived statistics.

use std::collections::HashMap;

use uuid::Uuid;

use dalil_domain::{
	availability::{self, AvailabilityWindow},
	geo::{self, GeoPoint, LocationSource, ReferencePoint},
};
use dalil_storage::{
	filter::{EntityFilter, Page, StorageOrder},
	models::{AvailabilityRow, EntityRecord, EntityStats, EntityType},
};

use crate::{
	SearchService, ServiceResult,
	search::{self, Candidate, SearchRequest, SortMode, pager, preselect::AllowList, ranking},
};

pub(crate) struct BranchContext<'a> {
	pub service: &'a SearchService,
	pub entity: EntityType,
	pub req: &'a SearchRequest,
	pub reference: Option<ReferencePoint>,
	pub allow: AllowList,
	pub vector_ranks: Option<HashMap<Uuid, usize>>,
}

#[derive(Debug, Default)]
pub(crate) struct BranchOutcome {
	pub items: Vec<Candidate>,
	pub total: i64,
}
impl BranchOutcome {
	pub(crate) fn empty() -> Self {
		Self::default()
	}
}

/// True when the requested ordering or filters depend on computed
/// statistics, wall-clock time, or post-fetch distance, and therefore
/// cannot be pushed to storage as `ORDER BY`/`LIMIT`.
pub(crate) fn requires_post_processing(req: &SearchRequest, reference: Option<&ReferencePoint>) -> bool {
	matches!(
		req.sort_mode,
		SortMode::Reviews | SortMode::Rating | SortMode::Customers | SortMode::Recommendation
	) || req.attribute_filters.requires_post_processing()
		|| reference.is_some()
}

fn storage_order(sort_mode: SortMode) -> StorageOrder {
	match sort_mode {
		SortMode::Recent => StorageOrder::CreatedAtDesc,
		SortMode::Location => StorageOrder::CityAsc,
		_ => StorageOrder::VerifiedThenCreatedAtDesc,
	}
}

fn build_filter(ctx: &BranchContext<'_>) -> EntityFilter {
	let req = ctx.req;
	let price_range = req.attribute_filters.price_range.unwrap_or_default();
	let allowed_ids = match &ctx.allow {
		AllowList::Absent => None,
		// Empty short-circuits before this point.
		AllowList::Empty => Some(Vec::new()),
		AllowList::Ids(ids) => Some(ids.clone()),
	};

	EntityFilter {
		text_query: req.free_text_query.clone(),
		city: search::city_predicate(req.location.as_ref()),
		category_id: ctx.entity.has_category_columns().then_some(req.category.category_id).flatten(),
		sub_category_id: ctx
			.entity
			.has_category_columns()
			.then_some(req.category.sub_category_id)
			.flatten(),
		verified: req.attribute_filters.verified,
		has_reviews: req.attribute_filters.has_reviews,
		tags: req.attribute_filters.tags.clone(),
		price_min: price_range.min,
		price_max: price_range.max,
		allowed_ids,
	}
}

pub(crate) async fn run_branch(ctx: BranchContext<'_>) -> ServiceResult<BranchOutcome> {
	// The legitimate zero-result fast path: no fetch, no count.
	if ctx.allow == AllowList::Empty {
		return Ok(BranchOutcome::empty());
	}

	let cfg = &ctx.service.cfg.search;
	let filter = build_filter(&ctx);
	let post_processing = requires_post_processing(ctx.req, ctx.reference.as_ref());
	let page = if post_processing {
		Page { offset: 0, limit: cfg.scan_limit }
	} else {
		Page { offset: search::offset_for(ctx.req), limit: ctx.req.limit }
	};
	let records = ctx
		.service
		.store
		.fetch(ctx.entity, &filter, storage_order(ctx.req.sort_mode), page)
		.await?;
	let ids: Vec<Uuid> = records.iter().map(|record| record.id).collect();
	let stats = ctx.service.store.stats(ctx.entity, &ids).await?;
	let availability = if wants_open_now(&ctx) {
		Some(ctx.service.store.availability(&ids).await?)
	} else {
		None
	};

	let now_local = search::local_now(cfg);
	let candidates: Vec<Candidate> = records
		.into_iter()
		.map(|record| {
			build_candidate(record, &stats, availability.as_ref(), ctx.reference.as_ref(), now_local)
		})
		.collect();
	let ranked = ranking::rank(
		candidates,
		ranking::RankContext {
			entity: ctx.entity,
			sort_mode: ctx.req.sort_mode,
			reference: ctx.reference,
			filters: &ctx.req.attribute_filters,
			vector_ranks: ctx.vector_ranks.as_ref(),
		},
	);

	if post_processing {
		let (items, total) =
			pager::paginate_in_memory(ranked, search::offset_for(ctx.req), ctx.req.limit);

		return Ok(BranchOutcome { items, total });
	}

	let total = ctx.service.store.count(ctx.entity, &filter).await?;

	Ok(BranchOutcome { items: ranked, total })
}

fn wants_open_now(ctx: &BranchContext<'_>) -> bool {
	ctx.entity == EntityType::Service && ctx.req.attribute_filters.open_now == Some(true)
}

fn build_candidate(
	record: EntityRecord,
	stats: &HashMap<Uuid, EntityStats>,
	availability: Option<&HashMap<Uuid, Vec<AvailabilityRow>>>,
	reference: Option<&ReferencePoint>,
	now_local: time::OffsetDateTime,
) -> Candidate {
	let entity_stats = stats.get(&record.id).copied().unwrap_or_default();
	let open_now = availability.map(|by_id| {
		let windows = by_id
			.get(&record.id)
			.map(|rows| rows.iter().filter_map(window_from_row).collect::<Vec<_>>())
			.unwrap_or_default();

		availability::is_open_at(&windows, now_local)
	});
	let (distance_km, has_valid_location, location_source) = match reference {
		None => (None, false, LocationSource::None),
		Some(reference) => {
			let coordinates = match (record.latitude, record.longitude) {
				(Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
				_ => None,
			};
			let (point, source) = geo::classify_location(coordinates, record.city.as_deref());

			match point {
				Some(point) => {
					let origin = GeoPoint { lat: reference.lat, lon: reference.lon };

					(Some(geo::distance_km(origin, point)), true, source)
				},
				None => (None, false, source),
			}
		},
	};

	Candidate {
		record,
		stats: entity_stats,
		distance_km,
		has_valid_location,
		location_source,
		open_now,
	}
}

/// Converts a stored availability row into an evaluatable window. Rows
/// with unparseable times or weekday names are skipped rather than
/// failing the branch.
fn window_from_row(row: &AvailabilityRow) -> Option<AvailabilityWindow> {
	Some(AvailabilityWindow {
		day_of_week: match row.day_of_week.as_deref() {
			Some(raw) => Some(availability::parse_weekday(raw)?),
			None => None,
		},
		start_date: row.start_date,
		end_date: row.end_date,
		start_time: availability::parse_time_hm(&row.start_time)?,
		end_time: availability::parse_time_hm(&row.end_time)?,
	})
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;
	use crate::search::AttributeFilters;

	fn record(id: Uuid) -> EntityRecord {
		EntityRecord {
			id,
			name: "Test".to_string(),
			description: None,
			city: None,
			latitude: None,
			longitude: None,
			verified: false,
			category_id: None,
			sub_category_id: None,
			price: None,
			created_at: datetime!(2026-01-01 00:00 UTC),
		}
	}

	#[test]
	fn stat_sorts_and_stat_filters_force_post_processing() {
		let base = SearchRequest::default();

		for sort_mode in [SortMode::Reviews, SortMode::Rating, SortMode::Customers, SortMode::Recommendation] {
			let req = SearchRequest { sort_mode, ..base.clone() };

			assert!(requires_post_processing(&req, None), "{sort_mode:?} must post-process");
		}

		let req = SearchRequest { sort_mode: SortMode::Recent, ..base.clone() };

		assert!(!requires_post_processing(&req, None));

		let req = SearchRequest {
			sort_mode: SortMode::Recent,
			attribute_filters: AttributeFilters { min_rating: Some(4.0), ..AttributeFilters::default() },
			..base
		};

		assert!(requires_post_processing(&req, None));
	}

	#[test]
	fn active_reference_point_forces_post_processing() {
		let req = SearchRequest { sort_mode: SortMode::Recent, ..SearchRequest::default() };
		let reference = ReferencePoint { lat: 30.0, lon: 31.0, radius_km: 5.0 };

		assert!(requires_post_processing(&req, Some(&reference)));
	}

	#[test]
	fn candidate_without_reference_carries_no_location_data() {
		let candidate = build_candidate(
			record(Uuid::new_v4()),
			&HashMap::new(),
			None,
			None,
			datetime!(2026-01-01 12:00 +2),
		);

		assert!(candidate.distance_km.is_none());
		assert!(!candidate.has_valid_location);
		assert_eq!(candidate.location_source, LocationSource::None);
		assert!(candidate.open_now.is_none());
	}

	#[test]
	fn candidate_distance_uses_gazetteer_for_city_rows() {
		let mut row = record(Uuid::new_v4());

		row.city = Some("الإسكندرية".to_string());

		let reference = ReferencePoint { lat: 30.0444, lon: 31.2357, radius_km: 50.0 };
		let candidate = build_candidate(
			row,
			&HashMap::new(),
			None,
			Some(&reference),
			datetime!(2026-01-01 12:00 +2),
		);

		assert_eq!(candidate.location_source, LocationSource::City);
		assert!(candidate.has_valid_location);
		assert!(candidate.distance_km.expect("distance must exist") > 100.0);
	}

	#[test]
	fn malformed_availability_rows_are_skipped() {
		let row = AvailabilityRow {
			service_id: Uuid::new_v4(),
			day_of_week: Some("FUNDAY".to_string()),
			start_date: None,
			end_date: None,
			start_time: "09:00".to_string(),
			end_time: "17:00".to_string(),
		};

		assert!(window_from_row(&row).is_none());

		let row = AvailabilityRow { day_of_week: Some("MONDAY".to_string()), ..row };

		assert!(window_from_row(&row).is_some());
	}
}
