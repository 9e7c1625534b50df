//! The in-memory ranking stage: stat post-filters first, then exactly one
//! ordering strategy chosen by precedence.

use std::collections::HashMap;

use uuid::Uuid;

use dalil_domain::geo::{self, DistanceSortKey, ReferencePoint};
use dalil_storage::models::EntityType;

use crate::search::{AttributeFilters, Candidate, SortMode};

pub(crate) struct RankContext<'a> {
	pub entity: EntityType,
	pub sort_mode: SortMode,
	pub reference: Option<ReferencePoint>,
	pub filters: &'a AttributeFilters,
	pub vector_ranks: Option<&'a HashMap<Uuid, usize>>,
}

/// Applies stat filters, then picks one ordering strategy:
///
/// 1. explicit stat sorts (`reviews`, `rating`, `customers`),
/// 2. vector re-ranking for `recommendation`, only while no reference
///    point is active,
/// 3. the distance contract when a reference point is active,
/// 4. otherwise the storage order the rows arrived in.
///
/// The strategies are mutually exclusive. In particular an active
/// reference point beats vector relevance for `recommendation`.
pub(crate) fn rank(candidates: Vec<Candidate>, ctx: RankContext<'_>) -> Vec<Candidate> {
	let candidates = apply_stat_filters(candidates, ctx.entity, ctx.filters);

	match ctx.sort_mode {
		SortMode::Reviews => sort_desc_by(candidates, |c| c.stats.total_reviews as f64),
		SortMode::Rating => sort_desc_by(candidates, |c| c.stats.average_rating),
		SortMode::Customers => sort_desc_by(candidates, |c| c.stats.total_customers as f64),
		SortMode::Recommendation if ctx.reference.is_none() => {
			match ctx.vector_ranks {
				Some(ranks) => vector_rerank(candidates, ranks),
				None => candidates,
			}
		},
		_ => {
			match ctx.reference {
				Some(reference) => geo::filter_by_distance(candidates, reference.radius_km, |c| {
					DistanceSortKey {
						has_valid_location: c.has_valid_location,
						distance_km: c.distance_km,
						average_rating: c.stats.average_rating,
						verified: c.record.verified,
					}
				}),
				None => candidates,
			}
		},
	}
}

/// Order-preserving filters over computed statistics and opening hours.
/// `openNow` only constrains services; other types pass through.
fn apply_stat_filters(
	candidates: Vec<Candidate>,
	entity: EntityType,
	filters: &AttributeFilters,
) -> Vec<Candidate> {
	candidates
		.into_iter()
		.filter(|candidate| {
			if let Some(min_rating) = filters.min_rating
				&& candidate.stats.average_rating < min_rating
			{
				return false;
			}
			if let Some(min_reviews) = filters.min_reviews
				&& candidate.stats.total_reviews < min_reviews
			{
				return false;
			}
			if filters.open_now == Some(true)
				&& entity == EntityType::Service
				&& candidate.open_now != Some(true)
			{
				return false;
			}

			true
		})
		.collect()
}

/// Stable descending sort, so storage order breaks ties.
fn sort_desc_by<F>(mut candidates: Vec<Candidate>, key: F) -> Vec<Candidate>
where
	F: Fn(&Candidate) -> f64,
{
	candidates.sort_by(|a, b| {
		key(b).partial_cmp(&key(a)).unwrap_or(std::cmp::Ordering::Equal)
	});

	candidates
}

/// Reorders by semantic relevance. Matched candidates come first, sorted
/// by `(vector position asc, verified desc, created_at desc)`; unmatched
/// candidates follow in their original relative order. Membership never
/// changes here.
fn vector_rerank(candidates: Vec<Candidate>, ranks: &HashMap<Uuid, usize>) -> Vec<Candidate> {
	let mut matched = Vec::new();
	let mut unmatched = Vec::new();

	for candidate in candidates {
		match ranks.get(&candidate.record.id).copied() {
			Some(position) => matched.push((position, candidate)),
			None => unmatched.push(candidate),
		}
	}

	matched.sort_by(|(pa, a), (pb, b)| {
		pa.cmp(pb)
			.then_with(|| b.record.verified.cmp(&a.record.verified))
			.then_with(|| b.record.created_at.cmp(&a.record.created_at))
	});

	matched.into_iter().map(|(_, candidate)| candidate).chain(unmatched).collect()
}
