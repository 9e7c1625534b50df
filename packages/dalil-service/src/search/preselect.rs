//! Candidate preselection: semantic (similarity service) and relational
//! (category-driven) allow-lists, built fresh per request.

use std::collections::HashMap;

use uuid::Uuid;

use dalil_domain::geo::ReferencePoint;
use dalil_providers::similarity::{EntityQuery, FilterHints, GeoHint, MultiSearchRequest};
use dalil_storage::models::EntityType;

use crate::{SearchService, ServiceResult, search::SearchRequest};

/// ID restriction for one entity-type branch. `Absent` means unrestricted;
/// `Empty` short-circuits the branch to zero results before any storage
/// round trip. Order inside `Ids` is the vector rank when the list came
/// from semantic preselection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AllowList {
	Absent,
	Empty,
	Ids(Vec<Uuid>),
}

/// Outcome of the single per-request similarity call. Degradation is a
/// value, not an error: the pipeline consumes `Degraded` exactly like
/// `Absent` and proceeds relational-only.
#[derive(Debug, Clone)]
pub(crate) enum SemanticCandidates {
	Absent,
	Degraded,
	Available(HashMap<EntityType, Vec<Uuid>>),
}
impl SemanticCandidates {
	pub(crate) fn allow_list(&self, entity: EntityType) -> AllowList {
		match self {
			Self::Absent | Self::Degraded => AllowList::Absent,
			Self::Available(by_type) => match by_type.get(&entity) {
				// The service omitting a type entirely is treated as "no
				// opinion", not as zero matches.
				None => AllowList::Absent,
				Some(ids) if ids.is_empty() => AllowList::Empty,
				Some(ids) => AllowList::Ids(ids.clone()),
			},
		}
	}

	/// Vector positions for re-ranking. Present only when the similarity
	/// call succeeded and returned candidates for this type.
	pub(crate) fn vector_ranks(&self, entity: EntityType) -> Option<HashMap<Uuid, usize>> {
		match self {
			Self::Absent | Self::Degraded => None,
			Self::Available(by_type) => {
				let ids = by_type.get(&entity)?;

				if ids.is_empty() {
					return None;
				}

				Some(ids.iter().enumerate().map(|(rank, id)| (*id, rank)).collect())
			},
		}
	}
}

/// Intersects the two preselection mechanisms. Semantic order survives the
/// intersection since it carries the vector rank.
pub(crate) fn combine_allow_lists(semantic: AllowList, relational: AllowList) -> AllowList {
	match (semantic, relational) {
		(AllowList::Empty, _) | (_, AllowList::Empty) => AllowList::Empty,
		(AllowList::Absent, other) | (other, AllowList::Absent) => other,
		(AllowList::Ids(semantic_ids), AllowList::Ids(relational_ids)) => {
			let relational_set: std::collections::HashSet<Uuid> =
				relational_ids.into_iter().collect();
			let intersected: Vec<Uuid> = semantic_ids
				.into_iter()
				.filter(|id| relational_set.contains(id))
				.collect();

			if intersected.is_empty() { AllowList::Empty } else { AllowList::Ids(intersected) }
		},
	}
}

/// One similarity call per request, covering every enabled entity type.
pub(crate) async fn semantic_candidates(
	service: &SearchService,
	req: &SearchRequest,
	reference: Option<&ReferencePoint>,
) -> SemanticCandidates {
	let Some(query) = req.free_text_query.as_deref() else {
		return SemanticCandidates::Absent;
	};

	let limit = service.cfg.search.semantic_candidate_limit;
	let entities: HashMap<String, EntityQuery> = EntityType::ALL
		.into_iter()
		.filter(|entity| req.entity_scope.includes(*entity))
		.map(|entity| {
			(
				entity.as_str().to_string(),
				EntityQuery { enabled: true, query: query.to_string(), limit },
			)
		})
		.collect();
	let request = MultiSearchRequest {
		entities,
		location: reference.map(|point| GeoHint {
			lat: point.lat,
			lon: point.lon,
			radius: point.radius_km,
		}),
		filters: FilterHints {
			tags: req.attribute_filters.tags.clone(),
			category_ids: req.category.category_id.into_iter().collect(),
		},
	};

	match service.providers.similarity.multi_search(&service.cfg.providers.similarity, &request).await
	{
		Ok(by_label) => {
			let mut by_type = HashMap::new();

			for entity in EntityType::ALL {
				if let Some(ids) = by_label.get(entity.as_str()) {
					by_type.insert(entity, ids.clone());
				}
			}

			SemanticCandidates::Available(by_type)
		},
		Err(err) => {
			tracing::warn!(
				error = %err,
				"Similarity service unavailable; proceeding without semantic candidates."
			);

			SemanticCandidates::Degraded
		},
	}
}

/// Category-driven preselection for entity types without a direct category
/// column. Deriving eligible shops/people from the services that reference
/// the category avoids an expensive cross-collection OR in the main query.
pub(crate) async fn relational_candidates(
	service: &SearchService,
	req: &SearchRequest,
) -> ServiceResult<HashMap<EntityType, AllowList>> {
	let mut out = HashMap::new();

	// Either field on its own triggers preselection; a subcategory-only
	// request still narrows the reachable shops/people.
	if req.category.category_id.is_none() && req.category.sub_category_id.is_none() {
		return Ok(out);
	}

	let cap = service.cfg.search.relational_candidate_cap;

	for entity in [EntityType::Shop, EntityType::Person] {
		if !req.entity_scope.includes(entity) {
			continue;
		}

		let ids = service
			.store
			.category_linked_ids(entity, req.category.category_id, req.category.sub_category_id, cap)
			.await?;

		out.insert(entity, if ids.is_empty() { AllowList::Empty } else { AllowList::Ids(ids) });
	}

	Ok(out)
}
