use std::collections::HashMap;

use uuid::Uuid;

use crate::{
	BoxFuture, Result,
	filter::{EntityFilter, Page, StorageOrder},
	models::{AvailabilityRow, EntityRecord, EntityStats, EntityType},
};

/// Read-only storage seam for the search pipeline. The relational
/// datastore is an external collaborator; the pipeline sees only filtered,
/// projected, counted, and paginated scans plus the handful of auxiliary
/// lookups it needs for preselection and stats.
pub trait EntityStore
where
	Self: Send + Sync,
{
	/// Bounded fetch: filter, storage order, offset/limit.
	fn fetch<'a>(
		&'a self,
		entity: EntityType,
		filter: &'a EntityFilter,
		order: StorageOrder,
		page: Page,
	) -> BoxFuture<'a, Result<Vec<EntityRecord>>>;

	/// Count over the same predicate as [`EntityStore::fetch`].
	fn count<'a>(&'a self, entity: EntityType, filter: &'a EntityFilter)
	-> BoxFuture<'a, Result<i64>>;

	/// Review/booking statistics for a fetched page of IDs.
	fn stats<'a>(
		&'a self,
		entity: EntityType,
		ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<HashMap<Uuid, EntityStats>>>;

	/// Availability windows for a set of services (open-now evaluation).
	fn availability<'a>(
		&'a self,
		service_ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<HashMap<Uuid, Vec<AvailabilityRow>>>>;

	/// IDs of shops or people reachable from services matching a category
	/// and/or subcategory. Deduplicated and capped; the relational
	/// preselection input. At least one of the two IDs must be set.
	fn category_linked_ids<'a>(
		&'a self,
		entity: EntityType,
		category_id: Option<Uuid>,
		sub_category_id: Option<Uuid>,
		cap: u32,
	) -> BoxFuture<'a, Result<Vec<Uuid>>>;
}
