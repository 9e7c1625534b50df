use uuid::Uuid;

/// Relational filter assembled by the query executor. Everything here can
/// be pushed down to storage; post-processing concerns (distance, computed
/// stats, open-now) never appear in this type.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
	/// Free-text query matched with an OR-clause over the type's
	/// searchable fields.
	pub text_query: Option<String>,
	/// Simple city equality for named/legacy city requests. Coordinate
	/// filtering happens post-fetch in the distance engine.
	pub city: Option<String>,
	pub category_id: Option<Uuid>,
	pub sub_category_id: Option<Uuid>,
	pub verified: Option<bool>,
	pub has_reviews: Option<bool>,
	pub tags: Vec<String>,
	pub price_min: Option<f64>,
	pub price_max: Option<f64>,
	/// Candidate allow-list intersection. `None` means unrestricted; an
	/// empty list must short-circuit before reaching storage.
	pub allowed_ids: Option<Vec<Uuid>>,
}

/// Orders expressible as a storage-level `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOrder {
	CreatedAtDesc,
	VerifiedThenCreatedAtDesc,
	CityAsc,
}
impl StorageOrder {
	pub fn as_sql(self) -> &'static str {
		match self {
			Self::CreatedAtDesc => "created_at DESC",
			Self::VerifiedThenCreatedAtDesc => "verified DESC, created_at DESC",
			Self::CityAsc => "city ASC",
		}
	}
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
	pub offset: u64,
	pub limit: u32,
}
