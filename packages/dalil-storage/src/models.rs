use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// One of the four searchable collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
	Shop,
	Service,
	Person,
	Product,
}
impl EntityType {
	pub const ALL: [Self; 4] = [Self::Shop, Self::Service, Self::Person, Self::Product];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Shop => "shop",
			Self::Service => "service",
			Self::Person => "person",
			Self::Product => "product",
		}
	}

	/// True when the collection carries its own category columns. Shops and
	/// people are linked to categories only transitively through services.
	pub fn has_category_columns(self) -> bool {
		matches!(self, Self::Service | Self::Product)
	}

	pub fn has_price_column(self) -> bool {
		matches!(self, Self::Service | Self::Product)
	}

	pub fn has_tags_column(self) -> bool {
		matches!(self, Self::Shop | Self::Service)
	}
}

/// Uniform projection over the four entity tables. Per-table columns are
/// aliased into this shape by the store; absent concepts stay `None`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EntityRecord {
	pub id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub city: Option<String>,
	pub latitude: Option<f64>,
	pub longitude: Option<f64>,
	pub verified: bool,
	pub category_id: Option<Uuid>,
	pub sub_category_id: Option<Uuid>,
	pub price: Option<f64>,
	pub created_at: OffsetDateTime,
}

/// Derived statistics computed from reviews and bookings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityStats {
	pub total_reviews: i64,
	/// Unrounded mean; callers round for display.
	pub average_rating: f64,
	/// Distinct reviewers-or-bookers. A user who both reviewed and booked
	/// counts once.
	pub total_customers: i64,
}

/// Raw availability row as stored; times are `"HH:MM"` strings.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AvailabilityRow {
	pub service_id: Uuid,
	pub day_of_week: Option<String>,
	pub start_date: Option<Date>,
	pub end_date: Option<Date>,
	pub start_time: String,
	pub end_time: String,
}
