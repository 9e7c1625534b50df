use axum::{
	Json, Router,
	extract::{Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::get,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dalil_service::{
	AttributeFilters, CategoryFilter, EntityScope, PriceRange, SearchRequest, SearchResponse,
	ServiceError, SortMode,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", get(search_simple).post(search))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	validate(&payload, &state.service.cfg.search)?;

	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

async fn search_simple(
	State(state): State<AppState>,
	Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
	let payload = params.into_request()?;

	validate(&payload, &state.service.cfg.search)?;

	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

/// The query-string form of the search endpoint. Everything is optional;
/// absent parameters fall back to [`SearchRequest::default`].
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
	pub q: Option<String>,
	#[serde(rename = "type")]
	pub entity: Option<String>,
	pub lat: Option<f64>,
	pub lng: Option<f64>,
	pub radius: Option<f64>,
	pub city: Option<String>,
	pub category_id: Option<Uuid>,
	pub sub_category_id: Option<Uuid>,
	pub sort: Option<String>,
	pub page: Option<u32>,
	pub limit: Option<u32>,
	pub verified: Option<bool>,
	pub has_reviews: Option<bool>,
	pub open_now: Option<bool>,
	pub min_rating: Option<f64>,
	pub min_reviews: Option<i64>,
	pub price_min: Option<f64>,
	pub price_max: Option<f64>,
	/// Comma-separated.
	pub tags: Option<String>,
}
impl SearchParams {
	fn into_request(self) -> Result<SearchRequest, ApiError> {
		let defaults = SearchRequest::default();
		let entity_scope = match self.entity.as_deref() {
			None => defaults.entity_scope,
			Some("all") => EntityScope::All,
			Some("shops") => EntityScope::Shops,
			Some("services") => EntityScope::Services,
			Some("people") | Some("users") => EntityScope::People,
			Some("products") => EntityScope::Products,
			Some(other) => {
				return Err(invalid_fields(
					format!("Unknown entity type {other:?}."),
					vec!["type".to_string()],
				));
			},
		};
		let sort_mode = match self.sort.as_deref() {
			None => defaults.sort_mode,
			Some("reviews") => SortMode::Reviews,
			Some("rating") => SortMode::Rating,
			Some("customers") => SortMode::Customers,
			Some("recent") => SortMode::Recent,
			Some("location") => SortMode::Location,
			Some("recommendation") => SortMode::Recommendation,
			Some(other) => {
				return Err(invalid_fields(
					format!("Unknown sort mode {other:?}."),
					vec!["sort".to_string()],
				));
			},
		};
		let location = match (self.lat, self.lng, self.city) {
			(Some(latitude), Some(longitude), _) => {
				Some(dalil_service::LocationFilter::Coordinates {
					latitude,
					longitude,
					radius: self.radius,
				})
			},
			(Some(_), None, _) | (None, Some(_), _) => {
				return Err(invalid_fields(
					"lat and lng must be provided together.".to_string(),
					vec!["lat".to_string(), "lng".to_string()],
				));
			},
			(None, None, Some(city)) => {
				Some(dalil_service::LocationFilter::NamedPlace { text: city })
			},
			(None, None, None) => None,
		};
		let price_range = match (self.price_min, self.price_max) {
			(None, None) => None,
			(min, max) => Some(PriceRange { min, max }),
		};
		let tags = self
			.tags
			.map(|raw| {
				raw.split(',')
					.map(str::trim)
					.filter(|tag| !tag.is_empty())
					.map(str::to_string)
					.collect()
			})
			.unwrap_or_default();

		Ok(SearchRequest {
			free_text_query: self.q,
			entity_scope,
			location,
			category: CategoryFilter {
				category_id: self.category_id,
				sub_category_id: self.sub_category_id,
			},
			sort_mode,
			page: self.page.unwrap_or(defaults.page),
			limit: self.limit.unwrap_or(defaults.limit),
			attribute_filters: AttributeFilters {
				verified: self.verified,
				has_reviews: self.has_reviews,
				open_now: self.open_now,
				tags,
				min_rating: self.min_rating,
				min_reviews: self.min_reviews,
				price_range,
			},
		})
	}
}

/// Field-level request validation, before the pipeline runs. The service
/// also clamps defensively, but explicit out-of-range values are rejected
/// here so callers learn about them.
fn validate(req: &SearchRequest, cfg: &dalil_config::Search) -> Result<(), ApiError> {
	let mut fields = Vec::new();

	if req.page < 1 {
		fields.push("page".to_string());
	}
	if req.limit < 1 || req.limit > cfg.max_page_size {
		fields.push("limit".to_string());
	}

	let radius = match &req.location {
		Some(dalil_service::LocationFilter::Coordinates { radius, .. })
		| Some(dalil_service::LocationFilter::LegacyCity { radius, .. }) => *radius,
		_ => None,
	};

	if let Some(radius) = radius
		&& !(cfg.min_radius_km..=cfg.max_radius_km).contains(&radius)
	{
		fields.push("radius".to_string());
	}
	if let Some(min_rating) = req.attribute_filters.min_rating
		&& !(0.0..=5.0).contains(&min_rating)
	{
		fields.push("minRating".to_string());
	}
	if let Some(min_reviews) = req.attribute_filters.min_reviews
		&& min_reviews < 0
	{
		fields.push("minReviews".to_string());
	}
	if let Some(range) = req.attribute_filters.price_range {
		let negative =
			range.min.is_some_and(|min| min < 0.0) || range.max.is_some_and(|max| max < 0.0);
		let inverted = matches!((range.min, range.max), (Some(min), Some(max)) if min > max);

		if negative || inverted {
			fields.push("priceRange".to_string());
		}
	}

	if fields.is_empty() {
		Ok(())
	} else {
		Err(invalid_fields(
			format!("Invalid value for: {}.", fields.join(", ")),
			fields,
		))
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	success: bool,
	error_code: String,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

fn invalid_fields(message: String, fields: Vec<String>) -> ApiError {
	ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", message, Some(fields))
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } => {
				Self::new(StatusCode::BAD_REQUEST, "invalid_request", message, None)
			},
			// Internals stay out of the response body.
			ServiceError::Storage { .. } => Self::new(
				StatusCode::INTERNAL_SERVER_ERROR,
				"internal_error",
				"An internal error occurred.",
				None,
			),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		if self.status.is_server_error() {
			tracing::error!(error_code = %self.error_code, "Request failed.");
		}

		let body = ErrorBody {
			success: false,
			error_code: self.error_code,
			message: self.message,
			fields: self.fields,
		};

		(self.status, Json(body)).into_response()
	}
}
