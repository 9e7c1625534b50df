//! Router tests over a stub store. No Postgres, no network.

use std::{collections::HashMap, sync::Arc};

use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use uuid::Uuid;

use dalil_api::{routes, state::AppState};
use dalil_config::{Config, Postgres, Providers, Search, Service, SimilarityProviderConfig, Storage};
use dalil_service::SearchService;
use dalil_storage::{
	filter::{EntityFilter, Page, StorageOrder},
	models::{AvailabilityRow, EntityRecord, EntityStats, EntityType},
	store::EntityStore,
};

fn test_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "warn".to_string() },
		storage: Storage {
			postgres: Postgres {
				dsn: "postgres://localhost/dalil_test".to_string(),
				pool_max_conns: 1,
			},
		},
		providers: Providers {
			similarity: SimilarityProviderConfig {
				api_base: "http://127.0.0.1:1".to_string(),
				path: "/multi_search".to_string(),
				api_key: None,
				timeout_ms: 100,
			},
		},
		search: Search::default(),
	}
}

struct EmptyStore;
impl EntityStore for EmptyStore {
	fn fetch<'a>(
		&'a self,
		_entity: EntityType,
		_filter: &'a EntityFilter,
		_order: StorageOrder,
		_page: Page,
	) -> dalil_storage::BoxFuture<'a, dalil_storage::Result<Vec<EntityRecord>>> {
		Box::pin(async { Ok(Vec::new()) })
	}

	fn count<'a>(
		&'a self,
		_entity: EntityType,
		_filter: &'a EntityFilter,
	) -> dalil_storage::BoxFuture<'a, dalil_storage::Result<i64>> {
		Box::pin(async { Ok(0) })
	}

	fn stats<'a>(
		&'a self,
		_entity: EntityType,
		_ids: &'a [Uuid],
	) -> dalil_storage::BoxFuture<'a, dalil_storage::Result<HashMap<Uuid, EntityStats>>> {
		Box::pin(async { Ok(HashMap::new()) })
	}

	fn availability<'a>(
		&'a self,
		_service_ids: &'a [Uuid],
	) -> dalil_storage::BoxFuture<'a, dalil_storage::Result<HashMap<Uuid, Vec<AvailabilityRow>>>> {
		Box::pin(async { Ok(HashMap::new()) })
	}

	fn category_linked_ids<'a>(
		&'a self,
		_entity: EntityType,
		_category_id: Option<Uuid>,
		_sub_category_id: Option<Uuid>,
		_cap: u32,
	) -> dalil_storage::BoxFuture<'a, dalil_storage::Result<Vec<Uuid>>> {
		Box::pin(async { Ok(Vec::new()) })
	}
}

fn app() -> axum::Router {
	let service = SearchService::new(test_config(), Arc::new(EmptyStore));

	routes::router(AppState::with_service(service))
}

async fn json_body(response: axum::response::Response) -> Value {
	let bytes = body::to_bytes(response.into_body(), 1 << 20).await.expect("body must collect");

	serde_json::from_slice(&bytes).expect("body must be JSON")
}

#[tokio::test]
async fn health_is_ok() {
	let response = app()
		.oneshot(Request::get("/health").body(Body::empty()).expect("request must build"))
		.await
		.expect("router must respond");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn post_search_returns_the_response_shape() {
	let request = Request::post("/v1/search")
		.header("content-type", "application/json")
		.body(Body::from(json!({ "entityScope": "shops", "limit": 5 }).to_string()))
		.expect("request must build");
	let response = app().oneshot(request).await.expect("router must respond");

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;

	assert_eq!(body["success"], json!(true));
	assert_eq!(body["shops"], json!([]));
	assert_eq!(body["pagination"]["total"], json!(0));
	// Single-type scope carries no per-type breakdown.
	assert!(body["pagination"].get("breakdown").is_none());
}

#[tokio::test]
async fn out_of_range_limit_is_rejected_with_the_field_name() {
	let request = Request::post("/v1/search")
		.header("content-type", "application/json")
		.body(Body::from(json!({ "limit": 500 }).to_string()))
		.expect("request must build");
	let response = app().oneshot(request).await.expect("router must respond");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let body = json_body(response).await;

	assert_eq!(body["success"], json!(false));
	assert_eq!(body["error_code"], json!("invalid_request"));
	assert_eq!(body["fields"], json!(["limit"]));
}

#[tokio::test]
async fn get_search_accepts_the_query_string_form() {
	let response = app()
		.oneshot(
			Request::get("/v1/search?type=shops&lat=30.0444&lng=31.2357&radius=5&limit=5")
				.body(Body::empty())
				.expect("request must build"),
		)
		.await
		.expect("router must respond");

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;

	assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn get_search_rejects_unknown_entity_type() {
	let response = app()
		.oneshot(
			Request::get("/v1/search?type=warehouses")
				.body(Body::empty())
				.expect("request must build"),
		)
		.await
		.expect("router must respond");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let body = json_body(response).await;

	assert_eq!(body["fields"], json!(["type"]));
}

#[tokio::test]
async fn get_search_rejects_half_a_coordinate_pair() {
	let response = app()
		.oneshot(
			Request::get("/v1/search?lat=30.0444")
				.body(Body::empty())
				.expect("request must build"),
		)
		.await
		.expect("router must respond");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let body = json_body(response).await;

	assert_eq!(body["fields"], json!(["lat", "lng"]));
}

#[tokio::test]
async fn get_search_rejects_an_out_of_range_radius() {
	let response = app()
		.oneshot(
			Request::get("/v1/search?lat=30.0444&lng=31.2357&radius=500")
				.body(Body::empty())
				.expect("request must build"),
		)
		.await
		.expect("router must respond");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let body = json_body(response).await;

	assert_eq!(body["fields"], json!(["radius"]));
}
