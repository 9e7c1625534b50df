//! Postgres-backed [`EntityStore`].
//!
//! All predicates are parameterized through [`sqlx::QueryBuilder`]; every
//! entity table is projected into the uniform [`EntityRecord`] shape with
//! column aliases, so the pipeline above never branches on table layout.

use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::{
	BoxFuture, Error, Result,
	filter::{EntityFilter, Page, StorageOrder},
	models::{AvailabilityRow, EntityRecord, EntityStats, EntityType},
	store::EntityStore,
};

pub struct PgStore {
	pool: PgPool,
}
impl PgStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}

struct TableSpec {
	table: &'static str,
	/// Projection into the uniform [`EntityRecord`] column set.
	projection: &'static str,
	/// Columns covered by the free-text OR-clause.
	text_columns: &'static [&'static str],
}

fn table_spec(entity: EntityType) -> TableSpec {
	match entity {
		EntityType::Shop => TableSpec {
			table: "shops",
			projection: "id, name, description, city, latitude, longitude, verified, \
				NULL::uuid AS category_id, NULL::uuid AS sub_category_id, \
				NULL::float8 AS price, created_at",
			text_columns: &["name", "description"],
		},
		EntityType::Service => TableSpec {
			table: "services",
			projection: "id, title AS name, description, city, latitude, longitude, verified, \
				category_id, sub_category_id, price, created_at",
			text_columns: &["title", "description"],
		},
		EntityType::Person => TableSpec {
			table: "people",
			projection: "id, display_name AS name, bio AS description, city, latitude, \
				longitude, verified, NULL::uuid AS category_id, NULL::uuid AS sub_category_id, \
				NULL::float8 AS price, created_at",
			text_columns: &["display_name", "bio", "profession"],
		},
		EntityType::Product => TableSpec {
			table: "products",
			projection: "id, name, description, city, latitude, longitude, verified, \
				category_id, sub_category_id, price, created_at",
			text_columns: &["name", "description"],
		},
	}
}

fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, entity: EntityType, filter: &EntityFilter) {
	let spec = table_spec(entity);

	qb.push(" WHERE active = TRUE AND deleted_at IS NULL");

	if let Some(query) = filter.text_query.as_deref().filter(|q| !q.trim().is_empty()) {
		let pattern = format!("%{}%", query.trim());

		qb.push(" AND (");

		for (index, column) in spec.text_columns.iter().enumerate() {
			if index > 0 {
				qb.push(" OR ");
			}

			qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
		}

		qb.push(")");
	}
	if let Some(city) = filter.city.as_deref().filter(|c| !c.trim().is_empty()) {
		qb.push(" AND city = ").push_bind(city.trim().to_string());
	}
	if entity.has_category_columns() {
		if let Some(category_id) = filter.category_id {
			qb.push(" AND category_id = ").push_bind(category_id);
		}
		if let Some(sub_category_id) = filter.sub_category_id {
			qb.push(" AND sub_category_id = ").push_bind(sub_category_id);
		}
	}
	if let Some(verified) = filter.verified {
		qb.push(" AND verified = ").push_bind(verified);
	}
	if filter.has_reviews == Some(true) {
		qb.push(" AND EXISTS (SELECT 1 FROM reviews r WHERE r.entity_type = ")
			.push_bind(entity.as_str())
			.push(" AND r.entity_id = ")
			.push(spec.table)
			.push(".id)");
	}
	if entity.has_tags_column() && !filter.tags.is_empty() {
		qb.push(" AND tags && ").push_bind(filter.tags.clone());
	}
	if entity.has_price_column() {
		if let Some(min) = filter.price_min {
			qb.push(" AND price >= ").push_bind(min);
		}
		if let Some(max) = filter.price_max {
			qb.push(" AND price <= ").push_bind(max);
		}
	}
	if let Some(ids) = filter.allowed_ids.as_ref() {
		qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
	}
}

impl EntityStore for PgStore {
	fn fetch<'a>(
		&'a self,
		entity: EntityType,
		filter: &'a EntityFilter,
		order: StorageOrder,
		page: Page,
	) -> BoxFuture<'a, Result<Vec<EntityRecord>>> {
		Box::pin(async move {
			let spec = table_spec(entity);
			let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", spec.projection, spec.table));

			push_predicate(&mut qb, entity, filter);
			qb.push(" ORDER BY ").push(order.as_sql());
			qb.push(" LIMIT ").push_bind(page.limit as i64);
			qb.push(" OFFSET ").push_bind(i64::try_from(page.offset).unwrap_or(i64::MAX));

			let rows = qb.build_query_as::<EntityRecord>().fetch_all(&self.pool).await?;

			Ok(rows)
		})
	}

	fn count<'a>(
		&'a self,
		entity: EntityType,
		filter: &'a EntityFilter,
	) -> BoxFuture<'a, Result<i64>> {
		Box::pin(async move {
			let spec = table_spec(entity);
			let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", spec.table));

			push_predicate(&mut qb, entity, filter);

			let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;

			Ok(total)
		})
	}

	fn stats<'a>(
		&'a self,
		entity: EntityType,
		ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<HashMap<Uuid, EntityStats>>> {
		Box::pin(async move {
			let mut out: HashMap<Uuid, EntityStats> = HashMap::new();

			if ids.is_empty() {
				return Ok(out);
			}

			let review_rows = sqlx::query(
				"\
SELECT entity_id, COUNT(*) AS total_reviews, AVG(rating)::float8 AS average_rating
FROM reviews
WHERE entity_type = $1 AND entity_id = ANY($2)
GROUP BY entity_id",
			)
			.bind(entity.as_str())
			.bind(ids)
			.fetch_all(&self.pool)
			.await?;

			for row in review_rows {
				let id: Uuid = row.try_get("entity_id")?;
				let stats = out.entry(id).or_default();

				stats.total_reviews = row.try_get("total_reviews")?;
				stats.average_rating = row.try_get::<Option<f64>, _>("average_rating")?.unwrap_or(0.0);
			}

			// Distinct reviewers-or-bookers; UNION deduplicates, so a user
			// who both reviewed and booked counts once.
			let customer_rows = sqlx::query(
				"\
SELECT entity_id, COUNT(DISTINCT user_id) AS total_customers
FROM (
	SELECT entity_id, user_id FROM reviews WHERE entity_type = $1 AND entity_id = ANY($2)
	UNION
	SELECT service_id AS entity_id, user_id FROM bookings WHERE $1 = 'service' AND service_id = ANY($2)
) customers
GROUP BY entity_id",
			)
			.bind(entity.as_str())
			.bind(ids)
			.fetch_all(&self.pool)
			.await?;

			for row in customer_rows {
				let id: Uuid = row.try_get("entity_id")?;
				let stats = out.entry(id).or_default();

				stats.total_customers = row.try_get("total_customers")?;
			}

			Ok(out)
		})
	}

	fn availability<'a>(
		&'a self,
		service_ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<HashMap<Uuid, Vec<AvailabilityRow>>>> {
		Box::pin(async move {
			let mut out: HashMap<Uuid, Vec<AvailabilityRow>> = HashMap::new();

			if service_ids.is_empty() {
				return Ok(out);
			}

			let rows: Vec<AvailabilityRow> = sqlx::query_as(
				"\
SELECT service_id, day_of_week, start_date, end_date, start_time, end_time
FROM service_availability
WHERE service_id = ANY($1)",
			)
			.bind(service_ids)
			.fetch_all(&self.pool)
			.await?;

			for row in rows {
				out.entry(row.service_id).or_default().push(row);
			}

			Ok(out)
		})
	}

	fn category_linked_ids<'a>(
		&'a self,
		entity: EntityType,
		category_id: Option<Uuid>,
		sub_category_id: Option<Uuid>,
		cap: u32,
	) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		Box::pin(async move {
			let link_column = match entity {
				EntityType::Shop => "shop_id",
				EntityType::Person => "provider_id",
				other => {
					return Err(Error::InvalidArgument(format!(
						"Entity type {} has direct category columns; relational preselection does not apply.",
						other.as_str(),
					)));
				},
			};

			if category_id.is_none() && sub_category_id.is_none() {
				return Err(Error::InvalidArgument(
					"Relational preselection needs a category or subcategory ID.".to_string(),
				));
			}

			let mut qb = QueryBuilder::new(format!(
				"SELECT DISTINCT {link_column} FROM services WHERE {link_column} IS NOT NULL",
			));

			if let Some(category_id) = category_id {
				qb.push(" AND category_id = ").push_bind(category_id);
			}

			if let Some(sub_category_id) = sub_category_id {
				qb.push(" AND sub_category_id = ").push_bind(sub_category_id);
			}

			qb.push(" LIMIT ").push_bind(cap as i64);

			let ids: Vec<Uuid> = qb.build_query_scalar().fetch_all(&self.pool).await?;

			Ok(ids)
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn predicate_always_excludes_inactive_rows() {
		let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM shops");

		push_predicate(&mut qb, EntityType::Shop, &EntityFilter::default());

		assert_eq!(qb.sql(), "SELECT COUNT(*) FROM shops WHERE active = TRUE AND deleted_at IS NULL");
	}

	#[test]
	fn text_query_expands_to_or_clause_over_type_columns() {
		let filter =
			EntityFilter { text_query: Some("dentist".to_string()), ..EntityFilter::default() };
		let mut qb = QueryBuilder::new("SELECT 1 FROM people");

		push_predicate(&mut qb, EntityType::Person, &filter);

		let sql = qb.sql();

		assert!(sql.contains("display_name ILIKE $1"));
		assert!(sql.contains("OR bio ILIKE $2"));
		assert!(sql.contains("OR profession ILIKE $3"));
	}

	#[test]
	fn category_predicate_skipped_for_transitive_types() {
		let filter = EntityFilter { category_id: Some(Uuid::new_v4()), ..EntityFilter::default() };
		let mut qb = QueryBuilder::new("SELECT 1 FROM shops");

		push_predicate(&mut qb, EntityType::Shop, &filter);

		assert!(!qb.sql().contains("category_id"));

		let mut qb = QueryBuilder::new("SELECT 1 FROM services");

		push_predicate(&mut qb, EntityType::Service, &filter);

		assert!(qb.sql().contains("category_id = $1"));
	}

	#[test]
	fn allow_list_becomes_any_clause() {
		let filter =
			EntityFilter { allowed_ids: Some(vec![Uuid::new_v4()]), ..EntityFilter::default() };
		let mut qb = QueryBuilder::new("SELECT 1 FROM products");

		push_predicate(&mut qb, EntityType::Product, &filter);

		assert!(qb.sql().contains("id = ANY($1)"));
	}

	#[test]
	fn price_range_only_applies_where_a_price_column_exists() {
		let filter =
			EntityFilter { price_min: Some(10.0), price_max: Some(50.0), ..EntityFilter::default() };
		let mut qb = QueryBuilder::new("SELECT 1 FROM shops");

		push_predicate(&mut qb, EntityType::Shop, &filter);

		assert!(!qb.sql().contains("price"));

		let mut qb = QueryBuilder::new("SELECT 1 FROM products");

		push_predicate(&mut qb, EntityType::Product, &filter);

		assert!(qb.sql().contains("price >= $1"));
		assert!(qb.sql().contains("price <= $2"));
	}
}
