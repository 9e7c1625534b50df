//! Reference-point resolution and great-circle distance.

use serde::{Deserialize, Serialize};

use crate::gazetteer;

const EARTH_RADIUS_KM: f64 = 6_371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
	pub lat: f64,
	pub lon: f64,
}

/// How a candidate's position was obtained. `City` means the coordinates
/// were derived from the gazetteer rather than stored on the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
	Gps,
	City,
	None,
}

/// The location half of a search request. Exactly one variant per request;
/// the resolver matches exhaustively rather than probing optional fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocationFilter {
	Coordinates { latitude: f64, longitude: f64, radius: Option<f64> },
	NamedPlace { text: String },
	LegacyCity { city: String, latitude: Option<f64>, longitude: Option<f64>, radius: Option<f64> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePoint {
	pub lat: f64,
	pub lon: f64,
	pub radius_km: f64,
}

/// Resolves a location filter into a reference point. A gazetteer miss is
/// not an error: the request simply proceeds without distance filtering.
pub fn resolve_reference_point(
	location: &LocationFilter,
	default_radius_km: f64,
) -> Option<ReferencePoint> {
	match location {
		LocationFilter::Coordinates { latitude, longitude, radius } => Some(ReferencePoint {
			lat: *latitude,
			lon: *longitude,
			radius_km: radius.unwrap_or(default_radius_km),
		}),
		LocationFilter::NamedPlace { text } => {
			gazetteer::lookup(text).map(|point| ReferencePoint {
				lat: point.lat,
				lon: point.lon,
				radius_km: default_radius_km,
			})
		},
		LocationFilter::LegacyCity { city, latitude, longitude, radius } => {
			if let (Some(lat), Some(lon)) = (latitude, longitude) {
				return Some(ReferencePoint {
					lat: *lat,
					lon: *lon,
					radius_km: radius.unwrap_or(default_radius_km),
				});
			}

			gazetteer::lookup(city).map(|point| ReferencePoint {
				lat: point.lat,
				lon: point.lon,
				radius_km: radius.unwrap_or(default_radius_km),
			})
		},
	}
}

/// Haversine great-circle distance in kilometers. Unrounded; use
/// [`round2`] only at the display boundary.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
	let d_lat = (b.lat - a.lat).to_radians();
	let d_lon = (b.lon - a.lon).to_radians();
	let lat_a = a.lat.to_radians();
	let lat_b = b.lat.to_radians();
	let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

	2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

pub fn round2(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}

/// Classifies a candidate's position: stored coordinates win, then a
/// gazetteer hit on its city string, then nothing.
pub fn classify_location(
	coordinates: Option<GeoPoint>,
	city: Option<&str>,
) -> (Option<GeoPoint>, LocationSource) {
	if let Some(point) = coordinates {
		return (Some(point), LocationSource::Gps);
	}
	if let Some(point) = city.and_then(gazetteer::lookup) {
		return (Some(point), LocationSource::City);
	}

	(None, LocationSource::None)
}

/// Sort key for the distance contract.
#[derive(Debug, Clone, Copy)]
pub struct DistanceSortKey {
	pub has_valid_location: bool,
	pub distance_km: Option<f64>,
	pub average_rating: f64,
	pub verified: bool,
}

/// The ordering-then-filtering distance contract.
///
/// Items are sorted by `(has_valid_location desc, distance_km asc,
/// average_rating desc, verified desc)` first, and only then reduced to
/// valid-location items within `radius_km`. Invalid-location items sort
/// last in the intermediate order and never survive the filter; the
/// sequence matters for consumers that peel off a prefix of the sorted
/// intermediate list, so do not fold the filter into the sort.
pub fn filter_by_distance<T, F>(items: Vec<T>, radius_km: f64, key: F) -> Vec<T>
where
	F: Fn(&T) -> DistanceSortKey,
{
	let mut sorted = items;

	sorted.sort_by(|a, b| {
		let ka = key(a);
		let kb = key(b);

		kb.has_valid_location
			.cmp(&ka.has_valid_location)
			.then_with(|| {
				let da = ka.distance_km.unwrap_or(f64::INFINITY);
				let db = kb.distance_km.unwrap_or(f64::INFINITY);

				da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
			})
			.then_with(|| {
				kb.average_rating
					.partial_cmp(&ka.average_rating)
					.unwrap_or(std::cmp::Ordering::Equal)
			})
			.then_with(|| kb.verified.cmp(&ka.verified))
	});

	sorted
		.into_iter()
		.filter(|item| {
			let k = key(item);

			k.has_valid_location && k.distance_km.map(|d| d <= radius_km).unwrap_or(false)
		})
		.collect()
}
