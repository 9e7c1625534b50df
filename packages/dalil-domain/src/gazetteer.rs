//! Static place-name gazetteer used as a fallback geocoder.
//!
//! Entries carry the canonical Arabic spelling plus common transliterations.
//! Lookups go through [`normalize_place`], so `"القاهرة"`, `"قاهرة"` and
//! `"el-cairo"`-style inputs all resolve to the same coordinates.

use crate::geo::GeoPoint;

struct Place {
	names: &'static [&'static str],
	lat: f64,
	lon: f64,
}

static PLACES: &[Place] = &[
	Place { names: &["قاهرة", "cairo"], lat: 30.0444, lon: 31.2357 },
	Place { names: &["جيزة", "giza"], lat: 30.0131, lon: 31.2089 },
	Place { names: &["اسكندرية", "إسكندرية", "alexandria"], lat: 31.2001, lon: 29.9187 },
	Place { names: &["شبرا خيمة", "شبرا الخيمة", "shubra kheima"], lat: 30.1286, lon: 31.2422 },
	Place { names: &["بورسعيد", "port said"], lat: 31.2653, lon: 32.3019 },
	Place { names: &["سويس", "suez"], lat: 29.9668, lon: 32.5498 },
	Place { names: &["منصورة", "mansoura"], lat: 31.0409, lon: 31.3785 },
	Place { names: &["طنطا", "tanta"], lat: 30.7865, lon: 31.0004 },
	Place { names: &["زقازيق", "zagazig"], lat: 30.5877, lon: 31.5020 },
	Place { names: &["اسماعيلية", "إسماعيلية", "ismailia"], lat: 30.5965, lon: 32.2715 },
	Place { names: &["فيوم", "faiyum", "fayoum"], lat: 29.3084, lon: 30.8428 },
	Place { names: &["دمياط", "damietta"], lat: 31.4165, lon: 31.8133 },
	Place { names: &["اسيوط", "أسيوط", "asyut"], lat: 27.1809, lon: 31.1837 },
	Place { names: &["منيا", "minya"], lat: 28.1099, lon: 30.7503 },
	Place { names: &["بني سويف", "beni suef"], lat: 29.0661, lon: 31.0994 },
	Place { names: &["سوهاج", "sohag"], lat: 26.5569, lon: 31.6948 },
	Place { names: &["قنا", "qena"], lat: 26.1551, lon: 32.7160 },
	Place { names: &["اقصر", "أقصر", "luxor"], lat: 25.6872, lon: 32.6396 },
	Place { names: &["اسوان", "أسوان", "aswan"], lat: 24.0889, lon: 32.8998 },
	Place { names: &["غردقة", "hurghada"], lat: 27.2579, lon: 33.8116 },
	Place { names: &["شرم شيخ", "شرم الشيخ", "sharm sheikh"], lat: 27.9158, lon: 34.3300 },
];

/// Canonicalizes a free-text place name for gazetteer lookup: trims,
/// lowercases ASCII, folds alef variants, and strips the Arabic definite
/// article `ال` (and its `al-`/`el-` transliterations) from each word.
pub fn normalize_place(raw: &str) -> String {
	let mut words = Vec::new();

	for word in raw.split_whitespace() {
		let folded: String = word
			.chars()
			.filter(|ch| !is_arabic_diacritic(*ch))
			.map(fold_char)
			.collect::<String>();
		let stripped = strip_definite_article(&folded);

		if !stripped.is_empty() {
			words.push(stripped.to_string());
		}
	}

	words.join(" ")
}

/// Looks up a place by name. Returns `None` on a miss; callers treat that
/// as "no distance filtering", never as an error.
pub fn lookup(raw: &str) -> Option<GeoPoint> {
	let normalized = normalize_place(raw);

	if normalized.is_empty() {
		return None;
	}

	for place in PLACES {
		for name in place.names {
			if normalize_place(name) == normalized {
				return Some(GeoPoint { lat: place.lat, lon: place.lon });
			}
		}
	}

	None
}

fn fold_char(ch: char) -> char {
	match ch {
		'أ' | 'إ' | 'آ' => 'ا',
		'ة' => 'ه',
		_ => ch.to_ascii_lowercase(),
	}
}

fn is_arabic_diacritic(ch: char) -> bool {
	matches!(ch, '\u{064B}'..='\u{0652}' | '\u{0640}')
}

fn strip_definite_article(word: &str) -> &str {
	if let Some(rest) = word.strip_prefix("ال")
		&& !rest.is_empty()
	{
		return rest;
	}

	for prefix in ["al-", "el-"] {
		if let Some(rest) = word.strip_prefix(prefix)
			&& !rest.is_empty()
		{
			return rest;
		}
	}

	word
}
