pub mod similarity;

use color_eyre::Result;
use reqwest::header::{AUTHORIZATION, HeaderMap};

pub fn auth_headers(api_key: Option<&str>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if let Some(key) = api_key.filter(|key| !key.trim().is_empty()) {
		headers.insert(AUTHORIZATION, format!("Bearer {key}").parse()?);
	}

	Ok(headers)
}
