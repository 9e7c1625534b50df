//! In-memory pagination for post-processed result sets.
//!
//! Storage-side pagination handles the cheap path; this module slices the
//! ranked scan window when ordering or filtering happened in memory. The
//! reported total is the filtered in-memory length, so it undercounts
//! whenever the scan window was capped.

/// Slices `[offset, offset + limit)` out of a ranked set and reports the
/// set's full length as the total. An offset past the end yields an empty
/// page, never an error.
pub(crate) fn paginate_in_memory<T>(items: Vec<T>, offset: u64, limit: u32) -> (Vec<T>, i64) {
	let total = items.len() as i64;
	let page = items
		.into_iter()
		.skip(usize::try_from(offset).unwrap_or(usize::MAX))
		.take(limit as usize)
		.collect();

	(page, total)
}

pub(crate) fn page_count(total: i64, limit: u32) -> i64 {
	if total <= 0 {
		return 0;
	}

	(total + i64::from(limit) - 1) / i64::from(limit)
}
