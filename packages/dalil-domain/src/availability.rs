//! Open-now evaluation for service availability windows.
//!
//! Windows are either recurring weekly (`day_of_week` set) or one-off date
//! ranges (`start_date`/`end_date` set). Overnight windows, where the end
//! time-of-day is numerically less than the start, wrap past midnight: a
//! Monday 18:00–06:00 window is open Monday 23:00 and Tuesday 05:00 but
//! closed Tuesday 07:00.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time, UtcOffset, Weekday};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
	pub day_of_week: Option<Weekday>,
	pub start_date: Option<Date>,
	pub end_date: Option<Date>,
	pub start_time: Time,
	pub end_time: Time,
}

/// Parses `"HH:MM"` clock strings as stored on availability rows.
pub fn parse_time_hm(raw: &str) -> Option<Time> {
	let (hours, minutes) = raw.trim().split_once(':')?;
	let hours: u8 = hours.parse().ok()?;
	let minutes: u8 = minutes.parse().ok()?;

	Time::from_hms(hours, minutes, 0).ok()
}

/// Parses `"MONDAY"`-style weekday names.
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
	match raw.trim().to_ascii_uppercase().as_str() {
		"MONDAY" => Some(Weekday::Monday),
		"TUESDAY" => Some(Weekday::Tuesday),
		"WEDNESDAY" => Some(Weekday::Wednesday),
		"THURSDAY" => Some(Weekday::Thursday),
		"FRIDAY" => Some(Weekday::Friday),
		"SATURDAY" => Some(Weekday::Saturday),
		"SUNDAY" => Some(Weekday::Sunday),
		_ => None,
	}
}

/// Shifts an instant into the marketplace's fixed timezone offset.
pub fn local_now(now_utc: OffsetDateTime, offset_hours: i8) -> OffsetDateTime {
	let offset = UtcOffset::from_hms(offset_hours, 0, 0).unwrap_or(UtcOffset::UTC);

	now_utc.to_offset(offset)
}

/// True when any window covers the given local instant.
pub fn is_open_at(windows: &[AvailabilityWindow], at: OffsetDateTime) -> bool {
	windows.iter().any(|window| window_covers(window, at))
}

fn window_covers(window: &AvailabilityWindow, at: OffsetDateTime) -> bool {
	let time = at.time();
	let overnight = window.end_time < window.start_time;

	if let Some(day) = window.day_of_week {
		if !overnight {
			return at.weekday() == day && time >= window.start_time && time < window.end_time;
		}

		// Overnight: the tail of the window spills into the following day.
		if at.weekday() == day && time >= window.start_time {
			return true;
		}

		return at.weekday() == day.next() && time < window.end_time;
	}

	if let (Some(start_date), Some(end_date)) = (window.start_date, window.end_date) {
		let date = at.date();

		if !overnight {
			return date >= start_date
				&& date <= end_date
				&& time >= window.start_time
				&& time < window.end_time;
		}

		if date >= start_date && date <= end_date && time >= window.start_time {
			return true;
		}

		let previous = date.previous_day();

		return previous.map(|prev| prev >= start_date && prev <= end_date).unwrap_or(false)
			&& time < window.end_time;
	}

	false
}
