use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::types::{TimeRange, ValidatedQuery};

/// Time range used when the requested one is missing or unknown.
pub const DEFAULT_TIME_RANGE: TimeRange = TimeRange::ShortTerm;

/// Limits the Web API accepts for the listening views.
pub const ALLOWED_LIMITS: [u32; 4] = [12, 24, 48, 50];

/// Limit used when the requested one is not in [`ALLOWED_LIMITS`].
pub const DEFAULT_LIMIT: u32 = 12;

const TIME_RANGE_TABLE: [(&str, TimeRange, &str); 3] = [
    ("short_term", TimeRange::ShortTerm, "last 4 weeks"),
    ("medium_term", TimeRange::MediumTerm, "last 6 months"),
    ("long_term", TimeRange::LongTerm, "several years"),
];

/// Coerces a raw `time_range` query value into a known range and its label.
///
/// Unknown or missing values fall back to `short_term`.
pub fn validate_time_range(raw: Option<&str>) -> (TimeRange, &'static str) {
    let range = TIME_RANGE_TABLE
        .iter()
        .find(|(key, _, _)| Some(*key) == raw)
        .map(|(_, range, _)| *range)
        .unwrap_or(DEFAULT_TIME_RANGE);
    (range, time_range_label(range))
}

pub fn time_range_label(range: TimeRange) -> &'static str {
    TIME_RANGE_TABLE
        .iter()
        .find(|(_, r, _)| *r == range)
        .map(|(_, _, label)| *label)
        .unwrap_or_default()
}

/// Coerces a raw `limit` into [`ALLOWED_LIMITS`], defaulting to [`DEFAULT_LIMIT`].
pub fn validate_limit(raw: Option<i64>) -> u32 {
    raw.and_then(|l| u32::try_from(l).ok())
        .filter(|l| ALLOWED_LIMITS.contains(l))
        .unwrap_or(DEFAULT_LIMIT)
}

/// Parses the limit as it arrives in a query string. Anything that is not an
/// integer is treated like a missing value.
pub fn parse_limit(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|l| l.trim().parse::<i64>().ok())
}

pub fn validate_query(raw_time_range: Option<&str>, raw_limit: Option<i64>) -> ValidatedQuery {
    let (time_range, label) = validate_time_range(raw_time_range);
    ValidatedQuery {
        time_range,
        label,
        limit: validate_limit(raw_limit),
    }
}

const SESSION_ID_LEN: usize = 48;

pub fn generate_session_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

/// Whether `raw` has the shape of an id from [`generate_session_id`].
pub fn is_session_id(raw: &str) -> bool {
    raw.len() == SESSION_ID_LEN && raw.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Derives the OAuth2 `state` value for a session.
///
/// Deterministic, so repeated authorization requests for one session produce
/// the same URL, and the callback can be matched to the session that started
/// it without storing anything.
pub fn authorization_state(session_id: &str) -> String {
    let hash = Sha256::digest(session_id.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
