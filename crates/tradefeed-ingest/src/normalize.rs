//! Raw row to trade record normalization
//!
//! Normalization never fails. Every field falls back to a default:
//!
//! - `token_address`: `"UNKNOWN"` when missing or empty
//! - `price_in_sol`: `0` when missing, empty, or not a finite number
//! - `block_time`: the normalization time when missing or empty
//!
//! A price that is present but unparseable still becomes `0`, but it is
//! reported as a [`FieldIssue`] so the caller can tell it apart from a
//! missing price.

use chrono::{DateTime, SecondsFormat, Utc};
use tradefeed_common::types::{BLOCK_TIME, PRICE_IN_SOL, TOKEN_ADDRESS, UNKNOWN_TOKEN};
use tradefeed_common::{RawRow, TradeRecord};

/// A field that held a value but was replaced by its default
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldIssue {
    InvalidPrice(String),
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldIssue::InvalidPrice(raw) => {
                write!(f, "{} '{}' is not a finite number, using 0", PRICE_IN_SOL, raw)
            },
        }
    }
}

/// Result of normalizing one row
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub record: TradeRecord,
    pub issues: Vec<FieldIssue>,
}

/// Normalize a row, using `now` as the fallback block time
pub fn normalize(row: &RawRow, now: DateTime<Utc>) -> Normalized {
    let mut issues = Vec::new();

    let token_address = non_empty(row, TOKEN_ADDRESS).unwrap_or(UNKNOWN_TOKEN);

    let price_in_sol = match non_empty(row, PRICE_IN_SOL) {
        Some(raw) => parse_price(raw).unwrap_or_else(|| {
            issues.push(FieldIssue::InvalidPrice(raw.to_string()));
            0.0
        }),
        None => 0.0,
    };

    let block_time = match non_empty(row, BLOCK_TIME) {
        Some(value) => value.to_string(),
        None => format_timestamp(now),
    };

    Normalized {
        record: TradeRecord::new(token_address, price_in_sol, block_time),
        issues,
    }
}

/// Render a timestamp as ISO-8601 UTC with millisecond precision
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn non_empty<'a>(row: &'a RawRow, column: &str) -> Option<&'a str> {
    row.get(column).map(String::as_str).filter(|v| !v.is_empty())
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}
