// Builds the in-memory indexes out of decoded table rows. Ingestion is
// best-effort by contract: malformed rows are dropped, never raised — the
// artifacts are semi-trusted precomputed output and a sparse series is more
// useful than a failed load.

use crate::models::{DatedRow, FirstSignal, ProbPoint};
use crate::table_parse::RawRow;
use crate::{normalize_text, route_key};
use ahash::AHashMap;
use chrono::NaiveDate;

/// Column names, matched literally against table headers.
pub mod columns {
    pub const GLOBAL_DELTA: &str = "delta_days";
    pub const GLOBAL_PROBA: &str = "proba_open";

    pub const OD_ORIGIN: &str = "origin";
    pub const OD_DEST: &str = "destination";
    pub const OD_DELTA: &str = "delta_days";
    pub const OD_PROBA: &str = "proba_open";

    pub const SNAP_DATE: &str = "departure_date";
    pub const SNAP_ORIGIN: &str = "origin";
    pub const SNAP_DEST: &str = "destination";
    pub const SNAP_OPEN: &str = "is_open_today";

    pub const FS_ORIGIN: &str = "origin";
    pub const FS_DEST: &str = "destination";
    pub const FS_MEDIAN: &str = "first_open_median";
    pub const FS_P25: &str = "first_open_p25";
    pub const FS_P75: &str = "first_open_p75";
    pub const FS_N: &str = "n_obs";

    pub const HIST_DATE: &str = "date";
    pub const HIST_ORIGIN: &str = "origin";
    pub const HIST_DEST: &str = "destination";
    pub const HIST_PROBA: &str = "prob_open";
    pub const HIST_RATE: &str = "historical_rate";
    pub const HIST_N: &str = "n_obs";
}

fn field<'a>(row: &'a RawRow, name: &str) -> &'a str {
    row.get(name).map(String::as_str).unwrap_or("")
}

fn parse_i32(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok()
}

fn parse_u32(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok()
}

fn parse_finite_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Flexible truthy tokens used by the snapshot flag. Everything else —
/// "0", "false", "non", empty, garbage — is false.
pub fn parse_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "oui" | "yes"
    )
}

/// Global (unkeyed) probability series, sorted ascending by delta. The sort
/// is stable so duplicate deltas keep input order.
pub fn build_global_series(rows: &[RawRow]) -> Vec<ProbPoint> {
    let mut points: Vec<ProbPoint> = rows
        .iter()
        .filter_map(|row| {
            Some(ProbPoint {
                delta_days: parse_i32(field(row, columns::GLOBAL_DELTA))?,
                proba_open: parse_finite_f64(field(row, columns::GLOBAL_PROBA))?,
            })
        })
        .collect();

    points.sort_by_key(|p| p.delta_days);
    points
}

/// Per-route probability series keyed by `route_key`. Empty series are never
/// stored: a key is present iff at least one row survived decoding.
pub fn build_route_series(rows: &[RawRow]) -> AHashMap<String, Vec<ProbPoint>> {
    let mut by_key: AHashMap<String, Vec<ProbPoint>> = AHashMap::new();

    for row in rows {
        let origin = field(row, columns::OD_ORIGIN);
        let destination = field(row, columns::OD_DEST);
        if origin.is_empty() || destination.is_empty() {
            continue;
        }

        let delta_days = match parse_i32(field(row, columns::OD_DELTA)) {
            Some(v) => v,
            None => continue,
        };
        let proba_open = match parse_finite_f64(field(row, columns::OD_PROBA)) {
            Some(v) => v,
            None => continue,
        };

        by_key
            .entry(route_key(origin, destination))
            .or_default()
            .push(ProbPoint {
                delta_days,
                proba_open,
            });
    }

    for series in by_key.values_mut() {
        series.sort_by_key(|p| p.delta_days);
    }

    by_key
}

/// Two-level snapshot index: normalized date string → route key → open flag.
pub fn build_snapshot_index(rows: &[RawRow]) -> AHashMap<String, AHashMap<String, bool>> {
    let mut by_date: AHashMap<String, AHashMap<String, bool>> = AHashMap::new();

    for row in rows {
        let date = normalize_text(field(row, columns::SNAP_DATE));
        let origin = field(row, columns::SNAP_ORIGIN);
        let destination = field(row, columns::SNAP_DEST);
        if date.is_empty() || origin.is_empty() || destination.is_empty() {
            continue;
        }

        let open = parse_truthy(field(row, columns::SNAP_OPEN));
        by_date
            .entry(date)
            .or_default()
            .insert(route_key(origin, destination), open);
    }

    by_date
}

/// First-signal summary, one entry per route key. All four numeric fields
/// must parse or the row is dropped. Later rows for the same key win.
pub fn build_first_signal_index(rows: &[RawRow]) -> AHashMap<String, FirstSignal> {
    let mut by_key: AHashMap<String, FirstSignal> = AHashMap::new();

    for row in rows {
        let origin = field(row, columns::FS_ORIGIN);
        let destination = field(row, columns::FS_DEST);
        if origin.is_empty() || destination.is_empty() {
            continue;
        }

        let summary = match (
            parse_i32(field(row, columns::FS_MEDIAN)),
            parse_i32(field(row, columns::FS_P25)),
            parse_i32(field(row, columns::FS_P75)),
            parse_u32(field(row, columns::FS_N)),
        ) {
            (Some(median), Some(p25), Some(p75), Some(n)) => FirstSignal { median, p25, p75, n },
            _ => continue,
        };

        by_key.insert(route_key(origin, destination), summary);
    }

    by_key
}

/// Dated historical table keyed by route. Only origin and destination are
/// required; the numeric fields default to absent when they fail to parse.
pub fn build_dated_index(rows: &[RawRow]) -> AHashMap<String, Vec<DatedRow>> {
    let mut by_key: AHashMap<String, Vec<DatedRow>> = AHashMap::new();

    for row in rows {
        let origin = field(row, columns::HIST_ORIGIN);
        let destination = field(row, columns::HIST_DEST);
        if origin.is_empty() || destination.is_empty() {
            continue;
        }

        let date =
            NaiveDate::parse_from_str(field(row, columns::HIST_DATE).trim(), "%Y-%m-%d").ok();

        by_key
            .entry(route_key(origin, destination))
            .or_default()
            .push(DatedRow {
                date,
                proba_open: parse_finite_f64(field(row, columns::HIST_PROBA)),
                historical_rate: parse_finite_f64(field(row, columns::HIST_RATE)),
                n_obs: parse_u32(field(row, columns::HIST_N)),
            });
    }

    by_key
}
