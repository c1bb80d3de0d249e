// Typed records for the precomputed artifacts and the loaded dataset.

use ahash::AHashMap;
use chrono::NaiveDate;
use serde_json::Value;

/// One observation of the probability that a TGVmax allocation is open
/// `delta_days` calendar days from the reference date.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbPoint {
    pub delta_days: i32,
    pub proba_open: f64,
}

/// Historical summary of when availability first becomes visible for a
/// route, in days before departure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstSignal {
    pub median: i32,
    pub p25: i32,
    pub p75: i32,
    pub n: u32,
}

/// Row of the older dated historical table. Origin and destination are
/// folded into the route key; the numeric fields are NaN-safe optionals.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatedRow {
    pub date: Option<NaiveDate>,
    pub proba_open: Option<f64>,
    pub historical_rate: Option<f64>,
    pub n_obs: Option<u32>,
}

/// Free-form counters published by the data pipeline. Everything is
/// optional and rendered as-is.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub generated_at_utc: Option<Value>,
    pub n_rows_raw: Option<Value>,
    pub n_rows_enriched: Option<Value>,
    pub n_stations: Option<Value>,
    pub n_rows_proba_global: Option<Value>,
    pub n_rows_proba_od: Option<Value>,
}

fn counter(v: &Option<Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "n.c.".to_string(),
        Some(other) => other.to_string(),
    }
}

impl Metadata {
    pub fn summary_line(&self) -> String {
        format!(
            "Generated {} • {} raw rows • {} enriched • {} stations • {} global • {} OD",
            counter(&self.generated_at_utc),
            counter(&self.n_rows_raw),
            counter(&self.n_rows_enriched),
            counter(&self.n_stations),
            counter(&self.n_rows_proba_global),
            counter(&self.n_rows_proba_od),
        )
    }
}

/// Outcome of the today-snapshot lookup. This is an observed fact about the
/// reference date, surfaced next to the probability but never mixed into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    /// No snapshot rows at all for the requested date.
    NoSnapshotForDate,
    /// Snapshot exists for the date but does not cover this route.
    RouteNotCovered,
    Open,
    Closed,
}

/// Everything the resolution policy reads, built once per load and immutable
/// afterwards. The capability flags record which artifacts actually loaded,
/// as opposed to loading empty.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub metadata: Option<Metadata>,
    pub stations: Vec<String>,

    pub global_series: Vec<ProbPoint>,
    pub route_series: AHashMap<String, Vec<ProbPoint>>,
    pub snapshot: AHashMap<String, AHashMap<String, bool>>,
    pub first_signal: AHashMap<String, FirstSignal>,
    pub dated: AHashMap<String, Vec<DatedRow>>,

    pub has_global_series: bool,
    pub has_route_series: bool,
    pub has_snapshot: bool,
    pub has_first_signal: bool,
    pub has_dated_table: bool,
}

impl Dataset {
    /// Observed delta range of the global series, for the range line.
    pub fn global_range(&self) -> Option<(i32, i32)> {
        match (self.global_series.first(), self.global_series.last()) {
            (Some(first), Some(last)) => Some((first.delta_days, last.delta_days)),
            _ => None,
        }
    }
}
