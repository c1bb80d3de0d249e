// The decision core: turns (date, origin, destination) plus the loaded
// dataset into a displayable result through the tiered fallback policy.
// Pure over the dataset — rendering is somebody else's problem.

use crate::models::{Dataset, ProbPoint, SnapshotStatus};
use crate::{normalize_station, normalize_text, route_key};
use chrono::{Duration, Local, NaiveDate};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Negative band cutoff shared by every variant.
pub const NEGATIVE_THRESHOLD: f64 = 0.3;

/// The positive cutoff changed between variants (0.7 for the full policy,
/// 0.5 in the OD-only deployment) with no recorded rationale, so it stays
/// configurable rather than guessed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolicyConfig {
    pub positive_threshold: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            positive_threshold: 0.7,
        }
    }
}

impl PolicyConfig {
    pub fn od_only_variant() -> Self {
        PolicyConfig {
            positive_threshold: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusBand {
    Positive,
    Negative,
    Neutral,
    Warning,
}

/// Band for a resolved probability, regardless of which tier produced it.
pub fn classify(proba: f64, policy: &PolicyConfig) -> StatusBand {
    if !proba.is_finite() {
        StatusBand::Warning
    } else if proba >= policy.positive_threshold {
        StatusBand::Positive
    } else if proba <= NEGATIVE_THRESHOLD {
        StatusBand::Negative
    } else {
        StatusBand::Neutral
    }
}

/// Signed day count between two calendar midnights. Calendar subtraction,
/// so DST shifts cannot skew the count the way raw millisecond division can.
pub fn delta_days(travel: NaiveDate, today: NaiveDate) -> i32 {
    (travel - today).num_days() as i32
}

pub fn delta_days_from_today(travel: NaiveDate) -> i32 {
    delta_days(travel, Local::now().date_naive())
}

/// Point minimizing `abs(delta_days - target)`. Ties go to the first point
/// encountered, i.e. the lowest index — series are sorted, so the earlier
/// delta wins. Small symmetric series tie constantly; keep this exact.
pub fn find_closest(series: &[ProbPoint], target_delta: i32) -> Option<&ProbPoint> {
    let mut best: Option<(&ProbPoint, i64)> = None;

    for point in series {
        let dist = (i64::from(point.delta_days) - i64::from(target_delta)).abs();
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((point, dist)),
        }
    }

    best.map(|(point, _)| point)
}

/// A user query, as it arrives from the form or the CLI.
#[derive(Clone, Debug, Deserialize)]
pub struct Query {
    pub date: String,
    pub origin: String,
    pub destination: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error("missing {0}: select a date, an origin and a destination")]
    MissingField(&'static str),
    #[error("unreadable date {0:?}, expected YYYY-MM-DD")]
    BadDate(String),
}

/// Which tier of the fallback order produced the probability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// The route's own series answered, exactly or by nearest point.
    RouteSeries {
        point: ProbPoint,
        exact: bool,
        extrapolated: bool,
    },
    /// No series for this route at all; route-agnostic global estimate.
    GlobalFallback { point: ProbPoint },
    /// Dated table had a row for the exact requested calendar date.
    DatedExact { proba_open: f64 },
    /// Dated table had rows for this route on other dates only.
    HistoricalAverage {
        mean_proba: Option<f64>,
        mean_rate: Option<f64>,
        n_rows: usize,
    },
    /// Nothing anywhere. The probability is absent, never fabricated.
    NoData,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResolutionTrace {
    pub departure_date: String,
    pub origin: String,
    pub destination: String,
    pub key: String,
    pub delta: i32,
    pub snapshot_lookup: Option<bool>,
    pub global_used: Option<ProbPoint>,
    pub route_used: Option<ProbPoint>,
    pub series_len: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct Resolution {
    pub proba: Option<f64>,
    pub band: StatusBand,
    pub message: String,
    pub outcome: ResolutionOutcome,
    pub snapshot: SnapshotStatus,
    pub advisory: Option<String>,
    pub delta_days: i32,
    /// Route series for the chart, empty when the route has none.
    pub chart_series: Vec<ProbPoint>,
    pub global_range: Option<(i32, i32)>,
    /// Nearest global probability, displayed alongside whatever tier won.
    pub global_proba: Option<f64>,
    pub trace: ResolutionTrace,
}

/// Snapshot lookup keyed by (normalized date, route key). Three-way outcome;
/// surfaced independently of the probability.
pub fn snapshot_status(dataset: &Dataset, date_raw: &str, key: &str) -> SnapshotStatus {
    let date = normalize_text(date_raw);
    match dataset.snapshot.get(&date) {
        None => SnapshotStatus::NoSnapshotForDate,
        Some(by_key) => match by_key.get(key) {
            None => SnapshotStatus::RouteNotCovered,
            Some(true) => SnapshotStatus::Open,
            Some(false) => SnapshotStatus::Closed,
        },
    }
}

pub fn validate_query(query: &Query) -> Result<NaiveDate, QueryError> {
    if query.date.trim().is_empty() {
        return Err(QueryError::MissingField("date"));
    }
    if normalize_station(&query.origin).is_empty() {
        return Err(QueryError::MissingField("origin"));
    }
    if normalize_station(&query.destination).is_empty() {
        return Err(QueryError::MissingField("destination"));
    }
    NaiveDate::parse_from_str(query.date.trim(), "%Y-%m-%d")
        .map_err(|_| QueryError::BadDate(query.date.clone()))
}

/// Resolve against today's date. See [`resolve_at`] for the policy itself.
pub fn resolve(
    query: &Query,
    dataset: &Dataset,
    policy: &PolicyConfig,
) -> Result<Resolution, QueryError> {
    resolve_at(query, dataset, policy, Local::now().date_naive())
}

/// The tiered resolution policy, with an injectable "today" so tests stay
/// deterministic.
///
/// Preference order: route series (exact, then nearest point with an
/// out-of-range advisory), global series, dated table (exact date, then
/// historical average), and finally an explicit no-data result.
pub fn resolve_at(
    query: &Query,
    dataset: &Dataset,
    policy: &PolicyConfig,
    today: NaiveDate,
) -> Result<Resolution, QueryError> {
    let travel = validate_query(query)?;

    let key = route_key(&query.origin, &query.destination);
    let delta = delta_days(travel, today);

    let snapshot = snapshot_status(dataset, &query.date, &key);
    let snapshot_lookup = dataset
        .snapshot
        .get(&normalize_text(&query.date))
        .and_then(|by_key| by_key.get(&key))
        .copied();

    let global_used = find_closest(&dataset.global_series, delta).copied();
    let global_proba = global_used.map(|p| p.proba_open);

    let route_series = dataset.route_series.get(&key);
    let chart_series = route_series.cloned().unwrap_or_default();

    let mut advisory: Option<String> = None;

    let (outcome, proba) = if let Some(series) = route_series {
        // Tier 1/2: the route's own series. Never empty when present.
        let point = match find_closest(series, delta) {
            Some(point) => *point,
            None => unreachable!("empty series are never stored in the index"),
        };
        let exact = point.delta_days == delta;

        let min_delta = series[0].delta_days;
        let max_delta = series[series.len() - 1].delta_days;
        let extrapolated = delta < min_delta || delta > max_delta;

        if extrapolated {
            let mut text = format!(
                "Delta {} is outside the observed range for this route ({} → {}); \
                 probability taken from the closest observed delta.",
                delta, min_delta, max_delta
            );
            if let Some(fs) = dataset.first_signal.get(&key) {
                let watch_from = travel - Duration::days(i64::from(fs.median));
                text.push_str(&format!(
                    " Historically this route first opens around {} days before \
                     departure (IQR {}–{}, n={}); start watching around {}.",
                    fs.median, fs.p25, fs.p75, fs.n, watch_from
                ));
            }
            advisory = Some(text);
        }

        (
            ResolutionOutcome::RouteSeries {
                point,
                exact,
                extrapolated,
            },
            Some(point.proba_open),
        )
    } else if let Some(point) = global_used {
        // Tier 3: no series for this route at all.
        if point.proba_open >= policy.positive_threshold {
            advisory = Some(
                "Probably often open overall, but this route has no dedicated history."
                    .to_string(),
            );
        }
        (
            ResolutionOutcome::GlobalFallback { point },
            Some(point.proba_open),
        )
    } else if let Some(rows) = dataset.dated.get(&key) {
        // Tier 4: older dated table. Exact calendar date first, else the
        // historical average across every observed date for the route.
        let exact_row = rows
            .iter()
            .find(|r| r.date == Some(travel) && r.proba_open.is_some());

        match exact_row {
            Some(row) => {
                let p = match row.proba_open {
                    Some(p) => p,
                    None => unreachable!("filtered on proba_open.is_some()"),
                };
                (ResolutionOutcome::DatedExact { proba_open: p }, Some(p))
            }
            None => {
                let probas: Vec<f64> = rows.iter().filter_map(|r| r.proba_open).collect();
                let rates: Vec<f64> = rows.iter().filter_map(|r| r.historical_rate).collect();
                let mean = |xs: &[f64]| {
                    (!xs.is_empty()).then(|| xs.iter().sum::<f64>() / xs.len() as f64)
                };

                let mean_proba = mean(&probas);
                let mean_rate = mean(&rates);
                match mean_proba {
                    Some(_) => (
                        ResolutionOutcome::HistoricalAverage {
                            mean_proba,
                            mean_rate,
                            n_rows: rows.len(),
                        },
                        mean_proba,
                    ),
                    // rows exist but none carries a usable probability
                    None => (ResolutionOutcome::NoData, None),
                }
            }
        }
    } else {
        (ResolutionOutcome::NoData, None)
    };

    let (band, message) = match (&outcome, proba) {
        (ResolutionOutcome::NoData, _) => (
            StatusBand::Warning,
            "No data for this route, at any fallback tier.".to_string(),
        ),
        (_, Some(p)) => {
            let band = classify(p, policy);
            let mut message = match band {
                StatusBand::Positive => "High chance of a TGVmax opening for this route.",
                StatusBand::Negative => "Low chance of a TGVmax opening for this route.",
                StatusBand::Neutral => "Grey zone: TGVmax opening uncertain.",
                StatusBand::Warning => "Insufficient data for this route.",
            }
            .to_string();

            match &outcome {
                ResolutionOutcome::GlobalFallback { .. } => {
                    message.push_str(" (No route-specific data; global estimate.)");
                }
                ResolutionOutcome::HistoricalAverage { n_rows, .. } => {
                    message.push_str(&format!(
                        " (Historical average over {} dated observations; \
                         no row for the requested date.)",
                        n_rows
                    ));
                }
                _ => {}
            }
            (band, message)
        }
        // unreachable in practice: every non-NoData outcome carries a proba
        (_, None) => (
            StatusBand::Warning,
            "Insufficient data for this route.".to_string(),
        ),
    };

    let route_used = match &outcome {
        ResolutionOutcome::RouteSeries { point, .. } => Some(*point),
        _ => None,
    };

    Ok(Resolution {
        proba,
        band,
        message,
        outcome,
        snapshot,
        advisory,
        delta_days: delta,
        chart_series,
        global_range: dataset.global_range(),
        global_proba,
        trace: ResolutionTrace {
            departure_date: normalize_text(&query.date),
            origin: normalize_station(&query.origin),
            destination: normalize_station(&query.destination),
            key,
            delta,
            snapshot_lookup,
            global_used,
            route_used,
            series_len: chart_series_len(dataset, &query.origin, &query.destination),
        },
    })
}

fn chart_series_len(dataset: &Dataset, origin: &str, destination: &str) -> usize {
    dataset
        .route_series
        .get(&route_key(origin, destination))
        .map(Vec::len)
        .unwrap_or(0)
}

/// One compute at a time. The delayed path shares mutable display state with
/// its caller, so overlapping resolutions must be refused, not queued.
#[derive(Debug, Default)]
pub struct ComputeGate {
    busy: AtomicBool,
}

pub struct ComputePermit<'a> {
    gate: &'a ComputeGate,
}

impl ComputeGate {
    pub fn new() -> Self {
        ComputeGate {
            busy: AtomicBool::new(false),
        }
    }

    /// None while another compute holds the permit.
    pub fn try_acquire(&self) -> Option<ComputePermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ComputePermit { gate: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for ComputePermit<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

#[derive(Error, Debug)]
pub enum SlowResolveError {
    #[error("a computation is already running")]
    Busy,
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// The simulated-work variant: hold the gate, sleep a bounded random
/// 2.0–3.2 s, then resolve. The permit is released on every exit path.
pub async fn resolve_with_delay(
    gate: &ComputeGate,
    query: &Query,
    dataset: &Dataset,
    policy: &PolicyConfig,
) -> Result<Resolution, SlowResolveError> {
    let _permit = gate.try_acquire().ok_or(SlowResolveError::Busy)?;

    let delay_ms = rand::rng().random_range(2000..=3200);
    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;

    Ok(resolve(query, dataset, policy)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dataset;
    use ahash::AHashMap;
    use chrono::NaiveDate;

    fn pt(delta_days: i32, proba_open: f64) -> ProbPoint {
        ProbPoint {
            delta_days,
            proba_open,
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn query(date: &str, origin: &str, destination: &str) -> Query {
        Query {
            date: date.to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
        }
    }

    fn dataset_with_route(global: Vec<ProbPoint>, key_series: &[(&str, Vec<ProbPoint>)]) -> Dataset {
        let mut route_series = AHashMap::new();
        for (key, series) in key_series {
            route_series.insert(key.to_string(), series.clone());
        }
        Dataset {
            has_global_series: !global.is_empty(),
            has_route_series: !route_series.is_empty(),
            global_series: global,
            route_series,
            ..Dataset::default()
        }
    }

    #[test]
    fn nearest_point_minimizes_distance() {
        let series = vec![pt(-5, 0.1), pt(0, 0.5), pt(10, 0.9)];
        let found = find_closest(&series, 3).unwrap();
        assert_eq!(found.delta_days, 0);
        assert_eq!(found.proba_open, 0.5);
    }

    #[test]
    fn nearest_point_tie_goes_to_first() {
        let series = vec![pt(-2, 0.2), pt(2, 0.8)];
        let found = find_closest(&series, 0).unwrap();
        assert_eq!(found.delta_days, -2);
    }

    #[test]
    fn nearest_point_on_empty_series() {
        assert!(find_closest(&[], 0).is_none());
    }

    #[test]
    fn delta_days_today_and_tomorrow() {
        let today = day("2026-08-24");
        assert_eq!(delta_days(today, today), 0);
        assert_eq!(delta_days(day("2026-08-25"), today), 1);
        assert_eq!(delta_days(day("2026-08-20"), today), -4);
    }

    #[test]
    fn classification_bands_both_variants() {
        for (policy, positive_floor) in [
            (PolicyConfig::default(), 0.7),
            (PolicyConfig::od_only_variant(), 0.5),
        ] {
            assert_eq!(classify(positive_floor, &policy), StatusBand::Positive);
            assert_eq!(classify(positive_floor + 0.1, &policy), StatusBand::Positive);
            assert_eq!(classify(positive_floor - 0.05, &policy), StatusBand::Neutral);
            assert_eq!(classify(0.3, &policy), StatusBand::Negative);
            assert_eq!(classify(0.1, &policy), StatusBand::Negative);
            assert_eq!(classify(f64::NAN, &policy), StatusBand::Warning);
        }
    }

    #[test]
    fn end_to_end_exact_route_hit() {
        let dataset = dataset_with_route(
            vec![pt(-10, 0.2), pt(0, 0.6), pt(20, 0.9)],
            &[("PARIS||LYON", vec![pt(0, 0.8)])],
        );
        let today = day("2026-08-24");

        let res = resolve_at(
            &query("2026-08-24", "PARIS", "LYON"),
            &dataset,
            &PolicyConfig::default(),
            today,
        )
        .unwrap();

        assert_eq!(res.proba, Some(0.8));
        assert_eq!(res.band, StatusBand::Positive);
        assert_eq!(res.delta_days, 0);
        assert!(res.advisory.is_none());
        assert_eq!(
            res.outcome,
            ResolutionOutcome::RouteSeries {
                point: pt(0, 0.8),
                exact: true,
                extrapolated: false,
            }
        );
        assert_eq!(res.snapshot, SnapshotStatus::NoSnapshotForDate);
    }

    #[test]
    fn out_of_range_is_flagged_extrapolated() {
        let dataset = dataset_with_route(
            vec![pt(-10, 0.2), pt(0, 0.6), pt(20, 0.9)],
            &[("PARIS||LYON", vec![pt(0, 0.8)])],
        );
        let today = day("2026-08-24");

        // target delta 50, series range is [0, 0]
        let res = resolve_at(
            &query("2026-10-13", "PARIS", "LYON"),
            &dataset,
            &PolicyConfig::default(),
            today,
        )
        .unwrap();

        assert_eq!(res.delta_days, 50);
        assert_eq!(res.proba, Some(0.8));
        match res.outcome {
            ResolutionOutcome::RouteSeries {
                exact,
                extrapolated,
                ..
            } => {
                assert!(!exact);
                assert!(extrapolated);
            }
            other => panic!("expected route series outcome, got {:?}", other),
        }
        assert!(res.advisory.is_some());
    }

    #[test]
    fn first_signal_enriches_the_advisory() {
        let mut dataset = dataset_with_route(
            Vec::new(),
            &[("PARIS||LYON", vec![pt(0, 0.8)])],
        );
        dataset.first_signal.insert(
            "PARIS||LYON".to_string(),
            crate::models::FirstSignal {
                median: 14,
                p25: 7,
                p75: 21,
                n: 120,
            },
        );
        dataset.has_first_signal = true;
        let today = day("2026-08-24");

        let res = resolve_at(
            &query("2026-10-13", "PARIS", "LYON"),
            &dataset,
            &PolicyConfig::default(),
            today,
        )
        .unwrap();

        let advisory = res.advisory.expect("advisory expected");
        // travel date minus median first-open delta
        assert!(advisory.contains("2026-09-29"), "advisory was: {advisory}");
    }

    #[test]
    fn global_fallback_when_route_unknown() {
        let dataset = dataset_with_route(
            vec![pt(-10, 0.2), pt(0, 0.6), pt(20, 0.9)],
            &[("PARIS||LYON", vec![pt(0, 0.8)])],
        );
        let today = day("2026-08-24");

        let res = resolve_at(
            &query("2026-08-24", "PARIS", "MARSEILLE"),
            &dataset,
            &PolicyConfig::default(),
            today,
        )
        .unwrap();

        assert_eq!(res.proba, Some(0.6));
        assert_eq!(
            res.outcome,
            ResolutionOutcome::GlobalFallback { point: pt(0, 0.6) }
        );
        assert!(res.chart_series.is_empty());
    }

    #[test]
    fn global_fallback_positive_carries_hint() {
        let dataset = dataset_with_route(vec![pt(0, 0.9)], &[]);
        let res = resolve_at(
            &query("2026-08-24", "PARIS", "MARSEILLE"),
            &dataset,
            &PolicyConfig::default(),
            day("2026-08-24"),
        )
        .unwrap();

        assert!(res.advisory.unwrap().contains("no dedicated history"));
    }

    #[test]
    fn dated_table_exact_then_average() {
        let mut dataset = Dataset::default();
        dataset.has_dated_table = true;
        dataset.dated.insert(
            "PARIS||LYON".to_string(),
            vec![
                crate::models::DatedRow {
                    date: Some(day("2026-08-24")),
                    proba_open: Some(0.75),
                    historical_rate: Some(0.5),
                    n_obs: Some(10),
                },
                crate::models::DatedRow {
                    date: Some(day("2026-08-25")),
                    proba_open: Some(0.25),
                    historical_rate: Some(0.25),
                    n_obs: Some(4),
                },
            ],
        );
        let policy = PolicyConfig::default();

        let exact = resolve_at(
            &query("2026-08-24", "PARIS", "LYON"),
            &dataset,
            &policy,
            day("2026-08-20"),
        )
        .unwrap();
        assert_eq!(
            exact.outcome,
            ResolutionOutcome::DatedExact { proba_open: 0.75 }
        );

        let averaged = resolve_at(
            &query("2026-09-01", "PARIS", "LYON"),
            &dataset,
            &policy,
            day("2026-08-20"),
        )
        .unwrap();
        match averaged.outcome {
            ResolutionOutcome::HistoricalAverage {
                mean_proba,
                mean_rate,
                n_rows,
            } => {
                assert_eq!(mean_proba, Some(0.5));
                assert_eq!(mean_rate, Some(0.375));
                assert_eq!(n_rows, 2);
            }
            other => panic!("expected historical average, got {:?}", other),
        }
    }

    #[test]
    fn no_data_is_never_fabricated() {
        let dataset = Dataset::default();
        let res = resolve_at(
            &query("2026-08-24", "NOWHERE", "ELSEWHERE"),
            &dataset,
            &PolicyConfig::default(),
            day("2026-08-24"),
        )
        .unwrap();

        assert_eq!(res.proba, None);
        assert_eq!(res.outcome, ResolutionOutcome::NoData);
        assert_eq!(res.band, StatusBand::Warning);
    }

    #[test]
    fn missing_fields_are_rejected_before_computation() {
        let dataset = Dataset::default();
        let policy = PolicyConfig::default();
        let today = day("2026-08-24");

        let err = resolve_at(&query("", "PARIS", "LYON"), &dataset, &policy, today);
        assert_eq!(err.unwrap_err(), QueryError::MissingField("date"));

        let err = resolve_at(&query("2026-08-24", "  ", "LYON"), &dataset, &policy, today);
        assert_eq!(err.unwrap_err(), QueryError::MissingField("origin"));

        let err = resolve_at(&query("24/08/2026", "PARIS", "LYON"), &dataset, &policy, today);
        assert!(matches!(err.unwrap_err(), QueryError::BadDate(_)));
    }

    #[test]
    fn snapshot_is_three_way_and_independent() {
        let mut dataset = dataset_with_route(
            Vec::new(),
            &[("PARIS||LYON", vec![pt(0, 0.1)])],
        );
        let mut by_key = AHashMap::new();
        by_key.insert("PARIS||LYON".to_string(), true);
        by_key.insert("LYON||PARIS".to_string(), false);
        dataset.snapshot.insert("2026-08-24".to_string(), by_key);
        dataset.has_snapshot = true;

        assert_eq!(
            snapshot_status(&dataset, "2026-08-24", "PARIS||LYON"),
            SnapshotStatus::Open
        );
        assert_eq!(
            snapshot_status(&dataset, "2026-08-24", "LYON||PARIS"),
            SnapshotStatus::Closed
        );
        assert_eq!(
            snapshot_status(&dataset, "2026-08-24", "PARIS||NICE"),
            SnapshotStatus::RouteNotCovered
        );
        assert_eq!(
            snapshot_status(&dataset, "2026-08-25", "PARIS||LYON"),
            SnapshotStatus::NoSnapshotForDate
        );

        // the probability is untouched by an open snapshot
        let res = resolve_at(
            &query("2026-08-24", "PARIS", "LYON"),
            &dataset,
            &PolicyConfig::default(),
            day("2026-08-24"),
        )
        .unwrap();
        assert_eq!(res.proba, Some(0.1));
        assert_eq!(res.snapshot, SnapshotStatus::Open);
    }

    #[test]
    fn gate_refuses_overlap_and_releases_on_drop() {
        let gate = ComputeGate::new();
        let permit = gate.try_acquire().expect("gate starts free");
        assert!(gate.is_busy());
        assert!(gate.try_acquire().is_none());
        drop(permit);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_some());
    }

    #[tokio::test]
    async fn delayed_resolution_is_gated() {
        let gate = ComputeGate::new();
        let dataset = Dataset::default();
        let policy = PolicyConfig::default();
        let q = query("2026-08-24", "PARIS", "LYON");

        let _permit = gate.try_acquire().unwrap();
        let second = resolve_with_delay(&gate, &q, &dataset, &policy).await;
        assert!(matches!(second, Err(SlowResolveError::Busy)));
    }
}
