// Loads the precomputed artifacts and assembles the immutable Dataset.
// All fetches go out concurrently; only the global probability table is
// essential. Everything else degrades: the dependent feature goes dark and
// the session carries on. No retry, no refetch — a failed artifact stays
// failed until the next full load.

use crate::index_builders::{
    build_dated_index, build_first_signal_index, build_global_series, build_route_series,
    build_snapshot_index,
};
use crate::models::{Dataset, Metadata};
use crate::table_parse::parse_rows;
use log::{info, warn};
use std::path::PathBuf;
use thiserror::Error;

pub const METADATA_FILE: &str = "metadata.json";
pub const STATIONS_FILE: &str = "stations.json";
pub const PROBA_GLOBAL_FILE: &str = "proba_global.csv";
pub const PROBA_OD_FILE: &str = "proba_od.csv";
pub const SNAPSHOT_TODAY_FILE: &str = "snapshot_today_od.csv";
pub const FIRST_SIGNAL_FILE: &str = "first_signal_od.csv";
pub const HISTORY_OD_FILE: &str = "history_od.csv";

/// Where the precomputed artifacts live: a URL prefix or a local directory.
#[derive(Clone, Debug)]
pub enum ArtifactSource {
    Http { base_url: String },
    Dir { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http status {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("essential artifact {name} failed to load: {source}")]
    Essential {
        name: &'static str,
        source: FetchError,
    },
}

impl ArtifactSource {
    pub fn from_env() -> Option<Self> {
        if let Ok(dir) = std::env::var("MAXPLACE_DATA_DIR") {
            return Some(ArtifactSource::Dir { path: dir.into() });
        }
        std::env::var("MAXPLACE_DATA_URL")
            .ok()
            .map(|base_url| ArtifactSource::Http { base_url })
    }

    async fn read(&self, client: &reqwest::Client, name: &str) -> Result<String, FetchError> {
        match self {
            ArtifactSource::Http { base_url } => {
                let url = format!("{}/{}", base_url.trim_end_matches('/'), name);
                let response = client.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(FetchError::Status(response.status()));
                }
                Ok(response.text().await?)
            }
            ArtifactSource::Dir { path } => Ok(tokio::fs::read_to_string(path.join(name)).await?),
        }
    }
}

fn degrade<T>(name: &str, result: Result<T, FetchError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{} unavailable, feature degraded: {}", name, e);
            None
        }
    }
}

/// Fetch every artifact concurrently and build the dataset. Fails only when
/// the global probability table is unreachable; each other artifact clears
/// its capability flag and logs a warning instead.
pub async fn load_all(source: &ArtifactSource) -> Result<Dataset, LoadError> {
    let client = reqwest::Client::new();

    let (meta_res, stations_res, global_res, od_res, snap_res, first_res, hist_res) = futures::join!(
        source.read(&client, METADATA_FILE),
        source.read(&client, STATIONS_FILE),
        source.read(&client, PROBA_GLOBAL_FILE),
        source.read(&client, PROBA_OD_FILE),
        source.read(&client, SNAPSHOT_TODAY_FILE),
        source.read(&client, FIRST_SIGNAL_FILE),
        source.read(&client, HISTORY_OD_FILE),
    );

    let global_text = global_res.map_err(|source| LoadError::Essential {
        name: PROBA_GLOBAL_FILE,
        source,
    })?;
    let global_series = build_global_series(&parse_rows(&global_text));

    let metadata: Option<Metadata> = degrade(METADATA_FILE, meta_res).and_then(|text| {
        match serde_json::from_str(&text) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!("{} unreadable, feature degraded: {}", METADATA_FILE, e);
                None
            }
        }
    });

    let stations: Vec<String> = degrade(STATIONS_FILE, stations_res)
        .and_then(|text| match serde_json::from_str::<Vec<String>>(&text) {
            Ok(list) => Some(list),
            Err(e) => {
                warn!("{} unreadable, feature degraded: {}", STATIONS_FILE, e);
                None
            }
        })
        .unwrap_or_default();

    let route_series = degrade(PROBA_OD_FILE, od_res)
        .map(|text| build_route_series(&parse_rows(&text)));
    let snapshot = degrade(SNAPSHOT_TODAY_FILE, snap_res)
        .map(|text| build_snapshot_index(&parse_rows(&text)));
    let first_signal = degrade(FIRST_SIGNAL_FILE, first_res)
        .map(|text| build_first_signal_index(&parse_rows(&text)));
    let dated = degrade(HISTORY_OD_FILE, hist_res)
        .map(|text| build_dated_index(&parse_rows(&text)));

    let dataset = Dataset {
        metadata,
        stations,
        has_global_series: true,
        global_series,
        has_route_series: route_series.is_some(),
        route_series: route_series.unwrap_or_default(),
        has_snapshot: snapshot.is_some(),
        snapshot: snapshot.unwrap_or_default(),
        has_first_signal: first_signal.is_some(),
        first_signal: first_signal.unwrap_or_default(),
        has_dated_table: dated.is_some(),
        dated: dated.unwrap_or_default(),
    };

    info!(
        "dataset loaded: {} global points, {} routes, {} snapshot dates, {} first-signal routes, {} dated routes, {} stations",
        dataset.global_series.len(),
        dataset.route_series.len(),
        dataset.snapshot.len(),
        dataset.first_signal.len(),
        dataset.dated.len(),
        dataset.stations.len(),
    );

    Ok(dataset)
}
