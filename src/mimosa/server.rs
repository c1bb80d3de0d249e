// Maxplace HTTP API: serves the resolution policy, station list and
// metadata over JSON for whatever front end wants to render them.

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::arc_with_non_send_sync,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_unit_value,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::bytes_nth,
    clippy::deprecated_clippy_cfg_attr,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

use actix_web::middleware::DefaultHeaders;
use actix_web::{App, HttpResponse, HttpServer, Responder, middleware, web};
use log::{error, info};
use maxplace::fetch::{self, ArtifactSource};
use maxplace::models::Dataset;
use maxplace::resolve::{
    ComputeGate, PolicyConfig, Query, QueryError, SlowResolveError, resolve, resolve_with_delay,
};
use serde::Deserialize;
use std::sync::Arc;

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Maxplace TGVmax open-seat probability API")
}

async fn robots() -> impl Responder {
    HttpResponse::Ok().body("User-agent: *\nDisallow: /\n")
}

#[actix_web::get("/metadata")]
pub async fn metadata(dataset: web::Data<Arc<Dataset>>) -> impl Responder {
    match &dataset.metadata {
        Some(meta) => HttpResponse::Ok().json(serde_json::json!({
            "summary": meta.summary_line(),
            "counters": meta,
        })),
        None => HttpResponse::Ok().json(serde_json::json!({
            "summary": "Metadata unavailable.",
            "counters": null,
        })),
    }
}

#[actix_web::get("/stations")]
pub async fn stations(dataset: web::Data<Arc<Dataset>>) -> impl Responder {
    let list: Vec<serde_json::Value> = dataset
        .stations
        .iter()
        .map(|name| {
            serde_json::json!({
                "label": name,
                "value": maxplace::normalize_station(name),
            })
        })
        .collect();

    HttpResponse::Ok().json(list)
}

#[derive(Deserialize)]
struct ResolveParams {
    date: Option<String>,
    origin: Option<String>,
    destination: Option<String>,
}

impl ResolveParams {
    fn into_query(self) -> Query {
        Query {
            date: self.date.unwrap_or_default(),
            origin: self.origin.unwrap_or_default(),
            destination: self.destination.unwrap_or_default(),
        }
    }
}

fn query_error_body(e: &QueryError) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "status": "warning",
        "message": e.to_string(),
    }))
}

#[actix_web::get("/resolve")]
pub async fn resolve_route(
    params: web::Query<ResolveParams>,
    dataset: web::Data<Arc<Dataset>>,
    policy: web::Data<PolicyConfig>,
) -> impl Responder {
    let query = params.into_inner().into_query();

    match resolve(&query, &dataset, &policy) {
        Ok(resolution) => HttpResponse::Ok().json(resolution),
        Err(e) => query_error_body(&e),
    }
}

#[actix_web::get("/resolve_slow")]
pub async fn resolve_route_slow(
    params: web::Query<ResolveParams>,
    dataset: web::Data<Arc<Dataset>>,
    policy: web::Data<PolicyConfig>,
    gate: web::Data<Arc<ComputeGate>>,
) -> impl Responder {
    let query = params.into_inner().into_query();

    match resolve_with_delay(&gate, &query, &dataset, &policy).await {
        Ok(resolution) => HttpResponse::Ok().json(resolution),
        Err(SlowResolveError::Busy) => HttpResponse::TooManyRequests().json(serde_json::json!({
            "status": "warning",
            "message": "A computation is already running, try again shortly.",
        })),
        Err(SlowResolveError::Query(e)) => query_error_body(&e),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let source = ArtifactSource::from_env().unwrap_or_else(|| ArtifactSource::Http {
        base_url: "https://raw.githubusercontent.com/matteotoutain/ECM_2526_FinalProject/main/precomputed".to_string(),
    });

    let dataset = match fetch::load_all(&source).await {
        Ok(dataset) => Arc::new(dataset),
        Err(e) => {
            error!("fatal: {}", e);
            return Err(std::io::Error::other(e));
        }
    };

    let policy = match std::env::var("POSITIVE_THRESHOLD")
        .ok()
        .and_then(|raw| raw.parse::<f64>().ok())
    {
        Some(positive_threshold) => PolicyConfig { positive_threshold },
        None => PolicyConfig::default(),
    };

    let gate = Arc::new(ComputeGate::new());

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    info!("mimosa listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(
                DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Server", "Maxplace")),
            )
            .wrap(middleware::Compress::default())
            .app_data(web::Data::new(Arc::clone(&dataset)))
            .app_data(web::Data::new(policy))
            .app_data(web::Data::new(Arc::clone(&gate)))
            .route("/", web::get().to(index))
            .route("robots.txt", web::get().to(robots))
            .service(metadata)
            .service(stations)
            .service(resolve_route)
            .service(resolve_route_slow)
    })
    .bind(bind_addr)?
    .run()
    .await
}
