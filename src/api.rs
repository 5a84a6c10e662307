use std::sync::Arc;

use actix_web::{HttpResponse, Responder, get, web};
use serde::{Deserialize, Serialize};

use crate::aggregate::{Listings, PAGE_SIZE};
use crate::error::ServiceError;
use crate::fetch::{ListingRequest, SortMode};
use crate::interval::Interval;
use crate::registry::{Registry, SavedQuery};

const DEFAULT_AMOUNT: i64 = 5;

/// Process-wide collaborators, built once in `main` and shared by every worker.
pub struct AppState {
    pub registry: Arc<dyn Registry>,
    pub listings: Listings,
}

impl AppState {
    pub fn new(registry: Arc<dyn Registry>, listings: Listings) -> Self {
        Self { registry, listings }
    }

    async fn lookup(&self, uuid: &str) -> Result<SavedQuery, ServiceError> {
        self.registry
            .get(uuid)
            .await?
            .ok_or_else(|| ServiceError::NotFound(uuid.to_string()))
    }
}

/// Registers every route plus a query-string error handler that answers in JSON.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ServiceError::InvalidParams(err.to_string()).into()),
    )
    .service(index)
    .service(healthz)
    .service(add)
    .service(get_query)
    .service(stat)
    .service(top);
}

// -------------------------
// Request / Response Types
// -------------------------

#[derive(Deserialize)]
struct AddParams {
    query: String,
    region: String,
}

#[derive(Serialize)]
struct AddResponse {
    uuid: String,
}

#[derive(Deserialize)]
struct UuidParams {
    uuid: String,
}

#[derive(Deserialize)]
struct StatParams {
    uuid: String,
    start: String,
    finish: String,
}

#[derive(Serialize)]
struct StatResponse {
    counter: usize,
    timestamps: Vec<String>,
}

#[derive(Deserialize)]
struct TopParams {
    uuid: String,
    amount: Option<i64>,
    sort: Option<String>,
}

#[derive(Serialize)]
struct TopResponse {
    adverts: Vec<String>,
}

// -------------------------
// HTTP Handlers
// -------------------------

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "/add": "add region and query",
        "/get": "get query and region by uuid",
        "/stat": "get stat by id and time interval",
        "/top": "get top n adverts by time or relevance",
    }))
}

#[get("/healthz")]
async fn healthz() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

#[get("/add")]
async fn add(
    state: web::Data<AppState>,
    q: web::Query<AddParams>,
) -> Result<web::Json<AddResponse>, ServiceError> {
    let uuid = state.registry.add(&q.query, &q.region).await?;
    tracing::info!(%uuid, query = %q.query, region = %q.region, "query registered");
    Ok(web::Json(AddResponse { uuid }))
}

#[get("/get")]
async fn get_query(
    state: web::Data<AppState>,
    q: web::Query<UuidParams>,
) -> Result<web::Json<SavedQuery>, ServiceError> {
    Ok(web::Json(state.lookup(&q.uuid).await?))
}

#[get("/stat")]
async fn stat(
    state: web::Data<AppState>,
    q: web::Query<StatParams>,
) -> Result<web::Json<StatResponse>, ServiceError> {
    let saved = state.lookup(&q.uuid).await?;
    let interval = Interval::parse(&q.start, &q.finish)?;

    let request = ListingRequest::new(saved.query, saved.region, SortMode::Date);
    let timestamps = state.listings.timestamps_within(&request, &interval).await?;
    Ok(web::Json(StatResponse {
        counter: timestamps.len(),
        timestamps,
    }))
}

#[get("/top")]
async fn top(
    state: web::Data<AppState>,
    q: web::Query<TopParams>,
) -> Result<web::Json<TopResponse>, ServiceError> {
    let amount = validate_amount(q.amount.unwrap_or(DEFAULT_AMOUNT))?;
    let sort = match q.sort.as_deref() {
        None => SortMode::Date,
        Some(raw) => raw.parse().map_err(|_| ServiceError::InvalidSort)?,
    };

    let saved = state.lookup(&q.uuid).await?;
    let request = ListingRequest::new(saved.query, saved.region, sort);
    let adverts = state.listings.top_urls(&request, amount).await?;
    Ok(web::Json(TopResponse { adverts }))
}

// only the first page is ever fetched, so more than a page's worth cannot be served
fn validate_amount(amount: i64) -> Result<usize, ServiceError> {
    match usize::try_from(amount) {
        Ok(n) if (1..=PAGE_SIZE).contains(&n) => Ok(n),
        _ => Err(ServiceError::InvalidAmount),
    }
}
