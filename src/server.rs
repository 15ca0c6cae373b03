//! REST API for dotdb.
//!
//! One store is opened at startup and shared by all workers behind a mutex,
//! so every durable write and its in-memory update happen as one unit.
//!
//! ## Endpoints
//!
//! - `POST /insert` - Insert vectors, ids are generated
//! - `POST /search` - Search for similar vectors
//! - `POST /get` - Retrieve vectors by ID
//! - `POST /delete` - Delete vectors by ID
//! - `GET /vectors` - List every stored vector
//! - `POST /documents` - Embed and store text, one vector per paragraph
//! - `POST /query` - Embed a text query and search
//!
//! ## Usage
//!
//! ```rust,no_run
//! use actix_web::{App, HttpServer, web};
//! use dotdb::{Config, server::AppState};
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let state = web::Data::new(AppState::open(&Config::default()).await.unwrap());
//!     HttpServer::new(move || App::new().app_data(state.clone()).configure(dotdb::server::config))
//!         .bind("0.0.0.0:7878")?
//!         .run()
//!         .await
//! }
//! ```

use std::collections::HashSet;

use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::error;

use crate::config::Config;
use crate::embed::{Embedder, HashEmbedder, add_document, clamp_top_k, result_text, search_text};
use crate::error::{DotError, Result};
use crate::record::{Metadata, MetadataValue, SearchResult, Vector};
use crate::store::FileBackend;
use crate::DotDB;

/// Shared server state.
pub struct AppState {
    db: Mutex<DotDB<FileBackend>>,
    embedder: Box<dyn Embedder>,
    default_top_k: usize,
    max_top_k: usize,
}

impl AppState {
    /// Opens `config.store_name` under `config.data_dir` with a hashing embedder.
    pub async fn open(config: &Config) -> Result<AppState> {
        let embedder = HashEmbedder::new(config.dimension)?;
        Self::with_embedder(config, Box::new(embedder)).await
    }

    pub async fn with_embedder(config: &Config, embedder: Box<dyn Embedder>) -> Result<AppState> {
        if embedder.dimension() != config.dimension {
            return Err(DotError::DimensionMismatch {
                expected: config.dimension,
                actual: embedder.dimension(),
            });
        }

        let mut db = DotDB::new(config.dimension, FileBackend::new(&config.data_dir))?;
        db.connect(&config.store_name).await?;

        Ok(AppState {
            db: Mutex::new(db),
            embedder,
            default_top_k: config.default_top_k,
            max_top_k: config.max_top_k,
        })
    }
}

// --- Request structs ---

#[derive(Deserialize)]
struct VectorEntry {
    values: Vec<f32>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct Query {
    value: Vec<f32>,
    top_k: usize,
}

#[derive(Deserialize)]
struct InsertRequest {
    vectors: Vec<VectorEntry>,
}

#[derive(Deserialize)]
struct SearchRequest {
    queries: Vec<Query>,
}

#[derive(Deserialize)]
struct IdsRequest {
    ids: Vec<String>,
}

#[derive(Deserialize)]
struct DocumentRequest {
    text: String,
}

#[derive(Deserialize)]
struct TextQueryRequest {
    text: String,
    #[serde(default)]
    top_k: Option<i64>,
}

// --- Response structs ---

#[derive(Serialize)]
struct InsertResponse {
    inserted: usize,
    results: Vec<InsertResult>,
}

#[derive(Serialize)]
struct InsertResult {
    id: Option<String>,
    status: String,
    message: String,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResultGroup>,
}

#[derive(Serialize)]
struct SearchResultGroup {
    matches: Vec<MatchResult>,
    message: String,
}

#[derive(Serialize)]
struct MatchResult {
    id: String,
    score: f32,
    values: Vec<f32>,
    metadata: Option<Value>,
}

#[derive(Serialize)]
struct GetResponse {
    results: Vec<GetResult>,
}

#[derive(Serialize)]
struct GetResult {
    id: String,
    values: Option<Vec<f32>>,
    metadata: Option<Value>,
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: usize,
    results: Vec<DeleteResult>,
}

#[derive(Serialize)]
struct DeleteResult {
    id: String,
    status: String,
}

#[derive(Serialize)]
struct ListResponse {
    count: usize,
    vectors: Vec<GetResult>,
}

#[derive(Serialize)]
struct DocumentResponse {
    added: Vec<AddedParagraph>,
}

#[derive(Serialize)]
struct AddedParagraph {
    id: String,
    text: String,
}

#[derive(Serialize)]
struct TextMatch {
    id: String,
    score: f32,
    text: String,
}

#[derive(Serialize)]
struct TextQueryResponse {
    top_k: usize,
    matches: Vec<TextMatch>,
}

// --- Conversions ---

fn metadata_from_json(map: Option<Map<String, Value>>) -> Option<Metadata> {
    map.map(|m| m.into_iter().map(|(k, v)| (k, MetadataValue::from(v))).collect())
}

fn metadata_to_json(metadata: Option<Metadata>) -> Option<Value> {
    metadata.map(|m| Value::from(MetadataValue::Map(m)))
}

fn to_get_result(vector: Vector) -> GetResult {
    GetResult {
        id: vector.id,
        values: Some(vector.values),
        metadata: metadata_to_json(vector.metadata),
    }
}

fn to_match(result: SearchResult) -> MatchResult {
    MatchResult {
        id: result.vector.id,
        score: result.score,
        values: result.vector.values,
        metadata: metadata_to_json(result.vector.metadata),
    }
}

fn error_response(e: &DotError) -> HttpResponse {
    let body = serde_json::json!({"error": e.to_string()});
    match e {
        DotError::InvalidDimension(_) | DotError::DimensionMismatch { .. } => {
            HttpResponse::BadRequest().json(body)
        }
        DotError::NotConnected => HttpResponse::ServiceUnavailable().json(body),
        DotError::Persistence(_) | DotError::Embedding(_) => {
            error!(error = %e, "request failed");
            HttpResponse::InternalServerError().json(body)
        }
    }
}

// --- Handlers ---

async fn insert_handler(state: web::Data<AppState>, body: web::Json<InsertRequest>) -> impl Responder {
    let mut db = state.db.lock().await;

    let mut results = Vec::new();
    let mut inserted = 0;

    for entry in body.into_inner().vectors {
        match db.insert(entry.values, metadata_from_json(entry.metadata)).await {
            Ok(id) => {
                inserted += 1;
                results.push(InsertResult {
                    id: Some(id),
                    status: "ok".to_string(),
                    message: "Inserted".to_string(),
                });
            }
            Err(e) => {
                results.push(InsertResult {
                    id: None,
                    status: "error".to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    HttpResponse::Ok().json(InsertResponse { inserted, results })
}

async fn search_handler(state: web::Data<AppState>, body: web::Json<SearchRequest>) -> impl Responder {
    let db = state.db.lock().await;

    let mut results = Vec::new();

    for entry in &body.queries {
        match db.search(&entry.value, entry.top_k) {
            Ok(res) => {
                results.push(SearchResultGroup {
                    matches: res.into_iter().map(to_match).collect(),
                    message: "Search Success".to_string(),
                });
            }
            Err(e) => {
                results.push(SearchResultGroup {
                    matches: Vec::new(),
                    message: e.to_string(),
                });
            }
        }
    }

    HttpResponse::Ok().json(SearchResponse { results })
}

async fn get_handler(state: web::Data<AppState>, body: web::Json<IdsRequest>) -> impl Responder {
    let db = state.db.lock().await;

    let results = body
        .ids
        .iter()
        .map(|id| match db.get(id) {
            Some(vector) => to_get_result(vector),
            None => GetResult { id: id.clone(), values: None, metadata: None },
        })
        .collect();

    HttpResponse::Ok().json(GetResponse { results })
}

async fn delete_handler(state: web::Data<AppState>, body: web::Json<IdsRequest>) -> impl Responder {
    let mut db = state.db.lock().await;

    // A repeated id is deleted by its first occurrence; later ones are absent
    let mut seen = HashSet::new();
    let results: Vec<DeleteResult> = body
        .ids
        .iter()
        .map(|id| DeleteResult {
            id: id.clone(),
            status: if seen.insert(id.as_str()) && db.get(id).is_some() { "deleted" } else { "absent" }
                .to_string(),
        })
        .collect();

    if let Err(e) = db.delete_many(&body.ids).await {
        return error_response(&e);
    }

    let deleted = results.iter().filter(|r| r.status == "deleted").count();
    HttpResponse::Ok().json(DeleteResponse { deleted, results })
}

async fn list_handler(state: web::Data<AppState>) -> impl Responder {
    let db = state.db.lock().await;

    let vectors: Vec<GetResult> = db.get_all().into_iter().map(to_get_result).collect();
    HttpResponse::Ok().json(ListResponse { count: vectors.len(), vectors })
}

async fn document_handler(state: web::Data<AppState>, body: web::Json<DocumentRequest>) -> impl Responder {
    let mut db = state.db.lock().await;

    match add_document(&mut *db, &*state.embedder, &body.text).await {
        Ok(added) => HttpResponse::Ok().json(DocumentResponse {
            added: added
                .into_iter()
                .map(|(id, text)| AddedParagraph { id, text })
                .collect(),
        }),
        Err(e) => error_response(&e),
    }
}

async fn query_handler(state: web::Data<AppState>, body: web::Json<TextQueryRequest>) -> impl Responder {
    let db = state.db.lock().await;

    let top_k = clamp_top_k(body.top_k.unwrap_or(0), state.default_top_k, state.max_top_k);
    match search_text(&*db, &*state.embedder, &body.text, top_k) {
        Ok(results) => HttpResponse::Ok().json(TextQueryResponse {
            top_k,
            matches: results
                .iter()
                .map(|r| TextMatch {
                    id: r.vector.id.clone(),
                    score: r.score,
                    text: result_text(r).to_string(),
                })
                .collect(),
        }),
        Err(e) => error_response(&e),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/insert").route(web::post().to(insert_handler)))
       .service(web::resource("/search").route(web::post().to(search_handler)))
       .service(web::resource("/get").route(web::post().to(get_handler)))
       .service(web::resource("/delete").route(web::post().to(delete_handler)))
       .service(web::resource("/vectors").route(web::get().to(list_handler)))
       .service(web::resource("/documents").route(web::post().to(document_handler)))
       .service(web::resource("/query").route(web::post().to(query_handler)));
}
