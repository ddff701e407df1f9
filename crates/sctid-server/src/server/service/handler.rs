//! HTTP service for identifier allocation.
//!
//! This module defines [`SctidService`], which owns the shared allocator and
//! the bulk job registry, and [`router`], which exposes both over JSON.
//!
//! ## Responsibilities
//!
//! - Run single-identifier operations on the blocking pool and return the
//!   resulting record.
//! - Validate bulk requests against the configured limits and submit them as
//!   background jobs.
//! - Report job progress and results.
//! - Stop accepting jobs and cancel in-flight ones on shutdown.

use crate::server::{
    config::{ServerConfig, StrategyKind},
    error::{ApiError, Result},
    jobs::{JobRegistry, JobSnapshot},
    service::request::{
        AllocationRequest, ApiJson, BulkAllocationRequest, IdRequest, IdsQuery, IdsRequest,
    },
    telemetry::{increment_ids_allocated, increment_requests, increment_transitions},
};
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State, rejection::QueryRejection},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use core::time::Duration;
use sctid::{
    BulkOutcome, GenerationStrategy, IdentifierAllocator, IdentifierRecord, MemoryStore,
    Operation, RandomStrategy, Reservations, SequentialStrategy,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

/// The allocator shared by every request and job.
pub type Allocator = IdentifierAllocator<MemoryStore, Box<dyn GenerationStrategy>, Reservations>;

#[derive(Clone)]
pub struct SctidService {
    allocator: Arc<Allocator>,
    jobs: Arc<JobRegistry>,
    max_bulk_quantity: usize,
}

impl SctidService {
    /// Builds the allocator, store, strategy and reservations described by
    /// `config`.
    pub fn new(config: &ServerConfig) -> Self {
        let strategy: Box<dyn GenerationStrategy> = match config.strategy {
            StrategyKind::Sequential => Box::new(SequentialStrategy::new()),
            StrategyKind::Random => Box::new(RandomStrategy::new()),
        };
        let allocator = IdentifierAllocator::with_config(
            MemoryStore::with_shards(config.store_shards),
            strategy,
            config.reservations(),
            config.allocator,
        );
        Self {
            allocator: Arc::new(allocator),
            jobs: Arc::new(JobRegistry::new(
                config.max_concurrent_jobs,
                config.job_timeout,
                config.job_retention,
            )),
            max_bulk_quantity: config.max_bulk_quantity,
        }
    }

    /// Refuses new jobs, drains running ones for up to `drain_timeout`, then
    /// cancels the rest.
    pub async fn shutdown(&self, drain_timeout: Duration) {
        self.jobs.shutdown(drain_timeout).await;
    }

    /// Runs `op` against the allocator on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Allocator) -> sctid::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let allocator = Arc::clone(&self.allocator);
        tokio::task::spawn_blocking(move || op(&allocator))
            .await
            .map_err(|err| ApiError::Internal {
                context: err.to_string(),
            })?
            .map_err(ApiError::from)
    }

    fn check_quantity(&self, quantity: usize) -> Result<()> {
        if quantity == 0 || quantity > self.max_bulk_quantity {
            return Err(ApiError::invalid(format!(
                "quantity must be between 1 and {}",
                self.max_bulk_quantity
            )));
        }
        Ok(())
    }

    fn check_ids(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Err(ApiError::invalid("ids must not be empty"));
        }
        if ids.len() > self.max_bulk_quantity {
            return Err(ApiError::invalid(format!(
                "at most {} ids per request",
                self.max_bulk_quantity
            )));
        }
        Ok(())
    }

    fn submit_allocation(
        &self,
        operation: Operation,
        request: BulkAllocationRequest,
    ) -> Result<JobSnapshot> {
        self.check_quantity(request.quantity)?;
        let allocator = Arc::clone(&self.allocator);
        let BulkAllocationRequest {
            namespace,
            category,
            quantity,
        } = request;
        let job = self.jobs.submit(operation, quantity, move |cancel| {
            let outcome = if operation == Operation::Reserve {
                allocator.reserve_many_with(namespace, category, quantity, cancel)?
            } else {
                allocator.generate_many_with(namespace, category, quantity, cancel)?
            };
            increment_ids_allocated(outcome.records.len() as u64);
            Ok(outcome)
        })?;
        Ok(job.snapshot())
    }

    fn submit_transition(&self, operation: Operation, ids: Vec<String>) -> Result<JobSnapshot> {
        self.check_ids(&ids)?;
        let allocator = Arc::clone(&self.allocator);
        let job = self.jobs.submit(operation, ids.len(), move |cancel| {
            let outcome = match operation {
                Operation::Register => BulkOutcome {
                    records: allocator.register_many_with(ids.as_slice(), cancel)?,
                    ..BulkOutcome::default()
                },
                Operation::Deprecate => allocator.deprecate_many_with(ids.as_slice(), cancel)?,
                Operation::Release => allocator.release_many_with(ids.as_slice(), cancel)?,
                _ => allocator.publish_many_with(ids.as_slice(), cancel)?,
            };
            increment_transitions(operation, outcome.records.len() as u64);
            Ok(outcome)
        })?;
        Ok(job.snapshot())
    }
}

/// Builds the router with every endpoint, CORS and request counting.
pub fn router(service: SctidService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sct/ids/{id}", get(get_id))
        .route("/sct/generate", post(generate))
        .route("/sct/reserve", post(reserve))
        .route("/sct/register", post(register))
        .route("/sct/deprecate", put(deprecate))
        .route("/sct/release", put(release))
        .route("/sct/publish", put(publish))
        .route("/sct/bulk/ids", get(bulk_ids_query).post(bulk_ids))
        .route("/sct/bulk/generate", post(bulk_generate))
        .route("/sct/bulk/reserve", post(bulk_reserve))
        .route("/sct/bulk/register", post(bulk_register))
        .route("/sct/bulk/deprecate", put(bulk_deprecate))
        .route("/sct/bulk/release", put(bulk_release))
        .route("/sct/bulk/publish", put(bulk_publish))
        .route("/bulk/jobs/{id}", get(job_status))
        .route("/bulk/jobs/{id}/records", get(job_records))
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(middleware::from_fn(count_requests)),
        )
        .with_state(service)
}

async fn count_requests(request: Request, next: Next) -> Response {
    increment_requests();
    next.run(request).await
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health(State(service): State<SctidService>) -> (StatusCode, Json<Health>) {
    if service.jobs.is_accepting() {
        (StatusCode::OK, Json(Health { status: "serving" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Health {
                status: "shutting_down",
            }),
        )
    }
}

#[tracing::instrument(skip(service))]
async fn get_id(
    State(service): State<SctidService>,
    Path(id): Path<String>,
) -> Result<Json<IdentifierRecord>> {
    service
        .run(move |allocator| allocator.get_identifier(&id))
        .await
        .map(Json)
}

#[tracing::instrument(skip(service))]
async fn generate(
    State(service): State<SctidService>,
    ApiJson(request): ApiJson<AllocationRequest>,
) -> Result<Json<IdentifierRecord>> {
    let record = service
        .run(move |allocator| allocator.generate(request.namespace, request.category))
        .await?;
    increment_ids_allocated(1);
    Ok(Json(record))
}

#[tracing::instrument(skip(service))]
async fn reserve(
    State(service): State<SctidService>,
    ApiJson(request): ApiJson<AllocationRequest>,
) -> Result<Json<IdentifierRecord>> {
    let record = service
        .run(move |allocator| allocator.reserve(request.namespace, request.category))
        .await?;
    increment_ids_allocated(1);
    Ok(Json(record))
}

/// Shared body of the single-identifier transitions.
async fn transition(
    service: &SctidService,
    operation: Operation,
    id: String,
) -> Result<Json<IdentifierRecord>> {
    let record = service
        .run(move |allocator| match operation {
            Operation::Register => allocator.register(&id),
            Operation::Deprecate => allocator.deprecate(&id),
            Operation::Release => allocator.release(&id),
            _ => allocator.publish(&id),
        })
        .await?;
    increment_transitions(operation, 1);
    Ok(Json(record))
}

#[tracing::instrument(skip(service))]
async fn register(
    State(service): State<SctidService>,
    ApiJson(request): ApiJson<IdRequest>,
) -> Result<Json<IdentifierRecord>> {
    transition(&service, Operation::Register, request.id).await
}

#[tracing::instrument(skip(service))]
async fn deprecate(
    State(service): State<SctidService>,
    ApiJson(request): ApiJson<IdRequest>,
) -> Result<Json<IdentifierRecord>> {
    transition(&service, Operation::Deprecate, request.id).await
}

#[tracing::instrument(skip(service))]
async fn release(
    State(service): State<SctidService>,
    ApiJson(request): ApiJson<IdRequest>,
) -> Result<Json<IdentifierRecord>> {
    transition(&service, Operation::Release, request.id).await
}

#[tracing::instrument(skip(service))]
async fn publish(
    State(service): State<SctidService>,
    ApiJson(request): ApiJson<IdRequest>,
) -> Result<Json<IdentifierRecord>> {
    transition(&service, Operation::Publish, request.id).await
}

async fn lookup(service: &SctidService, ids: Vec<String>) -> Result<Json<Vec<IdentifierRecord>>> {
    service.check_ids(&ids)?;
    service
        .run(move |allocator| allocator.get_identifiers(ids.as_slice()))
        .await
        .map(Json)
}

#[tracing::instrument(skip(service, query))]
async fn bulk_ids_query(
    State(service): State<SctidService>,
    query: core::result::Result<Query<IdsQuery>, QueryRejection>,
) -> Result<Json<Vec<IdentifierRecord>>> {
    let Query(query) = query?;
    lookup(&service, query.into_ids()).await
}

#[tracing::instrument(skip(service, request))]
async fn bulk_ids(
    State(service): State<SctidService>,
    ApiJson(request): ApiJson<IdsRequest>,
) -> Result<Json<Vec<IdentifierRecord>>> {
    lookup(&service, request.ids).await
}

#[tracing::instrument(skip(service))]
async fn bulk_generate(
    State(service): State<SctidService>,
    ApiJson(request): ApiJson<BulkAllocationRequest>,
) -> Result<(StatusCode, Json<JobSnapshot>)> {
    let job = service.submit_allocation(Operation::Generate, request)?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

#[tracing::instrument(skip(service))]
async fn bulk_reserve(
    State(service): State<SctidService>,
    ApiJson(request): ApiJson<BulkAllocationRequest>,
) -> Result<(StatusCode, Json<JobSnapshot>)> {
    let job = service.submit_allocation(Operation::Reserve, request)?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

#[tracing::instrument(skip(service, request))]
async fn bulk_register(
    State(service): State<SctidService>,
    ApiJson(request): ApiJson<IdsRequest>,
) -> Result<(StatusCode, Json<JobSnapshot>)> {
    let job = service.submit_transition(Operation::Register, request.ids)?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

#[tracing::instrument(skip(service, request))]
async fn bulk_deprecate(
    State(service): State<SctidService>,
    ApiJson(request): ApiJson<IdsRequest>,
) -> Result<(StatusCode, Json<JobSnapshot>)> {
    let job = service.submit_transition(Operation::Deprecate, request.ids)?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

#[tracing::instrument(skip(service, request))]
async fn bulk_release(
    State(service): State<SctidService>,
    ApiJson(request): ApiJson<IdsRequest>,
) -> Result<(StatusCode, Json<JobSnapshot>)> {
    let job = service.submit_transition(Operation::Release, request.ids)?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

#[tracing::instrument(skip(service, request))]
async fn bulk_publish(
    State(service): State<SctidService>,
    ApiJson(request): ApiJson<IdsRequest>,
) -> Result<(StatusCode, Json<JobSnapshot>)> {
    let job = service.submit_transition(Operation::Publish, request.ids)?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

async fn job_status(
    State(service): State<SctidService>,
    Path(id): Path<u64>,
) -> Result<Json<JobSnapshot>> {
    Ok(Json(service.jobs.get(id)?.snapshot()))
}

async fn job_records(
    State(service): State<SctidService>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<IdentifierRecord>>> {
    Ok(Json(service.jobs.get(id)?.records()))
}
