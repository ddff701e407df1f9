//! JSON request bodies and query strings accepted by the HTTP surface.

use crate::server::error::ApiError;
use axum::extract::{
    FromRequest,
    rejection::{JsonRejection, QueryRejection},
};
use sctid::{ComponentCategory, Namespace};
use serde::Deserialize;

/// `axum::Json`, rejecting bad bodies with [`ApiError::InvalidRequest`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid(rejection.body_text())
    }
}

/// Body of `generate` and `reserve`. A missing or empty namespace means the
/// international namespace.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequest {
    #[serde(default)]
    pub namespace: Namespace,
    pub category: ComponentCategory,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAllocationRequest {
    #[serde(default)]
    pub namespace: Namespace,
    pub category: ComponentCategory,
    pub quantity: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct IdRequest {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct IdsRequest {
    pub ids: Vec<String>,
}

/// `?ids=a,b,c`
#[derive(Clone, Debug, Deserialize)]
pub struct IdsQuery {
    #[serde(default)]
    pub ids: String,
}

impl IdsQuery {
    pub fn into_ids(self) -> Vec<String> {
        self.ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
            .collect()
    }
}
