//! Shared HTTP types: response envelope, error mapping, extractors

mod actor;
mod error;
mod validated_json;

pub use actor::RequestActor;
pub use error::{ApiError, ApiResult};
pub use validated_json::{ValidatedJson, ValidatedJsonRejection};

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::shared::{PaginatedResult, PaginationParams};

/// Envelope for every JSON response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T, U: Into<T>> From<PaginatedResult<U>> for PaginatedResponse<T> {
    fn from(result: PaginatedResult<U>) -> Self {
        Self {
            items: result.items.into_iter().map(Into::into).collect(),
            total: result.total,
            page: result.page,
            limit: result.limit,
            total_pages: result.total_pages,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based, default 1
    #[serde(default = "default_page")]
    pub page: u32,
    /// 1-100, default 20
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl From<&PageQuery> for PaginationParams {
    fn from(q: &PageQuery) -> Self {
        PaginationParams::new(q.page, q.limit)
    }
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}
