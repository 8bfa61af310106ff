//! HTTP API types

pub mod cache;
pub mod error;
pub mod json;

pub use cache::{
    ApiResponse, AppInfo, InsertionData, InsertionRequest, RefreshData, SearchData, StatsData,
    VectorizeData,
};
pub use error::{ApiError, ApiErrorResponse};
pub use json::Json;
