//! Request and response bodies for the cache endpoints
//!
//! Every successful response is an envelope of a human-readable message and
//! an endpoint specific `data` object.

use serde::{Deserialize, Serialize};

use crate::domain::record::{RecordId, RecordMetadata};
use crate::domain::semantic_cache::{CacheDecision, CacheStats};

/// Response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppInfo {
    pub app_name: String,
    pub app_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizeData {
    pub response: Vec<f32>,
}

/// Body of `POST /api/insertion/{text}`
#[derive(Debug, Clone, Deserialize)]
pub struct InsertionRequest {
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Option<RecordMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertionData {
    pub response: String,
    pub id: RecordId,
}

/// Search result; `response` and `score` are null on a miss
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchData {
    pub response: Option<String>,
    pub score: Option<f32>,
}

impl From<&CacheDecision> for SearchData {
    fn from(decision: &CacheDecision) -> Self {
        let lookup = decision.lookup();
        Self {
            response: lookup.result,
            score: lookup.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshData {
    pub response: Option<String>,
    pub exported: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsData {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsData {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}
