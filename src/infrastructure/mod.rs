//! Infrastructure layer - External service implementations

pub mod embedding;
pub mod index;
pub mod logging;
pub mod observability;
pub mod services;
pub mod snapshot;
pub mod storage;
