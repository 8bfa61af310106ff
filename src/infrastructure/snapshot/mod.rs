//! Snapshot writers

mod jsonl;

pub use jsonl::{read_snapshot, JsonlSnapshotWriter};
