//! Hit/miss classification and lookup results

use serde::Serialize;

use crate::domain::index::IndexStats;
use crate::domain::record::{Record, RecordId};
use crate::domain::DomainError;

/// Largest possible cosine distance
const MAX_DISTANCE: f32 = 2.0;

/// Outcome of a cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Hit,
    Miss,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
        }
    }
}

/// The single hit predicate: `distance <= threshold`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    threshold: f32,
}

impl ThresholdPolicy {
    pub fn new(threshold: f32) -> Result<Self, DomainError> {
        if !threshold.is_finite() || !(0.0..=MAX_DISTANCE).contains(&threshold) {
            return Err(DomainError::configuration(format!(
                "threshold must be a cosine distance in [0, 2], got {}",
                threshold
            )));
        }

        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Inclusive at the boundary
    pub fn is_hit(&self, distance: f32) -> bool {
        distance <= self.threshold
    }

    /// Classify the best candidate distance, if there is one
    pub fn classify(&self, distance: Option<f32>) -> Verdict {
        match distance {
            Some(d) if self.is_hit(d) => Verdict::Hit,
            _ => Verdict::Miss,
        }
    }
}

/// Full record of one lookup
#[derive(Debug, Clone, PartialEq)]
pub struct CacheDecision {
    pub query_text: String,
    pub query_vector: Vec<f32>,
    /// Closest record before the query was appended
    pub nearest: Option<Record>,
    pub distance: Option<f32>,
    pub verdict: Verdict,
    /// Record the query itself was stored as
    pub stored: RecordId,
}

impl CacheDecision {
    pub fn is_hit(&self) -> bool {
        self.verdict == Verdict::Hit
    }

    pub fn lookup(&self) -> CacheLookup {
        CacheLookup::from(self)
    }
}

/// Caller-facing view of a decision; result and score are only set on a hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheLookup {
    pub hit: bool,
    pub result: Option<String>,
    pub score: Option<f32>,
}

impl From<&CacheDecision> for CacheLookup {
    fn from(decision: &CacheDecision) -> Self {
        match (decision.verdict, &decision.nearest) {
            (Verdict::Hit, Some(record)) => Self {
                hit: true,
                result: Some(record.text().to_string()),
                score: decision.distance,
            },
            _ => Self {
                hit: false,
                result: None,
                score: None,
            },
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Records in the store
    pub records: usize,
    /// Entries in the similarity index
    pub indexed: usize,
    pub hits: u64,
    pub misses: u64,
    pub threshold: f32,
    pub dimensions: usize,
    pub index: IndexStats,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::NewRecord;

    fn decision(verdict: Verdict, distance: Option<f32>) -> CacheDecision {
        CacheDecision {
            query_text: "query".to_string(),
            query_vector: vec![1.0, 0.0],
            nearest: Some(NewRecord::new("cached", vec![1.0, 0.0]).commit()),
            distance,
            verdict,
            stored: RecordId::generate(),
        }
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let policy = ThresholdPolicy::new(0.1).unwrap();

        assert!(policy.is_hit(0.1));
        assert!(policy.is_hit(0.0));
        assert!(!policy.is_hit(0.100_001));
        for _ in 0..10 {
            assert_eq!(policy.classify(Some(0.1)), Verdict::Hit);
        }
    }

    #[test]
    fn test_no_candidate_is_miss() {
        let policy = ThresholdPolicy::new(2.0).unwrap();
        assert_eq!(policy.classify(None), Verdict::Miss);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(ThresholdPolicy::new(-0.01).is_err());
        assert!(ThresholdPolicy::new(2.01).is_err());
        assert!(ThresholdPolicy::new(f32::INFINITY).is_err());
        assert!(ThresholdPolicy::new(0.0).is_ok());
    }

    #[test]
    fn test_lookup_view_on_hit() {
        let lookup = decision(Verdict::Hit, Some(0.01)).lookup();

        assert!(lookup.hit);
        assert_eq!(lookup.result.as_deref(), Some("cached"));
        assert_eq!(lookup.score, Some(0.01));
    }

    #[test]
    fn test_lookup_view_hides_miss_candidate() {
        let lookup = decision(Verdict::Miss, Some(0.7)).lookup();

        assert!(!lookup.hit);
        assert!(lookup.result.is_none());
        assert!(lookup.score.is_none());
    }

    #[test]
    fn test_verdict_serialization() {
        assert_eq!(serde_json::to_string(&Verdict::Hit).unwrap(), "\"HIT\"");
        assert_eq!(Verdict::Miss.as_str(), "miss");
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 75.0).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
