//! Ensemble detector -- combines several detectors into one score.

use std::sync::Arc;

use crate::detect::Detector;
use crate::event::Event;

/// How member scores are folded into a single score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombineMethod {
    /// Take the maximum member score.
    #[default]
    Max,
    /// Unweighted mean of member scores.
    Average,
    /// Weighted mean of member scores.
    Weighted,
    /// Fraction of members scoring at or above 0.5.
    Voting,
}

const VOTING_THRESHOLD: f64 = 0.5;

struct Member {
    detector: Arc<dyn Detector>,
    weight: f64,
}

/// Heterogeneous collection of detectors with per-member weights.
pub struct EnsembleDetector {
    members: Vec<Member>,
    method: CombineMethod,
}

impl EnsembleDetector {
    pub fn new(method: CombineMethod) -> Self {
        Self {
            members: Vec::new(),
            method,
        }
    }

    pub fn add_detector(&mut self, detector: Arc<dyn Detector>, weight: f64) {
        self.members.push(Member { detector, weight });
    }
}

impl Detector for EnsembleDetector {
    fn score(&self, event: &Event) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }

        let scores: Vec<f64> = self
            .members
            .iter()
            .map(|m| m.detector.score(event))
            .collect();

        match self.method {
            CombineMethod::Max => scores.iter().fold(0.0_f64, |acc, &s| acc.max(s)),
            CombineMethod::Average => scores.iter().sum::<f64>() / scores.len() as f64,
            CombineMethod::Weighted => {
                let weight_sum: f64 = self.members.iter().map(|m| m.weight).sum();
                if weight_sum <= 0.0 {
                    return 0.0;
                }
                let weighted: f64 = scores
                    .iter()
                    .zip(&self.members)
                    .map(|(s, m)| s * m.weight)
                    .sum();
                weighted / weight_sum
            }
            CombineMethod::Voting => {
                let votes = scores.iter().filter(|&&s| s >= VOTING_THRESHOLD).count();
                votes as f64 / scores.len() as f64
            }
        }
    }

    fn train(&self, event: &Event) {
        for member in &self.members {
            member.detector.train(event);
        }
    }

    fn name(&self) -> &'static str {
        "ensemble"
    }
}
