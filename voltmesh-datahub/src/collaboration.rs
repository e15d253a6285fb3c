use std::collections::BTreeMap;

use crate::participant::ParticipantId;

/// Symmetric pairwise collaboration scores. Pairs are stored once, keyed
/// with the smaller id first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollaborationMatrix {
    scores: BTreeMap<(ParticipantId, ParticipantId), f64>,
}

impl CollaborationMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: &ParticipantId, b: &ParticipantId) -> (ParticipantId, ParticipantId) {
        if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        }
    }

    /// Store `score` clamped to `[0, 1]`. Self-pairs are ignored.
    pub fn set(&mut self, a: &ParticipantId, b: &ParticipantId, score: f64) {
        if a == b {
            return;
        }
        self.scores.insert(Self::key(a, b), score.clamp(0.0, 1.0));
    }

    pub fn score(&self, a: &ParticipantId, b: &ParticipantId) -> Option<f64> {
        self.scores.get(&Self::key(a, b)).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &ParticipantId, f64)> {
        self.scores.iter().map(|((a, b), score)| (a, b, *score))
    }

    pub fn mean(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.values().sum::<f64>() / self.scores.len() as f64
    }
}
