use std::collections::BTreeMap;

use rand::RngCore;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    engine::PrivacyTransform,
    errors::{PrivacyError, PrivacyResult},
    hash::ContentHash,
};

/// Result of combining several parties' numeric fields.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SecureAggregate {
    /// Field name to the mean of the perturbed contributions.
    pub results: BTreeMap<String, f64>,
    pub participant_count: usize,
}

/// Simulated secure multi-party computation.
///
/// `apply` only commits to the payload (content hash plus a ready flag);
/// `aggregate` averages the numeric top-level fields of several payloads,
/// perturbing every individual contribution first.
#[derive(Clone, Debug)]
pub struct SecureMpcSimulator {
    noise_std: f64,
}

impl SecureMpcSimulator {
    pub fn new(noise_std: f64) -> PrivacyResult<Self> {
        if !noise_std.is_finite() || noise_std < 0.0 {
            return Err(PrivacyError::InvalidNoise);
        }
        Ok(Self { noise_std })
    }

    pub fn aggregate(
        &self,
        parties: &[Value],
        rng: &mut dyn RngCore,
    ) -> PrivacyResult<SecureAggregate> {
        if parties.is_empty() {
            return Err(PrivacyError::EmptyAggregation);
        }
        let noise = Normal::new(0.0, self.noise_std).map_err(|_| PrivacyError::InvalidNoise)?;
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for party in parties {
            let Some(fields) = party.as_object() else {
                continue;
            };
            for (key, value) in fields {
                let Some(number) = value.as_f64() else {
                    continue;
                };
                let share = number + noise.sample(rng);
                let entry = sums.entry(key.clone()).or_insert((0.0, 0));
                entry.0 += share;
                entry.1 += 1;
            }
        }
        Ok(SecureAggregate {
            results: sums
                .into_iter()
                .map(|(key, (sum, count))| (key, sum / count as f64))
                .collect(),
            participant_count: parties.len(),
        })
    }
}

impl Default for SecureMpcSimulator {
    fn default() -> Self {
        Self { noise_std: 0.01 }
    }
}

impl PrivacyTransform for SecureMpcSimulator {
    fn apply(&self, payload: &Value, _rng: &mut dyn RngCore) -> PrivacyResult<Value> {
        let field_count = payload.as_object().map(|map| map.len()).unwrap_or(1);
        Ok(json!({
            "content_hash": ContentHash::of_json(payload)?.to_hex(),
            "mpc_ready": true,
            "field_count": field_count,
        }))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn commitment_hides_values() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let payload = json!({"kwh": 12.0, "sessions": 3});
        let committed = SecureMpcSimulator::default()
            .apply(&payload, &mut rng)
            .unwrap();
        assert_eq!(committed["mpc_ready"], true);
        assert_eq!(committed["field_count"], 2);
        assert_eq!(committed["content_hash"].as_str().unwrap().len(), 64);
        assert!(committed.get("kwh").is_none());
    }

    #[test]
    fn aggregates_means_across_parties() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let parties = vec![
            json!({"kwh": 10.0, "sessions": 4, "region": "north"}),
            json!({"kwh": 20.0, "sessions": 6}),
            json!({"kwh": 30.0}),
        ];
        let aggregate = SecureMpcSimulator::new(0.01)
            .unwrap()
            .aggregate(&parties, &mut rng)
            .unwrap();
        assert_eq!(aggregate.participant_count, 3);
        assert!((aggregate.results["kwh"] - 20.0).abs() < 0.1);
        assert!((aggregate.results["sessions"] - 5.0).abs() < 0.1);
        assert!(!aggregate.results.contains_key("region"));
    }

    #[test]
    fn zero_noise_is_exact() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let parties = vec![json!({"load": 0.25}), json!({"load": 0.75})];
        let aggregate = SecureMpcSimulator::new(0.0)
            .unwrap()
            .aggregate(&parties, &mut rng)
            .unwrap();
        assert_eq!(aggregate.results["load"], 0.5);
    }

    #[test]
    fn empty_party_list_is_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let err = SecureMpcSimulator::default()
            .aggregate(&[], &mut rng)
            .unwrap_err();
        assert!(matches!(err, PrivacyError::EmptyAggregation));
    }
}
