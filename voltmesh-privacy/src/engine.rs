use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde_json::Value;
use tracing::debug;

use crate::{
    aggregated::AggregatedTransform,
    config::PrivacyConfig,
    dp::LaplaceMechanism,
    errors::PrivacyResult,
    fhe::HomomorphicSimulator,
    hash::ContentHash,
    mpc::{SecureAggregate, SecureMpcSimulator},
    tier::PrivacyTier,
};

/// One transform per privacy tier.
pub trait PrivacyTransform: Send + Sync {
    fn apply(&self, payload: &Value, rng: &mut dyn RngCore) -> PrivacyResult<Value>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PassThrough;

impl PrivacyTransform for PassThrough {
    fn apply(&self, payload: &Value, _rng: &mut dyn RngCore) -> PrivacyResult<Value> {
        Ok(payload.clone())
    }
}

/// Stateless dispatcher over the tier transforms. Randomness is always
/// supplied by the caller, so identical inputs and RNG state give identical
/// outputs.
#[derive(Clone, Debug)]
pub struct PrivacyEngine {
    config: PrivacyConfig,
    public: PassThrough,
    aggregated: AggregatedTransform,
    differential: LaplaceMechanism,
    homomorphic: HomomorphicSimulator,
    mpc: SecureMpcSimulator,
}

impl PrivacyEngine {
    pub fn new(config: PrivacyConfig) -> PrivacyResult<Self> {
        config.validate()?;
        Ok(Self {
            differential: LaplaceMechanism::new(config.epsilon, config.sensitivity)?,
            mpc: SecureMpcSimulator::new(config.mpc_noise_std)?,
            public: PassThrough,
            aggregated: AggregatedTransform,
            homomorphic: HomomorphicSimulator,
            config,
        })
    }

    pub fn config(&self) -> &PrivacyConfig {
        &self.config
    }

    pub fn transform(&self, tier: PrivacyTier) -> &dyn PrivacyTransform {
        match tier {
            PrivacyTier::Public => &self.public,
            PrivacyTier::Aggregated => &self.aggregated,
            PrivacyTier::Differential => &self.differential,
            PrivacyTier::Homomorphic => &self.homomorphic,
            PrivacyTier::SecureMpc => &self.mpc,
        }
    }

    pub fn protect(
        &self,
        payload: &Value,
        tier: PrivacyTier,
        rng: &mut dyn RngCore,
    ) -> PrivacyResult<Value> {
        debug!(tier = %tier, "applying privacy transform");
        self.transform(tier).apply(payload, rng)
    }

    /// Same as [`PrivacyEngine::protect`] with a fresh entropy-seeded RNG.
    pub fn protect_with_entropy(&self, payload: &Value, tier: PrivacyTier) -> PrivacyResult<Value> {
        let mut rng = ChaCha20Rng::from_entropy();
        self.protect(payload, tier, &mut rng)
    }

    pub fn secure_aggregate(
        &self,
        parties: &[Value],
        rng: &mut dyn RngCore,
    ) -> PrivacyResult<SecureAggregate> {
        self.mpc.aggregate(parties, rng)
    }

    /// Deterministic RNG derived from a label, for reproducible transforms.
    pub fn seeded_rng(label: impl AsRef<[u8]>) -> ChaCha20Rng {
        ChaCha20Rng::from_seed(ContentHash::derive(label).as_seed())
    }
}

impl Default for PrivacyEngine {
    fn default() -> Self {
        Self {
            config: PrivacyConfig::default(),
            public: PassThrough,
            aggregated: AggregatedTransform,
            differential: LaplaceMechanism::default(),
            homomorphic: HomomorphicSimulator,
            mpc: SecureMpcSimulator::default(),
        }
    }
}
