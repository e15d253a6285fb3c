use serde::{Deserialize, Serialize};

use crate::errors::{PrivacyError, PrivacyResult};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct PrivacyConfig {
    /// Privacy loss parameter for the Laplace mechanism.
    pub epsilon: f64,
    /// L1 sensitivity assumed for every numeric field.
    pub sensitivity: f64,
    /// Standard deviation of the perturbation applied to each MPC share.
    pub mpc_noise_std: f64,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            epsilon: 1.0,
            sensitivity: 1.0,
            mpc_noise_std: 0.01,
        }
    }
}

impl PrivacyConfig {
    pub fn validate(&self) -> PrivacyResult<()> {
        if self.epsilon.is_nan() || self.epsilon <= 0.0 {
            return Err(PrivacyError::InvalidEpsilon);
        }
        if !self.sensitivity.is_finite() || self.sensitivity <= 0.0 {
            return Err(PrivacyError::InvalidSensitivity);
        }
        if !self.mpc_noise_std.is_finite() || self.mpc_noise_std < 0.0 {
            return Err(PrivacyError::InvalidNoise);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PrivacyConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_non_positive_epsilon() {
        let config = PrivacyConfig {
            epsilon: 0.0,
            ..PrivacyConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PrivacyError::InvalidEpsilon)
        ));
    }
}
