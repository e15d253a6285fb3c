use rand::{Rng, RngCore};
use serde_json::{Number, Value};

use crate::{
    engine::PrivacyTransform,
    errors::{PrivacyError, PrivacyResult},
};

/// Laplace mechanism applied to every numeric leaf of a payload.
///
/// Strings, booleans and nulls pass through untouched, so the output keeps
/// the keys and array lengths of the input. Integers come back as floats.
#[derive(Clone, Debug, PartialEq)]
pub struct LaplaceMechanism {
    epsilon: f64,
    sensitivity: f64,
}

impl LaplaceMechanism {
    pub fn new(epsilon: f64, sensitivity: f64) -> PrivacyResult<Self> {
        if epsilon.is_nan() || epsilon <= 0.0 {
            return Err(PrivacyError::InvalidEpsilon);
        }
        if !sensitivity.is_finite() || sensitivity <= 0.0 {
            return Err(PrivacyError::InvalidSensitivity);
        }
        Ok(Self {
            epsilon,
            sensitivity,
        })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Noise scale `b = sensitivity / epsilon`; zero as epsilon goes to infinity.
    pub fn scale(&self) -> f64 {
        self.sensitivity / self.epsilon
    }

    pub fn sample_noise(&self, rng: &mut dyn RngCore) -> f64 {
        let b = self.scale();
        if b == 0.0 {
            return 0.0;
        }
        let u: f64 = rng.gen::<f64>() - 0.5;
        let sign = if u >= 0.0 { 1.0 } else { -1.0 };
        let magnitude = (1.0 - 2.0 * u.abs()).abs().max(1e-12);
        -b * sign * magnitude.ln()
    }

    fn perturb(&self, value: &Value, rng: &mut dyn RngCore) -> Value {
        match value {
            Value::Number(number) => {
                let noisy = number.as_f64().unwrap_or(0.0) + self.sample_noise(rng);
                Number::from_f64(noisy)
                    .map(Value::Number)
                    .unwrap_or_else(|| value.clone())
            }
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.perturb(item, rng)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.perturb(item, rng)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl Default for LaplaceMechanism {
    fn default() -> Self {
        Self {
            epsilon: 1.0,
            sensitivity: 1.0,
        }
    }
}

impl PrivacyTransform for LaplaceMechanism {
    fn apply(&self, payload: &Value, rng: &mut dyn RngCore) -> PrivacyResult<Value> {
        Ok(self.perturb(payload, rng))
    }
}
