use rand::RngCore;
use serde_json::{Map, Value};

use crate::{engine::PrivacyTransform, errors::PrivacyResult, hash::ContentHash};

const SCHEME: &str = "ckks-sim";

/// Simulated homomorphic encryption. Each value is replaced by an opaque
/// `ckks-sim:<shape>:<checksum>` token. There is no decryption path.
#[derive(Clone, Copy, Debug, Default)]
pub struct HomomorphicSimulator;

impl HomomorphicSimulator {
    pub fn shape_of(value: &Value) -> String {
        match value {
            Value::Array(items) => format!("vec{}", items.len()),
            Value::Object(map) => format!("map{}", map.len()),
            Value::String(_) => "text".into(),
            Value::Null => "null".into(),
            _ => "scalar".into(),
        }
    }

    pub fn placeholder(value: &Value) -> PrivacyResult<Value> {
        let checksum = ContentHash::of_json(value)?;
        Ok(Value::String(format!(
            "{SCHEME}:{}:{}",
            Self::shape_of(value),
            checksum.short_hex()
        )))
    }

    pub fn is_placeholder(value: &Value) -> bool {
        value
            .as_str()
            .map(|raw| raw.starts_with(SCHEME) && raw.split(':').count() == 3)
            .unwrap_or(false)
    }
}

impl PrivacyTransform for HomomorphicSimulator {
    fn apply(&self, payload: &Value, _rng: &mut dyn RngCore) -> PrivacyResult<Value> {
        match payload {
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, value) in map {
                    out.insert(key.clone(), Self::placeholder(value)?);
                }
                Ok(Value::Object(out))
            }
            other => Self::placeholder(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use serde_json::json;

    use super::*;

    #[test]
    fn replaces_every_field_with_a_placeholder() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let payload = json!({"kwh": [1.0, 2.0], "region": "west", "load": 0.4});
        let sealed = HomomorphicSimulator.apply(&payload, &mut rng).unwrap();
        let map = sealed.as_object().unwrap();
        assert_eq!(map.len(), 3);
        assert!(map.values().all(HomomorphicSimulator::is_placeholder));
        assert!(map["kwh"].as_str().unwrap().starts_with("ckks-sim:vec2:"));
        assert!(map["load"].as_str().unwrap().starts_with("ckks-sim:scalar:"));
    }

    #[test]
    fn placeholders_are_deterministic_per_value() {
        let a = HomomorphicSimulator::placeholder(&json!([1, 2, 3])).unwrap();
        let b = HomomorphicSimulator::placeholder(&json!([1, 2, 3])).unwrap();
        let c = HomomorphicSimulator::placeholder(&json!([1, 2, 4])).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
