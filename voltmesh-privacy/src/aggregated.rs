use rand::RngCore;
use serde_json::{json, Map, Value};

use crate::{engine::PrivacyTransform, errors::PrivacyResult};

const IDENTIFIER_TOKENS: [&str; 11] = [
    "id", "uuid", "name", "email", "phone", "address", "vin", "plate", "ssn", "user", "owner",
];

/// Drops identifier-looking fields and collapses multi-valued fields into
/// `{mean, count}` summaries.
#[derive(Clone, Copy, Debug, Default)]
pub struct AggregatedTransform;

impl AggregatedTransform {
    /// A key is identifying when any of its `_`/`-` separated tokens is an
    /// identifier word, or when it is camel-cased with an `Id` suffix.
    pub fn looks_like_identifier(key: &str) -> bool {
        if key.len() > 2 && key.ends_with("Id") {
            return true;
        }
        key.to_ascii_lowercase()
            .split(['_', '-', '.', ' '])
            .any(|token| IDENTIFIER_TOKENS.contains(&token))
    }

    fn summarize(items: &[Value]) -> Value {
        let numbers: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
        if !items.is_empty() && numbers.len() == items.len() {
            let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
            json!({ "mean": mean, "count": numbers.len() })
        } else {
            json!({ "count": items.len() })
        }
    }

    fn reduce(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, item) in map {
                    if Self::looks_like_identifier(key) {
                        continue;
                    }
                    out.insert(key.clone(), Self::reduce(item));
                }
                Value::Object(out)
            }
            Value::Array(items) => Self::summarize(items),
            other => other.clone(),
        }
    }
}

impl PrivacyTransform for AggregatedTransform {
    fn apply(&self, payload: &Value, _rng: &mut dyn RngCore) -> PrivacyResult<Value> {
        Ok(Self::reduce(payload))
    }
}
