use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FederationError, FederationResult};

/// Dense row-major tensor of `f64`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl Tensor {
    pub fn zeros(shape: &[usize]) -> Self {
        Self::from_fn(shape, |_| 0.0)
    }

    pub fn from_fn(shape: &[usize], mut f: impl FnMut(usize) -> f64) -> Self {
        let len: usize = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            values: (0..len).map(&mut f).collect(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

/// Named tensors making up one node's model. Shapes are fixed when the node
/// registers and every update must preserve them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterBundle {
    tensors: BTreeMap<String, Tensor>,
}

impl ParameterBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.tensors.insert(name.into(), tensor);
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Tensor)> {
        self.tensors.iter()
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn parameter_count(&self) -> usize {
        self.tensors.values().map(Tensor::len).sum()
    }

    pub fn shapes(&self) -> BTreeMap<String, Vec<usize>> {
        self.tensors
            .iter()
            .map(|(name, tensor)| (name.clone(), tensor.shape.clone()))
            .collect()
    }

    /// Build a bundle with the same tensor names and shapes as `self`, where
    /// each value is produced from `(tensor name, flat index)`.
    pub fn map_like(&self, mut f: impl FnMut(&str, usize) -> f64) -> Self {
        let tensors = self
            .tensors
            .iter()
            .map(|(name, tensor)| {
                (name.clone(), Tensor::from_fn(&tensor.shape, |idx| f(name.as_str(), idx)))
            })
            .collect();
        Self { tensors }
    }

    /// Fails unless `other` has exactly the tensor names and shapes of `self`.
    pub fn ensure_same_shape(&self, other: &ParameterBundle) -> FederationResult<()> {
        for (name, tensor) in &self.tensors {
            match other.tensors.get(name) {
                Some(candidate) if candidate.shape == tensor.shape => {}
                Some(candidate) => {
                    return Err(FederationError::AggregationShapeMismatch {
                        tensor: name.clone(),
                        expected: tensor.shape.clone(),
                        found: candidate.shape.clone(),
                    })
                }
                None => {
                    return Err(FederationError::AggregationShapeMismatch {
                        tensor: name.clone(),
                        expected: tensor.shape.clone(),
                        found: Vec::new(),
                    })
                }
            }
        }
        if let Some(extra) = other
            .tensors
            .iter()
            .find(|(name, _)| !self.tensors.contains_key(*name))
        {
            return Err(FederationError::AggregationShapeMismatch {
                tensor: extra.0.clone(),
                expected: Vec::new(),
                found: extra.1.shape.clone(),
            });
        }
        Ok(())
    }

    /// `self += factor * other`. Callers validate shapes first.
    pub fn add_scaled(&mut self, other: &ParameterBundle, factor: f64) {
        for (name, tensor) in self.tensors.iter_mut() {
            if let Some(delta) = other.tensors.get(name) {
                for (value, d) in tensor.values.iter_mut().zip(&delta.values) {
                    *value += factor * d;
                }
            }
        }
    }
}
