//! Model structure for serialization

use crate::Tensor;
use serde::{Deserialize, Serialize};

/// Model metadata stored alongside the parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name/identifier (the checkpoint key).
    pub name: String,
    /// Architecture label.
    pub architecture: String,
    /// Crate version that wrote the checkpoint.
    pub version: String,
}

impl ModelMetadata {
    /// Create new metadata.
    pub fn new(name: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            architecture: architecture.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Information about one serialized parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name (e.g. "blocks.0.attn.w_q").
    pub name: String,
    /// Number of elements.
    pub len: usize,
    /// Whether the parameter requires gradients.
    pub requires_grad: bool,
}

/// Serializable model state: parameter layout plus one flattened data buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    /// Model metadata.
    pub metadata: ModelMetadata,
    /// Parameter layout, in order.
    pub parameters: Vec<ParameterInfo>,
    /// Flattened parameter data.
    pub data: Vec<f32>,
}

/// High-level model abstraction for checkpoint I/O.
pub struct Model {
    /// Model metadata.
    pub metadata: ModelMetadata,
    /// Named parameters, in a stable order.
    pub parameters: Vec<(String, Tensor)>,
}

impl Model {
    /// Create a new model.
    pub fn new(metadata: ModelMetadata, parameters: Vec<(String, Tensor)>) -> Self {
        Self { metadata, parameters }
    }

    /// Get a parameter by name.
    pub fn get_parameter(&self, name: &str) -> Option<&Tensor> {
        self.parameters.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Convert to the serializable state.
    pub fn to_state(&self) -> ModelState {
        let mut data = Vec::new();
        let parameters: Vec<ParameterInfo> = self
            .parameters
            .iter()
            .map(|(name, tensor)| {
                data.extend(tensor.to_vec());
                ParameterInfo {
                    name: name.clone(),
                    len: tensor.len(),
                    requires_grad: tensor.requires_grad(),
                }
            })
            .collect();

        ModelState { metadata: self.metadata.clone(), parameters, data }
    }

    /// Rebuild a model from its serializable state.
    pub fn from_state(state: ModelState) -> Self {
        let mut offset = 0;
        let parameters: Vec<(String, Tensor)> = state
            .parameters
            .into_iter()
            .map(|info| {
                let data = state.data[offset..offset + info.len].to_vec();
                offset += info.len;
                (info.name, Tensor::from_vec(data, info.requires_grad))
            })
            .collect();

        Self { metadata: state.metadata, parameters }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_records_version() {
        let meta = ModelMetadata::new("test", "transformer");
        assert_eq!(meta.name, "test");
        assert_eq!(meta.architecture, "transformer");
        assert!(!meta.version.is_empty());
    }

    #[test]
    fn test_parameter_access() {
        let params = vec![
            ("weight".to_string(), Tensor::from_vec(vec![1.0, 2.0], true)),
            ("bias".to_string(), Tensor::from_vec(vec![0.1], false)),
        ];
        let model = Model::new(ModelMetadata::new("t", "linear"), params);
        assert!(model.get_parameter("weight").is_some());
        assert!(model.get_parameter("missing").is_none());
    }

    #[test]
    fn test_state_round_trip() {
        let params = vec![
            ("a".to_string(), Tensor::from_vec(vec![1.0, 2.0, 3.0], true)),
            ("b".to_string(), Tensor::from_vec(vec![0.5], false)),
        ];
        let original = Model::new(ModelMetadata::new("rt", "transformer"), params);
        let restored = Model::from_state(original.to_state());

        assert_eq!(original.metadata.name, restored.metadata.name);
        assert_eq!(original.parameters.len(), restored.parameters.len());
        for (name, tensor) in &original.parameters {
            let other = restored.get_parameter(name).unwrap();
            assert_eq!(tensor.to_vec(), other.to_vec());
            assert_eq!(tensor.requires_grad(), other.requires_grad());
        }
    }

    #[test]
    fn test_state_data_is_concatenated_in_order() {
        let params = vec![
            ("a".to_string(), Tensor::from_vec(vec![1.0, 2.0], true)),
            ("b".to_string(), Tensor::from_vec(vec![3.0], true)),
        ];
        let state = Model::new(ModelMetadata::new("t", "x"), params).to_state();
        assert_eq!(state.data, vec![1.0, 2.0, 3.0]);
        assert_eq!(state.parameters[0].len, 2);
        assert_eq!(state.parameters[1].len, 1);
    }
}
