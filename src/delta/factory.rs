use crate::{delta::Delta, errors::ModelError, model::Model};

impl Delta {
    /// Deserializes a delta and checks the roots referenced by each of its
    /// operations against `model`.
    pub fn from_json(json: &str, model: &Model) -> Result<Self, ModelError> {
        let delta: Delta = serde_json::from_str(json)?;
        for operation in delta.operations() {
            operation.check_roots(model)?;
        }

        Ok(delta)
    }

    pub fn to_json(&self) -> Result<String, ModelError> { Ok(serde_json::to_string(self)?) }
}
