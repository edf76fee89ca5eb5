use crate::{errors::ModelError, model::Model, operation::Operation};

impl Operation {
    /// Deserializes an operation and checks that every root it references
    /// exists in `model`.
    pub fn from_json(json: &str, model: &Model) -> Result<Self, ModelError> {
        let operation: Operation = serde_json::from_str(json)?;
        operation.check_roots(model)?;

        Ok(operation)
    }

    pub fn to_json(&self) -> Result<String, ModelError> { Ok(serde_json::to_string(self)?) }

    pub(crate) fn check_roots(&self, model: &Model) -> Result<(), ModelError> {
        match self.roots().into_iter().find(|root| !model.has_root(root)) {
            Some(missing) => Err(ModelError::RootNotFound(missing.to_owned())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        model::{Node, Position},
        operation::{InsertOperation, MoveSpan, OperationKind},
    };

    fn model() -> Model { Model::new("main", "$root") }

    #[test]
    fn test_serialized_shape() {
        let operation = Operation::new(
            3,
            OperationKind::Insert(InsertOperation::new(
                Position::new("main", vec![0]),
                vec![Node::from("ab")],
            )),
        );

        assert_json_snapshot!(operation, @r#"
        {
          "baseVersion": 3,
          "__className": "InsertOperation",
          "position": {
            "root": "main",
            "path": [
              0
            ]
          },
          "nodes": [
            {
              "data": "ab"
            }
          ]
        }
        "#);
    }

    #[test]
    fn test_json_round_trip() {
        let operation = Operation::new(
            1,
            OperationKind::Remove(MoveSpan::removal(Position::new("main", vec![0]), 0)),
        );

        let json = operation.to_json().unwrap();

        assert_eq!(Operation::from_json(&json, &model()).unwrap(), operation);
    }

    #[test]
    fn test_unknown_root_is_rejected() {
        let json = r#"{"baseVersion":0,"__className":"InsertOperation","position":{"root":"other","path":[0]},"nodes":[]}"#;

        assert!(matches!(
            Operation::from_json(json, &model()),
            Err(ModelError::RootNotFound(root)) if root == "other"
        ));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let json = r#"{"baseVersion":0,"__className":"SplitOperation"}"#;

        assert!(matches!(Operation::from_json(json, &model()), Err(ModelError::Json(_))));
    }
}
