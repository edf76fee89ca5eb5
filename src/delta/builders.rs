//! Deltas built against the current state of a model. Each builder reads what
//! it needs from the tree (lengths, old values, names) and numbers the
//! operations from `base_version`.

use serde_json::Value;

use crate::{
    delta::{Delta, DeltaKind},
    errors::ModelError,
    model::{Element, Model, Node, Position, Range},
    operation::{
        AttributeOperation, InsertOperation, MoveSpan, Operation, OperationKind, RenameOperation,
        RootAttributeOperation,
    },
};

fn operation(kind: OperationKind) -> Operation { Operation::new(0, kind) }

fn positioned(mut delta: Delta, base_version: u64) -> Delta {
    delta.rebase(base_version);
    delta
}

/// The parent of `position` seen as the element being split, merged into or
/// unwrapped: it has to be an element below a root.
fn element_position(position: &Position) -> Result<Position, ModelError> {
    position.parent_position().ok_or_else(|| {
        ModelError::InvalidArgument(format!("{position} is not inside an element below a root"))
    })
}

fn element_after<'a>(model: &'a Model, position: &Position) -> Result<&'a Element, ModelError> {
    model
        .element_after(position)
        .ok_or_else(|| ModelError::InvalidArgument(format!("no element after {position}")))
}

fn check_flat(range: &Range) -> Result<(), ModelError> {
    if range.is_flat() {
        Ok(())
    } else {
        Err(ModelError::InvalidArgument(format!("{range} is not flat")))
    }
}

impl Delta {
    pub fn insert(position: Position, nodes: Vec<Node>, base_version: u64) -> Delta {
        positioned(
            Delta::new(
                DeltaKind::Insert,
                vec![operation(OperationKind::Insert(InsertOperation::new(position, nodes)))],
            ),
            base_version,
        )
    }

    /// One remove delta per flat part of the range, the last part first so
    /// that the earlier parts keep their positions.
    pub fn remove(model: &Model, range: &Range, base_version: u64) -> Result<Vec<Delta>, ModelError> {
        let mut version = base_version;
        let mut deltas = Vec::new();

        for flat in range.get_minimal_flat_ranges(model)?.into_iter().rev() {
            let how_many = flat.end().offset() - flat.start().offset();
            deltas.push(positioned(
                Delta::new(
                    DeltaKind::Remove,
                    vec![operation(OperationKind::Remove(MoveSpan::removal(
                        flat.start().clone(),
                        how_many,
                    )))],
                ),
                version,
            ));
            version += 1;
        }

        Ok(deltas)
    }

    pub fn move_range(range: &Range, target: Position, base_version: u64) -> Result<Delta, ModelError> {
        check_flat(range)?;

        let how_many = range.end().offset() - range.start().offset();
        Ok(positioned(
            Delta::new(
                DeltaKind::Move,
                vec![operation(OperationKind::Move(MoveSpan::new(
                    range.start().clone(),
                    how_many,
                    target,
                )))],
            ),
            base_version,
        ))
    }

    /// Sets (`Some`) or removes (`None`) an attribute on every node in the
    /// range. Returns `None` when no node would change.
    pub fn attribute(
        model: &Model,
        range: &Range,
        key: &str,
        value: Option<Value>,
        base_version: u64,
    ) -> Result<Option<Delta>, ModelError> {
        let mut operations = Vec::new();

        for flat in range.get_minimal_flat_ranges(model)? {
            let parent = model.parent_of(flat.start())?;
            for (start, end, old_value) in value_runs(parent, flat.start().offset(), flat.end().offset(), key) {
                if old_value == value {
                    continue;
                }

                operations.push(operation(OperationKind::Attribute(AttributeOperation {
                    range: Range::new(flat.start().with_offset(start), flat.start().with_offset(end)),
                    key: key.to_owned(),
                    old_value,
                    new_value: value.clone(),
                })));
            }
        }

        Ok((!operations.is_empty())
            .then(|| positioned(Delta::new(DeltaKind::Attribute, operations), base_version)))
    }

    pub fn root_attribute(
        model: &Model,
        root: &str,
        key: &str,
        value: Option<Value>,
        base_version: u64,
    ) -> Result<Option<Delta>, ModelError> {
        let element = model
            .root(root)
            .ok_or_else(|| ModelError::RootNotFound(root.to_owned()))?;
        let old_value = element.attributes.get(key).cloned();
        if old_value == value {
            return Ok(None);
        }

        Ok(Some(positioned(
            Delta::new(
                DeltaKind::RootAttribute,
                vec![operation(OperationKind::RootAttribute(RootAttributeOperation {
                    root: root.to_owned(),
                    key: key.to_owned(),
                    old_value,
                    new_value: value,
                }))],
            ),
            base_version,
        )))
    }

    pub fn rename(
        model: &Model,
        position: &Position,
        new_name: impl Into<String>,
        base_version: u64,
    ) -> Result<Delta, ModelError> {
        let element = element_after(model, position)?;

        Ok(positioned(
            Delta::new(
                DeltaKind::Rename,
                vec![operation(OperationKind::Rename(RenameOperation {
                    position: position.clone(),
                    old_name: element.name.clone(),
                    new_name: new_name.into(),
                }))],
            ),
            base_version,
        ))
    }

    /// Splits the parent of `position` in two at `position`: an empty clone
    /// of the element is inserted after it and the content after `position`
    /// is moved into the clone.
    pub fn split(model: &Model, position: &Position, base_version: u64) -> Result<Delta, ModelError> {
        let element_position = element_position(position)?;
        let element = element_after(model, &element_position)?;
        let how_many = element
            .max_offset()
            .checked_sub(position.offset())
            .ok_or_else(|| ModelError::InvalidPosition(position.to_string()))?;

        let clone_position = element_position.with_offset(element_position.offset() + 1);

        Ok(positioned(
            Delta::new(
                DeltaKind::Split,
                vec![
                    operation(OperationKind::Insert(InsertOperation::new(
                        clone_position.clone(),
                        vec![Node::Element(element.empty_clone())],
                    ))),
                    operation(OperationKind::Move(MoveSpan::new(
                        position.clone(),
                        how_many,
                        clone_position.child(0),
                    ))),
                ],
            ),
            base_version,
        ))
    }

    /// Merges the elements on both sides of `position`: the content of the
    /// one after it is moved to the end of the one before it, which removes
    /// the emptied element.
    pub fn merge(model: &Model, position: &Position, base_version: u64) -> Result<Delta, ModelError> {
        let previous = match model.node_before(position) {
            Some(Node::Element(element)) => element,
            _ => {
                return Err(ModelError::InvalidArgument(format!(
                    "no element before {position} to merge into"
                )));
            }
        };
        let next = element_after(model, position)?;
        let previous_position = position.with_offset(position.offset() - 1);

        Ok(positioned(
            Delta::new(
                DeltaKind::Merge,
                vec![
                    operation(OperationKind::Move(MoveSpan::new(
                        position.child(0),
                        next.max_offset(),
                        previous_position.child(previous.max_offset()),
                    ))),
                    operation(OperationKind::Remove(MoveSpan::removal(position.clone(), 1))),
                ],
            ),
            base_version,
        ))
    }

    /// Moves the flat range into `wrapper`, which takes its place.
    pub fn wrap(range: &Range, wrapper: Element, base_version: u64) -> Result<Delta, ModelError> {
        check_flat(range)?;
        if !wrapper.children.is_empty() {
            return Err(ModelError::InvalidArgument(format!(
                "wrapper <{}> has to be empty",
                wrapper.name
            )));
        }

        let how_many = range.end().offset() - range.start().offset();

        Ok(positioned(
            Delta::new(
                DeltaKind::Wrap,
                vec![
                    operation(OperationKind::Insert(InsertOperation::new(
                        range.end().clone(),
                        vec![Node::Element(wrapper)],
                    ))),
                    operation(OperationKind::Move(MoveSpan::new(
                        range.start().clone(),
                        how_many,
                        range.end().child(0),
                    ))),
                ],
            ),
            base_version,
        ))
    }

    /// Replaces the element after `position` with its children.
    pub fn unwrap(model: &Model, position: &Position, base_version: u64) -> Result<Delta, ModelError> {
        let how_many = element_after(model, position)?.max_offset();

        Ok(positioned(
            Delta::new(
                DeltaKind::Unwrap,
                vec![
                    operation(OperationKind::Move(MoveSpan::new(
                        position.child(0),
                        how_many,
                        position.clone(),
                    ))),
                    operation(OperationKind::Remove(MoveSpan::removal(
                        position.with_offset(position.offset() + how_many),
                        1,
                    ))),
                ],
            ),
            base_version,
        ))
    }
}

/// Splits `start..end` of `parent` into runs sharing the same value of `key`.
fn value_runs(parent: &Element, start: usize, end: usize, key: &str) -> Vec<(usize, usize, Option<Value>)> {
    let mut runs: Vec<(usize, usize, Option<Value>)> = Vec::new();
    let mut offset = start;

    while offset < end {
        let Some((node, node_start)) = parent.child_at_offset(offset) else {
            break;
        };
        let chunk_end = (node_start + node.offset_size()).min(end);
        let value = node.attributes().get(key).cloned();

        match runs.last_mut() {
            Some((_, run_end, run_value)) if *run_value == value => *run_end = chunk_end,
            _ => runs.push((offset, chunk_end, value)),
        }
        offset = chunk_end;
    }

    runs
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::Text;

    fn pos(path: &[usize]) -> Position { Position::new("main", path.to_vec()) }

    fn model() -> Model {
        // <$root><p>ab<b>cd</b>ef</p><p>gh</p></$root>
        let mut model = Model::new("main", "$root");
        model
            .root_mut("main")
            .unwrap()
            .insert_at_offset(
                0,
                [
                    Element::new("p")
                        .with_children([
                            Node::from("ab"),
                            Text::new("cd").with_attribute("bold", json!(true)).into(),
                            Node::from("ef"),
                        ])
                        .into(),
                    Element::new("p").with_children([Node::from("gh")]).into(),
                ],
            )
            .unwrap();
        model
    }

    fn apply(model: &mut Model, delta: &Delta) {
        for operation in delta.operations() {
            operation.apply(model).unwrap();
        }
    }

    fn texts(model: &Model) -> Vec<String> {
        model
            .root("main")
            .unwrap()
            .children
            .iter()
            .map(|child| child.as_element().map(Element::text_content).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_attribute_skips_unchanged_runs() {
        let model = model();
        let range = Range::new(pos(&[0, 1]), pos(&[0, 5]));

        let delta = Delta::attribute(&model, &range, "bold", Some(json!(true)), 4)
            .unwrap()
            .unwrap();

        let ranges = delta
            .operations()
            .iter()
            .map(|operation| match &operation.kind {
                OperationKind::Attribute(attribute) => attribute.range.to_string(),
                _ => unreachable!(),
            })
            .collect::<Vec<_>>();
        assert_eq!(ranges, vec!["[main:[0, 1] - [0, 2]]", "[main:[0, 4] - [0, 5]]"]);
        assert_eq!(delta.base_version(), Some(4));
    }

    #[test]
    fn test_attribute_without_change_builds_nothing() {
        let model = model();
        let range = Range::new(pos(&[0, 2]), pos(&[0, 4]));

        assert_eq!(Delta::attribute(&model, &range, "bold", Some(json!(true)), 0).unwrap(), None);
        assert_eq!(Delta::root_attribute(&model, "main", "lang", None, 0).unwrap(), None);
    }

    #[test]
    fn test_split_and_merge() {
        let mut model = model();

        let split = Delta::split(&model, &pos(&[0, 3]), 0).unwrap();
        apply(&mut model, &split);
        assert_eq!(texts(&model), vec!["abc", "def", "gh"]);

        let merge = Delta::merge(&model, &pos(&[1]), 2).unwrap();
        apply(&mut model, &merge);
        assert_eq!(texts(&model), vec!["abcdef", "gh"]);
        assert_eq!(model.graveyard().children.len(), 1);
    }

    #[test]
    fn test_split_at_end_creates_empty_element() {
        let mut model = model();

        let split = Delta::split(&model, &pos(&[1, 2]), 0).unwrap();
        apply(&mut model, &split);

        assert_eq!(texts(&model), vec!["abcdef", "gh", ""]);
    }

    #[test]
    fn test_wrap_and_unwrap() {
        let mut model = model();

        let wrap = Delta::wrap(&Range::new(pos(&[0]), pos(&[2])), Element::new("quote"), 0).unwrap();
        apply(&mut model, &wrap);
        assert_eq!(model.element_at("main", &[0]).unwrap().name, "quote");
        assert_eq!(model.element_at("main", &[0]).unwrap().children.len(), 2);

        let unwrap = Delta::unwrap(&model, &pos(&[0]), 2).unwrap();
        apply(&mut model, &unwrap);
        assert_eq!(texts(&model), vec!["abcdef", "gh"]);
    }

    #[test]
    fn test_remove_goes_backwards() {
        let model = model();
        let range = Range::new(pos(&[0, 4]), pos(&[1, 1]));

        let deltas = Delta::remove(&model, &range, 0).unwrap();

        let sources = deltas
            .iter()
            .map(|delta| delta.operations()[0].move_span().unwrap().source_position.to_string())
            .collect::<Vec<_>>();
        assert_eq!(sources, vec!["main:[1, 0]", "main:[0, 4]"]);
        assert_eq!(deltas[1].base_version(), Some(1));
    }

    #[test]
    fn test_invalid_targets() {
        let model = model();

        assert!(matches!(Delta::split(&model, &pos(&[1]), 0), Err(ModelError::InvalidArgument(_))));
        assert!(matches!(Delta::merge(&model, &pos(&[0]), 0), Err(ModelError::InvalidArgument(_))));
        assert!(matches!(
            Delta::wrap(&Range::new(pos(&[0, 1]), pos(&[1, 1])), Element::new("quote"), 0),
            Err(ModelError::InvalidArgument(_))
        ));
    }
}
