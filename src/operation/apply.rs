use log::trace;
use serde_json::Value;

use crate::{
    errors::ModelError,
    model::{Element, GRAVEYARD_ROOT_NAME, Model, Node, Position},
    operation::{
        AttributeOperation, InsertOperation, MoveSpan, Operation, OperationKind,
        RenameOperation, RootAttributeOperation,
    },
};

impl Operation {
    /// Mutates `model`. Every precondition is checked before the first
    /// mutation, so a failed application leaves the model untouched.
    pub(crate) fn apply(&self, model: &mut Model) -> Result<(), ModelError> {
        trace!("Applying {} operation (base version {})", self.type_name(), self.base_version);

        match &self.kind {
            OperationKind::Insert(insert) => apply_insert(model, insert),
            OperationKind::Move(span) => apply_move(model, span),
            OperationKind::Remove(span) => {
                if span.target_position.root() != GRAVEYARD_ROOT_NAME {
                    return Err(ModelError::Precondition(format!(
                        "remove operation has to target the graveyard, not {}",
                        span.target_position
                    )));
                }
                apply_move(model, span)
            }
            OperationKind::Reinsert(span) => {
                if span.source_position.root() != GRAVEYARD_ROOT_NAME {
                    return Err(ModelError::Precondition(format!(
                        "reinsert operation has to take nodes from the graveyard, not {}",
                        span.source_position
                    )));
                }
                apply_move(model, span)
            }
            OperationKind::Attribute(attribute) => apply_attribute(model, attribute),
            OperationKind::RootAttribute(root_attribute) => {
                apply_root_attribute(model, root_attribute)
            }
            OperationKind::Rename(rename) => apply_rename(model, rename),
            OperationKind::NoOperation => Ok(()),
        }
    }
}

fn check_offset(model: &Model, position: &Position) -> Result<(), ModelError> {
    let max_offset = model.parent_of(position)?.max_offset();
    if position.offset() > max_offset {
        return Err(ModelError::InvalidPosition(format!(
            "{position} is beyond its parent's end ({max_offset})"
        )));
    }

    Ok(())
}

fn apply_insert(model: &mut Model, insert: &InsertOperation) -> Result<(), ModelError> {
    check_offset(model, &insert.position)?;

    model
        .element_at_mut(insert.position.root(), insert.position.parent_path())?
        .insert_at_offset(insert.position.offset(), insert.nodes.iter().cloned())
}

fn apply_move(model: &mut Model, span: &MoveSpan) -> Result<(), ModelError> {
    let source = &span.source_position;
    let source_end = source.with_offset(source.offset() + span.how_many);
    check_offset(model, &source_end)?;
    check_offset(model, &span.target_position)?;

    if span.targets_into_itself() {
        return Err(ModelError::InvalidArgument(format!(
            "cannot move nodes from {source} into themselves at {}",
            span.target_position
        )));
    }

    let nodes = model
        .element_at_mut(source.root(), source.parent_path())?
        .remove_at_offset(source.offset(), span.how_many)?;

    let target = span.moved_range_start();
    model
        .element_at_mut(target.root(), target.parent_path())?
        .insert_at_offset(target.offset(), nodes)
}

/// The attribute value of every node overlapping `[start, end)`.
fn values_in_span<'a>(
    parent: &'a Element,
    start: usize,
    end: usize,
    key: &'a str,
) -> impl Iterator<Item = Option<&'a Value>> + 'a {
    let mut offset = 0;
    parent.children.iter().filter_map(move |child| {
        let child_start = offset;
        offset += child.offset_size();

        (child_start < end && offset > start).then(|| child.attributes().get(key))
    })
}

fn apply_attribute(model: &mut Model, attribute: &AttributeOperation) -> Result<(), ModelError> {
    let range = &attribute.range;
    if !range.is_flat() {
        return Err(ModelError::InvalidArgument(format!(
            "attribute operation needs a flat range, got {range}"
        )));
    }
    check_offset(model, range.end())?;

    let (start, end) = (range.start().offset(), range.end().offset());
    let parent = model.parent_of(range.start())?;
    let expected = attribute.old_value.as_ref();
    if let Some(found) = values_in_span(parent, start, end, &attribute.key).find(|value| *value != expected) {
        return Err(ModelError::Precondition(format!(
            "expected '{}' to be {expected:?} in {range}, found {found:?}",
            attribute.key
        )));
    }

    model
        .element_at_mut(range.root(), range.start().parent_path())?
        .update_span(start, end - start, |node| {
            set_attribute(node, &attribute.key, attribute.new_value.as_ref());
        })
}

fn set_attribute(node: &mut Node, key: &str, value: Option<&Value>) {
    match value {
        Some(value) => {
            node.attributes_mut().insert(key.to_owned(), value.clone());
        }
        None => {
            node.attributes_mut().remove(key);
        }
    }
}

fn apply_root_attribute(
    model: &mut Model,
    root_attribute: &RootAttributeOperation,
) -> Result<(), ModelError> {
    let root = model
        .root_mut(&root_attribute.root)
        .ok_or_else(|| ModelError::RootNotFound(root_attribute.root.clone()))?;

    let found = root.attributes.get(&root_attribute.key);
    if found != root_attribute.old_value.as_ref() {
        return Err(ModelError::Precondition(format!(
            "expected root attribute '{}' to be {:?}, found {found:?}",
            root_attribute.key, root_attribute.old_value
        )));
    }

    match &root_attribute.new_value {
        Some(value) => {
            root.attributes.insert(root_attribute.key.clone(), value.clone());
        }
        None => {
            root.attributes.remove(&root_attribute.key);
        }
    }

    Ok(())
}

fn apply_rename(model: &mut Model, rename: &RenameOperation) -> Result<(), ModelError> {
    let Some(element) = model.element_after(&rename.position) else {
        return Err(ModelError::InvalidArgument(format!(
            "there is no element to rename at {}",
            rename.position
        )));
    };

    if element.name != rename.old_name {
        return Err(ModelError::Precondition(format!(
            "expected element '{}' at {}, found '{}'",
            rename.old_name, rename.position, element.name
        )));
    }

    model
        .element_at_mut(rename.position.root(), rename.position.path())?
        .name
        .clone_from(&rename.new_name);

    Ok(())
}
