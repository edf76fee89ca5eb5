use log::debug;

use crate::{
    delta::{Delta, DeltaKind},
    model::Position,
    operation::{InsertOperation, MoveSpan, Operation, OperationKind, transform_operations},
    utils::pairwise::transform_pairwise,
};

/// Re-expresses `a` so that it can be applied after `b`, both deltas having
/// been created against the same document version.
pub fn transform_delta(a: &Delta, b: &Delta, is_strong: bool) -> Vec<Delta> {
    let mut transformed = if let Some(deltas) = special_case(a, b) {
        debug!("Transformed {} delta by {} delta with a dedicated rule", a.kind(), b.kind());
        deltas
    } else {
        let (operations, _) = transform_operations(a.operations(), b.operations(), is_strong);
        vec![Delta::new(a.kind(), operations)]
    };

    if let Some(base_version) = a.base_version() {
        rebase_all(&mut transformed, base_version + b.operation_count() as u64);
    }

    transformed
}

/// Transforms two concurrent delta sequences against each other. The results
/// are numbered to follow the other sequence.
pub fn transform_deltas(a: &[Delta], b: &[Delta], a_is_strong: bool) -> (Vec<Delta>, Vec<Delta>) {
    let (mut a_transformed, mut b_transformed) =
        transform_pairwise(a.to_vec(), b.to_vec(), a_is_strong, &transform_delta);

    if let Some(base_version) = first_base_version(a) {
        rebase_all(&mut a_transformed, base_version + operation_count(b));
    }
    if let Some(base_version) = first_base_version(b) {
        rebase_all(&mut b_transformed, base_version + operation_count(a));
    }

    (a_transformed, b_transformed)
}

fn first_base_version(deltas: &[Delta]) -> Option<u64> { deltas.iter().find_map(Delta::base_version) }

fn operation_count(deltas: &[Delta]) -> u64 { deltas.iter().map(|delta| delta.operation_count() as u64).sum() }

pub(crate) fn rebase_all(deltas: &mut [Delta], base_version: u64) {
    let mut version = base_version;
    for delta in deltas {
        delta.rebase(version);
        version += delta.operation_count() as u64;
    }
}

fn special_case(a: &Delta, b: &Delta) -> Option<Vec<Delta>> {
    let no_delta = || vec![Delta::no_delta(0)];

    match (a.kind(), b.kind()) {
        (DeltaKind::Merge, DeltaKind::Insert) => {
            (inserted_at(b)? == merge_position(a)?).then(no_delta)
        }
        (DeltaKind::Insert, DeltaKind::Merge) => {
            (inserted_at(a)? == merge_position(b)?).then(|| vec![b.reversed(), a.clone()])
        }
        (DeltaKind::Merge, DeltaKind::Move | DeltaKind::Remove) => {
            covers(single_move(b)?, merge_position(a)?).then(no_delta)
        }
        (DeltaKind::Move | DeltaKind::Remove, DeltaKind::Merge) => {
            covers(single_move(a)?, merge_position(b)?).then(|| vec![b.reversed(), a.clone()])
        }
        (DeltaKind::Split, DeltaKind::Remove) => {
            covers(single_move(b)?, &split_element(a)?).then(no_delta)
        }
        (DeltaKind::Remove, DeltaKind::Split) => remove_by_split(a, b),
        (DeltaKind::Split, DeltaKind::Split) => split_by_split(a, b),
        (DeltaKind::Unwrap, DeltaKind::Split) => {
            (unwrapped_element(a)? == &split_element(b)?).then(|| vec![b.reversed(), a.clone()])
        }
        (DeltaKind::Split, DeltaKind::Unwrap) => {
            (&split_element(a)? == unwrapped_element(b)?).then(no_delta)
        }
        _ => None,
    }
}

/// The removed span ends with the element being split: the clone created by
/// the split has to go as well.
fn remove_by_split(a: &Delta, b: &Delta) -> Option<Vec<Delta>> {
    let span = single_move(a)?;
    let element = split_element(b)?;

    let removes_element_last = span.source_position.has_same_parent_as(&element)
        && covers(span, &element)
        && span.source_position.offset() + span.how_many == element.offset() + 1;

    removes_element_last.then(|| {
        vec![Delta::new(
            DeltaKind::Remove,
            vec![Operation::new(
                0,
                OperationKind::Remove(MoveSpan {
                    how_many: span.how_many + 1,
                    ..span.clone()
                }),
            )],
        )]
    })
}

/// Two splits of the same element.
fn split_by_split(a: &Delta, b: &Delta) -> Option<Vec<Delta>> {
    let (insert, span) = split_parts(a)?;
    let (_, other) = split_parts(b)?;
    let at = &span.source_position;
    let other_at = &other.source_position;

    if !at.has_same_parent_as(other_at) {
        return None;
    }

    if at == other_at {
        return Some(vec![Delta::no_delta(0)]);
    }

    let (insert, span) = if at.offset() < other_at.offset() {
        // Only the nodes up to the other split point are left to move.
        (
            insert.clone(),
            MoveSpan {
                how_many: span.how_many.saturating_sub(other.how_many),
                ..span.clone()
            },
        )
    } else {
        // Our split point is now inside the clone created by the other split.
        let clone = insert.position.clone();
        let our_clone = clone.with_offset(clone.offset() + 1);
        (
            InsertOperation::new(our_clone.clone(), insert.nodes.clone()),
            MoveSpan::new(
                clone.child(at.offset() - other_at.offset()),
                span.how_many,
                our_clone.child(0),
            ),
        )
    };

    Some(vec![Delta::new(
        DeltaKind::Split,
        vec![
            Operation::new(0, OperationKind::Insert(insert)),
            Operation::new(0, OperationKind::Move(span)),
        ],
    )])
}

/// Whether the nodes moved by `span` include the node after `position` or
/// one of its ancestors.
fn covers(span: &MoveSpan, position: &Position) -> bool {
    let source = &span.source_position;
    let depth = source.depth();

    source.root() == position.root()
        && position.depth() >= depth
        && position.path()[..depth - 1] == *source.parent_path()
        && (source.offset()..source.offset() + span.how_many).contains(&position.path()[depth - 1])
}

fn single_move(delta: &Delta) -> Option<&MoveSpan> {
    match delta.operations() {
        [operation] => operation.move_span(),
        _ => None,
    }
}

fn inserted_at(delta: &Delta) -> Option<&Position> {
    match delta.operations() {
        [Operation {
            kind: OperationKind::Insert(insert),
            ..
        }] => Some(&insert.position),
        _ => None,
    }
}

fn split_parts(delta: &Delta) -> Option<(&InsertOperation, &MoveSpan)> {
    match delta.operations() {
        [
            Operation {
                kind: OperationKind::Insert(insert),
                ..
            },
            Operation {
                kind: OperationKind::Move(span),
                ..
            },
        ] if delta.kind() == DeltaKind::Split => Some((insert, span)),
        _ => None,
    }
}

/// Position of the element being split.
fn split_element(delta: &Delta) -> Option<Position> { split_parts(delta)?.1.source_position.parent_position() }

/// Position of the element merged into its previous sibling.
fn merge_position(delta: &Delta) -> Option<&Position> {
    match delta.operations() {
        [
            _,
            Operation {
                kind: OperationKind::Remove(removal),
                ..
            },
        ] if delta.kind() == DeltaKind::Merge => Some(&removal.source_position),
        _ => None,
    }
}

fn unwrapped_element(delta: &Delta) -> Option<&Position> {
    match delta.operations() {
        [
            Operation {
                kind: OperationKind::Move(span),
                ..
            },
            _,
        ] if delta.kind() == DeltaKind::Unwrap => Some(&span.target_position),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Element, Model, Node, Range};

    fn pos(path: &[usize]) -> Position { Position::new("main", path.to_vec()) }

    fn model() -> Model {
        // <$root><p>abcdefgh</p><p>ijkl</p><p>mnop</p></$root>
        let mut model = Model::new("main", "$root");
        model
            .root_mut("main")
            .unwrap()
            .insert_at_offset(
                0,
                ["abcdefgh", "ijkl", "mnop"]
                    .map(|text| Node::from(Element::new("p").with_children([Node::from(text)]))),
            )
            .unwrap();
        model
    }

    fn apply_all(model: &mut Model, deltas: &[Delta]) {
        for delta in deltas {
            for operation in delta.operations() {
                operation.apply(model).unwrap();
            }
        }
    }

    /// Applies both orders and returns the resulting main root, checking
    /// that they agree.
    fn converge(a: &Delta, b: &Delta) -> Element {
        let (a_transformed, b_transformed) = transform_deltas(&[a.clone()], &[b.clone()], true);

        let mut a_first = model();
        apply_all(&mut a_first, &[a.clone()]);
        apply_all(&mut a_first, &b_transformed);

        let mut b_first = model();
        apply_all(&mut b_first, &[b.clone()]);
        apply_all(&mut b_first, &a_transformed);

        assert_eq!(a_first.root("main"), b_first.root("main"));
        a_first.root("main").unwrap().clone()
    }

    fn texts(root: &Element) -> Vec<String> {
        root.children
            .iter()
            .map(|child| match child {
                Node::Element(element) => element.text_content(),
                Node::Text(text) => format!("#{}", text.data),
            })
            .collect()
    }

    fn split(path: &[usize]) -> Delta { Delta::split(&model(), &pos(path), 0).unwrap() }

    fn merge(path: &[usize]) -> Delta { Delta::merge(&model(), &pos(path), 0).unwrap() }

    fn remove(start: &[usize], end: &[usize]) -> Delta {
        Delta::remove(&model(), &Range::new(pos(start), pos(end)), 0)
            .unwrap()
            .remove(0)
    }

    fn paragraph(text: &str) -> Node { Element::new("p").with_children([Node::from(text)]).into() }

    #[test]
    fn test_splits_of_one_element() {
        assert_eq!(
            texts(&converge(&split(&[0, 2]), &split(&[0, 5]))),
            vec!["ab", "cde", "fgh", "ijkl", "mnop"]
        );
        assert_eq!(
            texts(&converge(&split(&[0, 5]), &split(&[0, 2]))),
            vec!["ab", "cde", "fgh", "ijkl", "mnop"]
        );
    }

    #[test]
    fn test_same_split_happens_once() {
        let (a, b) = transform_deltas(&[split(&[0, 3])], &[split(&[0, 3])], true);

        assert_eq!(a[0].kind(), DeltaKind::NoDelta);
        assert_eq!(b[0].kind(), DeltaKind::NoDelta);
        assert_eq!(a[0].base_version(), Some(2));
        assert_eq!(texts(&converge(&split(&[0, 3]), &split(&[0, 3]))), vec!["abc", "defgh", "ijkl", "mnop"]);
    }

    #[test]
    fn test_insert_between_merged_elements_cancels_merge() {
        let insert = Delta::insert(pos(&[1]), vec![paragraph("X")], 0);

        let (transformed, _) = transform_deltas(&[insert.clone()], &[merge(&[1])], true);
        assert_eq!(
            transformed.iter().map(Delta::kind).collect::<Vec<_>>(),
            vec![DeltaKind::Split, DeltaKind::Insert]
        );
        assert_eq!(transformed[1].base_version(), Some(4));

        assert_eq!(
            texts(&converge(&merge(&[1]), &insert)),
            vec!["abcdefgh", "X", "ijkl", "mnop"]
        );
    }

    #[test]
    fn test_removing_merged_element() {
        assert_eq!(texts(&converge(&merge(&[1]), &remove(&[1], &[2]))), vec!["abcdefgh", "mnop"]);
        assert_eq!(texts(&converge(&remove(&[1], &[2]), &merge(&[1]))), vec!["abcdefgh", "mnop"]);
    }

    #[test]
    fn test_removing_split_element() {
        assert_eq!(texts(&converge(&split(&[0, 3]), &remove(&[0], &[1]))), vec!["ijkl", "mnop"]);
        assert_eq!(texts(&converge(&remove(&[0], &[1]), &split(&[0, 3]))), vec!["ijkl", "mnop"]);
    }

    #[test]
    fn test_unwrapping_split_element() {
        let unwrap = Delta::unwrap(&model(), &pos(&[0]), 0).unwrap();

        assert_eq!(texts(&converge(&unwrap, &split(&[0, 3]))), vec!["#abcdefgh", "ijkl", "mnop"]);
        assert_eq!(texts(&converge(&split(&[0, 3]), &unwrap)), vec!["#abcdefgh", "ijkl", "mnop"]);
    }

    #[test]
    fn test_text_inserted_into_split_tail() {
        let insert = Delta::insert(pos(&[0, 5]), vec![Node::from("XY")], 0);

        assert_eq!(
            texts(&converge(&insert, &split(&[0, 3]))),
            vec!["abc", "deXYfgh", "ijkl", "mnop"]
        );
    }

    #[test]
    fn test_sequences_are_numbered_after_each_other() {
        let a = vec![split(&[0, 3]), Delta::insert(pos(&[1, 0]), vec![Node::from("X")], 2)];
        let b = vec![remove(&[2, 0], &[2, 2])];

        let (a_transformed, b_transformed) = transform_deltas(&a, &b, false);

        assert_eq!(a_transformed[0].base_version(), Some(1));
        assert_eq!(a_transformed[1].base_version(), Some(3));
        assert_eq!(b_transformed[0].base_version(), Some(3));
    }
}
