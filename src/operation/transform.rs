//! Pairwise transformation of operations.
//!
//! `transform(a, b, is_strong)` returns operations expressing the intent of `a`
//! in the tree as it is after `b` got applied, both `a` and `b` having been
//! created against the same document version. `is_strong` breaks ties: when
//! both operations want the same spot or the same content, the strong one
//! wins.

use log::debug;

use crate::{
    model::{Range, range::deleted_or},
    operation::{
        AttributeOperation, InsertOperation, MoveSpan, Operation, OperationKind,
        RenameOperation, RootAttributeOperation,
    },
    utils::pairwise::transform_pairwise,
};

pub fn transform(a: &Operation, b: &Operation, is_strong: bool) -> Vec<Operation> {
    let kinds = transform_kind(&a.kind, &b.kind, is_strong);

    if kinds.len() != 1 || kinds[0] != a.kind {
        debug!(
            "Transformed {} by {} into {} operation(s)",
            a.type_name(),
            b.type_name(),
            kinds.len()
        );
    }

    kinds
        .into_iter()
        .enumerate()
        .map(|(index, kind)| Operation::new(a.base_version + 1 + index as u64, kind))
        .collect()
}

/// Transforms two concurrent sequences against each other. Returns `a'` and
/// `b'` such that applying `b` then `a'` has the same effect as applying `a`
/// then `b'`. The results are numbered to follow the other sequence.
pub fn transform_operations(
    a: &[Operation],
    b: &[Operation],
    a_is_strong: bool,
) -> (Vec<Operation>, Vec<Operation>) {
    let (mut a_transformed, mut b_transformed) =
        transform_pairwise(a.to_vec(), b.to_vec(), a_is_strong, &transform);

    if let Some(first) = a.first() {
        renumber(&mut a_transformed, first.base_version + b.len() as u64);
    }
    if let Some(first) = b.first() {
        renumber(&mut b_transformed, first.base_version + a.len() as u64);
    }

    (a_transformed, b_transformed)
}

pub(crate) fn renumber(operations: &mut [Operation], base_version: u64) {
    for (index, operation) in operations.iter_mut().enumerate() {
        operation.base_version = base_version + index as u64;
    }
}

fn transform_kind(a: &OperationKind, b: &OperationKind, is_strong: bool) -> Vec<OperationKind> {
    use OperationKind as Kind;

    match (a, b) {
        (Kind::NoOperation, _) => vec![Kind::NoOperation],
        (_, Kind::NoOperation) => vec![a.clone()],

        (Kind::Insert(insert), Kind::Insert(other)) => {
            vec![Kind::Insert(InsertOperation {
                position: insert.position.get_transformed_by_insertion(
                    &other.position,
                    other.offset_size(),
                    !is_strong,
                ),
                nodes: insert.nodes.clone(),
            })]
        }
        (Kind::Insert(insert), Kind::Move(span) | Kind::Remove(span) | Kind::Reinsert(span)) => {
            vec![Kind::Insert(InsertOperation {
                position: insert.position.get_transformed_by_move(
                    &span.source_position,
                    &span.target_position,
                    span.how_many,
                    !is_strong,
                    false,
                ),
                nodes: insert.nodes.clone(),
            })]
        }

        (Kind::Attribute(attribute), Kind::Insert(insert)) => attribute_operations(
            attribute,
            attribute.range.get_transformed_by_insertion(
                &insert.position,
                insert.offset_size(),
                true,
                false,
            ),
        ),
        (Kind::Attribute(attribute), Kind::Move(span) | Kind::Remove(span) | Kind::Reinsert(span)) => {
            attribute_by_move(attribute, span)
        }
        (Kind::Attribute(attribute), Kind::Attribute(other)) => {
            attribute_by_attribute(attribute, other, is_strong)
        }

        (Kind::RootAttribute(root_attribute), Kind::RootAttribute(other))
            if root_attribute.root == other.root && root_attribute.key == other.key =>
        {
            if root_attribute.new_value == other.new_value || !is_strong {
                vec![Kind::NoOperation]
            } else {
                vec![Kind::RootAttribute(RootAttributeOperation {
                    old_value: other.new_value.clone(),
                    ..root_attribute.clone()
                })]
            }
        }

        (Kind::Rename(rename), Kind::Insert(insert)) => vec![Kind::Rename(RenameOperation {
            position: rename.position.get_transformed_by_insertion(
                &insert.position,
                insert.offset_size(),
                true,
            ),
            ..rename.clone()
        })],
        (Kind::Rename(rename), Kind::Move(span) | Kind::Remove(span) | Kind::Reinsert(span)) => {
            let sticky = rename.position == span.source_position;
            vec![Kind::Rename(RenameOperation {
                position: rename.position.get_transformed_by_move(
                    &span.source_position,
                    &span.target_position,
                    span.how_many,
                    true,
                    sticky,
                ),
                ..rename.clone()
            })]
        }
        (Kind::Rename(rename), Kind::Rename(other)) if rename.position == other.position => {
            if is_strong && rename.new_name != other.new_name {
                vec![Kind::Rename(RenameOperation {
                    old_name: other.new_name.clone(),
                    ..rename.clone()
                })]
            } else {
                vec![Kind::NoOperation]
            }
        }

        (Kind::Move(span) | Kind::Remove(span) | Kind::Reinsert(span), Kind::Insert(insert)) => {
            vec![with_span(a, move_by_insertion(span, insert, is_strong))]
        }
        (
            Kind::Move(span) | Kind::Remove(span) | Kind::Reinsert(span),
            Kind::Move(other) | Kind::Remove(other) | Kind::Reinsert(other),
        ) => move_by_move(a, span, b, other, is_strong),

        _ => vec![a.clone()],
    }
}

/// Same variant as `kind`, carrying a new span.
fn with_span(kind: &OperationKind, span: MoveSpan) -> OperationKind {
    match kind {
        OperationKind::Remove(_) => OperationKind::Remove(span),
        OperationKind::Reinsert(_) => OperationKind::Reinsert(span),
        _ => OperationKind::Move(span),
    }
}

fn attribute_operations(attribute: &AttributeOperation, ranges: Vec<Range>) -> Vec<OperationKind> {
    let operations = ranges
        .into_iter()
        .filter(|range| !range.is_collapsed())
        .map(|range| {
            OperationKind::Attribute(AttributeOperation {
                range,
                ..attribute.clone()
            })
        })
        .collect::<Vec<_>>();

    if operations.is_empty() {
        vec![OperationKind::NoOperation]
    } else {
        operations
    }
}

/// Whether `inner` lies within `outer`, boundaries included.
fn encloses(outer: &Range, inner: &Range) -> bool {
    outer.root() == inner.root()
        && !inner.start().is_before(outer.start())
        && !inner.end().is_after(outer.end())
}

fn attribute_by_move(attribute: &AttributeOperation, span: &MoveSpan) -> Vec<OperationKind> {
    let range = &attribute.range;
    let moved = span.source_range();
    let moved_start = span.moved_range_start();
    let source = &span.source_position;

    let (difference, common) = if range.start().has_same_parent_as(source) {
        let difference = range.get_difference(&moved);
        // The pieces on both sides of the moved nodes become adjacent once the
        // nodes are gone, so they are transformed as one.
        let joined = match (difference.first(), difference.last()) {
            (Some(first), Some(last)) => Some(Range::new(first.start().clone(), last.end().clone())),
            _ => None,
        };
        (joined, range.get_intersection(&moved))
    } else if encloses(&moved, range) {
        (None, Some(range.clone()))
    } else {
        (Some(range.clone()), None)
    };

    let mut ranges = Vec::new();
    if let Some(difference) = difference {
        let shrunk = Range::new(
            deleted_or(difference.start(), source, span.how_many),
            deleted_or(difference.end(), source, span.how_many),
        );
        ranges.extend(shrunk.get_transformed_by_insertion(&moved_start, span.how_many, true, false));
    }
    if let Some(common) = common {
        ranges.push(Range::new(
            common.start().get_combined(source, &moved_start),
            common.end().get_combined(source, &moved_start),
        ));
    }

    attribute_operations(attribute, ranges)
}

fn attribute_by_attribute(
    attribute: &AttributeOperation,
    other: &AttributeOperation,
    is_strong: bool,
) -> Vec<OperationKind> {
    if attribute.key != other.key || !attribute.range.start().has_same_parent_as(other.range.start()) {
        return vec![OperationKind::Attribute(attribute.clone())];
    }

    let mut operations = attribute
        .range
        .get_difference(&other.range)
        .into_iter()
        .filter(|range| !range.is_collapsed())
        .map(|range| {
            OperationKind::Attribute(AttributeOperation {
                range,
                ..attribute.clone()
            })
        })
        .collect::<Vec<_>>();

    // The overlap has already been changed by the other operation.
    if is_strong {
        if let Some(common) = attribute.range.get_intersection(&other.range) {
            operations.push(OperationKind::Attribute(AttributeOperation {
                range: common,
                key: attribute.key.clone(),
                old_value: other.new_value.clone(),
                new_value: attribute.new_value.clone(),
            }));
        }
    }

    if operations.is_empty() {
        vec![OperationKind::NoOperation]
    } else {
        operations
    }
}

fn move_by_insertion(span: &MoveSpan, insert: &InsertOperation, is_strong: bool) -> MoveSpan {
    let how_many = insert.offset_size();
    let range = span
        .source_range()
        .get_transformed_by_insertion(&insert.position, how_many, false, false)
        .swap_remove(0);

    MoveSpan::new(
        range.start().clone(),
        range.end().offset() - range.start().offset(),
        span.target_position
            .get_transformed_by_insertion(&insert.position, how_many, !is_strong),
    )
}

fn move_by_move(
    a: &OperationKind,
    span: &MoveSpan,
    b: &OperationKind,
    other: &MoveSpan,
    is_strong: bool,
) -> Vec<OperationKind> {
    // Removing wins over moving, and two removes never fight over content.
    let is_strong = match (
        matches!(a, OperationKind::Remove(_)),
        matches!(b, OperationKind::Remove(_)),
    ) {
        (true, false) => true,
        (false, true) | (true, true) => false,
        (false, false) => is_strong,
    };

    let new_target = span.target_position.get_transformed_by_move(
        &other.source_position,
        &other.target_position,
        other.how_many,
        !is_strong,
        false,
    );

    if span.how_many == 0 {
        let source = span.source_position.get_transformed_by_move(
            &other.source_position,
            &other.target_position,
            other.how_many,
            true,
            false,
        );
        return vec![with_span(a, MoveSpan::new(source, 0, new_target))];
    }

    let pieces = moved_pieces(span, other, is_strong);
    if pieces.is_empty() {
        return vec![OperationKind::NoOperation];
    }

    let mut spans: Vec<MoveSpan> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let mut range = piece;
        let mut target = new_target.clone();
        for previous in &spans {
            range = range
                .get_transformed_by_move(
                    &previous.source_position,
                    &previous.target_position,
                    previous.how_many,
                    false,
                    false,
                )
                .swap_remove(0);
            target = target.get_transformed_by_move(
                &previous.source_position,
                &previous.target_position,
                previous.how_many,
                true,
                false,
            );
        }

        spans.push(MoveSpan::new(
            range.start().clone(),
            range.end().offset() - range.start().offset(),
            target,
        ));
    }

    if spans.iter().any(MoveSpan::targets_into_itself) {
        // The other operation moved our target into the nodes we are moving.
        // The strong side takes that move back first, the weak side gives up.
        return if is_strong {
            debug!("Reverting a concurrent move that put the target inside the moved nodes");
            vec![with_span(b, other.reversed()), a.clone()]
        } else {
            vec![OperationKind::NoOperation]
        };
    }

    spans.into_iter().map(|span| with_span(a, span)).collect()
}

/// Where the nodes moved by `span` are after `other` got applied, as ranges
/// in the original order of those nodes.
fn moved_pieces(span: &MoveSpan, other: &MoveSpan, is_strong: bool) -> Vec<Range> {
    let range = span.source_range();
    let other_range = other.source_range();
    let other_source = &other.source_position;
    let other_moved_start = other.moved_range_start();

    let relocate = |common: &Range| {
        Range::new(
            common.start().get_combined(other_source, &other_moved_start),
            common.end().get_combined(other_source, &other_moved_start),
        )
    };
    let shift = |piece: &Range| {
        Range::new(
            deleted_or(piece.start(), other_source, other.how_many),
            deleted_or(piece.end(), other_source, other.how_many),
        )
        .get_transformed_by_insertion(&other_moved_start, other.how_many, false, false)
        .swap_remove(0)
    };

    if !range.start().has_same_parent_as(other_source) {
        return if encloses(&other_range, &range) {
            // Our nodes are inside the nodes moved by the other operation.
            vec![relocate(&range)]
        } else {
            vec![shift(&range)]
        };
    }

    let difference = range.get_difference(&other_range);
    let common = range
        .get_intersection(&other_range)
        .filter(|_| is_strong)
        .map(|common| relocate(&common));

    let mut pieces = match (difference.as_slice(), common) {
        ([before, after], Some(common)) => vec![shift(before), common, shift(after)],
        ([only], Some(common)) if other_range.start().is_before(range.start()) => {
            vec![common, shift(only)]
        }
        ([only], Some(common)) => vec![shift(only), common],
        ([], Some(common)) => vec![common],
        // A difference has at most two pieces.
        (pieces, Some(common)) => pieces.iter().map(shift).chain([common]).collect(),
        (pieces, None) => pieces.iter().map(shift).collect(),
    };
    pieces.retain(|piece| !piece.is_collapsed());

    // Pieces that became neighbours can travel together.
    let mut merged: Vec<Range> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        match merged.last_mut() {
            Some(last) if last.end() == piece.start() => {
                *last = Range::new(last.start().clone(), piece.end().clone());
            }
            _ => merged.push(piece),
        }
    }

    merged
}
