use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    delta::{Delta, DeltaKind},
    errors::ModelError,
    model::{Model, Node, Position, tree_walker::RangeItems},
    operation::{Operation, OperationKind},
    utils::compare_paths::{PathRelation, compare_paths},
};

/// An ordered pair of positions. `start` is never after `end`.
///
/// Like [`Position`], a range is a plain value: it is not updated when the tree
/// changes. Use [`LiveRange`](crate::LiveRange) for that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct Range {
    start: Position,
    end: Position,
}

#[derive(Deserialize)]
struct RawRange {
    start: Position,
    end: Position,
}

impl TryFrom<RawRange> for Range {
    type Error = ModelError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> { Range::try_new(raw.start, raw.end) }
}

impl Range {
    /// Creates a range between two positions of the same root, swapping them
    /// if needed.
    ///
    /// # Panics
    ///
    /// Panics if the positions are in different roots. Use `try_new` for
    /// untrusted input.
    pub fn new(start: Position, end: Position) -> Self {
        assert_eq!(start.root(), end.root(), "Range boundaries must share a root");

        if end.is_before(&start) {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    pub fn try_new(start: Position, end: Position) -> Result<Self, ModelError> {
        if start.root() != end.root() {
            return Err(ModelError::InvalidArgument(format!(
                "range boundaries {start} and {end} are in different roots"
            )));
        }

        Ok(Self::new(start, end))
    }

    pub fn collapsed(position: Position) -> Self {
        Self {
            start: position.clone(),
            end: position,
        }
    }

    pub fn start(&self) -> &Position { &self.start }

    pub fn end(&self) -> &Position { &self.end }

    pub fn root(&self) -> &str { self.start.root() }

    pub fn is_collapsed(&self) -> bool { self.start == self.end }

    /// Whether both boundaries are in the same parent.
    pub fn is_flat(&self) -> bool { self.start.has_same_parent_as(&self.end) }

    /// Whether no node lies between the boundaries.
    pub fn is_empty(&self, model: &Model) -> bool { self.start.is_touching(&self.end, model) }

    /// Strict interior test.
    pub fn contains_position(&self, position: &Position) -> bool {
        position.is_after(&self.start) && position.is_before(&self.end)
    }

    /// Whether both boundaries of `other` lie strictly inside this range.
    pub fn contains_range(&self, other: &Range) -> bool {
        self.contains_position(&other.start) && self.contains_position(&other.end)
    }

    pub fn is_intersecting(&self, other: &Range) -> bool {
        self.start.is_before(&other.end) && self.end.is_after(&other.start)
    }

    /// The parts of this range not covered by `other`: none, one or two
    /// ranges.
    pub fn get_difference(&self, other: &Range) -> Vec<Range> {
        if self == other {
            return Vec::new();
        }

        if !self.is_intersecting(other) {
            return vec![self.clone()];
        }

        let mut difference = Vec::with_capacity(2);
        if self.contains_position(&other.start) {
            difference.push(Range::new(self.start.clone(), other.start.clone()));
        }
        if self.contains_position(&other.end) {
            difference.push(Range::new(other.end.clone(), self.end.clone()));
        }

        difference
    }

    pub fn get_intersection(&self, other: &Range) -> Option<Range> {
        if self == other {
            return Some(self.clone());
        }

        if !self.is_intersecting(other) {
            return None;
        }

        let start = if self.contains_position(&other.start) {
            &other.start
        } else {
            &self.start
        };
        let end = if self.contains_position(&other.end) {
            &other.end
        } else {
            &self.end
        };

        Some(Range::new(start.clone(), end.clone()))
    }

    /// Splits the range into the smallest ordered list of flat ranges covering
    /// the same content. Empty pieces are left out.
    pub fn get_minimal_flat_ranges(&self, model: &Model) -> Result<Vec<Range>, ModelError> {
        let start_path = self.start.path();
        let end_path = self.end.path();

        let diff_at = match compare_paths(start_path, end_path) {
            PathRelation::Same => return Ok(Vec::new()),
            PathRelation::Differ(index) => index,
            PathRelation::Prefix => start_path.len() - 1,
            PathRelation::Extension => end_path.len() - 1,
        };

        let mut ranges = Vec::new();
        let mut position = self.start.clone();

        // Climb up to the level where the paths diverge.
        while position.depth() > diff_at + 1 {
            let max_offset = model.max_offset(self.root(), position.parent_path())?;
            if max_offset > position.offset() {
                ranges.push(Range::new(position.clone(), position.with_offset(max_offset)));
            }

            let Some(parent) = position.parent_position() else {
                break;
            };
            position = parent.with_offset(parent.offset() + 1);
        }

        // Walk down towards the end.
        while position.depth() <= end_path.len() {
            let offset = end_path[position.depth() - 1];
            if offset > position.offset() {
                ranges.push(Range::new(position.clone(), position.with_offset(offset)));
            }

            position = position.with_offset(offset).child(0);
        }

        Ok(ranges)
    }

    /// Lazily walks the items inside the range.
    pub fn items<'a>(&self, model: &'a Model) -> RangeItems<'a> { RangeItems::new(model, self) }

    /// Transforms the range by `how_many` slots inserted at `insert_position`.
    ///
    /// With `spread`, an insertion strictly inside the range breaks it into
    /// the part before and the part after the inserted content. Otherwise the
    /// range grows, and `sticky` decides whether content inserted right at a
    /// boundary is taken in.
    pub fn get_transformed_by_insertion(
        &self,
        insert_position: &Position,
        how_many: usize,
        spread: bool,
        sticky: bool,
    ) -> Vec<Range> {
        if spread && self.contains_position(insert_position) {
            return vec![
                Range::new(self.start.clone(), insert_position.clone()),
                Range::new(
                    insert_position.get_transformed_by_insertion(insert_position, how_many, true),
                    self.end
                        .get_transformed_by_insertion(insert_position, how_many, false),
                ),
            ];
        }

        let (insert_before_start, insert_before_end) = if self.is_collapsed() {
            (true, true)
        } else {
            (!sticky, sticky)
        };

        vec![Range::new(
            self.start
                .get_transformed_by_insertion(insert_position, how_many, insert_before_start),
            self.end
                .get_transformed_by_insertion(insert_position, how_many, insert_before_end),
        )]
    }

    /// Transforms the range by a removal that is not followed by an insertion
    /// anywhere this range cares about. Returns `None` if the whole range was
    /// taken out.
    pub fn get_transformed_by_deletion(
        &self,
        delete_position: &Position,
        how_many: usize,
    ) -> Option<Range> {
        let start = self.start.get_transformed_by_deletion(delete_position, how_many);
        let end = self.end.get_transformed_by_deletion(delete_position, how_many);

        match (start, end) {
            (None, None) => None,
            (Some(start), Some(end)) => Some(Range::new(start, end)),
            (Some(start), None) => Some(Range::new(start, delete_position.clone())),
            (None, Some(end)) => Some(Range::new(delete_position.clone(), end)),
        }
    }

    /// Transforms the range by moving `how_many` slots from `source` to
    /// `target` (expressed before the move).
    ///
    /// The part of the range outside the moved span stays in place, the part
    /// inside travels to the target. The result therefore may hold up to
    /// three ranges, in document order of the original content.
    pub fn get_transformed_by_move(
        &self,
        source: &Position,
        target: &Position,
        how_many: usize,
        spread: bool,
        sticky: bool,
    ) -> Vec<Range> {
        if self.is_collapsed() {
            return vec![Range::collapsed(
                self.start
                    .get_transformed_by_move(source, target, how_many, true, false),
            )];
        }

        let moved = Range::new(source.clone(), source.with_offset(source.offset() + how_many));
        let difference = self.get_difference(&moved);
        let common = self.get_intersection(&moved);

        let shrunk = match difference.as_slice() {
            [only] => Some(Range::new(
                deleted_or(&only.start, source, how_many),
                deleted_or(&only.end, source, how_many),
            )),
            [_, _] => Some(Range::new(
                self.start.clone(),
                deleted_or(&self.end, source, how_many),
            )),
            _ => None,
        };

        let insert_position = deleted_or(target, source, how_many);

        let mut result = shrunk.map_or_else(Vec::new, |shrunk| {
            shrunk.get_transformed_by_insertion(
                &insert_position,
                how_many,
                common.is_some() || spread,
                sticky,
            )
        });

        if let Some(common) = common {
            let relocated = Range::new(
                common.start.get_combined(source, &insert_position),
                common.end.get_combined(source, &insert_position),
            );

            if result.len() == 2 {
                result.insert(1, relocated);
            } else {
                result.push(relocated);
            }
        }

        result
    }

    /// How this range's content moved when `operation` got applied. Only
    /// operations changing the tree structure have an effect.
    pub fn get_transformed_by_operation(
        &self,
        operation: &Operation,
        delta_kind: Option<DeltaKind>,
    ) -> Vec<Range> {
        match &operation.kind {
            OperationKind::Insert(insert) => {
                self.get_transformed_by_insertion(&insert.position, insert.offset_size(), false, false)
            }
            OperationKind::Move(span) | OperationKind::Remove(span) | OperationKind::Reinsert(span) => {
                let source = &span.source_position;
                let source_end = source.with_offset(source.offset() + span.how_many);

                if self.is_collapsed() {
                    // A caret at the edge of a merged element would otherwise
                    // end up in the graveyard together with that element.
                    if delta_kind == Some(DeltaKind::Merge)
                        && self.start.has_same_parent_as(source)
                        && (self.start == *source || self.start == source_end)
                    {
                        let target = &span.target_position;
                        return vec![Range::collapsed(
                            target.with_offset(target.offset() + self.start.offset() - source.offset()),
                        )];
                    }

                    // A caret at the end of a split element follows to the new element.
                    if delta_kind == Some(DeltaKind::Split) && self.end == source_end {
                        let target = &span.target_position;
                        return vec![Range::collapsed(
                            target.with_offset(target.offset() + span.how_many),
                        )];
                    }
                }

                self.get_transformed_by_move(
                    source,
                    &span.target_position,
                    span.how_many,
                    false,
                    false,
                )
            }
            OperationKind::Attribute(_)
            | OperationKind::RootAttribute(_)
            | OperationKind::Rename(_)
            | OperationKind::NoOperation => vec![self.clone()],
        }
    }

    /// Ranges covering this range's content after `delta` got applied. Ranges
    /// contained in other results are dropped.
    pub fn get_transformed_by_delta(&self, delta: &Delta) -> Vec<Range> {
        let mut ranges = vec![self.clone()];
        for operation in delta.operations() {
            ranges = ranges
                .iter()
                .flat_map(|range| range.get_transformed_by_operation(operation, Some(delta.kind())))
                .collect();
        }

        coalesce(ranges)
    }

    pub fn get_transformed_by_deltas<'a>(&self, deltas: impl IntoIterator<Item = &'a Delta>) -> Vec<Range> {
        let mut ranges = vec![self.clone()];
        for delta in deltas {
            ranges = ranges
                .iter()
                .flat_map(|range| range.get_transformed_by_delta(delta))
                .collect();
        }

        coalesce(ranges)
    }

    pub fn create_from_position_and_shift(position: &Position, shift: isize) -> Result<Range, ModelError> {
        Ok(Range::new(position.clone(), position.get_shifted_by(shift)?))
    }

    pub fn create_from_parents_and_offsets(
        root: &str,
        start_parent: &[usize],
        start_offset: usize,
        end_parent: &[usize],
        end_offset: usize,
    ) -> Range {
        Range::new(
            Position::from_parent_and_offset(root, start_parent, start_offset),
            Position::from_parent_and_offset(root, end_parent, end_offset),
        )
    }

    /// Range spanning all children of the element found at `path`.
    pub fn create_in(model: &Model, root: &str, path: &[usize]) -> Result<Range, ModelError> {
        let max_offset = model.max_offset(root, path)?;

        Ok(Range::create_from_parents_and_offsets(root, path, 0, path, max_offset))
    }

    /// Range spanning exactly `node`, which starts at `position`.
    pub fn create_on(position: &Position, node: &Node) -> Range {
        Range::new(
            position.clone(),
            position.with_offset(position.offset() + node.offset_size()),
        )
    }

    /// Joins the first range with every range touching it, directly or
    /// through other touching ranges. Ranges not connected to the first one
    /// are ignored.
    pub fn create_from_ranges(ranges: &[Range]) -> Result<Range, ModelError> {
        let Some(reference) = ranges.first() else {
            return Err(ModelError::InvalidArgument(
                "cannot create a range from an empty array of ranges".to_owned(),
            ));
        };

        let mut sorted = ranges.iter().collect::<Vec<_>>();
        sorted.sort_by(|a, b| {
            if a.start.is_after(&b.start) {
                std::cmp::Ordering::Greater
            } else if a.start.is_before(&b.start) {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        });

        let reference_index = sorted
            .iter()
            .position(|range| std::ptr::eq(*range, reference))
            .unwrap_or_default();

        let mut result = reference.clone();

        for range in sorted[..reference_index].iter().rev() {
            if range.end != result.start {
                break;
            }
            result.start = range.start.clone();
        }

        for range in &sorted[reference_index + 1..] {
            if range.start != result.end {
                break;
            }
            result.end = range.end.clone();
        }

        Ok(result)
    }

    /// Parses a range and checks that its root exists in `model`.
    pub fn from_json(json: &str, model: &Model) -> Result<Range, ModelError> {
        let range: Range = serde_json::from_str(json)?;
        if !model.has_root(range.root()) {
            return Err(ModelError::RootNotFound(range.root().to_owned()));
        }

        Ok(range)
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} - {:?}]", self.start, self.end.path())
    }
}

/// Where `position` ends up once the slots at `source` are taken out.
/// Positions inside the removed span collapse onto `source`.
pub(crate) fn deleted_or(position: &Position, source: &Position, how_many: usize) -> Position {
    position
        .get_transformed_by_deletion(source, how_many)
        .unwrap_or_else(|| source.clone())
}

/// Drops ranges that are equal to, or contained in, an earlier result.
fn coalesce(ranges: Vec<Range>) -> Vec<Range> {
    let mut result: Vec<Range> = Vec::with_capacity(ranges.len());
    for range in ranges {
        let covered = result.iter().any(|kept| {
            *kept == range || kept.contains_range(&range) || range.contains_range(kept)
        });

        if !covered {
            result.push(range);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::{
        model::{Element, GRAVEYARD_ROOT_NAME},
        operation::{InsertOperation, MoveSpan},
    };

    fn pos(path: &[usize]) -> Position { Position::new("main", path.to_vec()) }

    fn range(start: &[usize], end: &[usize]) -> Range { Range::new(pos(start), pos(end)) }

    fn model() -> Model {
        // <$root><p>abcdef</p><p>ghi</p><p>jkl</p></$root>
        let mut model = Model::new("main", "$root");
        model
            .root_mut("main")
            .unwrap()
            .insert_at_offset(
                0,
                ["abcdef", "ghi", "jkl"]
                    .map(|text| Node::from(Element::new("p").with_children([Node::from(text)]))),
            )
            .unwrap();
        model
    }

    #[test]
    fn test_new_normalizes_order() {
        let range = range(&[0, 5], &[0, 2]);

        assert_eq!(range.start(), &pos(&[0, 2]));
        assert_eq!(range.end(), &pos(&[0, 5]));
        assert!(range.is_flat());
        assert!(!range.is_collapsed());
    }

    #[test]
    fn test_different_roots_are_rejected() {
        assert!(Range::try_new(pos(&[0]), Position::new("other", vec![0])).is_err());
    }

    #[test]
    #[should_panic(expected = "Range boundaries must share a root")]
    fn test_different_roots_panic() { let _ = Range::new(pos(&[0]), Position::new("other", vec![0])); }

    #[test_case(&[0, 3], true; "inside")]
    #[test_case(&[0, 2], false; "at start")]
    #[test_case(&[0, 5], false; "at end")]
    #[test_case(&[0, 3, 1], true; "nested inside")]
    fn test_contains_position(path: &[usize], expected: bool) {
        assert_eq!(range(&[0, 2], &[0, 5]).contains_position(&pos(path)), expected);
    }

    #[test]
    fn test_contains_range() {
        let outer = range(&[0, 1], &[0, 6]);

        assert!(outer.contains_range(&range(&[0, 2], &[0, 4])));
        assert!(!outer.contains_range(&range(&[0, 1], &[0, 4])));
        assert!(!outer.contains_range(&outer));
    }

    #[test_case(&[0, 1], &[0, 3], true; "overlapping")]
    #[test_case(&[0, 5], &[0, 7], false; "touching")]
    #[test_case(&[0, 6], &[0, 7], false; "disjoint")]
    #[test_case(&[0, 3], &[0, 4], true; "inside")]
    fn test_is_intersecting(start: &[usize], end: &[usize], expected: bool) {
        let base = range(&[0, 2], &[0, 5]);
        let other = range(start, end);

        assert_eq!(base.is_intersecting(&other), expected);
        assert_eq!(other.is_intersecting(&base), expected);
    }

    #[test]
    fn test_difference() {
        let base = range(&[0, 2], &[0, 8]);

        assert_eq!(base.get_difference(&range(&[0, 0], &[0, 9])), Vec::<Range>::new());
        assert_eq!(
            base.get_difference(&range(&[0, 4], &[0, 5])),
            vec![range(&[0, 2], &[0, 4]), range(&[0, 5], &[0, 8])]
        );
        assert_eq!(
            base.get_difference(&range(&[0, 0], &[0, 4])),
            vec![range(&[0, 4], &[0, 8])]
        );
        assert_eq!(base.get_difference(&range(&[1, 0], &[1, 4])), vec![base.clone()]);
    }

    #[test]
    fn test_intersection() {
        let base = range(&[0, 2], &[0, 8]);

        assert_eq!(
            base.get_intersection(&range(&[0, 0], &[0, 4])),
            Some(range(&[0, 2], &[0, 4]))
        );
        assert_eq!(
            base.get_intersection(&range(&[0, 3], &[0, 4])),
            Some(range(&[0, 3], &[0, 4]))
        );
        assert_eq!(base.get_intersection(&range(&[0, 8], &[0, 9])), None);
    }

    #[test]
    fn test_difference_and_intersection_with_itself() {
        for range in [range(&[0, 2], &[0, 8]), range(&[1], &[1]), range(&[0, 1], &[2, 0])] {
            assert_eq!(range.get_difference(&range), Vec::<Range>::new());
            assert_eq!(range.get_intersection(&range), Some(range.clone()));
        }
    }

    #[test]
    fn test_difference_and_intersection_partition_the_range() {
        let base = range(&[0, 1], &[2, 1]);

        for other in [
            range(&[0, 3], &[1, 2]),
            range(&[0, 0], &[0, 2]),
            range(&[1], &[3]),
            range(&[0, 4], &[0, 5]),
        ] {
            let mut pieces = base.get_difference(&other);
            pieces.extend(base.get_intersection(&other));
            pieces.sort_by(|a, b| {
                if a.start().is_before(b.start()) {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Greater
                }
            });

            assert_eq!(pieces.first().unwrap().start(), base.start());
            assert_eq!(pieces.last().unwrap().end(), base.end());
            for pair in pieces.windows(2) {
                assert_eq!(pair[0].end(), pair[1].start());
            }
        }
    }

    #[test]
    fn test_minimal_flat_ranges() {
        let model = model();

        assert_eq!(
            range(&[0, 1], &[2, 2]).get_minimal_flat_ranges(&model).unwrap(),
            vec![
                range(&[0, 1], &[0, 6]),
                range(&[1], &[2]),
                range(&[2, 0], &[2, 2]),
            ]
        );
        assert_eq!(
            range(&[0, 6], &[1, 0]).get_minimal_flat_ranges(&model).unwrap(),
            Vec::<Range>::new()
        );
        assert_eq!(
            range(&[0, 2], &[1]).get_minimal_flat_ranges(&model).unwrap(),
            vec![range(&[0, 2], &[0, 6])]
        );
        assert_eq!(
            range(&[0], &[2]).get_minimal_flat_ranges(&model).unwrap(),
            vec![range(&[0], &[2])]
        );
        assert_eq!(
            range(&[1, 1], &[1, 1]).get_minimal_flat_ranges(&model).unwrap(),
            Vec::<Range>::new()
        );
    }

    #[test]
    fn test_transformed_by_insertion() {
        let base = range(&[0, 2], &[0, 5]);

        assert_eq!(
            base.get_transformed_by_insertion(&pos(&[0, 3]), 2, false, false),
            vec![range(&[0, 2], &[0, 7])]
        );
        assert_eq!(
            base.get_transformed_by_insertion(&pos(&[0, 3]), 2, true, false),
            vec![range(&[0, 2], &[0, 3]), range(&[0, 5], &[0, 7])]
        );
        // Boundaries exclude content inserted on them unless sticky.
        assert_eq!(
            base.get_transformed_by_insertion(&pos(&[0, 2]), 2, false, false),
            vec![range(&[0, 4], &[0, 7])]
        );
        assert_eq!(
            base.get_transformed_by_insertion(&pos(&[0, 5]), 2, false, true),
            vec![range(&[0, 2], &[0, 7])]
        );
        // Collapsed ranges stick forward.
        assert_eq!(
            Range::collapsed(pos(&[0, 2])).get_transformed_by_insertion(&pos(&[0, 2]), 2, false, false),
            vec![Range::collapsed(pos(&[0, 4]))]
        );
    }

    #[test]
    fn test_transformed_by_move_splits_off_moved_part() {
        let base = range(&[0, 1], &[0, 5]);

        // Move [0,3..6) to the start of the third paragraph.
        assert_eq!(
            base.get_transformed_by_move(&pos(&[0, 3]), &pos(&[2, 0]), 3, false, false),
            vec![range(&[0, 1], &[0, 3]), range(&[2, 0], &[2, 2])]
        );
    }

    #[test]
    fn test_transformed_by_move_inside_range() {
        let base = range(&[0, 1], &[0, 6]);

        assert_eq!(
            base.get_transformed_by_move(&pos(&[0, 2]), &pos(&[1, 0]), 2, false, false),
            vec![range(&[0, 1], &[0, 4]), range(&[1, 0], &[1, 2])]
        );
    }

    #[test]
    fn test_transformed_by_self_overlapping_move() {
        // Moving [0,2..4) to [0,5] while the range covers [0,3..6).
        let base = range(&[0, 3], &[0, 6]);

        let result = base.get_transformed_by_move(&pos(&[0, 2]), &pos(&[0, 5]), 2, false, false);

        // "abcdef" becomes "abecdf": `e` is at 2, `d` at 4 and `f` at 5.
        assert_eq!(
            result,
            vec![
                range(&[0, 2], &[0, 3]),
                range(&[0, 4], &[0, 5]),
                range(&[0, 5], &[0, 6]),
            ]
        );
        assert_eq!(
            Range::create_from_ranges(&result).unwrap(),
            range(&[0, 2], &[0, 3])
        );
    }

    #[test]
    fn test_transformed_by_move_to_range_start() {
        // The target equals the range start: moved content lands in front of it.
        let base = range(&[0, 3], &[0, 5]);

        assert_eq!(
            base.get_transformed_by_move(&pos(&[1, 0]), &pos(&[0, 3]), 1, false, false),
            vec![range(&[0, 4], &[0, 6])]
        );
    }

    #[test]
    fn test_scenario_remove_shrinks_range() {
        let base = range(&[0, 2], &[0, 5]);
        let remove = Operation::new(
            0,
            OperationKind::Remove(MoveSpan::new(
                pos(&[0, 2]),
                2,
                Position::new(GRAVEYARD_ROOT_NAME, vec![0]),
            )),
        );

        let result = base.get_transformed_by_operation(&remove, None);

        assert_eq!(result[0], range(&[0, 2], &[0, 3]));
        assert_eq!(result[1].root(), GRAVEYARD_ROOT_NAME);
    }

    #[test]
    fn test_transformed_by_insert_operation() {
        let insert = Operation::new(
            0,
            OperationKind::Insert(InsertOperation::new(pos(&[0, 1]), vec![Node::from("xyz")])),
        );

        assert_eq!(
            range(&[0, 2], &[0, 4]).get_transformed_by_operation(&insert, None),
            vec![range(&[0, 5], &[0, 7])]
        );
    }

    #[test]
    fn test_scenario_create_from_ranges() {
        let ranges = [
            range(&[0, 3], &[0, 5]),
            range(&[0, 1], &[0, 3]),
            range(&[0, 7], &[0, 9]),
        ];

        assert_eq!(
            Range::create_from_ranges(&ranges).unwrap(),
            range(&[0, 1], &[0, 5])
        );
    }

    #[test]
    fn test_create_from_ranges_scans_backward_through_chain() {
        let ranges = [
            range(&[0, 5], &[0, 6]),
            range(&[0, 1], &[0, 3]),
            range(&[0, 3], &[0, 5]),
            range(&[0, 6], &[0, 8]),
        ];

        assert_eq!(
            Range::create_from_ranges(&ranges).unwrap(),
            range(&[0, 1], &[0, 8])
        );
    }

    #[test]
    fn test_create_from_no_ranges() {
        assert!(matches!(
            Range::create_from_ranges(&[]),
            Err(ModelError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_factories() {
        let model = model();

        assert_eq!(Range::create_in(&model, "main", &[1]).unwrap(), range(&[1, 0], &[1, 3]));
        assert_eq!(
            Range::create_on(&pos(&[1]), &Element::new("p").into()),
            range(&[1], &[2])
        );
        assert_eq!(
            Range::create_from_position_and_shift(&pos(&[0, 4]), -2).unwrap(),
            range(&[0, 2], &[0, 4])
        );
        assert_eq!(
            Range::create_from_parents_and_offsets("main", &[0], 1, &[2], 0),
            range(&[0, 1], &[2, 0])
        );
    }

    #[test]
    fn test_json() {
        let model = model();
        let base = range(&[0, 2], &[1, 1]);

        let json = serde_json::to_string(&base).unwrap();

        assert_eq!(
            json,
            r#"{"start":{"root":"main","path":[0,2]},"end":{"root":"main","path":[1,1]}}"#
        );
        assert_eq!(Range::from_json(&json, &model).unwrap(), base);
        assert!(matches!(
            Range::from_json(&json.replace("main", "missing"), &model),
            Err(ModelError::RootNotFound(_))
        ));
    }
}
