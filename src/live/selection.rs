use serde_json::Value;

use crate::{
    errors::ModelError,
    model::{Attributes, Position, Range},
};

/// A set of non-intersecting ranges plus the attributes typed text would get.
///
/// The last added range carries the direction: when it is backward its end is
/// the anchor and its start is the focus.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    ranges: Vec<Range>,
    last_range_backward: bool,
    attributes: Attributes,
}

impl Selection {
    pub fn new() -> Self { Self::default() }

    /// Ranges in the order they were added.
    pub fn ranges(&self) -> &[Range] { &self.ranges }

    pub fn range_count(&self) -> usize { self.ranges.len() }

    /// The range starting first in document order.
    pub fn first_range(&self) -> Option<&Range> {
        self.ranges
            .iter()
            .reduce(|first, range| if range.start().is_before(first.start()) { range } else { first })
    }

    /// The range ending last in document order.
    pub fn last_range(&self) -> Option<&Range> {
        self.ranges
            .iter()
            .reduce(|last, range| if range.end().is_after(last.end()) { range } else { last })
    }

    pub fn is_backward(&self) -> bool {
        self.last_range_backward
            && self
                .ranges
                .last()
                .is_some_and(|range| !range.is_collapsed())
    }

    pub fn anchor(&self) -> Option<&Position> {
        let range = self.ranges.last()?;
        Some(if self.is_backward() { range.end() } else { range.start() })
    }

    pub fn focus(&self) -> Option<&Position> {
        let range = self.ranges.last()?;
        Some(if self.is_backward() { range.start() } else { range.end() })
    }

    /// A single collapsed range.
    pub fn is_collapsed(&self) -> bool { self.ranges.len() == 1 && self.ranges[0].is_collapsed() }

    /// Fails without changing anything if `range` intersects a range already
    /// in the selection.
    pub fn add_range(&mut self, range: Range, backward: bool) -> Result<(), ModelError> {
        if let Some(existing) = self.ranges.iter().find(|existing| intersects(existing, &range)) {
            return Err(ModelError::InvalidArgument(format!(
                "{range} intersects with selection range {existing}"
            )));
        }

        self.ranges.push(range);
        self.last_range_backward = backward;

        Ok(())
    }

    /// Replaces every range. An empty input clears the selection.
    pub fn set_ranges(&mut self, ranges: impl IntoIterator<Item = Range>, backward: bool) -> Result<(), ModelError> {
        let mut selection = Selection {
            attributes: std::mem::take(&mut self.attributes),
            ..Selection::default()
        };

        let mut result = Ok(());
        for range in ranges {
            result = selection.add_range(range, backward);
            if result.is_err() {
                break;
            }
        }

        match result {
            Ok(()) => {
                *self = selection;
                Ok(())
            }
            Err(error) => {
                self.attributes = selection.attributes;
                Err(error)
            }
        }
    }

    pub fn remove_all_ranges(&mut self) {
        self.ranges.clear();
        self.last_range_backward = false;
    }

    /// Replaces every range with a caret at `position`.
    pub fn collapse(&mut self, position: Position) {
        self.ranges = vec![Range::collapsed(position)];
        self.last_range_backward = false;
    }

    pub fn collapse_to_start(&mut self) {
        if let Some(start) = self.first_range().map(|range| range.start().clone()) {
            self.collapse(start);
        }
    }

    pub fn collapse_to_end(&mut self) {
        if let Some(end) = self.last_range().map(|range| range.end().clone()) {
            self.collapse(end);
        }
    }

    /// Moves the focus of the last range, keeping its anchor. The range turns
    /// backward if the focus ends up before the anchor.
    pub fn set_focus(&mut self, position: Position) -> Result<(), ModelError> {
        let Some(anchor) = self.anchor().cloned() else {
            return Err(ModelError::InvalidArgument(
                "cannot set the focus of a selection without ranges".to_owned(),
            ));
        };

        self.ranges.pop();
        let backward = position.is_before(&anchor);
        let range = if backward {
            Range::new(position, anchor)
        } else {
            Range::new(anchor, position)
        };

        self.add_range(range, backward)
    }

    pub fn attributes(&self) -> &Attributes { &self.attributes }

    pub fn get_attribute(&self, key: &str) -> Option<&Value> { self.attributes.get(key) }

    pub fn has_attribute(&self, key: &str) -> bool { self.attributes.contains_key(key) }

    /// Returns whether the value changed.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) -> bool {
        self.attributes.insert(key.into(), value.clone()) != Some(value)
    }

    /// Returns whether the key was present.
    pub fn remove_attribute(&mut self, key: &str) -> bool { self.attributes.remove(key).is_some() }

    /// Returns the keys that were removed.
    pub fn clear_attributes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.attributes).into_keys().collect()
    }
}

/// Overlapping ranges or two carets at the same place. Ranges only touching
/// each other may both be selected.
fn intersects(a: &Range, b: &Range) -> bool {
    if a.root() != b.root() {
        return false;
    }

    a == b || a.is_intersecting(b)
}
