use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use log::{debug, warn};
use serde_json::Value;

use crate::{
    document::{Change, Document, Subscription},
    errors::ModelError,
    live::{Selection, live_range::transformed_by_change},
    model::{Attributes, GRAVEYARD_ROOT_NAME, Item, Model, Node, Position, Range},
    operation::OperationKind,
};

/// Where a selection attribute came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributePriority {
    /// Set or removed through the selection's API.
    Normal,
    /// Taken over from the text around the selection.
    Low,
}

type RangeListener = Box<dyn FnMut(bool)>;
type AttributeListener = Box<dyn FnMut(&[String], bool)>;

struct State {
    selection: Selection,
    default_root: String,
    /// Used whenever no range is set explicitly.
    default_range: Range,
    priorities: BTreeMap<String, AttributePriority>,
    subscription: Option<Subscription>,
    range_listeners: Vec<RangeListener>,
    attribute_listeners: Vec<AttributeListener>,
}

impl State {
    /// The explicit ranges, or the default range when there are none.
    fn effective(&self) -> Selection {
        let mut selection = self.selection.clone();
        if selection.range_count() == 0 {
            selection.collapse(self.default_range.start().clone());
            if !self.default_range.is_collapsed() {
                let _ = selection.set_focus(self.default_range.end().clone());
            }
        }

        selection
    }

    fn first_range(&self) -> Range {
        self.selection
            .first_range()
            .cloned()
            .unwrap_or_else(|| self.default_range.clone())
    }
}

/// The user's selection: ranges following the document like live ranges,
/// plus the attributes text typed at the selection would get.
///
/// There is always at least one range. When none is set, a caret at the first
/// valid position of the default root is used.
#[derive(Clone)]
pub struct LiveSelection {
    state: Rc<RefCell<State>>,
}

impl std::fmt::Debug for LiveSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("LiveSelection")
            .field("selection", &state.effective())
            .field("priorities", &state.priorities)
            .finish_non_exhaustive()
    }
}

impl LiveSelection {
    pub fn new(document: &mut Document) -> Self {
        let default_root = document.model().default_root_name().to_owned();
        let state = Rc::new(RefCell::new(State {
            default_range: default_range(document.model(), &default_root),
            default_root,
            selection: Selection::new(),
            priorities: BTreeMap::new(),
            subscription: None,
            range_listeners: Vec::new(),
            attribute_listeners: Vec::new(),
        }));

        let weak = Rc::downgrade(&state);
        let subscription = document.subscribe(move |change, model| {
            if let Some(state) = weak.upgrade() {
                update(&state, change, model);
            }
        });
        state.borrow_mut().subscription = Some(subscription);

        Self { state }
    }

    /// Plain copy of the current ranges and attributes.
    pub fn selection(&self) -> Selection { self.state.borrow().effective() }

    pub fn ranges(&self) -> Vec<Range> { self.selection().ranges().to_vec() }

    pub fn range_count(&self) -> usize { self.state.borrow().selection.range_count().max(1) }

    /// Whether no range was set and the default range is in use.
    pub fn is_default_range(&self) -> bool { self.state.borrow().selection.range_count() == 0 }

    pub fn first_range(&self) -> Range { self.state.borrow().first_range() }

    pub fn anchor(&self) -> Position {
        let state = self.state.borrow();
        state
            .selection
            .anchor()
            .unwrap_or_else(|| state.default_range.start())
            .clone()
    }

    pub fn focus(&self) -> Position {
        let state = self.state.borrow();
        state
            .selection
            .focus()
            .unwrap_or_else(|| state.default_range.end())
            .clone()
    }

    pub fn is_collapsed(&self) -> bool { self.selection().is_collapsed() }

    pub fn is_backward(&self) -> bool { self.state.borrow().selection.is_backward() }

    pub fn is_attached(&self) -> bool {
        self.state
            .borrow()
            .subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Ranges inside the graveyard are skipped with a warning.
    pub fn set_ranges(
        &mut self,
        model: &Model,
        ranges: impl IntoIterator<Item = Range>,
        backward: bool,
    ) -> Result<(), ModelError> {
        let ranges = ranges.into_iter().filter(outside_graveyard).collect::<Vec<_>>();
        self.change_ranges(model, |selection| selection.set_ranges(ranges, backward))
    }

    pub fn add_range(&mut self, model: &Model, range: Range, backward: bool) -> Result<(), ModelError> {
        if !outside_graveyard(&range) {
            return Ok(());
        }

        self.change_ranges(model, |selection| selection.add_range(range, backward))
    }

    /// Falls back to the default range.
    pub fn remove_all_ranges(&mut self, model: &Model) {
        let _ = self.change_ranges(model, |selection| {
            selection.remove_all_ranges();
            Ok(())
        });
    }

    pub fn collapse(&mut self, model: &Model, position: Position) {
        if !outside_graveyard(&Range::collapsed(position.clone())) {
            return;
        }

        let _ = self.change_ranges(model, |selection| {
            selection.collapse(position);
            Ok(())
        });
    }

    pub fn set_focus(&mut self, model: &Model, position: Position) -> Result<(), ModelError> {
        if self.is_default_range() {
            let anchor = self.anchor();
            self.state.borrow_mut().selection.collapse(anchor);
        }

        self.change_ranges(model, |selection| selection.set_focus(position))
    }

    /// Applies a direct range change, then re-derives every attribute from
    /// scratch.
    fn change_ranges(
        &mut self,
        model: &Model,
        change: impl FnOnce(&mut Selection) -> Result<(), ModelError>,
    ) -> Result<(), ModelError> {
        let changed_keys = {
            let mut state = self.state.borrow_mut();
            change(&mut state.selection)?;
            state.default_range = default_range(model, &state.default_root);
            refresh_attributes(&mut state, model, true)
        };

        emit_range_change(&self.state, true);
        if !changed_keys.is_empty() {
            emit_attribute_change(&self.state, &changed_keys, false);
        }

        Ok(())
    }

    pub fn attributes(&self) -> Attributes { self.state.borrow().selection.attributes().clone() }

    pub fn get_attribute(&self, key: &str) -> Option<Value> {
        self.state.borrow().selection.get_attribute(key).cloned()
    }

    pub fn has_attribute(&self, key: &str) -> bool { self.state.borrow().selection.has_attribute(key) }

    /// Priority of the latest write of `key`, including removals.
    pub fn attribute_priority(&self, key: &str) -> Option<AttributePriority> {
        self.state.borrow().priorities.get(key).copied()
    }

    /// The value sticks until the ranges are changed directly, whatever the
    /// surrounding text has.
    pub fn set_attribute(&mut self, key: &str, value: Value) {
        let changed = {
            let mut state = self.state.borrow_mut();
            state.priorities.insert(key.to_owned(), AttributePriority::Normal);
            state.selection.set_attribute(key, value)
        };

        if changed {
            emit_attribute_change(&self.state, &[key.to_owned()], true);
        }
    }

    /// The attribute is not taken over from the surrounding text again until
    /// the ranges are changed directly.
    pub fn remove_attribute(&mut self, key: &str) {
        let removed = {
            let mut state = self.state.borrow_mut();
            state.priorities.insert(key.to_owned(), AttributePriority::Normal);
            state.selection.remove_attribute(key)
        };

        if removed {
            emit_attribute_change(&self.state, &[key.to_owned()], true);
        }
    }

    pub fn clear_attributes(&mut self) {
        let removed = {
            let mut state = self.state.borrow_mut();
            let removed = state.selection.clear_attributes();
            for key in &removed {
                state.priorities.insert(key.clone(), AttributePriority::Normal);
            }
            removed
        };

        if !removed.is_empty() {
            emit_attribute_change(&self.state, &removed, true);
        }
    }

    /// Called with whether the change came through the selection's API
    /// (`true`) or from the document changing under it.
    pub fn on_range_change(&self, listener: impl FnMut(bool) + 'static) {
        self.state.borrow_mut().range_listeners.push(Box::new(listener));
    }

    /// Called with the changed keys and whether they were set through the
    /// selection's API.
    pub fn on_attribute_change(&self, listener: impl FnMut(&[String], bool) + 'static) {
        self.state.borrow_mut().attribute_listeners.push(Box::new(listener));
    }

    /// Stops following the document and drops every listener.
    pub fn destroy(&mut self, document: &mut Document) {
        let mut state = self.state.borrow_mut();
        if let Some(subscription) = state.subscription.take() {
            document.unsubscribe(&subscription);
        }
        state.range_listeners.clear();
        state.attribute_listeners.clear();
    }
}

fn outside_graveyard(range: &Range) -> bool {
    if range.root() == GRAVEYARD_ROOT_NAME {
        warn!("Refusing to select {range} inside the graveyard");
        return false;
    }

    true
}

fn default_range(model: &Model, root: &str) -> Range {
    Range::collapsed(
        model
            .first_caret_position(root)
            .unwrap_or_else(|| Position::new(root, vec![0])),
    )
}

fn update(state: &RefCell<State>, change: &Change, model: &Model) {
    let (ranges_changed, changed_keys) = {
        let mut state = state.borrow_mut();
        let old_ranges = state.selection.ranges().to_vec();
        let old_default = state.default_range.clone();
        let backward = state.selection.is_backward();

        state.selection.remove_all_ranges();
        for range in &old_ranges {
            let mut transformed = transformed_by_change(range, change);
            if transformed.root() == GRAVEYARD_ROOT_NAME {
                let Some(recovered) = recovered(model, change, range) else {
                    debug!("Dropping selection range {range}, no caret position is left");
                    continue;
                };
                transformed = recovered;
            }

            // Ranges that got merged into another one are dropped.
            if let Err(error) = state.selection.add_range(transformed, backward) {
                debug!("Dropping selection range: {error}");
            }
        }

        let default_root = state.default_root.clone();
        state.default_range = default_range(model, &default_root);

        let ranges_changed = if old_ranges.is_empty() {
            state.default_range != old_default
        } else {
            state.selection.ranges() != old_ranges.as_slice()
        };

        (ranges_changed, refresh_attributes(&mut state, model, false))
    };

    if ranges_changed {
        emit_range_change(state, false);
    }
    if !changed_keys.is_empty() {
        emit_attribute_change(state, &changed_keys, false);
    }
}

/// Caret replacing a range whose content went to the graveyard: the nearest
/// caret position to where the content was taken from, else the start of the
/// range's root.
fn recovered(model: &Model, change: &Change, range: &Range) -> Option<Range> {
    let source = match &change.operation.kind {
        OperationKind::Move(span) | OperationKind::Remove(span) | OperationKind::Reinsert(span) => {
            model.nearest_caret_position(&span.source_position)
        }
        _ => None,
    };

    source
        .or_else(|| model.first_caret_position(range.root()))
        .map(Range::collapsed)
}

/// Attributes of the text before a caret (else after it), or of the first
/// text inside a non-collapsed range.
fn surrounding_attributes(model: &Model, range: &Range) -> Attributes {
    let text = if range.is_collapsed() {
        [model.node_before(range.start()), model.node_after(range.start())]
            .into_iter()
            .flatten()
            .find_map(Node::as_text)
            .map(|text| text.attributes.clone())
    } else {
        range.items(model).find_map(|value| match value.item {
            Item::Text(proxy) => Some(proxy.attributes().clone()),
            Item::Element(_) => None,
        })
    };

    text.unwrap_or_default()
}

/// Takes the attributes over from the surrounding text with low priority.
/// Attributes written through the API are kept unless `clear_all` is set.
/// Returns the keys whose value changed.
fn refresh_attributes(state: &mut State, model: &Model, clear_all: bool) -> Vec<String> {
    let before = state.selection.attributes().clone();
    let derived = surrounding_attributes(model, &state.first_range());

    if clear_all {
        state.selection.clear_attributes();
        state.priorities.clear();
    }

    let stale = state
        .priorities
        .iter()
        .filter(|(key, priority)| **priority == AttributePriority::Low && !derived.contains_key(*key))
        .map(|(key, _)| key.clone())
        .collect::<Vec<_>>();
    for key in stale {
        state.priorities.remove(&key);
        state.selection.remove_attribute(&key);
    }

    for (key, value) in derived {
        if state.priorities.get(&key) == Some(&AttributePriority::Normal) {
            continue;
        }

        state.priorities.insert(key.clone(), AttributePriority::Low);
        state.selection.set_attribute(key, value);
    }

    let after = state.selection.attributes();
    let mut changed = before
        .keys()
        .chain(after.keys())
        .filter(|key| before.get(*key) != after.get(*key))
        .cloned()
        .collect::<Vec<_>>();
    changed.sort();
    changed.dedup();

    changed
}

fn emit_range_change(state: &RefCell<State>, direct: bool) {
    let mut listeners = std::mem::take(&mut state.borrow_mut().range_listeners);
    for listener in &mut listeners {
        listener(direct);
    }

    let mut state = state.borrow_mut();
    listeners.append(&mut state.range_listeners);
    state.range_listeners = listeners;
}

fn emit_attribute_change(state: &RefCell<State>, keys: &[String], direct: bool) {
    let mut listeners = std::mem::take(&mut state.borrow_mut().attribute_listeners);
    for listener in &mut listeners {
        listener(keys, direct);
    }

    let mut state = state.borrow_mut();
    listeners.append(&mut state.attribute_listeners);
    state.attribute_listeners = listeners;
}
