use std::{cell::RefCell, rc::Rc};

use log::trace;

use crate::{
    document::{Change, Document, Subscription},
    model::Range,
};

type RangeListener = Box<dyn FnMut(&Range, &Range)>;

struct State {
    range: Range,
    subscription: Option<Subscription>,
    listeners: Vec<RangeListener>,
}

impl State {
    fn is_attached(&self) -> bool { self.subscription.as_ref().is_some_and(Subscription::is_active) }
}

/// A range that follows the content it was created on while the document
/// changes. Clones share the same state.
///
/// The document only keeps a weak reference to the range, but the
/// subscription itself lives until `detach` is called or the document is
/// destroyed.
#[derive(Clone)]
pub struct LiveRange {
    state: Rc<RefCell<State>>,
}

impl std::fmt::Debug for LiveRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("LiveRange")
            .field("range", &state.range)
            .field("attached", &state.is_attached())
            .finish_non_exhaustive()
    }
}

impl LiveRange {
    pub fn new(document: &mut Document, range: Range) -> Self {
        let state = Rc::new(RefCell::new(State {
            range,
            subscription: None,
            listeners: Vec::new(),
        }));

        let weak = Rc::downgrade(&state);
        let subscription = document.subscribe(move |change, _| {
            if let Some(state) = weak.upgrade() {
                update(&state, change);
            }
        });
        state.borrow_mut().subscription = Some(subscription);

        Self { state }
    }

    pub fn range(&self) -> Range { self.state.borrow().range.clone() }

    pub fn is_attached(&self) -> bool { self.state.borrow().is_attached() }

    /// Called with the range before and after every change that moved it.
    pub fn on_change(&self, listener: impl FnMut(&Range, &Range) + 'static) {
        self.state.borrow_mut().listeners.push(Box::new(listener));
    }

    /// Stops following the document. The range keeps its last value.
    pub fn detach(&self, document: &mut Document) {
        if let Some(subscription) = self.state.borrow_mut().subscription.take() {
            document.unsubscribe(&subscription);
        }
    }
}

/// `range` moved along with the applied operation. Pieces the operation tore
/// apart are joined back starting from the first one.
pub(crate) fn transformed_by_change(range: &Range, change: &Change) -> Range {
    let pieces = range.get_transformed_by_operation(&change.operation, Some(change.delta_kind));
    Range::create_from_ranges(&pieces).unwrap_or_else(|_| range.clone())
}

fn update(state: &RefCell<State>, change: &Change) {
    let (old, new) = {
        let mut state = state.borrow_mut();
        let new = transformed_by_change(&state.range, change);
        if new == state.range {
            return;
        }

        (std::mem::replace(&mut state.range, new.clone()), new)
    };

    trace!("Live range moved from {old} to {new} by {}", change.kind());

    // Listeners may read the range, so the state is not borrowed while they run.
    let mut listeners = std::mem::take(&mut state.borrow_mut().listeners);
    for listener in &mut listeners {
        listener(&old, &new);
    }

    let mut state = state.borrow_mut();
    listeners.append(&mut state.listeners);
    state.listeners = listeners;
}
