mod batch;
mod change;
mod history;

use std::ops::Range as IndexRange;

pub use batch::Batch;
pub use change::{Change, Subscription};
pub use history::History;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::{
    config::DocumentConfig,
    delta::{Delta, transform_deltas},
    errors::ModelError,
    model::{GRAVEYARD_ROOT_NAME, Model},
    operation::Operation,
};

type Listener = Box<dyn FnMut(&Change, &Model)>;

/// The single source of truth of an editing session: the tree, its version
/// and the history of applied deltas.
///
/// The tree only changes through `apply_operation` and `apply_delta`. After
/// each applied operation every subscriber is called, in subscription order,
/// with the change and the updated tree.
pub struct Document {
    config: DocumentConfig,
    model: Model,
    version: u64,
    history: History,
    listeners: Vec<(Subscription, Listener)>,
    next_subscription: u64,
    /// History indices of the deltas each undo step reverts, newest last.
    undo_stack: Vec<IndexRange<usize>>,
    redo_stack: Vec<IndexRange<usize>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("version", &self.version)
            .field("model", &self.model)
            .field("history", &self.history.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u64,
    model: Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Undo,
    Redo,
}

impl Default for Document {
    fn default() -> Self { Self::new(DocumentConfig::default()) }
}

impl Drop for Document {
    fn drop(&mut self) { self.drop_listeners(); }
}

impl Document {
    pub fn new(config: DocumentConfig) -> Self {
        let model = Model::new(
            config.default_root_name.clone(),
            config.default_root_element.clone(),
        );

        Self::from_parts(config, model, 0)
    }

    fn from_parts(config: DocumentConfig, model: Model, version: u64) -> Self {
        Self {
            config,
            model,
            version,
            history: History::default(),
            listeners: Vec::new(),
            next_subscription: 0,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn config(&self) -> &DocumentConfig { &self.config }

    pub fn model(&self) -> &Model { &self.model }

    pub fn version(&self) -> u64 { self.version }

    pub fn history(&self) -> &History { &self.history }

    pub fn create_root(
        &mut self,
        name: impl Into<String>,
        element_name: impl Into<String>,
    ) -> Result<(), ModelError> {
        self.model.create_root(name, element_name)
    }

    /// Entry point for editing commands: builds deltas against the current
    /// version and applies them right away.
    pub fn batch(&mut self) -> Batch<'_> { Batch::new(self) }

    pub fn apply_operation(&mut self, operation: Operation) -> Result<(), ModelError> {
        self.apply_delta(Delta::from_operation(operation))
    }

    /// Applies every operation of the delta or none of them.
    pub fn apply_delta(&mut self, delta: Delta) -> Result<(), ModelError> { self.apply_deltas(vec![delta]) }

    /// Applies the deltas one after the other, all of them or none. They are
    /// undone together.
    pub fn apply_deltas(&mut self, deltas: Vec<Delta>) -> Result<(), ModelError> {
        let step = self.commit(deltas)?;
        self.redo_stack.clear();
        self.push_undo(step);

        Ok(())
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Change, &Model) + 'static) -> Subscription {
        let subscription = Subscription::new(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((subscription.clone(), Box::new(listener)));

        subscription
    }

    /// Returns whether the subscription was still active.
    pub fn unsubscribe(&mut self, subscription: &Subscription) -> bool {
        let Some(index) = self.listeners.iter().position(|(existing, _)| existing == subscription) else {
            return false;
        };

        let (removed, _) = self.listeners.remove(index);
        removed.deactivate();
        true
    }

    pub fn can_undo(&self) -> bool { !self.undo_stack.is_empty() }

    pub fn can_redo(&self) -> bool { !self.redo_stack.is_empty() }

    /// Reverts the latest delta that was not undone yet, transformed over
    /// everything applied after it. Returns `false` if there was nothing to
    /// undo.
    pub fn undo(&mut self) -> Result<bool, ModelError> {
        let Some(step) = self.undo_stack.pop() else {
            return Ok(false);
        };

        debug!("Undoing history entries {step:?}");
        if let Err(error) = self.revert(step.clone(), Origin::Undo) {
            self.undo_stack.push(step);
            return Err(error);
        }

        Ok(true)
    }

    /// Reverts the latest undo. Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> Result<bool, ModelError> {
        let Some(step) = self.redo_stack.pop() else {
            return Ok(false);
        };

        debug!("Redoing history entries {step:?}");
        if let Err(error) = self.revert(step.clone(), Origin::Redo) {
            self.redo_stack.push(step);
            return Err(error);
        }

        Ok(true)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string(&Snapshot {
            version: self.version,
            model: self.model.clone(),
        })?)
    }

    /// Restores a snapshot written by `to_json`. History starts out empty.
    pub fn from_json(json: &str, config: DocumentConfig) -> Result<Self, ModelError> {
        let Snapshot { version, model } = serde_json::from_str(json)?;
        if !model.has_root(GRAVEYARD_ROOT_NAME) || !model.has_root(model.default_root_name()) {
            return Err(ModelError::InvalidArgument(
                "snapshot is missing the graveyard or the default root".to_owned(),
            ));
        }

        Ok(Self::from_parts(config, model, version))
    }

    /// Drops every subscription, detaching all live ranges and selections.
    pub fn destroy(&mut self) {
        debug!("Destroying document, dropping {} listener(s)", self.listeners.len());
        self.drop_listeners();
    }

    fn drop_listeners(&mut self) {
        for (subscription, _) in self.listeners.drain(..) {
            subscription.deactivate();
        }
    }

    /// Nothing is applied unless the whole step can be reverted.
    fn revert(&mut self, step: IndexRange<usize>, origin: Origin) -> Result<(), ModelError> {
        let mut reverting: Vec<Delta> = Vec::new();

        for index in step.rev() {
            let Some(delta) = self.history.get(index) else {
                return Err(ModelError::LostInvariant(format!(
                    "history entry {index} is missing"
                )));
            };

            // Transformed over everything after it, including what this step
            // reverts before it.
            let later = self
                .history
                .after(index)
                .iter()
                .chain(&reverting)
                .cloned()
                .collect::<Vec<_>>();
            let (transformed, _) = transform_deltas(&[delta.reversed()], &later, true);
            reverting.extend(transformed);
        }

        let reverted = self.commit(reverting)?;
        match origin {
            Origin::Undo => self.redo_stack.push(reverted),
            Origin::Redo => self.push_undo(reverted),
        }

        Ok(())
    }

    /// Applies the deltas one after the other and returns the history
    /// indices they got. Fails without touching anything if any of them
    /// would fail.
    fn commit(&mut self, deltas: Vec<Delta>) -> Result<IndexRange<usize>, ModelError> {
        self.check(&deltas)?;

        let first = self.history.len();
        for delta in deltas {
            self.execute(&delta)?;
            self.history.push(delta);
        }

        Ok(first..self.history.len())
    }

    fn push_undo(&mut self, step: IndexRange<usize>) {
        if step.is_empty() || self.config.undo_depth == 0 {
            return;
        }

        self.undo_stack.push(step);
        if self.undo_stack.len() > self.config.undo_depth {
            self.undo_stack.remove(0);
        }
    }

    /// Validates the deltas against the current version and, on a scratch
    /// copy, against the tree.
    fn check(&self, deltas: &[Delta]) -> Result<(), ModelError> {
        let mut scratch = self.model.clone();
        let mut version = self.version;

        for delta in deltas {
            if delta.operations().is_empty() {
                return Err(ModelError::InvalidArgument("empty delta".to_owned()));
            }

            for operation in delta.operations() {
                if operation.base_version != version {
                    return Err(ModelError::VersionMismatch {
                        document_version: version,
                        operation_version: operation.base_version,
                    });
                }

                operation.apply(&mut scratch)?;
                version += 1;
            }
        }

        Ok(())
    }

    fn execute(&mut self, delta: &Delta) -> Result<(), ModelError> {
        for operation in delta.operations() {
            operation.apply(&mut self.model).map_err(|error| {
                ModelError::LostInvariant(format!(
                    "{} failed after validation: {error}",
                    operation.type_name()
                ))
            })?;
            self.version += 1;

            if operation.is_no_operation() {
                continue;
            }

            self.notify(&Change {
                operation: operation.clone(),
                delta_kind: delta.kind(),
                version: self.version,
            });
        }

        debug!(
            "Applied {} delta, document is at version {}",
            delta.kind(),
            self.version
        );
        Ok(())
    }

    fn notify(&mut self, change: &Change) {
        trace!(
            "Notifying {} listener(s) of {} at version {}",
            self.listeners.len(),
            change.kind(),
            change.version
        );

        for (_, listener) in &mut self.listeners {
            listener(change, &self.model);
        }
    }
}
