use crate::delta::Delta;

/// Every delta applied to a document, in application order. Versions are
/// contiguous: each delta starts where the previous one ended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    deltas: Vec<Delta>,
}

impl History {
    pub fn deltas(&self) -> &[Delta] { &self.deltas }

    pub fn len(&self) -> usize { self.deltas.len() }

    pub fn is_empty(&self) -> bool { self.deltas.is_empty() }

    pub fn get(&self, index: usize) -> Option<&Delta> { self.deltas.get(index) }

    /// Deltas applied at or after `version`.
    pub fn deltas_since(&self, version: u64) -> &[Delta] {
        let start = self
            .deltas
            .partition_point(|delta| delta.base_version().is_some_and(|base| base < version));

        &self.deltas[start..]
    }

    /// Deltas applied after the one at `index`.
    pub(crate) fn after(&self, index: usize) -> &[Delta] { self.deltas.get(index + 1..).unwrap_or_default() }

    pub(crate) fn push(&mut self, delta: Delta) -> usize {
        self.deltas.push(delta);
        self.deltas.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::operation::Operation;

    fn history() -> History {
        let mut history = History::default();
        history.push(Delta::no_delta(0));
        history.push(Delta::new(
            crate::delta::DeltaKind::NoDelta,
            vec![Operation::no_operation(1), Operation::no_operation(2)],
        ));
        history.push(Delta::no_delta(3));
        history
    }

    #[test_case(0, 3)]
    #[test_case(1, 2)]
    #[test_case(2, 1; "inside a delta")]
    #[test_case(3, 1)]
    #[test_case(4, 0)]
    fn test_deltas_since(version: u64, expected: usize) {
        assert_eq!(history().deltas_since(version).len(), expected);
    }

    #[test]
    fn test_after() {
        let history = history();

        assert_eq!(history.after(0).len(), 2);
        assert_eq!(history.after(2).len(), 0);
    }
}
