/// Outcome of pushing a value into a [`StateSlot`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Pushed {
    /// The value equals what is already in effect; nothing changed.
    Unchanged,
    /// The value is pending and must be committed at the next flush.
    Pending,
    /// The value returned to the last committed one; the pending change
    /// was dropped without being committed.
    Reverted,
}

/// Versioned value cell.
///
/// Holds the value most recently requested (`current`) and the append-only
/// history of values committed to the command stream during this frame.
/// History index 0 is the value in effect when the frame started.
#[derive(Debug, Clone)]
pub struct StateSlot<T> {
    current: T,
    committed: Vec<T>,
}

impl<T: Clone + PartialEq> StateSlot<T> {
    pub fn new(initial: T) -> Self {
        Self {
            committed: vec![initial.clone()],
            current: initial,
        }
    }

    #[inline]
    pub fn current(&self) -> &T {
        &self.current
    }

    /// The value the backend will have bound once every emitted entry is replayed.
    #[inline]
    pub fn last_committed(&self) -> &T {
        // `committed` is never empty: construction and `restart` both seed it.
        &self.committed[self.committed.len() - 1]
    }

    /// History entry addressed by a command-stream index.
    #[inline]
    pub fn committed(&self, index: u32) -> &T {
        &self.committed[index as usize]
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<&T> {
        self.committed.get(index as usize)
    }

    #[inline]
    pub fn history(&self) -> &[T] {
        &self.committed
    }

    /// Records `value` as the requested state.
    ///
    /// `dirty` is the category's change bit. While it is clear, `current`
    /// equals the last committed value; while it is set, a pending value may
    /// collapse back to the committed one.
    pub fn push(&mut self, value: T, dirty: bool) -> Pushed {
        if !dirty {
            if value == self.current {
                return Pushed::Unchanged;
            }
            self.current = value;
            Pushed::Pending
        } else if value == *self.last_committed() {
            self.current = value;
            Pushed::Reverted
        } else {
            self.current = value;
            Pushed::Pending
        }
    }

    /// Appends `current` to the history and returns its index.
    pub fn commit(&mut self) -> u32 {
        self.committed.push(self.current.clone());
        (self.committed.len() - 1) as u32
    }

    /// Starts a new frame: the history becomes `[current]`.
    pub fn restart(&mut self) {
        self.committed.clear();
        self.committed.push(self.current.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── push ──────────────────────────────────────────────────────────────

    #[test]
    fn push_same_value_is_unchanged() {
        let mut s = StateSlot::new(1);
        assert_eq!(s.push(1, false), Pushed::Unchanged);
        assert_eq!(s.history(), &[1]);
    }

    #[test]
    fn push_new_value_is_pending() {
        let mut s = StateSlot::new(1);
        assert_eq!(s.push(2, false), Pushed::Pending);
        assert_eq!(*s.current(), 2);
        assert_eq!(*s.last_committed(), 1);
    }

    #[test]
    fn push_back_to_committed_reverts() {
        let mut s = StateSlot::new(1);
        s.push(2, false);
        assert_eq!(s.push(1, true), Pushed::Reverted);
        assert_eq!(*s.current(), 1);
    }

    #[test]
    fn push_while_dirty_replaces_pending() {
        let mut s = StateSlot::new(1);
        s.push(2, false);
        assert_eq!(s.push(3, true), Pushed::Pending);
        assert_eq!(*s.current(), 3);
    }

    // ── commit / restart ──────────────────────────────────────────────────

    #[test]
    fn commit_appends_and_returns_index() {
        let mut s = StateSlot::new(1);
        s.push(2, false);
        assert_eq!(s.commit(), 1);
        assert_eq!(*s.committed(1), 2);
        assert_eq!(s.get(2), None);
    }

    #[test]
    fn restart_keeps_only_current() {
        let mut s = StateSlot::new(1);
        s.push(2, false);
        s.commit();
        s.push(5, false);
        s.restart();
        assert_eq!(s.history(), &[5]);
        assert_eq!(*s.last_committed(), 5);
    }
}
