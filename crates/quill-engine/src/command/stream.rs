use crate::state::{ChangeMask, StateKind, StateSlot};

/// One compiled entry: a category and an index into that category's storage
/// (a history entry, a draw, a constant-buffer command or a batch).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Command<K> {
    pub kind: K,
    pub index: u32,
}

/// Ordered output of one frame.
#[derive(Debug, Clone)]
pub struct CommandStream<K> {
    commands: Vec<Command<K>>,
}

impl<K> Default for CommandStream<K> {
    fn default() -> Self {
        Self { commands: Vec::new() }
    }
}

impl<K: StateKind> CommandStream<K> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, kind: K, index: u32) {
        self.commands.push(Command { kind, index });
    }

    /// Commits `slot` and records the binding if `kind` is dirty in `mask`.
    pub fn commit_if_dirty<T: Clone + PartialEq>(
        &mut self,
        mask: &ChangeMask<K>,
        kind: K,
        slot: &mut StateSlot<T>,
    ) {
        if mask.has(kind) {
            let index = slot.commit();
            self.push(kind, index);
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[Command<K>] {
        &self.commands
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Command<K>> {
        self.commands.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&Command<K>> {
        self.commands.last()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of entries of `kind`.
    pub fn count(&self, kind: K) -> usize {
        self.commands.iter().filter(|c| c.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum Kind {
        Draw,
        Blend,
    }

    impl StateKind for Kind {
        const GEOMETRY_BITS: u64 = 0b1;

        fn bit(self) -> u32 {
            self as u32
        }
    }

    #[test]
    fn commit_if_dirty_skips_clean_slots() {
        let mut stream = CommandStream::new();
        let mut mask = ChangeMask::new();
        let mut blend = StateSlot::new(0u8);

        stream.commit_if_dirty(&mask, Kind::Blend, &mut blend);
        assert!(stream.is_empty());

        mask.push(Kind::Blend, &mut blend, 4);
        stream.commit_if_dirty(&mask, Kind::Blend, &mut blend);
        assert_eq!(stream.as_slice(), &[Command { kind: Kind::Blend, index: 1 }]);
        assert_eq!(*blend.committed(1), 4);
    }

    #[test]
    fn count_filters_by_kind() {
        let mut stream = CommandStream::new();
        stream.push(Kind::Draw, 0);
        stream.push(Kind::Blend, 1);
        stream.push(Kind::Draw, 1);
        assert_eq!(stream.count(Kind::Draw), 2);
        stream.clear();
        assert!(stream.last().is_none());
    }
}
