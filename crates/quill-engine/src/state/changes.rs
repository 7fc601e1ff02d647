use std::fmt;
use std::marker::PhantomData;

use super::slot::{Pushed, StateSlot};

/// A command category with a fixed bit in a [`ChangeMask`].
pub trait StateKind: Copy + Eq + fmt::Debug {
    /// Bits of categories that describe geometry (buffer updates, draws)
    /// rather than pipeline state.
    const GEOMETRY_BITS: u64;

    /// Bit position, `0..64`.
    fn bit(self) -> u32;
}

/// 64-bit set of categories whose current value differs from the last
/// committed one.
pub struct ChangeMask<K> {
    bits: u64,
    _kind: PhantomData<K>,
}

impl<K> Clone for ChangeMask<K> {
    fn clone(&self) -> Self {
        Self { bits: self.bits, _kind: PhantomData }
    }
}

impl<K> Default for ChangeMask<K> {
    fn default() -> Self {
        Self { bits: 0, _kind: PhantomData }
    }
}

impl<K> fmt::Debug for ChangeMask<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangeMask({:#018x})", self.bits)
    }
}

impl<K: StateKind> ChangeMask<K> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn has(&self, kind: K) -> bool {
        self.bits & (1u64 << kind.bit()) != 0
    }

    #[inline]
    pub fn set(&mut self, kind: K) {
        debug_assert!(kind.bit() < 64, "{kind:?} has an out-of-range bit");
        self.bits |= 1u64 << kind.bit();
    }

    #[inline]
    pub fn clear(&mut self, kind: K) {
        self.bits &= !(1u64 << kind.bit());
    }

    #[inline]
    pub fn clear_all(&mut self) {
        self.bits = 0;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    #[inline]
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// True if any pipeline-state category is pending.
    #[inline]
    pub fn has_state_change(&self) -> bool {
        self.bits & !K::GEOMETRY_BITS != 0
    }

    /// Pushes `value` into `slot`, keeping the category bit in sync.
    pub fn push<T: Clone + PartialEq>(&mut self, kind: K, slot: &mut StateSlot<T>, value: T) -> Pushed {
        let pushed = slot.push(value, self.has(kind));
        match pushed {
            Pushed::Pending => self.set(kind),
            Pushed::Reverted => self.clear(kind),
            Pushed::Unchanged => {}
        }
        pushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum Kind {
        Draw,
        Blend,
        Texture(u8),
    }

    impl StateKind for Kind {
        const GEOMETRY_BITS: u64 = 0b1;

        fn bit(self) -> u32 {
            match self {
                Kind::Draw => 0,
                Kind::Blend => 1,
                Kind::Texture(s) => 2 + s as u32,
            }
        }
    }

    #[test]
    fn geometry_bits_are_not_state_changes() {
        let mut m = ChangeMask::<Kind>::new();
        m.set(Kind::Draw);
        assert!(!m.has_state_change());
        m.set(Kind::Texture(3));
        assert!(m.has_state_change());
        assert!(m.has(Kind::Texture(3)));
        assert!(!m.has(Kind::Texture(2)));
    }

    #[test]
    fn push_tracks_bit_with_slot() {
        let mut m = ChangeMask::<Kind>::new();
        let mut blend = StateSlot::new(0u8);

        assert_eq!(m.push(Kind::Blend, &mut blend, 0), Pushed::Unchanged);
        assert!(m.is_empty());

        assert_eq!(m.push(Kind::Blend, &mut blend, 7), Pushed::Pending);
        assert!(m.has(Kind::Blend));

        assert_eq!(m.push(Kind::Blend, &mut blend, 0), Pushed::Reverted);
        assert!(!m.has(Kind::Blend));
    }

    #[test]
    fn bit_set_iff_current_differs_from_committed() {
        let mut m = ChangeMask::<Kind>::new();
        let mut blend = StateSlot::new(0u8);
        for v in [3, 3, 0, 5, 6, 0, 0, 9] {
            m.push(Kind::Blend, &mut blend, v);
            assert_eq!(m.has(Kind::Blend), blend.current() != blend.last_committed());
        }
    }

    #[test]
    fn clear_all_resets() {
        let mut m = ChangeMask::<Kind>::new();
        m.set(Kind::Blend);
        m.set(Kind::Draw);
        m.clear_all();
        assert_eq!(m.bits(), 0);
    }
}
