//! Resource ids and the reference-counted handles that own them.
//!
//! Compilers compare resources by id only. When an id becomes a pending
//! binding, its handle is stored in a per-frame reservation map so the
//! resource outlives every command that refers to it.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use hashbrown::HashMap;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Id of "nothing bound".
            pub const INVALID: Self = Self(u32::MAX);

            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }
    };
}

define_id!(
    /// Texture id (2D texture or the color view of a render texture).
    TextureId
);
define_id!(VertexShaderId);
define_id!(PixelShaderId);
define_id!(MeshId);
define_id!(
    /// Render target id; `INVALID` selects the backend's default target.
    RenderTargetId
);

/// Shared owner of a GPU resource, addressed by id.
///
/// The resource manager holds one handle per live resource and frees it once
/// it is the last owner.
pub struct Handle<I> {
    id: Arc<I>,
}

impl<I: Copy> Handle<I> {
    pub fn new(id: I) -> Self {
        Self { id: Arc::new(id) }
    }

    #[inline]
    pub fn id(&self) -> I {
        *self.id
    }

    /// Number of live owners, including this one.
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.id)
    }
}

impl<I> Clone for Handle<I> {
    fn clone(&self) -> Self {
        Self { id: Arc::clone(&self.id) }
    }
}

impl<I: fmt::Debug> fmt::Debug for Handle<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&*self.id).finish()
    }
}

pub type Texture = Handle<TextureId>;
pub type VertexShader = Handle<VertexShaderId>;
pub type PixelShader = Handle<PixelShaderId>;
pub type Mesh = Handle<MeshId>;
pub type RenderTexture = Handle<RenderTargetId>;

/// Handles kept alive for the current frame, keyed by id.
#[derive(Debug)]
pub struct Reservations<I> {
    held: HashMap<I, Handle<I>>,
}

impl<I> Default for Reservations<I> {
    fn default() -> Self {
        Self { held: HashMap::new() }
    }
}

impl<I: Copy + Eq + Hash> Reservations<I> {
    /// Stores a clone of `handle` unless its id is already held.
    pub fn reserve(&mut self, handle: &Handle<I>) {
        self.held.entry(handle.id()).or_insert_with(|| handle.clone());
    }

    #[inline]
    pub fn contains(&self, id: I) -> bool {
        self.held.contains_key(&id)
    }

    /// Drops every handle whose id fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(I) -> bool) {
        self.held.retain(|id, _| keep(*id));
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.held.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_id_is_invalid() {
        assert_eq!(TextureId::default(), TextureId::INVALID);
        assert!(!TextureId::default().is_valid());
        assert!(TextureId::new(3).is_valid());
    }

    #[test]
    fn reserve_holds_one_clone_per_id() {
        let tex = Texture::new(TextureId::new(1));
        let mut r = Reservations::default();
        r.reserve(&tex);
        r.reserve(&tex);
        assert_eq!(r.len(), 1);
        assert_eq!(tex.ref_count(), 2);
    }

    #[test]
    fn retain_releases_handles() {
        let a = Texture::new(TextureId::new(1));
        let b = Texture::new(TextureId::new(2));
        let mut r = Reservations::default();
        r.reserve(&a);
        r.reserve(&b);
        r.retain(|id| id == TextureId::new(2));
        assert!(!r.contains(TextureId::new(1)));
        assert_eq!(a.ref_count(), 1);
        assert_eq!(b.ref_count(), 2);
        r.clear();
        assert_eq!(b.ref_count(), 1);
    }
}
