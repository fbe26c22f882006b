//! Bindless texture residency table.
//!
//! Materials never hold owning pointers to textures. Instead they keep a
//! [`TextureId`] — a weak, generational identifier — and resolve it through
//! the [`TextureTable`] to the GPU-visible [`TextureHandle`] at encode time.
//! Evicting a texture bumps the slot generation, so stale ids resolve to
//! `None` instead of dangling.

use parking_lot::RwLock;

use crate::layout::TextureHandle;
use crate::material::MaterialTextureSlot;

/// Weak identifier of a resident texture.
///
/// Becomes invalid when the texture is evicted; re-resolution through the
/// table is the only way to obtain a live handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId {
    index: u32,
    generation: u32,
}

struct TableEntry {
    handle: TextureHandle,
    generation: u32,
    live: bool,
    label: String,
}

struct TableInner {
    entries: Vec<TableEntry>,
    free: Vec<u32>,
    // Raw handle values start at 1; 0 is the reserved invalid handle.
    next_handle: u64,
}

/// Lookup table mapping [`TextureId`]s to resident GPU handles.
///
/// Stands in for the texture/asset pipeline's residency set: registration
/// corresponds to upload completion, eviction to residency loss.
pub struct TextureTable {
    inner: RwLock<TableInner>,
}

impl TextureTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(TableInner {
                entries: Vec::new(),
                free: Vec::new(),
                next_handle: 1,
            }),
        }
    }

    /// Register a resident texture and get its id.
    pub fn register(&self, label: impl Into<String>) -> TextureId {
        let label = label.into();
        let mut inner = self.inner.write();

        let handle = TextureHandle::from_raw(inner.next_handle);
        inner.next_handle += 1;

        let id = if let Some(index) = inner.free.pop() {
            let entry = &mut inner.entries[index as usize];
            entry.handle = handle;
            entry.live = true;
            entry.label = label.clone();
            TextureId {
                index,
                generation: entry.generation,
            }
        } else {
            let index = inner.entries.len() as u32;
            inner.entries.push(TableEntry {
                handle,
                generation: 0,
                live: true,
                label: label.clone(),
            });
            TextureId {
                index,
                generation: 0,
            }
        };

        log::trace!("TextureTable: registered '{label}' as {id:?}");
        id
    }

    /// Resolve an id to its resident GPU handle.
    ///
    /// Returns `None` if the texture was evicted (or the id never existed).
    pub fn resolve(&self, id: TextureId) -> Option<TextureHandle> {
        let inner = self.inner.read();
        let entry = inner.entries.get(id.index as usize)?;
        if entry.live && entry.generation == id.generation {
            Some(entry.handle)
        } else {
            None
        }
    }

    /// Evict a texture, invalidating its id.
    ///
    /// Returns `false` if the id was already stale.
    pub fn evict(&self, id: TextureId) -> bool {
        let mut inner = self.inner.write();
        let Some(entry) = inner.entries.get_mut(id.index as usize) else {
            return false;
        };
        if !entry.live || entry.generation != id.generation {
            return false;
        }

        entry.live = false;
        entry.generation += 1;
        log::debug!("TextureTable: evicted '{}' ({id:?})", entry.label);

        inner.free.push(id.index);
        true
    }

    /// Number of resident textures.
    pub fn live_count(&self) -> usize {
        self.inner.read().entries.iter().filter(|e| e.live).count()
    }
}

impl Default for TextureTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextureTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureTable")
            .field("live_count", &self.live_count())
            .finish()
    }
}

/// Default handles substituted for absent material texture slots.
///
/// The defaults are registered once and never evicted, so an encoded
/// argument buffer never carries an invalid handle.
#[derive(Debug, Clone, Copy)]
pub struct DefaultTextures {
    /// 1x1 flat white, the neutral element for factor-multiplied slots.
    pub white: TextureHandle,
    /// 1x1 flat normal (0.5, 0.5, 1.0).
    pub flat_normal: TextureHandle,
}

impl DefaultTextures {
    /// Register the default textures in a table.
    pub fn register(table: &TextureTable) -> Self {
        let white_id = table.register("default_white");
        let normal_id = table.register("default_flat_normal");
        // Just registered, so resolution cannot fail.
        let white = table.resolve(white_id).unwrap_or(TextureHandle::INVALID);
        let flat_normal = table.resolve(normal_id).unwrap_or(TextureHandle::INVALID);
        Self { white, flat_normal }
    }

    /// Default handle for a material texture slot.
    pub fn for_slot(&self, slot: MaterialTextureSlot) -> TextureHandle {
        match slot {
            MaterialTextureSlot::Normal => self.flat_normal,
            _ => self.white,
        }
    }
}

// Ensure the table can be shared across threads
static_assertions::assert_impl_all!(TextureTable: Send, Sync);
