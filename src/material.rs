//! Material argument-buffer encoding.
//!
//! The [`MaterialEncoder`] packs factor values and resolved bindless
//! handles into [`MaterialArguments`] records, deduplicated by content
//! identity. Encoding happens off the per-draw hot path (typically during
//! asset load), so the cache uses a plain rebuild-then-swap discipline
//! under an `RwLock`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytemuck::Zeroable;
use parking_lot::RwLock;

use crate::error::{BindingError, BindingResult};
use crate::layout::{MaterialArguments, MaterialFactors, TextureHandle};
use crate::texture::{DefaultTextures, TextureId, TextureTable};

/// Texture slots of a material, in argument-buffer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialTextureSlot {
    /// Base color (albedo).
    BaseColor,
    /// Roughness.
    Roughness,
    /// Metalness.
    Metalness,
    /// Tangent-space normal map.
    Normal,
    /// Ambient occlusion.
    Occlusion,
    /// Opacity mask.
    Opacity,
    /// Emissive color.
    Emissive,
}

impl MaterialTextureSlot {
    /// All slots, in argument-buffer order.
    pub const ALL: [Self; 7] = [
        Self::BaseColor,
        Self::Roughness,
        Self::Metalness,
        Self::Normal,
        Self::Occlusion,
        Self::Opacity,
        Self::Emissive,
    ];
}

/// The texture ids a material references, one optional id per slot.
///
/// "No texture bound" is a valid, explicit state: absent slots encode the
/// configured default handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MaterialTextures {
    /// Base color texture.
    pub base_color: Option<TextureId>,
    /// Roughness texture.
    pub roughness: Option<TextureId>,
    /// Metalness texture.
    pub metalness: Option<TextureId>,
    /// Normal map texture.
    pub normal: Option<TextureId>,
    /// Occlusion texture.
    pub occlusion: Option<TextureId>,
    /// Opacity texture.
    pub opacity: Option<TextureId>,
    /// Emissive texture.
    pub emissive: Option<TextureId>,
}

impl MaterialTextures {
    /// Create an empty set (every slot absent).
    pub fn none() -> Self {
        Self::default()
    }

    /// Get the id bound to a slot.
    pub fn get(&self, slot: MaterialTextureSlot) -> Option<TextureId> {
        match slot {
            MaterialTextureSlot::BaseColor => self.base_color,
            MaterialTextureSlot::Roughness => self.roughness,
            MaterialTextureSlot::Metalness => self.metalness,
            MaterialTextureSlot::Normal => self.normal,
            MaterialTextureSlot::Occlusion => self.occlusion,
            MaterialTextureSlot::Opacity => self.opacity,
            MaterialTextureSlot::Emissive => self.emissive,
        }
    }

    /// Set the base color texture.
    pub fn with_base_color(mut self, id: TextureId) -> Self {
        self.base_color = Some(id);
        self
    }

    /// Set the roughness texture.
    pub fn with_roughness(mut self, id: TextureId) -> Self {
        self.roughness = Some(id);
        self
    }

    /// Set the metalness texture.
    pub fn with_metalness(mut self, id: TextureId) -> Self {
        self.metalness = Some(id);
        self
    }

    /// Set the normal map texture.
    pub fn with_normal(mut self, id: TextureId) -> Self {
        self.normal = Some(id);
        self
    }

    /// Set the occlusion texture.
    pub fn with_occlusion(mut self, id: TextureId) -> Self {
        self.occlusion = Some(id);
        self
    }

    /// Set the opacity texture.
    pub fn with_opacity(mut self, id: TextureId) -> Self {
        self.opacity = Some(id);
        self
    }

    /// Set the emissive texture.
    pub fn with_emissive(mut self, id: TextureId) -> Self {
        self.emissive = Some(id);
        self
    }
}

/// Stable identity of an encoded argument buffer.
///
/// Two encodes of the same (factors, textures) tuple yield the same id;
/// changing any input yields a distinct one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgumentBufferId(u64);

impl ArgumentBufferId {
    /// Get the raw identity value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// A material encoded into device-resolvable form.
#[derive(Debug, Clone)]
pub struct EncodedMaterial {
    id: ArgumentBufferId,
    arguments: MaterialArguments,
    referenced: Vec<TextureId>,
}

impl EncodedMaterial {
    /// Identity of the backing argument buffer.
    pub fn id(&self) -> ArgumentBufferId {
        self.id
    }

    /// The packed argument-buffer record.
    pub fn arguments(&self) -> &MaterialArguments {
        &self.arguments
    }

    /// The argument buffer as bytes, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.arguments)
    }

    /// Texture ids this material keeps resident.
    ///
    /// Default-substituted slots are not listed; only live back-references
    /// into the texture table appear here.
    pub fn referenced_textures(&self) -> &[TextureId] {
        &self.referenced
    }
}

/// Cache key: factor bit patterns plus the texture ids per slot.
///
/// Factors are compared by bit pattern, not float equality, so NaN payloads
/// and signed zeros dedup consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MaterialKey {
    factors: [u32; 12],
    textures: [Option<TextureId>; 7],
}

impl MaterialKey {
    fn new(factors: &MaterialFactors, textures: &MaterialTextures) -> Self {
        let mut slots = [None; 7];
        for (dst, slot) in slots.iter_mut().zip(MaterialTextureSlot::ALL) {
            *dst = textures.get(slot);
        }
        Self {
            factors: bytemuck::cast(*factors),
            textures: slots,
        }
    }
}

/// Encodes materials into deduplicated argument buffers.
pub struct MaterialEncoder {
    table: Arc<TextureTable>,
    defaults: DefaultTextures,
    required: Vec<MaterialTextureSlot>,
    cache: RwLock<HashMap<MaterialKey, EncodedMaterial>>,
    next_id: AtomicU64,
}

impl MaterialEncoder {
    /// Create an encoder resolving textures through the given table.
    ///
    /// Registers the default substitution textures in the table.
    pub fn new(table: Arc<TextureTable>) -> Self {
        let defaults = DefaultTextures::register(&table);
        Self {
            table,
            defaults,
            required: Vec::new(),
            cache: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Mark texture slots as mandatory.
    ///
    /// Encoding fails with [`BindingError::MissingRequiredTexture`] when a
    /// required slot is absent or evicted, instead of substituting a
    /// default. No slot is required unless the caller opts in.
    pub fn with_required_slots(mut self, slots: &[MaterialTextureSlot]) -> Self {
        self.required.extend_from_slice(slots);
        self
    }

    /// The default substitution handles.
    pub fn defaults(&self) -> DefaultTextures {
        self.defaults
    }

    /// Number of cached argument buffers.
    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }

    /// Encode a material, reusing the cached argument buffer when the same
    /// factor/texture combination was encoded before.
    pub fn encode(
        &self,
        factors: MaterialFactors,
        textures: MaterialTextures,
    ) -> BindingResult<EncodedMaterial> {
        let key = MaterialKey::new(&factors, &textures);

        if let Some(entry) = self.cache.read().get(&key) {
            if self.is_current(entry) {
                return Ok(entry.clone());
            }
        }

        // Rebuild outside the lock, then swap in.
        let mut arguments = MaterialArguments::zeroed();
        arguments.factors = factors;
        let mut referenced = Vec::new();

        for slot in MaterialTextureSlot::ALL {
            let handle = match textures.get(slot) {
                Some(id) => match self.table.resolve(id) {
                    Some(handle) => {
                        referenced.push(id);
                        handle
                    }
                    None => {
                        if self.required.contains(&slot) {
                            return Err(BindingError::MissingRequiredTexture(slot));
                        }
                        log::warn!(
                            "MaterialEncoder: {slot:?} texture {id:?} evicted, substituting default"
                        );
                        self.defaults.for_slot(slot)
                    }
                },
                None => {
                    if self.required.contains(&slot) {
                        return Err(BindingError::MissingRequiredTexture(slot));
                    }
                    self.defaults.for_slot(slot)
                }
            };
            set_slot(&mut arguments, slot, handle);
        }

        let mut cache = self.cache.write();
        if let Some(existing) = cache.get(&key) {
            if self.is_current(existing) {
                return Ok(existing.clone());
            }
        }

        let encoded = EncodedMaterial {
            id: ArgumentBufferId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            arguments,
            referenced,
        };
        log::debug!(
            "MaterialEncoder: built argument buffer {:?} ({} referenced textures)",
            encoded.id,
            encoded.referenced.len()
        );
        cache.insert(key, encoded.clone());
        Ok(encoded)
    }

    /// Drop cached argument buffers whose referenced textures were evicted.
    ///
    /// Returns the number of invalidated entries.
    pub fn flush_evicted(&self) -> usize {
        let mut cache = self.cache.write();
        let before = cache.len();
        cache.retain(|_, entry| self.is_current(entry));
        let removed = before - cache.len();
        if removed > 0 {
            log::debug!("MaterialEncoder: invalidated {removed} argument buffers");
        }
        removed
    }

    fn is_current(&self, entry: &EncodedMaterial) -> bool {
        entry
            .referenced
            .iter()
            .all(|id| self.table.resolve(*id).is_some())
    }
}

impl std::fmt::Debug for MaterialEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialEncoder")
            .field("cached_count", &self.cached_count())
            .field("required", &self.required)
            .finish()
    }
}

fn set_slot(arguments: &mut MaterialArguments, slot: MaterialTextureSlot, handle: TextureHandle) {
    match slot {
        MaterialTextureSlot::BaseColor => arguments.base_color_texture = handle,
        MaterialTextureSlot::Roughness => arguments.roughness_texture = handle,
        MaterialTextureSlot::Metalness => arguments.metalness_texture = handle,
        MaterialTextureSlot::Normal => arguments.normal_texture = handle,
        MaterialTextureSlot::Occlusion => arguments.occlusion_texture = handle,
        MaterialTextureSlot::Opacity => arguments.opacity_texture = handle,
        MaterialTextureSlot::Emissive => arguments.emissive_texture = handle,
    }
}

// Ensure the encoder can be shared across threads
static_assertions::assert_impl_all!(MaterialEncoder: Send, Sync);
