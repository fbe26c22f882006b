//! Material factor and argument-buffer layouts.
//!
//! [`MaterialArguments`] is the device-resident argument buffer read by the
//! fragment shader as one bound object. Texture fields hold bindless
//! [`TextureHandle`]s resolved through the texture table, never owning
//! pointers.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use static_assertions::const_assert_eq;

/// An opaque, GPU-resolvable bindless texture handle.
///
/// The handle is a lookup reference into the device's resident-texture
/// table; it carries no ownership. A handle baked into a live argument
/// buffer must reference a resource whose lifetime covers the buffer's
/// in-flight window.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct TextureHandle(u64);

impl TextureHandle {
    /// The reserved "no resource" handle.
    ///
    /// Never appears in an encoded argument buffer: absent slots are
    /// substituted with a default texture instead.
    pub const INVALID: Self = Self(0);

    /// Create a handle from a raw device value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw device value.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is the reserved invalid handle.
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Scalar and vector material factors, copied by value into the argument
/// buffer.
///
/// # Memory layout
///
/// 48 bytes. `emissive_factor` is a vec3; the device-side declaration pads
/// vec3 to 16 bytes, so the trailing padding is explicit here rather than
/// implicit.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialFactors {
    /// Base color multiplier (offset 0).
    pub base_color_factor: Vec4,
    /// Roughness multiplier (offset 16).
    pub roughness_factor: f32,
    /// Metallic multiplier (offset 20).
    pub metallic_factor: f32,
    /// Normal map scale (offset 24).
    pub normal_scale: f32,
    /// Occlusion strength (offset 28).
    pub occlusion_strength: f32,
    /// Emissive color (offset 32).
    pub emissive_factor: Vec3,
    /// Explicit padding: vec3 occupies 16 bytes device-side (offset 44).
    pub _pad: f32,
}

const_assert_eq!(std::mem::size_of::<MaterialFactors>(), 48);
const_assert_eq!(std::mem::offset_of!(MaterialFactors, roughness_factor), 16);
const_assert_eq!(std::mem::offset_of!(MaterialFactors, emissive_factor), 32);

impl MaterialFactors {
    /// Create factors with the given base color and neutral defaults for
    /// everything else.
    pub fn with_base_color(base_color: Vec4) -> Self {
        Self {
            base_color_factor: base_color,
            ..Default::default()
        }
    }
}

impl Default for MaterialFactors {
    fn default() -> Self {
        Self {
            base_color_factor: Vec4::new(0.0, 0.0, 0.0, 1.0),
            roughness_factor: 1.0,
            metallic_factor: 0.0,
            normal_scale: 1.0,
            occlusion_strength: 1.0,
            emissive_factor: Vec3::ZERO,
            _pad: 0.0,
        }
    }
}

/// The per-material argument buffer.
///
/// Aggregates the material factors and one bindless handle per texture
/// slot so the fragment shader reads the whole material as one bound
/// object, without per-draw texture rebinding.
///
/// # Memory layout
///
/// 112 bytes: 48 bytes of factors, seven 8-byte handles, 8 bytes of
/// explicit tail padding (the struct is 16-byte aligned device-side).
/// Field order is ABI; do not reorder.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialArguments {
    /// Scalar/vector factors (offset 0).
    pub factors: MaterialFactors,
    /// Base color texture (offset 48).
    pub base_color_texture: TextureHandle,
    /// Roughness texture (offset 56).
    pub roughness_texture: TextureHandle,
    /// Metalness texture (offset 64).
    pub metalness_texture: TextureHandle,
    /// Normal map texture (offset 72).
    pub normal_texture: TextureHandle,
    /// Occlusion texture (offset 80).
    pub occlusion_texture: TextureHandle,
    /// Opacity texture (offset 88).
    pub opacity_texture: TextureHandle,
    /// Emissive texture (offset 96).
    pub emissive_texture: TextureHandle,
    /// Explicit tail padding to the 16-byte device alignment (offset 104).
    pub _pad: [u32; 2],
}

const_assert_eq!(std::mem::size_of::<MaterialArguments>(), 112);
const_assert_eq!(std::mem::offset_of!(MaterialArguments, base_color_texture), 48);
const_assert_eq!(std::mem::offset_of!(MaterialArguments, emissive_texture), 96);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_handle_validity() {
        assert!(!TextureHandle::INVALID.is_valid());
        assert!(TextureHandle::from_raw(7).is_valid());
        assert_eq!(TextureHandle::from_raw(7).raw(), 7);
    }

    #[test]
    fn test_factors_default_is_neutral() {
        let factors = MaterialFactors::default();
        assert_eq!(factors.base_color_factor.w, 1.0);
        assert_eq!(factors.roughness_factor, 1.0);
        assert_eq!(factors.metallic_factor, 0.0);
        assert_eq!(factors.normal_scale, 1.0);
        assert_eq!(factors.occlusion_strength, 1.0);
    }

    #[test]
    fn test_arguments_byte_round_trip() {
        let mut arguments = MaterialArguments::zeroed();
        arguments.factors = MaterialFactors::with_base_color(Vec4::new(0.5, 0.25, 0.125, 1.0));
        arguments.normal_texture = TextureHandle::from_raw(42);

        let bytes = bytemuck::bytes_of(&arguments);
        assert_eq!(bytes.len(), 112);

        let restored: MaterialArguments = bytemuck::pod_read_unaligned(bytes);
        assert_eq!(restored, arguments);
        assert_eq!(restored.normal_texture.raw(), 42);
    }

    #[test]
    fn test_handle_offsets_match_declared_abi() {
        // The seven handles are laid out contiguously after the factors.
        let base = std::mem::offset_of!(MaterialArguments, base_color_texture);
        assert_eq!(base, 48);
        assert_eq!(std::mem::offset_of!(MaterialArguments, opacity_texture), base + 40);
    }
}
