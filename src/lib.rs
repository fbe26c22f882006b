//! GPU resource binding and constant-buffer layout.
//!
//! This crate owns the contract between host code and compiled shaders for
//! a forward renderer:
//!
//! - [`layout`] — binding-point numbering, the versioned binding table, and
//!   the byte-exact constant and argument-buffer structures shared with the
//!   device.
//! - [`ring`] — the ring-slotted allocator that rotates per-frame constant
//!   memory across frames in flight, gated by [`sync::Fence`]s.
//! - [`frame`] — the per-frame publishing protocol for view/projection and
//!   per-instance transforms.
//! - [`texture`] / [`material`] — the bindless residency table and the
//!   deduplicating material argument-buffer encoder.
//! - [`binding`] — host-side draw binding assembly and validation.
//!
//! The crate is backend-agnostic: it produces validated, byte-exact buffer
//! contents and binding sets, and leaves command encoding to the caller.

pub mod binding;
pub mod error;
pub mod frame;
pub mod layout;
pub mod material;
pub mod ring;
pub mod sync;
pub mod texture;

pub use binding::{bind_for_draw, AttachedResource, DrawBindings, VertexBufferId};
pub use error::{BindingError, BindingResult};
pub use frame::{ActiveFrame, ConstantsHandle, ConstantsKind, FramePublisher};
pub use layout::{
    AttributeIndex, FragmentBindPoint, FrameConstants, InstanceConstants, MaterialArguments,
    MaterialFactors, ResourceKind, ShaderStageFlags, TextureHandle, VertexBindPoint,
    BINDING_TABLE, BINDING_TABLE_VERSION,
};
pub use material::{
    ArgumentBufferId, EncodedMaterial, MaterialEncoder, MaterialTextureSlot, MaterialTextures,
};
pub use ring::{ConstantRing, FrameArena, RingAllocation, RingConfig};
pub use sync::{Fence, FenceStatus};
pub use texture::{DefaultTextures, TextureId, TextureTable};
