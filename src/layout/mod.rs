//! Layout registry: the shared host/device contract.
//!
//! Everything in this module is consumed identically by host-side packing
//! code and device-side shader declarations. A structure's host byte layout
//! (size, field offsets, alignment) must exactly match its device-side
//! interpretation; sizes and offsets are asserted at compile time.

mod bind_points;
mod constants;
mod material_args;

pub use bind_points::{
    expected_kind, AttributeIndex, BindingTableEntry, FragmentBindPoint, ResourceKind,
    ShaderStageFlags, VertexBindPoint, BINDING_TABLE, BINDING_TABLE_VERSION,
};
pub use constants::{FrameConstants, InstanceConstants};
pub use material_args::{MaterialArguments, MaterialFactors, TextureHandle};
