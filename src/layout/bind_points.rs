//! Binding-point enumerations and the versioned binding table.
//!
//! These indices are contractual with compiled shader code: the values are
//! part of the host/device ABI and must never be renumbered once shipped.
//! The [`BINDING_TABLE`] is the single source of truth consumed by both the
//! packing code and the dispatcher's host-side validation, so the two cannot
//! drift apart silently.

use bitflags::bitflags;

/// Vertex attribute slot numbering.
///
/// Stable across all pipeline variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AttributeIndex {
    /// Vertex position.
    Position = 0,
    /// Vertex normal.
    Normal = 1,
    /// Texture coordinates.
    Uv = 2,
}

impl AttributeIndex {
    /// Number of vertex attributes.
    pub const COUNT: usize = 3;

    /// Get the attribute slot index.
    pub const fn index(self) -> u32 {
        self as u32
    }
}

/// Buffer binding points visible to the vertex stage.
///
/// The index order is contractual with compiled shader code; reordering
/// breaks binding correctness silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum VertexBindPoint {
    /// The mesh vertex buffer.
    VertexBuffer = 0,
    /// Per-frame constants (view and projection matrices).
    FrameConstants = 1,
    /// Per-draw constants (model matrix).
    InstanceConstants = 2,
}

impl VertexBindPoint {
    /// Number of vertex-stage binding points.
    pub const COUNT: usize = 3;

    /// All vertex-stage binding points, in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::VertexBuffer,
        Self::FrameConstants,
        Self::InstanceConstants,
    ];

    /// Get the binding point index.
    pub const fn index(self) -> u32 {
        self as u32
    }
}

/// Buffer binding points visible to the fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FragmentBindPoint {
    /// The material argument buffer.
    Material = 0,
}

impl FragmentBindPoint {
    /// Number of fragment-stage binding points.
    pub const COUNT: usize = 1;

    /// All fragment-stage binding points, in index order.
    pub const ALL: [Self; Self::COUNT] = [Self::Material];

    /// Get the binding point index.
    pub const fn index(self) -> u32 {
        self as u32
    }
}

bitflags! {
    /// Shader stages that can access a binding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        /// Vertex shader stage.
        const VERTEX = 1 << 0;
        /// Fragment shader stage.
        const FRAGMENT = 1 << 1;
    }
}

/// Kind of resource a binding point accepts.
///
/// Carried as a type tag alongside each handle so the dispatcher can reject
/// mismatched attachments host-side instead of relying on GPU validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A mesh vertex buffer.
    VertexBuffer,
    /// Per-frame constants.
    FrameConstants,
    /// Per-draw instance constants.
    InstanceConstants,
    /// A material argument buffer.
    MaterialArguments,
}

/// One row of the binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingTableEntry {
    /// Stage the binding point belongs to.
    pub stage: ShaderStageFlags,
    /// Binding point index within the stage.
    pub index: u32,
    /// Kind of resource the slot accepts.
    pub kind: ResourceKind,
    /// Human-readable name for diagnostics.
    pub name: &'static str,
}

/// Version of the binding table layout.
///
/// Host and compiled shaders must agree on this value. Bump it whenever
/// entries are added, removed, or renumbered; version 2 replaced the two
/// per-pipeline-generation tables with this single registry.
pub const BINDING_TABLE_VERSION: u32 = 2;

/// The complete binding table, one entry per active binding point.
pub const BINDING_TABLE: &[BindingTableEntry] = &[
    BindingTableEntry {
        stage: ShaderStageFlags::VERTEX,
        index: VertexBindPoint::VertexBuffer.index(),
        kind: ResourceKind::VertexBuffer,
        name: "vertex_buffer",
    },
    BindingTableEntry {
        stage: ShaderStageFlags::VERTEX,
        index: VertexBindPoint::FrameConstants.index(),
        kind: ResourceKind::FrameConstants,
        name: "frame_constants",
    },
    BindingTableEntry {
        stage: ShaderStageFlags::VERTEX,
        index: VertexBindPoint::InstanceConstants.index(),
        kind: ResourceKind::InstanceConstants,
        name: "instance_constants",
    },
    BindingTableEntry {
        stage: ShaderStageFlags::FRAGMENT,
        index: FragmentBindPoint::Material.index(),
        kind: ResourceKind::MaterialArguments,
        name: "material_arguments",
    },
];

/// Look up the resource kind a binding point accepts.
///
/// Returns `None` if no entry exists for the given stage and index.
pub fn expected_kind(stage: ShaderStageFlags, index: u32) -> Option<ResourceKind> {
    BINDING_TABLE
        .iter()
        .find(|entry| entry.stage == stage && entry.index == index)
        .map(|entry| entry.kind)
}
