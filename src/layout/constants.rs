//! Per-frame and per-instance constant layouts.
//!
//! These structs are written byte-for-byte into shader-visible memory, so
//! their layout is part of the host/device ABI. Any change to field order,
//! type, or padding must be mirrored in the shader declarations
//! simultaneously.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use static_assertions::const_assert_eq;

/// Constants computed once per rendered frame.
///
/// Matrices are column-major, 64 bytes each, 16-byte aligned. Read-only to
/// the GPU during the frame they are bound.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameConstants {
    /// World-to-view transform.
    pub view: Mat4,
    /// View-to-clip transform.
    pub projection: Mat4,
}

const_assert_eq!(std::mem::size_of::<FrameConstants>(), 128);

impl FrameConstants {
    /// Create frame constants from view and projection matrices.
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }
}

impl Default for FrameConstants {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

/// Constants computed once per draw call.
///
/// One logical instance may have many physical copies, one per ring slot in
/// flight.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceConstants {
    /// Model-to-world transform.
    pub model: Mat4,
}

const_assert_eq!(std::mem::size_of::<InstanceConstants>(), 64);

impl InstanceConstants {
    /// Create instance constants from a model matrix.
    pub fn new(model: Mat4) -> Self {
        Self { model }
    }
}

impl Default for InstanceConstants {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
        }
    }
}
