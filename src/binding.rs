//! Draw-call binding dispatch.
//!
//! [`bind_for_draw`] assembles the resources a draw needs into a
//! [`DrawBindings`] set, validating every attachment against the binding
//! table host-side. Wrong-kind attachments and cross-frame constant mixes
//! are rejected here, before anything reaches the command encoder.

use crate::error::{BindingError, BindingResult};
use crate::frame::{ConstantsHandle, ConstantsKind};
use crate::layout::{
    expected_kind, FragmentBindPoint, ResourceKind, ShaderStageFlags, VertexBindPoint,
};
use crate::material::ArgumentBufferId;

/// Identity of an uploaded vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferId(pub u64);

/// A resource attached to a binding point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachedResource {
    /// A mesh vertex buffer.
    VertexBuffer(VertexBufferId),
    /// Published frame or instance constants.
    Constants(ConstantsHandle),
    /// An encoded material argument buffer.
    ArgumentBuffer(ArgumentBufferId),
}

impl AttachedResource {
    /// The resource kind this attachment carries, for table validation.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::VertexBuffer(_) => ResourceKind::VertexBuffer,
            Self::Constants(handle) => match handle.kind() {
                ConstantsKind::Frame => ResourceKind::FrameConstants,
                ConstantsKind::Instance => ResourceKind::InstanceConstants,
            },
            Self::ArgumentBuffer(_) => ResourceKind::MaterialArguments,
        }
    }
}

/// A validated, complete set of bindings for one draw call.
///
/// Construction through [`bind_for_draw`] is the only way to obtain one, so
/// a `DrawBindings` in hand means every slot passed table validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawBindings {
    vertex: [AttachedResource; VertexBindPoint::COUNT],
    fragment: [AttachedResource; FragmentBindPoint::COUNT],
}

impl DrawBindings {
    /// The resource attached to a vertex-stage binding point.
    pub fn vertex(&self, point: VertexBindPoint) -> &AttachedResource {
        &self.vertex[point.index() as usize]
    }

    /// The resource attached to a fragment-stage binding point.
    pub fn fragment(&self, point: FragmentBindPoint) -> &AttachedResource {
        &self.fragment[point.index() as usize]
    }

    /// Frame index the bound constants belong to.
    pub fn frame(&self) -> u64 {
        match self.vertex(VertexBindPoint::FrameConstants) {
            AttachedResource::Constants(handle) => handle.frame(),
            _ => unreachable!("binding table pins this slot to frame constants"),
        }
    }
}

/// Assemble and validate the bindings for one draw call.
///
/// Checks each attachment against the binding table and rejects constant
/// handles from different frames; see [`BindingError::BindingPointMismatch`]
/// and [`BindingError::FrameMismatch`].
pub fn bind_for_draw(
    vertex_buffer: VertexBufferId,
    frame_constants: ConstantsHandle,
    instance_constants: ConstantsHandle,
    material: ArgumentBufferId,
) -> BindingResult<DrawBindings> {
    if frame_constants.frame() != instance_constants.frame() {
        return Err(BindingError::FrameMismatch {
            frame: frame_constants.frame(),
            instance: instance_constants.frame(),
        });
    }

    let vertex = [
        AttachedResource::VertexBuffer(vertex_buffer),
        AttachedResource::Constants(frame_constants),
        AttachedResource::Constants(instance_constants),
    ];
    let fragment = [AttachedResource::ArgumentBuffer(material)];

    for (index, resource) in vertex.iter().enumerate() {
        check_slot(ShaderStageFlags::VERTEX, index as u32, resource)?;
    }
    for (index, resource) in fragment.iter().enumerate() {
        check_slot(ShaderStageFlags::FRAGMENT, index as u32, resource)?;
    }

    log::trace!(
        "bind_for_draw: frame {} vertex buffer {:?} material {:?}",
        frame_constants.frame(),
        vertex_buffer,
        material
    );

    Ok(DrawBindings { vertex, fragment })
}

fn check_slot(
    stage: ShaderStageFlags,
    index: u32,
    resource: &AttachedResource,
) -> BindingResult<()> {
    let actual = resource.kind();
    match expected_kind(stage, index) {
        Some(expected) if expected == actual => Ok(()),
        Some(expected) => Err(BindingError::BindingPointMismatch {
            bind_point: index,
            expected,
            actual,
        }),
        None => Err(BindingError::InvalidParameter(format!(
            "no binding table entry for {stage:?} index {index}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FramePublisher;
    use crate::ring::RingConfig;
    use glam::Mat4;

    fn handles(publisher: &mut FramePublisher) -> (ConstantsHandle, ConstantsHandle) {
        let mut frame = publisher.begin_frame().unwrap();
        let frame_handle = frame.publish_frame(Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
        let instance_handle = frame.publish_instance(Mat4::IDENTITY).unwrap();
        frame.finish().signal();
        (frame_handle, instance_handle)
    }

    #[test]
    fn test_valid_bindings() {
        let mut publisher = FramePublisher::new(RingConfig::default()).unwrap();
        let (frame_handle, instance_handle) = handles(&mut publisher);

        let bindings = bind_for_draw(
            VertexBufferId(7),
            frame_handle,
            instance_handle,
            material_id(),
        )
        .unwrap();

        assert_eq!(
            *bindings.vertex(VertexBindPoint::VertexBuffer),
            AttachedResource::VertexBuffer(VertexBufferId(7))
        );
        assert_eq!(
            bindings.vertex(VertexBindPoint::FrameConstants).kind(),
            ResourceKind::FrameConstants
        );
        assert_eq!(
            bindings.fragment(FragmentBindPoint::Material).kind(),
            ResourceKind::MaterialArguments
        );
        assert_eq!(bindings.frame(), frame_handle.frame());
    }

    #[test]
    fn test_swapped_constants_are_rejected() {
        let mut publisher = FramePublisher::new(RingConfig::default()).unwrap();
        let (frame_handle, instance_handle) = handles(&mut publisher);

        // Frame and instance handles swapped.
        let err = bind_for_draw(
            VertexBufferId(7),
            instance_handle,
            frame_handle,
            material_id(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            BindingError::BindingPointMismatch {
                bind_point: VertexBindPoint::FrameConstants.index(),
                expected: ResourceKind::FrameConstants,
                actual: ResourceKind::InstanceConstants,
            }
        );
    }

    #[test]
    fn test_cross_frame_mix_is_rejected() {
        let mut publisher = FramePublisher::new(RingConfig::default()).unwrap();
        let (frame_a, _) = handles(&mut publisher);
        let (_, instance_b) = handles(&mut publisher);

        let err =
            bind_for_draw(VertexBufferId(1), frame_a, instance_b, material_id()).unwrap_err();
        assert_eq!(
            err,
            BindingError::FrameMismatch {
                frame: frame_a.frame(),
                instance: instance_b.frame(),
            }
        );
    }

    fn material_id() -> ArgumentBufferId {
        use crate::material::{MaterialEncoder, MaterialTextures};
        use crate::texture::TextureTable;
        let encoder = MaterialEncoder::new(std::sync::Arc::new(TextureTable::new()));
        encoder
            .encode(Default::default(), MaterialTextures::none())
            .unwrap()
            .id()
    }
}
