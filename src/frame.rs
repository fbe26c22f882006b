//! Per-frame constant publishing.
//!
//! The [`FramePublisher`] layers the frame protocol on top of the raw ring:
//! exactly one [`FrameConstants`] record per frame, published before any
//! [`InstanceConstants`], all tagged with the frame they belong to so the
//! dispatcher can reject cross-frame mixes.

use glam::Mat4;

use crate::error::{BindingError, BindingResult};
use crate::layout::{FrameConstants, InstanceConstants};
use crate::ring::{ConstantRing, FrameArena, RingAllocation, RingConfig};
use crate::sync::Fence;

/// Which constant record a handle points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantsKind {
    /// Per-frame constants (view/projection).
    Frame,
    /// Per-instance constants (model transform).
    Instance,
}

/// Handle to a constant record published for the current frame.
///
/// Carries the kind tag and the underlying ring allocation; the dispatcher
/// checks both before accepting it for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstantsHandle {
    kind: ConstantsKind,
    allocation: RingAllocation,
}

impl ConstantsHandle {
    /// Kind of constants this handle refers to.
    pub fn kind(&self) -> ConstantsKind {
        self.kind
    }

    /// Frame index the constants were published in.
    pub fn frame(&self) -> u64 {
        self.allocation.frame
    }

    /// The backing ring allocation.
    pub fn allocation(&self) -> RingAllocation {
        self.allocation
    }
}

/// Publishes per-frame and per-instance constants into a constant ring.
pub struct FramePublisher {
    ring: ConstantRing,
}

impl FramePublisher {
    /// Create a publisher over a fresh ring.
    pub fn new(config: RingConfig) -> BindingResult<Self> {
        Ok(Self {
            ring: ConstantRing::new(config)?,
        })
    }

    /// Begin a frame.
    ///
    /// Blocks (bounded) if the ring slot for this frame is still in flight;
    /// see [`ConstantRing::begin_frame`].
    pub fn begin_frame(&mut self) -> BindingResult<ActiveFrame<'_>> {
        Ok(ActiveFrame {
            arena: self.ring.begin_frame()?,
            frame_published: false,
        })
    }

    /// Index of the next frame `begin_frame` will start.
    pub fn frame_counter(&self) -> u64 {
        self.ring.frame_counter()
    }
}

impl std::fmt::Debug for FramePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePublisher")
            .field("frame_counter", &self.ring.frame_counter())
            .finish()
    }
}

/// A frame currently open for constant publishing.
///
/// Enforces the per-frame protocol: `publish_frame` exactly once, then any
/// number of `publish_instance` calls, then [`finish`]. Dropping without
/// `finish` abandons the frame.
///
/// [`finish`]: ActiveFrame::finish
pub struct ActiveFrame<'a> {
    arena: FrameArena<'a>,
    frame_published: bool,
}

impl std::fmt::Debug for ActiveFrame<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveFrame")
            .field("frame", &self.arena.frame())
            .field("frame_published", &self.frame_published)
            .finish()
    }
}

impl ActiveFrame<'_> {
    /// Frame index of this frame.
    pub fn frame(&self) -> u64 {
        self.arena.frame()
    }

    /// Publish the frame constants (view and projection matrices).
    ///
    /// Must be called exactly once per frame, before any instance publish.
    pub fn publish_frame(&mut self, view: Mat4, projection: Mat4) -> BindingResult<ConstantsHandle> {
        if self.frame_published {
            return Err(BindingError::PublishOrdering(
                "frame constants already published this frame",
            ));
        }
        let constants = FrameConstants { view, projection };
        let allocation = self.arena.write(&constants)?;
        self.frame_published = true;
        Ok(ConstantsHandle {
            kind: ConstantsKind::Frame,
            allocation,
        })
    }

    /// Publish one instance's constants (model transform).
    ///
    /// Valid only after the frame constants have been published.
    pub fn publish_instance(&mut self, model: Mat4) -> BindingResult<ConstantsHandle> {
        if !self.frame_published {
            return Err(BindingError::PublishOrdering(
                "frame constants not yet published",
            ));
        }
        let constants = InstanceConstants { model };
        let allocation = self.arena.write(&constants)?;
        Ok(ConstantsHandle {
            kind: ConstantsKind::Instance,
            allocation,
        })
    }

    /// Read back a published record, for validation before submission.
    pub fn read_back_frame(&self, handle: ConstantsHandle) -> BindingResult<FrameConstants> {
        self.checked_read(handle, ConstantsKind::Frame)
    }

    /// Read back a published instance record.
    pub fn read_back_instance(&self, handle: ConstantsHandle) -> BindingResult<InstanceConstants> {
        self.checked_read(handle, ConstantsKind::Instance)
    }

    fn checked_read<T: bytemuck::Pod>(
        &self,
        handle: ConstantsHandle,
        kind: ConstantsKind,
    ) -> BindingResult<T> {
        if handle.kind != kind {
            return Err(BindingError::InvalidParameter(format!(
                "expected a {kind:?} constants handle, got {:?}",
                handle.kind
            )));
        }
        self.arena.read_back(handle.allocation)
    }

    /// Submit the frame, releasing the ring slot to the GPU.
    ///
    /// Returns the completion fence; the submission layer signals it once
    /// the GPU has consumed the slot. No publishing is possible afterwards.
    pub fn finish(self) -> Fence {
        self.arena.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publisher() -> FramePublisher {
        FramePublisher::new(RingConfig::default()).unwrap()
    }

    #[test]
    fn test_publish_and_read_back() {
        let mut publisher = publisher();
        let mut frame = publisher.begin_frame().unwrap();

        let view = Mat4::from_translation(glam::Vec3::new(0.0, 1.0, -5.0));
        let projection = Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 100.0);
        let frame_handle = frame.publish_frame(view, projection).unwrap();

        let model = Mat4::from_scale(glam::Vec3::splat(2.0));
        let instance_handle = frame.publish_instance(model).unwrap();

        let constants = frame.read_back_frame(frame_handle).unwrap();
        assert_eq!(constants.view, view);
        assert_eq!(constants.projection, projection);

        let instance = frame.read_back_instance(instance_handle).unwrap();
        assert_eq!(instance.model, model);
    }

    #[test]
    fn test_instance_before_frame_is_rejected() {
        let mut publisher = publisher();
        let mut frame = publisher.begin_frame().unwrap();

        let err = frame.publish_instance(Mat4::IDENTITY).unwrap_err();
        assert!(matches!(err, BindingError::PublishOrdering(_)));
    }

    #[test]
    fn test_double_frame_publish_is_rejected() {
        let mut publisher = publisher();
        let mut frame = publisher.begin_frame().unwrap();

        frame.publish_frame(Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
        let err = frame
            .publish_frame(Mat4::IDENTITY, Mat4::IDENTITY)
            .unwrap_err();
        assert!(matches!(err, BindingError::PublishOrdering(_)));
    }

    #[test]
    fn test_handles_carry_frame_and_kind() {
        let mut publisher = publisher();
        let mut frame = publisher.begin_frame().unwrap();

        let frame_handle = frame.publish_frame(Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
        let instance_handle = frame.publish_instance(Mat4::IDENTITY).unwrap();

        assert_eq!(frame_handle.kind(), ConstantsKind::Frame);
        assert_eq!(instance_handle.kind(), ConstantsKind::Instance);
        assert_eq!(frame_handle.frame(), instance_handle.frame());
    }

    #[test]
    fn test_many_instances_per_frame() {
        let mut publisher = publisher();
        let mut frame = publisher.begin_frame().unwrap();
        frame.publish_frame(Mat4::IDENTITY, Mat4::IDENTITY).unwrap();

        for i in 0..100 {
            let model = Mat4::from_translation(glam::Vec3::new(i as f32, 0.0, 0.0));
            frame.publish_instance(model).unwrap();
        }
    }

    #[test]
    fn test_active_frame_debug_reports_publish_state() {
        let mut publisher = publisher();
        let mut frame = publisher.begin_frame().unwrap();
        assert!(format!("{frame:?}").contains("frame_published: false"));

        frame.publish_frame(Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
        assert!(format!("{frame:?}").contains("frame_published: true"));
    }

    #[test]
    fn test_ordering_resets_each_frame() {
        let mut publisher = publisher();

        let mut frame = publisher.begin_frame().unwrap();
        frame.publish_frame(Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
        frame.finish().signal();

        // The next frame requires its own frame publish again.
        let mut frame = publisher.begin_frame().unwrap();
        let err = frame.publish_instance(Mat4::IDENTITY).unwrap_err();
        assert!(matches!(err, BindingError::PublishOrdering(_)));
    }
}
