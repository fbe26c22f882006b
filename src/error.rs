//! Binding subsystem error types.

use thiserror::Error;

use crate::layout::ResourceKind;
use crate::material::MaterialTextureSlot;

/// Errors that can occur in the binding subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// A ring slot ran out of space for the current frame.
    ///
    /// This is a configuration error: the caller must increase the slot
    /// capacity. Retrying the allocation within the same frame will fail
    /// again; the frame itself can still be finished or abandoned safely.
    #[error("out of buffer space: requested {requested} bytes, {remaining} remaining in slot")]
    OutOfBufferSpace {
        /// Size of the failed allocation in bytes.
        requested: u64,
        /// Space left in the slot at the (aligned) write cursor.
        remaining: u64,
    },

    /// A ring slot was still in flight on the GPU after the bounded wait.
    #[error("ring slot still in flight after {waited_ms} ms")]
    ResourceBusy {
        /// How long `begin_frame` waited before giving up.
        waited_ms: u64,
    },

    /// A texture slot marked as required could not be resolved.
    #[error("required texture slot {0:?} is unresolved")]
    MissingRequiredTexture(MaterialTextureSlot),

    /// A resource of the wrong type was supplied for a binding point.
    ///
    /// Detected host-side via the type tags carried on each handle,
    /// never deferred to GPU validation.
    #[error("binding point {bind_point} expects {expected:?}, got {actual:?}")]
    BindingPointMismatch {
        /// Index of the binding point, per the layout registry.
        bind_point: u32,
        /// Kind declared by the binding table.
        expected: ResourceKind,
        /// Kind of the supplied resource.
        actual: ResourceKind,
    },

    /// Constant handles from different frames were combined in one draw.
    #[error("frame constants from frame {frame} bound with instance constants from frame {instance}")]
    FrameMismatch {
        /// Frame index of the frame-constants handle.
        frame: u64,
        /// Frame index of the instance-constants handle.
        instance: u64,
    },

    /// Publish calls were made out of order within a frame.
    #[error("publish ordering violated: {0}")]
    PublishOrdering(&'static str),

    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type BindingResult<T> = Result<T, BindingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BindingError::OutOfBufferSpace {
            requested: 512,
            remaining: 128,
        };
        assert_eq!(
            err.to_string(),
            "out of buffer space: requested 512 bytes, 128 remaining in slot"
        );

        let err = BindingError::ResourceBusy { waited_ms: 100 };
        assert_eq!(err.to_string(), "ring slot still in flight after 100 ms");

        let err = BindingError::PublishOrdering("frame constants not yet published");
        assert_eq!(
            err.to_string(),
            "publish ordering violated: frame constants not yet published"
        );
    }
}
