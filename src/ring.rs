//! Ring-slotted constant buffer allocator.
//!
//! A [`ConstantRing`] owns N host-visible memory slots, one per frame in
//! flight. Each frame the CPU bump-allocates constants into the slot it
//! owns while the GPU reads the slots submitted up to N frames earlier.
//! Slot ownership is handed off by a per-slot [`Fence`]: the CPU only
//! reuses a slot after the fence from its previous submission has fired.
//!
//! Writes land in host-visible memory immediately; visibility to the GPU is
//! guaranteed only after the associated command submission completes. The
//! scoped [`FrameArena`] guard makes write-after-submit unrepresentable:
//! [`FrameArena::finish`] consumes the guard, so no writes can follow it.

use std::time::Duration;

use bytemuck::Pod;

use crate::error::{BindingError, BindingResult};
use crate::sync::Fence;

/// Configuration for a [`ConstantRing`].
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Number of slots (frames in flight). Must be at least 2.
    pub slot_count: usize,
    /// Capacity of each slot in bytes.
    pub slot_capacity: u64,
    /// Alignment for constant allocations (power of 2).
    ///
    /// 256 matches the minimum uniform-buffer offset alignment required by
    /// most GPUs.
    pub alignment: u64,
    /// How long `begin_frame` may block on an in-flight slot before
    /// failing with `ResourceBusy`.
    pub begin_frame_timeout: Duration,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            slot_count: 3,
            slot_capacity: 256 * 1024,
            alignment: 256,
            begin_frame_timeout: Duration::from_millis(100),
        }
    }
}

impl RingConfig {
    fn validate(&self) -> BindingResult<()> {
        if self.slot_count < 2 {
            return Err(BindingError::InvalidParameter(format!(
                "ring needs at least 2 slots, got {}",
                self.slot_count
            )));
        }
        if self.slot_capacity == 0 {
            return Err(BindingError::InvalidParameter(
                "slot capacity cannot be zero".to_string(),
            ));
        }
        if !self.alignment.is_power_of_two() {
            return Err(BindingError::InvalidParameter(format!(
                "alignment must be a power of 2, got {}",
                self.alignment
            )));
        }
        Ok(())
    }
}

/// A sub-allocation from a ring slot.
///
/// Identifies the slot, byte range, and frame the data belongs to. The
/// frame index lets consumers detect stale handles immediately instead of
/// reading garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RingAllocation {
    /// Index of the ring slot.
    pub slot: u32,
    /// Byte offset within the slot.
    pub offset: u64,
    /// Size of the allocation in bytes.
    pub size: u64,
    /// Frame index the allocation was made for.
    pub frame: u64,
}

struct Slot {
    storage: Box<[u8]>,
    fence: Fence,
    in_flight: bool,
}

/// Ring of host-writable, device-readable constant memory.
///
/// # Thread safety
///
/// A single render thread drives the ring; the only cross-thread
/// interaction is the GPU (or its stand-in) signaling slot fences.
pub struct ConstantRing {
    slots: Vec<Slot>,
    config: RingConfig,
    frame_counter: u64,
}

impl ConstantRing {
    /// Create a new ring with the given configuration.
    pub fn new(config: RingConfig) -> BindingResult<Self> {
        config.validate()?;

        let slots = (0..config.slot_count)
            .map(|_| Slot {
                storage: vec![0u8; config.slot_capacity as usize].into_boxed_slice(),
                fence: Fence::new_unsignaled(),
                in_flight: false,
            })
            .collect();

        log::debug!(
            "ConstantRing: {} slots x {} bytes, alignment {}",
            config.slot_count,
            config.slot_capacity,
            config.alignment
        );

        Ok(Self {
            slots,
            config,
            frame_counter: 0,
        })
    }

    /// Number of ring slots.
    pub fn slot_count(&self) -> usize {
        self.config.slot_count
    }

    /// Capacity of each slot in bytes.
    pub fn slot_capacity(&self) -> u64 {
        self.config.slot_capacity
    }

    /// Index of the next frame `begin_frame` will start.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Begin a frame, taking ownership of the next ring slot.
    ///
    /// Blocks (bounded by the configured timeout) if the slot's previous
    /// submission has not yet been consumed by the GPU; fails with
    /// [`BindingError::ResourceBusy`] if the wait elapses. This is the
    /// system's only intentional suspension point.
    pub fn begin_frame(&mut self) -> BindingResult<FrameArena<'_>> {
        let frame = self.frame_counter;
        let slot_index = (frame % self.config.slot_count as u64) as usize;
        let slot = &mut self.slots[slot_index];

        if slot.in_flight && !slot.fence.is_signaled() {
            log::trace!(
                "ConstantRing: frame {frame} waiting on slot {slot_index} completion"
            );
            if !slot.fence.wait_timeout(self.config.begin_frame_timeout) {
                return Err(BindingError::ResourceBusy {
                    waited_ms: self.config.begin_frame_timeout.as_millis() as u64,
                });
            }
        }

        slot.in_flight = false;
        slot.fence.reset();
        self.frame_counter += 1;

        log::trace!("ConstantRing: frame {frame} owns slot {slot_index}");

        Ok(FrameArena {
            ring: self,
            slot_index,
            frame,
            cursor: 0,
        })
    }
}

impl std::fmt::Debug for ConstantRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstantRing")
            .field("slot_count", &self.config.slot_count)
            .field("slot_capacity", &self.config.slot_capacity)
            .field("frame_counter", &self.frame_counter)
            .finish()
    }
}

/// Scoped write handle for the ring slot owned by the current frame.
///
/// Dropping the arena without calling [`finish`] abandons the frame: the
/// slot is simply reused next cycle, since no GPU work referenced it.
///
/// [`finish`]: FrameArena::finish
pub struct FrameArena<'a> {
    ring: &'a mut ConstantRing,
    slot_index: usize,
    frame: u64,
    cursor: u64,
}

impl std::fmt::Debug for FrameArena<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameArena")
            .field("frame", &self.frame)
            .field("slot_index", &self.slot_index)
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl FrameArena<'_> {
    /// Frame index this arena belongs to.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Index of the owned ring slot.
    pub fn slot_index(&self) -> usize {
        self.slot_index
    }

    /// Space remaining at the current (unaligned) write cursor.
    pub fn remaining(&self) -> u64 {
        self.ring.config.slot_capacity - self.cursor
    }

    /// Bump-allocate a sub-region of the owned slot.
    ///
    /// Fails with [`BindingError::OutOfBufferSpace`] when the slot capacity
    /// is exceeded. This is fatal for the current frame; the slot itself is
    /// released cleanly by `finish` or drop.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> BindingResult<RingAllocation> {
        if !alignment.is_power_of_two() {
            return Err(BindingError::InvalidParameter(format!(
                "alignment must be a power of 2, got {alignment}"
            )));
        }

        let aligned = align_up(self.cursor, alignment);
        let capacity = self.ring.config.slot_capacity;
        // checked_add: a size near u64::MAX must not wrap past the capacity check
        let end = match aligned.checked_add(size) {
            Some(end) if end <= capacity => end,
            _ => {
                log::warn!(
                    "ConstantRing: slot {} exhausted at frame {} (requested {size}, remaining {})",
                    self.slot_index,
                    self.frame,
                    capacity.saturating_sub(aligned)
                );
                return Err(BindingError::OutOfBufferSpace {
                    requested: size,
                    remaining: capacity.saturating_sub(aligned),
                });
            }
        };

        self.cursor = end;
        Ok(RingAllocation {
            slot: self.slot_index as u32,
            offset: aligned,
            size,
            frame: self.frame,
        })
    }

    /// Write a value into the slot at the ring's default alignment.
    pub fn write<T: Pod>(&mut self, value: &T) -> BindingResult<RingAllocation> {
        let bytes = bytemuck::bytes_of(value);
        let allocation = self.allocate(bytes.len() as u64, self.ring.config.alignment)?;
        let start = allocation.offset as usize;
        self.ring.slots[self.slot_index].storage[start..start + bytes.len()]
            .copy_from_slice(bytes);
        Ok(allocation)
    }

    /// Read back a value written into this frame's slot.
    ///
    /// Only valid before `finish`; reading an allocation from another frame
    /// or slot is rejected.
    pub fn read_back<T: Pod>(&self, allocation: RingAllocation) -> BindingResult<T> {
        if allocation.frame != self.frame || allocation.slot as usize != self.slot_index {
            return Err(BindingError::InvalidParameter(format!(
                "allocation from frame {} slot {} read back in frame {}",
                allocation.frame, allocation.slot, self.frame
            )));
        }
        if allocation.size as usize != std::mem::size_of::<T>() {
            return Err(BindingError::InvalidParameter(format!(
                "allocation size {} does not match type size {}",
                allocation.size,
                std::mem::size_of::<T>()
            )));
        }
        let in_bounds = allocation
            .offset
            .checked_add(allocation.size)
            .is_some_and(|end| end <= self.ring.config.slot_capacity);
        if !in_bounds {
            return Err(BindingError::InvalidParameter(format!(
                "allocation range {}..{} exceeds slot capacity {}",
                allocation.offset,
                allocation.offset.saturating_add(allocation.size),
                self.ring.config.slot_capacity
            )));
        }
        let start = allocation.offset as usize;
        let bytes = &self.ring.slots[self.slot_index].storage[start..start + allocation.size as usize];
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Mark the frame as submitted and release the slot to the GPU.
    ///
    /// Returns the completion fence the submission layer must signal once
    /// the GPU has finished consuming the slot. Consuming `self` here is
    /// what forbids writes after submission.
    pub fn finish(self) -> Fence {
        let slot = &mut self.ring.slots[self.slot_index];
        slot.in_flight = true;
        log::trace!(
            "ConstantRing: frame {} submitted slot {} ({} bytes used)",
            self.frame,
            self.slot_index,
            self.cursor
        );
        slot.fence.clone()
    }
}

/// Align a value up to the given alignment.
#[inline]
fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}
