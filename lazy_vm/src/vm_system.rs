use log::info;

use crate::{
    address::{PageBuffer, PhysFrame},
    modules::{block_device::BlockDeviceModule, frame_allocator::FrameAllocatorModule},
    swap_table::SwapTable,
    util::spin_lock::SpinLock,
    VmConfig, VmResult,
};

/// Process wide part of the virtual memory subsystem.
///
/// Owns the pool of physical frames that all address spaces compete for
/// and the swap table. Created once at kernel startup and handed to every
/// [`crate::AddressSpace`] by reference.
pub struct VmSystem<A: FrameAllocatorModule, D: BlockDeviceModule> {
    /// the global frame pool lock
    frames: SpinLock<A>,

    swap: SwapTable<D>,

    config: VmConfig,
}

impl<A: FrameAllocatorModule, D: BlockDeviceModule> VmSystem<A, D> {
    pub fn new(frame_allocator: A, swap_device: D, config: VmConfig) -> VmResult<Self> {
        let swap = SwapTable::new(swap_device)?;

        info!(
            "Virtual memory ready: {} frames, {} swap slots",
            frame_allocator.capacity(),
            swap.capacity()
        );

        Ok(Self {
            frames: SpinLock::new(frame_allocator),
            swap,
            config,
        })
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn swap(&self) -> &SwapTable<D> {
        &self.swap
    }

    /// Number of frames that are currently not used by any address space
    pub fn free_frames(&self) -> usize {
        self.frames.lock().free_count()
    }

    pub fn total_frames(&self) -> usize {
        self.frames.lock().capacity()
    }

    pub(crate) fn obtain_frame(&self) -> Option<PhysFrame> {
        self.frames.lock().obtain()
    }

    pub(crate) fn release_frame(&self, frame: PhysFrame) {
        self.frames.lock().release(frame)
    }

    /// Copies the contents of `frame` into `dest`
    pub(crate) fn read_frame(&self, frame: PhysFrame, dest: &mut PageBuffer) {
        dest.copy_from_slice(self.frames.lock().frame(frame));
    }

    /// Overwrites the contents of `frame` with `src`
    pub(crate) fn write_frame(&self, frame: PhysFrame, src: &PageBuffer) {
        self.frames.lock().frame_mut(frame).copy_from_slice(src);
    }

    pub(crate) fn zero_frame(&self, frame: PhysFrame) {
        self.frames.lock().frame_mut(frame).fill(0);
    }

    /// Copies `dest.len()` bytes out of `frame` starting at `offset`
    pub(crate) fn read_frame_at(&self, frame: PhysFrame, offset: usize, dest: &mut [u8]) {
        dest.copy_from_slice(&self.frames.lock().frame(frame)[offset..offset + dest.len()]);
    }

    /// Copies `src` into `frame` starting at `offset`
    pub(crate) fn write_frame_at(&self, frame: PhysFrame, offset: usize, src: &[u8]) {
        self.frames.lock().frame_mut(frame)[offset..offset + src.len()].copy_from_slice(src);
    }
}
