mod pool;

pub use pool::PoolFrameAllocator;

use crate::address::PhysFrame;

/// Allocator for physical frames of user memory.
///
/// Handed out frames are not zeroed.
pub trait FrameAllocatorModule {
    /// Takes a free frame out of the pool
    fn obtain(&mut self) -> Option<PhysFrame>;

    /// Puts `frame` back into the pool
    fn release(&mut self, frame: PhysFrame);

    /// Kernel view of the contents of `frame`, exactly one page long
    fn frame(&self, frame: PhysFrame) -> &[u8];

    /// Mutable kernel view of the contents of `frame`, exactly one page long
    fn frame_mut(&mut self, frame: PhysFrame) -> &mut [u8];

    /// Total number of frames managed by this module
    fn capacity(&self) -> usize;

    /// Number of frames that can still be obtained
    fn free_count(&self) -> usize;
}
