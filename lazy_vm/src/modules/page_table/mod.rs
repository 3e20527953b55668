mod soft;

pub use soft::SoftPageTable;

use crate::address::{PhysFrame, VirtAddr};

/// Hardware page table of one address space.
///
/// All addresses passed to this module are page aligned.
pub trait PageTableModule {
    /// Maps `va` to `frame`.
    ///
    /// Fails if the page table could not allocate memory for the entry.
    fn install(&mut self, va: VirtAddr, frame: PhysFrame, writable: bool) -> Result<(), ()>;

    /// Removes the mapping of `va`, if there is one
    fn clear(&mut self, va: VirtAddr);

    /// Returns the frame `va` is currently mapped to
    fn query(&self, va: VirtAddr) -> Option<PhysFrame>;

    /// Was the page written to since the dirty bit was cleared the last time?
    fn is_dirty(&self, va: VirtAddr) -> bool;

    /// Was the page accessed since the accessed bit was cleared the last time?
    fn is_accessed(&self, va: VirtAddr) -> bool;

    fn set_dirty(&mut self, va: VirtAddr, dirty: bool);

    fn set_accessed(&mut self, va: VirtAddr, accessed: bool);
}
