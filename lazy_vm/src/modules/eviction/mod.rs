mod ranked;

pub use ranked::RankedEvictionPolicy;

use super::page_table::PageTableModule;
use crate::address::VirtAddr;

/// Decides which resident page has to leave its frame if the frame pool
/// is exhausted.
pub trait EvictionPolicyModule {
    /// Creates a new eviction policy object.
    fn new() -> Self;

    /// Selects one of `candidates` as victim.
    ///
    /// `candidates` yields the resident pages of the faulting address space
    /// in ascending address order. Returns `None` if `candidates` is empty.
    fn select_victim<P: PageTableModule, I: Iterator<Item = VirtAddr>>(
        &mut self,
        candidates: I,
        page_table: &P,
    ) -> Option<VirtAddr>;
}
