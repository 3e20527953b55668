use crate::address::{VirtAddr, PAGE_SIZE};

/// Configuration of the virtual memory subsystem
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Lowest address a user page may have.
    ///
    /// Defaults to one page so that the null page is never mapped.
    pub user_space_start: usize,

    /// First address above user space (exclusive)
    pub user_space_end: usize,

    /// How many eviction victims may fail to persist their contents
    /// before acquiring a frame gives up with [`crate::VmError::OutOfMemory`]
    pub max_eviction_retries: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            user_space_start: PAGE_SIZE,
            user_space_end: 0x0000_8000_0000_0000,
            max_eviction_retries: 4,
        }
    }
}

impl VmConfig {
    /// Checks if the whole range `[addr, addr + len)` lies inside of user space
    pub(crate) fn is_user_range(&self, addr: VirtAddr, len: usize) -> bool {
        match addr.checked_add(len) {
            Some(end) => {
                addr.as_usize() >= self.user_space_start && end.as_usize() <= self.user_space_end
            }
            None => false,
        }
    }

    pub(crate) fn is_user_page(&self, page: VirtAddr) -> bool {
        self.is_user_range(page, PAGE_SIZE)
    }
}
