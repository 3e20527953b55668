use log::{error, warn};

use super::AddressSpace;
use crate::{
    address::{PhysFrame, VirtAddr},
    modules::{
        block_device::BlockDeviceModule, eviction::EvictionPolicyModule, file::FileHandle,
        frame_allocator::FrameAllocatorModule, page_table::PageTableModule,
    },
    VmError, VmResult,
};

/// A page fault as reported by the interrupt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFault {
    /// faulting address, does not need to be page aligned
    pub address: VirtAddr,
    /// the access came from user mode
    pub user: bool,
    pub write: bool,
    /// no mapping was present, otherwise the access violated its rights
    pub not_present: bool,
}

impl<
        's,
        A: FrameAllocatorModule,
        D: BlockDeviceModule,
        P: PageTableModule,
        F: FileHandle,
        M: EvictionPolicyModule,
    > AddressSpace<'s, A, D, P, F, M>
{
    /// Entry point for the interrupt handler.
    ///
    /// Returns `true` if the faulting access can be retried. On `false` the
    /// caller should terminate the process, or panic if the error returned
    /// by [`AddressSpace::handle_fault`] is fatal.
    pub fn try_handle_fault(
        &mut self,
        address: VirtAddr,
        user: bool,
        write: bool,
        not_present: bool,
    ) -> bool {
        let fault = PageFault {
            address,
            user,
            write,
            not_present,
        };

        match self.handle_fault(fault) {
            Ok(()) => true,
            Err(err) => {
                warn!("Denied {:?}: {}", fault, err);
                false
            }
        }
    }

    pub fn handle_fault(&mut self, fault: PageFault) -> VmResult<()> {
        if !fault.not_present {
            if fault.user {
                return Err(VmError::ProtectionViolation);
            }

            error!("Kernel fault on present page at {}", fault.address);
            return Err(VmError::KernelFault);
        }

        let va = fault.address.page_round_down();
        if !self.system.config().is_user_page(va) {
            return Err(VmError::InvalidAddress);
        }

        // no stack growth, unregistered pages are always invalid
        let page = self.pages.find(va).ok_or(VmError::InvalidAddress)?;

        if fault.write && !page.writable {
            return Err(VmError::WriteToReadOnly);
        }

        if page.is_resident() {
            if self.page_table.query(va).is_some() {
                // another access resolved it already
                return Ok(());
            }

            error!("Resident page {} has no mapping", va);
            return Err(VmError::InvariantViolation);
        }

        self.fault_in(va)
    }

    /// Frame behind the user address `addr`, emulating the MMU for an access
    /// to it. Faults the page in if needed and updates accessed and dirty
    /// bits.
    pub(crate) fn user_frame(&mut self, addr: VirtAddr, write: bool) -> VmResult<PhysFrame> {
        let va = addr.page_round_down();

        let frame = match self.page_table.query(va) {
            Some(frame) => frame,
            None => {
                self.handle_fault(PageFault {
                    address: addr,
                    user: true,
                    write,
                    not_present: true,
                })?;
                self.page_table
                    .query(va)
                    .ok_or(VmError::InvariantViolation)?
            }
        };

        if write && !self.pages.find(va).map_or(false, |page| page.writable) {
            // present but read only, the MMU raises a protection fault
            return Err(VmError::ProtectionViolation);
        }

        self.page_table.set_accessed(va, true);
        if write {
            self.page_table.set_dirty(va, true);
        }

        Ok(frame)
    }
}
