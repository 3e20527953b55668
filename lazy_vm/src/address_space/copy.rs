use log::{debug, error, trace, warn};

use super::AddressSpace;
use crate::{
    address::{new_page_buffer, PageBuffer, VirtAddr},
    backing,
    modules::{
        block_device::BlockDeviceModule, eviction::EvictionPolicyModule, file::FileHandle,
        frame_allocator::FrameAllocatorModule, page_table::PageTableModule,
    },
    page::{AnonPage, PageKind, PendingPage, VirtualPage},
    swap_table::SwapSlot,
    VmError, VmResult,
};

impl<
        's,
        A: FrameAllocatorModule,
        D: BlockDeviceModule,
        P: PageTableModule,
        F: FileHandle,
        M: EvictionPolicyModule,
    > AddressSpace<'s, A, D, P, F, M>
{
    /// Copies every page of `src` into this address space, as needed for
    /// `fork`.
    ///
    /// Nothing is shared afterwards: anonymous pages get their own frame or
    /// swap slot, file backed and segment pages their own file handle and
    /// are loaded again on their next fault. Modified file backed pages of `src` are
    /// written back first so the copy sees their contents.
    ///
    /// If any page cannot be copied, all pages copied so far are removed again.
    pub fn copy_from(&mut self, src: &mut Self) -> VmResult<()> {
        if !core::ptr::eq(self.system, src.system) {
            return Err(VmError::InvalidArgument);
        }

        let mut copied: Vec<VirtAddr> = Vec::new();
        for va in src.pages.addresses() {
            if let Err(err) = self.copy_page(src, va) {
                warn!(
                    "Copying page {} failed: {}, removing {} copied pages",
                    va,
                    err,
                    copied.len()
                );

                for va in copied {
                    if let Err(err) = self.remove_page(va) {
                        error!("Could not roll back copy of page {}: {}", va, err);
                    }
                }
                return Err(err);
            }

            copied.push(va);
        }

        for group in src.mappings.iter() {
            self.mappings.insert(group.clone());
        }

        debug!("Copied {} pages", copied.len());
        Ok(())
    }

    fn copy_page(&mut self, src: &mut Self, va: VirtAddr) -> VmResult<()> {
        if self.pages.contains(va) {
            return Err(VmError::AlreadyMapped);
        }

        let system = self.system;
        let page = src.pages.find_mut(va).ok_or(VmError::InvariantViolation)?;
        let writable = page.writable;

        let pending = match &mut page.kind {
            PageKind::Uninit(PendingPage::Anonymous) => PendingPage::Anonymous,
            PageKind::Uninit(PendingPage::FileMapped(file_page)) => {
                PendingPage::FileMapped(file_page.duplicate().map_err(|_| VmError::FileIo)?)
            }
            PageKind::Uninit(PendingPage::Segment(segment)) => {
                PendingPage::Segment(segment.duplicate().map_err(|_| VmError::FileIo)?)
            }
            PageKind::FileMapped(file_page) => {
                if let Some(frame_id) = page.frame {
                    let frame = src
                        .frames
                        .get(frame_id)
                        .ok_or(VmError::InvariantViolation)?;

                    // the copy is loaded from the file, so it has to be up to date
                    backing::file::swap_out(
                        file_page,
                        va,
                        frame.phys,
                        system,
                        &mut src.page_table,
                    )?;
                }

                PendingPage::FileMapped(file_page.duplicate().map_err(|_| VmError::FileIo)?)
            }
            PageKind::Anonymous(anon) => match (page.frame, anon.slot) {
                (Some(frame_id), _) => {
                    let frame = src
                        .frames
                        .get(frame_id)
                        .ok_or(VmError::InvariantViolation)?;

                    let mut contents = new_page_buffer();
                    system.read_frame(frame.phys, &mut contents);
                    return self.insert_resident_copy(va, writable, &contents);
                }
                (None, Some(slot)) => {
                    let copy = backing::anon::duplicate_slot(slot, system)?;
                    return self.insert_swapped_copy(va, writable, copy);
                }
                (None, None) => PendingPage::Anonymous,
            },
        };

        self.pages
            .insert(VirtualPage::new_uninit(va, writable, pending))
    }

    /// Registers an anonymous page at `va` that is resident with `contents`.
    ///
    /// If the frame pool is empty, the contents go to a swap slot instead.
    fn insert_resident_copy(
        &mut self,
        va: VirtAddr,
        writable: bool,
        contents: &PageBuffer,
    ) -> VmResult<()> {
        let Some(phys) = self.system.obtain_frame() else {
            trace!("No free frame for copy of page {}, storing it in swap", va);
            let slot = backing::anon::store_in_slot(contents, self.system)?;
            return self.insert_swapped_copy(va, writable, slot);
        };
        let frame_id = self.frames.insert(phys);

        if let Err(err) = self.pages.insert(VirtualPage {
            va,
            writable,
            kind: PageKind::Anonymous(AnonPage::default()),
            frame: None,
        }) {
            self.discard_frame(frame_id);
            return Err(err);
        }

        if let Err(err) = self.bind(frame_id, va) {
            self.discard_frame(frame_id);
            self.pages.take(va);
            return Err(err);
        }

        self.system.write_frame(phys, contents);

        if self.page_table.install(va, phys, writable).is_err() {
            self.unbind(va);
            self.pages.take(va);
            return Err(VmError::InstallFailed);
        }

        Ok(())
    }

    /// Registers an anonymous page at `va` whose contents live in `slot`
    fn insert_swapped_copy(
        &mut self,
        va: VirtAddr,
        writable: bool,
        slot: SwapSlot,
    ) -> VmResult<()> {
        let page = VirtualPage {
            va,
            writable,
            kind: PageKind::Anonymous(AnonPage { slot: Some(slot) }),
            frame: None,
        };

        if let Err(err) = self.pages.insert(page) {
            self.system.swap().release_slot(slot);
            return Err(err);
        }
        Ok(())
    }
}
