mod copy;
mod frame_manager;
mod mmap;
mod page_fault;

use std::collections::HashSet;

use log::{debug, error, warn};

use mmap::MappingTable;
pub use page_fault::PageFault;

use crate::{
    address::{VirtAddr, PAGE_SIZE},
    backing,
    frame_table::FrameTable,
    modules::{
        block_device::BlockDeviceModule,
        eviction::{EvictionPolicyModule, RankedEvictionPolicy},
        file::FileHandle,
        frame_allocator::FrameAllocatorModule,
        page_table::PageTableModule,
    },
    page::{FilePage, PageInfo, PageKind, PendingPage, VirtualPage},
    supplemental_page_table::SupplementalPageTable,
    VmError, VmResult, VmSystem,
};

/// What [`AddressSpace::teardown`] leaves behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownMode {
    /// Process exit, the storage of all tables is released as well
    Destroy,
    /// Program replacement, the tables stay allocated and can be reused
    ClearForExec,
}

/// Virtual memory of one process.
///
/// Pages are registered lazily and only get a frame of the shared
/// [`VmSystem`] on their first fault. If the frame pool runs dry, a resident
/// page of this address space is evicted to make room.
///
/// Concurrent access has to be serialized by the owner, e.g. by putting the
/// address space behind a lock.
pub struct AddressSpace<
    's,
    A: FrameAllocatorModule,
    D: BlockDeviceModule,
    P: PageTableModule,
    F: FileHandle,
    M: EvictionPolicyModule = RankedEvictionPolicy,
> {
    system: &'s VmSystem<A, D>,

    pages: SupplementalPageTable<F>,

    /// frames this address space currently holds
    frames: FrameTable,

    page_table: P,

    eviction: M,

    mappings: MappingTable,
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
    pub fn new(system: &'s VmSystem<A, D>, page_table: P) -> Self {
        Self {
            system,
            pages: SupplementalPageTable::new(),
            frames: FrameTable::new(),
            page_table,
            eviction: M::new(),
            mappings: MappingTable::new(),
        }
    }

    pub fn system(&self) -> &'s VmSystem<A, D> {
        self.system
    }

    /// Registers a fresh anonymous page at `va`.
    ///
    /// No frame is used until the page is touched for the first time, it
    /// reads as zeros then.
    pub fn allocate_anonymous(&mut self, va: VirtAddr, writable: bool) -> VmResult<()> {
        if !va.is_page_aligned() {
            return Err(VmError::InvalidArgument);
        }
        if !self.system.config().is_user_page(va) {
            return Err(VmError::InvalidAddress);
        }

        self.pages
            .insert(VirtualPage::new_uninit(va, writable, PendingPage::Anonymous))
    }

    /// Registers an anonymous page at `va` whose contents are loaded from
    /// `file` on its first fault.
    ///
    /// `read_bytes` bytes starting at `offset` are read, the rest of the
    /// page is zero filled. After that the page is an ordinary anonymous
    /// page and the file is closed.
    pub fn allocate_with_initializer(
        &mut self,
        va: VirtAddr,
        writable: bool,
        file: F,
        offset: usize,
        read_bytes: usize,
    ) -> VmResult<()> {
        if !va.is_page_aligned()
            || read_bytes > PAGE_SIZE
            || offset.checked_add(read_bytes).is_none()
        {
            return Err(VmError::InvalidArgument);
        }
        if !self.system.config().is_user_page(va) {
            return Err(VmError::InvalidAddress);
        }

        let segment = FilePage {
            file,
            offset,
            length: read_bytes,
        };
        self.pages.insert(VirtualPage::new_uninit(
            va,
            writable,
            PendingPage::Segment(segment),
        ))
    }

    /// Makes the already registered page at `va` resident right away
    pub fn claim_page(&mut self, va: VirtAddr) -> VmResult<()> {
        if !va.is_page_aligned() {
            return Err(VmError::InvalidArgument);
        }

        let page = self.pages.find(va).ok_or(VmError::InvalidAddress)?;
        if page.is_resident() {
            return Ok(());
        }

        self.fault_in(va)
    }

    /// Removes the page at `va` and releases its frame, swap slot and file
    /// handle. Modified file backed contents are written back first.
    pub fn remove_page(&mut self, va: VirtAddr) -> VmResult<()> {
        if !va.is_page_aligned() {
            return Err(VmError::InvalidArgument);
        }

        let page = self.pages.take(va).ok_or(VmError::InvalidAddress)?;
        let mut result = Ok(());
        let frame = match page.frame {
            Some(frame_id) => match self.frames.remove(frame_id) {
                Some(frame) => Some(frame.phys),
                None => {
                    error!("Page {} refers to a frame that does not exist", va);
                    self.page_table.clear(va);
                    result = Err(VmError::InvariantViolation);
                    None
                }
            },
            None => None,
        };

        // the swap slot and file handle are released even without a frame
        let destroyed = backing::destroy(page, frame, self.system, &mut self.page_table);
        result.and(destroyed)
    }

    /// Removes every page.
    ///
    /// Cleanup continues on errors, the first one is returned at the end.
    pub fn teardown(&mut self, mode: TeardownMode) -> VmResult<()> {
        let mut result = Ok(());
        let page_count = self.pages.len();

        for va in self.pages.addresses() {
            if let Err(err) = self.remove_page(va) {
                warn!("Could not cleanly remove page {}: {}", va, err);
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }

        self.mappings.clear();

        // frames nobody refers to anymore
        let leaked: Vec<_> = self.frames.iter().map(|(frame_id, _)| frame_id).collect();
        for frame_id in leaked {
            if let Some(frame) = self.frames.remove(frame_id) {
                error!("Frame {:?} was left behind by teardown", frame.phys);
                self.system.release_frame(frame.phys);
            }
        }

        if mode == TeardownMode::Destroy {
            self.pages = SupplementalPageTable::new();
            self.frames.release_storage();
            self.mappings.release_storage();
        }

        debug!("Tore down {} pages ({:?})", page_count, mode);
        result
    }

    pub fn page_info(&self, addr: VirtAddr) -> Option<PageInfo> {
        self.pages.find(addr.page_round_down()).map(|page| page.info())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of pages that are currently backed by a frame
    pub fn resident_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of pages whose contents currently live in swap
    pub fn swapped_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|page| page.swap_slot().is_some())
            .count()
    }

    pub fn page_table(&self) -> &P {
        &self.page_table
    }

    pub fn page_table_mut(&mut self) -> &mut P {
        &mut self.page_table
    }

    /// Copies `buf.len()` bytes of user memory starting at `addr` into `buf`.
    ///
    /// Pages are faulted in like the MMU would do it and the accessed bit
    /// of every touched page is set.
    pub fn read_user(&mut self, addr: VirtAddr, buf: &mut [u8]) -> VmResult<()> {
        let mut done = 0;
        while done < buf.len() {
            let current = addr.checked_add(done).ok_or(VmError::InvalidAddress)?;
            let offset = current.page_offset();
            let len = (PAGE_SIZE - offset).min(buf.len() - done);

            let frame = self.user_frame(current, false)?;
            self.system
                .read_frame_at(frame, offset, &mut buf[done..done + len]);
            done += len;
        }

        Ok(())
    }

    /// Copies `data` into user memory starting at `addr`.
    ///
    /// Sets the accessed and dirty bits of every touched page.
    pub fn write_user(&mut self, addr: VirtAddr, data: &[u8]) -> VmResult<()> {
        let mut done = 0;
        while done < data.len() {
            let current = addr.checked_add(done).ok_or(VmError::InvalidAddress)?;
            let offset = current.page_offset();
            let len = (PAGE_SIZE - offset).min(data.len() - done);

            let frame = self.user_frame(current, true)?;
            self.system
                .write_frame_at(frame, offset, &data[done..done + len]);
            done += len;
        }

        Ok(())
    }

    /// Checks that pages and frames agree on each other, that every
    /// installed mapping points at the frame of its page and that no two
    /// pages share a swap slot.
    pub fn check_integrity(&self) -> VmResult<()> {
        let mut slots = HashSet::new();

        for page in self.pages.iter() {
            if let Some(frame_id) = page.frame {
                let frame = self.frames.get(frame_id).ok_or_else(|| {
                    error!("Page {} refers to a missing frame", page.va);
                    VmError::InvariantViolation
                })?;

                if frame.page != Some(page.va) {
                    error!(
                        "Frame of page {} refers back to {:?}",
                        page.va, frame.page
                    );
                    return Err(VmError::InvariantViolation);
                }

                if self.page_table.query(page.va) != Some(frame.phys) {
                    error!("Page {} is resident but not mapped to its frame", page.va);
                    return Err(VmError::InvariantViolation);
                }
            } else if self.page_table.query(page.va).is_some() {
                error!("Page {} is mapped without a frame", page.va);
                return Err(VmError::InvariantViolation);
            }

            if let Some(slot) = page.swap_slot() {
                if page.is_resident() || !self.system.swap().is_slot_used(slot) {
                    error!("Swap slot {} of page {} is invalid", slot.index(), page.va);
                    return Err(VmError::InvariantViolation);
                }

                if !slots.insert(slot) {
                    error!("Swap slot {} is owned by more than one page", slot.index());
                    return Err(VmError::InvariantViolation);
                }
            }

            if matches!(page.kind, PageKind::Uninit(_)) && page.is_resident() {
                error!("Uninitialized page {} is resident", page.va);
                return Err(VmError::InvariantViolation);
            }
        }

        for (frame_id, frame) in self.frames.iter() {
            let page = frame.page.and_then(|va| self.pages.find(va));
            if page.and_then(|page| page.frame) != Some(frame_id) {
                error!("Frame {:?} is not owned by the page it refers to", frame.phys);
                return Err(VmError::InvariantViolation);
            }
        }

        Ok(())
    }
}

impl<
        A: FrameAllocatorModule,
        D: BlockDeviceModule,
        P: PageTableModule,
        F: FileHandle,
        M: EvictionPolicyModule,
    > Drop for AddressSpace<'_, A, D, P, F, M>
{
    fn drop(&mut self) {
        // errors were logged by teardown already
        let _ = self.teardown(TeardownMode::Destroy);
    }
}
