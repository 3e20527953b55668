use core::iter;

use log::{debug, warn};

use super::AddressSpace;
use crate::{
    address::{div_ceil, VirtAddr, PAGE_SIZE},
    modules::{
        block_device::BlockDeviceModule, eviction::EvictionPolicyModule, file::FileHandle,
        frame_allocator::FrameAllocatorModule, page_table::PageTableModule,
    },
    page::{FilePage, PendingPage, VirtualPage},
    VmError, VmResult,
};

/// Pages created by one call of [`AddressSpace::map`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MappingGroup {
    pub(crate) base: VirtAddr,
    /// mapped bytes, the last page may be partially used
    pub(crate) length: usize,
    pub(crate) page_count: usize,
}

impl MappingGroup {
    pub(crate) fn contains(&self, addr: VirtAddr) -> bool {
        let start = self.base.as_usize();
        let addr = addr.as_usize();
        addr >= start && addr - start < self.page_count * PAGE_SIZE
    }

    pub(crate) fn pages(&self) -> impl Iterator<Item = VirtAddr> {
        let base = self.base.as_usize();
        (0..self.page_count).map(move |i| VirtAddr::new(base + i * PAGE_SIZE))
    }
}

pub(crate) struct MappingTable {
    groups: Vec<MappingGroup>,
}

impl MappingTable {
    pub(crate) fn new() -> Self {
        Self { groups: Vec::new() }
    }

    pub(crate) fn insert(&mut self, group: MappingGroup) {
        self.groups.push(group);
    }

    /// Checks if any page of `group` is already covered by another group
    pub(crate) fn overlaps(&self, group: &MappingGroup) -> bool {
        group
            .pages()
            .any(|va| self.groups.iter().any(|other| other.contains(va)))
    }

    /// Removes the group that `addr` belongs to
    pub(crate) fn take_containing(&mut self, addr: VirtAddr) -> Option<MappingGroup> {
        let index = self.groups.iter().position(|group| group.contains(addr))?;
        Some(self.groups.swap_remove(index))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &MappingGroup> {
        self.groups.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.groups.len()
    }

    pub(crate) fn clear(&mut self) {
        self.groups.clear();
    }

    pub(crate) fn release_storage(&mut self) {
        self.groups = Vec::new();
    }
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
    /// Maps `length` bytes of `file` starting at `offset` to `addr`.
    ///
    /// Nothing is read until the pages are touched. The first page keeps
    /// `file`, every other page gets its own duplicated handle, so the
    /// mapping stays valid after the caller closed its handle. Bytes of the
    /// last page beyond `length` read as zero and are never written back.
    ///
    /// Either all pages are registered or none.
    pub fn map(
        &mut self,
        addr: VirtAddr,
        length: usize,
        writable: bool,
        file: F,
        offset: usize,
    ) -> VmResult<VirtAddr> {
        if !addr.is_page_aligned() || length == 0 || offset.checked_add(length).is_none() {
            return Err(VmError::InvalidArgument);
        }
        if !self.system.config().is_user_range(addr, length) {
            return Err(VmError::InvalidAddress);
        }

        let group = MappingGroup {
            base: addr,
            length,
            page_count: div_ceil(length, PAGE_SIZE),
        };
        if self.mappings.overlaps(&group) {
            return Err(VmError::AlreadyMapped);
        }
        let page_count = group.page_count;

        let mut duplicates = Vec::with_capacity(page_count - 1);
        for _ in 1..page_count {
            let handle = file.duplicate().map_err(|_| {
                warn!("Could not duplicate file handle for mapping at {}", addr);
                VmError::FileIo
            })?;
            duplicates.push(handle);
        }

        for (i, handle) in iter::once(file).chain(duplicates).enumerate() {
            let page = VirtualPage::new_uninit(
                VirtAddr::new(addr.as_usize() + i * PAGE_SIZE),
                writable,
                PendingPage::FileMapped(FilePage {
                    file: handle,
                    offset: offset + i * PAGE_SIZE,
                    length: PAGE_SIZE.min(length - i * PAGE_SIZE),
                }),
            );

            if let Err(err) = self.pages.insert(page) {
                warn!(
                    "Mapping at {} failed at page {} of {}: {}",
                    addr, i, page_count, err
                );

                // none of these were touched yet, dropping them closes their handles
                for j in 0..i {
                    self.pages.take(VirtAddr::new(addr.as_usize() + j * PAGE_SIZE));
                }
                return Err(err);
            }
        }

        self.mappings.insert(group);

        debug!(
            "Mapped {} bytes at file offset {} to {} ({} pages)",
            length, offset, addr, page_count
        );
        Ok(addr)
    }

    /// Removes the mapping `addr` belongs to.
    ///
    /// Dirty pages are written back to the file and all handles of the
    /// mapping are closed. Pages of the mapping that were already removed
    /// are skipped.
    pub fn unmap(&mut self, addr: VirtAddr) -> VmResult<()> {
        let group = self
            .mappings
            .take_containing(addr)
            .ok_or(VmError::NoSuchMapping)?;

        let mut result = Ok(());
        for va in group.pages() {
            if !self.pages.contains(va) {
                continue;
            }

            if let Err(err) = self.remove_page(va) {
                warn!("Could not cleanly unmap page {}: {}", va, err);
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }

        debug!(
            "Unmapped {} bytes at {} ({} pages)",
            group.length, group.base, group.page_count
        );
        result
    }

    /// Number of live mappings created by [`AddressSpace::map`]
    pub fn mapping_count(&self) -> usize {
        self.mappings.len()
    }
}
