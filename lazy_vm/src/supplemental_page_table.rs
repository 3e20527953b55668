use std::collections::{btree_map::Entry, BTreeMap};

use crate::{
    address::VirtAddr,
    modules::file::FileHandle,
    page::VirtualPage,
    VmError, VmResult,
};

/// Per process map from page address to the metadata of that page.
///
/// Only the bookkeeping lives here, tearing down the resources of an entry
/// is done by [`crate::AddressSpace`].
pub(crate) struct SupplementalPageTable<F: FileHandle> {
    pages: BTreeMap<VirtAddr, VirtualPage<F>>,
}

impl<F: FileHandle> SupplementalPageTable<F> {
    pub(crate) fn new() -> Self {
        Self {
            pages: BTreeMap::new(),
        }
    }

    pub(crate) fn find(&self, va: VirtAddr) -> Option<&VirtualPage<F>> {
        debug_assert!(va.is_page_aligned(), "{} is not page aligned", va);
        self.pages.get(&va)
    }

    pub(crate) fn find_mut(&mut self, va: VirtAddr) -> Option<&mut VirtualPage<F>> {
        debug_assert!(va.is_page_aligned(), "{} is not page aligned", va);
        self.pages.get_mut(&va)
    }

    /// Inserts `page` if there is no entry at its address yet.
    ///
    /// On failure, `page` is dropped.
    pub(crate) fn insert(&mut self, page: VirtualPage<F>) -> VmResult<()> {
        debug_assert!(page.va.is_page_aligned());
        match self.pages.entry(page.va) {
            Entry::Occupied(_) => Err(VmError::AlreadyMapped),
            Entry::Vacant(entry) => {
                entry.insert(page);
                Ok(())
            }
        }
    }

    /// Detaches the entry at `va` from the table
    pub(crate) fn take(&mut self, va: VirtAddr) -> Option<VirtualPage<F>> {
        self.pages.remove(&va)
    }

    pub(crate) fn contains(&self, va: VirtAddr) -> bool {
        self.pages.contains_key(&va)
    }

    pub(crate) fn len(&self) -> usize {
        self.pages.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &VirtualPage<F>> {
        self.pages.values()
    }

    /// Addresses of all pages in ascending order
    pub(crate) fn addresses(&self) -> Vec<VirtAddr> {
        self.pages.keys().copied().collect()
    }

    /// Addresses of all resident pages in ascending order
    pub(crate) fn resident_pages(&self) -> impl Iterator<Item = VirtAddr> + '_ {
        self.pages
            .values()
            .filter(|page| page.is_resident())
            .map(|page| page.va)
    }
}
