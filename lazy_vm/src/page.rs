use crate::{
    address::VirtAddr, frame_table::FrameId, modules::file::FileHandle, swap_table::SwapSlot,
};

/// Anonymous page, its contents live either in a frame or in a swap slot
#[derive(Debug, Default)]
pub(crate) struct AnonPage {
    /// The swap slot record of this page. Only set while the page is not resident.
    pub(crate) slot: Option<SwapSlot>,
}

/// Page that mirrors `length` bytes of a file starting at `offset`.
///
/// The rest of the page is zero filled and never written back.
#[derive(Debug)]
pub(crate) struct FilePage<F: FileHandle> {
    pub(crate) file: F,
    pub(crate) offset: usize,
    pub(crate) length: usize,
}

impl<F: FileHandle> FilePage<F> {
    /// Creates a copy of this descriptor with its own file handle
    pub(crate) fn duplicate(&self) -> Result<Self, ()> {
        Ok(Self {
            file: self.file.duplicate()?,
            offset: self.offset,
            length: self.length,
        })
    }
}

/// What an uninitialized page turns into on its first fault
#[derive(Debug)]
pub(crate) enum PendingPage<F: FileHandle> {
    Anonymous,
    FileMapped(FilePage<F>),
    /// Anonymous page whose first contents are read from a file, like a
    /// segment of an executable. The file is not touched afterwards.
    Segment(FilePage<F>),
}

#[derive(Debug)]
pub(crate) enum PageKind<F: FileHandle> {
    /// Lazily allocated page that was never faulted in
    Uninit(PendingPage<F>),
    Anonymous(AnonPage),
    FileMapped(FilePage<F>),
}

/// Backing kind of a page as seen from outside of this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Uninit,
    Anonymous,
    FileMapped,
}

/// Snapshot of the state of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub va: VirtAddr,
    pub writable: bool,
    pub page_type: PageType,
    /// What the page is or becomes on its first fault
    pub target_type: PageType,
    /// Backed by a frame and mapped
    pub resident: bool,
    /// Contents currently live in a swap slot
    pub swapped: bool,
}

/// One entry of the supplemental page table
#[derive(Debug)]
pub(crate) struct VirtualPage<F: FileHandle> {
    pub(crate) va: VirtAddr,
    pub(crate) writable: bool,
    pub(crate) kind: PageKind<F>,
    /// Frame this page is resident in
    pub(crate) frame: Option<FrameId>,
}

impl<F: FileHandle> VirtualPage<F> {
    pub(crate) fn new_uninit(va: VirtAddr, writable: bool, pending: PendingPage<F>) -> Self {
        debug_assert!(va.is_page_aligned());
        Self {
            va,
            writable,
            kind: PageKind::Uninit(pending),
            frame: None,
        }
    }

    pub(crate) fn is_resident(&self) -> bool {
        self.frame.is_some()
    }

    pub(crate) fn swap_slot(&self) -> Option<SwapSlot> {
        match &self.kind {
            PageKind::Anonymous(anon) => anon.slot,
            _ => None,
        }
    }

    /// Fresh pages have no contents yet, a fault zero fills them
    pub(crate) fn is_fresh(&self) -> bool {
        match &self.kind {
            PageKind::Uninit(PendingPage::Anonymous) => true,
            PageKind::Anonymous(anon) => !self.is_resident() && anon.slot.is_none(),
            _ => false,
        }
    }

    pub(crate) fn page_type(&self) -> PageType {
        match self.kind {
            PageKind::Uninit(_) => PageType::Uninit,
            PageKind::Anonymous(_) => PageType::Anonymous,
            PageKind::FileMapped(_) => PageType::FileMapped,
        }
    }

    pub(crate) fn target_type(&self) -> PageType {
        match self.kind {
            PageKind::Uninit(PendingPage::Anonymous | PendingPage::Segment(_)) => {
                PageType::Anonymous
            }
            PageKind::Uninit(PendingPage::FileMapped(_)) => PageType::FileMapped,
            _ => self.page_type(),
        }
    }

    pub(crate) fn info(&self) -> PageInfo {
        PageInfo {
            va: self.va,
            writable: self.writable,
            page_type: self.page_type(),
            target_type: self.target_type(),
            resident: self.is_resident(),
            swapped: self.swap_slot().is_some(),
        }
    }

    /// Turns an uninitialized page into the kind it was created for.
    ///
    /// Does nothing for pages that are initialized already. Segment pages
    /// stay uninitialized until their contents were loaded.
    pub(crate) fn initialize(&mut self) {
        if !matches!(
            self.kind,
            PageKind::Uninit(PendingPage::Anonymous | PendingPage::FileMapped(_))
        ) {
            return;
        }

        let kind = core::mem::replace(&mut self.kind, PageKind::Anonymous(AnonPage::default()));
        self.kind = match kind {
            PageKind::Uninit(PendingPage::Anonymous) => PageKind::Anonymous(AnonPage::default()),
            PageKind::Uninit(PendingPage::FileMapped(file_page)) => {
                PageKind::FileMapped(file_page)
            }
            initialized => initialized,
        };
    }
}

#[cfg(test)]
mod test {
    use super::{PageKind, PageType, PendingPage, VirtualPage};
    use crate::{
        address::{VirtAddr, PAGE_SIZE},
        modules::file::{FileHandle, MemoryFile},
        page::FilePage,
    };

    #[test]
    fn test_initialize_anonymous() {
        let mut page: VirtualPage<MemoryFile> =
            VirtualPage::new_uninit(VirtAddr::new(PAGE_SIZE), true, PendingPage::Anonymous);
        assert!(page.is_fresh());
        assert_eq!(page.page_type(), PageType::Uninit);

        assert_eq!(page.info().target_type, PageType::Anonymous);

        page.initialize();
        assert_eq!(page.page_type(), PageType::Anonymous);
        assert!(page.is_fresh());
        assert!(!page.info().swapped);
    }

    #[test]
    fn test_initialize_file_mapped_keeps_descriptor() {
        let file = MemoryFile::new(vec![0u8; 100]);
        let pending = PendingPage::FileMapped(FilePage {
            file: file.duplicate().unwrap(),
            offset: 40,
            length: 60,
        });
        let mut page = VirtualPage::new_uninit(VirtAddr::new(PAGE_SIZE), false, pending);
        assert!(!page.is_fresh());

        page.initialize();
        match &page.kind {
            PageKind::FileMapped(file_page) => {
                assert_eq!(file_page.offset, 40);
                assert_eq!(file_page.length, 60);
            }
            _ => panic!("page should be file mapped"),
        }

        // the descriptor still holds its handle
        assert_eq!(file.open_handles(), 2);
        drop(page);
        assert_eq!(file.open_handles(), 1);
    }

    #[test]
    fn test_segment_stays_uninit_until_loaded() {
        let file = MemoryFile::new(vec![7u8; 10]);
        let pending = PendingPage::Segment(FilePage {
            file: file.duplicate().unwrap(),
            offset: 0,
            length: 10,
        });
        let mut page = VirtualPage::new_uninit(VirtAddr::new(PAGE_SIZE), true, pending);
        assert!(!page.is_fresh());

        page.initialize();
        let info = page.info();
        assert_eq!(info.page_type, PageType::Uninit);
        assert_eq!(info.target_type, PageType::Anonymous);
    }
}
