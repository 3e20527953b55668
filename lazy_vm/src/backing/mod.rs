//! Page contents move between frames and their backing store here.
//!
//! Every function dispatches on the [`PageKind`] of the page, the kind
//! specific work lives in [`anon`] and [`file`].

pub(crate) mod anon;
pub(crate) mod file;

use log::{error, trace};

use crate::{
    address::PhysFrame,
    modules::{
        block_device::BlockDeviceModule, file::FileHandle,
        frame_allocator::FrameAllocatorModule, page_table::PageTableModule,
    },
    page::{AnonPage, PageKind, PendingPage, VirtualPage},
    VmError, VmResult, VmSystem,
};

/// Fills `frame` with the contents of `page`.
///
/// Uninitialized pages are turned into their concrete kind first. Segment
/// pages become anonymous once their contents were loaded, so they are
/// swapped like any other anonymous page from then on.
pub(crate) fn swap_in<A, D, F>(
    page: &mut VirtualPage<F>,
    frame: PhysFrame,
    system: &VmSystem<A, D>,
) -> VmResult<()>
where
    A: FrameAllocatorModule,
    D: BlockDeviceModule,
    F: FileHandle,
{
    page.initialize();

    let va = page.va;
    match &mut page.kind {
        PageKind::Anonymous(anon) => anon::swap_in(anon, va, frame, system),
        PageKind::FileMapped(file) => file::swap_in(file, va, frame, system),
        PageKind::Uninit(PendingPage::Segment(segment)) => {
            file::swap_in(segment, va, frame, system)?;
            // drops the handle of the segment
            page.kind = PageKind::Anonymous(AnonPage::default());
            trace!("Initialized page {} from its segment", va);
            Ok(())
        }
        PageKind::Uninit(_) => {
            error!("Page {} is still uninitialized", va);
            Err(VmError::InvariantViolation)
        }
    }
}

/// Persists the contents of the resident `page` so that `frame` can be reused
pub(crate) fn swap_out<A, D, P, F>(
    page: &mut VirtualPage<F>,
    frame: PhysFrame,
    system: &VmSystem<A, D>,
    page_table: &mut P,
) -> VmResult<()>
where
    A: FrameAllocatorModule,
    D: BlockDeviceModule,
    P: PageTableModule,
    F: FileHandle,
{
    let va = page.va;
    match &mut page.kind {
        PageKind::Anonymous(anon) => anon::swap_out(anon, va, frame, system),
        PageKind::FileMapped(file) => file::swap_out(file, va, frame, system, page_table),
        PageKind::Uninit(_) => {
            error!("Uninitialized page {} cannot be resident", va);
            Err(VmError::InvariantViolation)
        }
    }
}

/// Releases everything `page` holds.
///
/// `frame` has to be the frame the page was resident in, it was already
/// detached from the frame table by the caller. Cleanup always runs to the
/// end, the first error encountered is returned afterwards.
pub(crate) fn destroy<A, D, P, F>(
    page: VirtualPage<F>,
    frame: Option<PhysFrame>,
    system: &VmSystem<A, D>,
    page_table: &mut P,
) -> VmResult<()>
where
    A: FrameAllocatorModule,
    D: BlockDeviceModule,
    P: PageTableModule,
    F: FileHandle,
{
    let va = page.va;
    match page.kind {
        PageKind::Anonymous(anon) => anon::destroy(anon, va, frame, system, page_table),
        PageKind::FileMapped(file) => file::destroy(file, va, frame, system, page_table),
        PageKind::Uninit(_) => match frame {
            Some(frame) => {
                error!("Uninitialized page {} was resident", va);
                page_table.clear(va);
                system.release_frame(frame);
                Err(VmError::InvariantViolation)
            }
            None => Ok(()),
        },
    }
}
