use log::{debug, error, trace, warn};

use super::AddressSpace;
use crate::{
    address::{PhysFrame, VirtAddr},
    backing,
    frame_table::FrameId,
    modules::{
        block_device::BlockDeviceModule, eviction::EvictionPolicyModule, file::FileHandle,
        frame_allocator::FrameAllocatorModule, page_table::PageTableModule,
    },
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
    /// Gets a frame from the shared pool or, if it is empty, by evicting
    /// one of the resident pages of this address space.
    ///
    /// The returned frame is not bound to any page yet.
    pub(crate) fn acquire_frame(&mut self) -> VmResult<FrameId> {
        if let Some(phys) = self.system.obtain_frame() {
            return Ok(self.frames.insert(phys));
        }

        // victims that could not be persisted
        let mut rejected: Vec<VirtAddr> = Vec::new();

        loop {
            let victim = self.eviction.select_victim(
                self.pages
                    .resident_pages()
                    .filter(|va| !rejected.contains(va)),
                &self.page_table,
            );

            let Some(victim) = victim else {
                error!(
                    "Frame pool is empty and no page can be evicted ({} rejected)",
                    rejected.len()
                );
                return Err(VmError::OutOfMemory);
            };

            match self.evict(victim) {
                Ok(frame_id) => return Ok(frame_id),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!("Could not evict page {}: {}", victim, err);
                    rejected.push(victim);

                    if rejected.len() > self.system.config().max_eviction_retries {
                        error!("Giving up after {} failed evictions", rejected.len());
                        return Err(VmError::OutOfMemory);
                    }
                }
            }
        }
    }

    /// Persists the resident page `va` and detaches it from its frame.
    ///
    /// On success the frame stays in the frame table without a page, ready
    /// to be bound again. If persisting fails, nothing changes.
    pub(crate) fn evict(&mut self, va: VirtAddr) -> VmResult<FrameId> {
        let system = self.system;
        let page = self.pages.find_mut(va).ok_or(VmError::InvariantViolation)?;
        let frame_id = page.frame.ok_or(VmError::InvariantViolation)?;
        let frame = self
            .frames
            .get_mut(frame_id)
            .ok_or(VmError::InvariantViolation)?;

        if frame.page != Some(va) {
            error!(
                "Frame {:?} of page {} refers back to {:?}",
                frame.phys, va, frame.page
            );
            return Err(VmError::InvariantViolation);
        }

        backing::swap_out(page, frame.phys, system, &mut self.page_table)?;

        self.page_table.clear(va);
        page.frame = None;
        frame.page = None;

        debug!("Evicted page {} from frame {:?}", va, frame.phys);
        Ok(frame_id)
    }

    /// Links page and frame to each other
    pub(crate) fn bind(&mut self, frame_id: FrameId, va: VirtAddr) -> VmResult<PhysFrame> {
        let page = self.pages.find_mut(va).ok_or(VmError::InvariantViolation)?;
        let frame = self
            .frames
            .get_mut(frame_id)
            .ok_or(VmError::InvariantViolation)?;

        if page.frame.is_some() || frame.page.is_some() {
            error!("Page {} or frame {:?} is already bound", va, frame.phys);
            return Err(VmError::InvariantViolation);
        }

        page.frame = Some(frame_id);
        frame.page = Some(va);
        Ok(frame.phys)
    }

    /// Detaches `va` from its frame and gives the frame back to the pool
    pub(crate) fn unbind(&mut self, va: VirtAddr) {
        let frame_id = match self.pages.find_mut(va) {
            Some(page) => page.frame.take(),
            None => None,
        };

        if let Some(frame_id) = frame_id {
            self.discard_frame(frame_id);
        }
    }

    /// Gives a frame of the frame table back to the pool
    pub(crate) fn discard_frame(&mut self, frame_id: FrameId) {
        if let Some(frame) = self.frames.remove(frame_id) {
            self.system.release_frame(frame.phys);
        }
    }

    /// Brings the registered, non resident page `va` into a frame and maps it.
    ///
    /// On failure the page is left unmapped without a frame. Its contents
    /// stay with the backing store, unless the page was fresh.
    pub(crate) fn fault_in(&mut self, va: VirtAddr) -> VmResult<()> {
        let (writable, was_fresh) = match self.pages.find(va) {
            Some(page) => (page.writable, page.is_fresh()),
            None => return Err(VmError::InvalidAddress),
        };

        let frame_id = self.acquire_frame()?;
        let phys = match self.bind(frame_id, va) {
            Ok(phys) => phys,
            Err(err) => {
                self.discard_frame(frame_id);
                return Err(err);
            }
        };

        let system = self.system;
        let populated = match self.pages.find_mut(va) {
            Some(page) => backing::swap_in(page, phys, system),
            None => Err(VmError::InvariantViolation),
        };
        if let Err(err) = populated {
            warn!("Could not load contents of page {}: {}", va, err);
            self.unbind(va);
            return Err(err);
        }

        if self.page_table.install(va, phys, writable).is_err() {
            warn!("Could not install mapping for page {}", va);

            if !was_fresh {
                // the swap slot was given up by swap in, the contents
                // have to go back to the backing store
                if let Some(page) = self.pages.find_mut(va) {
                    if let Err(err) = backing::swap_out(page, phys, system, &mut self.page_table)
                    {
                        error!("Lost contents of page {}: {}", va, err);
                    }
                }
            }

            self.unbind(va);
            return Err(VmError::InstallFailed);
        }

        trace!("Faulted in page {} to frame {:?}", va, phys);
        Ok(())
    }
}
