/*
 *  Copyright (C) 2025  Markus Elias Gerber
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use log::{error, trace};

use crate::{
    address::{new_page_buffer, PageBuffer, PhysFrame, VirtAddr},
    modules::{
        block_device::BlockDeviceModule, frame_allocator::FrameAllocatorModule,
        page_table::PageTableModule,
    },
    page::AnonPage,
    swap_table::SwapSlot,
    VmError, VmResult, VmSystem,
};

/// Loads the page from its swap slot or zero fills it if it has none.
///
/// The slot is only given back after its contents reached the frame.
pub(super) fn swap_in<A: FrameAllocatorModule, D: BlockDeviceModule>(
    anon: &mut AnonPage,
    va: VirtAddr,
    frame: PhysFrame,
    system: &VmSystem<A, D>,
) -> VmResult<()> {
    match anon.slot {
        Some(slot) => {
            let mut buffer = new_page_buffer();
            system.swap().read_slot(slot, &mut buffer)?;
            system.write_frame(frame, &buffer);

            anon.slot = None;
            system.swap().release_slot(slot);
            trace!("Swapped in page {} from slot {}", va, slot.index());
        }
        None => {
            system.zero_frame(frame);
            trace!("Zero filled page {}", va);
        }
    }

    Ok(())
}

/// Writes the frame to a newly claimed swap slot
pub(super) fn swap_out<A: FrameAllocatorModule, D: BlockDeviceModule>(
    anon: &mut AnonPage,
    va: VirtAddr,
    frame: PhysFrame,
    system: &VmSystem<A, D>,
) -> VmResult<()> {
    if let Some(slot) = anon.slot {
        error!(
            "Page {} is swapped out twice, it still owns slot {}",
            va,
            slot.index()
        );
        return Err(VmError::InvariantViolation);
    }

    let mut buffer = new_page_buffer();
    system.read_frame(frame, &mut buffer);
    let slot = store_in_slot(&buffer, system)?;

    anon.slot = Some(slot);
    trace!("Swapped out page {} to slot {}", va, slot.index());
    Ok(())
}

/// Copies the contents of `slot` into a newly claimed slot
pub(crate) fn duplicate_slot<A: FrameAllocatorModule, D: BlockDeviceModule>(
    slot: SwapSlot,
    system: &VmSystem<A, D>,
) -> VmResult<SwapSlot> {
    let mut buffer = new_page_buffer();
    system.swap().read_slot(slot, &mut buffer)?;
    store_in_slot(&buffer, system)
}

/// Writes `contents` to a newly claimed slot
pub(crate) fn store_in_slot<A: FrameAllocatorModule, D: BlockDeviceModule>(
    contents: &PageBuffer,
    system: &VmSystem<A, D>,
) -> VmResult<SwapSlot> {
    let slot = system.swap().claim_slot()?;
    if let Err(err) = system.swap().write_slot(slot, contents) {
        system.swap().release_slot(slot);
        return Err(err);
    }

    Ok(slot)
}

pub(super) fn destroy<A, D, P>(
    anon: AnonPage,
    va: VirtAddr,
    frame: Option<PhysFrame>,
    system: &VmSystem<A, D>,
    page_table: &mut P,
) -> VmResult<()>
where
    A: FrameAllocatorModule,
    D: BlockDeviceModule,
    P: PageTableModule,
{
    match (frame, anon.slot) {
        (Some(frame), None) => {
            page_table.clear(va);
            system.release_frame(frame);
            Ok(())
        }
        (None, Some(slot)) => {
            system.swap().release_slot(slot);
            Ok(())
        }
        // never faulted in
        (None, None) => Ok(()),
        (Some(frame), Some(slot)) => {
            error!(
                "Page {} is resident and owns swap slot {} at the same time",
                va,
                slot.index()
            );
            page_table.clear(va);
            system.release_frame(frame);
            system.swap().release_slot(slot);
            Err(VmError::InvariantViolation)
        }
    }
}
