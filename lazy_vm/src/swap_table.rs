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
    address::{PageBuffer, SECTORS_PER_PAGE, SECTOR_SIZE},
    modules::block_device::BlockDeviceModule,
    util::{bit_array::BitArray, spin_lock::SpinLock},
    VmError, VmResult,
};

/// Index of a page sized slot on the swap device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SwapSlot(usize);

impl SwapSlot {
    #[inline]
    pub const fn index(&self) -> usize {
        self.0
    }

    /// First sector of this slot on the swap device
    #[inline]
    pub const fn first_sector(&self) -> usize {
        self.0 * SECTORS_PER_PAGE
    }
}

/// Splits the swap device into page sized slots and keeps track of the
/// slots that are in use.
pub struct SwapTable<D: BlockDeviceModule> {
    /// A set bit means the slot holds the contents of exactly one page
    slots: SpinLock<BitArray>,

    device: SpinLock<D>,

    slot_count: usize,
}

impl<D: BlockDeviceModule> SwapTable<D> {
    /// Creates a swap table over the whole `device`.
    ///
    /// Fails if the device is too small to store a single page.
    pub fn new(device: D) -> VmResult<Self> {
        let slot_count = device.sector_count() / SECTORS_PER_PAGE;
        if slot_count == 0 {
            error!(
                "Swap device with {} sectors is too small to store a page",
                device.sector_count()
            );
            return Err(VmError::InvalidArgument);
        }

        Ok(Self {
            slots: SpinLock::new(BitArray::new(slot_count)),
            device: SpinLock::new(device),
            slot_count,
        })
    }

    /// Number of pages the swap device can hold
    pub fn capacity(&self) -> usize {
        self.slot_count
    }

    pub fn used_slots(&self) -> usize {
        self.slots.lock().count_set()
    }

    pub fn is_slot_used(&self, slot: SwapSlot) -> bool {
        slot.0 < self.slot_count && self.slots.lock().is_set(slot.0)
    }

    /// Finds a free slot and marks it as used in one step
    pub(crate) fn claim_slot(&self) -> VmResult<SwapSlot> {
        match self.slots.lock().scan_and_set() {
            Some(index) => {
                trace!("Claimed swap slot {}", index);
                Ok(SwapSlot(index))
            }
            None => {
                error!("Not enough space in the swap device to store page");
                Err(VmError::SwapExhausted)
            }
        }
    }

    pub(crate) fn release_slot(&self, slot: SwapSlot) {
        let mut slots = self.slots.lock();
        debug_assert!(slots.is_set(slot.0), "swap slot {} released twice", slot.0);
        slots.set(slot.0, false);
        trace!("Released swap slot {}", slot.0);
    }

    /// Writes a whole page to `slot`
    pub(crate) fn write_slot(&self, slot: SwapSlot, page: &PageBuffer) -> VmResult<()> {
        debug_assert!(self.is_slot_used(slot));

        let mut device = self.device.lock();
        for (i, sector) in page.chunks_exact(SECTOR_SIZE).enumerate() {
            device
                .write_sector(slot.first_sector() + i, sector)
                .map_err(|_| VmError::SwapIo)?;
        }

        Ok(())
    }

    /// Reads a whole page from `slot`
    pub(crate) fn read_slot(&self, slot: SwapSlot, page: &mut PageBuffer) -> VmResult<()> {
        debug_assert!(self.is_slot_used(slot));

        let mut device = self.device.lock();
        for (i, sector) in page.chunks_exact_mut(SECTOR_SIZE).enumerate() {
            device
                .read_sector(slot.first_sector() + i, sector)
                .map_err(|_| VmError::SwapIo)?;
        }

        Ok(())
    }

    /// Runs `f` with exclusive access to the swap device
    pub fn with_device<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut self.device.lock())
    }
}
