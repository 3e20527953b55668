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

use log::error;

use super::FrameAllocatorModule;
use crate::{
    address::{PhysFrame, PAGE_SIZE},
    util::bit_array::BitArray,
};

/// Fixed pool of page sized frames backed by one contiguous buffer
pub struct PoolFrameAllocator {
    memory: Vec<u8>,
    used: BitArray,
}

impl PoolFrameAllocator {
    pub fn new(frame_count: usize) -> Self {
        Self {
            memory: vec![0u8; frame_count * PAGE_SIZE],
            used: BitArray::new(frame_count),
        }
    }

    fn range_of(frame: PhysFrame) -> core::ops::Range<usize> {
        let start = frame.start_address();
        start..start + PAGE_SIZE
    }
}

impl FrameAllocatorModule for PoolFrameAllocator {
    fn obtain(&mut self) -> Option<PhysFrame> {
        self.used.scan_and_set().map(PhysFrame::from_number)
    }

    fn release(&mut self, frame: PhysFrame) {
        if !self.used.is_set(frame.number()) {
            error!("Frame {} released twice", frame.number());
            debug_assert!(false, "frame {} released twice", frame.number());
            return;
        }

        self.used.set(frame.number(), false);
    }

    fn frame(&self, frame: PhysFrame) -> &[u8] {
        &self.memory[Self::range_of(frame)]
    }

    fn frame_mut(&mut self, frame: PhysFrame) -> &mut [u8] {
        &mut self.memory[Self::range_of(frame)]
    }

    fn capacity(&self) -> usize {
        self.used.len()
    }

    fn free_count(&self) -> usize {
        self.used.len() - self.used.count_set()
    }
}
