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

use std::collections::HashMap;

use super::PageTableModule;
use crate::address::{PhysFrame, VirtAddr};

#[derive(Debug, Clone, Copy)]
struct SoftEntry {
    frame: PhysFrame,
    writable: bool,
    dirty: bool,
    accessed: bool,
}

/// Page table that lives completely in software.
///
/// Accessed and dirty bits are set by whoever emulates the memory access
/// (see [`crate::AddressSpace::read_user`]).
pub struct SoftPageTable {
    entries: HashMap<VirtAddr, SoftEntry>,

    /// maximum number of entries, `install` fails if it is reached
    capacity: Option<usize>,
}

impl SoftPageTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            capacity: None,
        }
    }

    /// Creates a page table that can hold at most `capacity` mappings
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: Some(capacity),
        }
    }

    pub fn set_capacity_limit(&mut self, capacity: Option<usize>) {
        self.capacity = capacity;
    }

    /// Returns the writable flag of the mapping of `va`
    pub fn is_writable(&self, va: VirtAddr) -> Option<bool> {
        self.entries.get(&va).map(|entry| entry.writable)
    }

    /// Number of installed mappings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SoftPageTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PageTableModule for SoftPageTable {
    fn install(&mut self, va: VirtAddr, frame: PhysFrame, writable: bool) -> Result<(), ()> {
        debug_assert!(va.is_page_aligned());

        if let Some(capacity) = self.capacity {
            if !self.entries.contains_key(&va) && self.entries.len() >= capacity {
                return Err(());
            }
        }

        self.entries.insert(
            va,
            SoftEntry {
                frame,
                writable,
                dirty: false,
                accessed: false,
            },
        );
        Ok(())
    }

    fn clear(&mut self, va: VirtAddr) {
        self.entries.remove(&va);
    }

    fn query(&self, va: VirtAddr) -> Option<PhysFrame> {
        self.entries.get(&va).map(|entry| entry.frame)
    }

    fn is_dirty(&self, va: VirtAddr) -> bool {
        self.entries.get(&va).map_or(false, |entry| entry.dirty)
    }

    fn is_accessed(&self, va: VirtAddr) -> bool {
        self.entries.get(&va).map_or(false, |entry| entry.accessed)
    }

    fn set_dirty(&mut self, va: VirtAddr, dirty: bool) {
        if let Some(entry) = self.entries.get_mut(&va) {
            entry.dirty = dirty;
        }
    }

    fn set_accessed(&mut self, va: VirtAddr, accessed: bool) {
        if let Some(entry) = self.entries.get_mut(&va) {
            entry.accessed = accessed;
        }
    }
}
