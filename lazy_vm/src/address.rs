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

use core::fmt;

use static_assertions::const_assert_eq;

/// Size of one virtual page and of one physical frame in bytes
pub const PAGE_SIZE: usize = 4096;

/// Size of one sector of the swap device in bytes
pub const SECTOR_SIZE: usize = 512;

/// Number of swap device sectors that make up a page
pub const SECTORS_PER_PAGE: usize = PAGE_SIZE / SECTOR_SIZE;

const_assert_eq!(PAGE_SIZE % SECTOR_SIZE, 0);
const_assert_eq!(SECTORS_PER_PAGE, 8);

/// A page worth of bytes, used as bounce buffer for disk and file I/O
pub(crate) type PageBuffer = [u8; PAGE_SIZE];

/// Allocates a zeroed bounce buffer on the heap
pub(crate) fn new_page_buffer() -> Box<PageBuffer> {
    Box::new([0u8; PAGE_SIZE])
}

/// A user virtual address.
///
/// Page addresses (keys of the supplemental page table) are always page aligned.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(usize);

impl VirtAddr {
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    #[inline]
    pub const fn as_usize(&self) -> usize {
        self.0
    }

    /// Returns the address of the page that contains this address
    #[inline]
    pub const fn page_round_down(&self) -> Self {
        Self(self.0 & !(PAGE_SIZE - 1))
    }

    #[inline]
    pub const fn is_page_aligned(&self) -> bool {
        self.0 % PAGE_SIZE == 0
    }

    /// Offset of this address inside of its page
    #[inline]
    pub const fn page_offset(&self) -> usize {
        self.0 % PAGE_SIZE
    }

    #[inline]
    pub fn checked_add(&self, bytes: usize) -> Option<Self> {
        self.0.checked_add(bytes).map(Self)
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Number of a physical frame handed out by a frame allocator module
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysFrame(usize);

impl PhysFrame {
    #[inline]
    pub const fn from_number(number: usize) -> Self {
        Self(number)
    }

    #[inline]
    pub const fn number(&self) -> usize {
        self.0
    }

    /// Physical address of the first byte of this frame
    #[inline]
    pub const fn start_address(&self) -> usize {
        self.0 * PAGE_SIZE
    }
}

/// efficient way to calculate: ceil(x / y)
#[inline]
pub(crate) const fn div_ceil(num: usize, div: usize) -> usize {
    (num + div - 1) / div
}
