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

use super::EvictionPolicyModule;
use crate::{address::VirtAddr, modules::page_table::PageTableModule};

/// How desirable it is to evict a page, higher is better
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum EvictionRank {
    /// evicting costs a write back
    Dirty = 0,
    /// clean, but used recently
    Accessed = 1,
    /// neither accessed nor dirty
    Idle = 2,
}

impl EvictionRank {
    pub(crate) fn of<P: PageTableModule>(page_table: &P, va: VirtAddr) -> Self {
        if page_table.is_dirty(va) {
            EvictionRank::Dirty
        } else if page_table.is_accessed(va) {
            EvictionRank::Accessed
        } else {
            EvictionRank::Idle
        }
    }
}

/// Single linear scan over the candidates that picks the page with the
/// highest [`EvictionRank`].
///
/// The first idle page ends the scan. Ties are won by the page that
/// was seen first. This is not a clock: no bits are cleared while scanning.
pub struct RankedEvictionPolicy;

impl EvictionPolicyModule for RankedEvictionPolicy {
    fn new() -> Self {
        Self
    }

    fn select_victim<P: PageTableModule, I: Iterator<Item = VirtAddr>>(
        &mut self,
        candidates: I,
        page_table: &P,
    ) -> Option<VirtAddr> {
        let mut best: Option<(EvictionRank, VirtAddr)> = None;

        for va in candidates {
            let rank = EvictionRank::of(page_table, va);
            if rank == EvictionRank::Idle {
                return Some(va);
            }

            match best {
                Some((best_rank, _)) if best_rank >= rank => {}
                _ => best = Some((rank, va)),
            }
        }

        best.map(|(_, va)| va)
    }
}
