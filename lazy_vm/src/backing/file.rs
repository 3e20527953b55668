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

use log::{trace, warn};

use crate::{
    address::{new_page_buffer, PhysFrame, VirtAddr},
    modules::{
        block_device::BlockDeviceModule, file::FileHandle,
        frame_allocator::FrameAllocatorModule, page_table::PageTableModule,
    },
    page::FilePage,
    VmError, VmResult, VmSystem,
};

/// Reads `length` bytes of the file into the frame and zero fills the rest
pub(super) fn swap_in<A, D, F>(
    file_page: &mut FilePage<F>,
    va: VirtAddr,
    frame: PhysFrame,
    system: &VmSystem<A, D>,
) -> VmResult<()>
where
    A: FrameAllocatorModule,
    D: BlockDeviceModule,
    F: FileHandle,
{
    let mut buffer = new_page_buffer();
    let read = file_page
        .file
        .read_at(&mut buffer[..file_page.length], file_page.offset)
        .map_err(|_| VmError::FileIo)?;

    if read < file_page.length {
        warn!(
            "Short read for page {}: {} of {} bytes at offset {}",
            va, read, file_page.length, file_page.offset
        );
        return Err(VmError::ShortRead {
            expected: file_page.length,
            read,
        });
    }

    system.write_frame(frame, &buffer);
    trace!(
        "Loaded page {} from file offset {} ({} bytes)",
        va,
        file_page.offset,
        file_page.length
    );
    Ok(())
}

/// Writes the page back if it is dirty, clean pages need no I/O
pub(crate) fn swap_out<A, D, P, F>(
    file_page: &mut FilePage<F>,
    va: VirtAddr,
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
    if !page_table.is_dirty(va) {
        return Ok(());
    }

    write_back(file_page, va, frame, system)?;
    page_table.set_dirty(va, false);
    Ok(())
}

fn write_back<A, D, F>(
    file_page: &mut FilePage<F>,
    va: VirtAddr,
    frame: PhysFrame,
    system: &VmSystem<A, D>,
) -> VmResult<()>
where
    A: FrameAllocatorModule,
    D: BlockDeviceModule,
    F: FileHandle,
{
    let mut buffer = new_page_buffer();
    system.read_frame(frame, &mut buffer);

    let written = file_page
        .file
        .write_at(&buffer[..file_page.length], file_page.offset)
        .map_err(|_| VmError::FileIo)?;

    if written != file_page.length {
        warn!(
            "Write back of page {} stopped after {} of {} bytes",
            va, written, file_page.length
        );
        return Err(VmError::FileIo);
    }

    trace!("Wrote back page {} to file offset {}", va, file_page.offset);
    Ok(())
}

/// Writes back dirty contents and releases the frame.
///
/// The file handle of the page is closed when `file_page` is dropped.
pub(super) fn destroy<A, D, P, F>(
    mut file_page: FilePage<F>,
    va: VirtAddr,
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
    let Some(frame) = frame else {
        return Ok(());
    };

    let result = swap_out(&mut file_page, va, frame, system, page_table);
    if let Err(err) = result {
        warn!("Lost modified contents of page {}: {}", va, err);
    }

    page_table.clear(va);
    system.release_frame(frame);
    result
}
