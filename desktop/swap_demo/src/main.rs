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

use std::{env::temp_dir, fs::File, io::Write};

use env_logger::{Builder, Env};
use lazy_vm::{
    modules::{
        block_device::FileBlockDevice, file::HostFile, frame_allocator::PoolFrameAllocator,
        page_table::SoftPageTable,
    },
    AddressSpace, VirtAddr, VmConfig, VmSystem, PAGE_SIZE, SECTORS_PER_PAGE,
};
use log::info;
use rand::{rngs::SmallRng, RngCore, SeedableRng};

const FRAME_COUNT: usize = 4;
const SWAP_SLOTS: usize = 32;
const ANON_PAGES: usize = 12;
const FILE_PAGES: usize = 3;

const SEED: u64 = 5446535461589659585;

fn main() {
    Builder::from_env(Env::default())
        .filter_level(log::LevelFilter::Info)
        .format_module_path(false)
        .init();

    let swap_path = temp_dir().join("lazy_vm_swap_demo.img");
    let swap = FileBlockDevice::new(
        swap_path.to_string_lossy().into_owned(),
        SWAP_SLOTS * SECTORS_PER_PAGE,
    )
    .unwrap();

    let system = VmSystem::new(
        PoolFrameAllocator::new(FRAME_COUNT),
        swap,
        VmConfig::default(),
    )
    .unwrap();

    let mut space: AddressSpace<'_, _, _, _, HostFile> =
        AddressSpace::new(&system, SoftPageTable::new());

    let mut rand = SmallRng::seed_from_u64(SEED);

    // anonymous pages, three times as many as there are frames
    let anon_base = 0x10_0000;
    let mut expected = Vec::new();
    for i in 0..ANON_PAGES {
        let va = VirtAddr::new(anon_base + i * PAGE_SIZE);
        space.allocate_anonymous(va, true).unwrap();

        let mut data = vec![0u8; PAGE_SIZE];
        rand.fill_bytes(&mut data);
        space.write_user(va, &data).unwrap();
        expected.push(data);
    }

    info!(
        "wrote {} anonymous pages: {} resident, {} swapped, {} of {} swap slots used",
        ANON_PAGES,
        space.resident_count(),
        space.swapped_count(),
        system.swap().used_slots(),
        system.swap().capacity()
    );

    // a file mapping whose last page is only partially used
    let file_path = temp_dir().join("lazy_vm_swap_demo.txt");
    let file_len = FILE_PAGES * PAGE_SIZE - 1000;
    {
        let mut file = File::create(&file_path).unwrap();
        file.write_all(&vec![b'.'; file_len]).unwrap();
    }

    let file_base = VirtAddr::new(0x40_0000);
    space
        .map(file_base, file_len, true, HostFile::open(&file_path).unwrap(), 0)
        .unwrap();

    let message = b"written through a mapping";
    for i in 0..FILE_PAGES {
        let va = VirtAddr::new(file_base.as_usize() + i * PAGE_SIZE + 16);
        space.write_user(va, message).unwrap();
    }

    // everything must have survived eviction
    for (i, data) in expected.iter().enumerate().rev() {
        let mut read_back = vec![0u8; PAGE_SIZE];
        space
            .read_user(VirtAddr::new(anon_base + i * PAGE_SIZE), &mut read_back)
            .unwrap();
        assert_eq!(&read_back, data, "anonymous page {} is corrupted", i);
    }

    space.unmap(file_base).unwrap();
    space.check_integrity().unwrap();

    let contents = std::fs::read(&file_path).unwrap();
    assert_eq!(contents.len(), file_len);
    for i in 0..FILE_PAGES {
        let start = i * PAGE_SIZE + 16;
        assert_eq!(&contents[start..start + message.len()], message);
    }

    // a page that is loaded from the file once and lives in swap afterwards
    let segment_va = VirtAddr::new(0x80_0000);
    space
        .allocate_with_initializer(
            segment_va,
            false,
            HostFile::open(&file_path).unwrap(),
            16,
            message.len(),
        )
        .unwrap();
    let mut segment = vec![0u8; PAGE_SIZE];
    space.read_user(segment_va, &mut segment).unwrap();
    assert_eq!(&segment[..message.len()], message);
    assert!(segment[message.len()..].iter().all(|b| *b == 0));

    println!(
        "pages: {}, resident: {}, swapped: {}",
        space.page_count(),
        space.resident_count(),
        space.swapped_count()
    );
    println!(
        "frames: {} of {} free, swap slots: {} of {} used",
        system.free_frames(),
        system.total_frames(),
        system.swap().used_slots(),
        system.swap().capacity()
    );

    drop(space);
    std::fs::remove_file(&file_path).unwrap();
    println!("all pages verified");
}
