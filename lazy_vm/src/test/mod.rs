use env_logger::{Builder, Env};
use rand::{rngs::SmallRng, RngCore};

use crate::{
    address::{VirtAddr, PAGE_SIZE, SECTORS_PER_PAGE},
    modules::{
        block_device::{BlockDeviceModule, MemoryBlockDevice},
        file::MemoryFile,
        frame_allocator::PoolFrameAllocator,
        page_table::SoftPageTable,
    },
    AddressSpace, VmConfig, VmSystem,
};

mod mmap;
mod swap;

pub(crate) type TestSystem<D = MemoryBlockDevice> = VmSystem<PoolFrameAllocator, D>;

pub(crate) type TestSpace<'s, D = MemoryBlockDevice> =
    AddressSpace<'s, PoolFrameAllocator, D, SoftPageTable, MemoryFile>;

pub(crate) fn init_logging() {
    let _ = Builder::from_env(Env::default()).is_test(true).try_init();
}

/// System with `frame_count` frames and a swap device of `swap_slots` pages
pub(crate) fn get_test_system(frame_count: usize, swap_slots: usize) -> TestSystem {
    init_logging();

    VmSystem::new(
        PoolFrameAllocator::new(frame_count),
        MemoryBlockDevice::new(swap_slots * SECTORS_PER_PAGE),
        VmConfig::default(),
    )
    .unwrap()
}

pub(crate) fn get_failing_test_system(
    frame_count: usize,
    swap_slots: usize,
) -> TestSystem<FailingBlockDevice> {
    init_logging();

    VmSystem::new(
        PoolFrameAllocator::new(frame_count),
        FailingBlockDevice {
            inner: MemoryBlockDevice::new(swap_slots * SECTORS_PER_PAGE),
            fail_writes: false,
        },
        VmConfig::default(),
    )
    .unwrap()
}

/// Address of the `index`-th test page
pub(crate) fn page_addr(index: usize) -> VirtAddr {
    VirtAddr::new((0x100 + index) * PAGE_SIZE)
}

pub(crate) fn rand_page(rand: &mut SmallRng) -> Vec<u8> {
    let mut page = vec![0u8; PAGE_SIZE];
    rand.fill_bytes(&mut page);
    page
}

pub(crate) fn read_page<D: BlockDeviceModule>(
    space: &mut TestSpace<'_, D>,
    va: VirtAddr,
) -> Vec<u8> {
    let mut page = vec![0u8; PAGE_SIZE];
    space.read_user(va, &mut page).unwrap();
    page
}

/// Swap device whose writes can be switched off
pub(crate) struct FailingBlockDevice {
    inner: MemoryBlockDevice,
    pub(crate) fail_writes: bool,
}

impl BlockDeviceModule for FailingBlockDevice {
    fn read_sector(&mut self, sector: usize, dest: &mut [u8]) -> Result<(), ()> {
        self.inner.read_sector(sector, dest)
    }

    fn write_sector(&mut self, sector: usize, src: &[u8]) -> Result<(), ()> {
        if self.fail_writes {
            return Err(());
        }
        self.inner.write_sector(sector, src)
    }

    fn sector_count(&self) -> usize {
        self.inner.sector_count()
    }
}
