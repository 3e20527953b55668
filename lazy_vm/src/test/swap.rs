use rand::{rngs::SmallRng, SeedableRng};

use crate::{
    address::PAGE_SIZE,
    modules::{
        file::{FileHandle, MemoryFile},
        page_table::SoftPageTable,
    },
    test::{
        get_failing_test_system, get_test_system, page_addr, rand_page, read_page, TestSpace,
    },
    VmError,
};

#[test]
fn test_anonymous_round_trip_under_pressure() {
    const SEED: u64 = 5446535461589659585;
    const PAGES: usize = 12;

    let system = get_test_system(4, 16);
    let mut space = TestSpace::new(&system, SoftPageTable::new());
    let mut rand = SmallRng::seed_from_u64(SEED);

    let mut expected = Vec::new();
    for i in 0..PAGES {
        space.allocate_anonymous(page_addr(i), true).unwrap();
        let page = rand_page(&mut rand);
        space.write_user(page_addr(i), &page).unwrap();
        expected.push(page);
    }

    assert_eq!(space.resident_count(), 4);
    assert_eq!(space.swapped_count(), PAGES - 4);
    space.check_integrity().unwrap();

    for i in (0..PAGES).rev().chain(0..PAGES) {
        assert_eq!(read_page(&mut space, page_addr(i)), expected[i], "page {}", i);
        space.check_integrity().unwrap();

        // every used slot belongs to exactly one page
        assert_eq!(system.swap().used_slots(), space.swapped_count());
        assert_eq!(space.resident_count() + space.swapped_count(), PAGES);
    }
}

#[test]
fn test_eviction_rank() {
    let system = get_test_system(3, 8);
    let mut space = TestSpace::new(&system, SoftPageTable::new());
    for i in 0..4 {
        space.allocate_anonymous(page_addr(i), true).unwrap();
    }

    space.write_user(page_addr(0), &[1]).unwrap();
    read_page(&mut space, page_addr(1));
    space.claim_page(page_addr(2)).unwrap();
    assert_eq!(system.free_frames(), 0);

    // page 2 was neither accessed nor written
    space.claim_page(page_addr(3)).unwrap();
    let resident: Vec<_> = (0..4)
        .map(|i| space.page_info(page_addr(i)).unwrap().resident)
        .collect();
    assert_eq!(resident, vec![true, true, false, true]);
    assert!(space.page_info(page_addr(2)).unwrap().swapped);

    // no idle page left, the first clean one goes
    read_page(&mut space, page_addr(3));
    assert!(read_page(&mut space, page_addr(2)).iter().all(|b| *b == 0));
    let resident: Vec<_> = (0..4)
        .map(|i| space.page_info(page_addr(i)).unwrap().resident)
        .collect();
    assert_eq!(resident, vec![true, false, true, true]);
    assert_eq!(read_page(&mut space, page_addr(0))[0], 1);

    space.check_integrity().unwrap();
}

#[test]
fn test_swap_exhaustion() {
    // 64 sectors hold exactly 8 pages
    let system = get_test_system(1, 8);
    assert_eq!(system.swap().capacity(), 8);

    let mut space = TestSpace::new(&system, SoftPageTable::new());
    for i in 0..10 {
        space.allocate_anonymous(page_addr(i), true).unwrap();
    }

    for i in 0..9 {
        space.write_user(page_addr(i), &[i as u8]).unwrap();
    }
    assert_eq!(system.swap().used_slots(), 8);

    // the 9th swap out has no slot left
    let err = space.write_user(page_addr(9), &[9]).unwrap_err();
    assert_eq!(err, VmError::SwapExhausted);
    assert!(err.is_fatal());

    assert!(space.page_info(page_addr(8)).unwrap().resident);
    assert!(!space.page_info(page_addr(9)).unwrap().resident);
    assert_eq!(system.swap().used_slots(), 8);
    space.check_integrity().unwrap();
}

#[test]
fn test_eviction_skips_victims_that_fail_to_persist() {
    let system = get_failing_test_system(2, 4);
    let mut space: TestSpace<'_, _> = TestSpace::new(&system, SoftPageTable::new());

    let file = MemoryFile::new(vec![3u8; PAGE_SIZE]);
    space.allocate_anonymous(page_addr(0), true).unwrap();
    space
        .map(page_addr(1), PAGE_SIZE, false, file.duplicate().unwrap(), 0)
        .unwrap();
    space.allocate_anonymous(page_addr(2), true).unwrap();

    read_page(&mut space, page_addr(0));
    assert_eq!(read_page(&mut space, page_addr(1))[0], 3);

    system.swap().with_device(|device| device.fail_writes = true);

    // page 0 is picked first but cannot be swapped out, the clean
    // file page is evicted instead
    read_page(&mut space, page_addr(2));
    assert!(space.page_info(page_addr(0)).unwrap().resident);
    assert!(!space.page_info(page_addr(1)).unwrap().resident);
    assert!(space.page_info(page_addr(2)).unwrap().resident);
    assert_eq!(system.swap().used_slots(), 0);
    assert_eq!(file.write_count(), 0);
    space.check_integrity().unwrap();
}

#[test]
fn test_out_of_memory_without_victim() {
    let system = get_failing_test_system(1, 4);
    let mut space: TestSpace<'_, _> = TestSpace::new(&system, SoftPageTable::new());
    space.allocate_anonymous(page_addr(0), true).unwrap();
    space.allocate_anonymous(page_addr(1), true).unwrap();

    space.write_user(page_addr(0), &[5]).unwrap();
    system.swap().with_device(|device| device.fail_writes = true);

    let err = space.write_user(page_addr(1), &[6]).unwrap_err();
    assert_eq!(err, VmError::OutOfMemory);
    assert!(err.is_fatal());

    assert!(space.page_info(page_addr(0)).unwrap().resident);
    assert!(!space.page_info(page_addr(1)).unwrap().resident);
    assert_eq!(system.swap().used_slots(), 0);
    space.check_integrity().unwrap();

    system.swap().with_device(|device| device.fail_writes = false);
    space.write_user(page_addr(1), &[6]).unwrap();
    assert_eq!(read_page(&mut space, page_addr(0))[0], 5);
}
