use crate::{
    address::{VirtAddr, PAGE_SIZE},
    modules::{
        file::{FileHandle, MemoryFile},
        page_table::{PageTableModule, SoftPageTable},
    },
    test::{get_test_system, page_addr, read_page, TestSpace},
    PageType, VmError,
};

fn pattern_file(len: usize) -> MemoryFile {
    MemoryFile::new((0..len).map(|i| (i % 241) as u8).collect())
}

#[test]
fn test_file_map_round_trip() {
    let system = get_test_system(4, 4);
    let mut space = TestSpace::new(&system, SoftPageTable::new());

    let file = pattern_file(3 * PAGE_SIZE + 100);
    let initial = file.contents();
    let length = 2 * PAGE_SIZE + 50;

    let base = space
        .map(page_addr(0), length, true, file.duplicate().unwrap(), PAGE_SIZE)
        .unwrap();
    assert_eq!(base, page_addr(0));
    assert_eq!(space.page_count(), 3);
    assert_eq!(space.mapping_count(), 1);
    // one handle per page plus ours
    assert_eq!(file.open_handles(), 4);
    assert_eq!(file.read_count(), 0);

    let info = space.page_info(page_addr(2)).unwrap();
    assert_eq!(info.page_type, PageType::Uninit);

    let page = read_page(&mut space, page_addr(1));
    assert_eq!(page[..], initial[2 * PAGE_SIZE..3 * PAGE_SIZE]);
    assert_eq!(
        space.page_info(page_addr(1)).unwrap().page_type,
        PageType::FileMapped
    );

    space
        .write_user(page_addr(1).checked_add(10).unwrap(), b"hello")
        .unwrap();
    space.unmap(page_addr(2)).unwrap();

    assert_eq!(space.page_count(), 0);
    assert_eq!(space.mapping_count(), 0);
    assert_eq!(file.open_handles(), 1);
    assert_eq!(system.free_frames(), 4);

    let mut expected = initial.clone();
    expected[2 * PAGE_SIZE + 10..2 * PAGE_SIZE + 15].copy_from_slice(b"hello");
    assert_eq!(file.contents(), expected);
}

#[test]
fn test_partial_page_is_zero_filled() {
    let system = get_test_system(2, 2);
    let mut space = TestSpace::new(&system, SoftPageTable::new());
    let file = MemoryFile::new(vec![0xAB; 5000]);

    space
        .map(page_addr(0), 5000, true, file.duplicate().unwrap(), 0)
        .unwrap();
    assert_eq!(space.page_count(), 2);

    let page = read_page(&mut space, page_addr(1));
    let tail = 5000 - PAGE_SIZE;
    assert!(page[..tail].iter().all(|b| *b == 0xAB));
    assert!(page[tail..].iter().all(|b| *b == 0));

    // bytes beyond the mapped length never reach the file
    space
        .write_user(page_addr(1).checked_add(tail).unwrap(), &[1; 16])
        .unwrap();
    space.unmap(page_addr(0)).unwrap();
    assert_eq!(file.len(), 5000);
    assert!(file.contents().iter().all(|b| *b == 0xAB));
}

#[test]
fn test_map_rolls_back_on_conflict() {
    let system = get_test_system(2, 2);
    let mut space = TestSpace::new(&system, SoftPageTable::new());
    let file = pattern_file(4 * PAGE_SIZE);

    space.allocate_anonymous(page_addr(2), true).unwrap();
    assert_eq!(
        space.map(page_addr(0), 4 * PAGE_SIZE, true, file.duplicate().unwrap(), 0),
        Err(VmError::AlreadyMapped)
    );

    assert_eq!(space.page_count(), 1);
    assert!(space.page_info(page_addr(0)).is_none());
    assert!(space.page_info(page_addr(1)).is_none());
    assert!(space.page_info(page_addr(3)).is_none());
    assert_eq!(space.mapping_count(), 0);
    assert_eq!(file.open_handles(), 1);

    // mapping over an existing mapping is refused as well
    space
        .map(page_addr(4), PAGE_SIZE, true, file.duplicate().unwrap(), 0)
        .unwrap();
    assert_eq!(
        space.map(page_addr(4), PAGE_SIZE, true, file.duplicate().unwrap(), 0),
        Err(VmError::AlreadyMapped)
    );
    assert_eq!(file.open_handles(), 2);
}

#[test]
fn test_map_rolls_back_on_failed_duplicate() {
    let system = get_test_system(2, 2);
    let mut space = TestSpace::new(&system, SoftPageTable::new());
    let file = pattern_file(3 * PAGE_SIZE);
    let handle = file.duplicate().unwrap();

    file.set_fail_duplicates(true);
    assert_eq!(
        space.map(page_addr(0), 3 * PAGE_SIZE, true, handle, 0),
        Err(VmError::FileIo)
    );
    assert_eq!(space.page_count(), 0);
    assert_eq!(file.open_handles(), 1);

    // a single page mapping needs no duplicate
    space
        .map(page_addr(0), 10, false, MemoryFile::new(vec![9; 10]), 0)
        .unwrap();
    assert_eq!(read_page(&mut space, page_addr(0))[..10], [9; 10]);
}

#[test]
fn test_map_invalid_arguments() {
    let system = get_test_system(2, 2);
    let mut space = TestSpace::new(&system, SoftPageTable::new());
    let file = pattern_file(PAGE_SIZE);

    assert_eq!(
        space.map(
            VirtAddr::new(page_addr(0).as_usize() + 1),
            10,
            true,
            file.duplicate().unwrap(),
            0
        ),
        Err(VmError::InvalidArgument)
    );
    assert_eq!(
        space.map(page_addr(0), 0, true, file.duplicate().unwrap(), 0),
        Err(VmError::InvalidArgument)
    );
    assert_eq!(
        space.map(VirtAddr::new(0), 10, true, file.duplicate().unwrap(), 0),
        Err(VmError::InvalidAddress)
    );
    // file offsets of the pages would overflow
    assert_eq!(
        space.map(
            page_addr(0),
            2 * PAGE_SIZE,
            true,
            file.duplicate().unwrap(),
            usize::MAX - PAGE_SIZE
        ),
        Err(VmError::InvalidArgument)
    );
    assert_eq!(space.unmap(page_addr(0)), Err(VmError::NoSuchMapping));
    assert_eq!(space.page_count(), 0);
    assert_eq!(file.open_handles(), 1);
}

#[test]
fn test_clean_pages_are_not_written_back() {
    let system = get_test_system(2, 2);
    let mut space = TestSpace::new(&system, SoftPageTable::new());
    let file = pattern_file(2 * PAGE_SIZE);

    space
        .map(page_addr(0), 2 * PAGE_SIZE, false, file.duplicate().unwrap(), 0)
        .unwrap();
    read_page(&mut space, page_addr(0));
    read_page(&mut space, page_addr(1));
    assert_eq!(file.read_count(), 2);

    space.unmap(page_addr(1)).unwrap();
    assert_eq!(file.write_count(), 0);
}

#[test]
fn test_dirty_file_page_is_written_back_on_eviction() {
    let system = get_test_system(1, 2);
    let mut space = TestSpace::new(&system, SoftPageTable::new());
    let file = pattern_file(2 * PAGE_SIZE);

    space
        .map(page_addr(0), 2 * PAGE_SIZE, true, file.duplicate().unwrap(), 0)
        .unwrap();
    space.write_user(page_addr(0), &[0xFF; 8]).unwrap();
    assert!(space.page_table().is_dirty(page_addr(0)));

    // evicts page 0, file pages never use swap
    read_page(&mut space, page_addr(1));
    assert!(!space.page_info(page_addr(0)).unwrap().resident);
    assert!(!space.page_info(page_addr(0)).unwrap().swapped);
    assert_eq!(system.swap().used_slots(), 0);
    assert_eq!(file.write_count(), 1);
    assert_eq!(file.contents()[..8], [0xFF; 8]);

    // loaded again from the file
    let page = read_page(&mut space, page_addr(0));
    assert_eq!(page[..8], [0xFF; 8]);
    assert_eq!(page[8], 8);
    space.check_integrity().unwrap();
}

#[test]
fn test_short_read_on_truncated_file() {
    let system = get_test_system(2, 2);
    let mut space = TestSpace::new(&system, SoftPageTable::new());
    let file = pattern_file(PAGE_SIZE);

    space
        .map(page_addr(0), PAGE_SIZE, true, file.duplicate().unwrap(), 0)
        .unwrap();
    file.truncate(100);

    let mut buf = [0u8; 4];
    assert_eq!(
        space.read_user(page_addr(0), &mut buf),
        Err(VmError::ShortRead {
            expected: PAGE_SIZE,
            read: 100
        })
    );
    assert!(!space.page_info(page_addr(0)).unwrap().resident);
    assert_eq!(system.free_frames(), 2);
    space.check_integrity().unwrap();
}

#[test]
fn test_failed_write_back_is_reported_by_unmap() {
    let system = get_test_system(2, 2);
    let mut space = TestSpace::new(&system, SoftPageTable::new());
    let file = pattern_file(2 * PAGE_SIZE);

    space
        .map(page_addr(0), 2 * PAGE_SIZE, true, file.duplicate().unwrap(), 0)
        .unwrap();
    space.write_user(page_addr(0), &[1]).unwrap();
    space.write_user(page_addr(1), &[1]).unwrap();

    file.set_fail_writes(true);
    assert_eq!(space.unmap(page_addr(0)), Err(VmError::FileIo));

    // the mapping is gone nevertheless
    assert_eq!(space.page_count(), 0);
    assert_eq!(system.free_frames(), 2);
    assert_eq!(file.open_handles(), 1);
    assert!(space.page_table().is_empty());
}
