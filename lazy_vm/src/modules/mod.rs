pub mod block_device;
pub mod eviction;
pub mod file;
pub mod frame_allocator;
pub mod page_table;
