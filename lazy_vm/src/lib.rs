mod address;
mod address_space;
mod backing;
mod frame_table;
mod page;
mod supplemental_page_table;
mod swap_table;
mod util;
mod vm_config;
mod vm_error;
mod vm_system;

#[cfg(test)]
mod test;

pub use address::{PhysFrame, VirtAddr, PAGE_SIZE, SECTORS_PER_PAGE, SECTOR_SIZE};
pub use address_space::{AddressSpace, PageFault, TeardownMode};
pub use page::{PageInfo, PageType};
pub use swap_table::{SwapSlot, SwapTable};
pub use vm_config::VmConfig;
pub use vm_error::{VmError, VmResult};
pub use vm_system::VmSystem;
pub mod modules;
