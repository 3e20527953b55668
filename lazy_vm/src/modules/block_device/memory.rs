use super::BlockDeviceModule;
use crate::address::SECTOR_SIZE;

/// Block device that keeps all sectors in RAM
pub struct MemoryBlockDevice {
    data: Vec<u8>,
}

impl MemoryBlockDevice {
    pub fn new(sector_count: usize) -> Self {
        Self {
            data: vec![0u8; sector_count * SECTOR_SIZE],
        }
    }

    /// Raw view of one sector, bypassing the module interface
    pub fn sector(&self, sector: usize) -> &[u8] {
        &self.data[sector * SECTOR_SIZE..(sector + 1) * SECTOR_SIZE]
    }
}

impl BlockDeviceModule for MemoryBlockDevice {
    fn read_sector(&mut self, sector: usize, dest: &mut [u8]) -> Result<(), ()> {
        debug_assert_eq!(dest.len(), SECTOR_SIZE);
        if sector >= self.sector_count() {
            return Err(());
        }

        dest.copy_from_slice(self.sector(sector));
        Ok(())
    }

    fn write_sector(&mut self, sector: usize, src: &[u8]) -> Result<(), ()> {
        debug_assert_eq!(src.len(), SECTOR_SIZE);
        if sector >= self.sector_count() {
            return Err(());
        }

        self.data[sector * SECTOR_SIZE..(sector + 1) * SECTOR_SIZE].copy_from_slice(src);
        Ok(())
    }

    fn sector_count(&self) -> usize {
        self.data.len() / SECTOR_SIZE
    }
}

#[cfg(test)]
mod test {
    use super::super::test::{
        test_block_device_isolation, test_block_device_normal, BLOCK_DEVICE_TEST_SECTORS,
    };
    use super::MemoryBlockDevice;
    use crate::{address::SECTOR_SIZE, modules::block_device::BlockDeviceModule};

    #[test]
    fn test_memory_block_device_normal() {
        test_block_device_normal(MemoryBlockDevice::new(BLOCK_DEVICE_TEST_SECTORS));
    }

    #[test]
    fn test_memory_block_device_isolation() {
        test_block_device_isolation(MemoryBlockDevice::new(BLOCK_DEVICE_TEST_SECTORS));
    }

    #[test]
    fn test_memory_block_device_out_of_bounds() {
        let mut device = MemoryBlockDevice::new(2);
        let mut sector = [0u8; SECTOR_SIZE];
        assert!(device.read_sector(2, &mut sector).is_err());
        assert!(device.write_sector(2, &sector).is_err());
    }
}
