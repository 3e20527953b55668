mod file_device;
mod memory;

pub use file_device::FileBlockDevice;
pub use memory::MemoryBlockDevice;

/// A sector addressed block device, e.g. the swap disk.
///
/// Buffers passed to `read_sector` and `write_sector` are exactly
/// [`crate::SECTOR_SIZE`] bytes long.
pub trait BlockDeviceModule {
    /// Reads sector `sector` into `dest`.
    ///
    /// If this call fails, it could be that already some data was written to `dest`.
    fn read_sector(&mut self, sector: usize, dest: &mut [u8]) -> Result<(), ()>;

    /// Writes `src` back to sector `sector`
    fn write_sector(&mut self, sector: usize, src: &[u8]) -> Result<(), ()>;

    /// Returns the number of sectors of this device
    ///
    /// **It is illegal to read/write beyond this border!**
    fn sector_count(&self) -> usize;
}

#[cfg(test)]
pub(crate) mod test {
    use super::BlockDeviceModule;
    use crate::address::SECTOR_SIZE;

    fn gen_number(i: usize) -> u8 {
        (i * 3 + (i % 3) * 7 + (i % 11) * 51) as u8
    }

    pub(super) const BLOCK_DEVICE_TEST_SECTORS: usize = 16;

    /// test if write saves all data and read restores all of it
    pub(super) fn test_block_device_normal<T: BlockDeviceModule>(mut device: T) {
        assert_eq!(device.sector_count(), BLOCK_DEVICE_TEST_SECTORS);

        let mut sector = [0u8; SECTOR_SIZE];
        for i in 0..BLOCK_DEVICE_TEST_SECTORS {
            for (x, byte) in sector.iter_mut().enumerate() {
                *byte = gen_number(i * SECTOR_SIZE + x);
            }

            device.write_sector(i, &sector).unwrap();
        }

        for i in (0..BLOCK_DEVICE_TEST_SECTORS).rev() {
            device.read_sector(i, &mut sector).unwrap();

            for (x, byte) in sector.iter().enumerate() {
                assert_eq!(*byte, gen_number(i * SECTOR_SIZE + x));
            }
        }
    }

    /// test that writing one sector does not change its neighbours
    pub(super) fn test_block_device_isolation<T: BlockDeviceModule>(mut device: T) {
        for i in 0..BLOCK_DEVICE_TEST_SECTORS {
            device.write_sector(i, &[0xFFu8; SECTOR_SIZE]).unwrap();
        }

        device.write_sector(5, &[0x11u8; SECTOR_SIZE]).unwrap();

        let mut sector = [0u8; SECTOR_SIZE];
        for i in 0..BLOCK_DEVICE_TEST_SECTORS {
            device.read_sector(i, &mut sector).unwrap();
            let expected = if i == 5 { 0x11 } else { 0xFF };
            assert!(
                sector.iter().all(|byte| *byte == expected),
                "invalid data in sector {}",
                i
            );
        }
    }
}
