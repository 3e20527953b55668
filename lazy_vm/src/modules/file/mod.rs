mod host;
mod memory;

pub use host::HostFile;
pub use memory::MemoryFile;

/// An open file of the file system layer.
///
/// Closing the file is done by dropping the handle. Every page of a
/// memory mapping owns its own handle, so a mapping outlives the handle
/// it was created from.
pub trait FileHandle: Sized {
    /// Reads up to `dest.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes read, which is smaller than `dest.len()`
    /// if the end of the file was reached.
    fn read_at(&mut self, dest: &mut [u8], offset: usize) -> Result<usize, ()>;

    /// Writes up to `src.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes written.
    fn write_at(&mut self, src: &[u8], offset: usize) -> Result<usize, ()>;

    /// Opens a new, independent handle to the same file
    fn duplicate(&self) -> Result<Self, ()>;
}
