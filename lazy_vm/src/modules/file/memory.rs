use std::sync::Arc;

use crate::util::spin_lock::SpinLock;

use super::FileHandle;

struct MemoryFileState {
    data: Vec<u8>,
    open_handles: usize,
    reads: usize,
    writes: usize,
    fail_duplicates: bool,
    fail_writes: bool,
}

/// In memory file, all handles created by [`FileHandle::duplicate`] share
/// the same contents.
///
/// Keeps track of open handles and I/O calls. Writes never grow the file.
pub struct MemoryFile {
    state: Arc<SpinLock<MemoryFileState>>,
}

impl MemoryFile {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            state: Arc::new(SpinLock::new(MemoryFileState {
                data,
                open_handles: 1,
                reads: 0,
                writes: 0,
                fail_duplicates: false,
                fail_writes: false,
            })),
        }
    }

    /// Copy of the current file contents
    pub fn contents(&self) -> Vec<u8> {
        self.state.lock().data.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cuts the file down to `len` bytes
    pub fn truncate(&self, len: usize) {
        self.state.lock().data.truncate(len);
    }

    /// Number of handles to this file that are currently open
    pub fn open_handles(&self) -> usize {
        self.state.lock().open_handles
    }

    /// Number of `read_at` calls on all handles
    pub fn read_count(&self) -> usize {
        self.state.lock().reads
    }

    /// Number of `write_at` calls on all handles
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    /// Lets every following `duplicate` call fail
    pub fn set_fail_duplicates(&self, fail: bool) {
        self.state.lock().fail_duplicates = fail;
    }

    /// Lets every following `write_at` call fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }
}

impl FileHandle for MemoryFile {
    fn read_at(&mut self, dest: &mut [u8], offset: usize) -> Result<usize, ()> {
        let mut state = self.state.lock();
        state.reads += 1;

        if offset >= state.data.len() {
            return Ok(0);
        }

        let len = dest.len().min(state.data.len() - offset);
        dest[..len].copy_from_slice(&state.data[offset..offset + len]);
        Ok(len)
    }

    fn write_at(&mut self, src: &[u8], offset: usize) -> Result<usize, ()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(());
        }
        state.writes += 1;

        if offset >= state.data.len() {
            return Ok(0);
        }

        let len = src.len().min(state.data.len() - offset);
        state.data[offset..offset + len].copy_from_slice(&src[..len]);
        Ok(len)
    }

    fn duplicate(&self) -> Result<Self, ()> {
        let mut state = self.state.lock();
        if state.fail_duplicates {
            return Err(());
        }
        state.open_handles += 1;

        Ok(Self {
            state: self.state.clone(),
        })
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        self.state.lock().open_handles -= 1;
    }
}
