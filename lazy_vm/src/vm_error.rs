use core::fmt::{Debug, Display, Formatter};
use std::error::Error;

/// Error type of the virtual memory subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    /// No page is registered for the address or the address is not a user address
    InvalidAddress,
    /// A write hit a page that is not writable
    WriteToReadOnly,
    /// A user access on a present page was denied by the hardware
    ProtectionViolation,
    /// The kernel faulted on a present page
    KernelFault,
    /// A page is already registered at this address
    AlreadyMapped,
    /// Misaligned address, zero length or similar
    InvalidArgument,
    /// No mapping group covers the address
    NoSuchMapping,
    /// The backing file returned fewer bytes than the page needs
    ShortRead { expected: usize, read: usize },
    /// The file layer failed to read, write or duplicate
    FileIo,
    /// The swap device failed to read or write
    SwapIo,
    /// Every swap slot is in use
    SwapExhausted,
    /// The frame pool is empty and no page could be evicted
    OutOfMemory,
    /// The hardware page table refused the mapping
    InstallFailed,
    /// Internal bookkeeping is inconsistent
    InvariantViolation,
}

pub type VmResult<T> = Result<T, VmError>;

impl VmError {
    /// Fatal errors cannot be contained by terminating the faulting process
    /// and should bring down the kernel.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VmError::SwapExhausted
                | VmError::OutOfMemory
                | VmError::KernelFault
                | VmError::InvariantViolation
        )
    }
}

impl Display for VmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            VmError::InvalidAddress => write!(f, "invalid virtual address"),
            VmError::WriteToReadOnly => write!(f, "write to read-only page"),
            VmError::ProtectionViolation => write!(f, "protection violation on present page"),
            VmError::KernelFault => write!(f, "kernel fault on present page"),
            VmError::AlreadyMapped => write!(f, "page already mapped"),
            VmError::InvalidArgument => write!(f, "invalid argument"),
            VmError::NoSuchMapping => write!(f, "no such mapping"),
            VmError::ShortRead { expected, read } => {
                write!(f, "short read from file ({} of {} bytes)", read, expected)
            }
            VmError::FileIo => write!(f, "file I/O error"),
            VmError::SwapIo => write!(f, "swap device I/O error"),
            VmError::SwapExhausted => write!(f, "swap space exhausted"),
            VmError::OutOfMemory => write!(f, "out of memory, no evictable page"),
            VmError::InstallFailed => write!(f, "could not install page table entry"),
            VmError::InvariantViolation => write!(f, "virtual memory invariant violated"),
        }
    }
}

impl Error for VmError {}

#[cfg(test)]
mod test {
    use super::VmError;

    #[test]
    fn test_fatal_classification() {
        assert!(VmError::SwapExhausted.is_fatal());
        assert!(VmError::OutOfMemory.is_fatal());
        assert!(VmError::KernelFault.is_fatal());
        assert!(!VmError::InvalidAddress.is_fatal());
        assert!(!VmError::WriteToReadOnly.is_fatal());
        assert!(!VmError::ShortRead { expected: 10, read: 3 }.is_fatal());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            format!("{}", VmError::ShortRead { expected: 10, read: 3 }),
            "short read from file (3 of 10 bytes)"
        );
    }
}
