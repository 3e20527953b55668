/*
 *  Copyright (C) 2025  Markus Elias Gerber
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::{
    fs::File,
    io::{self, ErrorKind},
    path::Path,
};

use super::FileHandle;

/// File handle on top of a host file.
///
/// Duplicated handles share the open file but every access names its
/// offset, so no handle depends on the cursor position of another one.
pub struct HostFile {
    file: File,
}

impl HostFile {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::options().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    pub fn from_file(file: File) -> Self {
        Self { file }
    }
}

#[cfg(unix)]
fn read_at_offset(file: &File, dest: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::read_at(file, dest, offset)
}

#[cfg(unix)]
fn write_at_offset(file: &File, src: &[u8], offset: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::write_at(file, src, offset)
}

#[cfg(windows)]
fn read_at_offset(file: &File, dest: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_read(file, dest, offset)
}

#[cfg(windows)]
fn write_at_offset(file: &File, src: &[u8], offset: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_write(file, src, offset)
}

impl FileHandle for HostFile {
    fn read_at(&mut self, dest: &mut [u8], offset: usize) -> Result<usize, ()> {
        let mut read = 0;
        while read < dest.len() {
            match read_at_offset(&self.file, &mut dest[read..], (offset + read) as u64) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(_) => return Err(()),
            }
        }

        Ok(read)
    }

    fn write_at(&mut self, src: &[u8], offset: usize) -> Result<usize, ()> {
        let mut written = 0;
        while written < src.len() {
            match write_at_offset(&self.file, &src[written..], (offset + written) as u64) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(_) => return Err(()),
            }
        }

        Ok(written)
    }

    fn duplicate(&self) -> Result<Self, ()> {
        let file = self.file.try_clone().map_err(|_| ())?;
        Ok(Self { file })
    }
}

#[cfg(test)]
mod test {
    use std::{env::temp_dir, fs, thread};

    use super::HostFile;
    use crate::{address::PAGE_SIZE, modules::file::FileHandle};

    #[test]
    fn test_host_file_read_write() {
        let path = temp_dir().join("lazy_vm_test_host_file_read_write.bin");
        fs::write(&path, b"hello world").unwrap();

        let mut file = HostFile::open(&path).unwrap();
        let mut dup = file.duplicate().unwrap();

        let mut buffer = [0u8; 32];
        assert_eq!(file.read_at(&mut buffer, 6).unwrap(), 5);
        assert_eq!(&buffer[..5], b"world");

        assert_eq!(dup.write_at(b"WORLD", 6).unwrap(), 5);
        drop(dup);

        assert_eq!(file.read_at(&mut buffer[..11], 0).unwrap(), 11);
        assert_eq!(&buffer[..11], b"hello WORLD");

        drop(file);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_duplicates_read_concurrently() {
        let path = temp_dir().join("lazy_vm_test_host_file_concurrent.bin");
        let mut contents = vec![1u8; PAGE_SIZE];
        contents.extend(vec![2u8; PAGE_SIZE]);
        fs::write(&path, &contents).unwrap();

        let file = HostFile::open(&path).unwrap();
        let readers: Vec<_> = (0..2)
            .map(|i| {
                let mut handle = file.duplicate().unwrap();
                thread::spawn(move || {
                    let mut buffer = vec![0u8; PAGE_SIZE];
                    for _ in 0..2000 {
                        let read = handle.read_at(&mut buffer, i * PAGE_SIZE).unwrap();
                        assert_eq!(read, PAGE_SIZE);
                        assert!(buffer.iter().all(|b| *b == i as u8 + 1));
                    }
                })
            })
            .collect();

        for reader in readers {
            reader.join().unwrap();
        }

        drop(file);
        let _ = fs::remove_file(&path);
    }
}
