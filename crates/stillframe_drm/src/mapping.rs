//! Process mappings of dumb-buffer memory

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::{ptr, slice};

use libc::c_void;
use log::debug;

/// A read-write shared mapping of device memory.
///
/// Valid for the lifetime of the value; unmapped on drop, which the owning
/// session orders strictly before the underlying buffer is freed.
pub struct MappedRegion {
    ptr: *mut u8,
    len: usize,
}

impl MappedRegion {
    /// Maps `len` bytes at `offset` of `fd`, read-write and shared.
    pub fn map(fd: BorrowedFd<'_>, offset: u64, len: usize) -> io::Result<Self> {
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd.as_raw_fd(),
                offset as libc::off_t,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        debug!("Mapped {len} bytes of scanout memory");

        Ok(Self {
            ptr: ptr as *mut u8,
            len,
        })
    }

    /// Length of the mapping in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the mapping stays valid for `len` bytes until drop
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: the mapping stays valid for `len` bytes until drop and
        // `&mut self` guarantees exclusive access
        unsafe { slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        if !self.ptr.is_null() && self.len > 0 {
            unsafe { libc::munmap(self.ptr as *mut c_void, self.len) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, OpenOptions};
    use std::os::fd::AsFd;

    const LEN: usize = 4096;

    fn scratch_file(name: &str) -> (std::path::PathBuf, std::fs::File) {
        let path = std::env::temp_dir().join(format!("stillframe-{}-{name}", std::process::id()));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .unwrap();
        file.set_len(LEN as u64).unwrap();
        (path, file)
    }

    #[test]
    fn maps_the_requested_length() {
        let (path, file) = scratch_file("map-len");

        let region = MappedRegion::map(file.as_fd(), 0, LEN).unwrap();
        assert_eq!(region.len(), LEN);
        assert!(!region.is_empty());

        drop(region);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn writes_reach_the_backing_file() {
        let (path, file) = scratch_file("map-write");

        let mut region = MappedRegion::map(file.as_fd(), 0, LEN).unwrap();
        region.as_mut_slice()[..4].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);
        drop(region);

        let bytes = fs::read(&path).unwrap();
        fs::remove_file(path).unwrap();
        assert_eq!(&bytes[..4], &[0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn zero_fill_clears_the_whole_region() {
        let (path, file) = scratch_file("map-zero");

        let mut region = MappedRegion::map(file.as_fd(), 0, LEN).unwrap();
        region.as_mut_slice().fill(0xAB);
        region.as_mut_slice().fill(0);
        assert!(region.as_slice().iter().all(|&byte| byte == 0));

        drop(region);
        fs::remove_file(path).unwrap();
    }
}
