//! Memory-mapped serialization buffer
//!
//! Untuk encoded value yang besar, packing langsung ke mmap region:
//! - Anonymous mapping: halaman diambil lazily dari kernel, tanpa heap allocator
//! - File-backed mapping: hasil packing langsung berada di page cache file

use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use super::buffer::SerializationBuffer;

/// Mmap-backed buffer dengan kapasitas tetap
pub struct MmapBuffer {
    mmap: Option<MmapMut>,
    capacity: usize,
}

impl MmapBuffer {
    /// Anonymous mapping sebesar `capacity` bytes (zero-filled oleh kernel)
    pub fn anonymous(capacity: usize) -> io::Result<Self> {
        // mmap dengan len 0 ditolak oleh kernel
        if capacity == 0 {
            return Ok(Self {
                mmap: None,
                capacity,
            });
        }

        let mmap = MmapOptions::new().len(capacity).map_anon()?;
        Ok(Self {
            mmap: Some(mmap),
            capacity,
        })
    }

    /// Membuat atau membuka file dan me-mapping `capacity` bytes pertama
    ///
    /// File di-resize ke `capacity` bytes.
    pub fn file<P: AsRef<Path>>(path: P, capacity: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        file.set_len(capacity as u64)?;

        if capacity == 0 {
            return Ok(Self {
                mmap: None,
                capacity,
            });
        }

        // SAFETY: file dibuka read/write dan tidak di-share ke proses lain oleh buffer ini
        let mmap = unsafe { MmapOptions::new().len(capacity).map_mut(&file)? };

        Ok(Self {
            mmap: Some(mmap),
            capacity,
        })
    }

    /// Flush isi mapping ke file (no-op untuk anonymous mapping)
    pub fn flush(&self) -> io::Result<()> {
        match &self.mmap {
            Some(mmap) => mmap.flush(),
            None => Ok(()),
        }
    }
}

// SAFETY: mapping berukuran `capacity` bytes; tanpa mapping, capacity 0 dan pointer dangling
unsafe impl SerializationBuffer for MmapBuffer {
    #[inline(always)]
    fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    fn as_mut_ptr(&mut self) -> *mut u8 {
        match &mut self.mmap {
            Some(mmap) => mmap.as_mut_ptr(),
            None => std::ptr::NonNull::dangling().as_ptr(),
        }
    }

    #[inline(always)]
    fn as_bytes(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }
}
