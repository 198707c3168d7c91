//! Serialization buffer: contiguous byte region dengan kapasitas tetap
//!
//! Buffer tidak menyimpan cursor. Posisi tulis/baca dipegang oleh archive
//! yang sedang memiliki buffer tersebut.

use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;

use super::allocator::{AllocError, Allocator, SystemAllocator};

/// Kontrak minimum buffer yang bisa diisi oleh `PackingArchive`
///
/// # Safety
/// `PackingArchive` menulis langsung lewat pointer dari buffer ini, jadi
/// implementor menjamin:
/// - `as_mut_ptr()` non-null dan valid untuk write sebanyak `capacity()` bytes,
/// - `as_bytes()` adalah region yang sama (panjang `capacity()`),
/// - `capacity()` tidak berubah selama buffer dipegang archive.
///
/// Impl tanpa `unsafe` ditolak compiler:
///
/// ```compile_fail
/// use tessera::core::SerializationBuffer;
///
/// struct Lying;
///
/// impl SerializationBuffer for Lying {
///     fn capacity(&self) -> usize {
///         8
///     }
///
///     fn as_mut_ptr(&mut self) -> *mut u8 {
///         std::ptr::null_mut()
///     }
///
///     fn as_bytes(&self) -> &[u8] {
///         &[]
///     }
/// }
/// ```
pub unsafe trait SerializationBuffer {
    /// Kapasitas dalam bytes
    fn capacity(&self) -> usize;

    /// Raw pointer ke awal storage (writable untuk `capacity()` bytes)
    fn as_mut_ptr(&mut self) -> *mut u8;

    /// Isi buffer sebagai slice
    fn as_bytes(&self) -> &[u8];
}

/// Heap buffer yang dialokasikan lewat [`Allocator`]
///
/// Storage di-zero saat alokasi, jadi `as_bytes()` selalu membaca memory
/// yang sudah ter-inisialisasi walaupun packing belum selesai.
pub struct DynamicSerializationBuffer<A: Allocator = SystemAllocator> {
    ptr: NonNull<u8>,
    capacity: usize,
    allocator: A,
}

// SAFETY: buffer memiliki storage-nya secara eksklusif
unsafe impl<A: Allocator + Send> Send for DynamicSerializationBuffer<A> {}
unsafe impl<A: Allocator + Sync> Sync for DynamicSerializationBuffer<A> {}

impl DynamicSerializationBuffer<SystemAllocator> {
    pub fn new(capacity: usize) -> Result<Self, AllocError> {
        Self::with_allocator(capacity, SystemAllocator)
    }
}

impl<A: Allocator> DynamicSerializationBuffer<A> {
    /// Alokasi buffer dengan kapasitas persis `capacity` bytes
    pub fn with_allocator(capacity: usize, allocator: A) -> Result<Self, AllocError> {
        let ptr = Self::allocate_zeroed(&allocator, capacity)?;
        Ok(Self {
            ptr,
            capacity,
            allocator,
        })
    }

    #[inline(always)]
    fn layout(capacity: usize) -> Result<Layout, AllocError> {
        Layout::array::<u8>(capacity).map_err(|_| AllocError {
            size: capacity,
            align: 1,
        })
    }

    fn allocate_zeroed(allocator: &A, capacity: usize) -> Result<NonNull<u8>, AllocError> {
        let ptr = allocator.allocate(Self::layout(capacity)?)?;
        // SAFETY: allocator menjamin `capacity` bytes writable
        unsafe { ptr.as_ptr().write_bytes(0, capacity) };
        Ok(ptr)
    }

    /// Resize buffer. Isi lama (sampai `min(old, new)` bytes) dipertahankan.
    ///
    /// Jika alokasi gagal, buffer lama tetap utuh.
    pub fn resize(&mut self, new_capacity: usize) -> Result<(), AllocError> {
        if new_capacity == self.capacity {
            return Ok(());
        }

        let new_ptr = Self::allocate_zeroed(&self.allocator, new_capacity)?;
        let keep = self.capacity.min(new_capacity);

        // SAFETY: dua region berbeda, keduanya valid untuk `keep` bytes
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), keep);
            self.allocator
                .deallocate(self.ptr, Self::layout(self.capacity).unwrap_unchecked());
        }

        self.ptr = new_ptr;
        self.capacity = new_capacity;
        Ok(())
    }

    #[inline(always)]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.capacity == 0
    }

    /// Copy isi buffer ke `Vec<u8>` (untuk diserahkan ke transport)
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

// SAFETY: ptr berasal dari allocate untuk `capacity` bytes dan hanya dilepas di Drop
unsafe impl<A: Allocator> SerializationBuffer for DynamicSerializationBuffer<A> {
    #[inline(always)]
    fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline(always)]
    fn as_bytes(&self) -> &[u8] {
        // SAFETY: storage ter-inisialisasi (zeroed) untuk `capacity` bytes
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.capacity) }
    }
}

impl<A: Allocator> Drop for DynamicSerializationBuffer<A> {
    fn drop(&mut self) {
        // SAFETY: layout sudah tervalidasi saat alokasi
        unsafe {
            self.allocator
                .deallocate(self.ptr, Self::layout(self.capacity).unwrap_unchecked());
        }
    }
}

impl<A: Allocator> AsRef<[u8]> for DynamicSerializationBuffer<A> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<A: Allocator> fmt::Debug for DynamicSerializationBuffer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicSerializationBuffer")
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// `Vec<u8>` sebagai buffer: kapasitas = `len()`
// SAFETY: pointer slice selalu non-null (dangling untuk len 0) dan valid untuk `len()` bytes
unsafe impl SerializationBuffer for Vec<u8> {
    #[inline(always)]
    fn capacity(&self) -> usize {
        self.len()
    }

    #[inline(always)]
    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.as_mut_slice().as_mut_ptr()
    }

    #[inline(always)]
    fn as_bytes(&self) -> &[u8] {
        self.as_slice()
    }
}
