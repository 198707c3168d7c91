//! Allocator capability untuk buffer dan unpacking archive
//!
//! Archive tidak pernah memanggil global allocator secara langsung.
//! Semua storage sementara (heap temporaries saat unpack) dan storage buffer
//! didapat dari implementasi [`Allocator`] yang dipegang archive.

use std::alloc::Layout;
use std::ptr::NonNull;

use thiserror::Error;

/// Allocation failure, propagated ke caller sebagai error biasa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("allocation of {size} bytes (align {align}) failed")]
pub struct AllocError {
    pub size: usize,
    pub align: usize,
}

impl AllocError {
    #[inline]
    pub fn for_layout(layout: Layout) -> Self {
        Self {
            size: layout.size(),
            align: layout.align(),
        }
    }
}

/// Byte allocator capability
///
/// # Safety
/// Implementor harus mengembalikan pointer yang valid untuk `layout.size()`
/// bytes dengan alignment `layout.align()`, dan harus menerima kembali pointer
/// tersebut lewat `deallocate` dengan layout yang sama. Untuk `layout.size() == 0`
/// boleh mengembalikan dangling pointer yang aligned.
pub unsafe trait Allocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Mengembalikan storage ke allocator.
    ///
    /// # Safety
    /// `ptr` harus berasal dari `allocate` pada allocator ini dengan `layout` yang sama,
    /// dan belum pernah di-deallocate.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

// Borrowed allocator capability
unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline(always)]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline(always)]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }
}

#[inline(always)]
fn dangling_for(layout: Layout) -> NonNull<u8> {
    // Aligned, non-null, tidak pernah di-dereference untuk size 0
    // SAFETY: align selalu >= 1
    unsafe { NonNull::new_unchecked(layout.align() as *mut u8) }
}

/// Allocator default: `std::alloc` global allocator
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

unsafe impl Allocator for SystemAllocator {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Ok(dangling_for(layout));
        }
        // SAFETY: size > 0
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| AllocError::for_layout(layout))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            std::alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

/// Allocator berbasis libc `posix_memalign` / `free`
///
/// Berguna untuk memisahkan storage serialization dari global allocator
/// (misalnya saat global allocator di-instrument).
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct MallocAllocator;

#[cfg(unix)]
unsafe impl Allocator for MallocAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Ok(dangling_for(layout));
        }

        // posix_memalign butuh alignment kelipatan sizeof(void*)
        let align = layout.align().max(std::mem::size_of::<*mut libc::c_void>());
        let mut out: *mut libc::c_void = std::ptr::null_mut();

        // SAFETY: align adalah power of 2 dan kelipatan sizeof(void*)
        let rc = unsafe { libc::posix_memalign(&mut out, align, layout.size()) };
        if rc != 0 {
            return Err(AllocError::for_layout(layout));
        }

        NonNull::new(out as *mut u8).ok_or_else(|| AllocError::for_layout(layout))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            libc::free(ptr.as_ptr() as *mut libc::c_void);
        }
    }
}
