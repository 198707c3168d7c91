//! Customization points: raw-copy path vs custom encoder
//!
//! Setiap type punya tepat satu binding {size, pack, unpack}:
//! - Raw-copy path: type yang implement [`DirectlySerializable`] otomatis
//!   mendapat [`Encode`] dan [`Decode`] lewat blanket impl (bulk memcpy
//!   `size_of::<T>()` bytes, tanpa traversal per field).
//! - Custom encoder: type lain menulis sendiri impl [`Encode`] / [`Decode`],
//!   biasanya dengan mem-feed field-fieldnya ke archive.
//!
//! Resolusi terjadi sepenuhnya saat compile. Type yang tidak punya binding
//! gagal di trait bound, dan type yang punya dua binding ditolak oleh
//! coherence checker:
//!
//! ```compile_fail
//! use tessera::protocol::{DirectlySerializable, Encode, PackingArchive, SizingArchive};
//! use tessera::core::SerializationBuffer;
//!
//! #[derive(Clone, Copy)]
//! #[repr(C)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! unsafe impl DirectlySerializable for Point {}
//!
//! // conflicting implementation: Point sudah punya raw-copy binding
//! impl Encode for Point {
//!     fn compute_size(&self, ar: &mut SizingArchive) {
//!         ar.feed(&self.x).feed(&self.y);
//!     }
//!
//!     fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
//!         ar.feed(&self.x).feed(&self.y);
//!     }
//! }
//! ```

use std::mem::{self, MaybeUninit};

use super::archive::{PackingArchive, SizingArchive, UnpackingArchive};
use super::error::Result;
use crate::core::{Allocator, SerializationBuffer};

/// Marker: bit pattern `T` cukup untuk merekonstruksi value-nya
///
/// # Safety
/// Implementor menjamin bahwa `T`:
/// - tidak punya padding bytes (semua `size_of::<T>()` bytes ter-inisialisasi),
/// - tidak memiliki indirection (pointer, reference, handle ke resource lain),
/// - valid untuk *setiap* bit pattern sebesar `size_of::<T>()` bytes.
///
/// Biasanya berarti `#[repr(C)]` / `#[repr(transparent)]` struct yang semua
/// field-nya juga `DirectlySerializable` dan tersusun tanpa celah.
pub unsafe trait DirectlySerializable: Copy + 'static {}

/// Sizing + packing untuk satu type
///
/// `compute_size` dan `pack` harus mengunjungi value dengan urutan yang sama,
/// dan `pack` harus menulis persis jumlah bytes yang dihitung `compute_size`.
pub trait Encode {
    fn compute_size(&self, ar: &mut SizingArchive);

    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>);
}

/// Unpacking untuk satu type
///
/// `unpack` mengkonsumsi persis bytes yang ditulis `Encode::pack` untuk value
/// yang sama, lalu mengkonstruksi value di `dest`.
pub trait Decode: Sized {
    fn unpack<'s, A: Allocator>(
        dest: Slot<'s, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<Filled<'s, Self>>;
}

impl<T: DirectlySerializable> Encode for T {
    #[inline(always)]
    fn compute_size(&self, ar: &mut SizingArchive) {
        ar.add_to_size_raw(mem::size_of::<T>());
    }

    #[inline(always)]
    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
        ar.pack_data_raw(std::slice::from_ref(self));
    }
}

impl<T: DirectlySerializable> Decode for T {
    #[inline(always)]
    fn unpack<'s, A: Allocator>(
        dest: Slot<'s, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<Filled<'s, Self>> {
        Ok(ar.unpack_data_raw(dest))
    }
}

/// Storage yang sudah dialokasikan tapi belum berisi value valid
///
/// Satu-satunya cara safe untuk menghasilkan [`Filled`] adalah
/// [`Slot::write`]. `UnpackingArchive` memverifikasi bahwa `Filled` yang
/// dikembalikan `Decode::unpack` menunjuk ke slot yang sama (panic jika
/// tidak), jadi `Ok` berarti value sudah dikonstruksi di storage ini.
pub struct Slot<'s, T> {
    storage: &'s mut MaybeUninit<T>,
}

impl<'s, T> Slot<'s, T> {
    #[inline(always)]
    pub fn new(storage: &'s mut MaybeUninit<T>) -> Self {
        Self { storage }
    }

    /// Konstruksi value di slot
    #[inline(always)]
    pub fn write(self, value: T) -> Filled<'s, T> {
        Filled {
            value: self.storage.write(value),
        }
    }

    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.storage.as_mut_ptr()
    }

    /// # Safety
    /// Storage harus sudah berisi value `T` yang valid (misalnya ditulis lewat
    /// `as_mut_ptr`).
    #[inline(always)]
    pub unsafe fn assume_filled(self) -> Filled<'s, T> {
        Filled {
            value: self.storage.assume_init_mut(),
        }
    }
}

/// Bukti bahwa sebuah [`Slot`] sudah berisi value valid
#[must_use = "Filled must be returned from Decode::unpack"]
pub struct Filled<'s, T> {
    value: &'s mut T,
}

impl<'s, T> Filled<'s, T> {
    #[inline(always)]
    pub fn get(&self) -> &T {
        self.value
    }

    #[inline(always)]
    pub(crate) fn as_ptr(&self) -> *const T {
        self.value as *const T
    }
}
