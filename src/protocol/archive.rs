//! Sizing, packing, dan unpacking archive
//!
//! Tiga archive ini menelusuri struktur logis value dengan urutan yang sama:
//! - `SizingArchive`: hanya menjumlahkan ukuran
//! - `PackingArchive`: menulis bytes secara sekuensial ke buffer yang sudah di-size
//! - `UnpackingArchive`: membaca bytes dan mengkonstruksi value di storage caller
//!
//! Archive dibuat per operasi lalu dibuang. Satu archive memiliki (atau
//! meminjam secara eksklusif) satu buffer; cursor tidak aman untuk
//! dimajukan dari dua thread sekaligus.

use std::alloc::Layout;
use std::mem::{self, MaybeUninit};
use std::ptr::{self, NonNull};

use super::error::Result;
use super::traits::{Decode, DirectlySerializable, Encode, Filled, Slot};
use crate::core::{Allocator, DynamicSerializationBuffer, SerializationBuffer, SystemAllocator};

/// Batas ukuran type yang direkonstruksi di stack saat unpack.
///
/// Type yang lebih besar direkonstruksi di heap storage dari allocator archive.
/// Override saat build: `TESSERA_UNPACK_STACK_ALLOCATION_MAX=4096 cargo build`.
pub const STACK_ALLOCATION_MAX: usize =
    parse_limit(option_env!("TESSERA_UNPACK_STACK_ALLOCATION_MAX"), 1024);

const fn parse_limit(value: Option<&str>, default: usize) -> usize {
    let bytes = match value {
        Some(v) => v.as_bytes(),
        None => return default,
    };
    if bytes.is_empty() {
        return default;
    }

    let mut result = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        if digit < b'0' || digit > b'9' {
            panic!("TESSERA_UNPACK_STACK_ALLOCATION_MAX must be a decimal byte count");
        }
        result = result * 10 + (digit - b'0') as usize;
        i += 1;
    }
    result
}

/// View bytes dari slice type yang directly serializable
#[inline(always)]
fn raw_bytes_of<T: DirectlySerializable>(items: &[T]) -> &[u8] {
    // SAFETY: DirectlySerializable menjamin tidak ada padding, semua byte ter-inisialisasi
    unsafe { std::slice::from_raw_parts(items.as_ptr() as *const u8, mem::size_of_val(items)) }
}

// ============================================================================
// Sizing
// ============================================================================

/// Akumulator ukuran encoded value
#[derive(Debug, Default, Clone)]
pub struct SizingArchive {
    size: usize,
}

impl SizingArchive {
    #[inline(always)]
    pub fn new() -> Self {
        Self { size: 0 }
    }

    #[inline(always)]
    pub fn add_to_size_raw(&mut self, size: usize) {
        self.size += size;
    }

    /// Dispatch ke `Encode::compute_size` milik type value
    #[inline(always)]
    pub fn feed<T: Encode + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.compute_size(self);
        self
    }

    /// Total bytes yang akan ditulis packing pass
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }
}

// ============================================================================
// Packing
// ============================================================================

/// Write cursor ke buffer yang kapasitasnya berasal dari sizing pass
pub struct PackingArchive<B: SerializationBuffer = DynamicSerializationBuffer> {
    buffer: B,
    cursor: usize,
}

impl<B: SerializationBuffer> PackingArchive<B> {
    #[inline(always)]
    pub fn new(buffer: B) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Dispatch ke `Encode::pack` milik type value
    #[inline(always)]
    pub fn feed<T: Encode + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.pack(self);
        self
    }

    /// Bulk copy bit pattern `items` ke buffer
    ///
    /// Memakai memcpy, bukan assignment per elemen: yang ditulis adalah
    /// representasi memory, bukan semantik copy milik type.
    ///
    /// # Panics
    /// Panic jika penulisan melewati kapasitas buffer (sizing/pack mismatch).
    #[inline(always)]
    pub fn pack_data_raw<T: DirectlySerializable>(&mut self, items: &[T]) {
        let bytes = raw_bytes_of(items);
        let len = bytes.len();
        let capacity = self.buffer.capacity();

        assert!(
            len <= capacity - self.cursor,
            "packing overflow: writing {} bytes at offset {} exceeds buffer capacity {}",
            len,
            self.cursor,
            capacity
        );

        // SAFETY: region tujuan berada di dalam kapasitas buffer (dicek di atas),
        // dan source adalah slice milik caller yang tidak overlap dengan buffer
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), self.buffer.as_mut_ptr().add(self.cursor), len);
        }

        self.cursor += len;
    }

    /// Total bytes yang sudah ditulis (posisi cursor)
    #[inline(always)]
    pub fn bytes_written(&self) -> usize {
        self.cursor
    }

    /// Sisa kapasitas buffer
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.buffer.capacity() - self.cursor
    }

    #[inline(always)]
    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Lepas buffer ke caller (misalnya untuk diserahkan ke transport)
    #[inline(always)]
    pub fn into_buffer(self) -> B {
        self.buffer
    }
}

// ============================================================================
// Unpacking
// ============================================================================

/// Heap storage sementara untuk satu `T`, selalu dikembalikan ke allocator saat drop
///
/// Guard ini tidak pernah men-drop `T`: value dipindahkan keluar sebelum guard
/// drop, atau memang belum pernah dikonstruksi (error / panic di tengah unpack).
struct ScopedAllocation<'a, T, A: Allocator> {
    ptr: NonNull<MaybeUninit<T>>,
    allocator: &'a A,
}

impl<'a, T, A: Allocator> ScopedAllocation<'a, T, A> {
    fn new(allocator: &'a A) -> Result<Self> {
        let ptr = allocator.allocate(Layout::new::<T>())?;
        Ok(Self {
            ptr: ptr.cast(),
            allocator,
        })
    }

    #[inline(always)]
    fn storage(&mut self) -> &mut MaybeUninit<T> {
        // SAFETY: ptr valid dan aligned untuk T selama guard hidup
        unsafe { self.ptr.as_mut() }
    }
}

impl<T, A: Allocator> Drop for ScopedAllocation<'_, T, A> {
    fn drop(&mut self) {
        // SAFETY: ptr berasal dari allocate dengan layout yang sama
        unsafe { self.allocator.deallocate(self.ptr.cast(), Layout::new::<T>()) };
    }
}

/// Read cursor ke byte source + allocator capability
pub struct UnpackingArchive<'a, A: Allocator = SystemAllocator> {
    source: &'a [u8],
    cursor: usize,
    allocator: &'a A,
}

impl<'a, A: Allocator> UnpackingArchive<'a, A> {
    #[inline(always)]
    pub fn new(source: &'a [u8], allocator: &'a A) -> Self {
        Self {
            source,
            cursor: 0,
            allocator,
        }
    }

    #[inline(always)]
    fn take(&mut self, len: usize) -> &'a [u8] {
        let available = self.source.len() - self.cursor;
        assert!(
            len <= available,
            "unpacking underrun: reading {} bytes at offset {} but only {} remain",
            len,
            self.cursor,
            available
        );

        let source = self.source;
        let bytes = &source[self.cursor..self.cursor + len];
        self.cursor += len;
        bytes
    }

    /// Raw copy `size_of::<T>()` bytes ke slot
    #[inline(always)]
    pub fn unpack_data_raw<'s, T: DirectlySerializable>(
        &mut self,
        mut dest: Slot<'s, T>,
    ) -> Filled<'s, T> {
        let bytes = self.take(mem::size_of::<T>());

        // SAFETY: slot valid untuk satu T; source bisa unaligned jadi copy per byte
        // ke storage tujuan yang aligned. DirectlySerializable menjamin setiap
        // bit pattern valid.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), dest.as_mut_ptr() as *mut u8, bytes.len());
            dest.assume_filled()
        }
    }

    /// Pinjam `len` raw bytes berikutnya dari source (zero-copy)
    #[inline(always)]
    pub fn read_raw_bytes(&mut self, len: usize) -> &'a [u8] {
        self.take(len)
    }

    /// Konstruksi item berikutnya langsung di `dest`
    ///
    /// # Panics
    /// Panic jika `Decode::unpack` mengembalikan [`Filled`] untuk slot lain.
    #[inline(always)]
    pub fn unpack_next_item_at<'s, T: Decode>(
        &mut self,
        mut dest: Slot<'s, T>,
    ) -> Result<Filled<'s, T>> {
        let expected = dest.as_mut_ptr() as *const T;
        let filled = T::unpack(dest, self)?;
        check_filled(&filled, expected);
        Ok(filled)
    }

    /// Rekonstruksi item berikutnya dan kembalikan sebagai owned value
    ///
    /// Type kecil (<= [`STACK_ALLOCATION_MAX`]) memakai storage di stack; type
    /// besar memakai heap storage dari allocator archive yang dilepas di semua
    /// exit path.
    pub fn unpack_next_item_as<T: Decode>(&mut self) -> Result<T> {
        if mem::size_of::<T>() > STACK_ALLOCATION_MAX {
            let mut scoped = ScopedAllocation::<T, A>::new(self.allocator)?;
            self.unpack_into(scoped.storage())?;
            // SAFETY: unpack_into sukses, storage berisi T valid; dipindahkan keluar
            // sebelum guard melepas storage
            Ok(unsafe { scoped.storage().assume_init_read() })
        } else {
            let mut storage = MaybeUninit::<T>::uninit();
            self.unpack_into(&mut storage)?;
            // SAFETY: unpack_into sukses
            Ok(unsafe { storage.assume_init() })
        }
    }

    fn unpack_into<T: Decode>(&mut self, storage: &mut MaybeUninit<T>) -> Result<()> {
        self.unpack_next_item_at(Slot::new(storage)).map(|_| ())
    }

    #[inline(always)]
    pub fn allocator(&self) -> &'a A {
        self.allocator
    }

    /// Total bytes yang sudah dikonsumsi
    #[inline(always)]
    pub fn bytes_read(&self) -> usize {
        self.cursor
    }

    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.source.len() - self.cursor
    }
}

/// Filled dari slot lain berarti slot caller belum ter-inisialisasi
#[inline(always)]
fn check_filled<T>(filled: &Filled<'_, T>, expected: *const T) {
    assert!(
        ptr::eq(filled.as_ptr(), expected),
        "Decode::unpack for {} returned a Filled for a different slot",
        std::any::type_name::<T>()
    );
}
