//! Serialization handler: menjalankan ketiga pass dalam satu panggilan
//!
//! `serialize`: sizing pass → alokasi buffer persis → packing pass.
//! `deserialize`: unpacking pass ke value owned.

use std::any::type_name;
use std::path::Path;

use tracing::{trace, warn};

use super::archive::{PackingArchive, SizingArchive, UnpackingArchive};
use super::error::{Result, SerializationError};
use super::traits::{Decode, Encode};
use crate::core::{
    Allocator, DynamicSerializationBuffer, MmapBuffer, SerializationBuffer, SystemAllocator,
};

/// Entry point sederhana untuk size/pack/unpack
///
/// Allocator dipakai untuk buffer hasil `serialize` dan untuk storage
/// sementara saat unpack type besar.
#[derive(Debug, Clone, Default)]
pub struct SerializationHandler<A: Allocator = SystemAllocator> {
    allocator: A,
}

impl SerializationHandler<SystemAllocator> {
    pub fn new() -> Self {
        Self {
            allocator: SystemAllocator,
        }
    }
}

impl<A: Allocator> SerializationHandler<A> {
    pub fn with_allocator(allocator: A) -> Self {
        Self { allocator }
    }

    #[inline(always)]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Sizing pass saja
    #[inline]
    pub fn get_size<T: Encode + ?Sized>(&self, value: &T) -> usize {
        let mut ar = SizingArchive::new();
        ar.feed(value);
        ar.size()
    }

    /// Pack `value` ke buffer milik caller
    ///
    /// # Panics
    /// Panic jika kapasitas buffer lebih kecil dari hasil sizing pass.
    pub fn serialize_into<T: Encode + ?Sized, B: SerializationBuffer>(&self, value: &T, buffer: B) -> B {
        let size = self.get_size(value);
        assert!(
            buffer.capacity() >= size,
            "buffer capacity {} is smaller than encoded size {} of {}",
            buffer.capacity(),
            size,
            type_name::<T>()
        );
        pack_sized(value, size, buffer)
    }

    /// Pack ke mmap-backed buffer; anonymous jika `path` adalah `None`
    pub fn serialize_mmap<T: Encode + ?Sized>(&self, value: &T, path: Option<&Path>) -> Result<MmapBuffer> {
        let size = self.get_size(value);
        let buffer = match path {
            Some(path) => MmapBuffer::file(path, size)?,
            None => MmapBuffer::anonymous(size)?,
        };
        Ok(pack_sized(value, size, buffer))
    }

    /// Size, alokasi, lalu pack `value` ke buffer baru
    pub fn serialize<T: Encode + ?Sized>(&self, value: &T) -> Result<DynamicSerializationBuffer<A>>
    where
        A: Clone,
    {
        let size = self.get_size(value);
        trace!(value_type = type_name::<T>(), size, "sizing pass complete");

        let buffer = DynamicSerializationBuffer::with_allocator(size, self.allocator.clone())
            .map_err(|err| {
                warn!(value_type = type_name::<T>(), size, %err, "serialization buffer allocation failed");
                SerializationError::from(err)
            })?;

        Ok(pack_sized(value, size, buffer))
    }

    /// Rekonstruksi `T` dari bytes hasil `serialize::<T>`
    pub fn deserialize<T: Decode>(&self, bytes: &[u8]) -> Result<T> {
        let mut ar = UnpackingArchive::new(bytes, &self.allocator);
        let value = ar.unpack_next_item_as::<T>().map_err(|err| {
            warn!(value_type = type_name::<T>(), %err, "unpacking failed");
            err
        })?;

        trace!(
            value_type = type_name::<T>(),
            bytes = ar.bytes_read(),
            trailing = ar.remaining(),
            "unpacking pass complete"
        );
        Ok(value)
    }

    /// Seperti `deserialize`, tapi mengkonsumsi buffer: storage dilepas setelah unpack
    pub fn deserialize_buffer<T: Decode, B: SerializationBuffer>(&self, buffer: B) -> Result<T> {
        let value = self.deserialize(buffer.as_bytes());
        drop(buffer);
        value
    }
}

fn pack_sized<T: Encode + ?Sized, B: SerializationBuffer>(value: &T, size: usize, buffer: B) -> B {
    let mut ar = PackingArchive::new(buffer);
    ar.feed(value);

    // Sizing/pack mismatch = bug di encoder
    assert_eq!(
        ar.bytes_written(),
        size,
        "encoder for {} packed a different byte count than it sized",
        type_name::<T>()
    );
    trace!(value_type = type_name::<T>(), bytes = size, "packing pass complete");

    ar.into_buffer()
}
