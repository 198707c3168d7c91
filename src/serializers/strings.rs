//! Variable-length raw character data
//!
//! Wire format: `usize` length (native endian) diikuti raw UTF-8 bytes.
//!
//! `str` / `&str` hanya bisa di-size dan di-pack: data pinjaman tidak bisa
//! direkonstruksi tanpa keputusan ownership. Sisi penerima selalu unpack sebagai
//! `String` (encoding identik), yang dialokasikan lewat global allocator dan
//! dilepas oleh `Drop` milik penerima.

use crate::core::{Allocator, SerializationBuffer};
use crate::protocol::{
    Decode, Encode, Filled, PackingArchive, Result, SizingArchive, Slot, UnpackingArchive,
};

impl Encode for str {
    #[inline]
    fn compute_size(&self, ar: &mut SizingArchive) {
        ar.feed(&self.len());
        ar.add_to_size_raw(self.len());
    }

    #[inline]
    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
        ar.feed(&self.len());
        ar.pack_data_raw(self.as_bytes());
    }
}

impl Encode for &str {
    #[inline(always)]
    fn compute_size(&self, ar: &mut SizingArchive) {
        (**self).compute_size(ar);
    }

    #[inline(always)]
    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
        (**self).pack(ar);
    }
}

impl Encode for String {
    #[inline(always)]
    fn compute_size(&self, ar: &mut SizingArchive) {
        self.as_str().compute_size(ar);
    }

    #[inline(always)]
    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
        self.as_str().pack(ar);
    }
}

impl Decode for String {
    fn unpack<'s, A: Allocator>(
        dest: Slot<'s, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<Filled<'s, Self>> {
        let len: usize = ar.unpack_next_item_as()?;
        let bytes = ar.read_raw_bytes(len);
        let value = String::from_utf8(bytes.to_vec())?;
        Ok(dest.write(value))
    }
}
