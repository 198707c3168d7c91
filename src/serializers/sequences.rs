//! Slice, `Vec<T>`, `Option<T>`

use crate::core::{Allocator, SerializationBuffer};
use crate::protocol::{
    Decode, Encode, Filled, PackingArchive, Result, SizingArchive, Slot, UnpackingArchive,
};

// Sama seperti str: slice pinjaman pack-only, penerima unpack sebagai Vec<T>

impl<T: Encode> Encode for [T] {
    fn compute_size(&self, ar: &mut SizingArchive) {
        ar.feed(&self.len());
        for item in self {
            ar.feed(item);
        }
    }

    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
        ar.feed(&self.len());
        for item in self {
            ar.feed(item);
        }
    }
}

impl<T: Encode> Encode for &[T] {
    #[inline(always)]
    fn compute_size(&self, ar: &mut SizingArchive) {
        (**self).compute_size(ar);
    }

    #[inline(always)]
    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
        (**self).pack(ar);
    }
}

impl<T: Encode> Encode for Vec<T> {
    #[inline(always)]
    fn compute_size(&self, ar: &mut SizingArchive) {
        self.as_slice().compute_size(ar);
    }

    #[inline(always)]
    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
        self.as_slice().pack(ar);
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn unpack<'s, A: Allocator>(
        dest: Slot<'s, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<Filled<'s, Self>> {
        let len: usize = ar.unpack_next_item_as()?;

        // Length berasal dari input terpercaya, tapi jangan reserve melebihi sisa source
        let mut items = Vec::with_capacity(len.min(ar.remaining()));
        for _ in 0..len {
            items.push(ar.unpack_next_item_as::<T>()?);
        }

        Ok(dest.write(items))
    }
}

/// Flag `bool` 1 byte, lalu value jika `Some`
impl<T: Encode> Encode for Option<T> {
    fn compute_size(&self, ar: &mut SizingArchive) {
        ar.feed(&self.is_some());
        if let Some(value) = self {
            ar.feed(value);
        }
    }

    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
        ar.feed(&self.is_some());
        if let Some(value) = self {
            ar.feed(value);
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn unpack<'s, A: Allocator>(
        dest: Slot<'s, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<Filled<'s, Self>> {
        let present: bool = ar.unpack_next_item_as()?;
        let value = if present {
            Some(ar.unpack_next_item_as::<T>()?)
        } else {
            None
        };
        Ok(dest.write(value))
    }
}
