//! Arithmetic types, arrays, `bool`, `char`

use crate::core::{Allocator, SerializationBuffer};
use crate::protocol::{
    Decode, DirectlySerializable, Encode, Filled, PackingArchive, Result, SerializationError,
    SizingArchive, Slot, UnpackingArchive,
};

macro_rules! directly_serializable {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: primitive numeric, tanpa padding, semua bit pattern valid
            unsafe impl DirectlySerializable for $ty {}
        )*
    };
}

directly_serializable!(u8, u16, u32, u64, u128, usize);
directly_serializable!(i8, i16, i32, i64, i128, isize);
directly_serializable!(f32, f64);
directly_serializable!(());

// SAFETY: stride array = size_of::<T>(), jadi tidak ada padding antar elemen
unsafe impl<T: DirectlySerializable, const N: usize> DirectlySerializable for [T; N] {}

// bool dan char tidak valid untuk semua bit pattern, jadi lewat custom encoder
// dengan layout yang sama dengan raw copy (1 byte / 4 bytes).

impl Encode for bool {
    #[inline(always)]
    fn compute_size(&self, ar: &mut SizingArchive) {
        ar.feed(&(*self as u8));
    }

    #[inline(always)]
    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
        ar.feed(&(*self as u8));
    }
}

impl Decode for bool {
    #[inline(always)]
    fn unpack<'s, A: Allocator>(
        dest: Slot<'s, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<Filled<'s, Self>> {
        let byte: u8 = ar.unpack_next_item_as()?;
        Ok(dest.write(byte != 0))
    }
}

impl Encode for char {
    #[inline(always)]
    fn compute_size(&self, ar: &mut SizingArchive) {
        ar.feed(&(*self as u32));
    }

    #[inline(always)]
    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
        ar.feed(&(*self as u32));
    }
}

impl Decode for char {
    fn unpack<'s, A: Allocator>(
        dest: Slot<'s, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<Filled<'s, Self>> {
        let scalar: u32 = ar.unpack_next_item_as()?;
        let value = char::from_u32(scalar).ok_or(SerializationError::InvalidChar(scalar))?;
        Ok(dest.write(value))
    }
}
