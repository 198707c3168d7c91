//! Pair dan tuple: encode field demi field, urutan kiri ke kanan
//!
//! Layout tuple di Rust tidak dijamin (boleh ada padding / reorder), jadi
//! tuple tidak pernah directly serializable. Tiap field di-resolve sendiri:
//! `(i32, i32)` tetap menghasilkan dua raw copy 4 byte.
//!
//! Untuk satu raw copy utuh, pakai struct `#[repr(C)]` tanpa padding dengan
//! `unsafe impl DirectlySerializable`; wire bytes-nya sama dengan tuple.

use crate::core::{Allocator, SerializationBuffer};
use crate::protocol::{
    Decode, Encode, Filled, PackingArchive, Result, SizingArchive, Slot, UnpackingArchive,
};

macro_rules! tuple_serializer {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            #[inline(always)]
            fn compute_size(&self, ar: &mut SizingArchive) {
                $( ar.feed(&self.$idx); )+
            }

            #[inline(always)]
            fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
                $( ar.feed(&self.$idx); )+
            }
        }

        impl<$($name: Decode),+> Decode for ($($name,)+) {
            #[inline]
            #[allow(non_snake_case)]
            fn unpack<'s, Alloc: Allocator>(
                dest: Slot<'s, Self>,
                ar: &mut UnpackingArchive<'_, Alloc>,
            ) -> Result<Filled<'s, Self>> {
                $( let $name = ar.unpack_next_item_as::<$name>()?; )+
                Ok(dest.write(($($name,)+)))
            }
        }
    };
}

tuple_serializer!(T0.0);
tuple_serializer!(T0.0, T1.1);
tuple_serializer!(T0.0, T1.1, T2.2);
tuple_serializer!(T0.0, T1.1, T2.2, T3.3);
tuple_serializer!(T0.0, T1.1, T2.2, T3.3, T4.4);
tuple_serializer!(T0.0, T1.1, T2.2, T3.3, T4.4, T5.5);
