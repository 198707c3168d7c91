//! Round Trip Test - Size / Pack / Unpack End-to-End
//!
//! Memverifikasi kontrak utama protokol:
//! - Round trip menghasilkan value yang sama
//! - Sizing pass == bytes yang ditulis packing pass
//! - Satu type, satu binding (raw-copy ATAU custom encoder)
//! - Storage sementara selalu dilepas, termasuk saat allocator gagal
//!
//! Usage:
//!   cargo test --test round_trip

#![allow(clippy::approx_constant)]

use std::alloc::Layout;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::ptr::NonNull;

use static_assertions::{assert_impl_all, assert_not_impl_any};
use tessera::core::{
    AllocError, Allocator, DynamicSerializationBuffer, SerializationBuffer, SystemAllocator,
};
use tessera::protocol::{
    Decode, DirectlySerializable, Encode, Filled, PackingArchive, Result, SerializationError,
    SerializationHandler, SizingArchive, Slot, UnpackingArchive, STACK_ALLOCATION_MAX,
};

// ============================================================================
// Test types
// ============================================================================

/// Plain struct tanpa padding: raw-copy path
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
struct Quote {
    price: i64,
    quantity: u32,
    venue: u32,
}

// SAFETY: repr(C), 8 + 4 + 4 bytes tanpa padding, semua field numeric
unsafe impl DirectlySerializable for Quote {}

/// Struct dengan heap substructure: custom encoder
#[derive(Debug, Clone, PartialEq)]
struct Order {
    symbol: String,
    quote: Quote,
    tags: Vec<String>,
}

impl Encode for Order {
    fn compute_size(&self, ar: &mut SizingArchive) {
        ar.feed(&self.symbol).feed(&self.quote).feed(&self.tags);
    }

    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
        ar.feed(&self.symbol).feed(&self.quote).feed(&self.tags);
    }
}

impl Decode for Order {
    fn unpack<'s, A: Allocator>(
        dest: Slot<'s, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<Filled<'s, Self>> {
        let symbol = ar.unpack_next_item_as()?;
        let quote = ar.unpack_next_item_as()?;
        let tags = ar.unpack_next_item_as()?;
        Ok(dest.write(Order {
            symbol,
            quote,
            tags,
        }))
    }
}

/// Cukup besar untuk melewati batas stack saat unpack
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    levels: [Quote; 96],
    label: String,
}

impl Encode for Snapshot {
    fn compute_size(&self, ar: &mut SizingArchive) {
        ar.feed(&self.levels).feed(&self.label);
    }

    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
        ar.feed(&self.levels).feed(&self.label);
    }
}

impl Decode for Snapshot {
    fn unpack<'s, A: Allocator>(
        dest: Slot<'s, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<Filled<'s, Self>> {
        let levels = ar.unpack_next_item_as()?;
        let label = ar.unpack_next_item_as()?;
        Ok(dest.write(Snapshot { levels, label }))
    }
}

fn sample_snapshot() -> Snapshot {
    let mut levels = [Quote {
        price: 0,
        quantity: 0,
        venue: 0,
    }; 96];
    for (i, level) in levels.iter_mut().enumerate() {
        level.price = 10_000 + i as i64;
        level.quantity = (i * 7) as u32;
        level.venue = (i % 3) as u32;
    }
    Snapshot {
        levels,
        label: "depth".to_string(),
    }
}

// ============================================================================
// Static dispatch: tepat satu binding per type
// ============================================================================

assert_impl_all!(i32: DirectlySerializable, Encode, Decode);
assert_impl_all!(f64: DirectlySerializable, Encode, Decode);
assert_impl_all!([u16; 8]: DirectlySerializable, Encode, Decode);
assert_impl_all!(Quote: DirectlySerializable, Encode, Decode);

assert_impl_all!((i32, i32): Encode, Decode);
assert_impl_all!((String, f64): Encode, Decode);
assert_impl_all!(Order: Encode, Decode);
assert_not_impl_any!((i32, i32): DirectlySerializable);
assert_not_impl_any!(String: DirectlySerializable);
assert_not_impl_any!(Vec<u8>: DirectlySerializable);
assert_not_impl_any!(Order: DirectlySerializable);
assert_not_impl_any!(bool: DirectlySerializable);

// Pack-only: data pinjaman tidak punya unpack
assert_impl_all!(&'static str: Encode);
assert_not_impl_any!(&'static str: Decode);
assert_not_impl_any!(&'static [u32]: Decode);

// Tidak ada binding sama sekali
assert_not_impl_any!(HashMap<u32, u32>: Encode, Decode);

// ============================================================================
// Helpers
// ============================================================================

/// Sizing total dan packing cursor advance untuk value yang sama
fn sized_and_packed<T: Encode + ?Sized>(value: &T) -> (usize, usize) {
    let mut sizing = SizingArchive::new();
    sizing.feed(value);

    let buffer = DynamicSerializationBuffer::new(sizing.size()).unwrap();
    let mut packing = PackingArchive::new(buffer);
    packing.feed(value);

    (sizing.size(), packing.bytes_written())
}

fn round_trip<T: Encode + Decode>(value: &T) -> T {
    let handler = SerializationHandler::new();
    let buffer = handler.serialize(value).unwrap();
    handler.deserialize(buffer.as_ref()).unwrap()
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn pair_int_int() {
    let input = (1i32, 2i32);
    assert_eq!(round_trip(&input), input);
}

#[test]
fn pair_string_double() {
    let input = (String::from("hello"), 3.14f64);
    assert_eq!(round_trip(&input), input);
}

#[test]
fn directly_serializable_struct() {
    let input = Quote {
        price: -42,
        quantity: 100,
        venue: 7,
    };
    assert_eq!(SerializationHandler::new().get_size(&input), 16);
    assert_eq!(round_trip(&input), input);
}

#[test]
fn custom_encoder_struct() {
    let input = Order {
        symbol: "ACME".to_string(),
        quote: Quote {
            price: 10_125,
            quantity: 3,
            venue: 1,
        },
        tags: vec!["ioc".to_string(), "post-only".to_string()],
    };
    assert_eq!(round_trip(&input), input);
}

// ============================================================================
// Size/pack equality + buffer exactness
// ============================================================================

#[test]
fn size_equals_packed_bytes_for_raw_pair() {
    let (sized, packed) = sized_and_packed(&(1i32, 2i32));
    assert_eq!(sized, 8);
    assert_eq!(sized, packed);
}

#[test]
fn size_equals_packed_bytes_for_variable_length_pair() {
    let (sized, packed) = sized_and_packed(&(String::from("hello"), 3.14f64));
    assert_eq!(sized, std::mem::size_of::<usize>() + 5 + 8);
    assert_eq!(sized, packed);
}

#[test]
fn buffer_exactness_scalar_and_string() {
    for (sized, packed) in [
        sized_and_packed(&0xABCDu16),
        sized_and_packed(&u128::MAX),
        sized_and_packed("variable length payload"),
        sized_and_packed(&String::new()),
    ] {
        assert_eq!(sized, packed);
    }
}

#[test]
fn packed_buffer_is_fully_written() {
    let handler = SerializationHandler::new();
    let buffer = handler.serialize(&(String::from("abc"), 9u8)).unwrap();

    let mut expected = 3usize.to_ne_bytes().to_vec();
    expected.extend_from_slice(b"abc");
    expected.push(9);
    assert_eq!(buffer.as_ref(), expected.as_slice());
}

// ============================================================================
// Composability
// ============================================================================

#[test]
fn nested_pair_custom_first_raw_second() {
    let input = ((String::from("key"), vec![1u8, 2, 3]), (7i32, 8i32));
    assert_eq!(round_trip(&input), input);
}

#[test]
fn nested_pair_raw_first_custom_second() {
    let input = (
        Quote {
            price: 5,
            quantity: 6,
            venue: 7,
        },
        Some(String::from("maybe")),
    );
    assert_eq!(round_trip(&input), input);
}

#[test]
fn key_value_pairs_in_vec() {
    let input: Vec<(String, Quote)> = (0..10)
        .map(|i| {
            (
                format!("sym-{}", i),
                Quote {
                    price: i * 100,
                    quantity: i as u32,
                    venue: 0,
                },
            )
        })
        .collect();
    assert_eq!(round_trip(&input), input);
}

#[test]
fn sequential_items_in_one_buffer() {
    let mut sizing = SizingArchive::new();
    sizing.feed(&1u8).feed("two").feed(&3.0f32);

    let buffer = DynamicSerializationBuffer::new(sizing.size()).unwrap();
    let mut packing = PackingArchive::new(buffer);
    packing.feed(&1u8).feed("two").feed(&3.0f32);
    let buffer = packing.into_buffer();

    let mut ar = UnpackingArchive::new(buffer.as_ref(), &SystemAllocator);
    assert_eq!(ar.unpack_next_item_as::<u8>().unwrap(), 1);
    assert_eq!(ar.unpack_next_item_as::<String>().unwrap(), "two");
    assert_eq!(ar.unpack_next_item_as::<f32>().unwrap(), 3.0);
    assert_eq!(ar.remaining(), 0);
}

// ============================================================================
// Allocator integration
// ============================================================================

/// Allocator yang mencatat alokasi aktif
#[derive(Default)]
struct CountingAllocator {
    live: RefCell<HashMap<usize, Layout>>,
    total: Cell<usize>,
    fail_above: Option<usize>,
}

impl CountingAllocator {
    fn failing_above(size: usize) -> Self {
        Self {
            fail_above: Some(size),
            ..Self::default()
        }
    }

    fn live_allocations(&self) -> usize {
        self.live.borrow().len()
    }
}

unsafe impl Allocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> std::result::Result<NonNull<u8>, AllocError> {
        if matches!(self.fail_above, Some(limit) if layout.size() > limit) {
            return Err(AllocError::for_layout(layout));
        }
        let ptr = SystemAllocator.allocate(layout)?;
        self.live.borrow_mut().insert(ptr.as_ptr() as usize, layout);
        self.total.set(self.total.get() + 1);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        let recorded = self
            .live
            .borrow_mut()
            .remove(&(ptr.as_ptr() as usize))
            .expect("double free or foreign pointer");
        assert_eq!(recorded, layout);
        SystemAllocator.deallocate(ptr, layout);
    }
}

#[test]
fn large_value_uses_allocator_and_releases_it() {
    assert!(std::mem::size_of::<Snapshot>() > STACK_ALLOCATION_MAX);

    let allocator = CountingAllocator::default();
    let input = sample_snapshot();

    let output: Snapshot = {
        let handler = SerializationHandler::with_allocator(&allocator);
        let buffer = handler.serialize(&input).unwrap();
        assert_eq!(allocator.live_allocations(), 1); // buffer

        let output = handler.deserialize(buffer.as_ref()).unwrap();
        assert_eq!(allocator.live_allocations(), 1); // temporary sudah dilepas
        output
    };

    assert_eq!(output, input);
    assert_eq!(allocator.live_allocations(), 0);
    // buffer + temporary untuk Snapshot + temporary untuk levels
    assert_eq!(allocator.total.get(), 3);
}

#[test]
fn small_value_does_not_touch_allocator() {
    let allocator = CountingAllocator::default();
    let bytes = SerializationHandler::new()
        .serialize(&(4u64, 2u64))
        .unwrap()
        .to_vec();

    let mut ar = UnpackingArchive::new(&bytes, &allocator);
    let output: (u64, u64) = ar.unpack_next_item_as().unwrap();

    assert_eq!(output, (4, 2));
    assert_eq!(allocator.total.get(), 0);
}

#[test]
fn allocation_failure_during_unpack_is_propagated() {
    let bytes = SerializationHandler::new()
        .serialize(&sample_snapshot())
        .unwrap()
        .to_vec();

    let allocator = CountingAllocator::failing_above(STACK_ALLOCATION_MAX);
    let handler = SerializationHandler::with_allocator(&allocator);
    let err = handler.deserialize::<Snapshot>(&bytes).unwrap_err();

    assert!(matches!(err, SerializationError::Allocation(_)));
    assert_eq!(allocator.live_allocations(), 0);
}

#[test]
fn allocation_failure_for_buffer_is_propagated() {
    let allocator = CountingAllocator::failing_above(4);
    let handler = SerializationHandler::with_allocator(&allocator);

    let err = handler.serialize(&[0u8; 64]).unwrap_err();
    assert!(matches!(err, SerializationError::Allocation(e) if e.size == 64));
    assert_eq!(allocator.live_allocations(), 0);
}

#[test]
fn decode_error_after_heap_allocation_releases_storage() {
    // Snapshot dengan label bukan UTF-8: gagal setelah heap temporary dialokasikan
    let mut bytes = SerializationHandler::new()
        .serialize(&sample_snapshot())
        .unwrap()
        .to_vec();
    let label_start = bytes.len() - "depth".len();
    bytes[label_start] = 0xFF;

    let allocator = CountingAllocator::default();
    let handler = SerializationHandler::with_allocator(&allocator);
    let err = handler.deserialize::<Snapshot>(&bytes).unwrap_err();

    assert!(matches!(err, SerializationError::InvalidUtf8(_)));
    assert_eq!(allocator.total.get(), 2);
    assert_eq!(allocator.live_allocations(), 0);
}

#[cfg(unix)]
#[test]
fn malloc_allocator_handler() {
    use tessera::core::MallocAllocator;

    let handler = SerializationHandler::with_allocator(MallocAllocator);
    let input = sample_snapshot();
    let buffer = handler.serialize(&input).unwrap();
    let output: Snapshot = handler.deserialize(buffer.as_ref()).unwrap();
    assert_eq!(output, input);
}

/// Decoder yang panic setelah storage heap dialokasikan
struct Exploding {
    _levels: [Quote; 96],
}

impl Decode for Exploding {
    fn unpack<'s, A: Allocator>(
        _dest: Slot<'s, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<Filled<'s, Self>> {
        let _levels: [Quote; 96] = ar.unpack_next_item_as()?;
        panic!("decoder failed midway");
    }
}

#[test]
fn panic_during_heap_unpack_releases_storage() {
    assert!(std::mem::size_of::<Exploding>() > STACK_ALLOCATION_MAX);

    let bytes = SerializationHandler::new()
        .serialize(&sample_snapshot().levels)
        .unwrap()
        .to_vec();

    let allocator = CountingAllocator::default();
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let handler = SerializationHandler::with_allocator(&allocator);
        let _ = handler.deserialize::<Exploding>(&bytes);
    }));

    assert!(result.is_err());
    // temporary untuk Exploding + temporary untuk levels
    assert_eq!(allocator.total.get(), 2);
    assert_eq!(allocator.live_allocations(), 0);
}

#[test]
fn size_only_operations_on_custom_allocator_handler() {
    let allocator = CountingAllocator::default();
    let handler = SerializationHandler::with_allocator(&allocator);
    let input = (String::from("hello"), 3.14f64);

    assert_eq!(handler.get_size(&input), std::mem::size_of::<usize>() + 5 + 8);

    let buffer = handler.serialize_into(&input, vec![0u8; 64]);
    let (text, value): (String, f64) = handler.deserialize(&buffer).unwrap();
    assert_eq!(text, "hello");
    assert_eq!(value, 3.14);
    assert_eq!(allocator.total.get(), 0);
}

// ============================================================================
// Custom buffers
// ============================================================================

/// Buffer fixed-size di stack milik caller
struct StackBuffer {
    bytes: [u8; 32],
}

// SAFETY: pointer ke array milik sendiri, valid untuk 32 bytes
unsafe impl SerializationBuffer for StackBuffer {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.bytes.as_mut_ptr()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[test]
fn pack_into_custom_buffer() {
    let handler = SerializationHandler::new();
    let input = (0xDEAD_BEEFu64, String::from("stack"));

    let buffer = handler.serialize_into(&input, StackBuffer { bytes: [0; 32] });
    let used = handler.get_size(&input);
    assert!(buffer.as_bytes()[used..].iter().all(|&b| b == 0));

    let output: (u64, String) = handler.deserialize_buffer(buffer).unwrap();
    assert_eq!(output, input);
}

// ============================================================================
// Contract violations
// ============================================================================

/// Encoder yang sengaja salah: size 4 bytes, pack 8 bytes
struct Undersized;

impl Encode for Undersized {
    fn compute_size(&self, ar: &mut SizingArchive) {
        ar.add_to_size_raw(4);
    }

    fn pack<B: SerializationBuffer>(&self, ar: &mut PackingArchive<B>) {
        ar.feed(&0u64);
    }
}

#[test]
#[should_panic(expected = "packing overflow")]
fn pack_beyond_sized_capacity_panics() {
    let _ = SerializationHandler::new().serialize(&Undersized);
}

/// Encoder yang return Filled dari slot lain
struct Impostor(u32);

impl Decode for Impostor {
    fn unpack<'s, A: Allocator>(
        _dest: Slot<'s, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<Filled<'s, Self>> {
        let value: u32 = ar.unpack_next_item_as()?;
        let leaked: &'s mut std::mem::MaybeUninit<Self> =
            Box::leak(Box::new(std::mem::MaybeUninit::uninit()));
        Ok(Slot::new(leaked).write(Impostor(value)))
    }
}

#[test]
#[should_panic(expected = "returned a Filled for a different slot")]
fn filled_from_foreign_slot_panics() {
    let bytes = 5u32.to_ne_bytes();
    let mut ar = UnpackingArchive::new(&bytes, &SystemAllocator);
    let _ = ar.unpack_next_item_as::<Impostor>();
}

#[test]
#[should_panic(expected = "returned a Filled for a different slot")]
fn filled_from_foreign_slot_panics_in_caller_storage() {
    let bytes = 5u32.to_ne_bytes();
    let mut storage = std::mem::MaybeUninit::<Impostor>::uninit();
    let mut ar = UnpackingArchive::new(&bytes, &SystemAllocator);
    let _ = ar.unpack_next_item_at(Slot::new(&mut storage));
}

#[test]
fn unpack_into_caller_storage() {
    let bytes = SerializationHandler::new()
        .serialize(&(String::from("placed"), 11u16))
        .unwrap()
        .to_vec();

    let mut storage = std::mem::MaybeUninit::<(String, u16)>::uninit();
    let mut ar = UnpackingArchive::new(&bytes, &SystemAllocator);
    let filled = ar.unpack_next_item_at(Slot::new(&mut storage)).unwrap();
    assert_eq!(filled.get().0, "placed");
    drop(filled);

    // SAFETY: unpack_next_item_at sukses, slot berisi value valid
    let value = unsafe { storage.assume_init() };
    assert_eq!(value, (String::from("placed"), 11));
}
