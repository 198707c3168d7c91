//! Core module: buffer dan allocator untuk serialization
//!
//! Prinsip desain:
//! - Exact-size: Buffer dialokasikan sekali dengan ukuran hasil sizing pass
//! - Pluggable allocator: Semua storage lewat trait `Allocator`
//! - No hidden cursor: Posisi baca/tulis milik archive, bukan buffer

mod allocator;
mod buffer;
mod mmap_buffer;

#[cfg(unix)]
pub use allocator::MallocAllocator;
pub use allocator::{AllocError, Allocator, SystemAllocator};
pub use buffer::{DynamicSerializationBuffer, SerializationBuffer};
pub use mmap_buffer::MmapBuffer;
