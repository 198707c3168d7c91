//! Tessera - Three-Phase Binary Serialization
//!
//! Arsitektur:
//! - Sizing pass: Hitung ukuran encoded value secara exact
//! - Packing pass: Tulis ke buffer yang dialokasikan sekali dengan ukuran tersebut
//! - Unpacking pass: Rekonstruksi value dari bytes, in-place ke storage caller
//!
//! Tidak ada type tag, versi schema, atau negosiasi endianness. Pengirim dan
//! penerima harus sepakat soal type value di luar protokol ini.
//!
//! ```
//! use tessera::{deserialize, serialize};
//!
//! let buffer = serialize(&(String::from("hello"), 3.14f64)).unwrap();
//! let (text, value): (String, f64) = deserialize(buffer.as_ref()).unwrap();
//! assert_eq!(text, "hello");
//! assert_eq!(value, 3.14);
//! ```

pub mod core;
pub mod protocol;
mod serializers;

use crate::core::DynamicSerializationBuffer;
use crate::protocol::{Decode, Encode, SerializationHandler};

pub use crate::protocol::{DirectlySerializable, Result, SerializationError};

/// Serialize dengan handler default (global allocator)
pub fn serialize<T: Encode + ?Sized>(value: &T) -> Result<DynamicSerializationBuffer> {
    SerializationHandler::new().serialize(value)
}

/// Deserialize dengan handler default (global allocator)
pub fn deserialize<T: Decode>(bytes: &[u8]) -> Result<T> {
    SerializationHandler::new().deserialize(bytes)
}
