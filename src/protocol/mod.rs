//! Protocol Layer: Three-Phase Binary Serialization
//!
//! Prinsip desain:
//! - Static dispatch: Binding encoder per type di-resolve saat compile
//! - Raw-copy path: Type `DirectlySerializable` di-copy sebagai bit pattern
//! - Exact sizing: Packing menulis persis sebanyak hasil sizing pass

mod archive;
mod error;
mod handler;
mod traits;

pub use archive::{PackingArchive, SizingArchive, UnpackingArchive, STACK_ALLOCATION_MAX};
pub use error::{Result, SerializationError};
pub use handler::SerializationHandler;
pub use traits::{Decode, DirectlySerializable, Encode, Filled, Slot};
