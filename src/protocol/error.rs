//! Error yang bisa di-recover oleh caller
//!
//! Contract violation (packing melewati kapasitas, membaca melewati akhir
//! source) bukan error biasa: itu bug di encoder dan langsung panic.

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

use crate::core::AllocError;

#[derive(Debug, Error)]
pub enum SerializationError {
    /// Allocator gagal menyediakan storage (buffer atau temporary unpack)
    #[error(transparent)]
    Allocation(#[from] AllocError),

    #[error("unpacked string is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),

    #[error("unpacked value {0:#x} is not a valid char")]
    InvalidChar(u32),

    /// Gagal membuat mmap-backed buffer
    #[error("buffer I/O failed: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, SerializationError>;
