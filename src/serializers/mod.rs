//! Encoder bawaan untuk standard types
//!
//! Semua impl di sini adalah instance dari customization point di
//! `protocol`; tidak ada yang mendapat perlakuan khusus dari archive.

mod primitives;
mod sequences;
mod strings;
mod tuples;
