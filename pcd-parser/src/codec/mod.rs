//! Decompression codecs for PCD bodies.

pub mod lzf;
