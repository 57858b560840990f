//! Decoder for the Point Cloud Data (PCD) file format.
//!
//! [`parse`] turns a complete PCD buffer into a [`PointCloud`]: the parsed header
//! plus, when the file declares x, y and z, a flat point-major position buffer.
//! [`load`] reads the buffer first.

pub mod codec;
pub mod error;
pub mod loader;
pub mod parsers;

pub use error::{PcdError, Result};
pub use loader::{load, parse_file};
pub use parsers::parse;

pub use pcd_core::pointcloud::point::PointCloud;
