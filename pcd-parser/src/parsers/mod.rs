use log::debug;
use pcd_core::pointcloud::point::PointCloud;

use crate::error::Result;

pub mod body;
pub mod header;
pub mod offsets;

use body::get_decoder;
use header::{extract_header, parse_header};
use offsets::calculate_offsets;

/// Decodes a complete PCD buffer into its header and x/y/z positions.
///
/// Pure and deterministic: no I/O, no shared state.
pub fn parse(bytes: &[u8]) -> Result<PointCloud> {
    let (header_text, body) = extract_header(bytes)?;
    let header = parse_header(&header_text)?;
    let offsets = calculate_offsets(&header)?;
    debug!("Field offsets for {} body: {:?}", header.data, offsets);

    let positions = get_decoder(header.data).decode(&header, &offsets, body)?;

    Ok(PointCloud::new(header, positions))
}
