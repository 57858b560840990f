use pcd_core::pointcloud::header::{DataEncoding, FieldType, PcdHeader};

use crate::error::{PcdError, Result};

/// Where one coordinate field lives, and how it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOffset {
    pub offset: usize,
    pub field_type: FieldType,
    pub size: usize,
}

/// Offsets of x/y/z plus the running total over all fields.
///
/// Units depend on the encoding:
/// - ascii: column index within a line; `stride` is the number of columns.
/// - binary: byte position within one point record; `stride` is the record size.
/// - binary_compressed: byte position within the whole decompressed body, where each
///   field's values are stored contiguously; `stride` is the size of that body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Offsets {
    pub x: Option<FieldOffset>,
    pub y: Option<FieldOffset>,
    pub z: Option<FieldOffset>,
    pub stride: usize,
}

impl Offsets {
    pub fn xyz(&self) -> Option<[FieldOffset; 3]> {
        Some([self.x?, self.y?, self.z?])
    }
}

/// Fails with `InvalidHeaderValue` when the running total overflows `usize`.
pub fn calculate_offsets(header: &PcdHeader) -> Result<Offsets> {
    let mut offsets = Offsets::default();

    for (i, field) in header.fields.iter().enumerate() {
        let current = offsets.stride;
        let slot = match field.as_str() {
            "x" => Some(&mut offsets.x),
            "y" => Some(&mut offsets.y),
            "z" => Some(&mut offsets.z),
            _ => None,
        };
        // first occurrence wins
        if let Some(slot) = slot {
            slot.get_or_insert(FieldOffset {
                offset: current,
                field_type: header.field_type[i],
                size: header.size[i],
            });
        }

        let advance = match header.data {
            DataEncoding::Ascii => Some(1),
            DataEncoding::Binary => Some(header.size[i]),
            DataEncoding::BinaryCompressed => header.size[i].checked_mul(header.points),
        };
        offsets.stride = advance
            .and_then(|advance| offsets.stride.checked_add(advance))
            .ok_or_else(|| PcdError::InvalidHeaderValue {
                field: "SIZE",
                value: format!("{:?} for {} points", header.size, header.points),
            })?;
    }

    Ok(offsets)
}
