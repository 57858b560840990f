use byteorder::{ByteOrder as _, LittleEndian};
use log::{debug, trace};
use pcd_core::pointcloud::{
    header::{DataEncoding, FieldType, PcdHeader},
    point::Positions,
};

use crate::{
    codec::lzf,
    error::{PcdError, Result},
    parsers::offsets::{FieldOffset, Offsets},
};

pub trait BodyDecoder {
    /// Decodes x/y/z of every point. Returns `Ok(None)` when the header does not
    /// declare all three axes.
    fn decode(&self, header: &PcdHeader, offsets: &Offsets, body: &[u8])
        -> Result<Option<Positions>>;
}

pub fn get_decoder(encoding: DataEncoding) -> Box<dyn BodyDecoder> {
    match encoding {
        DataEncoding::Ascii => Box::new(AsciiDecoder),
        DataEncoding::Binary => Box::new(BinaryDecoder),
        DataEncoding::BinaryCompressed => Box::new(CompressedDecoder),
    }
}

/// Whitespace-separated text, one point per line.
///
/// The body must be single-byte text with `\n`-terminated records and no embedded
/// NUL bytes; each byte is taken as one Latin-1 character. Columns are separated by
/// single spaces. A token that is missing or not a number decodes to NaN, as do all
/// coordinates of lines past the end of the body.
///
/// The output holds `header.points` positions however short the body is, so its
/// allocation is bounded by the declared POINTS alone. Callers decoding untrusted
/// input should cap POINTS before decoding.
pub struct AsciiDecoder;

impl BodyDecoder for AsciiDecoder {
    fn decode(
        &self,
        header: &PcdHeader,
        offsets: &Offsets,
        body: &[u8],
    ) -> Result<Option<Positions>> {
        let Some([x, y, z]) = offsets.xyz() else {
            return Ok(None);
        };

        let text: String = body.iter().map(|&b| b as char).collect();
        let mut lines = text.split('\n');
        let mut positions = zeroed_positions(header)?;

        for i in 0..header.points {
            let columns: Vec<&str> = lines
                .next()
                .map(|line| line.trim_end_matches('\r').split(' ').collect())
                .unwrap_or_default();
            let value = |field: FieldOffset| {
                columns
                    .get(field.offset)
                    .and_then(|token| token.parse::<f32>().ok())
                    .unwrap_or(f32::NAN)
            };
            positions.set(i, value(x), value(y), value(z));
        }

        Ok(Some(positions))
    }
}

/// Little-endian records laid out point after point (array of structs).
pub struct BinaryDecoder;

impl BodyDecoder for BinaryDecoder {
    fn decode(
        &self,
        header: &PcdHeader,
        offsets: &Offsets,
        body: &[u8],
    ) -> Result<Option<Positions>> {
        let Some([x, y, z]) = offsets.xyz() else {
            return Ok(None);
        };
        let readers = [
            ScalarReader::new(&x)?,
            ScalarReader::new(&y)?,
            ScalarReader::new(&z)?,
        ];

        let expected = offsets
            .stride
            .checked_mul(header.points)
            .ok_or_else(|| too_many_points(header))?;
        if body.len() < expected {
            return Err(PcdError::TruncatedBody {
                expected,
                found: body.len(),
            });
        }
        trace!(
            "Decoding {} binary records of {} bytes",
            header.points,
            offsets.stride
        );

        let mut positions = zeroed_positions(header)?;
        for i in 0..header.points {
            let record = offsets.stride * i;
            let [rx, ry, rz] = &readers;
            positions.set(
                i,
                rx.read(body, record + x.offset)?,
                ry.read(body, record + y.offset)?,
                rz.read(body, record + z.offset)?,
            );
        }

        Ok(Some(positions))
    }
}

/// LZF-compressed body whose decompressed bytes store each field contiguously
/// (struct of arrays).
///
/// The body starts with two little-endian u32: compressed size, then decompressed size.
pub struct CompressedDecoder;

impl CompressedDecoder {
    fn inflate(header: &PcdHeader, body: &[u8]) -> Result<Vec<u8>> {
        if body.len() < 8 {
            return Err(PcdError::DecompressionError(format!(
                "body of {} bytes is too short for the size prefix",
                body.len()
            )));
        }
        let compressed_size = LittleEndian::read_u32(&body[0..4]) as usize;
        let decompressed_size = LittleEndian::read_u32(&body[4..8]) as usize;
        debug!(
            "binary_compressed body: {} bytes -> {} bytes",
            compressed_size, decompressed_size
        );

        let required = header
            .point_size()
            .and_then(|point_size| point_size.checked_mul(header.points))
            .ok_or_else(|| too_many_points(header))?;
        if decompressed_size < required {
            return Err(PcdError::DecompressionError(format!(
                "declared decompressed size {} is smaller than the {} bytes needed for {} points",
                decompressed_size, required, header.points
            )));
        }

        let payload = body
            .get(8..)
            .and_then(|rest| rest.get(..compressed_size))
            .ok_or_else(|| {
                PcdError::DecompressionError(format!(
                    "declared compressed size {} exceeds the {} bytes available",
                    compressed_size,
                    body.len() - 8
                ))
            })?;

        lzf::decompress(payload, decompressed_size)
    }
}

impl BodyDecoder for CompressedDecoder {
    fn decode(
        &self,
        header: &PcdHeader,
        offsets: &Offsets,
        body: &[u8],
    ) -> Result<Option<Positions>> {
        let data = Self::inflate(header, body)?;

        let Some([x, y, z]) = offsets.xyz() else {
            return Ok(None);
        };
        let readers = [
            ScalarReader::new(&x)?,
            ScalarReader::new(&y)?,
            ScalarReader::new(&z)?,
        ];

        let mut positions = zeroed_positions(header)?;
        for i in 0..header.points {
            let [rx, ry, rz] = &readers;
            positions.set(
                i,
                rx.read(&data, x.offset + i * x.size)?,
                ry.read(&data, y.offset + i * y.size)?,
                rz.read(&data, z.offset + i * z.size)?,
            );
        }

        Ok(Some(positions))
    }
}

fn too_many_points(header: &PcdHeader) -> PcdError {
    PcdError::InvalidHeaderValue {
        field: "POINTS",
        value: header.points.to_string(),
    }
}

fn zeroed_positions(header: &PcdHeader) -> Result<Positions> {
    Positions::zeroed(header.points).ok_or_else(|| too_many_points(header))
}

/// Reads one little-endian scalar of a declared kind and widens or narrows it to f32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarReader {
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl ScalarReader {
    fn new(field: &FieldOffset) -> Result<Self> {
        let reader = match (field.field_type, field.size) {
            (FieldType::F, 4) => Self::F32,
            (FieldType::F, 8) => Self::F64,
            (FieldType::I, 1) => Self::I8,
            (FieldType::I, 2) => Self::I16,
            (FieldType::I, 4) => Self::I32,
            (FieldType::I, 8) => Self::I64,
            (FieldType::U, 1) => Self::U8,
            (FieldType::U, 2) => Self::U16,
            (FieldType::U, 4) => Self::U32,
            (FieldType::U, 8) => Self::U64,
            (field_type, size) => {
                return Err(PcdError::InvalidHeaderValue {
                    field: "SIZE",
                    value: format!("{} bytes for type {}", size, field_type),
                })
            }
        };
        Ok(reader)
    }

    fn size(&self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::F64 | Self::I64 | Self::U64 => 8,
        }
    }

    fn read(&self, bytes: &[u8], position: usize) -> Result<f32> {
        let size = self.size();
        let end = position.checked_add(size);
        let buf = end
            .and_then(|end| bytes.get(position..end))
            .ok_or(PcdError::TruncatedBody {
                expected: end.unwrap_or(usize::MAX),
                found: bytes.len(),
            })?;

        let value = match self {
            Self::F32 => LittleEndian::read_f32(buf),
            Self::F64 => LittleEndian::read_f64(buf) as f32,
            Self::I8 => buf[0] as i8 as f32,
            Self::I16 => LittleEndian::read_i16(buf) as f32,
            Self::I32 => LittleEndian::read_i32(buf) as f32,
            Self::I64 => LittleEndian::read_i64(buf) as f32,
            Self::U8 => buf[0] as f32,
            Self::U16 => LittleEndian::read_u16(buf) as f32,
            Self::U32 => LittleEndian::read_u32(buf) as f32,
            Self::U64 => LittleEndian::read_u64(buf) as f32,
        };
        Ok(value)
    }
}
