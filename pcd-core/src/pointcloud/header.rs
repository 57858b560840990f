use std::fmt;

use serde::{Deserialize, Serialize};

/// Body encoding declared by the `DATA` header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataEncoding {
    Ascii,
    Binary,
    BinaryCompressed,
}

impl DataEncoding {
    /// Case-insensitive match against the three PCD encoding tokens.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "ascii" => Some(Self::Ascii),
            "binary" => Some(Self::Binary),
            "binary_compressed" => Some(Self::BinaryCompressed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Binary => "binary",
            Self::BinaryCompressed => "binary_compressed",
        }
    }
}

impl fmt::Display for DataEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric kind of a field, from the `TYPE` header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Signed integer
    I,
    /// Unsigned integer
    U,
    /// Floating point
    F,
}

impl FieldType {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "I" | "i" => Some(Self::I),
            "U" | "u" => Some(Self::U),
            "F" | "f" => Some(Self::F),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::I => "I",
            Self::U => "U",
            Self::F => "F",
        };
        f.write_str(c)
    }
}

// Acquisition pose: translation (tx, ty, tz) followed by a quaternion (qw, qx, qy, qz).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
}

impl Default for Viewpoint {
    fn default() -> Self {
        Self {
            translation: [0.0, 0.0, 0.0],
            rotation: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

/// Parsed PCD header.
///
/// `fields`, `size`, `field_type` and `count` always have the same length;
/// the parser rejects headers where they don't.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcdHeader {
    pub version: f32,
    pub fields: Vec<String>,
    pub size: Vec<usize>,
    #[serde(rename = "type")]
    pub field_type: Vec<FieldType>,
    pub count: Vec<usize>,
    pub width: usize,
    pub height: usize,
    pub viewpoint: Viewpoint,
    pub points: usize,
    pub data: DataEncoding,
}

impl PcdHeader {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field == name)
    }

    pub fn has_positions(&self) -> bool {
        ["x", "y", "z"]
            .iter()
            .all(|axis| self.field_index(axis).is_some())
    }

    /// Bytes occupied by one point record: the sum of the declared field sizes.
    /// `None` if the sum overflows `usize`.
    pub fn point_size(&self) -> Option<usize> {
        self.size
            .iter()
            .try_fold(0usize, |total, &size| total.checked_add(size))
    }
}
