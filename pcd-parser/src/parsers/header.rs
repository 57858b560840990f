use std::str::FromStr;

use log::debug;
use pcd_core::pointcloud::header::{DataEncoding, FieldType, PcdHeader, Viewpoint};

use crate::error::{PcdError, Result};

/// Splits a PCD buffer into header text and body bytes.
///
/// The header ends with the first `DATA <token>` line that follows a line break; the
/// body starts right after that line's terminator (`\n`, or `\r\n`). Bytes are read
/// as Latin-1, and everything from `#` to the end of a line is stripped from the
/// returned header text.
pub fn extract_header(buffer: &[u8]) -> Result<(String, &[u8])> {
    let mut line_start = 0;
    let mut header_end = None;

    while let Some(newline) = buffer[line_start..].iter().position(|&b| b == b'\n') {
        let line_end = line_start + newline;
        if line_start > 0 && is_data_line(&buffer[line_start..line_end]) {
            header_end = Some(line_end + 1);
            break;
        }
        line_start = line_end + 1;
    }

    let header_end = header_end.ok_or(PcdError::MalformedHeader)?;
    let header = buffer[..header_end]
        .split(|&b| b == b'\n')
        .map(|line| {
            let line = match line.iter().position(|&b| b == b'#') {
                Some(comment) => &line[..comment],
                None => line,
            };
            line.iter().map(|&b| b as char).collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n");

    debug!(
        "PCD header spans {} bytes, body spans {} bytes",
        header_end,
        buffer.len() - header_end
    );

    Ok((header, &buffer[header_end..]))
}

fn is_data_line(line: &[u8]) -> bool {
    let line = match line.iter().position(|&b| b == b'#') {
        Some(comment) => &line[..comment],
        None => line,
    };
    let mut tokens = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty());
    let is_data = matches!(tokens.next(), Some(key) if key.eq_ignore_ascii_case(b"DATA"));
    is_data && tokens.next().is_some()
}

/// Value of the first line whose leading token is `key` (case-insensitive).
fn find_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    header.lines().find_map(|line| {
        let line = line.trim_start();
        let first = line.split_whitespace().next()?;
        if first.eq_ignore_ascii_case(key) {
            Some(line[first.len()..].trim())
        } else {
            None
        }
    })
}

fn require<'a>(header: &'a str, key: &'static str) -> Result<&'a str> {
    find_value(header, key).ok_or(PcdError::MissingHeaderField(key))
}

fn parse_scalar<T: FromStr>(field: &'static str, value: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| PcdError::InvalidHeaderValue {
        field,
        value: value.to_string(),
    })
}

fn parse_list<T: FromStr>(field: &'static str, value: &str) -> Result<Vec<T>> {
    value
        .split_whitespace()
        .map(|token| parse_scalar(field, token))
        .collect()
}

fn check_len(field: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(PcdError::FieldCountMismatch {
            field,
            expected,
            found,
        });
    }
    Ok(())
}

fn parse_viewpoint(value: &str) -> Result<Viewpoint> {
    let values: Vec<f64> = parse_list("VIEWPOINT", value)?;
    match values.as_slice() {
        [tx, ty, tz, qw, qx, qy, qz] => Ok(Viewpoint {
            translation: [*tx, *ty, *tz],
            rotation: [*qw, *qx, *qy, *qz],
        }),
        _ => Err(PcdError::InvalidHeaderValue {
            field: "VIEWPOINT",
            value: value.to_string(),
        }),
    }
}

/// Rejects headers whose layout cannot be addressed in memory: the point record size,
/// the position buffer length and the total body size must all fit in `usize`.
fn check_layout(header: &PcdHeader) -> Result<()> {
    let point_size = header
        .point_size()
        .ok_or_else(|| PcdError::InvalidHeaderValue {
            field: "SIZE",
            value: format!("{:?}", header.size),
        })?;

    let too_many_points = || PcdError::InvalidHeaderValue {
        field: "POINTS",
        value: header.points.to_string(),
    };
    header.points.checked_mul(3).ok_or_else(too_many_points)?;
    header
        .points
        .checked_mul(point_size)
        .ok_or_else(too_many_points)?;

    Ok(())
}

/// Parses comment-free header text into a [`PcdHeader`].
pub fn parse_header(header: &str) -> Result<PcdHeader> {
    let version_value = require(header, "VERSION")?;
    let fields_value = require(header, "FIELDS")?;
    let size_value = require(header, "SIZE")?;
    let type_value = require(header, "TYPE")?;
    let width_value = require(header, "WIDTH")?;
    let height_value = require(header, "HEIGHT")?;
    let data_value = require(header, "DATA")?;

    let version = parse_scalar("VERSION", version_value)?;

    let fields: Vec<String> = fields_value
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let size: Vec<usize> = parse_list("SIZE", size_value)?;
    check_len("SIZE", fields.len(), size.len())?;

    let field_type = type_value
        .split_whitespace()
        .map(|token| {
            FieldType::from_token(token).ok_or_else(|| PcdError::InvalidHeaderValue {
                field: "TYPE",
                value: token.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    check_len("TYPE", fields.len(), field_type.len())?;

    let count = match find_value(header, "COUNT") {
        Some(value) => {
            let count: Vec<usize> = parse_list("COUNT", value)?;
            check_len("COUNT", fields.len(), count.len())?;
            count
        }
        None => vec![1; fields.len()],
    };

    let width: usize = parse_scalar("WIDTH", width_value)?;
    let height: usize = parse_scalar("HEIGHT", height_value)?;

    let viewpoint = match find_value(header, "VIEWPOINT") {
        Some(value) => parse_viewpoint(value)?,
        None => Viewpoint::default(),
    };

    let points = match find_value(header, "POINTS") {
        Some(value) => parse_scalar("POINTS", value)?,
        None => width
            .checked_mul(height)
            .ok_or_else(|| PcdError::InvalidHeaderValue {
                field: "POINTS",
                value: format!("{} x {}", width, height),
            })?,
    };

    let data_token = data_value.split_whitespace().next().unwrap_or_default();
    let data = DataEncoding::from_token(data_token)
        .ok_or_else(|| PcdError::UnsupportedEncoding(data_token.to_string()))?;

    debug!(
        "PCD header: version {}, fields {:?}, {} points, data {}",
        version, fields, points, data
    );

    let header = PcdHeader {
        version,
        fields,
        size,
        field_type,
        count,
        width,
        height,
        viewpoint,
        points,
        data,
    };
    check_layout(&header)?;

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "VERSION .7\n\
        FIELDS x y z rgb\n\
        SIZE 4 4 4 4\n\
        TYPE F F F U\n\
        COUNT 1 1 1 1\n\
        WIDTH 213\n\
        HEIGHT 1\n\
        VIEWPOINT 0 0 0 1 0 0 0\n\
        POINTS 213\n\
        DATA ascii\n";

    #[test]
    fn test_extract_header() {
        let mut buffer = HEADER.as_bytes().to_vec();
        buffer.extend_from_slice(b"1 2 3 4\n");
        let (header, body) = extract_header(&buffer).unwrap();
        assert!(header.starts_with("VERSION .7\n"));
        assert!(header.contains("DATA ascii"));
        assert_eq!(body, b"1 2 3 4\n");
    }

    #[test]
    fn test_extract_header_keeps_binary_body_intact() {
        let mut buffer = b"VERSION .7\nDATA binary\n".to_vec();
        let body = [b'\n', 0x00, b'#', 0xff, b'\r'];
        buffer.extend_from_slice(&body);
        let (_, extracted) = extract_header(&buffer).unwrap();
        assert_eq!(extracted, &body);
    }

    #[test]
    fn test_extract_header_crlf() {
        let buffer = b"VERSION .7\r\nDATA binary\r\n\x01\x02";
        let (header, body) = extract_header(buffer).unwrap();
        assert!(header.contains("DATA binary"));
        assert_eq!(body, &[1, 2]);
    }

    #[test]
    fn test_extract_header_strips_comments() {
        let buffer = b"# .PCD v.7 - Point Cloud Data file format\nVERSION .7 # trailing\n# DATA binary\nDATA ascii # why\n1 2 3";
        let (header, body) = extract_header(buffer).unwrap();
        assert!(!header.contains('#'));
        assert!(!header.contains("trailing"));
        assert!(!header.contains("DATA binary"));
        assert_eq!(body, b"1 2 3");
    }

    #[test]
    fn test_extract_header_requires_preceding_line_break() {
        let err = extract_header(b"DATA ascii\n1 2 3\n").unwrap_err();
        assert!(matches!(err, PcdError::MalformedHeader));
    }

    #[test]
    fn test_extract_header_without_data_line() {
        let err = extract_header(b"VERSION .7\nFIELDS x y z\nWIDTH 1\n").unwrap_err();
        assert!(matches!(err, PcdError::MalformedHeader));

        let err = extract_header(b"VERSION .7\nDATA ascii").unwrap_err();
        assert!(matches!(err, PcdError::MalformedHeader));
    }

    #[test]
    fn test_parse_header() {
        let header = parse_header(HEADER).unwrap();
        assert_eq!(header.version, 0.7);
        assert_eq!(header.fields, vec!["x", "y", "z", "rgb"]);
        assert_eq!(header.size, vec![4, 4, 4, 4]);
        assert_eq!(
            header.field_type,
            vec![FieldType::F, FieldType::F, FieldType::F, FieldType::U]
        );
        assert_eq!(header.count, vec![1, 1, 1, 1]);
        assert_eq!(header.width, 213);
        assert_eq!(header.height, 1);
        assert_eq!(header.viewpoint, Viewpoint::default());
        assert_eq!(header.points, 213);
        assert_eq!(header.data, DataEncoding::Ascii);
    }

    #[test]
    fn test_parse_header_defaults() {
        let header = parse_header(
            "VERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 640\nHEIGHT 480\nDATA binary\n",
        )
        .unwrap();
        assert_eq!(header.count, vec![1, 1, 1]);
        assert_eq!(header.points, 640 * 480);
        assert_eq!(header.viewpoint, Viewpoint::default());
        assert_eq!(header.data, DataEncoding::Binary);
    }

    #[test]
    fn test_parse_header_case_insensitive_keys() {
        let header = parse_header(
            "version 0.7\nfields x y z\nsize 4 4 4\ntype f f f\nwidth 2\nheight 1\ndata binary_compressed\n",
        )
        .unwrap();
        assert_eq!(header.points, 2);
        assert_eq!(header.data, DataEncoding::BinaryCompressed);
    }

    #[test]
    fn test_parse_header_viewpoint() {
        let header = parse_header(&HEADER.replace(
            "VIEWPOINT 0 0 0 1 0 0 0",
            "VIEWPOINT 1.5 2 3 0.5 0.5 0.5 0.5",
        ))
        .unwrap();
        assert_eq!(header.viewpoint.translation, [1.5, 2.0, 3.0]);
        assert_eq!(header.viewpoint.rotation, [0.5, 0.5, 0.5, 0.5]);

        let err = parse_header(&HEADER.replace("VIEWPOINT 0 0 0 1 0 0 0", "VIEWPOINT 0 0 0"))
            .unwrap_err();
        assert!(matches!(
            err,
            PcdError::InvalidHeaderValue {
                field: "VIEWPOINT",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_required_fields() {
        for (line, key) in [
            ("VERSION .7\n", "VERSION"),
            ("FIELDS x y z rgb\n", "FIELDS"),
            ("SIZE 4 4 4 4\n", "SIZE"),
            ("TYPE F F F U\n", "TYPE"),
            ("WIDTH 213\n", "WIDTH"),
            ("HEIGHT 1\n", "HEIGHT"),
            ("DATA ascii\n", "DATA"),
        ] {
            let err = parse_header(&HEADER.replace(line, "")).unwrap_err();
            match err {
                PcdError::MissingHeaderField(name) => assert_eq!(name, key),
                other => panic!("expected MissingHeaderField({key}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unsupported_encoding() {
        let err = parse_header(&HEADER.replace("DATA ascii", "DATA binary_lzf")).unwrap_err();
        match err {
            PcdError::UnsupportedEncoding(token) => assert_eq!(token, "binary_lzf"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_field_count_mismatch() {
        let err = parse_header(&HEADER.replace("SIZE 4 4 4 4", "SIZE 4 4 4")).unwrap_err();
        assert!(matches!(
            err,
            PcdError::FieldCountMismatch {
                field: "SIZE",
                expected: 4,
                found: 3
            }
        ));

        let err = parse_header(&HEADER.replace("COUNT 1 1 1 1", "COUNT 1 1 1 1 1")).unwrap_err();
        assert!(matches!(
            err,
            PcdError::FieldCountMismatch { field: "COUNT", .. }
        ));
    }

    #[test]
    fn test_invalid_values() {
        let err = parse_header(&HEADER.replace("TYPE F F F U", "TYPE F F F Q")).unwrap_err();
        assert!(matches!(
            err,
            PcdError::InvalidHeaderValue { field: "TYPE", .. }
        ));

        let err = parse_header(&HEADER.replace("WIDTH 213", "WIDTH many")).unwrap_err();
        assert!(matches!(
            err,
            PcdError::InvalidHeaderValue { field: "WIDTH", .. }
        ));
    }

    #[test]
    fn test_missing_key_reported_before_length_mismatch() {
        let text = HEADER
            .replace("TYPE F F F U\n", "")
            .replace("SIZE 4 4 4 4", "SIZE 4 4");
        match parse_header(&text).unwrap_err() {
            PcdError::MissingHeaderField(name) => assert_eq!(name, "TYPE"),
            other => panic!("expected MissingHeaderField(TYPE), got {other:?}"),
        }
    }

    #[test]
    fn test_point_count_overflow() {
        // points * 3 does not fit in usize
        let text = HEADER.replace("POINTS 213", "POINTS 6148914691236517206");
        let err = parse_header(&text).unwrap_err();
        assert!(matches!(
            err,
            PcdError::InvalidHeaderValue { field: "POINTS", .. }
        ));

        // points * 3 fits, points * 16 bytes per record does not
        let text = HEADER
            .replace("POINTS 213", "POINTS 4611686018427387904")
            .replace("DATA ascii", "DATA binary_compressed");
        let err = parse_header(&text).unwrap_err();
        assert!(matches!(
            err,
            PcdError::InvalidHeaderValue { field: "POINTS", .. }
        ));
    }

    #[test]
    fn test_field_size_overflow() {
        let text = HEADER
            .replace("SIZE 4 4 4 4", "SIZE 4 4 4 18446744073709551615")
            .replace("DATA ascii", "DATA binary");
        let err = parse_header(&text).unwrap_err();
        assert!(matches!(
            err,
            PcdError::InvalidHeaderValue { field: "SIZE", .. }
        ));
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let header = parse_header(&HEADER.replace("FIELDS x y z rgb", "FIELDS x y z curvature"))
            .unwrap();
        assert_eq!(header.fields[3], "curvature");
    }
}
