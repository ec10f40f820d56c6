//! GDSII layout export.
//!
//! Writes one library holding one cell with a single boundary element, the
//! splitter outline. Units are fixed: 1 user unit = 1 µm, 1 database unit =
//! 1 nm.
//!
//! # Stream layout
//! | Record | Data |
//! |--------|------|
//! | HEADER | version 600 |
//! | BGNLIB, LIBNAME, UNITS | timestamps, library name, unit pair |
//! | BGNSTR, STRNAME | timestamps, cell name |
//! | BOUNDARY, LAYER, DATATYPE, XY, ENDEL | the outline, closed |
//! | ENDSTR, ENDLIB | |
//!
//! Every record is `u16` length (header included), record type, data type,
//! then big-endian payload.

use std::io::Write;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ysplit_geometry::Polygon;

/// Errors from layout export.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polygon has {count} vertices; a GDSII boundary holds at most {max}")]
    TooManyVertices { count: usize, max: usize },

    #[error("Polygon has {0} vertices; a boundary needs at least 3")]
    TooFewVertices(usize),

    #[error("Coordinate {value} µm does not fit a 32-bit database unit")]
    CoordinateOverflow { value: f64 },

    #[error("Invalid GDSII name '{0}'")]
    InvalidName(String),
}

/// Distinct vertices per boundary; the closing vertex brings the XY record
/// to its 8191-point limit.
pub const MAX_VERTICES: usize = 8190;
/// Database unit (m).
pub const DB_UNIT: f64 = 1e-9;
/// User unit (m).
pub const USER_UNIT: f64 = 1e-6;
const DB_PER_USER_UNIT: f64 = 1e3;

const GDS_VERSION: i16 = 600;
const MAX_NAME_LEN: usize = 32;

mod record {
    pub const HEADER: u8 = 0x00;
    pub const BGNLIB: u8 = 0x01;
    pub const LIBNAME: u8 = 0x02;
    pub const UNITS: u8 = 0x03;
    pub const ENDLIB: u8 = 0x04;
    pub const BGNSTR: u8 = 0x05;
    pub const STRNAME: u8 = 0x06;
    pub const ENDSTR: u8 = 0x07;
    pub const BOUNDARY: u8 = 0x08;
    pub const LAYER: u8 = 0x0D;
    pub const DATATYPE: u8 = 0x0E;
    pub const XY: u8 = 0x10;
    pub const ENDEL: u8 = 0x11;
}

mod data {
    pub const NONE: u8 = 0x00;
    pub const INT16: u8 = 0x02;
    pub const INT32: u8 = 0x03;
    pub const REAL8: u8 = 0x05;
    pub const ASCII: u8 = 0x06;
}

/// Names and layer for the exported layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub library: String,
    pub cell: String,
    pub layer: i16,
    pub datatype: i16,
    /// Year, month, day, hour, minute, second written into BGNLIB/BGNSTR.
    pub timestamp: [i16; 6],
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            library: "YSPLIT".into(),
            cell: "Y_BRANCH".into(),
            layer: 1,
            datatype: 0,
            timestamp: [1970, 1, 1, 0, 0, 0],
        }
    }
}

/// Encode `value` as a GDSII 8-byte real: sign bit, excess-64 base-16
/// exponent, 56-bit mantissa in `[1/16, 1)`.
pub fn encode_real8(value: f64) -> [u8; 8] {
    if value == 0.0 || !value.is_finite() {
        return [0; 8];
    }
    let sign = if value < 0.0 { 0x80u8 } else { 0 };
    let mut mantissa = value.abs();
    let mut exponent: i32 = 64;
    while mantissa >= 1.0 {
        mantissa /= 16.0;
        exponent += 1;
    }
    while mantissa < 1.0 / 16.0 {
        mantissa *= 16.0;
        exponent -= 1;
    }
    // Power-of-two scaling keeps the mantissa exact.
    let bits = (mantissa * (1u64 << 56) as f64) as u64;

    let mut out = [0u8; 8];
    out[0] = sign | (exponent.clamp(0, 127) as u8);
    out[1..].copy_from_slice(&bits.to_be_bytes()[1..]);
    out
}

fn check_name(name: &str) -> Result<(), LayoutError> {
    let ok = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '?' | '$'));
    if ok {
        Ok(())
    } else {
        Err(LayoutError::InvalidName(name.to_string()))
    }
}

fn to_db_units(value_um: f64) -> Result<i32, LayoutError> {
    let scaled = (value_um * DB_PER_USER_UNIT).round();
    if scaled.is_finite() && scaled >= i32::MIN as f64 && scaled <= i32::MAX as f64 {
        Ok(scaled as i32)
    } else {
        Err(LayoutError::CoordinateOverflow { value: value_um })
    }
}

fn push_record(buf: &mut Vec<u8>, rtype: u8, dtype: u8, payload: &[u8]) {
    let len = (4 + payload.len()) as u16;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.push(rtype);
    buf.push(dtype);
    buf.extend_from_slice(payload);
}

fn push_i16s(buf: &mut Vec<u8>, rtype: u8, values: &[i16]) {
    let payload: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
    push_record(buf, rtype, data::INT16, &payload);
}

fn push_ascii(buf: &mut Vec<u8>, rtype: u8, text: &str) {
    let mut payload = text.as_bytes().to_vec();
    if payload.len() % 2 == 1 {
        payload.push(0);
    }
    push_record(buf, rtype, data::ASCII, &payload);
}

/// Encode `polygon` (metres) as a complete GDSII stream.
///
/// # Errors
/// [`LayoutError::InvalidName`], [`LayoutError::TooFewVertices`],
/// [`LayoutError::TooManyVertices`] or [`LayoutError::CoordinateOverflow`];
/// nothing is produced on error.
pub fn to_gds_bytes(polygon: &Polygon, options: &LayoutOptions) -> Result<Vec<u8>, LayoutError> {
    check_name(&options.library)?;
    check_name(&options.cell)?;

    let outline = polygon.to_micrometres();
    let mut points = outline.vertices.as_slice();
    if points.len() > 1 && points.first() == points.last() {
        points = &points[..points.len() - 1];
    }
    if points.len() < 3 {
        return Err(LayoutError::TooFewVertices(points.len()));
    }
    if points.len() > MAX_VERTICES {
        return Err(LayoutError::TooManyVertices { count: points.len(), max: MAX_VERTICES });
    }

    let mut xy = Vec::with_capacity((points.len() + 1) * 8);
    for p in points.iter().chain(points.first()) {
        xy.extend_from_slice(&to_db_units(p[0])?.to_be_bytes());
        xy.extend_from_slice(&to_db_units(p[1])?.to_be_bytes());
    }

    let stamps: Vec<i16> = options.timestamp.iter().chain(&options.timestamp).copied().collect();
    let mut units = Vec::with_capacity(16);
    units.extend_from_slice(&encode_real8(1.0 / DB_PER_USER_UNIT));
    units.extend_from_slice(&encode_real8(DB_UNIT));

    let mut buf = Vec::with_capacity(xy.len() + 256);
    push_i16s(&mut buf, record::HEADER, &[GDS_VERSION]);
    push_i16s(&mut buf, record::BGNLIB, &stamps);
    push_ascii(&mut buf, record::LIBNAME, &options.library);
    push_record(&mut buf, record::UNITS, data::REAL8, &units);

    push_i16s(&mut buf, record::BGNSTR, &stamps);
    push_ascii(&mut buf, record::STRNAME, &options.cell);

    push_record(&mut buf, record::BOUNDARY, data::NONE, &[]);
    push_i16s(&mut buf, record::LAYER, &[options.layer]);
    push_i16s(&mut buf, record::DATATYPE, &[options.datatype]);
    push_record(&mut buf, record::XY, data::INT32, &xy);
    push_record(&mut buf, record::ENDEL, data::NONE, &[]);

    push_record(&mut buf, record::ENDSTR, data::NONE, &[]);
    push_record(&mut buf, record::ENDLIB, data::NONE, &[]);

    debug!(
        "GDSII: cell '{}', layer {}, {} vertices, {} bytes",
        options.cell,
        options.layer,
        points.len(),
        buf.len()
    );
    Ok(buf)
}

/// Write `polygon` as GDSII to `writer`.
pub fn write_gds<W: Write>(
    writer: &mut W,
    polygon: &Polygon,
    options: &LayoutOptions,
) -> Result<(), LayoutError> {
    let bytes = to_gds_bytes(polygon, options)?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Write `polygon` as a GDSII file at `path`.
pub fn save_gds(path: &Path, polygon: &Polygon, options: &LayoutOptions) -> Result<(), LayoutError> {
    let bytes = to_gds_bytes(polygon, options)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
