//! Hex-encoded WKB / PostGIS EWKB geometry decoding.
//!
//! ding0 writes bus positions as hex EWKB points (usually with an SRID
//! prefix) and the district registry returns hex EWKB multipolygons. Only the
//! shapes those sources emit are supported:
//!
//! | Type code | Shape | Output |
//! |-----------|-------|--------|
//! | 1 | Point | `[x, y]` |
//! | 3 | Polygon | one exterior ring |
//! | 6 | MultiPolygon | one exterior ring per part |
//!
//! Z and M ordinates (EWKB flag bits or ISO `1000`/`2000`/`3000` offsets) are
//! read and dropped. Interior rings are consumed but not returned.

use std::io::Cursor;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use thiserror::Error;

/// A single `[x, y]` coordinate pair.
pub type Position = [f64; 2];

/// A closed ring of positions.
pub type Ring = Vec<Position>;

const EWKB_Z_FLAG: u32 = 0x8000_0000;
const EWKB_M_FLAG: u32 = 0x4000_0000;
const EWKB_SRID_FLAG: u32 = 0x2000_0000;
const EWKB_FLAGS: u32 = EWKB_Z_FLAG | EWKB_M_FLAG | EWKB_SRID_FLAG;

const WKB_POINT: u32 = 1;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOLYGON: u32 = 6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("empty geometry payload")]
    Empty,

    #[error("invalid hex encoding: {0}")]
    Hex(String),

    #[error("payload truncated at byte {0}")]
    Truncated(usize),

    #[error("unknown byte order marker {0:#04x}")]
    ByteOrder(u8),

    #[error("unsupported geometry type code {0}")]
    UnsupportedType(u32),

    #[error("expected {expected}, found {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0} trailing bytes after geometry")]
    TrailingBytes(usize),
}

/// Decoded geometry, reduced to what the map layers need.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedGeometry {
    Point(Position),
    /// Exterior ring of each polygon part, in payload order.
    Polygons(Vec<Ring>),
}

impl DecodedGeometry {
    fn shape_name(&self) -> &'static str {
        match self {
            DecodedGeometry::Point(_) => "point",
            DecodedGeometry::Polygons(_) => "polygon",
        }
    }
}

/// Decode a hex-encoded WKB or EWKB payload.
pub fn decode_hex(payload: &str) -> Result<DecodedGeometry, DecodeError> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }
    let bytes = hex::decode(trimmed).map_err(|e| DecodeError::Hex(e.to_string()))?;
    decode_bytes(&bytes)
}

/// Decode raw WKB / EWKB bytes.
pub fn decode_bytes(bytes: &[u8]) -> Result<DecodedGeometry, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let mut reader = WkbReader::new(bytes);
    let geometry = reader.read_geometry()?;
    let remaining = reader.remaining();
    if remaining > 0 {
        return Err(DecodeError::TrailingBytes(remaining));
    }
    Ok(geometry)
}

/// Decode a payload that must be a point.
pub fn decode_point(payload: &str) -> Result<Position, DecodeError> {
    match decode_hex(payload)? {
        DecodedGeometry::Point(p) => Ok(p),
        other => Err(DecodeError::UnexpectedShape {
            expected: "point",
            found: other.shape_name(),
        }),
    }
}

/// Decode a payload that must be a polygon or multipolygon.
pub fn decode_rings(payload: &str) -> Result<Vec<Ring>, DecodeError> {
    match decode_hex(payload)? {
        DecodedGeometry::Polygons(rings) => Ok(rings),
        other => Err(DecodeError::UnexpectedShape {
            expected: "polygon",
            found: other.shape_name(),
        }),
    }
}

#[derive(Debug, Clone, Copy)]
enum Endian {
    Big,
    Little,
}

#[derive(Debug, Clone, Copy)]
struct Header {
    endian: Endian,
    type_code: u32,
    dims: usize,
}

struct WkbReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> WkbReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let at = self.position();
        self.cursor.read_u8().map_err(|_| DecodeError::Truncated(at))
    }

    fn read_u32(&mut self, endian: Endian) -> Result<u32, DecodeError> {
        let at = self.position();
        let value = match endian {
            Endian::Big => self.cursor.read_u32::<BigEndian>(),
            Endian::Little => self.cursor.read_u32::<LittleEndian>(),
        };
        value.map_err(|_| DecodeError::Truncated(at))
    }

    fn read_f64(&mut self, endian: Endian) -> Result<f64, DecodeError> {
        let at = self.position();
        let value = match endian {
            Endian::Big => self.cursor.read_f64::<BigEndian>(),
            Endian::Little => self.cursor.read_f64::<LittleEndian>(),
        };
        value.map_err(|_| DecodeError::Truncated(at))
    }

    fn read_header(&mut self) -> Result<Header, DecodeError> {
        let endian = match self.read_u8()? {
            0 => Endian::Big,
            1 => Endian::Little,
            other => return Err(DecodeError::ByteOrder(other)),
        };
        let raw = self.read_u32(endian)?;

        let mut dims = 2;
        if raw & EWKB_Z_FLAG != 0 {
            dims += 1;
        }
        if raw & EWKB_M_FLAG != 0 {
            dims += 1;
        }
        if raw & EWKB_SRID_FLAG != 0 {
            // SRID is not used: no reprojection happens here
            self.read_u32(endian)?;
        }

        let base = raw & !EWKB_FLAGS;
        let type_code = base % 1000;
        dims += match base / 1000 {
            0 => 0,
            1 | 2 => 1,
            3 => 2,
            _ => return Err(DecodeError::UnsupportedType(raw)),
        };

        Ok(Header {
            endian,
            type_code,
            dims,
        })
    }

    fn read_position(&mut self, header: &Header) -> Result<Position, DecodeError> {
        let x = self.read_f64(header.endian)?;
        let y = self.read_f64(header.endian)?;
        for _ in 2..header.dims {
            self.read_f64(header.endian)?;
        }
        Ok([x, y])
    }

    /// Read an element count and reject counts the payload cannot hold.
    fn read_count(&mut self, header: &Header, min_item_bytes: usize) -> Result<usize, DecodeError> {
        let at = self.position();
        let count = self.read_u32(header.endian)? as usize;
        if count.saturating_mul(min_item_bytes) > self.remaining() {
            return Err(DecodeError::Truncated(at));
        }
        Ok(count)
    }

    fn read_ring(&mut self, header: &Header) -> Result<Ring, DecodeError> {
        let count = self.read_count(header, 8 * header.dims)?;
        let mut ring = Vec::with_capacity(count);
        for _ in 0..count {
            ring.push(self.read_position(header)?);
        }
        Ok(ring)
    }

    /// Returns the exterior ring; interior rings are skipped.
    fn read_polygon_body(&mut self, header: &Header) -> Result<Option<Ring>, DecodeError> {
        let ring_count = self.read_count(header, 4)?;
        let mut exterior = None;
        for i in 0..ring_count {
            let ring = self.read_ring(header)?;
            if i == 0 {
                exterior = Some(ring);
            }
        }
        Ok(exterior)
    }

    fn read_geometry(&mut self) -> Result<DecodedGeometry, DecodeError> {
        let header = self.read_header()?;
        match header.type_code {
            WKB_POINT => {
                let p = self.read_position(&header)?;
                // WKB encodes POINT EMPTY as NaN ordinates
                if p[0].is_nan() || p[1].is_nan() {
                    return Err(DecodeError::Empty);
                }
                Ok(DecodedGeometry::Point(p))
            }
            WKB_POLYGON => {
                let exterior = self.read_polygon_body(&header)?.ok_or(DecodeError::Empty)?;
                Ok(DecodedGeometry::Polygons(vec![exterior]))
            }
            WKB_MULTIPOLYGON => {
                let parts = self.read_count(&header, 9)?;
                let mut rings = Vec::with_capacity(parts);
                for _ in 0..parts {
                    let part = self.read_header()?;
                    if part.type_code != WKB_POLYGON {
                        return Err(DecodeError::UnsupportedType(part.type_code));
                    }
                    if let Some(exterior) = self.read_polygon_body(&part)? {
                        rings.push(exterior);
                    }
                }
                if rings.is_empty() {
                    return Err(DecodeError::Empty);
                }
                Ok(DecodedGeometry::Polygons(rings))
            }
            other => Err(DecodeError::UnsupportedType(other)),
        }
    }
}
