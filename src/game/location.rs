//! Location strings of the form `0xA9B4001A [94.5 25.6 94.0] 0.30 0.0 0.0 0.95`
//!
//! The leading hex word is the landblock cell id (upper 16 bits landblock,
//! lower 16 bits cell), the bracketed triple is the origin inside the cell and
//! the trailing four floats are the rotation quaternion `w x y z`.

use std::fmt;

use serde::Serialize;

/// Parsed world position
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub cell: u32,
    pub origin: [f32; 3],
    pub rotation: [f32; 4],
}

impl Position {
    pub fn new(cell: u32, origin: [f32; 3], rotation: [f32; 4]) -> Self {
        Self {
            cell,
            origin,
            rotation,
        }
    }

    /// Landblock id (upper half of the cell id)
    #[inline]
    pub fn landblock(&self) -> u16 {
        (self.cell >> 16) as u16
    }

    /// Squared distance, only meaningful inside the same landblock
    pub fn squared_distance_to(&self, other: &Position) -> f32 {
        let dx = self.origin[0] - other.origin[0];
        let dy = self.origin[1] - other.origin[1];
        let dz = self.origin[2] - other.origin[2];
        dx * dx + dy * dy + dz * dz
    }

    /// Parse a location string
    pub fn parse(raw: &str) -> Result<Self, LocationError> {
        let raw = raw.trim();
        let open = raw
            .find('[')
            .ok_or_else(|| LocationError::MissingOrigin(raw.to_string()))?;
        let close = raw
            .find(']')
            .filter(|close| *close > open)
            .ok_or_else(|| LocationError::MissingOrigin(raw.to_string()))?;

        let cell = parse_cell(raw[..open].trim())?;
        let origin: [f32; 3] = parse_floats(&raw[open + 1..close], raw)?;
        let rotation: [f32; 4] = parse_floats(&raw[close + 1..], raw)?;

        Ok(Self::new(cell, origin, rotation))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:08X} [{:.6} {:.6} {:.6}] {:.6} {:.6} {:.6} {:.6}",
            self.cell,
            self.origin[0],
            self.origin[1],
            self.origin[2],
            self.rotation[0],
            self.rotation[1],
            self.rotation[2],
            self.rotation[3]
        )
    }
}

/// Short identifier of a site: the eight hex digits of the cell id.
///
/// Accepts anything with at least ten characters, the way operators paste
/// location strings from `/loc`.
pub fn site_key(raw: &str) -> Option<&str> {
    raw.trim().get(2..10)
}

fn parse_cell(word: &str) -> Result<u32, LocationError> {
    let hex = word
        .strip_prefix("0x")
        .or_else(|| word.strip_prefix("0X"))
        .ok_or_else(|| LocationError::InvalidCell(word.to_string()))?;
    if hex.len() != 8 {
        return Err(LocationError::InvalidCell(word.to_string()));
    }
    u32::from_str_radix(hex, 16).map_err(|_| LocationError::InvalidCell(word.to_string()))
}

fn parse_floats<const N: usize>(part: &str, raw: &str) -> Result<[f32; N], LocationError> {
    let mut out = [0.0f32; N];
    let mut count = 0;
    for word in part.split_whitespace() {
        if count == N {
            return Err(LocationError::WrongArity {
                expected: N,
                raw: raw.to_string(),
            });
        }
        out[count] = word
            .parse()
            .map_err(|_| LocationError::InvalidNumber(word.to_string()))?;
        count += 1;
    }
    if count != N {
        return Err(LocationError::WrongArity {
            expected: N,
            raw: raw.to_string(),
        });
    }
    Ok(out)
}

/// Location parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("invalid cell id '{0}'")]
    InvalidCell(String),
    #[error("missing [x y z] origin in '{0}'")]
    MissingOrigin(String),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("expected {expected} values in '{raw}'")]
    WrongArity { expected: usize, raw: String },
}
