//! Hierarchical location pointer.
//!
//! Converts a GPS coordinate into a fixed-width key for the visitor map.
//! Byte 0 splits the world into 16x16 blocks, byte 1 splits that block
//! into 16x16 sub-blocks, and so on down to byte 4 - roughly 100x100 m
//! cells at the default resolution. Two points inside the same cell always
//! encode identically, so the pointer doubles as the bucket key for
//! "who else was here" lookups. No decode is needed anywhere.

use std::fmt;

/// Default quantization: 1/1024 of a degree, about 100 m.
///
/// See <https://en.wikipedia.org/wiki/Decimal_degrees#Precision>.
pub const DEFAULT_CELLS_PER_DEGREE: u32 = 1024;

/// A 5-byte hierarchical pointer to one map cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocPtr([u8; 5]);

impl LocPtr {
    /// Encode a coordinate at the given resolution.
    ///
    /// `lat` is clamped to [-90, 90] and `lon` to [-180, 180]; both are
    /// shifted to non-negative ranges, quantized, and packed nibble by
    /// nibble with latitude in the high half of each byte.
    pub fn encode(lat: f64, lon: f64, cells_per_degree: u32) -> LocPtr {
        let cells = cells_per_degree as f64;
        let clat = ((lat.clamp(-90.0, 90.0) + 90.0) * cells) as u32;
        let clon = ((lon.clamp(-180.0, 180.0) + 180.0) * cells) as u32;
        let mut key = [0u8; 5];
        for (i, byte) in key.iter_mut().enumerate() {
            let dlat = (clat >> ((4 - i) * 4)) & 15;
            let dlon = (clon >> ((4 - i) * 4)) & 15;
            *byte = ((dlat << 4) | dlon) as u8;
        }
        LocPtr(key)
    }

    /// The raw 5 bytes, coarsest partition first.
    pub fn as_bytes(&self) -> &[u8; 5] {
        &self.0
    }

    /// The 10-char lowercase hex rendering used as a relative key.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LocPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
