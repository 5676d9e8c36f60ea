//! Point, colour, and on-disk record value types shared across the
//! build pipeline and the streaming engine.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::DVec3;

/// An 8-bit RGB colour triple.
///
/// Stored and averaged as `f64` internally by [`crate::voxel_key`]
/// consumers but always round-trips through `[u8; 3]` at the I/O
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorRgb(pub [u8; 3]);

impl ColorRgb {
    /// Black.
    pub const BLACK: Self = Self([0, 0, 0]);

    /// Build from individual channels.
    #[must_use]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Widen to `f64` per channel for averaging.
    #[must_use]
    pub fn to_f64(self) -> [f64; 3] {
        [
            f64::from(self.0[0]),
            f64::from(self.0[1]),
            f64::from(self.0[2]),
        ]
    }

    /// Narrow from averaged `f64` channels, rounding and clamping to
    /// `[0, 255]`.
    #[must_use]
    pub fn from_f64(channels: [f64; 3]) -> Self {
        Self([
            round_channel(channels[0]),
            round_channel(channels[1]),
            round_channel(channels[2]),
        ])
    }
}

fn round_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

impl From<[u8; 3]> for ColorRgb {
    fn from(rgb: [u8; 3]) -> Self {
        Self(rgb)
    }
}

impl From<ColorRgb> for [u8; 3] {
    fn from(color: ColorRgb) -> Self {
        color.0
    }
}

/// A weighted sample fed into an `AveragingVoxelMap`: a position, a
/// colour, and an insertion weight (normally `1.0` for a raw input
/// point, but `n` for a voxel being merged wholesale).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// World position.
    pub position: DVec3,
    /// Colour at that position.
    pub color: ColorRgb,
    /// Insertion weight.
    pub weight: f64,
}

impl Sample {
    /// A unit-weight sample from a position and colour, as produced by
    /// one raw input point.
    #[must_use]
    pub fn unit(position: DVec3, color: ColorRgb) -> Self {
        Self {
            position,
            color,
            weight: 1.0,
        }
    }
}

/// The on-disk representation of one averaged point: 3 little-endian
/// `f32` coordinates followed by 3 `u8` colour channels, 15 bytes
/// total.
///
/// This is the record type written into shard files, per-level cache
/// files, and bundle payloads alike (§6 of the bundle format).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRecord {
    /// Position, narrowed to single precision.
    pub position: [f32; 3],
    /// Colour.
    pub color: ColorRgb,
}

impl PointRecord {
    /// Encoded size in bytes.
    pub const ENCODED_LEN: usize = 15;

    /// Build a record from a double-precision position and a colour.
    #[must_use]
    pub fn new(position: DVec3, color: ColorRgb) -> Self {
        Self {
            position: [position.x as f32, position.y as f32, position.z as f32],
            color,
        }
    }

    /// Position widened back to `f64`.
    #[must_use]
    pub fn position_f64(&self) -> DVec3 {
        DVec3::new(
            f64::from(self.position[0]),
            f64::from(self.position[1]),
            f64::from(self.position[2]),
        )
    }

    /// Write this record's 15-byte encoding.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for coordinate in self.position {
            w.write_f32::<LittleEndian>(coordinate)?;
        }
        w.write_all(&self.color.0)
    }

    /// Read one 15-byte record.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut position = [0.0f32; 3];
        for coordinate in &mut position {
            *coordinate = r.read_f32::<LittleEndian>()?;
        }
        let mut rgb = [0u8; 3];
        r.read_exact(&mut rgb)?;
        Ok(Self {
            position,
            color: ColorRgb(rgb),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_round_trips_through_f64() {
        let c = ColorRgb::new(10, 200, 255);
        assert_eq!(ColorRgb::from_f64(c.to_f64()), c);
    }

    #[test]
    fn point_record_round_trips_bytes() {
        let record = PointRecord::new(DVec3::new(1.5, -2.25, 100.0), ColorRgb::new(1, 2, 3));
        let mut buf = Vec::new();
        record.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), PointRecord::ENCODED_LEN);
        let decoded = PointRecord::read_from(&mut &buf[..]).unwrap();
        assert_eq!(decoded, record);
    }
}
