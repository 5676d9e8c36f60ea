//! The decoded buffer pair handed to callers: positions and colours
//! for one resident payload.

use std::io::Cursor;

use glam::Vec3;
use lodcloud_core::PointRecord;

use crate::error::Result;

/// A decoded `(level, block)` (or the resident level-0 aggregate): a
/// self-consistent pair of position and colour buffers, always the
/// same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPayload {
    /// Point positions.
    pub positions: Vec<Vec3>,
    /// Per-point colour, index-aligned with `positions`.
    pub colors: Vec<[u8; 3]>,
}

impl DecodedPayload {
    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether this payload carries no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Decode a raw bundle payload (interleaved 15-byte point records)
    /// into position/colour buffers.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let record_count = bytes.len() / PointRecord::ENCODED_LEN;
        let mut positions = Vec::with_capacity(record_count);
        let mut colors = Vec::with_capacity(record_count);
        for _ in 0..record_count {
            let record = PointRecord::read_from(&mut cursor)?;
            positions.push(Vec3::from_array(record.position));
            colors.push(record.color.0);
        }
        Ok(Self { positions, colors })
    }

    /// Concatenate several decoded payloads into one buffer, as the
    /// resident level-0 aggregate does across every block.
    #[must_use]
    pub fn concat(parts: impl IntoIterator<Item = Self>) -> Self {
        let mut positions = Vec::new();
        let mut colors = Vec::new();
        for part in parts {
            positions.extend(part.positions);
            colors.extend(part.colors);
        }
        Self { positions, colors }
    }
}
