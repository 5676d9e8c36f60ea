//! Thread-safe registry of per-block renderable state: a
//! `parking_lot::RwLock` over a hashed table, read by both the render
//! and loader threads but written only by the loader.

use glam::DVec3;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::payload::DecodedPayload;

/// One block's renderable state.
///
/// `pending` and `active_level` are updated together under the same
/// lock acquisition so the renderer never observes a level without
/// the buffers that belong to it (or vice versa) -- see §5's ordering
/// guarantee.
#[derive(Debug, Clone, Default)]
pub struct BlockState {
    /// World centre of this block's L0 voxel.
    pub center: DVec3,
    /// The level currently considered active by the loader.
    pub active_level: u32,
    /// Whether the block's overlay is hidden (level 0: only the
    /// resident aggregate is visible).
    pub hidden: bool,
    /// A decoded buffer waiting to be drained by the render thread,
    /// if the loader produced one since the last drain.
    pending: Option<DecodedPayload>,
}

impl BlockState {
    fn at(center: DVec3) -> Self {
        Self {
            center,
            active_level: 0,
            hidden: true,
            pending: None,
        }
    }
}

/// Registry of every block's [`BlockState`], keyed by block id.
pub struct BlockTable {
    blocks: RwLock<HashMap<u64, BlockState>>,
}

impl BlockTable {
    /// Build a table with one hidden, level-0 entry per `(block_id,
    /// center)` pair.
    #[must_use]
    pub fn new(blocks: impl IntoIterator<Item = (u64, DVec3)>) -> Self {
        let map = blocks
            .into_iter()
            .map(|(id, center)| (id, BlockState::at(center)))
            .collect();
        Self {
            blocks: RwLock::new(map),
        }
    }

    /// Number of registered blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Whether the table holds no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    /// Every registered block id.
    #[must_use]
    pub fn block_ids(&self) -> Vec<u64> {
        self.blocks.read().keys().copied().collect()
    }

    /// Read a block's current `(center, active_level, hidden)`
    /// snapshot.
    #[must_use]
    pub fn snapshot(&self, block_id: u64) -> Option<(DVec3, u32, bool)> {
        self.blocks
            .read()
            .get(&block_id)
            .map(|b| (b.center, b.active_level, b.hidden))
    }

    /// Transition a block to `level`, hiding its overlay at level 0 or
    /// parking a decoded payload as its pending upload otherwise.
    ///
    /// Called only by the loader thread.
    pub fn set_level(&self, block_id: u64, level: u32, payload: Option<DecodedPayload>) {
        let mut blocks = self.blocks.write();
        if let Some(block) = blocks.get_mut(&block_id) {
            block.active_level = level;
            block.hidden = level == 0;
            block.pending = payload;
        }
    }

    /// Every block whose overlay is currently visible (not hidden),
    /// with its world centre.
    #[must_use]
    pub fn visible_blocks(&self) -> Vec<(u64, DVec3)> {
        self.blocks
            .read()
            .iter()
            .filter(|(_, b)| !b.hidden)
            .map(|(id, b)| (*id, b.center))
            .collect()
    }

    /// Drain every block's pending upload, leaving `None` behind.
    ///
    /// Called by the render thread once per frame; the loader may be
    /// concurrently writing new pending uploads for other blocks.
    pub fn drain_pending(&self) -> Vec<(u64, DecodedPayload)> {
        let mut blocks = self.blocks.write();
        blocks
            .iter_mut()
            .filter_map(|(id, b)| b.pending.take().map(|p| (*id, p)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_blocks_start_hidden_at_level_zero() {
        let table = BlockTable::new([(1, DVec3::ZERO), (2, DVec3::ONE)]);
        assert_eq!(table.len(), 2);
        let (center, level, hidden) = table.snapshot(1).unwrap();
        assert_eq!(center, DVec3::ZERO);
        assert_eq!(level, 0);
        assert!(hidden);
        assert!(table.visible_blocks().is_empty());
    }

    #[test]
    fn set_level_above_zero_unhides_and_parks_payload() {
        let table = BlockTable::new([(1, DVec3::ZERO)]);
        let payload = DecodedPayload {
            positions: vec![glam::Vec3::ZERO],
            colors: vec![[1, 2, 3]],
        };
        table.set_level(1, 3, Some(payload.clone()));

        let (_, level, hidden) = table.snapshot(1).unwrap();
        assert_eq!(level, 3);
        assert!(!hidden);
        assert_eq!(table.visible_blocks(), vec![(1, DVec3::ZERO)]);

        let drained = table.drain_pending();
        assert_eq!(drained, vec![(1, payload)]);
        assert!(table.drain_pending().is_empty());
    }

    #[test]
    fn set_level_zero_hides_regardless_of_prior_state() {
        let table = BlockTable::new([(1, DVec3::ZERO)]);
        table.set_level(1, 4, Some(DecodedPayload::default()));
        table.set_level(1, 0, None);
        let (_, level, hidden) = table.snapshot(1).unwrap();
        assert_eq!(level, 0);
        assert!(hidden);
    }
}
