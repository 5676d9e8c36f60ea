//! The runtime streaming engine: per-frame LOD selection and a
//! background loader thread that reads payloads without blocking the
//! caller's render loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use glam::DVec3;
use lodcloud_core::constants::LEVEL0_VOXEL_SIZE;
use lodcloud_core::VoxelKey;
use lodcloud_voxel::BundleReader;
use parking_lot::Mutex;
use tracing::debug;

use crate::block_table::BlockTable;
use crate::error::Result;
use crate::lod::select_level;
use crate::payload::DecodedPayload;

/// How long the loader sleeps between checks while the view hasn't
/// moved.
const IDLE_SLEEP: Duration = Duration::from_millis(50);

/// The viewer's latest world position and screen pixel count, as
/// observed by the render thread.
#[derive(Debug, Clone, Copy)]
struct ViewerSnapshot {
    position: DVec3,
    screen_pixels: f64,
}

impl Default for ViewerSnapshot {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            screen_pixels: 1920.0 * 1080.0,
        }
    }
}

/// Drives per-frame LOD selection and background payload streaming
/// for a single open bundle.
///
/// Two threads cooperate: the caller's render thread calls
/// [`Self::set_viewer_position`] and [`Self::drain_pending_uploads`]
/// once per frame and never blocks on I/O; a single background loader
/// thread owns all reads from the bundle file and all writes to the
/// per-block state.
pub struct StreamingEngine {
    blocks: Arc<BlockTable>,
    resident_level0: DecodedPayload,
    viewer: Arc<Mutex<ViewerSnapshot>>,
    position_dirty: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl StreamingEngine {
    /// Open a streaming engine over an already-parsed bundle,
    /// resident-loading every block's level-0 payload and spawning
    /// the background loader thread.
    pub fn new(reader: BundleReader) -> Result<Self> {
        let level0_key = VoxelKey::new(LEVEL0_VOXEL_SIZE);
        let block_ids = reader.all_block_ids();

        let mut resident_parts = Vec::with_capacity(block_ids.len());
        for &block_id in &block_ids {
            let bytes = reader.read_payload(0, block_id)?;
            resident_parts.push(DecodedPayload::decode(&bytes)?);
        }
        let resident_level0 = DecodedPayload::concat(resident_parts);

        let blocks = Arc::new(BlockTable::new(
            block_ids
                .iter()
                .map(|&id| (id, level0_key.voxel_center(id))),
        ));

        let viewer = Arc::new(Mutex::new(ViewerSnapshot::default()));
        let position_dirty = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = thread::Builder::new()
            .name("lodcloud-loader".into())
            .spawn({
                let reader = Arc::new(reader);
                let blocks = Arc::clone(&blocks);
                let viewer = Arc::clone(&viewer);
                let position_dirty = Arc::clone(&position_dirty);
                let shutdown = Arc::clone(&shutdown);
                move || loader_loop(&reader, &blocks, &viewer, &position_dirty, &shutdown)
            })
            .expect("failed to spawn lodcloud loader thread");

        Ok(Self {
            blocks,
            resident_level0,
            viewer,
            position_dirty,
            shutdown,
            worker: Some(worker),
        })
    }

    /// Record the viewer's world position and screen pixel count for
    /// this frame. Cheap; never blocks on I/O. Call once per frame
    /// from the render thread.
    pub fn set_viewer_position(&self, position: DVec3, screen_pixels: f64) {
        *self.viewer.lock() = ViewerSnapshot { position, screen_pixels };
        self.position_dirty.store(true, Ordering::Release);
    }

    /// The resident, always-visible level-0 aggregate (every block's
    /// level-0 payload concatenated).
    #[must_use]
    pub fn resident_level0(&self) -> &DecodedPayload {
        &self.resident_level0
    }

    /// Every block whose per-block overlay is currently visible
    /// (active level above 0), with its world centre.
    #[must_use]
    pub fn visible_blocks(&self) -> Vec<(u64, DVec3)> {
        self.blocks.visible_blocks()
    }

    /// Take every block's pending decoded upload produced by the
    /// loader since the last call. Call once per frame from the
    /// render thread; never blocks.
    pub fn drain_pending_uploads(&self) -> Vec<(u64, DecodedPayload)> {
        self.blocks.drain_pending()
    }

    /// Number of blocks tracked by this engine.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

impl Drop for StreamingEngine {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// The background loader's body: while not shut down, wait for a
/// position change, then recompute every block's desired level and
/// act on the ones that moved.
fn loader_loop(
    reader: &Arc<BundleReader>,
    blocks: &Arc<BlockTable>,
    viewer: &Arc<Mutex<ViewerSnapshot>>,
    position_dirty: &Arc<AtomicBool>,
    shutdown: &Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        if !position_dirty.swap(false, Ordering::AcqRel) {
            thread::sleep(IDLE_SLEEP);
            continue;
        }

        let snapshot = *viewer.lock();
        for block_id in blocks.block_ids() {
            refine_block(reader, blocks, block_id, snapshot);
        }
    }
}

/// Recompute and, if changed, apply one block's desired LOD level.
fn refine_block(
    reader: &Arc<BundleReader>,
    blocks: &Arc<BlockTable>,
    block_id: u64,
    snapshot: ViewerSnapshot,
) {
    let Some((center, active_level, _hidden)) = blocks.snapshot(block_id) else {
        return;
    };
    let distance_sq = (center - snapshot.position).length_squared();
    let desired = select_level(distance_sq, snapshot.screen_pixels);
    if desired == active_level {
        return;
    }

    if desired == 0 {
        blocks.set_level(block_id, 0, None);
        return;
    }

    match reader.read_payload(desired, block_id) {
        Ok(bytes) => match DecodedPayload::decode(&bytes) {
            Ok(payload) => blocks.set_level(block_id, desired, Some(payload)),
            Err(error) => {
                debug!(block_id, desired, %error, "failed to decode payload, retrying on next view change");
            }
        },
        Err(error) => {
            debug!(block_id, desired, %error, "failed to read payload, retrying on next view change");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodcloud_core::{ColorRgb, PointRecord};
    use lodcloud_voxel::BundleWriter;
    use std::fs::File;
    use std::io::Write as _;
    use std::thread::sleep;

    fn write_payload(dir: &std::path::Path, name: &str, records: &[(DVec3, ColorRgb)]) {
        let mut bytes = Vec::new();
        for (pos, color) in records {
            PointRecord::new(*pos, *color).write_to(&mut bytes).unwrap();
        }
        let mut f = File::create(dir.join(name)).unwrap();
        f.write_all(&bytes).unwrap();
    }

    fn build_test_bundle(level_count: u32, block_id: u64, center: DVec3) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache");
        std::fs::create_dir_all(&cache).unwrap();
        for level in 0..level_count {
            write_payload(
                &cache,
                &format!("{level}{block_id}.bin"),
                &[(center, ColorRgb::new(level as u8, 0, 0))],
            );
        }
        let out = dir.path().join("out.bundle");
        BundleWriter::write(&cache, level_count, &out).unwrap();
        (dir, out)
    }

    #[test]
    fn resident_level0_loads_every_block_at_construction() {
        let (_dir, bundle_path) = build_test_bundle(7, 42, DVec3::new(5.0, 5.0, 5.0));
        let reader = BundleReader::open(&bundle_path, 7).unwrap();
        let engine = StreamingEngine::new(reader).unwrap();
        assert_eq!(engine.block_count(), 1);
        assert_eq!(engine.resident_level0().len(), 1);
        assert!(engine.visible_blocks().is_empty());
    }

    #[test]
    fn close_viewer_eventually_unhides_and_uploads_the_block() {
        let center = DVec3::new(5.0, 5.0, 5.0);
        let (_dir, bundle_path) = build_test_bundle(7, 42, center);
        let reader = BundleReader::open(&bundle_path, 7).unwrap();
        let engine = StreamingEngine::new(reader).unwrap();

        engine.set_viewer_position(center, 1920.0 * 1080.0);

        let mut uploads = Vec::new();
        for _ in 0..50 {
            uploads.extend(engine.drain_pending_uploads());
            if !uploads.is_empty() {
                break;
            }
            sleep(Duration::from_millis(20));
        }

        assert!(!uploads.is_empty(), "expected a pending upload for the near block");
        assert_eq!(engine.visible_blocks().len(), 1);
    }

    #[test]
    fn far_viewer_leaves_block_hidden() {
        let center = DVec3::new(5.0, 5.0, 5.0);
        let (_dir, bundle_path) = build_test_bundle(7, 42, center);
        let reader = BundleReader::open(&bundle_path, 7).unwrap();
        let engine = StreamingEngine::new(reader).unwrap();

        engine.set_viewer_position(DVec3::new(10_000.0, 10_000.0, 10_000.0), 1920.0 * 1080.0);
        sleep(Duration::from_millis(100));

        assert!(engine.visible_blocks().is_empty());
        assert!(engine.drain_pending_uploads().is_empty());
    }
}
