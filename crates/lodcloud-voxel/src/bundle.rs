//! The bundle file format: a header of per-(level, block) offsets and
//! sizes followed immediately by the concatenated payloads it
//! describes.
//!
//! All header integers are written host-endian `u64` (an explicit,
//! documented non-goal of cross-platform portability; see
//! `DESIGN.md`). Payload point records are always little-endian
//! (`lodcloud_core::PointRecord`).

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use hashbrown::HashMap;

use crate::error::{Result, VoxelError};

/// One header entry: where a single `(level, block)` payload lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirectoryEntry {
    offset: u64,
    size: u64,
}

/// Writes a bundle file from a directory of per-(level, block) cache
/// files named `<level><block_id>.bin` (one ASCII digit for the level,
/// then the decimal block id).
pub struct BundleWriter;

impl BundleWriter {
    /// Enumerate `cache_dir`'s payload files, compute the header, and
    /// write `header || payloads` to `out_path`.
    ///
    /// Files are consumed in a stable lexicographic sort of their file
    /// names, which also groups them by level since the level digit is
    /// the first character of each name.
    pub fn write(cache_dir: &Path, level_count: u32, out_path: &Path) -> Result<()> {
        let mut entries = Self::list_payload_files(cache_dir)?;
        entries.sort_by(|a, b| a.1.cmp(&b.1));

        let mut by_level: Vec<Vec<(u64, PathBuf, u64)>> =
            (0..level_count).map(|_| Vec::new()).collect();
        for (level, _name, block_id, path, size) in entries {
            by_level[level as usize].push((block_id, path, size));
        }

        let header_bytes = Self::header_len(&by_level);

        let file = File::create(out_path)?;
        let mut writer = BufWriter::new(file);

        let mut cursor = header_bytes;
        let mut offsets_by_level: Vec<Vec<u64>> = Vec::with_capacity(by_level.len());
        for level in &by_level {
            let mut offsets = Vec::with_capacity(level.len());
            for (_, _, size) in level {
                offsets.push(cursor);
                cursor += size;
            }
            offsets_by_level.push(offsets);
        }

        for (level, offsets) in by_level.iter().zip(offsets_by_level.iter()) {
            writer.write_all(&(level.len() as u64).to_ne_bytes())?;
            for ((block_id, _, size), offset) in level.iter().zip(offsets.iter()) {
                writer.write_all(&block_id.to_ne_bytes())?;
                writer.write_all(&offset.to_ne_bytes())?;
                writer.write_all(&size.to_ne_bytes())?;
            }
        }

        for level in &by_level {
            for (_, path, _) in level {
                let mut payload = File::open(path)?;
                std::io::copy(&mut payload, &mut writer)?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    fn header_len(by_level: &[Vec<(u64, PathBuf, u64)>]) -> u64 {
        let mut total = 0u64;
        for level in by_level {
            total += 8; // count_L
            total += (level.len() as u64) * 24; // (block_id, offset, size) per entry
        }
        total
    }

    /// List `<level><block_id>.bin` files in `cache_dir`, parsing the
    /// level/block id out of each file name.
    #[allow(clippy::type_complexity)]
    fn list_payload_files(
        cache_dir: &Path,
    ) -> Result<Vec<(u32, String, u64, PathBuf, u64)>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(cache_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("bin") {
                continue;
            }
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let mut chars = name.chars();
            let Some(level_digit) = chars.next() else {
                continue;
            };
            let Some(level) = level_digit.to_digit(10) else {
                continue;
            };
            let Ok(block_id) = chars.as_str().parse::<u64>() else {
                continue;
            };
            let size = entry.metadata()?.len();
            out.push((level, name.clone(), block_id, path, size));
        }
        Ok(out)
    }
}

/// A parsed, read-only view over a bundle's directory header.
///
/// Cheap to clone: only the parsed header and the file path are held.
/// Each read reopens the underlying file, so a `BundleReader` (or a
/// clone of it) can be shared across the render and loader threads
/// without any lock.
#[derive(Debug, Clone)]
pub struct BundleReader {
    path: PathBuf,
    levels: Vec<HashMap<u64, DirectoryEntry>>,
    file_size: u64,
}

impl BundleReader {
    /// Parse the header of the bundle at `path`.
    ///
    /// `level_count` must match the number of levels the writer
    /// emitted; it is not itself persisted in the file.
    pub fn open(path: &Path, level_count: u32) -> Result<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut levels = Vec::with_capacity(level_count as usize);
        for level in 0..level_count {
            let count = read_u64(&mut reader)?;
            let mut map = HashMap::with_capacity(count as usize);
            for _ in 0..count {
                let block_id = read_u64(&mut reader)?;
                let offset = read_u64(&mut reader)?;
                let size = read_u64(&mut reader)?;
                if offset + size > file_size {
                    return Err(VoxelError::CorruptBundle {
                        level,
                        block_id,
                        offset,
                        size,
                        file_size,
                    });
                }
                map.insert(block_id, DirectoryEntry { offset, size });
            }
            levels.push(map);
        }

        let header_bytes = reader.stream_position()?;
        if let Some(level0) = levels.first() {
            if let Some(min_offset) = level0.values().map(|e| e.offset).min() {
                if min_offset != header_bytes {
                    return Err(VoxelError::CorruptBundle {
                        level: 0,
                        block_id: 0,
                        offset: min_offset,
                        size: 0,
                        file_size,
                    });
                }
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            levels,
            file_size,
        })
    }

    /// Number of levels parsed from the header.
    #[must_use]
    pub fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    /// Total bundle file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// The `(offset, size)` of a `(level, block)` payload, if present.
    #[must_use]
    pub fn locate(&self, level: u32, block_id: u64) -> Option<(u64, u64)> {
        self.levels
            .get(level as usize)?
            .get(&block_id)
            .map(|e| (e.offset, e.size))
    }

    /// The canonical set of block ids: every id present at level 0.
    #[must_use]
    pub fn all_block_ids(&self) -> Vec<u64> {
        self.levels
            .first()
            .map(|level0| level0.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of blocks recorded at a given level.
    #[must_use]
    pub fn block_count(&self, level: u32) -> usize {
        self.levels.get(level as usize).map_or(0, HashMap::len)
    }

    /// Read the raw payload bytes for a `(level, block)` pair.
    pub fn read_payload(&self, level: u32, block_id: u64) -> Result<Vec<u8>> {
        let Some((offset, size)) = self.locate(level, block_id) else {
            return Ok(Vec::new());
        };
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; size as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

fn read_u64<R: Read>(r: &mut R) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_ne_bytes(buf))
}
