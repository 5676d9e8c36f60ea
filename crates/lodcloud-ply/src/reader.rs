//! Binary-little-endian PLY reading.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use glam::DVec3;
use lodcloud_core::ColorRgb;

use crate::error::{PlyError, Result};
use crate::types::{PlyMesh, PlyVertex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precision {
    Float,
    Double,
}

impl Precision {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "float" | "float32" => Some(Self::Float),
            "double" | "float64" => Some(Self::Double),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Header {
    vertex_count: usize,
    face_count: usize,
    has_coordinates: bool,
    has_normals: bool,
    has_colors: bool,
    has_intensities: bool,
    has_faces: bool,
    coordinate_precision: Option<Precision>,
}

/// Reads binary-little-endian PLY files into a [`PlyMesh`].
pub struct PlyReader;

impl PlyReader {
    /// Read the mesh at `path`.
    ///
    /// Rejects ASCII PLY, a missing `x` coordinate property, a
    /// non-255 alpha channel when colour is present, and any face
    /// whose vertex-index list is not length 3.
    pub fn read(path: &Path) -> Result<PlyMesh> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let header = Self::read_header(&mut reader)?;

        if !header.has_coordinates {
            return Err(PlyError::MissingCoordinates);
        }
        let precision = header
            .coordinate_precision
            .ok_or_else(|| PlyError::UnsupportedPropertyType("<missing>".to_string()))?;

        let mut vertices = Vec::with_capacity(header.vertex_count);
        for index in 0..header.vertex_count {
            vertices.push(Self::read_vertex(&mut reader, &header, precision, index)?);
        }

        let mut faces = Vec::with_capacity(header.face_count);
        if header.has_faces {
            for index in 0..header.face_count {
                faces.push(Self::read_face(&mut reader, index)?);
            }
        }

        Ok(PlyMesh { vertices, faces })
    }

    fn read_header<R: BufRead>(reader: &mut R) -> Result<Header> {
        let mut header = Header::default();
        let mut format_seen = false;

        loop {
            let mut line = String::new();
            let bytes_read = reader.read_line(&mut line)?;
            if bytes_read == 0 {
                break;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut words = line.split_whitespace();
            let Some(keyword) = words.next() else {
                continue;
            };

            match keyword {
                "format" => {
                    let format = words.next().unwrap_or_default();
                    if format != "binary_little_endian" {
                        return Err(PlyError::UnsupportedFormat(format.to_string()));
                    }
                    format_seen = true;
                }
                "element" => {
                    let kind = words.next().unwrap_or_default();
                    let count: usize = words.next().and_then(|w| w.parse().ok()).unwrap_or(0);
                    match kind {
                        "vertex" => header.vertex_count = count,
                        "face" => {
                            header.has_faces = true;
                            header.face_count = count;
                        }
                        _ => {}
                    }
                }
                "property" => {
                    // "property list uchar int vertex_indices" for faces;
                    // "property <type> <name>" for vertex scalars.
                    if words.clone().next() == Some("list") {
                        continue;
                    }
                    let type_token = words.next().unwrap_or_default();
                    let name = words.next().unwrap_or_default();
                    match name {
                        "x" => {
                            header.has_coordinates = true;
                            header.coordinate_precision = Precision::parse(type_token);
                            if header.coordinate_precision.is_none() {
                                return Err(PlyError::UnsupportedPropertyType(
                                    type_token.to_string(),
                                ));
                            }
                        }
                        "nx" => header.has_normals = true,
                        "red" => header.has_colors = true,
                        "intensity_value" => header.has_intensities = true,
                        _ => {}
                    }
                }
                "end_header" => break,
                _ => {}
            }
        }

        if !format_seen {
            return Err(PlyError::UnsupportedFormat(String::new()));
        }
        Ok(header)
    }

    fn read_vertex<R: Read>(
        reader: &mut R,
        header: &Header,
        precision: Precision,
        index: usize,
    ) -> Result<PlyVertex> {
        let position = Self::read_vec3(reader, precision)?;
        let normal = header
            .has_normals
            .then(|| Self::read_vec3(reader, precision))
            .transpose()?;
        let color = if header.has_colors {
            let r = reader.read_u8()?;
            let g = reader.read_u8()?;
            let b = reader.read_u8()?;
            let alpha = reader.read_u8()?;
            if alpha != 255 {
                return Err(PlyError::InvalidAlpha { index, alpha });
            }
            Some(ColorRgb::new(r, g, b))
        } else {
            None
        };
        let intensity = header
            .has_intensities
            .then(|| Self::read_scalar(reader, precision))
            .transpose()?;

        Ok(PlyVertex {
            position,
            normal,
            color,
            intensity,
        })
    }

    fn read_face<R: Read>(reader: &mut R, index: usize) -> Result<[u32; 3]> {
        let count = reader.read_u8()?;
        if count != 3 {
            return Err(PlyError::NonTriangularFace { index, count });
        }
        let mut indices = [0u32; 3];
        for slot in &mut indices {
            *slot = reader.read_i32::<LittleEndian>()? as u32;
        }
        Ok(indices)
    }

    fn read_scalar<R: Read>(reader: &mut R, precision: Precision) -> Result<f64> {
        Ok(match precision {
            Precision::Float => f64::from(reader.read_f32::<LittleEndian>()?),
            Precision::Double => reader.read_f64::<LittleEndian>()?,
        })
    }

    fn read_vec3<R: Read>(reader: &mut R, precision: Precision) -> Result<DVec3> {
        let x = Self::read_scalar(reader, precision)?;
        let y = Self::read_scalar(reader, precision)?;
        let z = Self::read_scalar(reader, precision)?;
        Ok(DVec3::new(x, y, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::PlyWriter;

    #[test]
    fn rejects_ascii_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ascii.ply");
        std::fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 0\nproperty float x\nend_header\n",
        )
        .unwrap();
        assert!(matches!(
            PlyReader::read(&path),
            Err(PlyError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn round_trips_through_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.ply");
        let mesh = PlyMesh::from_vertices(vec![
            PlyVertex::colored(DVec3::new(1.0, 2.0, 3.0), ColorRgb::new(10, 20, 30)),
            PlyVertex::colored(DVec3::new(-1.5, 0.0, 9.25), ColorRgb::new(255, 0, 128)),
        ]);
        PlyWriter::write(&path, &mesh).unwrap();
        let read_back = PlyReader::read(&path).unwrap();
        assert_eq!(read_back.vertices.len(), 2);
        for (original, read) in mesh.vertices.iter().zip(read_back.vertices.iter()) {
            assert!((original.position - read.position).length() < 1e-5);
            assert_eq!(original.color, read.color);
        }
    }

    #[test]
    fn rejects_non_255_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad_alpha.ply");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(
            b"ply\nformat binary_little_endian 1.0\nelement vertex 1\n\
property float x\nproperty float y\nproperty float z\n\
property uchar red\nproperty uchar green\nproperty uchar blue\nproperty uchar alpha\n\
end_header\n",
        );
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        bytes.extend_from_slice(&2.0f32.to_le_bytes());
        bytes.extend_from_slice(&3.0f32.to_le_bytes());
        bytes.extend_from_slice(&[10, 20, 30, 254]);
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            PlyReader::read(&path),
            Err(PlyError::InvalidAlpha { .. })
        ));
    }

    #[test]
    fn rejects_quad_faces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.ply");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(
            b"ply\nformat binary_little_endian 1.0\nelement vertex 1\n\
property float x\nproperty float y\nproperty float z\n\
element face 1\nproperty list uchar int vertex_indices\nend_header\n",
        );
        bytes.extend_from_slice(&0.0f32.to_le_bytes());
        bytes.extend_from_slice(&0.0f32.to_le_bytes());
        bytes.extend_from_slice(&0.0f32.to_le_bytes());
        bytes.push(4);
        for i in 0..4i32 {
            bytes.extend_from_slice(&i.to_le_bytes());
        }
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            PlyReader::read(&path),
            Err(PlyError::NonTriangularFace { .. })
        ));
    }

    #[test]
    fn missing_coordinates_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_xyz.ply");
        std::fs::write(
            &path,
            "ply\nformat binary_little_endian 1.0\nelement vertex 0\nend_header\n",
        )
        .unwrap();
        assert!(matches!(
            PlyReader::read(&path),
            Err(PlyError::MissingCoordinates)
        ));
    }
}
