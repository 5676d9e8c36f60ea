//! Binary-little-endian PLY writing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::Result;
use crate::types::PlyMesh;

/// Writes a [`PlyMesh`] as binary-little-endian PLY, always at
/// single-precision (`float`) regardless of the precision the data
/// originated from.
pub struct PlyWriter;

impl PlyWriter {
    /// Write `mesh` to `path`.
    pub fn write(path: &Path, mesh: &PlyMesh) -> Result<()> {
        mesh.validate_uniform()?;

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        Self::write_header(&mut writer, mesh)?;
        Self::write_vertices(&mut writer, mesh)?;
        Self::write_faces(&mut writer, mesh)?;
        writer.flush()?;
        Ok(())
    }

    fn write_header<W: Write>(writer: &mut W, mesh: &PlyMesh) -> Result<()> {
        writeln!(writer, "ply")?;
        writeln!(writer, "format binary_little_endian 1.0")?;
        writeln!(writer, "element vertex {}", mesh.vertices.len())?;
        writeln!(writer, "property float x")?;
        writeln!(writer, "property float y")?;
        writeln!(writer, "property float z")?;
        if mesh.has_normals() {
            writeln!(writer, "property float nx")?;
            writeln!(writer, "property float ny")?;
            writeln!(writer, "property float nz")?;
        }
        if mesh.has_colors() {
            writeln!(writer, "property uchar red")?;
            writeln!(writer, "property uchar green")?;
            writeln!(writer, "property uchar blue")?;
            writeln!(writer, "property uchar alpha")?;
        }
        if mesh.has_intensities() {
            writeln!(writer, "property float intensity_value")?;
        }
        if !mesh.faces.is_empty() {
            writeln!(writer, "element face {}", mesh.faces.len())?;
            writeln!(writer, "property list uchar int vertex_indices")?;
        }
        writeln!(writer, "end_header")?;
        Ok(())
    }

    fn write_vertices<W: Write>(writer: &mut W, mesh: &PlyMesh) -> Result<()> {
        for vertex in &mesh.vertices {
            writer.write_f32::<LittleEndian>(vertex.position.x as f32)?;
            writer.write_f32::<LittleEndian>(vertex.position.y as f32)?;
            writer.write_f32::<LittleEndian>(vertex.position.z as f32)?;
            if let Some(normal) = vertex.normal {
                writer.write_f32::<LittleEndian>(normal.x as f32)?;
                writer.write_f32::<LittleEndian>(normal.y as f32)?;
                writer.write_f32::<LittleEndian>(normal.z as f32)?;
            }
            if let Some(color) = vertex.color {
                writer.write_all(&color.0)?;
                writer.write_u8(255)?;
            }
            if let Some(intensity) = vertex.intensity {
                writer.write_f32::<LittleEndian>(intensity as f32)?;
            }
        }
        Ok(())
    }

    fn write_faces<W: Write>(writer: &mut W, mesh: &PlyMesh) -> Result<()> {
        for face in &mesh.faces {
            writer.write_u8(3)?;
            for index in face {
                writer.write_i32::<LittleEndian>(*index as i32)?;
            }
        }
        Ok(())
    }
}
