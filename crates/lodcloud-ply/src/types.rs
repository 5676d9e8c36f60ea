//! PLY value types: one vertex's optional channels, and a mesh.
//!
//! A point's "has normal"/"has colour"/"has intensity" are derived
//! from whether the corresponding field is populated, and a whole
//! cloud is only meaningful if every point agrees on which optional
//! channels are present.

use glam::DVec3;
use lodcloud_core::ColorRgb;

use crate::error::{PlyError, Result};

/// One PLY vertex: a required position plus any of normal, colour,
/// intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlyVertex {
    /// Position (widened to `f64` regardless of the file's declared
    /// property type).
    pub position: DVec3,
    /// Normal, if the file declared `nx ny nz`.
    pub normal: Option<DVec3>,
    /// Colour, if the file declared `red green blue` (alpha is
    /// validated to be 255 and then discarded).
    pub color: Option<ColorRgb>,
    /// Intensity, if the file declared `intensity_value`.
    pub intensity: Option<f64>,
}

impl PlyVertex {
    /// A vertex with only a position.
    #[must_use]
    pub fn bare(position: DVec3) -> Self {
        Self {
            position,
            normal: None,
            color: None,
            intensity: None,
        }
    }

    /// A vertex with a position and colour, the shape the LOD build
    /// pipeline consumes.
    #[must_use]
    pub fn colored(position: DVec3, color: ColorRgb) -> Self {
        Self {
            position,
            normal: None,
            color: Some(color),
            intensity: None,
        }
    }
}

/// A point cloud plus optional triangle faces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlyMesh {
    /// Every vertex.
    pub vertices: Vec<PlyVertex>,
    /// Triangle faces as vertex indices into [`Self::vertices`].
    pub faces: Vec<[u32; 3]>,
}

impl PlyMesh {
    /// A mesh with no faces.
    #[must_use]
    pub fn from_vertices(vertices: Vec<PlyVertex>) -> Self {
        Self {
            vertices,
            faces: Vec::new(),
        }
    }

    /// Whether every vertex agrees on which optional channels are
    /// present. The reader never produces a non-uniform mesh (presence
    /// is a whole-file property); this only matters for meshes built
    /// programmatically before writing.
    pub fn validate_uniform(&self) -> Result<()> {
        let Some(first) = self.vertices.first() else {
            return Ok(());
        };
        let (has_normal, has_color, has_intensity) = (
            first.normal.is_some(),
            first.color.is_some(),
            first.intensity.is_some(),
        );
        for vertex in &self.vertices {
            if vertex.normal.is_some() != has_normal {
                return Err(PlyError::NonUniformCloud(
                    "some vertices have a normal and others do not",
                ));
            }
            if vertex.color.is_some() != has_color {
                return Err(PlyError::NonUniformCloud(
                    "some vertices have a colour and others do not",
                ));
            }
            if vertex.intensity.is_some() != has_intensity {
                return Err(PlyError::NonUniformCloud(
                    "some vertices have an intensity and others do not",
                ));
            }
        }
        Ok(())
    }

    /// Whether any vertex carries a normal.
    #[must_use]
    pub fn has_normals(&self) -> bool {
        self.vertices.first().is_some_and(|v| v.normal.is_some())
    }

    /// Whether any vertex carries a colour.
    #[must_use]
    pub fn has_colors(&self) -> bool {
        self.vertices.first().is_some_and(|v| v.color.is_some())
    }

    /// Whether any vertex carries an intensity.
    #[must_use]
    pub fn has_intensities(&self) -> bool {
        self.vertices.first().is_some_and(|v| v.intensity.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mesh_is_uniform() {
        assert!(PlyMesh::default().validate_uniform().is_ok());
    }

    #[test]
    fn mixed_colour_presence_is_rejected() {
        let mesh = PlyMesh::from_vertices(vec![
            PlyVertex::colored(DVec3::ZERO, ColorRgb::new(1, 2, 3)),
            PlyVertex::bare(DVec3::ONE),
        ]);
        assert!(mesh.validate_uniform().is_err());
    }
}
