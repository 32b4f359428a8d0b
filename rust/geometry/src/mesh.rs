// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use crate::error::{Error, Result};
use nalgebra::{Point2, Point3, Vector3};

/// Indexed triangle mesh as exchanged with the renderer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Texture coordinates (u, v); empty when the mesh carries none
    pub uvs: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            uvs: Vec::with_capacity(vertex_count * 2),
            indices: Vec::with_capacity(index_count),
        }
    }

    /// Add a vertex with normal
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>) {
        self.positions.push(position.x as f32);
        self.positions.push(position.y as f32);
        self.positions.push(position.z as f32);

        self.normals.push(normal.x as f32);
        self.normals.push(normal.y as f32);
        self.normals.push(normal.z as f32);
    }

    /// Add a vertex with normal and texture coordinate
    #[inline]
    pub fn add_vertex_uv(&mut self, position: Point3<f64>, normal: Vector3<f64>, uv: Point2<f64>) {
        self.add_vertex(position, normal);
        self.uvs.push(uv.x as f32);
        self.uvs.push(uv.y as f32);
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// One UV pair per vertex
    #[inline]
    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty() && self.uvs.len() / 2 == self.vertex_count()
    }

    #[inline]
    pub fn position(&self, index: usize) -> Point3<f64> {
        Point3::new(
            self.positions[index * 3] as f64,
            self.positions[index * 3 + 1] as f64,
            self.positions[index * 3 + 2] as f64,
        )
    }

    #[inline]
    pub fn normal(&self, index: usize) -> Vector3<f64> {
        Vector3::new(
            self.normals[index * 3] as f64,
            self.normals[index * 3 + 1] as f64,
            self.normals[index * 3 + 2] as f64,
        )
    }

    /// Texture coordinate of a vertex, if the mesh carries UVs
    #[inline]
    pub fn uv(&self, index: usize) -> Option<Point2<f64>> {
        if !self.has_uvs() {
            return None;
        }
        Some(Point2::new(
            self.uvs[index * 2] as f64,
            self.uvs[index * 2 + 1] as f64,
        ))
    }

    /// Iterate triangles as vertex index triples
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
    }

    /// Check attribute lengths, index ranges and finiteness
    pub fn validate(&self) -> Result<()> {
        if self.positions.len() % 3 != 0 || self.normals.len() != self.positions.len() {
            return Err(Error::InvalidMesh(format!(
                "{} position floats vs {} normal floats",
                self.positions.len(),
                self.normals.len()
            )));
        }
        if !self.uvs.is_empty() && !self.has_uvs() {
            return Err(Error::InvalidMesh(format!(
                "{} uv floats for {} vertices",
                self.uvs.len(),
                self.vertex_count()
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let vertex_count = self.vertex_count() as u32;
        if let Some(bad) = self.indices.iter().find(|&&i| i >= vertex_count) {
            return Err(Error::InvalidMesh(format!(
                "index {} out of range for {} vertices",
                bad, vertex_count
            )));
        }
        if !self.positions.iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidMesh("non-finite position".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
        assert!(!mesh.has_uvs());
    }

    #[test]
    fn test_add_vertex_uv() {
        let mut mesh = Mesh::new();
        mesh.add_vertex_uv(
            Point3::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 0.0, 1.0),
            Point2::new(0.25, 0.75),
        );
        assert_eq!(mesh.vertex_count(), 1);
        assert_eq!(mesh.positions, vec![1.0, 2.0, 3.0]);
        assert_eq!(mesh.normals, vec![0.0, 0.0, 1.0]);
        assert_eq!(mesh.uv(0), Some(Point2::new(0.25, 0.75)));
    }

    #[test]
    fn test_validate_catches_bad_index() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Point3::origin(), Vector3::z());
        mesh.add_triangle(0, 0, 3);
        assert!(matches!(mesh.validate(), Err(Error::InvalidMesh(_))));
    }
}
