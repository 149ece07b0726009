//! Shared scratch vertex buffer

use wayfarer_paint::Vertex;

use crate::backend::{GraphicsBackend, Primitive};

/// Fixed-capacity vertex staging area, drawn and reset when full
#[derive(Clone, Debug)]
pub struct VertexBuffer {
    vertices: Vec<Vertex>,
    capacity: usize,
}

impl VertexBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn as_slice(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn extend_from_slice(&mut self, vertices: &[Vertex]) {
        self.vertices.extend_from_slice(vertices);
    }

    /// Whether appending `extra` more vertices would reach the capacity
    pub fn needs_flush(&self, extra: usize) -> bool {
        self.vertices.len() + extra >= self.capacity
    }

    /// Draw the staged vertices as `primitive` and reset.
    pub fn flush<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B, primitive: Primitive) {
        if self.vertices.is_empty() {
            return;
        }
        backend.draw_arrays(primitive, &self.vertices);
        self.vertices.clear();
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;

    #[test]
    fn test_flush_threshold() {
        let mut buffer = VertexBuffer::new(20);
        buffer.extend_from_slice(&[Vertex::default(); 10]);
        assert!(buffer.needs_flush(10));
        assert!(!buffer.needs_flush(9));
    }

    #[test]
    fn test_flush_draws_and_resets() {
        let mut backend = RecordingBackend::default();
        let mut buffer = VertexBuffer::new(16);

        buffer.flush(&mut backend, Primitive::Triangles);
        assert!(backend.commands().is_empty());

        buffer.extend_from_slice(&[Vertex::at(1.0, 2.0); 3]);
        buffer.flush(&mut backend, Primitive::Triangles);
        assert!(buffer.is_empty());

        let draws = backend.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].0, Primitive::Triangles);
        assert_eq!(draws[0].1.len(), 3);
    }
}
