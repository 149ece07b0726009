//! CPU model-view matrix stack
//!
//! wgpu has no fixed-function transforms, so translations and rotations
//! are applied to vertices before they are queued.

/// 2D affine transform `x' = a*x + c*y + tx`, `y' = b*x + d*y + ty`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    tx: f32,
    ty: f32,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn translation(x: f32, y: f32) -> Self {
        Self {
            tx: x,
            ty: y,
            ..Self::IDENTITY
        }
    }

    /// Rotation by `degrees` around the origin, clockwise on a y-down screen
    pub fn rotation(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// `self` applied after `inner`.
    pub fn then(&self, inner: &Affine) -> Affine {
        Affine {
            a: self.a * inner.a + self.c * inner.b,
            b: self.b * inner.a + self.d * inner.b,
            c: self.a * inner.c + self.c * inner.d,
            d: self.b * inner.c + self.d * inner.d,
            tx: self.a * inner.tx + self.c * inner.ty + self.tx,
            ty: self.b * inner.tx + self.d * inner.ty + self.ty,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> [f32; 2] {
        [
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        ]
    }
}

/// Push/pop stack of model-view transforms
#[derive(Clone, Debug, Default)]
pub struct MatrixStack {
    current: Affine,
    saved: Vec<Affine>,
}

impl MatrixStack {
    pub fn current(&self) -> &Affine {
        &self.current
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    pub fn pop(&mut self) {
        match self.saved.pop() {
            Some(previous) => self.current = previous,
            None => tracing::warn!("matrix stack underflow"),
        }
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.current = self.current.then(&Affine::translation(x, y));
    }

    pub fn rotate(&mut self, degrees: f32) {
        self.current = self.current.then(&Affine::rotation(degrees));
    }

    /// Back to identity with an empty stack.
    pub fn reset(&mut self) {
        self.current = Affine::IDENTITY;
        self.saved.clear();
    }
}

/// Map pixel coordinates (origin top-left, y down) into clip space for a
/// `width` x `height` projection.
pub fn to_clip(position: [f32; 2], width: u32, height: u32) -> [f32; 2] {
    let width = width.max(1) as f32;
    let height = height.max(1) as f32;
    [
        position[0] * 2.0 / width - 1.0,
        1.0 - position[1] * 2.0 / height,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-4 && (a[1] - b[1]).abs() < 1e-4
    }

    #[test]
    fn test_rotation_around_center() {
        let mut stack = MatrixStack::default();
        stack.translate(5.0, 5.0);
        stack.rotate(90.0);
        stack.translate(-5.0, -5.0);

        // top-left corner of a 10x10 box swings to the top-right
        assert!(close(stack.current().apply(0.0, 0.0), [10.0, 0.0]));
        assert!(close(stack.current().apply(5.0, 5.0), [5.0, 5.0]));
    }

    #[test]
    fn test_push_pop() {
        let mut stack = MatrixStack::default();
        stack.push();
        stack.translate(3.0, 4.0);
        assert_eq!(stack.current().apply(0.0, 0.0), [3.0, 4.0]);
        stack.pop();
        assert_eq!(*stack.current(), Affine::IDENTITY);

        // underflow keeps the current transform
        stack.translate(1.0, 0.0);
        stack.pop();
        assert_eq!(stack.current().apply(0.0, 0.0), [1.0, 0.0]);
    }

    #[test]
    fn test_clip_mapping() {
        assert_eq!(to_clip([0.0, 0.0], 200, 100), [-1.0, 1.0]);
        assert_eq!(to_clip([200.0, 100.0], 200, 100), [1.0, -1.0]);
        assert_eq!(to_clip([100.0, 50.0], 200, 100), [0.0, 0.0]);
    }
}
