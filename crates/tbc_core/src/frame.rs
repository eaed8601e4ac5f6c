//! Decoded component frames.

/// Y, U and V planes of one decoded frame in engine sample units.
///
/// Width is the field width, height is `2 * field_height - 1`. Even lines
/// come from the first field, odd lines from the second.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentFrame {
    width: usize,
    height: usize,
    y: Vec<f64>,
    u: Vec<f64>,
    v: Vec<f64>,
}

impl ComponentFrame {
    /// Create a zeroed frame.
    pub fn new(width: usize, height: usize) -> Self {
        let len = width * height;
        Self {
            width,
            height,
            y: vec![0.0; len],
            u: vec![0.0; len],
            v: vec![0.0; len],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn span(&self, line: usize) -> std::ops::Range<usize> {
        let start = line * self.width;
        start..start + self.width
    }

    /// Luma samples of a frame line.
    pub fn y(&self, line: usize) -> &[f64] {
        &self.y[self.span(line)]
    }

    /// Blue-difference samples of a frame line.
    pub fn u(&self, line: usize) -> &[f64] {
        &self.u[self.span(line)]
    }

    /// Red-difference samples of a frame line.
    pub fn v(&self, line: usize) -> &[f64] {
        &self.v[self.span(line)]
    }

    pub fn y_mut(&mut self, line: usize) -> &mut [f64] {
        let span = self.span(line);
        &mut self.y[span]
    }

    pub fn u_mut(&mut self, line: usize) -> &mut [f64] {
        let span = self.span(line);
        &mut self.u[span]
    }

    pub fn v_mut(&mut self, line: usize) -> &mut [f64] {
        let span = self.span(line);
        &mut self.v[span]
    }

    /// Whole luma plane, row-major.
    pub fn y_plane(&self) -> &[f64] {
        &self.y
    }

    pub fn u_plane(&self) -> &[f64] {
        &self.u
    }

    pub fn v_plane(&self) -> &[f64] {
        &self.v
    }
}
