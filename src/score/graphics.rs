// Score graphics - Sheet layout handed to the visual layer
//
// Segments are laid out on the loader's worker thread but rasterized on the
// update-cycle thread, one segment per cycle, so that the owner of the pixel
// data stays the thread that presents it.

/// A horizontal slice of the rendered sheet
#[derive(Debug, Clone)]
pub struct SheetSegment {
    /// Horizontal offset of the segment in the sheet
    pub x: i32,
    pub width: u32,
    pub height: u32,
    /// Vertical staff line offsets, relative to the segment top
    staff_lines: Vec<u32>,
    /// Grayscale coverage, row major, `None` until finalized
    pixels: Option<Vec<u8>>,
}

impl SheetSegment {
    pub fn new(x: i32, width: u32, height: u32, staff_lines: Vec<u32>) -> Self {
        Self {
            x,
            width,
            height,
            staff_lines,
            pixels: None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.pixels.is_some()
    }

    pub fn pixels(&self) -> Option<&[u8]> {
        self.pixels.as_deref()
    }

    /// Rasterize the segment's staff
    pub fn finalize(&mut self) {
        if self.pixels.is_some() {
            return;
        }

        let width = self.width as usize;
        let mut pixels = vec![0u8; width * self.height as usize];
        for &line in self.staff_lines.iter().filter(|&&line| line < self.height) {
            let row = line as usize * width;
            pixels[row..row + width].fill(u8::MAX);
        }
        self.pixels = Some(pixels);
    }
}

/// A score's graphics data
#[derive(Debug, Clone)]
pub struct SheetGraphics {
    /// Total sheet width
    pub width: i32,
    /// Vertical staff position
    pub staff_position: i32,
    pub staff_height: i32,
    segments: Vec<SheetSegment>,
}

impl SheetGraphics {
    pub fn new(width: i32, staff_position: i32, staff_height: i32, segments: Vec<SheetSegment>) -> Self {
        Self {
            width,
            staff_position,
            staff_height,
            segments,
        }
    }

    pub fn segments(&self) -> &[SheetSegment] {
        &self.segments
    }

    /// Finalize the next pending segment
    /// Returns false once every segment is finalized
    pub fn finalize_next(&mut self) -> bool {
        match self.segments.iter_mut().find(|s| !s.is_finalized()) {
            Some(segment) => {
                segment.finalize();
                true
            }
            None => false,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.segments.iter().all(SheetSegment::is_finalized)
    }

    /// Center of a beat's horizontal bounds
    pub fn beat_position(bounds_x: f32, bounds_width: f32) -> i32 {
        (bounds_x + bounds_width / 2.0) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_rasterization() {
        let mut segment = SheetSegment::new(0, 4, 3, vec![1, 7]);
        assert!(!segment.is_finalized());
        segment.finalize();

        let pixels = segment.pixels().unwrap();
        assert_eq!(pixels.len(), 12);
        assert_eq!(&pixels[0..4], &[0, 0, 0, 0]);
        assert_eq!(&pixels[4..8], &[255, 255, 255, 255]);
        assert_eq!(&pixels[8..12], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_finalize_one_segment_at_a_time() {
        let mut graphics = SheetGraphics::new(
            200,
            10,
            40,
            vec![
                SheetSegment::new(0, 100, 40, vec![0]),
                SheetSegment::new(100, 100, 40, vec![0]),
            ],
        );

        assert!(graphics.finalize_next());
        assert!(graphics.segments()[0].is_finalized());
        assert!(!graphics.segments()[1].is_finalized());
        assert!(!graphics.is_finalized());

        assert!(graphics.finalize_next());
        assert!(graphics.is_finalized());
        assert!(!graphics.finalize_next());
    }

    #[test]
    fn test_beat_position() {
        assert_eq!(SheetGraphics::beat_position(10.0, 20.0), 20);
        assert_eq!(SheetGraphics::beat_position(0.0, 5.0), 2);
    }
}
