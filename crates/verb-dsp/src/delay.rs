//! Fixed-capacity circular delay lines.
//!
//! Buffers are allocated once at instantiate time. The "size" control only
//! moves `active_len` inside that capacity, so a parameter change re-times
//! the tail without clearing it and without touching the allocator.

/// One circular buffer with a movable active length.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buf: Vec<f64>,
    cursor: usize,
    active_len: usize,
}

impl DelayLine {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: vec![0.0; capacity],
            cursor: 0,
            active_len: capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn active_len(&self) -> usize {
        self.active_len
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Store at the cursor and advance it, wrapping at `active_len`.
    #[inline]
    pub fn write(&mut self, value: f64) {
        self.buf[self.cursor] = value;
        self.cursor += 1;
        if self.cursor >= self.active_len {
            self.cursor = 0;
        }
    }

    /// Linearly interpolated read at `cursor + offset`.
    ///
    /// Offset 0 is the oldest stored sample (the full delay); positive
    /// offsets move toward newer samples.
    #[inline]
    pub fn read(&self, offset: f64) -> f64 {
        let offset = if offset.is_finite() && offset > 0.0 { offset } else { 0.0 };
        let whole = offset.floor();
        let frac = offset - whole;
        let len = self.active_len;

        let i0 = (self.cursor + (whole as usize) % len) % len;
        let i1 = if i0 + 1 >= len { 0 } else { i0 + 1 };
        self.buf[i0] * (1.0 - frac) + self.buf[i1] * frac
    }

    /// Oldest stored sample, no interpolation.
    #[inline]
    pub fn read_oldest(&self) -> f64 {
        self.buf[self.cursor]
    }

    /// Change the active length. Contents are kept; the request is clamped
    /// to `[1, capacity]` and a cursor outside the new range restarts at 0.
    pub fn resize(&mut self, active_len: usize) {
        self.active_len = active_len.clamp(1, self.buf.len());
        if self.cursor >= self.active_len {
            self.cursor = 0;
        }
    }

    pub fn clear(&mut self) {
        self.buf.fill(0.0);
        self.cursor = 0;
    }
}

/// The reverb's delay lines, addressed by index.
#[derive(Debug, Clone)]
pub struct DelayLineBank {
    lines: Vec<DelayLine>,
}

impl DelayLineBank {
    pub fn new(capacities: &[usize]) -> Self {
        Self {
            lines: capacities.iter().map(|&c| DelayLine::new(c)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, id: usize) -> &DelayLine {
        &self.lines[id]
    }

    #[inline]
    pub fn write(&mut self, id: usize, value: f64) {
        self.lines[id].write(value);
    }

    #[inline]
    pub fn read(&self, id: usize, offset: f64) -> f64 {
        self.lines[id].read(offset)
    }

    pub fn resize(&mut self, id: usize, active_len: usize) {
        self.lines[id].resize(active_len);
    }

    pub fn clear(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraparound_law() {
        for len in [1usize, 2, 7, 331, 4801] {
            let mut line = DelayLine::new(5000);
            line.resize(len);
            line.write(0.0);
            let after_one = line.cursor();
            for _ in 0..len {
                line.write(0.0);
            }
            assert_eq!(line.cursor(), after_one, "len={len}");
        }
    }

    #[test]
    fn test_full_delay_read() {
        let mut line = DelayLine::new(16);
        line.resize(4);
        for v in [1.0, 2.0, 3.0, 4.0] {
            line.write(v);
        }
        // Cursor is back on the first slot: the oldest sample.
        assert_eq!(line.read(0.0), 1.0);
        assert_eq!(line.read(1.0), 2.0);
        assert_eq!(line.read(3.0), 4.0);
    }

    #[test]
    fn test_fractional_read_interpolates() {
        let mut line = DelayLine::new(4);
        for v in [0.0, 10.0, 20.0, 30.0] {
            line.write(v);
        }
        assert!((line.read(0.25) - 2.5).abs() < 1e-12);
        assert!((line.read(1.5) - 15.0).abs() < 1e-12);
        // Interpolation between the newest and the oldest slot wraps.
        assert!((line.read(3.5) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_offsets_wrap_and_reject_garbage() {
        let mut line = DelayLine::new(4);
        for v in [5.0, 6.0, 7.0, 8.0] {
            line.write(v);
        }
        assert_eq!(line.read(4.0), line.read(0.0));
        assert_eq!(line.read(1e9), line.read(0.0));
        assert_eq!(line.read(-3.0), 5.0);
        assert_eq!(line.read(f64::NAN), 5.0);
    }

    #[test]
    fn test_resize_clamps_to_capacity() {
        let mut line = DelayLine::new(100);
        line.resize(1000);
        assert_eq!(line.active_len(), 100);
        line.resize(0);
        assert_eq!(line.active_len(), 1);
    }

    #[test]
    fn test_resize_keeps_contents() {
        let mut line = DelayLine::new(8);
        for i in 0..8 {
            line.write(i as f64 + 1.0);
        }
        line.resize(4);
        assert_eq!(line.cursor(), 0);
        assert_eq!(line.read(0.0), 1.0);
        assert_eq!(line.read(3.0), 4.0);
    }

    #[test]
    fn test_resize_wraps_cursor_outside_range() {
        let mut line = DelayLine::new(8);
        for _ in 0..6 {
            line.write(1.0);
        }
        assert_eq!(line.cursor(), 6);
        line.resize(3);
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    fn test_bank_lines_are_independent() {
        assert!(DelayLineBank::new(&[]).is_empty());
        let mut bank = DelayLineBank::new(&[3, 5]);
        assert_eq!(bank.len(), 2);
        assert!(!bank.is_empty());
        bank.write(0, 1.0);
        assert_eq!(bank.line(1).cursor(), 0);
        assert_eq!(bank.line(0).cursor(), 1);
        bank.clear();
        assert_eq!(bank.read(0, 0.0), 0.0);
        assert_eq!(bank.line(0).cursor(), 0);
    }
}
