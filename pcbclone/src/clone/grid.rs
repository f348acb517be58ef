use crate::geometry::Vector;

/// Rectangular grid of cell positions. Slot 0 is the template; slot `s`
/// sits in column `s % columns`, row `s / columns`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloneGrid {
    pub columns: usize,
    pub rows: usize,
    pub pitch: Vector,
}

impl CloneGrid {
    pub fn new(columns: usize, rows: usize, pitch: Vector) -> Self {
        Self {
            columns,
            rows,
            pitch,
        }
    }

    /// Number of cells including the template.
    pub fn count(&self) -> usize {
        self.columns * self.rows
    }

    pub fn offset(&self, slot: usize) -> Vector {
        let col = slot % self.columns;
        let row = slot / self.columns;
        Vector::new(col as f64 * self.pitch.dx, row as f64 * self.pitch.dy)
    }

    /// Every non-template slot with its offset from the template.
    pub fn slots(&self) -> impl Iterator<Item = (usize, Vector)> + '_ {
        (1..self.count()).map(move |slot| (slot, self.offset(slot)))
    }
}
