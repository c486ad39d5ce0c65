//! Pad sections: named rectangular (or ragged) groups of matrix coordinates.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::Error;

/// A matrix coordinate, stored row-first as the hardware enumerates pads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Zero-based matrix row.
    pub row: u32,
    /// Zero-based matrix column.
    pub col: u32,
}

impl Coord {
    /// Build a coordinate from `(row, col)`.
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Bounding box of a section's coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// Smallest column.
    pub min_x: u32,
    /// Smallest row.
    pub min_y: u32,
    /// Largest column.
    pub max_x: u32,
    /// Largest row.
    pub max_y: u32,
}

impl Bounds {
    /// Number of columns spanned.
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Number of rows spanned.
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Where one control sits, in section-local and matrix-global terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Zero-based index within the section.
    pub index: usize,
    /// Section-local column.
    pub x: u32,
    /// Section-local row.
    pub y: u32,
    /// Section-local column counted from the right edge.
    pub x_flip: u32,
    /// Section-local row counted from the bottom edge.
    pub y_flip: u32,
    /// Matrix column.
    pub global_x: u32,
    /// Matrix row.
    pub global_y: u32,
}

impl Position {
    /// Positional fields as they appear under `me` in a control's context.
    ///
    /// Lower-case names are zero-based; capitalised names are one-based.
    pub fn to_context(self) -> Value {
        json!({
            "index": self.index,
            "Index": self.index + 1,
            "x": self.x,
            "X": self.x + 1,
            "y": self.y,
            "Y": self.y + 1,
            "x_flip": self.x_flip,
            "X_flip": self.x_flip + 1,
            "y_flip": self.y_flip,
            "Y_flip": self.y_flip + 1,
            "global_x": self.global_x,
            "global_X": self.global_x + 1,
            "global_y": self.global_y,
            "global_Y": self.global_y + 1,
        })
    }
}

/// A named group of pads owning a list of coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name, used in errors and generated control names.
    pub name: String,
    /// Owned coordinates in control order.
    pub coordinates: Vec<Coord>,
    /// Bounding box of `coordinates`.
    bounds: Bounds,
}

impl Section {
    /// Build a section. A section without coordinates is a critical error.
    pub fn new(name: impl Into<String>, coordinates: Vec<Coord>) -> crate::Result<Self> {
        let name = name.into();
        let bounds = bounds_of(&coordinates).ok_or_else(|| {
            Error::critical(format!("section {name} owns no coordinates")).at(name.clone())
        })?;
        Ok(Self {
            name,
            coordinates,
            bounds,
        })
    }

    /// Build a section covering the inclusive rectangle of rows and columns.
    pub fn rect(
        name: impl Into<String>,
        rows: (u32, u32),
        cols: (u32, u32),
    ) -> crate::Result<Self> {
        let coords = (rows.0..=rows.1)
            .flat_map(|row| (cols.0..=cols.1).map(move |col| Coord::new(row, col)))
            .collect();
        Self::new(name, coords)
    }

    /// Bounding box of the section.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Number of controls this section holds.
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// True when the section owns no coordinates (never, once built).
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Position of the control at `index`.
    pub fn position(&self, index: usize) -> Option<Position> {
        let c = self.coordinates.get(index)?;
        let b = self.bounds;
        let x = c.col - b.min_x;
        let y = c.row - b.min_y;
        Some(Position {
            index,
            x,
            y,
            x_flip: b.width() - 1 - x,
            y_flip: b.height() - 1 - y,
            global_x: c.col,
            global_y: c.row,
        })
    }
}

/// Bounding box of a non-empty coordinate list.
fn bounds_of(coords: &[Coord]) -> Option<Bounds> {
    let first = coords.first()?;
    let init = Bounds {
        min_x: first.col,
        min_y: first.row,
        max_x: first.col,
        max_y: first.row,
    };
    Some(coords.iter().fold(init, |b, c| Bounds {
        min_x: b.min_x.min(c.col),
        min_y: b.min_y.min(c.row),
        max_x: b.max_x.max(c.col),
        max_y: b.max_y.max(c.row),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_in_offset_rect() {
        // Rows 4..=7, columns 2..=5: a 4x4 block in the lower middle.
        let s = Section::rect("pads", (4, 7), (2, 5)).unwrap();
        assert_eq!(s.len(), 16);
        let p = s.position(0).unwrap();
        assert_eq!((p.x, p.y, p.x_flip, p.y_flip), (0, 0, 3, 3));
        assert_eq!((p.global_x, p.global_y), (2, 4));

        let p = s.position(6).unwrap();
        assert_eq!((p.x, p.y, p.x_flip, p.y_flip), (2, 1, 1, 2));

        let ctx = p.to_context();
        assert_eq!(ctx["Index"], 7);
        assert_eq!(ctx["X"], 3);
        assert_eq!(ctx["Y_flip"], 3);
        assert!(s.position(16).is_none());
    }

    #[test]
    fn empty_section_is_critical() {
        let err = Section::new("nothing", vec![]).unwrap_err();
        assert!(err.is_critical());
    }
}
