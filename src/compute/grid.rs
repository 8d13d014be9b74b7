//! Flat-buffer grid geometry with a padding border.
//!
//! Every map tile has a neighbour on all four sides inside the buffer, so
//! per-cell stencils can step `±1` / `±stride` without bounds checks.

use super::EngineError;

/// One of the four stencil directions.
///
/// `Top` is `+stride` (towards larger `y`), `Bottom` is `-stride`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Top,
    Bottom,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Bottom,
        Direction::Left,
        Direction::Right,
    ];

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::Bottom => Direction::Top,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Layout of a padded map inside flat per-cell buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    width: usize,
    height: usize,
    stride: usize,
    padded_height: usize,
    starting_index: usize,
}

/// A map row as seen by a row task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapRow {
    /// Map `y` coordinate.
    pub y: usize,
    /// Flat index of tile `(0, y)`.
    pub start: usize,
    /// Offset of tile `(0, y)` within the stride-sized row chunk.
    pub offset: usize,
}

impl GridGeometry {
    /// Geometry with a one-tile border around a `width × height` map.
    pub fn with_border(width: usize, height: usize) -> Result<Self, EngineError> {
        let stride = width + 2;
        Self::new(width, height, stride, height + 2, stride + 1)
    }

    /// Validated geometry from host-supplied layout values.
    pub fn new(
        width: usize,
        height: usize,
        stride: usize,
        padded_height: usize,
        starting_index: usize,
    ) -> Result<Self, EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::EmptyGrid);
        }
        if stride < width {
            return Err(EngineError::StrideTooNarrow { stride, width });
        }
        let column_offset = starting_index % stride;
        let first_row = starting_index / stride;
        if column_offset == 0
            || column_offset + width >= stride
            || first_row == 0
            || first_row + height >= padded_height
        {
            return Err(EngineError::MissingBorder);
        }
        Ok(Self {
            width,
            height,
            stride,
            padded_height,
            starting_index,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn padded_height(&self) -> usize {
        self.padded_height
    }

    #[inline]
    pub fn starting_index(&self) -> usize {
        self.starting_index
    }

    /// Required length of every per-cell buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.stride * self.padded_height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of map tiles (border excluded).
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.width * self.height
    }

    /// Buffer row holding map row 0.
    #[inline]
    pub fn first_row(&self) -> usize {
        self.starting_index / self.stride
    }

    /// Column of map `x = 0` within a buffer row.
    #[inline]
    pub fn column_offset(&self) -> usize {
        self.starting_index % self.stride
    }

    /// Flat index of map tile `(x, y)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        self.starting_index + y * self.stride + x
    }

    /// Neighbour index. Unchecked: only valid for map tiles.
    #[inline]
    pub fn neighbor(&self, index: usize, direction: Direction) -> usize {
        match direction {
            Direction::Top => index + self.stride,
            Direction::Bottom => index - self.stride,
            Direction::Left => index - 1,
            Direction::Right => index + 1,
        }
    }

    /// Map coordinates of a flat index, or `None` for border cells.
    pub fn coordinates(&self, index: usize) -> Option<(usize, usize)> {
        let row = index / self.stride;
        let column = index % self.stride;
        let y = row.checked_sub(self.first_row())?;
        let x = column.checked_sub(self.column_offset())?;
        (x < self.width && y < self.height).then_some((x, y))
    }

    /// Whether a flat index is a real map tile rather than border padding.
    #[inline]
    pub fn is_map_tile(&self, index: usize) -> bool {
        self.coordinates(index).is_some()
    }

    /// Map row stored in buffer row `chunk`. Callers only pass map rows.
    #[inline]
    pub fn row(&self, chunk: usize) -> MapRow {
        let y = chunk - self.first_row();
        MapRow {
            y,
            start: self.index(0, y),
            offset: self.column_offset(),
        }
    }

    /// Check a per-cell buffer length against this geometry.
    pub fn check_buffer(&self, buffer: &'static str, actual: usize) -> Result<(), EngineError> {
        let expected = self.len();
        if actual != expected {
            return Err(EngineError::BufferLength {
                buffer,
                expected,
                actual,
            });
        }
        Ok(())
    }
}
