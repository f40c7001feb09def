use crate::cell::{Cell, CellContent, Value};
use crate::error::{EvalError, GridError};
use crate::proto::ReloadHandle;
use crate::range::{Range, SliceSpec};

/// A width × height rectangular array of cells, always fully populated and
/// column-major indexable (`cols[x][y]`). Width and height only ever grow;
/// [`Grid::compact`] is the single shrink path.
///
/// A grid may be bound to a sync server, in which case structural changes
/// (growth, compaction) broadcast a reload directive to connected viewers.
#[derive(Debug)]
pub struct Grid {
    cols: Vec<Vec<Cell>>,
    width: usize,
    height: usize,
    notifier: Option<ReloadHandle>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Grid {
            cols: vec![vec![Cell::default(); height]; width],
            width,
            height,
            notifier: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&Cell> {
        self.cols.get(x)?.get(y)
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut Cell> {
        self.cols.get_mut(x)?.get_mut(y)
    }

    pub(crate) fn cell(&self, x: usize, y: usize) -> &Cell {
        &self.cols[x][y]
    }

    pub(crate) fn cell_mut(&mut self, x: usize, y: usize) -> &mut Cell {
        &mut self.cols[x][y]
    }

    /// Place a cell, growing the grid to fit.
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        self.grow_to_include(x, y);
        self.cols[x][y] = cell;
    }

    /// A bulk accessor over `[x0,x1) × [y0,y1)`. Construction is a
    /// write-capable operation: the grid grows to include the far corner of
    /// the requested rectangle, which is why there is no shared-borrow
    /// variant of this call.
    pub fn ensure_range(
        &mut self,
        xs: impl Into<SliceSpec>,
        ys: impl Into<SliceSpec>,
    ) -> Result<Range<'_>, GridError> {
        Range::new(self, xs.into(), ys.into())
    }

    /// Expand columns/rows so the grid covers at least `x+1` × `y+1`, filling
    /// new slots with default cells. Growth is monotonic. Fires a reload
    /// notification only when the geometry actually changed.
    pub fn grow_to_include(&mut self, x: usize, y: usize) {
        let grew = x >= self.width || y >= self.height;
        if x >= self.width {
            for _ in self.width..=x {
                self.cols.push(vec![Cell::default(); self.height]);
            }
            self.width = x + 1;
        }
        if y >= self.height {
            for col in &mut self.cols {
                col.resize_with(y + 1, Cell::default);
            }
            self.height = y + 1;
        }
        if grew {
            self.notify();
        }
    }

    /// Shrink to the bounding box of non-empty cells; cells outside the box
    /// are discarded irreversibly. A computed cell always counts as
    /// non-empty. Empties the grid to 0×0 when nothing qualifies.
    pub fn compact(&mut self) {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (x, col) in self.cols.iter().enumerate() {
            for (y, cell) in col.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, x, y, y),
                    Some((min_x, max_x, min_y, max_y)) => {
                        (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y))
                    }
                });
            }
        }

        match bounds {
            None => {
                self.cols.clear();
                self.width = 0;
                self.height = 0;
            }
            Some((min_x, max_x, min_y, max_y)) => {
                let mut new_cols = Vec::with_capacity(max_x - min_x + 1);
                for col in self.cols.drain(..).skip(min_x).take(max_x - min_x + 1) {
                    let trimmed: Vec<Cell> = col
                        .into_iter()
                        .skip(min_y)
                        .take(max_y - min_y + 1)
                        .collect();
                    new_cols.push(trimmed);
                }
                self.cols = new_cols;
                self.width = max_x - min_x + 1;
                self.height = max_y - min_y + 1;
            }
        }
        self.notify();
    }

    /// Deep copy of every cell and style. The clone is detached: it carries
    /// no server binding.
    pub fn deep_clone(&self) -> Grid {
        Grid {
            cols: self.cols.clone(),
            width: self.width,
            height: self.height,
            notifier: None,
        }
    }

    /// Effective value at a coordinate. Literal cells answer directly;
    /// computed cells evaluate their formula tree fresh, so this is the read
    /// that surfaces evaluation errors.
    pub fn value_at(&self, x: usize, y: usize) -> Result<Option<Value>, EvalError> {
        match self.get(x, y) {
            None => Ok(None),
            Some(cell) => match cell.content() {
                CellContent::Literal(v) => Ok(v.clone()),
                CellContent::Computed(f) => Ok(Some(Value::Number(f.eval(self)?))),
            },
        }
    }

    /// Full-grid iteration, outer loop over x, inner over y.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Cell)> {
        self.cols
            .iter()
            .enumerate()
            .flat_map(|(x, col)| col.iter().enumerate().map(move |(y, cell)| (x, y, cell)))
    }

    pub(crate) fn bind(&mut self, handle: ReloadHandle) {
        self.notifier = Some(handle);
    }

    fn notify(&self) {
        if let Some(notifier) = &self.notifier {
            notifier.reload();
        }
    }

    /// Spreadsheet-style column letters: 1→A, 26→Z, 27→AA.
    pub fn col_letter(n: usize) -> String {
        let mut n = n;
        let mut letters = Vec::new();
        while n > 0 {
            n -= 1;
            letters.push(b'A' + (n % 26) as u8);
            n /= 26;
        }
        letters.reverse();
        String::from_utf8(letters).unwrap_or_default()
    }

    pub fn letter_col(letters: &str) -> usize {
        letters
            .chars()
            .fold(0, |acc, c| acc * 26 + (c as usize - 'A' as usize + 1))
    }
}
