use std::fmt;

use crate::cell::{Cell, Value};
use crate::error::GridError;
use crate::formula::Formula;
use crate::grid::Grid;

/// A start/stop/step selection over one axis. Missing bounds default to `0`,
/// the grid's current extent, and `1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SliceSpec {
    pub start: Option<usize>,
    pub stop: Option<usize>,
    pub step: Option<usize>,
}

impl SliceSpec {
    /// The full current extent.
    pub fn all() -> Self {
        SliceSpec::default()
    }

    /// A single index, as a one-wide slice.
    pub fn at(index: usize) -> Self {
        SliceSpec {
            start: Some(index),
            stop: Some(index + 1),
            step: None,
        }
    }

    pub fn span(start: usize, stop: usize) -> Self {
        SliceSpec {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    fn resolve(self, extent: usize) -> Result<(usize, usize, usize), GridError> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(GridError::InvalidAddressing(
                "slice step must be at least 1".to_string(),
            ));
        }
        let start = self.start.unwrap_or(0);
        let stop = self.stop.unwrap_or(extent);
        Ok((start, stop.max(start), step))
    }
}

impl From<usize> for SliceSpec {
    fn from(index: usize) -> Self {
        SliceSpec::at(index)
    }
}

impl From<std::ops::Range<usize>> for SliceSpec {
    fn from(r: std::ops::Range<usize>) -> Self {
        SliceSpec::span(r.start, r.end)
    }
}

impl From<std::ops::RangeFull> for SliceSpec {
    fn from(_: std::ops::RangeFull) -> Self {
        SliceSpec::all()
    }
}

impl From<std::ops::RangeFrom<usize>> for SliceSpec {
    fn from(r: std::ops::RangeFrom<usize>) -> Self {
        SliceSpec {
            start: Some(r.start),
            stop: None,
            step: None,
        }
    }
}

impl From<std::ops::RangeTo<usize>> for SliceSpec {
    fn from(r: std::ops::RangeTo<usize>) -> Self {
        SliceSpec {
            start: None,
            stop: Some(r.end),
            step: None,
        }
    }
}

/// One validated segment of a field path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Seg {
    Value,
    Formula,
    Style,
    Border,
    Font,
    Background,
    Color,
    Left,
    Right,
    Top,
    Bottom,
    Size,
    Family,
    Modifiers,
}

impl Seg {
    fn name(self) -> &'static str {
        match self {
            Seg::Value => "value",
            Seg::Formula => "formula",
            Seg::Style => "style",
            Seg::Border => "border",
            Seg::Font => "font",
            Seg::Background => "background",
            Seg::Color => "color",
            Seg::Left => "left",
            Seg::Right => "right",
            Seg::Top => "top",
            Seg::Bottom => "bottom",
            Seg::Size => "size",
            Seg::Family => "family",
            Seg::Modifiers => "modifiers",
        }
    }
}

/// The fixed addressing schema: which fields exist under each composite.
fn children(of: Option<Seg>) -> &'static [(&'static str, Seg)] {
    match of {
        None => &[
            ("value", Seg::Value),
            ("formula", Seg::Formula),
            ("style", Seg::Style),
        ],
        Some(Seg::Style) => &[
            ("border", Seg::Border),
            ("font", Seg::Font),
            ("background", Seg::Background),
            ("color", Seg::Color),
        ],
        Some(Seg::Border) => &[
            ("left", Seg::Left),
            ("right", Seg::Right),
            ("top", Seg::Top),
            ("bottom", Seg::Bottom),
        ],
        Some(Seg::Font) => &[
            ("size", Seg::Size),
            ("family", Seg::Family),
            ("modifiers", Seg::Modifiers),
        ],
        _ => &[],
    }
}

/// The leaf a fully resolved path writes to or reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Leaf {
    Value,
    Formula,
    Background,
    Color,
    BorderLeft,
    BorderRight,
    BorderTop,
    BorderBottom,
    FontSize,
    FontFamily,
    FontModifiers,
}

/// A chain of named field accessors over the cell's composite structure,
/// validated at each hop against the fixed schema
/// `cell → {value, formula, style}`, `style → {border, font, background,
/// color}`, `border → {left, right, top, bottom}`, `font → {size, family,
/// modifiers}`. Chaining supports arbitrary depth; unknown segments are
/// rejected with [`GridError::InvalidAddressing`].
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FieldPath {
    segs: Vec<Seg>,
}

impl FieldPath {
    /// The empty path, rooted at the cell itself.
    pub fn root() -> Self {
        FieldPath::default()
    }

    /// Parse a dotted path such as `"style.font.size"`.
    pub fn parse(path: &str) -> Result<Self, GridError> {
        let mut out = FieldPath::root();
        for segment in path.split('.') {
            out = out.join(segment)?;
        }
        Ok(out)
    }

    /// Build from pre-split segments.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Result<Self, GridError> {
        let mut out = FieldPath::root();
        for segment in segments {
            out = out.join(segment.as_ref())?;
        }
        Ok(out)
    }

    /// Extend by one named segment, validated against the schema.
    pub fn join(&self, name: &str) -> Result<Self, GridError> {
        let context = self.segs.last().copied();
        for (candidate, seg) in children(context) {
            if *candidate == name {
                let mut segs = self.segs.clone();
                segs.push(*seg);
                return Ok(FieldPath { segs });
            }
        }
        Err(GridError::InvalidAddressing(format!(
            "unknown field `{}` under `{}`",
            name, self
        )))
    }

    /// Whether the path ends at a settable leaf (as opposed to a composite
    /// that supports further chaining).
    pub fn is_leaf(&self) -> bool {
        self.leaf().is_some()
    }

    fn leaf(&self) -> Option<Leaf> {
        match self.segs.as_slice() {
            [Seg::Value] => Some(Leaf::Value),
            [Seg::Formula] => Some(Leaf::Formula),
            [Seg::Style, Seg::Background] => Some(Leaf::Background),
            [Seg::Style, Seg::Color] => Some(Leaf::Color),
            [Seg::Style, Seg::Border, Seg::Left] => Some(Leaf::BorderLeft),
            [Seg::Style, Seg::Border, Seg::Right] => Some(Leaf::BorderRight),
            [Seg::Style, Seg::Border, Seg::Top] => Some(Leaf::BorderTop),
            [Seg::Style, Seg::Border, Seg::Bottom] => Some(Leaf::BorderBottom),
            [Seg::Style, Seg::Font, Seg::Size] => Some(Leaf::FontSize),
            [Seg::Style, Seg::Font, Seg::Family] => Some(Leaf::FontFamily),
            [Seg::Style, Seg::Font, Seg::Modifiers] => Some(Leaf::FontModifiers),
            _ => None,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segs.is_empty() {
            return f.write_str("cell");
        }
        let names: Vec<&str> = self.segs.iter().map(|s| s.name()).collect();
        f.write_str(&names.join("."))
    }
}

/// A value read from or written to a leaf field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// A cell value (or `None` to clear the cell).
    Value(Option<Value>),
    /// A formula; write-only through ranges.
    Formula(Formula),
    Text(String),
    Number(f64),
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Value(Some(v))
    }
}

impl From<Formula> for FieldValue {
    fn from(f: Formula) -> Self {
        FieldValue::Formula(f)
    }
}

impl Leaf {
    fn accepts(self, value: &FieldValue) -> bool {
        match self {
            Leaf::Value => !matches!(value, FieldValue::Formula(_)),
            Leaf::Formula => matches!(value, FieldValue::Formula(_)),
            Leaf::FontSize => matches!(value, FieldValue::Number(_)),
            Leaf::Background
            | Leaf::Color
            | Leaf::BorderLeft
            | Leaf::BorderRight
            | Leaf::BorderTop
            | Leaf::BorderBottom
            | Leaf::FontFamily
            | Leaf::FontModifiers => matches!(value, FieldValue::Text(_)),
        }
    }

    /// Write a validated value. Assigning `value` replaces any formula;
    /// assigning `formula` replaces any value.
    fn write(self, cell: &mut Cell, value: &FieldValue) {
        match (self, value) {
            (Leaf::Value, FieldValue::Value(Some(v))) => cell.set_value(v.clone()),
            (Leaf::Value, FieldValue::Value(None)) => cell.clear_value(),
            (Leaf::Value, FieldValue::Text(s)) => cell.set_value(s.clone()),
            (Leaf::Value, FieldValue::Number(n)) => cell.set_value(*n),
            (Leaf::Formula, FieldValue::Formula(f)) => cell.set_formula(f.clone()),
            (Leaf::Background, FieldValue::Text(s)) => cell.style.background = s.clone(),
            (Leaf::Color, FieldValue::Text(s)) => cell.style.color = s.clone(),
            (Leaf::BorderLeft, FieldValue::Text(s)) => cell.style.border.left = s.clone(),
            (Leaf::BorderRight, FieldValue::Text(s)) => cell.style.border.right = s.clone(),
            (Leaf::BorderTop, FieldValue::Text(s)) => cell.style.border.top = s.clone(),
            (Leaf::BorderBottom, FieldValue::Text(s)) => cell.style.border.bottom = s.clone(),
            (Leaf::FontSize, FieldValue::Number(n)) => cell.style.font.size = *n,
            (Leaf::FontFamily, FieldValue::Text(s)) => cell.style.font.family = s.clone(),
            (Leaf::FontModifiers, FieldValue::Text(s)) => cell.style.font.modifiers = s.clone(),
            _ => {}
        }
    }

    fn read(self, grid: &Grid, x: usize, y: usize) -> Result<FieldValue, GridError> {
        let cell = grid.cell(x, y);
        Ok(match self {
            Leaf::Value => FieldValue::Value(grid.value_at(x, y)?),
            Leaf::Formula => {
                return Err(GridError::InvalidAddressing(
                    "formula is write-only through ranges".to_string(),
                ))
            }
            Leaf::Background => FieldValue::Text(cell.style.background.clone()),
            Leaf::Color => FieldValue::Text(cell.style.color.clone()),
            Leaf::BorderLeft => FieldValue::Text(cell.style.border.left.clone()),
            Leaf::BorderRight => FieldValue::Text(cell.style.border.right.clone()),
            Leaf::BorderTop => FieldValue::Text(cell.style.border.top.clone()),
            Leaf::BorderBottom => FieldValue::Text(cell.style.border.bottom.clone()),
            Leaf::FontSize => FieldValue::Number(cell.style.font.size),
            Leaf::FontFamily => FieldValue::Text(cell.style.font.family.clone()),
            Leaf::FontModifiers => FieldValue::Text(cell.style.font.modifiers.clone()),
        })
    }
}

/// A bulk assignment: one scalar applied to every cell, or a column-major
/// `[x][y]` matrix matching the range extents.
#[derive(Clone, Debug)]
pub enum Assign {
    Scalar(FieldValue),
    Matrix(Vec<Vec<FieldValue>>),
}

impl Assign {
    /// Build a matrix assignment from any convertible element type.
    pub fn matrix<V: Into<FieldValue>>(values: Vec<Vec<V>>) -> Self {
        Assign::Matrix(
            values
                .into_iter()
                .map(|col| col.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

impl From<FieldValue> for Assign {
    fn from(v: FieldValue) -> Self {
        Assign::Scalar(v)
    }
}

impl From<&str> for Assign {
    fn from(s: &str) -> Self {
        Assign::Scalar(s.into())
    }
}

impl From<String> for Assign {
    fn from(s: String) -> Self {
        Assign::Scalar(s.into())
    }
}

impl From<f64> for Assign {
    fn from(n: f64) -> Self {
        Assign::Scalar(n.into())
    }
}

impl From<Value> for Assign {
    fn from(v: Value) -> Self {
        Assign::Scalar(v.into())
    }
}

impl From<Formula> for Assign {
    fn from(f: Formula) -> Self {
        Assign::Scalar(f.into())
    }
}

impl From<Vec<Vec<FieldValue>>> for Assign {
    fn from(m: Vec<Vec<FieldValue>>) -> Self {
        Assign::Matrix(m)
    }
}

/// A non-owning window over a rectangular sub-region of one grid.
///
/// Constructing a range is write-capable: the grid has already grown to
/// include the far corner by the time `Range` exists (see
/// [`Grid::ensure_range`]). Every bulk write marks the touched cells dirty;
/// dirty flags are the sole signal driving live-sync diffs.
pub struct Range<'g> {
    grid: &'g mut Grid,
    x: (usize, usize, usize),
    y: (usize, usize, usize),
}

impl<'g> Range<'g> {
    pub(crate) fn new(
        grid: &'g mut Grid,
        xs: SliceSpec,
        ys: SliceSpec,
    ) -> Result<Self, GridError> {
        let x = xs.resolve(grid.width())?;
        let y = ys.resolve(grid.height())?;
        if x.1 > 0 && y.1 > 0 {
            grid.grow_to_include(x.1 - 1, y.1 - 1);
        }
        Ok(Range { grid, x, y })
    }

    fn x_indices(&self) -> Vec<usize> {
        (self.x.0..self.x.1).step_by(self.x.2).collect()
    }

    fn y_indices(&self) -> Vec<usize> {
        (self.y.0..self.y.1).step_by(self.y.2).collect()
    }

    /// Number of selected columns.
    pub fn width(&self) -> usize {
        self.x_indices().len()
    }

    /// Number of selected rows.
    pub fn height(&self) -> usize {
        self.y_indices().len()
    }

    pub fn grid(&self) -> &Grid {
        self.grid
    }

    /// `(x, y, cell)` triples, outer loop over x, inner over y, matching
    /// column-major storage.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Cell)> + '_ {
        let ys = self.y_indices();
        let grid: &Grid = self.grid;
        self.x_indices().into_iter().flat_map(move |x| {
            ys.clone()
                .into_iter()
                .map(move |y| (x, y, grid.cell(x, y)))
        })
    }

    /// Selected coordinates in iteration order.
    pub fn coords(&self) -> Vec<(usize, usize)> {
        let ys = self.y_indices();
        self.x_indices()
            .into_iter()
            .flat_map(|x| ys.iter().map(move |&y| (x, y)))
            .collect()
    }

    /// Bulk attribute read of a leaf path: one value per cell, column-major.
    /// Composite paths (e.g. `style`) do not read as a matrix; chain further
    /// through [`Range::accessor`].
    pub fn get(&self, path: &FieldPath) -> Result<Vec<Vec<FieldValue>>, GridError> {
        let leaf = path.leaf().ok_or_else(|| {
            GridError::InvalidAddressing(format!(
                "`{}` is a composite field; chain to one of its sub-fields",
                path
            ))
        })?;
        let ys = self.y_indices();
        let mut out = Vec::with_capacity(self.width());
        for x in self.x_indices() {
            let mut col = Vec::with_capacity(ys.len());
            for &y in &ys {
                col.push(leaf.read(self.grid, x, y)?);
            }
            out.push(col);
        }
        Ok(out)
    }

    /// Bulk attribute write through a (possibly chained) leaf path.
    ///
    /// A scalar assignment sets the same leaf value on every cell; a matrix
    /// assignment must match the range extents exactly (`[x][y]`) or the
    /// write fails with [`GridError::ShapeMismatch`] before touching any
    /// cell. All but the last path segment are resolved per cell, so each
    /// cell's own style instance is the one mutated. Every touched cell is
    /// marked dirty.
    pub fn set(&mut self, path: &FieldPath, assign: impl Into<Assign>) -> Result<(), GridError> {
        let leaf = path.leaf().ok_or_else(|| {
            GridError::InvalidAddressing(format!("`{}` is not a settable leaf field", path))
        })?;
        let xs = self.x_indices();
        let ys = self.y_indices();
        match assign.into() {
            Assign::Scalar(value) => {
                if !leaf.accepts(&value) {
                    return Err(type_mismatch(path, &value));
                }
                for &x in &xs {
                    for &y in &ys {
                        let cell = self.grid.cell_mut(x, y);
                        leaf.write(cell, &value);
                        cell.mark_dirty();
                    }
                }
            }
            Assign::Matrix(matrix) => {
                self.check_shape(&matrix, &xs, &ys)?;
                // validate every element before the first write so a bad
                // assignment cannot leave the grid half-updated
                for col in &matrix {
                    for value in col {
                        if !leaf.accepts(value) {
                            return Err(type_mismatch(path, value));
                        }
                    }
                }
                for (dx, &x) in xs.iter().enumerate() {
                    for (dy, &y) in ys.iter().enumerate() {
                        let cell = self.grid.cell_mut(x, y);
                        leaf.write(cell, &matrix[dx][dy]);
                        cell.mark_dirty();
                    }
                }
            }
        }
        Ok(())
    }

    fn check_shape(
        &self,
        matrix: &[Vec<FieldValue>],
        xs: &[usize],
        ys: &[usize],
    ) -> Result<(), GridError> {
        let mismatch = matrix.len() != xs.len()
            || matrix.iter().any(|col| col.len() != ys.len());
        if mismatch {
            return Err(GridError::ShapeMismatch {
                expected_x: xs.len(),
                expected_y: ys.len(),
                got_x: matrix.len(),
                got_y: matrix.first().map_or(0, |col| col.len()),
            });
        }
        Ok(())
    }

    /// A chained accessor rooted at the cell; extend with
    /// [`Accessor::field`] to any depth the schema allows.
    pub fn accessor(&mut self) -> Accessor<'_, 'g> {
        Accessor {
            range: self,
            path: FieldPath::root(),
        }
    }

    /// Edge cells of the range, corners excluded.
    pub fn border(&mut self) -> EdgeView<'_, 'g> {
        EdgeView {
            range: self,
            include_corners: false,
        }
    }

    /// Edge cells of the range, corners included.
    pub fn border_range(&mut self) -> EdgeView<'_, 'g> {
        EdgeView {
            range: self,
            include_corners: true,
        }
    }

    // -- convenience wrappers over the common paths --

    pub fn values(&self) -> Result<Vec<Vec<Option<Value>>>, GridError> {
        let matrix = self.get(&FieldPath::parse("value")?)?;
        Ok(matrix
            .into_iter()
            .map(|col| {
                col.into_iter()
                    .map(|v| match v {
                        FieldValue::Value(v) => v,
                        _ => None,
                    })
                    .collect()
            })
            .collect())
    }

    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<(), GridError> {
        self.set(&FieldPath::parse("value")?, value.into())
    }

    pub fn set_values<V: Into<Value>>(&mut self, values: Vec<Vec<V>>) -> Result<(), GridError> {
        let matrix: Vec<Vec<FieldValue>> = values
            .into_iter()
            .map(|col| {
                col.into_iter()
                    .map(|v| FieldValue::Value(Some(v.into())))
                    .collect()
            })
            .collect();
        self.set(&FieldPath::parse("value")?, matrix)
    }

    pub fn set_formula(&mut self, formula: Formula) -> Result<(), GridError> {
        self.set(&FieldPath::parse("formula")?, formula)
    }

    pub fn set_background(&mut self, background: &str) -> Result<(), GridError> {
        self.set(&FieldPath::parse("style.background")?, background)
    }

    pub fn set_color(&mut self, color: &str) -> Result<(), GridError> {
        self.set(&FieldPath::parse("style.color")?, color)
    }
}

fn type_mismatch(path: &FieldPath, value: &FieldValue) -> GridError {
    GridError::InvalidAddressing(format!(
        "value {:?} cannot be assigned to `{}`",
        value, path
    ))
}

/// A field path being built up against a range, one validated hop at a time.
pub struct Accessor<'r, 'g> {
    range: &'r mut Range<'g>,
    path: FieldPath,
}

impl<'r, 'g> Accessor<'r, 'g> {
    pub fn field(self, name: &str) -> Result<Self, GridError> {
        Ok(Accessor {
            range: self.range,
            path: self.path.join(name)?,
        })
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn get(&self) -> Result<Vec<Vec<FieldValue>>, GridError> {
        self.range.get(&self.path)
    }

    pub fn set(&mut self, assign: impl Into<Assign>) -> Result<(), GridError> {
        self.range.set(&self.path, assign)
    }
}

/// The outer rim of a range, for edge-only styling. Cells sitting on a
/// first/last selected column or row qualify; the four corner cells are
/// included only for [`Range::border_range`].
pub struct EdgeView<'r, 'g> {
    range: &'r mut Range<'g>,
    include_corners: bool,
}

impl<'r, 'g> EdgeView<'r, 'g> {
    pub fn coords(&self) -> Vec<(usize, usize)> {
        let xs = self.range.x_indices();
        let ys = self.range.y_indices();
        if xs.is_empty() || ys.is_empty() {
            return Vec::new();
        }
        let (first_x, last_x) = (xs[0], xs[xs.len() - 1]);
        let (first_y, last_y) = (ys[0], ys[ys.len() - 1]);
        let mut out = Vec::new();
        for &x in &xs {
            for &y in &ys {
                let on_x_edge = x == first_x || x == last_x;
                let on_y_edge = y == first_y || y == last_y;
                if !(on_x_edge || on_y_edge) {
                    continue;
                }
                if !self.include_corners && on_x_edge && on_y_edge {
                    continue;
                }
                out.push((x, y));
            }
        }
        out
    }

    /// Scalar bulk write over the rim. Matrix assignment is rejected: the
    /// rim is not rectangular.
    pub fn set(&mut self, path: &FieldPath, assign: impl Into<Assign>) -> Result<(), GridError> {
        let leaf = path.leaf().ok_or_else(|| {
            GridError::InvalidAddressing(format!("`{}` is not a settable leaf field", path))
        })?;
        let value = match assign.into() {
            Assign::Scalar(v) => v,
            Assign::Matrix(_) => {
                return Err(GridError::InvalidAddressing(
                    "edge views only accept scalar assignment".to_string(),
                ))
            }
        };
        if !leaf.accepts(&value) {
            return Err(type_mismatch(path, &value));
        }
        for (x, y) in self.coords() {
            let cell = self.range.grid.cell_mut(x, y);
            leaf.write(cell, &value);
            cell.mark_dirty();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;

    #[test]
    fn construction_grows_to_the_far_corner() {
        let mut grid = Grid::new(2, 2);
        grid.ensure_range(0..6, 0..4).unwrap();
        assert_eq!(grid.width(), 6);
        assert_eq!(grid.height(), 4);
    }

    #[test]
    fn default_bounds_cover_the_current_extent() {
        let mut grid = Grid::new(3, 5);
        let range = grid.ensure_range(.., ..).unwrap();
        assert_eq!(range.width(), 3);
        assert_eq!(range.height(), 5);
        // a full-extent range must not grow the grid
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 5);
    }

    #[test]
    fn zero_step_is_invalid_addressing() {
        let mut grid = Grid::new(2, 2);
        let err = grid
            .ensure_range(SliceSpec::all().with_step(0), SliceSpec::all())
            .err();
        assert!(matches!(err, Some(GridError::InvalidAddressing(_))));
    }

    #[test]
    fn scalar_write_reaches_every_cell_and_marks_dirty() {
        let mut grid = Grid::new(3, 3);
        grid.ensure_range(0..2, 0..2).unwrap().set_value(7).unwrap();
        for x in 0..2 {
            for y in 0..2 {
                assert_eq!(grid.value_at(x, y).unwrap(), Some(Value::Number(7.0)));
                assert!(grid.cell(x, y).is_dirty());
            }
        }
        assert_eq!(grid.value_at(2, 2).unwrap(), None);
        assert!(!grid.cell(2, 2).is_dirty());
    }

    #[test]
    fn matrix_write_is_column_major() {
        let mut grid = Grid::new(0, 0);
        grid.ensure_range(0..2, 0..3)
            .unwrap()
            .set_values(vec![vec![1, 2, 3], vec![4, 5, 6]])
            .unwrap();
        assert_eq!(grid.value_at(0, 2).unwrap(), Some(Value::Number(3.0)));
        assert_eq!(grid.value_at(1, 0).unwrap(), Some(Value::Number(4.0)));
    }

    #[test]
    fn shape_mismatch_leaves_the_grid_untouched() {
        let mut grid = Grid::new(2, 2);
        let err = grid
            .ensure_range(0..2, 0..2)
            .unwrap()
            .set_values(vec![vec![1, 2, 3], vec![4, 5, 6]])
            .err();
        assert!(matches!(err, Some(GridError::ShapeMismatch { .. })));
        assert!(grid.iter().all(|(_, _, c)| c.is_empty() && !c.is_dirty()));
    }

    #[test]
    fn nested_path_write_sets_each_cells_own_style() {
        let mut grid = Grid::new(2, 2);
        let path = FieldPath::parse("style.font.size").unwrap();
        grid.ensure_range(0..2, 0..1)
            .unwrap()
            .set(&path, 22.0)
            .unwrap();
        assert_eq!(grid.cell(0, 0).style.font.size, 22.0);
        assert_eq!(grid.cell(1, 0).style.font.size, 22.0);
        assert_eq!(grid.cell(0, 1).style.font.size, 14.0);
        assert!(grid.cell(0, 0).is_dirty());
        // the untouched row keeps the shared baseline
        assert!(!grid.cell(0, 1).is_dirty());
    }

    #[test]
    fn chained_accessor_resolves_to_arbitrary_depth() {
        let mut grid = Grid::new(1, 1);
        let mut range = grid.ensure_range(.., ..).unwrap();
        range
            .accessor()
            .field("style")
            .unwrap()
            .field("border")
            .unwrap()
            .field("top")
            .unwrap()
            .set("3px double #00f")
            .unwrap();
        assert_eq!(grid.cell(0, 0).style.border.top, "3px double #00f");
    }

    #[test]
    fn unknown_segment_is_rejected_at_the_hop() {
        let mut grid = Grid::new(1, 1);
        let mut range = grid.ensure_range(.., ..).unwrap();
        let err = range.accessor().field("style").unwrap().field("shadow").err();
        assert!(matches!(err, Some(GridError::InvalidAddressing(_))));
        assert!(FieldPath::parse("style.font.weight").is_err());
        assert!(FieldPath::parse("border.left").is_err());
        assert!(FieldPath::from_segments(&["style", "border", "left"]).is_ok());
        assert!(FieldPath::from_segments(&["style", "opacity"]).is_err());
    }

    #[test]
    fn composite_read_requires_chaining() {
        let mut grid = Grid::new(1, 1);
        let range = grid.ensure_range(.., ..).unwrap();
        let err = range.get(&FieldPath::parse("style").unwrap()).err();
        assert!(matches!(err, Some(GridError::InvalidAddressing(_))));
    }

    #[test]
    fn leaf_reads_return_a_column_major_matrix() {
        let mut grid = Grid::new(2, 2);
        grid.set(1, 0, Cell::new("hi"));
        let range = grid.ensure_range(.., ..).unwrap();
        let values = range.values().unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1][0], Some(Value::Text("hi".to_string())));
        assert_eq!(values[0][0], None);

        let sizes = range.get(&FieldPath::parse("style.font.size").unwrap()).unwrap();
        assert_eq!(sizes[0][0], FieldValue::Number(14.0));
    }

    #[test]
    fn value_read_evaluates_formulas_fresh() {
        let mut grid = Grid::new(2, 1);
        grid.set(0, 0, Cell::new(5));
        let mut computed = Cell::default();
        computed.set_formula(Formula::mult(
            crate::formula::Operand::Cell(0, 0),
            crate::formula::Operand::Const(3.0),
        ));
        grid.set(1, 0, computed);

        let first = grid.ensure_range(.., ..).unwrap().values().unwrap();
        assert_eq!(first[1][0], Some(Value::Number(15.0)));

        grid.cell_mut(0, 0).set_value(10);
        let second = grid.ensure_range(.., ..).unwrap().values().unwrap();
        assert_eq!(second[1][0], Some(Value::Number(30.0)));
    }

    #[test]
    fn eval_errors_surface_through_bulk_reads() {
        let mut grid = Grid::new(1, 1);
        let mut cell = Cell::default();
        cell.set_formula(Formula::div(1.0, 0.0));
        grid.set(0, 0, cell);
        let range = grid.ensure_range(.., ..).unwrap();
        assert!(matches!(
            range.values(),
            Err(GridError::Eval(EvalError::DivideByZero))
        ));
    }

    #[test]
    fn type_mismatch_is_invalid_addressing() {
        let mut grid = Grid::new(1, 1);
        let mut range = grid.ensure_range(.., ..).unwrap();
        let err = range.set(&FieldPath::parse("style.font.size").unwrap(), "large");
        assert!(matches!(err, Err(GridError::InvalidAddressing(_))));
    }

    #[test]
    fn iteration_is_outer_x_inner_y() {
        let mut grid = Grid::new(2, 2);
        let range = grid.ensure_range(.., ..).unwrap();
        let order: Vec<(usize, usize)> = range.iter().map(|(x, y, _)| (x, y)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn stepped_slices_select_every_other_column() {
        let mut grid = Grid::new(5, 1);
        let range = grid
            .ensure_range(SliceSpec::all().with_step(2), SliceSpec::all())
            .unwrap();
        let xs: Vec<usize> = range.iter().map(|(x, _, _)| x).collect();
        assert_eq!(xs, vec![0, 2, 4]);
    }

    #[test]
    fn border_excludes_corners_border_range_includes_them() {
        let mut grid = Grid::new(4, 3);
        let mut range = grid.ensure_range(.., ..).unwrap();

        let rim = range.border().coords();
        assert!(!rim.contains(&(0, 0)));
        assert!(!rim.contains(&(3, 2)));
        assert!(rim.contains(&(1, 0)));
        assert!(rim.contains(&(0, 1)));
        assert!(!rim.contains(&(1, 1)));
        assert_eq!(rim.len(), 2 * 2 + 2 * 1);

        let full_rim = range.border_range().coords();
        assert!(full_rim.contains(&(0, 0)));
        assert!(full_rim.contains(&(3, 2)));
        assert_eq!(full_rim.len(), 4 * 3 - 2 * 1);
    }

    #[test]
    fn edge_write_styles_only_the_rim() {
        let mut grid = Grid::new(3, 3);
        let mut range = grid.ensure_range(.., ..).unwrap();
        range
            .border_range()
            .set(&FieldPath::parse("style.background").unwrap(), "#eee")
            .unwrap();
        assert_eq!(grid.cell(0, 0).style.background, "#eee");
        assert_eq!(grid.cell(2, 2).style.background, "#eee");
        assert_eq!(grid.cell(1, 1).style.background, "#ffffff");
        assert!(!grid.cell(1, 1).is_dirty());
    }
}
