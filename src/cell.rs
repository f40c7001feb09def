use serde::{Deserialize, Serialize};
use std::fmt;

use crate::formula::Formula;
use crate::style::Style;

/// A literal cell value. Serialized untagged so the wire carries raw JSON
/// scalars, the way viewers consume them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// What a cell holds. A cell is either a literal (possibly empty) or a
/// computed formula; the two are mutually exclusive by construction.
#[derive(Clone, Debug, PartialEq)]
pub enum CellContent {
    Literal(Option<Value>),
    Computed(Formula),
}

/// One addressable grid unit: content, style, and a dirty flag driving the
/// live-sync diff cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    content: CellContent,
    pub style: Style,
    dirty: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            content: CellContent::Literal(None),
            style: Style::default(),
            dirty: false,
        }
    }
}

impl Cell {
    /// A freshly constructed cell carrying a value starts dirty: placing it
    /// in a grid is a change the next update cycle should broadcast.
    pub fn new(value: impl Into<Value>) -> Self {
        Cell {
            content: CellContent::Literal(Some(value.into())),
            style: Style::default(),
            dirty: true,
        }
    }

    pub fn with_style(value: impl Into<Value>, style: Style) -> Self {
        Cell {
            content: CellContent::Literal(Some(value.into())),
            style,
            dirty: true,
        }
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    /// The stored literal, if any. Computed cells have no stored literal;
    /// their effective value comes from [`crate::grid::Grid::value_at`],
    /// which evaluates the formula fresh on every read.
    pub fn literal_value(&self) -> Option<&Value> {
        match &self.content {
            CellContent::Literal(v) => v.as_ref(),
            CellContent::Computed(_) => None,
        }
    }

    pub fn formula(&self) -> Option<&Formula> {
        match &self.content {
            CellContent::Computed(f) => Some(f),
            CellContent::Literal(_) => None,
        }
    }

    /// Assigning a value clears any formula.
    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.content = CellContent::Literal(Some(value.into()));
        self.dirty = true;
    }

    pub fn clear_value(&mut self) {
        self.content = CellContent::Literal(None);
        self.dirty = true;
    }

    pub fn set_formula(&mut self, formula: Formula) {
        self.content = CellContent::Computed(formula);
        self.dirty = true;
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Literal(None))
    }

    /// Computed cells report dirty unconditionally: their effective value may
    /// depend on other mutable cells and there is no dependency tracking, so
    /// every update cycle re-captures them. Intentional non-caching behavior.
    pub fn is_dirty(&self) -> bool {
        matches!(self.content, CellContent::Computed(_)) || self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clears the flag for literal cells; computed cells keep reporting dirty.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
