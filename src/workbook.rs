use crate::error::EvalError;
use crate::grid::Grid;
use crate::proto::ReloadHandle;
use crate::render;

/// A named grid.
#[derive(Debug)]
pub struct Sheet {
    pub name: String,
    pub grid: Grid,
}

/// An ordered collection of sheets, optionally observed by a sync server.
///
/// Attaching a server binds every grid (and every grid created afterwards)
/// to the server's reload notifier, so structural changes reach connected
/// viewers without the workbook knowing anything about transport.
#[derive(Debug, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    notifier: Option<ReloadHandle>,
}

impl Workbook {
    pub fn new() -> Self {
        Workbook::default()
    }

    /// Create an empty sheet (a 0×0 grid that grows on first access).
    pub fn create_sheet(&mut self, name: impl Into<String>) -> &mut Sheet {
        self.create_sheet_with(name, Grid::new(0, 0))
    }

    /// Create a sheet around an existing grid.
    pub fn create_sheet_with(&mut self, name: impl Into<String>, mut grid: Grid) -> &mut Sheet {
        if let Some(notifier) = &self.notifier {
            grid.bind(notifier.clone());
            notifier.reload();
        }
        self.sheets.push(Sheet {
            name: name.into(),
            grid,
        });
        // the sheet was just pushed
        self.sheets.last_mut().unwrap()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheets_mut(&mut self) -> &mut [Sheet] {
        &mut self.sheets
    }

    pub fn sheet(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    pub fn sheet_at(&mut self, index: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(index)
    }

    /// Serialize to a self-contained HTML document with one deduplicated
    /// stylesheet shared across all sheets.
    pub fn serialize(&self) -> Result<String, EvalError> {
        render::serialize(self)
    }

    /// Bind every grid to a server's reload notifier. Sheets created after
    /// this call are bound on creation.
    pub fn attach(&mut self, notifier: ReloadHandle) {
        for sheet in &mut self.sheets {
            sheet.grid.bind(notifier.clone());
        }
        self.notifier = Some(notifier);
    }
}
