/*!
# livegrid

An in-memory tabular grid of styled, optionally formula-driven cells,
rendered to HTML/CSS and kept synchronized across any number of browser
viewers through a push protocol.

## Overview

A [`Workbook`] holds named sheets, each wrapping a [`Grid`] of [`Cell`]s.
Cells carry a value or a lazily evaluated [`Formula`], a [`Style`], and a
dirty flag. Callers address rectangular blocks through [`Range`] accessors
that support bulk reads and writes of (possibly nested) attribute paths;
every write marks the touched cells dirty, which is the sole signal driving
live-sync diffs.

## Architecture

The system splits into three tightly coupled pieces:

- **Grid / Range data model**: coordinate-addressed bulk read/write with
  growth-on-access semantics: addressing past the current extent grows the
  grid, and the only shrink path is explicit compaction to the bounding box
  of non-empty cells.
- **Serializer**: converts a workbook into one HTML document with a
  cross-sheet deduplicated stylesheet: identical style configurations share
  a single global CSS class regardless of how many sheets use them.
- **SyncServer**: exposes the workbook over two channels, a
  request/response channel serving freshly serialized full snapshots, and a
  WebSocket push channel broadcasting incremental cell diffs, scroll
  alignment, and reload directives to all connected viewers. A viewer
  joining mid-session receives a full snapshot, so missed diffs never
  matter.

## Modules

- **style**: cell visual attributes (border, font, background, color)
- **cell**: the cell unit, its content variants and dirty tracking
- **formula**: binary-operation expression trees with cycle detection
- **grid**: growable column-major cell storage, compaction, cloning
- **range**: rectangular views, slice specs, field paths, edge views
- **workbook**: named sheet collections
- **render**: the HTML/CSS serializer with two-pass style interning
- **proto**: push-channel wire messages
- **server**: the live-sync server
- **error**: addressing, evaluation, and server error types

## Usage

```no_run
use std::sync::{Arc, Mutex};
use livegrid::{ServerConfig, SyncServer, Workbook};

# async fn run() -> Result<(), Box<dyn std::error::Error>> {
let book = Arc::new(Mutex::new(Workbook::new()));
book.lock().unwrap().create_sheet("main");

let server = SyncServer::new(book.clone(), ServerConfig::default());
server.start().await?;

// mutate through ranges, then push one diff batch to every viewer
book.lock()
    .unwrap()
    .sheet("main")
    .unwrap()
    .grid
    .ensure_range(0..10, 0..10)?
    .set_value("hello")?;
server.update()?;
# Ok(())
# }
```
*/

pub mod cell;
pub mod error;
pub mod formula;
pub mod grid;
pub mod proto;
pub mod range;
pub mod render;
pub mod server;
pub mod style;
pub mod workbook;

/// Re-export the primary surface so callers rarely need module paths
pub use cell::{Cell, CellContent, Value};
pub use error::{EvalError, GridError, ServerError};
pub use formula::{Formula, Op, Operand};
pub use grid::Grid;
pub use proto::{CellPatch, PatchStyle, PushMessage, ReloadHandle};
pub use range::{Accessor, Assign, EdgeView, FieldPath, FieldValue, Range, SliceSpec};
pub use server::{ServerConfig, SyncServer};
pub use style::{Border, Font, Style, StyleKey};
pub use workbook::{Sheet, Workbook};
