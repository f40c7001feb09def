//! Workbook → HTML/CSS serializer.
//!
//! Styles are interned across sheets in two passes so the emitted stylesheet
//! contains exactly one rule per distinct style configuration, no matter how
//! many sheets reference it:
//!
//! 1. Discovery: every sheet assigns sheet-local ids to the style
//!    configurations it sees, in row-major first-seen order, and records
//!    which id each cell uses.
//! 2. Unification: sheets are processed in creation order; each local id is
//!    resolved against a running global registry, either to an existing
//!    global class or to a freshly promoted one with the next global id. No
//!    sheet-local CSS survives this pass, so re-serializing an unchanged
//!    workbook yields identical class names.

use std::collections::HashMap;

use crate::error::EvalError;
use crate::grid::Grid;
use crate::style::StyleKey;
use crate::workbook::Workbook;

/// Structural layout rules shared by every document: the scrollable table
/// containers, sticky header row and column, and cell padding.
const LAYOUT_CSS: &str = concat!(
    "body {margin: 0; display: flex; flex-direction: row; height: 100vh; }",
    ".TBCC {min-width: 0; display: flex; flex-direction: row; margin: 10px; }",
    ".TBC {overflow:auto;margin:10px;scrollbar-width:none;-ms-overflow-style:none;}",
    ".TBC::-webkit-scrollbar{display:none;}",
    "table {border-collapse:collapse;position:relative;overflow:clip;}",
    "thead th{position:sticky;top:0;background:#eee;z-index:5;border-right:1px solid #aaa;padding:4px 8px;}",
    "thead th::after{content:\"\";position:absolute;left:0;bottom:0;height:3px;width:103%;background:#aaa;z-index:-1;}",
    "thead th:first-child{left:0;z-index:10;background:#eee;position:sticky;top:0;left:0;}",
    "thead th:first-child::before{content:\"\";position:absolute;top:0;right:0;width:3px;height:100%;background:#aaa;z-index:1;}",
    "tbody th{position:sticky;left:0;z-index:4;background:#eee;min-width:40px;text-align:center;border-bottom:1px solid #aaa;padding:4px 8px;}",
    "tbody th::before{content:\"\";position:absolute;top:0;right:0;width:3px;height:100%;background:#aaa;z-index:1;}",
    "tbody td{white-space:nowrap;border-bottom:1px solid #ccc;padding:4px 8px;}",
);

/// Keeps the panes of a multi-sheet document scrolling in lockstep.
const SCROLL_SYNC_SCRIPT: &str = r#"<script>document.addEventListener("DOMContentLoaded",()=>{requestIdleCallback(()=>{let e=document.querySelectorAll(".TBC"),l=!1;e.forEach(r=>{r.addEventListener("scroll",()=>{if(l)return;l=!0;let o=r.scrollLeft,t=r.scrollTop;e.forEach(e=>{e!==r&&(e.scrollLeft=o,e.scrollTop=t)}),requestAnimationFrame(()=>{l=!1})})})})});</script>"#;

/// Serialize a workbook to a self-contained HTML document: one global
/// `<style>` block, one table per sheet, and the scroll-sync script.
/// Computed cells evaluate fresh during emission, so evaluation errors abort
/// the serialization.
pub fn serialize(workbook: &Workbook) -> Result<String, EvalError> {
    // pass 1: sheet-local style discovery
    let mut discoveries = Vec::with_capacity(workbook.sheets().len());
    for sheet in workbook.sheets() {
        discoveries.push(discover(&sheet.grid));
    }

    // pass 2: promote local styles into the global registry in sheet order
    let mut global_keys: Vec<StyleKey> = Vec::new();
    let mut global_ids: HashMap<StyleKey, usize> = HashMap::new();
    let mut class_maps: Vec<Vec<String>> = Vec::with_capacity(discoveries.len());
    for discovery in &discoveries {
        let mut map = Vec::with_capacity(discovery.local_keys.len());
        for key in &discovery.local_keys {
            let gid = match global_ids.get(key) {
                Some(gid) => *gid,
                None => {
                    global_keys.push(key.clone());
                    global_ids.insert(key.clone(), global_keys.len() - 1);
                    global_keys.len() - 1
                }
            };
            map.push(format!("S{}", gid + 1));
        }
        class_maps.push(map);
    }

    let mut out = String::from("<style>\n");
    out.push_str(LAYOUT_CSS);
    for (i, key) in global_keys.iter().enumerate() {
        out.push_str(&format!(".S{} {{{}}}\n", i + 1, style_rule(key)));
    }
    out.push_str("</style>\n");

    let mut tables = Vec::with_capacity(workbook.sheets().len());
    for (idx, sheet) in workbook.sheets().iter().enumerate() {
        tables.push(emit_table(
            &sheet.grid,
            idx + 1,
            &discoveries[idx].cell_styles,
            &class_maps[idx],
        )?);
    }
    out.push_str(&tables.join("\n"));
    out.push_str(SCROLL_SYNC_SCRIPT);
    Ok(out)
}

struct Discovery {
    /// Distinct style keys in first-seen (row-major) order.
    local_keys: Vec<StyleKey>,
    /// Local style id per cell, indexed `[x][y]`.
    cell_styles: Vec<Vec<usize>>,
}

fn discover(grid: &Grid) -> Discovery {
    let mut local_keys: Vec<StyleKey> = Vec::new();
    let mut local_ids: HashMap<StyleKey, usize> = HashMap::new();
    let mut cell_styles = vec![vec![0usize; grid.height()]; grid.width()];
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let key = grid.cell(x, y).style.key();
            let id = match local_ids.get(&key) {
                Some(id) => *id,
                None => {
                    local_keys.push(key.clone());
                    local_ids.insert(key, local_keys.len() - 1);
                    local_keys.len() - 1
                }
            };
            cell_styles[x][y] = id;
        }
    }
    Discovery {
        local_keys,
        cell_styles,
    }
}

fn style_rule(key: &StyleKey) -> String {
    format!(
        "background:{};color:{};border-left:{};border-right:{};border-top:{};border-bottom:{};font-family:{};font-size:{}px;font-style:{};",
        key.background,
        key.color,
        key.border_left,
        key.border_right,
        key.border_top,
        key.border_bottom,
        key.font_family,
        key.font_size,
        key.font_modifiers,
    )
}

fn emit_table(
    grid: &Grid,
    table_index: usize,
    cell_styles: &[Vec<usize>],
    class_map: &[String],
) -> Result<String, EvalError> {
    let mut rows = Vec::with_capacity(grid.height() + 1);

    let mut header = String::from("<th></th>");
    for x in 0..grid.width() {
        header.push_str(&format!("<th>{}</th>", Grid::col_letter(x + 1)));
    }
    rows.push(format!(
        "<thead>\n\t<tr>{}</tr>\n\t</thead>\n\t<tbody>",
        header
    ));

    for y in 0..grid.height() {
        let mut row = format!("<th>{}</th>", y + 1);
        for x in 0..grid.width() {
            let class = &class_map[cell_styles[x][y]];
            let text = match grid.value_at(x, y)? {
                Some(value) => escape_html(&value.to_string()),
                None => String::new(),
            };
            row.push_str(&format!(
                "<td class=\"{}\" x=\"{}\" y=\"{}\">{}</td>",
                class, x, y, text
            ));
        }
        rows.push(format!("<tr>{}</tr>", row));
    }

    Ok(format!(
        "<div class=\"TBCC\"><div class=\"TBC {}\"><table>\n{}\n\t</tbody>\n</table></div></div>",
        table_index,
        rows.join("\n")
    ))
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
