//! End-to-end behavior of the grid → dirty flag → broadcast pipeline, plus
//! one real-socket pass over the snapshot channel.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use livegrid::{
    Cell, Formula, Grid, PushMessage, ServerConfig, SyncServer, Value, Workbook,
};

fn shared_book(width: usize, height: usize) -> Arc<Mutex<Workbook>> {
    let mut book = Workbook::new();
    book.create_sheet_with("main", Grid::new(width, height));
    Arc::new(Mutex::new(book))
}

#[tokio::test]
async fn one_edit_one_diff_then_silence() {
    let book = shared_book(10, 10);
    let server = SyncServer::new(book.clone(), ServerConfig::default());
    let mut viewer = server.subscribe();

    book.lock()
        .unwrap()
        .sheet("main")
        .unwrap()
        .grid
        .ensure_range(5, 5)
        .unwrap()
        .set_value("X")
        .unwrap();

    assert_eq!(server.update().unwrap(), 1);
    let msg = viewer.recv().await.unwrap();
    match msg {
        PushMessage::Update { cells } => {
            assert_eq!(cells.len(), 1);
            assert_eq!((cells[0].x, cells[0].y), (5, 5));
            assert_eq!(cells[0].value, Some(Value::Text("X".to_string())));
        }
        other => panic!("expected update, got {:?}", other),
    }

    assert_eq!(server.update().unwrap(), 0);
}

#[tokio::test]
async fn late_viewer_gets_a_snapshot_covering_unseen_edits() {
    let book = shared_book(4, 4);
    let server = SyncServer::new(book.clone(), ServerConfig::default());

    for (i, text) in ["alpha", "beta", "gamma"].iter().enumerate() {
        book.lock()
            .unwrap()
            .sheet("main")
            .unwrap()
            .grid
            .ensure_range(i, i)
            .unwrap()
            .set_value(*text)
            .unwrap();
        // only the first edit is ever broadcast; the others stay unflushed
        if i == 0 {
            server.update().unwrap();
        }
    }

    match server.snapshot().unwrap() {
        PushMessage::Full { html, scroll } => {
            assert!(html.contains(">alpha</td>"));
            assert!(html.contains(">beta</td>"));
            assert!(html.contains(">gamma</td>"));
            assert_eq!(scroll, (0, 0));
        }
        other => panic!("expected full, got {:?}", other),
    }
}

#[test]
fn range_growth_and_write_invariants() {
    let mut grid = Grid::new(0, 0);
    grid.ensure_range(7, 3).unwrap().set_value(42).unwrap();

    assert_eq!(grid.value_at(7, 3).unwrap(), Some(Value::Number(42.0)));
    assert!(grid.width() > 7);
    assert!(grid.height() > 3);
    assert!(grid.get(7, 3).unwrap().is_dirty());
}

#[test]
fn dirty_flags_settle_after_one_cycle_except_for_formulas() {
    let book = shared_book(3, 1);
    let server = SyncServer::new(book.clone(), ServerConfig::default());

    {
        let mut workbook = book.lock().unwrap();
        let grid = &mut workbook.sheet("main").unwrap().grid;
        grid.ensure_range(0, 0).unwrap().set_value(1).unwrap();
        grid.ensure_range(1, 0)
            .unwrap()
            .set_formula(Formula::add(livegrid::Operand::Cell(0, 0), 1.0))
            .unwrap();
    }

    assert_eq!(server.update().unwrap(), 2);
    let workbook = book.lock().unwrap();
    let grid = &workbook.sheets()[0].grid;
    assert!(!grid.get(0, 0).unwrap().is_dirty());
    assert!(grid.get(1, 0).unwrap().is_dirty(), "computed cells never settle");
}

#[test]
fn compaction_properties() {
    let mut grid = Grid::new(10, 10);
    for x in 2..=5 {
        for y in 3..=7 {
            grid.set(x, y, Cell::new((x * 10 + y) as i64));
        }
    }
    grid.compact();
    assert_eq!((grid.width(), grid.height()), (4, 5));
    assert_eq!(grid.value_at(0, 0).unwrap(), Some(Value::Number(23.0)));

    let mut empty = Grid::new(9, 9);
    empty.compact();
    assert_eq!((empty.width(), empty.height()), (0, 0));
}

#[test]
fn clone_round_trip_leaves_the_original_untouched() {
    let mut grid = Grid::new(2, 2);
    grid.ensure_range(.., ..).unwrap().set_value("base").unwrap();
    grid.ensure_range(.., ..)
        .unwrap()
        .set_background("#abcdef")
        .unwrap();

    let mut copy = grid.deep_clone();
    copy.ensure_range(.., ..).unwrap().set_value("mutated").unwrap();
    copy.ensure_range(.., ..)
        .unwrap()
        .set_background("#000000")
        .unwrap();

    assert_eq!(grid.value_at(1, 1).unwrap(), Some(Value::Text("base".to_string())));
    assert_eq!(grid.get(1, 1).unwrap().style.background, "#abcdef");
}

#[test]
fn shared_styles_unify_across_sheets() {
    let mut book = Workbook::new();
    for name in ["one", "two"] {
        let sheet = book.create_sheet(name);
        let mut range = sheet.grid.ensure_range(0..3, 0..3).unwrap();
        range.set_value(0).unwrap();
        range.set_background("#fafafa").unwrap();
    }
    let html = book.serialize().unwrap();

    // one shared global class for the styled cells, none sheet-scoped
    assert_eq!(html.matches("background:#fafafa;").count(), 1);
    assert!(!html.contains("SS1"));
    assert_eq!(html, book.serialize().unwrap());
}

#[tokio::test]
async fn snapshot_channel_serves_documents_over_real_sockets() {
    let book = shared_book(3, 3);
    book.lock()
        .unwrap()
        .sheet("main")
        .unwrap()
        .grid
        .ensure_range(1, 1)
        .unwrap()
        .set_value("live")
        .unwrap();

    let server = SyncServer::new(
        book.clone(),
        ServerConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 47113,
            include_file: None,
        },
    );
    server.start().await.unwrap();

    let body = http_get("127.0.0.1:47113", "/").await;
    assert!(body.contains("HTTP/1.1 200"));
    assert!(body.contains(">live</td>"));
    assert!(body.contains("new WebSocket"));
    assert!(body.contains(":47114`"));

    let missing = http_get("127.0.0.1:47113", "/other").await;
    assert!(missing.contains("HTTP/1.1 404"));

    server.stop();
    server.stop();
}

async fn http_get(addr: &str, path: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        path
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}
