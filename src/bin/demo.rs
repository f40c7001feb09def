//! Two-sheet live demo: fills a 100×100 block per sheet, compacts, serves
//! the workbook, and keeps ticking one cell so connected viewers see diffs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use livegrid::{ServerConfig, SyncServer, Workbook};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let book = Arc::new(Mutex::new(Workbook::new()));
    {
        let mut book = book.lock().unwrap();
        for i in 0..2 {
            let sheet = book.create_sheet(format!("{}", i));
            let mut values = Vec::with_capacity(100);
            for x in 0..100usize {
                let mut col = Vec::with_capacity(100);
                for y in 0..100usize {
                    col.push(format!("({}, {})", x * 10, y));
                }
                values.push(col);
            }
            sheet.grid.ensure_range(0..100, 0..100)?.set_values(values)?;
        }
        for sheet in book.sheets_mut() {
            sheet.grid.compact();
        }
    }

    let server = SyncServer::new(book.clone(), ServerConfig::default());
    server.start().await?;
    println!("open http://localhost:7000 in a browser");

    let mut tick: i64 = 0;
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        tick += 1;
        {
            let mut book = book.lock().unwrap();
            let sheet = book.sheet_at(0).expect("demo sheet exists");
            let mut range = sheet.grid.ensure_range(0, 0)?;
            range.set_value(format!("tick {}", tick))?;
            range.set_background(if tick % 2 == 0 { "#e0ffe0" } else { "#ffffff" })?;
        }
        server.update()?;
        if tick % 10 == 0 {
            server.set_client_scroll(0, tick * 4);
        }
    }
}
