use rusqlite::{Connection, OpenFlags};

/// Opens the database named by the `sqlite_file` environment variable,
/// creating it if needed, and switches it to WAL mode.
pub fn init_connection() -> Result<Connection, String> {
    let path = std::env::var("sqlite_file")
        .map_err(|_| "environment variable 'sqlite_file' not set".to_string())?;
    let conn = Connection::open_with_flags(
        &path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    );
    match conn {
        Ok(conn) => match conn.query_row("PRAGMA journal_mode=WAL;", [], |_row| Ok(())) {
            Ok(_) => Ok(conn),
            Err(e) => Err(format!("fail to execute PRAGMA journal_mode=WAL. {}", e)),
        },
        Err(e) => Err(format!("fail to open sqlite file {}. {}", path, e)),
    }
}

const KNOWN_TABLES: &[&str] = &[
    "daily_data",
    "index_daily",
    "index_weekly",
    "etf_daily",
    "ths_index",
    "ths_member",
    "stock_basic",
    "fina_indicator",
];

/// Row counts for every known table that exists in the database.
pub fn table_counts(conn: &Connection) -> rusqlite::Result<Vec<(String, i64)>> {
    let mut counts = Vec::new();
    for table in KNOWN_TABLES {
        let exists: i64 = conn.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        if exists == 0 {
            continue;
        }
        let rows: i64 =
            conn.query_row(&format!("SELECT count(*) FROM {}", table), [], |row| row.get(0))?;
        counts.push((table.to_string(), rows));
    }
    Ok(counts)
}
