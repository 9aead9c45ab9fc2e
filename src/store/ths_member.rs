use rusqlite::{Connection, Result, params};

use crate::model::ThsMember;

/// Initializes the concept-member table, keyed on (index code, member code).
pub fn create_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ths_member (
            ts_code TEXT NOT NULL,
            con_code TEXT NOT NULL,
            con_name TEXT,
            weight REAL,
            in_date TEXT,
            out_date TEXT,
            is_new TEXT
        );",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_ths_member_index_stock
         ON ths_member (ts_code, con_code);",
        [],
    )?;
    Ok(())
}

pub fn upsert(conn: &mut Connection, members: &[ThsMember]) -> Result<usize> {
    let transaction = conn.transaction()?;
    {
        let mut stmt = transaction.prepare(
            "REPLACE INTO ths_member (ts_code, con_code, con_name, weight, in_date, out_date, is_new)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for member in members {
            stmt.execute(params![
                member.ts_code,
                member.con_code,
                member.con_name,
                member.weight,
                member.in_date,
                member.out_date,
                member.is_new,
            ])?;
        }
    }
    transaction.commit()?;
    Ok(members.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(ts_code: &str, con_code: &str) -> ThsMember {
        ThsMember {
            ts_code: ts_code.into(),
            con_code: con_code.into(),
            con_name: Some("平安银行".into()),
            weight: None,
            in_date: None,
            out_date: None,
            is_new: Some("Y".into()),
        }
    }

    #[test]
    fn same_stock_under_two_indexes_is_two_rows() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();

        upsert(&mut conn, &[member("885001.TI", "000001.SZ"), member("885002.TI", "000001.SZ")])
            .unwrap();
        upsert(&mut conn, &[member("885001.TI", "000001.SZ")]).unwrap();

        let count: i64 = conn
            .query_row("SELECT count(*) FROM ths_member", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }
}
