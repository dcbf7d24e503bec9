use duckdb::{AccessMode, Config, Connection};
use r2d2::ManageConnection;

/// r2d2 manager for DuckDB connections to one database file.
pub struct DuckDbConnectionManager {
    connection_string: String,
    read_only: bool,
}

impl DuckDbConnectionManager {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            read_only: false,
        }
    }

    /// Opens connections with `ACCESS_MODE = READ_ONLY`. DuckDB refuses this
    /// for in-memory databases.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

impl ManageConnection for DuckDbConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        if self.read_only {
            let config = Config::default().access_mode(AccessMode::ReadOnly)?;
            Connection::open_with_flags(&self.connection_string, config)
        } else {
            Connection::open(&self.connection_string)
        }
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_connections_reject_writes() {
        let path = std::env::temp_dir()
            .join(format!("nl-analyst-ro-{}.duckdb", std::process::id()));
        let path_string = path.to_string_lossy().to_string();
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE items (id INTEGER); INSERT INTO items VALUES (1);")
                .unwrap();
        }

        let manager = DuckDbConnectionManager::new(path_string).read_only(true);
        let conn = manager.connect().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert!(conn.execute("INSERT INTO items VALUES (2)", []).is_err());

        drop(conn);
        std::fs::remove_file(&path).ok();
    }
}
