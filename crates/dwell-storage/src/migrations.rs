//! Database schema migrations.
//!
//! Version 1 creates the `building` and `property` tables; version 2 adds the
//! indexes the listing searches filter on.

use rusqlite::Connection;
use tracing::info;

use dwell_core::DwellError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), DwellError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| DwellError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version = current_version(conn)?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: listing_schema");
    }
    if current_version < 2 {
        apply_v2(conn)?;
        info!("Applied migration v2: search_indexes");
    }

    Ok(())
}

/// Highest applied migration version, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<i64, DwellError> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| DwellError::Storage(format!("Failed to query migration version: {}", e)))
}

/// Version 1: buildings and the units inside them.
fn apply_v1(conn: &Connection) -> Result<(), DwellError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS building (
            id              TEXT PRIMARY KEY NOT NULL,
            name            TEXT NOT NULL,
            address         TEXT NOT NULL DEFAULT '',
            district        TEXT NOT NULL,
            city            TEXT NOT NULL DEFAULT '',
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE TABLE IF NOT EXISTS property (
            id              TEXT PRIMARY KEY NOT NULL,
            building_id     TEXT NOT NULL,
            unit_number     TEXT NOT NULL DEFAULT '',
            floor           INTEGER,
            kind            TEXT NOT NULL DEFAULT 'apartment',
            area            REAL NOT NULL CHECK (area > 0),
            bedrooms        INTEGER NOT NULL CHECK (bedrooms >= 0),
            bathrooms       INTEGER NOT NULL DEFAULT 1,
            balcony         INTEGER NOT NULL DEFAULT 0 CHECK (balcony IN (0, 1)),
            terrace         INTEGER NOT NULL DEFAULT 0 CHECK (terrace IN (0, 1)),
            furnished       INTEGER NOT NULL DEFAULT 0 CHECK (furnished IN (0, 1)),
            pet_friendly    INTEGER NOT NULL DEFAULT 0 CHECK (pet_friendly IN (0, 1)),
            price           REAL NOT NULL,
            monthly_fee     REAL,
            status          TEXT NOT NULL
                            CHECK (status IN ('OFF_PLAN', 'UNDER_CONSTRUCTION', 'FINISHED')),
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            FOREIGN KEY (building_id) REFERENCES building(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_property_building
            ON property (building_id);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'listing_schema');
        ",
    )
    .map_err(|e| DwellError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

/// Version 2: indexes for the essential criteria.
fn apply_v2(conn: &Connection) -> Result<(), DwellError> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_building_district
            ON building (district);

        CREATE INDEX IF NOT EXISTS idx_property_search
            ON property (status, bedrooms, price);

        CREATE INDEX IF NOT EXISTS idx_property_area
            ON property (area);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (2, 'search_indexes');
        ",
    )
    .map_err(|e| DwellError::Storage(format!("Failed to apply migration v2: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    fn insert_building(conn: &Connection) {
        conn.execute(
            "INSERT INTO building (id, name, district) VALUES ('b1', 'Torre Sol', 'Surco')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_migrations_run_once() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(current_version(&conn).unwrap(), 2);
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_fresh_database_version_zero() {
        let conn = open_test_conn();
        conn.execute_batch(
            "CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY, name TEXT NOT NULL);",
        )
        .unwrap();
        assert_eq!(current_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_property_status_check() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        insert_building(&conn);

        let result = conn.execute(
            "INSERT INTO property (id, building_id, area, bedrooms, price, status)
             VALUES ('p1', 'b1', 80, 2, 300000, 'AVAILABLE')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_property_requires_building() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO property (id, building_id, area, bedrooms, price, status)
             VALUES ('p1', 'missing', 80, 2, 300000, 'FINISHED')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_deleting_building_cascades() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        insert_building(&conn);
        conn.execute(
            "INSERT INTO property (id, building_id, area, bedrooms, price, status)
             VALUES ('p1', 'b1', 80, 2, 300000, 'FINISHED')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM building WHERE id = 'b1'", []).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM property", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
