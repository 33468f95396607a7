//! Database schema and migrations.

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if version < SCHEMA_VERSION {
        migrate(conn, version)?;
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

/// Create the initial schema (version 1).
///
/// Feedback rows carry assignment columns that are all NULL while the record
/// is unassigned and all set afterwards; the table CHECK enforces this.
fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS provinces (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            abbr TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS cities (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            province_id INTEGER NOT NULL REFERENCES provinces(id)
        );
        CREATE INDEX IF NOT EXISTS idx_cities_province ON cities(province_id);

        -- state: 0 = working, 1 = inactive
        CREATE TABLE IF NOT EXISTS inspectors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            code TEXT NOT NULL UNIQUE,
            province_id INTEGER NOT NULL,
            city_id INTEGER NOT NULL,
            tel TEXT NOT NULL DEFAULT '',
            state INTEGER NOT NULL DEFAULT 0 CHECK (state IN (0, 1)),
            remarks TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_inspectors_region
            ON inspectors(province_id, city_id);

        -- state: 0 = unassigned, 1 = assigned, 2 = confirmed
        CREATE TABLE IF NOT EXISTS feedback (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reporter TEXT NOT NULL,
            province_id INTEGER NOT NULL,
            city_id INTEGER NOT NULL,
            address TEXT NOT NULL,
            description TEXT NOT NULL,
            estimated_grade INTEGER NOT NULL CHECK (estimated_grade BETWEEN 1 AND 6),
            submitted_date TEXT NOT NULL,
            submitted_time TEXT NOT NULL,
            inspector_id INTEGER REFERENCES inspectors(id),
            assign_date TEXT,
            assign_time TEXT,
            remarks TEXT,
            state INTEGER NOT NULL DEFAULT 0 CHECK (state IN (0, 1, 2)),
            CHECK (
                (state = 0 AND inspector_id IS NULL AND assign_date IS NULL AND assign_time IS NULL)
                OR (state > 0 AND inspector_id IS NOT NULL AND assign_date IS NOT NULL AND assign_time IS NOT NULL)
            )
        );
        CREATE INDEX IF NOT EXISTS idx_feedback_reporter ON feedback(reporter);
        CREATE INDEX IF NOT EXISTS idx_feedback_inspector_state
            ON feedback(inspector_id, state);
        CREATE INDEX IF NOT EXISTS idx_feedback_region
            ON feedback(province_id, city_id);

        CREATE TABLE IF NOT EXISTS measurements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            province_id INTEGER NOT NULL,
            city_id INTEGER NOT NULL,
            address TEXT NOT NULL,
            so2_value INTEGER NOT NULL,
            so2_level INTEGER NOT NULL,
            co_value INTEGER NOT NULL,
            co_level INTEGER NOT NULL,
            spm_value INTEGER NOT NULL,
            spm_level INTEGER NOT NULL,
            overall_level INTEGER NOT NULL,
            confirm_date TEXT NOT NULL,
            confirm_time TEXT NOT NULL,
            inspector_id INTEGER NOT NULL REFERENCES inspectors(id),
            feedback_id INTEGER UNIQUE REFERENCES feedback(id),
            reporter TEXT,
            notes TEXT NOT NULL DEFAULT '',
            remarks TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_measurements_confirmed
            ON measurements(confirm_date, confirm_time);
        CREATE INDEX IF NOT EXISTS idx_measurements_region
            ON measurements(province_id, city_id);
        "#,
    )?;

    Ok(())
}

/// Run migrations from old_version to current.
fn migrate(conn: &Connection, old_version: i32) -> Result<()> {
    // if old_version < 2 { migrate_to_v2(conn)?; }
    let _ = old_version;
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "schema_version",
            "provinces",
            "cities",
            "inspectors",
            "feedback",
            "measurements",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_schema_version_tracking() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 0);

        initialize(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        // Idempotent.
        initialize(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_feedback_check_rejects_partial_assignment() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO feedback (reporter, province_id, city_id, address, description,
             estimated_grade, submitted_date, submitted_time, state)
             VALUES ('1380', 1, 1, 'a', 'b', 3, '2024-01-01', '10:00:00', 1)",
            [],
        );
        assert!(result.is_err());
    }
}
