//! Main store implementation.

use std::path::Path;
use std::time::Duration;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use time::{Date, Time};
use tracing::{debug, info};

use airgrid_types::wire::{format_date, format_time, parse_date, parse_time};
use airgrid_types::{
    Assignment, Availability, City, Feedback, FeedbackState, Inspector, Level, Measurement,
    Province, Region,
};

use crate::error::{Error, Result};
use crate::models::{NewFeedback, NewInspector, NewMeasurement};
use crate::queries::{FEEDBACK_COLUMNS, FeedbackQuery, MEASUREMENT_COLUMNS, MeasurementQuery};
use crate::schema;

/// Default time a connection waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based store for the feedback workflow.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Change how long writes wait for a competing writer.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    /// Begin a write transaction.
    ///
    /// The write lock is taken up front (`BEGIN IMMEDIATE`), so reads made
    /// through the returned [`StoreTx`] cannot be invalidated by another
    /// writer before commit. Dropping the transaction without calling
    /// [`StoreTx::commit`] rolls it back.
    pub fn transaction(&mut self) -> Result<StoreTx<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(StoreTx { tx })
    }
}

// Location operations
impl Store {
    /// Insert or rename a province.
    pub fn upsert_province(&self, province: &Province) -> Result<()> {
        self.conn.execute(
            "INSERT INTO provinces (id, name, abbr) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = ?2, abbr = ?3",
            rusqlite::params![province.id, province.name, province.abbr],
        )?;
        Ok(())
    }

    /// Insert or rename a city. The province must already exist.
    pub fn upsert_city(&self, city: &City) -> Result<()> {
        self.conn.execute(
            "INSERT INTO cities (id, name, province_id) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = ?2, province_id = ?3",
            rusqlite::params![city.id, city.name, city.province_id],
        )?;
        Ok(())
    }

    pub fn list_provinces(&self) -> Result<Vec<Province>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, abbr FROM provinces ORDER BY id")?;
        let provinces = stmt
            .query_map([], |row| {
                Ok(Province {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    abbr: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(provinces)
    }

    pub fn list_cities(&self, province_id: i64) -> Result<Vec<City>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, province_id FROM cities WHERE province_id = ? ORDER BY id",
        )?;
        let cities = stmt
            .query_map([province_id], |row| {
                Ok(City {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    province_id: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(cities)
    }

    /// Returns true if the city exists and belongs to the province.
    pub fn region_exists(&self, region: Region) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM cities WHERE id = ?1 AND province_id = ?2",
            [region.city_id, region.province_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

// Inspector operations
impl Store {
    /// Register an inspector. Login codes are unique.
    pub fn insert_inspector(&self, inspector: &NewInspector) -> Result<Inspector> {
        self.conn.execute(
            "INSERT INTO inspectors (name, code, province_id, city_id, tel, state, remarks)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                inspector.name,
                inspector.code,
                inspector.province_id,
                inspector.city_id,
                inspector.tel,
                inspector.availability.code(),
                inspector.remarks,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!(inspector_id = id, code = %inspector.code, "Registered inspector");
        self.get_inspector(id)?.ok_or(Error::NotFound {
            entity: "inspector",
            id,
        })
    }

    pub fn get_inspector(&self, id: i64) -> Result<Option<Inspector>> {
        select_inspector(&self.conn, id)
    }

    /// List inspectors, optionally restricted to one region.
    pub fn list_inspectors(&self, region: Option<Region>) -> Result<Vec<Inspector>> {
        let (sql, params): (&str, Vec<i64>) = match region {
            Some(r) => (
                "SELECT id, name, code, province_id, city_id, tel, state, remarks
                 FROM inspectors WHERE province_id = ?1 AND city_id = ?2 ORDER BY id",
                vec![r.province_id, r.city_id],
            ),
            None => (
                "SELECT id, name, code, province_id, city_id, tel, state, remarks
                 FROM inspectors ORDER BY id",
                Vec::new(),
            ),
        };

        let mut stmt = self.conn.prepare(sql)?;
        let inspectors = stmt
            .query_map(rusqlite::params_from_iter(params), inspector_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(inspectors)
    }

    /// Mark an inspector working or inactive. Returns false if no such
    /// inspector exists.
    pub fn set_inspector_availability(&self, id: i64, availability: Availability) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE inspectors SET state = ?2 WHERE id = ?1",
            rusqlite::params![id, availability.code()],
        )?;
        Ok(changed == 1)
    }
}

// Feedback operations
impl Store {
    /// Store a new, unassigned feedback report.
    pub fn insert_feedback(&self, feedback: &NewFeedback) -> Result<Feedback> {
        self.conn.execute(
            "INSERT INTO feedback (reporter, province_id, city_id, address, description,
             estimated_grade, submitted_date, submitted_time, state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
            rusqlite::params![
                feedback.reporter,
                feedback.province_id,
                feedback.city_id,
                feedback.address,
                feedback.description,
                feedback.estimated_grade,
                format_date(feedback.submitted_date),
                format_time(feedback.submitted_time),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_feedback(id)?.ok_or(Error::NotFound {
            entity: "feedback",
            id,
        })
    }

    pub fn get_feedback(&self, id: i64) -> Result<Option<Feedback>> {
        select_feedback(&self.conn, id)
    }

    /// Query feedback with filters.
    pub fn query_feedback(&self, query: &FeedbackQuery) -> Result<Vec<Feedback>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let feedback = stmt
            .query_map(params_ref.as_slice(), feedback_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feedback)
    }

    /// Count feedback records, optionally in one state.
    pub fn count_feedback(&self, state: Option<FeedbackState>) -> Result<u64> {
        let count: i64 = match state {
            Some(s) => self.conn.query_row(
                "SELECT COUNT(*) FROM feedback WHERE state = ?",
                [s.code()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM feedback", [], |row| row.get(0))?,
        };

        Ok(count as u64)
    }
}

// Measurement operations
impl Store {
    pub fn get_measurement(&self, id: i64) -> Result<Option<Measurement>> {
        select_measurement(&self.conn, id)
    }

    /// The measurement that confirmed a feedback, if any.
    pub fn measurement_for_feedback(&self, feedback_id: i64) -> Result<Option<Measurement>> {
        let sql = format!("SELECT {MEASUREMENT_COLUMNS} FROM measurements WHERE feedback_id = ?");
        let measurement = self
            .conn
            .query_row(&sql, [feedback_id], measurement_from_row)
            .optional()?;
        Ok(measurement)
    }

    /// Query measurements with filters.
    pub fn query_measurements(&self, query: &MeasurementQuery) -> Result<Vec<Measurement>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let measurements = stmt
            .query_map(params_ref.as_slice(), measurement_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(measurements)
    }
}

/// An open write transaction.
///
/// State changes are conditional updates on the state the caller observed;
/// they report whether a row was changed instead of failing, so the caller
/// decides which error a lost race maps to.
pub struct StoreTx<'a> {
    tx: Transaction<'a>,
}

impl StoreTx<'_> {
    pub fn feedback(&self, id: i64) -> Result<Option<Feedback>> {
        select_feedback(&self.tx, id)
    }

    pub fn inspector(&self, id: i64) -> Result<Option<Inspector>> {
        select_inspector(&self.tx, id)
    }

    /// Move a feedback from `Unassigned` to `Assigned`.
    ///
    /// Returns false if the feedback does not exist or is no longer
    /// unassigned. Remarks are overwritten, `None` clears them.
    pub fn mark_assigned(
        &self,
        feedback_id: i64,
        inspector_id: i64,
        date: Date,
        time: Time,
        remarks: Option<&str>,
    ) -> Result<bool> {
        let changed = self.tx.execute(
            "UPDATE feedback SET
                inspector_id = ?2,
                assign_date = ?3,
                assign_time = ?4,
                remarks = ?5,
                state = 1
             WHERE id = ?1 AND state = 0",
            rusqlite::params![
                feedback_id,
                inspector_id,
                format_date(date),
                format_time(time),
                remarks,
            ],
        )?;
        Ok(changed == 1)
    }

    /// Move a feedback from `Assigned` to `Confirmed`.
    ///
    /// Returns false unless the feedback is currently assigned to
    /// `inspector_id`.
    pub fn mark_confirmed(&self, feedback_id: i64, inspector_id: i64) -> Result<bool> {
        let changed = self.tx.execute(
            "UPDATE feedback SET state = 2 WHERE id = ?1 AND state = 1 AND inspector_id = ?2",
            [feedback_id, inspector_id],
        )?;
        Ok(changed == 1)
    }

    /// Store a classified measurement and return it with its id.
    pub fn insert_measurement(&self, m: &NewMeasurement) -> Result<Measurement> {
        self.tx.execute(
            "INSERT INTO measurements (province_id, city_id, address, so2_value, so2_level,
             co_value, co_level, spm_value, spm_level, overall_level, confirm_date,
             confirm_time, inspector_id, feedback_id, reporter, notes, remarks)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            rusqlite::params![
                m.province_id,
                m.city_id,
                m.address,
                m.so2_value,
                m.levels.so2.value(),
                m.co_value,
                m.levels.co.value(),
                m.spm_value,
                m.levels.spm.value(),
                m.levels.overall.value(),
                format_date(m.confirm_date),
                format_time(m.confirm_time),
                m.inspector_id,
                m.feedback_id,
                m.reporter,
                m.notes,
                m.remarks,
            ],
        )?;

        let id = self.tx.last_insert_rowid();
        select_measurement(&self.tx, id)?.ok_or(Error::NotFound {
            entity: "measurement",
            id,
        })
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

fn select_feedback(conn: &Connection, id: i64) -> Result<Option<Feedback>> {
    let sql = format!("SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE id = ?");
    let feedback = conn.query_row(&sql, [id], feedback_from_row).optional()?;
    Ok(feedback)
}

fn select_inspector(conn: &Connection, id: i64) -> Result<Option<Inspector>> {
    let inspector = conn
        .query_row(
            "SELECT id, name, code, province_id, city_id, tel, state, remarks
             FROM inspectors WHERE id = ?",
            [id],
            inspector_from_row,
        )
        .optional()?;
    Ok(inspector)
}

fn select_measurement(conn: &Connection, id: i64) -> Result<Option<Measurement>> {
    let sql = format!("SELECT {MEASUREMENT_COLUMNS} FROM measurements WHERE id = ?");
    let measurement = conn.query_row(&sql, [id], measurement_from_row).optional()?;
    Ok(measurement)
}

fn conversion_error<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Date> {
    let text: String = row.get(idx)?;
    parse_date(&text).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Time> {
    let text: String = row.get(idx)?;
    parse_time(&text).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn level_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Level> {
    Level::try_from(row.get::<_, i64>(idx)?).map_err(|e| conversion_error(idx, Type::Integer, e))
}

fn feedback_from_row(row: &Row<'_>) -> rusqlite::Result<Feedback> {
    let state = FeedbackState::try_from(row.get::<_, i64>(13)?)
        .map_err(|e| conversion_error(13, Type::Integer, e))?;

    let assignment = match row.get::<_, Option<i64>>(9)? {
        Some(inspector_id) => Some(Assignment {
            inspector_id,
            date: date_at(row, 10)?,
            time: time_at(row, 11)?,
        }),
        None => None,
    };

    Ok(Feedback {
        id: row.get(0)?,
        reporter: row.get(1)?,
        province_id: row.get(2)?,
        city_id: row.get(3)?,
        address: row.get(4)?,
        description: row.get(5)?,
        estimated_grade: row.get(6)?,
        submitted_date: date_at(row, 7)?,
        submitted_time: time_at(row, 8)?,
        assignment,
        remarks: row.get(12)?,
        state,
    })
}

fn inspector_from_row(row: &Row<'_>) -> rusqlite::Result<Inspector> {
    let availability = Availability::try_from(row.get::<_, i64>(6)?)
        .map_err(|e| conversion_error(6, Type::Integer, e))?;

    Ok(Inspector {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        province_id: row.get(3)?,
        city_id: row.get(4)?,
        tel: row.get(5)?,
        availability,
        remarks: row.get(7)?,
    })
}

fn measurement_from_row(row: &Row<'_>) -> rusqlite::Result<Measurement> {
    Ok(Measurement {
        id: row.get(0)?,
        province_id: row.get(1)?,
        city_id: row.get(2)?,
        address: row.get(3)?,
        so2_value: row.get(4)?,
        so2_level: level_at(row, 5)?,
        co_value: row.get(6)?,
        co_level: level_at(row, 7)?,
        spm_value: row.get(8)?,
        spm_level: level_at(row, 9)?,
        overall_level: level_at(row, 10)?,
        confirm_date: date_at(row, 11)?,
        confirm_time: time_at(row, 12)?,
        inspector_id: row.get(13)?,
        feedback_id: row.get(14)?,
        reporter: row.get(15)?,
        notes: row.get(16)?,
        remarks: row.get(17)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use airgrid_types::{PollutantLevels, RangeTable};
    use time::macros::{date, time};

    fn seeded() -> Store {
        let store = Store::open_in_memory().unwrap();
        seed(&store);
        store
    }

    fn seed(store: &Store) {
        store
            .upsert_province(&Province {
                id: 1,
                name: "Liaoning".to_string(),
                abbr: "LN".to_string(),
            })
            .unwrap();
        store
            .upsert_city(&City {
                id: 1,
                name: "Shenyang".to_string(),
                province_id: 1,
            })
            .unwrap();
    }

    fn new_inspector(code: &str) -> NewInspector {
        NewInspector {
            name: "Li Wei".to_string(),
            code: code.to_string(),
            province_id: 1,
            city_id: 1,
            tel: "13900000000".to_string(),
            availability: Availability::Working,
            remarks: None,
        }
    }

    fn new_feedback(reporter: &str) -> NewFeedback {
        NewFeedback {
            reporter: reporter.to_string(),
            province_id: 1,
            city_id: 1,
            address: "North gate".to_string(),
            description: "Smoke".to_string(),
            estimated_grade: 3,
            submitted_date: date!(2024 - 05 - 01),
            submitted_time: time!(08:30:00),
        }
    }

    fn new_measurement(inspector_id: i64, feedback_id: Option<i64>) -> NewMeasurement {
        let levels: PollutantLevels = RangeTable::standard().classify_all(30, 2, 40).unwrap();
        NewMeasurement {
            province_id: 1,
            city_id: 1,
            address: "North gate".to_string(),
            so2_value: 30,
            co_value: 2,
            spm_value: 40,
            levels,
            confirm_date: date!(2024 - 05 - 03),
            confirm_time: time!(14:00:00),
            inspector_id,
            feedback_id,
            reporter: Some("13800000000".to_string()),
            notes: "Chimney smoke visible".to_string(),
            remarks: None,
        }
    }

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.list_provinces().unwrap().is_empty());
        assert_eq!(store.count_feedback(None).unwrap(), 0);
    }

    #[test]
    fn test_locations() {
        let store = seeded();
        assert!(store.region_exists(Region::new(1, 1)).unwrap());
        assert!(!store.region_exists(Region::new(2, 1)).unwrap());
        assert!(!store.region_exists(Region::new(1, 9)).unwrap());

        assert_eq!(store.list_provinces().unwrap()[0].abbr, "LN");
        assert_eq!(store.list_cities(1).unwrap().len(), 1);
        assert!(store.list_cities(2).unwrap().is_empty());
    }

    #[test]
    fn test_city_requires_province() {
        let store = Store::open_in_memory().unwrap();
        let err = store
            .upsert_city(&City {
                id: 5,
                name: "Nowhere".to_string(),
                province_id: 42,
            })
            .unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
    }

    #[test]
    fn test_inspector_roster() {
        let store = seeded();
        let gm = store.insert_inspector(&new_inspector("GM001")).unwrap();
        assert!(gm.is_working());

        assert!(
            store
                .set_inspector_availability(gm.id, Availability::Inactive)
                .unwrap()
        );
        let gm = store.get_inspector(gm.id).unwrap().unwrap();
        assert_eq!(gm.availability, Availability::Inactive);

        assert!(
            !store
                .set_inspector_availability(999, Availability::Working)
                .unwrap()
        );

        assert_eq!(store.list_inspectors(Some(Region::new(1, 1))).unwrap().len(), 1);
        assert!(store.list_inspectors(Some(Region::new(1, 2))).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_inspector_code_rejected() {
        let store = seeded();
        store.insert_inspector(&new_inspector("GM001")).unwrap();
        let err = store.insert_inspector(&new_inspector("GM001")).unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
    }

    #[test]
    fn test_insert_feedback_is_unassigned() {
        let store = seeded();
        let fb = store.insert_feedback(&new_feedback("13800000000")).unwrap();

        assert_eq!(fb.state, FeedbackState::Unassigned);
        assert!(fb.assignment.is_none());
        assert!(fb.is_consistent());
        assert_eq!(fb.submitted_time, time!(08:30:00));
        assert_eq!(store.get_feedback(fb.id).unwrap(), Some(fb));
    }

    #[test]
    fn test_assign_then_confirm() {
        let mut store = seeded();
        let gm = store.insert_inspector(&new_inspector("GM001")).unwrap();
        let fb = store.insert_feedback(&new_feedback("13800000000")).unwrap();

        let tx = store.transaction().unwrap();
        assert!(
            tx.mark_assigned(fb.id, gm.id, date!(2024 - 05 - 02), time!(09:00:00), Some("urgent"))
                .unwrap()
        );
        tx.commit().unwrap();

        let assigned = store.get_feedback(fb.id).unwrap().unwrap();
        assert_eq!(assigned.state, FeedbackState::Assigned);
        assert_eq!(assigned.inspector_id(), Some(gm.id));
        assert_eq!(assigned.remarks.as_deref(), Some("urgent"));
        assert!(assigned.is_consistent());

        let tx = store.transaction().unwrap();
        assert!(tx.mark_confirmed(fb.id, gm.id).unwrap());
        let m = tx.insert_measurement(&new_measurement(gm.id, Some(fb.id))).unwrap();
        tx.commit().unwrap();

        let confirmed = store.get_feedback(fb.id).unwrap().unwrap();
        assert_eq!(confirmed.state, FeedbackState::Confirmed);
        assert_eq!(confirmed.assignment, assigned.assignment);
        assert_eq!(m.overall_level, Level::new(2));
        assert_eq!(store.measurement_for_feedback(fb.id).unwrap(), Some(m));
    }

    #[test]
    fn test_assign_overwrites_remarks() {
        let mut store = seeded();
        let gm = store.insert_inspector(&new_inspector("GM001")).unwrap();
        let fb = store.insert_feedback(&new_feedback("13800000000")).unwrap();
        store
            .conn
            .execute("UPDATE feedback SET remarks = 'stale' WHERE id = ?1", [fb.id])
            .unwrap();

        let tx = store.transaction().unwrap();
        assert!(
            tx.mark_assigned(fb.id, gm.id, date!(2024 - 05 - 02), time!(09:00:00), None)
                .unwrap()
        );
        tx.commit().unwrap();

        let assigned = store.get_feedback(fb.id).unwrap().unwrap();
        assert_eq!(assigned.state, FeedbackState::Assigned);
        assert!(assigned.remarks.is_none());
    }

    #[test]
    fn test_conditional_updates_reject_wrong_state() {
        let mut store = seeded();
        let gm = store.insert_inspector(&new_inspector("GM001")).unwrap();
        let other = store.insert_inspector(&new_inspector("GM002")).unwrap();
        let fb = store.insert_feedback(&new_feedback("13800000000")).unwrap();

        let tx = store.transaction().unwrap();
        // Not assigned yet.
        assert!(!tx.mark_confirmed(fb.id, gm.id).unwrap());
        assert!(
            tx.mark_assigned(fb.id, gm.id, date!(2024 - 05 - 02), time!(09:00:00), None)
                .unwrap()
        );
        // Already assigned.
        assert!(
            !tx.mark_assigned(fb.id, other.id, date!(2024 - 05 - 02), time!(09:00:01), None)
                .unwrap()
        );
        // Wrong inspector.
        assert!(!tx.mark_confirmed(fb.id, other.id).unwrap());
        assert!(tx.mark_confirmed(fb.id, gm.id).unwrap());
        // Terminal.
        assert!(!tx.mark_confirmed(fb.id, gm.id).unwrap());
        tx.commit().unwrap();

        let fb = store.get_feedback(fb.id).unwrap().unwrap();
        assert_eq!(fb.inspector_id(), Some(gm.id));
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let mut store = seeded();
        let gm = store.insert_inspector(&new_inspector("GM001")).unwrap();
        let fb = store.insert_feedback(&new_feedback("13800000000")).unwrap();

        {
            let tx = store.transaction().unwrap();
            assert!(
                tx.mark_assigned(fb.id, gm.id, date!(2024 - 05 - 02), time!(09:00:00), None)
                    .unwrap()
            );
        }

        let fb = store.get_feedback(fb.id).unwrap().unwrap();
        assert_eq!(fb.state, FeedbackState::Unassigned);
    }

    #[test]
    fn test_one_measurement_per_feedback() {
        let mut store = seeded();
        let gm = store.insert_inspector(&new_inspector("GM001")).unwrap();
        let fb = store.insert_feedback(&new_feedback("13800000000")).unwrap();

        let tx = store.transaction().unwrap();
        tx.insert_measurement(&new_measurement(gm.id, Some(fb.id))).unwrap();
        let err = tx
            .insert_measurement(&new_measurement(gm.id, Some(fb.id)))
            .unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));

        // Free-standing measurements are not limited.
        tx.insert_measurement(&new_measurement(gm.id, None)).unwrap();
        tx.insert_measurement(&new_measurement(gm.id, None)).unwrap();
    }

    #[test]
    fn test_query_feedback_filters_and_order() {
        let mut store = seeded();
        let gm = store.insert_inspector(&new_inspector("GM001")).unwrap();
        let a = store.insert_feedback(&new_feedback("13800000000")).unwrap();
        let b = store.insert_feedback(&new_feedback("13800000000")).unwrap();
        let c = store.insert_feedback(&new_feedback("13700000000")).unwrap();

        let tx = store.transaction().unwrap();
        for id in [a.id, b.id] {
            tx.mark_assigned(id, gm.id, date!(2024 - 05 - 02), time!(09:00:00), None)
                .unwrap();
        }
        tx.mark_confirmed(a.id, gm.id).unwrap();
        tx.commit().unwrap();

        let own = store
            .query_feedback(&FeedbackQuery::new().reporter("13800000000"))
            .unwrap();
        assert_eq!(own.iter().map(|f| f.id).collect::<Vec<_>>(), vec![b.id, a.id]);

        let tasks = store
            .query_feedback(&FeedbackQuery::new().inspector(gm.id).assigned_only().order_by_state())
            .unwrap();
        assert_eq!(tasks.iter().map(|f| f.id).collect::<Vec<_>>(), vec![b.id, a.id]);

        let confirmed = store
            .query_feedback(&FeedbackQuery::new().state(FeedbackState::Confirmed))
            .unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id, a.id);

        let unassigned = store
            .query_feedback(&FeedbackQuery::new().state(FeedbackState::Unassigned))
            .unwrap();
        assert_eq!(unassigned[0].id, c.id);

        assert_eq!(store.count_feedback(Some(FeedbackState::Assigned)).unwrap(), 1);
        assert_eq!(store.count_feedback(None).unwrap(), 3);

        let page = store.query_feedback(&FeedbackQuery::new().limit(1).offset(1)).unwrap();
        assert_eq!(page[0].id, b.id);
    }

    #[test]
    fn test_query_measurements() {
        let mut store = seeded();
        let gm = store.insert_inspector(&new_inspector("GM001")).unwrap();

        let tx = store.transaction().unwrap();
        let first = tx.insert_measurement(&new_measurement(gm.id, None)).unwrap();
        let mut later = new_measurement(gm.id, None);
        later.confirm_date = date!(2024 - 06 - 01);
        let second = tx.insert_measurement(&later).unwrap();
        tx.commit().unwrap();

        let all = store.query_measurements(&MeasurementQuery::new()).unwrap();
        assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        let may = store
            .query_measurements(&MeasurementQuery::new().until(date!(2024 - 05 - 31)))
            .unwrap();
        assert_eq!(may.len(), 1);
        assert_eq!(may[0].id, first.id);
        assert_eq!(may[0].levels(), first.levels());
    }

    #[test]
    fn test_stale_read_loses_conditional_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airgrid.db");

        let mut a = Store::open(&path).unwrap();
        let mut b = Store::open(&path).unwrap();

        let gm1 = a.insert_inspector(&new_inspector("GM001")).unwrap();
        let gm2 = a.insert_inspector(&new_inspector("GM002")).unwrap();
        let fb = a.insert_feedback(&new_feedback("13800000000")).unwrap();

        // b sees the record as unassigned before a commits.
        let seen = b.get_feedback(fb.id).unwrap().unwrap();
        assert_eq!(seen.state, FeedbackState::Unassigned);

        let tx = a.transaction().unwrap();
        assert!(
            tx.mark_assigned(fb.id, gm1.id, date!(2024 - 05 - 02), time!(09:00:00), None)
                .unwrap()
        );
        tx.commit().unwrap();

        let tx = b.transaction().unwrap();
        assert!(
            !tx.mark_assigned(fb.id, gm2.id, date!(2024 - 05 - 02), time!(09:00:01), None)
                .unwrap()
        );
        drop(tx);

        let fb = b.get_feedback(fb.id).unwrap().unwrap();
        assert_eq!(fb.inspector_id(), Some(gm1.id));
    }

    #[test]
    fn test_competing_writer_reports_busy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airgrid.db");

        let mut a = Store::open(&path).unwrap();
        let mut b = Store::open(&path).unwrap();
        b.set_busy_timeout(Duration::ZERO).unwrap();

        let _held = a.transaction().unwrap();
        let err = b.transaction().err().unwrap();
        assert!(err.is_busy(), "unexpected error: {err}");
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("airgrid.db");
        let store = Store::open(&path).unwrap();
        seed(&store);
        assert!(path.exists());
    }
}
