use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rusqlite::types::FromSql;
use rusqlite::{Connection, OpenFlags, Row};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{BuilderError, SchemaReport};
use crate::model::{ReferenceClass, ReferenceCollection, ReferenceProperty};

/// Tables an uploaded database must contain. `t_object` and `t_membership`
/// are never read; they only gate schema validity.
pub const REQUIRED_TABLES: [&str; 5] = [
    "t_class",
    "t_collection",
    "t_property",
    "t_object",
    "t_membership",
];

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one loaded store snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StoreId(u64);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    pub source: String,
    pub classes: usize,
    pub collections: usize,
    pub properties: usize,
}

/// Immutable snapshot of the lookup tables of a reference database.
///
/// The connection is only held while loading, so a store can be shared
/// across threads behind an `Arc` and queried without coordination.
#[derive(Debug)]
pub struct ReferenceStore {
    id: StoreId,
    source: String,
    classes: Vec<ReferenceClass>,
    collections: Vec<ReferenceCollection>,
    properties: Vec<ReferenceProperty>,
}

impl ReferenceStore {
    pub fn open(path: &Path) -> Result<Arc<Self>, BuilderError> {
        let connection = open_read_only(path)?;
        let report = discover_schema(&connection).map_err(|source| BuilderError::InvalidDatabase {
            path: path.to_path_buf(),
            source,
        })?;

        let store = Self::load(&connection, path.display().to_string(), report)?;
        Ok(Arc::new(store))
    }

    #[cfg(test)]
    pub fn from_connection(
        connection: &Connection,
        source: impl Into<String>,
    ) -> Result<Self, BuilderError> {
        let report = discover_schema(connection)?;
        Self::load(connection, source.into(), report)
    }

    fn load(
        connection: &Connection,
        source: String,
        report: SchemaReport,
    ) -> Result<Self, BuilderError> {
        if !report.is_valid {
            return Err(BuilderError::SchemaMismatch(report));
        }

        let classes = load_classes(connection)?;
        let collections = load_collections(connection)?;
        let properties = load_properties(connection)?;
        let id = StoreId(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed));

        info!(
            source = %source,
            store_id = id.0,
            classes = classes.len(),
            collections = collections.len(),
            properties = properties.len(),
            "loaded reference store"
        );

        Ok(Self {
            id,
            source,
            classes,
            collections,
            properties,
        })
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    /// Classes ordered by name.
    pub fn classes(&self) -> &[ReferenceClass] {
        &self.classes
    }

    /// Collections ordered by collection id.
    pub fn collections(&self) -> &[ReferenceCollection] {
        &self.collections
    }

    pub fn properties(&self) -> &[ReferenceProperty] {
        &self.properties
    }

    pub fn summary(&self) -> StoreSummary {
        StoreSummary {
            source: self.source.clone(),
            classes: self.classes.len(),
            collections: self.collections.len(),
            properties: self.properties.len(),
        }
    }
}

pub fn open_read_only(path: &Path) -> Result<Connection, BuilderError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| BuilderError::InvalidDatabase {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the table list of `path` without installing it anywhere.
pub fn inspect_schema(path: &Path) -> Result<SchemaReport, BuilderError> {
    let connection = open_read_only(path)?;
    discover_schema(&connection).map_err(|source| BuilderError::InvalidDatabase {
        path: path.to_path_buf(),
        source,
    })
}

pub fn discover_schema(connection: &Connection) -> rusqlite::Result<SchemaReport> {
    let mut statement =
        connection.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
    let available = statement
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(tables = ?available, "discovered tables");
    Ok(schema_report(available))
}

pub fn schema_report(available_tables: Vec<String>) -> SchemaReport {
    let (found, missing): (Vec<&str>, Vec<&str>) = REQUIRED_TABLES
        .into_iter()
        .partition(|table| available_tables.iter().any(|name| name == table));

    SchemaReport {
        required_tables: REQUIRED_TABLES.into_iter().map(ToOwned::to_owned).collect(),
        found_tables: found.into_iter().map(ToOwned::to_owned).collect(),
        is_valid: missing.is_empty(),
        missing_tables: missing.into_iter().map(ToOwned::to_owned).collect(),
        available_tables,
    }
}

fn load_classes(connection: &Connection) -> rusqlite::Result<Vec<ReferenceClass>> {
    let mut statement = connection.prepare(
        "
        SELECT lang_id, class_id, name
        FROM t_class
        ORDER BY name ASC, class_id ASC
        ",
    )?;

    let mut rows = statement.query([])?;
    let mut out = Vec::new();
    let mut skipped = 0usize;
    while let Some(row) = rows.next()? {
        match (column(row, 0), column(row, 1), column(row, 2)) {
            (Some(lang_id), Some(class_id), Some(name)) => out.push(ReferenceClass {
                lang_id,
                class_id,
                name,
            }),
            _ => skipped += 1,
        }
    }
    report_skipped("t_class", skipped);
    Ok(out)
}

fn load_collections(connection: &Connection) -> rusqlite::Result<Vec<ReferenceCollection>> {
    let mut statement = connection.prepare(
        "
        SELECT collection_id, child_class_id, parent_class_id
        FROM t_collection
        ORDER BY collection_id ASC
        ",
    )?;

    let mut rows = statement.query([])?;
    let mut out = Vec::new();
    let mut skipped = 0usize;
    while let Some(row) = rows.next()? {
        match (column(row, 0), column(row, 1), column(row, 2)) {
            (Some(collection_id), Some(child_class_id), Some(parent_class_id)) => {
                out.push(ReferenceCollection {
                    collection_id,
                    child_class_id,
                    parent_class_id,
                })
            }
            _ => skipped += 1,
        }
    }
    report_skipped("t_collection", skipped);
    Ok(out)
}

fn load_properties(connection: &Connection) -> rusqlite::Result<Vec<ReferenceProperty>> {
    let mut statement = connection.prepare(
        "
        SELECT lang_id, name, description, collection_id
        FROM t_property
        ORDER BY collection_id ASC, name ASC, lang_id ASC
        ",
    )?;

    let mut rows = statement.query([])?;
    let mut out = Vec::new();
    let mut skipped = 0usize;
    while let Some(row) = rows.next()? {
        match (column(row, 0), column(row, 1), column(row, 3)) {
            (Some(lang_id), Some(name), Some(collection_id)) => out.push(ReferenceProperty {
                lang_id,
                name,
                description: column(row, 2).unwrap_or_default(),
                collection_id,
            }),
            _ => skipped += 1,
        }
    }
    report_skipped("t_property", skipped);
    Ok(out)
}

/// NULL and values of an incompatible type both read as `None`.
fn column<T: FromSql>(row: &Row<'_>, index: usize) -> Option<T> {
    row.get::<_, Option<T>>(index).ok().flatten()
}

fn report_skipped(table: &str, skipped: usize) {
    if skipped > 0 {
        warn!(table, skipped, "skipped rows with unusable columns");
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use rusqlite::{Connection, params};

    use super::ReferenceStore;

    pub(crate) const SCHEMA: &str = "
        CREATE TABLE t_class (lang_id INTEGER, class_id INTEGER, name TEXT);
        CREATE TABLE t_collection (
          collection_id INTEGER PRIMARY KEY,
          child_class_id INTEGER,
          parent_class_id INTEGER
        );
        CREATE TABLE t_property (
          property_id INTEGER PRIMARY KEY,
          lang_id INTEGER,
          name TEXT,
          description TEXT,
          collection_id INTEGER
        );
        CREATE TABLE t_object (object_id INTEGER PRIMARY KEY, class_id INTEGER, name TEXT);
        CREATE TABLE t_membership (membership_id INTEGER PRIMARY KEY, collection_id INTEGER);
    ";

    /// System (1), Generator (3), Battery (4) and Line (5) with their
    /// collections under System.
    pub(crate) fn seed(connection: &Connection) {
        connection
            .execute_batch(SCHEMA)
            .expect("fixture schema should apply");

        for (lang_id, class_id, name) in [
            (1, 1, "System"),
            (7, 3, "Generator"),
            (8, 4, "Battery"),
            (9, 5, "Line"),
        ] {
            connection
                .execute(
                    "INSERT INTO t_class(lang_id, class_id, name) VALUES(?1, ?2, ?3)",
                    params![lang_id, class_id, name],
                )
                .expect("class row should insert");
        }

        for (collection_id, child, parent) in [(5, 3, 1), (6, 4, 1), (7, 5, 1), (8, 3, 4)] {
            connection
                .execute(
                    "INSERT INTO t_collection(collection_id, child_class_id, parent_class_id) VALUES(?1, ?2, ?3)",
                    params![collection_id, child, parent],
                )
                .expect("collection row should insert");
        }

        for (lang_id, name, description, collection_id) in [
            (101, "MaxCapacity", Some("Maximum generating capacity"), 5),
            (102, "FuelCost", Some("Fuel cost per unit"), 5),
            (103, "Units", None, 5),
            (201, "Capacity", Some("Storage capacity"), 6),
        ] {
            connection
                .execute(
                    "INSERT INTO t_property(lang_id, name, description, collection_id) VALUES(?1, ?2, ?3, ?4)",
                    params![lang_id, name, description, collection_id],
                )
                .expect("property row should insert");
        }
    }

    pub(crate) fn store() -> ReferenceStore {
        let connection = Connection::open_in_memory().expect("in-memory db should open");
        seed(&connection);
        ReferenceStore::from_connection(&connection, "fixture").expect("fixture store should load")
    }

    pub(crate) fn write_database(path: &std::path::Path) {
        let connection = Connection::open(path).expect("fixture db file should open");
        seed(&connection);
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;

    #[test]
    fn reference_store_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReferenceStore>();
    }

    #[test]
    fn from_connection_loads_lookup_tables() {
        let store = fixtures::store();
        let names: Vec<&str> = store.classes().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Battery", "Generator", "Line", "System"]);
        assert_eq!(store.collections().len(), 4);
        assert_eq!(store.properties().len(), 4);

        let units = store
            .properties()
            .iter()
            .find(|p| p.name == "Units")
            .expect("units property should load");
        assert_eq!(units.description, "");
    }

    #[test]
    fn rows_with_null_columns_are_skipped() {
        let connection = Connection::open_in_memory().expect("in-memory db should open");
        fixtures::seed(&connection);
        connection
            .execute_batch(
                "
                INSERT INTO t_property(lang_id, name, description, collection_id)
                  VALUES(NULL, 'Orphan', NULL, 99);
                INSERT INTO t_class(lang_id, class_id, name) VALUES(NULL, 40, 'Broken');
                INSERT INTO t_collection(collection_id, child_class_id, parent_class_id)
                  VALUES(40, 40, NULL);
                ",
            )
            .expect("rows should insert");

        let store = ReferenceStore::from_connection(&connection, "nulls")
            .expect("unusable rows should not fail the load");
        assert_eq!(store.classes().len(), 4);
        assert_eq!(store.collections().len(), 4);
        assert_eq!(store.properties().len(), 4);
        assert!(store.properties().iter().all(|p| p.name != "Orphan"));
    }

    #[test]
    fn each_load_gets_a_new_store_id() {
        let first = fixtures::store();
        let second = fixtures::store();
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn missing_membership_table_is_a_schema_mismatch() {
        let connection = Connection::open_in_memory().expect("in-memory db should open");
        connection
            .execute_batch(
                "
                CREATE TABLE t_class (lang_id INTEGER, class_id INTEGER, name TEXT);
                CREATE TABLE t_collection (collection_id INTEGER, child_class_id INTEGER, parent_class_id INTEGER);
                CREATE TABLE t_property (lang_id INTEGER, name TEXT, description TEXT, collection_id INTEGER);
                CREATE TABLE t_object (object_id INTEGER);
                CREATE TABLE extra (id INTEGER);
                ",
            )
            .expect("schema should apply");

        let err = ReferenceStore::from_connection(&connection, "partial")
            .expect_err("store without t_membership should be rejected");
        match err {
            BuilderError::SchemaMismatch(report) => {
                assert_eq!(report.missing_tables, vec!["t_membership"]);
                assert_eq!(
                    report.found_tables,
                    vec!["t_class", "t_collection", "t_property", "t_object"]
                );
                assert!(report.available_tables.contains(&"extra".to_string()));
                assert!(!report.is_valid);
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn schema_report_matches_table_names_case_sensitively() {
        let report = schema_report(vec![
            "T_CLASS".to_string(),
            "t_collection".to_string(),
            "t_property".to_string(),
            "t_object".to_string(),
            "t_membership".to_string(),
        ]);
        assert_eq!(report.missing_tables, vec!["t_class"]);
        assert!(!report.is_valid);
    }

    #[test]
    fn inspect_schema_rejects_non_database_files() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("notes.db");
        std::fs::write(&path, "not a sqlite database\n".repeat(64))
            .expect("file should be written");

        let err = inspect_schema(&path).expect_err("plain text should not parse as sqlite");
        assert!(matches!(err, BuilderError::InvalidDatabase { .. }));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn open_reads_a_database_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("references.db");
        fixtures::write_database(&path);

        let store = ReferenceStore::open(&path).expect("fixture file should open");
        assert_eq!(store.summary().classes, 4);
        assert_eq!(store.summary().source, path.display().to_string());
    }
}
