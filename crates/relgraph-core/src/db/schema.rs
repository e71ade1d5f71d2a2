//! Canonical SQLite schema for the relationship store.
//!
//! - `objects` holds the node rows edges point at; snapshots keep their
//!   origin in `child_type`/`child_id`
//! - `relationships` is the polymorphic edge table, unique per ordered pair
//! - `automappings` records rule-driven mappings that produced derived edges
//! - `import_exports` tracks bulk import/export jobs
//! - `store_meta` tracks the schema version

/// Migration v1: node, edge, and automapping tables with lookup indexes.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS objects (
    object_type TEXT NOT NULL CHECK (length(trim(object_type)) > 0),
    object_id INTEGER NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    child_type TEXT,
    child_id INTEGER,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    PRIMARY KEY (object_type, object_id),
    CHECK ((child_type IS NULL) = (child_id IS NULL))
);

CREATE TABLE IF NOT EXISTS relationships (
    relationship_id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_type TEXT NOT NULL,
    source_id INTEGER NOT NULL,
    destination_type TEXT NOT NULL,
    destination_id INTEGER NOT NULL,
    parent_id INTEGER REFERENCES relationships(relationship_id) ON DELETE SET NULL,
    automapping_id INTEGER REFERENCES automappings(automapping_id) ON DELETE CASCADE,
    is_external INTEGER NOT NULL DEFAULT 0 CHECK (is_external IN (0, 1)),
    modified_by_id INTEGER,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    UNIQUE (source_id, source_type, destination_id, destination_type)
);

CREATE TABLE IF NOT EXISTS automappings (
    automapping_id INTEGER PRIMARY KEY AUTOINCREMENT,
    relationship_id INTEGER REFERENCES relationships(relationship_id) ON DELETE SET NULL,
    source_type TEXT NOT NULL,
    source_id INTEGER NOT NULL,
    destination_type TEXT NOT NULL,
    destination_id INTEGER NOT NULL,
    modified_by_id INTEGER,
    created_at_us INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS ix_relationships_source
    ON relationships(source_type, source_id);

CREATE INDEX IF NOT EXISTS ix_relationships_destination
    ON relationships(destination_type, destination_id);

CREATE INDEX IF NOT EXISTS ix_relationships_parent
    ON relationships(parent_id);

CREATE INDEX IF NOT EXISTS ix_relationships_automapping
    ON relationships(automapping_id);

CREATE INDEX IF NOT EXISTS ix_automappings_relationship
    ON automappings(relationship_id);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, created_at_us)
VALUES (1, 1, 0);
";

/// Migration v2: import/export job tracking.
pub const MIGRATION_V2_SQL: &str = r"
CREATE TABLE IF NOT EXISTS import_exports (
    job_id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_type TEXT NOT NULL CHECK (job_type IN ('Import', 'Export')),
    status TEXT NOT NULL DEFAULT 'Not Started' CHECK (status IN (
        'Not Started',
        'Analysis',
        'In Progress',
        'Blocked',
        'Analysis Failed',
        'Stopped',
        'Failed',
        'Finished'
    )),
    description TEXT,
    created_at_us INTEGER NOT NULL,
    start_at_us INTEGER,
    end_at_us INTEGER,
    created_by_id INTEGER NOT NULL,
    results TEXT,
    title TEXT,
    content TEXT,
    gdrive_metadata TEXT
);

CREATE INDEX IF NOT EXISTS ix_import_exports_owner
    ON import_exports(created_by_id, job_type, status);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by the relationship lookup paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "ix_relationships_source",
    "ix_relationships_destination",
    "ix_relationships_parent",
    "ix_relationships_automapping",
    "ix_automappings_relationship",
    "ix_import_exports_owner",
];
