// [libs/infra/store/src/schema.rs]
/*!
 * Structural governance for the relational store: base tables, then
 * column evolutions applied idempotently (a duplicate-column error from a
 * prior run is treated as already-applied, not a failure), then indexes.
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

/// Base entities of the Warden relational store.
const BASE_TABLES: &[(&str, &str)] = &[
    ("TABLE_PROBES", r#"
        CREATE TABLE IF NOT EXISTS probes (
            id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            hostname TEXT,
            ip TEXT,
            os TEXT,
            arch TEXT,
            version TEXT,
            status TEXT NOT NULL DEFAULT 'offline',
            last_seen_ms INTEGER NOT NULL,
            registered_at_ms INTEGER NOT NULL
        );
    "#),
    ("TABLE_ALERT_RULES", r#"
        CREATE TABLE IF NOT EXISTS alert_rules (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            scope_json TEXT NOT NULL,
            kind TEXT NOT NULL,
            threshold REAL NOT NULL,
            duration_s INTEGER NOT NULL,
            network_duration_s INTEGER,
            level TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            notification_json TEXT NOT NULL,
            updated_at_ms INTEGER NOT NULL DEFAULT 0
        );
    "#),
    ("TABLE_ALERT_RECORDS", r#"
        CREATE TABLE IF NOT EXISTS alert_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            probe_id TEXT NOT NULL,
            rule_id TEXT NOT NULL,
            rule_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            message TEXT NOT NULL,
            threshold REAL NOT NULL,
            actual_value REAL NOT NULL,
            level TEXT NOT NULL,
            status TEXT NOT NULL,
            fired_at_ms INTEGER NOT NULL,
            resolved_at_ms INTEGER
        );
    "#),
    ("TABLE_HOST_SNAPSHOTS", r#"
        CREATE TABLE IF NOT EXISTS host_snapshots (
            probe_id TEXT PRIMARY KEY,
            hostname TEXT NOT NULL,
            platform TEXT NOT NULL,
            kernel_version TEXT NOT NULL,
            uptime_s INTEGER NOT NULL,
            boot_time_s INTEGER NOT NULL,
            process_count INTEGER NOT NULL,
            updated_at_ms INTEGER NOT NULL
        );
    "#),
    ("TABLE_AUDIT_RESULTS", r#"
        CREATE TABLE IF NOT EXISTS audit_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            probe_id TEXT NOT NULL,
            received_at_ms INTEGER NOT NULL,
            payload_json TEXT NOT NULL
        );
    "#),
];

/// Column evolutions applied on top of the base tables. Kept separate so
/// an older deployment can be brought forward without a dedicated
/// migration tool.
const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    ("ALERT_RULE_UPDATED_AT", "ALTER TABLE alert_rules ADD COLUMN updated_at_ms INTEGER NOT NULL DEFAULT 0"),
];

/// Indexes sized for the access patterns of the ingest and alert paths.
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_ALERT_RECORDS_LOOKUP", "CREATE INDEX IF NOT EXISTS idx_alert_records_lookup ON alert_records(probe_id, rule_id, kind, status);"),
    ("IDX_ALERT_RECORDS_STATUS", "CREATE INDEX IF NOT EXISTS idx_alert_records_status ON alert_records(status);"),
    ("IDX_AUDIT_RESULTS_PROBE", "CREATE INDEX IF NOT EXISTS idx_audit_results_probe ON audit_results(probe_id, received_at_ms);"),
    ("IDX_PROBES_LAST_SEEN", "CREATE INDEX IF NOT EXISTS idx_probes_last_seen ON probes(last_seen_ms);"),
];

/// Runs the full schema synchronization sequence against a fresh
/// connection. Safe to call on every boot: table creation is
/// `IF NOT EXISTS`, and duplicate-column errors from the evolutionary
/// strata are swallowed as already-applied.
#[instrument(skip(database_connection))]
pub async fn apply_schema(database_connection: &Connection) -> Result<()> {
    info!("applying schema");

    create_base_tables(database_connection).await?;
    apply_evolutionary_strata(database_connection).await?;
    create_indexes(database_connection).await?;

    info!("schema synchronized");
    Ok(())
}

async fn create_base_tables(db: &Connection) -> Result<()> {
    for (identifier, sql) in BASE_TABLES {
        debug!("creating table: {}", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("failed to create table {}", identifier))?;
    }
    Ok(())
}

async fn apply_evolutionary_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        match db.execute(*sql, ()).await {
            Ok(_) => info!("applied column evolution: {}", identifier),
            Err(e) => {
                let message = e.to_string();
                if message.contains("duplicate column name") {
                    debug!("column evolution already applied: {}", identifier);
                } else {
                    warn!("column evolution failed: {} ({})", identifier, message);
                }
            }
        }
    }
    Ok(())
}

async fn create_indexes(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("creating index: {}", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("failed to create index {}", identifier))?;
    }
    Ok(())
}
