use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

// Referential integrity between prices and funds is kept by `Session`:
// DuckDB rewrites updates of indexed columns as delete + insert, which a
// declared foreign key would reject for any fund that already has prices.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_funds_and_prices",
        sql: r#"
CREATE TABLE IF NOT EXISTS funds (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    fetch_id TEXT
);

CREATE TABLE IF NOT EXISTS prices (
    id TEXT NOT NULL,
    date TEXT NOT NULL,
    value BIGINT NOT NULL,
    net_assets BIGINT,
    PRIMARY KEY(id, date)
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_funds_name ON funds(name);
CREATE UNIQUE INDEX IF NOT EXISTS idx_funds_url ON funds(url);
CREATE UNIQUE INDEX IF NOT EXISTS idx_funds_fetch_id ON funds(fetch_id);
CREATE INDEX IF NOT EXISTS idx_prices_id ON prices(id);
CREATE INDEX IF NOT EXISTS idx_prices_date ON prices(date);
"#,
    },
];

/// Apply every migration not yet recorded in `schema_migrations`.
///
/// Returns the versions applied by this call, oldest first.
pub fn apply_migrations(connection: &Connection) -> Result<Vec<&'static str>, ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    let mut applied = Vec::new();
    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            tracing::debug!(version = migration.version, "applying migration");
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
            applied.push(migration.version);
        }
    }

    Ok(applied)
}
