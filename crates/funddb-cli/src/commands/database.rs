use serde::Serialize;

use crate::cli::DatabaseCommand;
use crate::error::CliError;

use super::{AppContext, CommandOutput, CommandPath};

#[derive(Debug, Serialize)]
struct AppliedMigration {
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct SchemaSummary {
    db_path: String,
    applied: usize,
}

pub fn run(
    command: &DatabaseCommand,
    app: &AppContext,
    path: CommandPath,
) -> Result<CommandOutput, CliError> {
    match command {
        DatabaseCommand::InitSchema => init_schema(app, path.child("init-schema")),
    }
}

fn init_schema(app: &AppContext, path: CommandPath) -> Result<CommandOutput, CliError> {
    tracing::debug!(command = %path, "running");
    let applied = app
        .warehouse
        .initialize()?
        .into_iter()
        .map(|version| AppliedMigration { version })
        .collect::<Vec<_>>();

    let summary = SchemaSummary {
        db_path: app.warehouse.db_path().display().to_string(),
        applied: applied.len(),
    };
    CommandOutput::new(path, &["version"])
        .with_records(&applied)?
        .with_summary(&summary)
}
