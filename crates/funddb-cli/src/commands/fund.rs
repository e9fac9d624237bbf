use funddb_core::{import_files, FetchId, FundChanges, FundRecord, ValidationError};
use serde::Serialize;

use crate::cli::{FundAddArgs, FundCommand, FundDeleteArgs, FundImportArgs, FundModifyArgs};
use crate::error::CliError;

use super::{AppContext, CommandOutput, CommandPath};

const FUND_COLUMNS: &[&str] = &["id", "name", "url", "fetch_id"];

#[derive(Debug, Serialize)]
struct DeletedFund {
    id: String,
    prices_deleted: usize,
}

pub fn run(command: &FundCommand, app: &AppContext, path: CommandPath) -> Result<CommandOutput, CliError> {
    match command {
        FundCommand::Import(args) => import(args, app, path.child("import")),
        FundCommand::List => list(app, path.child("list")),
        FundCommand::Add(args) => add(args, app, path.child("add")),
        FundCommand::Modify(args) => modify(args, app, path.child("modify")),
        FundCommand::Delete(args) => delete(args, app, path.child("delete")),
    }
}

fn import(args: &FundImportArgs, app: &AppContext, path: CommandPath) -> Result<CommandOutput, CliError> {
    tracing::debug!(command = %path, files = args.files.len(), "running");
    let report = import_files(&app.warehouse, &args.files)?;
    CommandOutput::new(path, &[]).with_summary(&report)
}

fn list(app: &AppContext, path: CommandPath) -> Result<CommandOutput, CliError> {
    tracing::debug!(command = %path, "running");
    let funds = app.warehouse.transaction(|session| session.list_funds())?;
    CommandOutput::new(path, FUND_COLUMNS).with_records(&funds)
}

fn add(args: &FundAddArgs, app: &AppContext, path: CommandPath) -> Result<CommandOutput, CliError> {
    tracing::debug!(command = %path, fund_id = %args.id, "running");
    let id = args.id.trim();
    if id.is_empty() {
        return Err(ValidationError::EmptyFundId.into());
    }
    let fetch_id = args.fetch_id.as_deref().map(checked_fetch_id).transpose()?;
    let fund = FundRecord::new(id, args.name.trim(), args.url.trim(), fetch_id);

    app.warehouse
        .transaction(|session| session.insert_fund(&fund))?;
    CommandOutput::new(path, FUND_COLUMNS).with_records(&[fund])
}

fn modify(args: &FundModifyArgs, app: &AppContext, path: CommandPath) -> Result<CommandOutput, CliError> {
    tracing::debug!(command = %path, fund_id = %args.id, "running");
    let fetch_id = if args.clear_fetch_id {
        Some(None)
    } else {
        args.fetch_id
            .as_deref()
            .map(checked_fetch_id)
            .transpose()?
            .map(Some)
    };
    let changes = FundChanges {
        name: args.name.as_deref().map(|name| name.trim().to_owned()),
        url: args.url.as_deref().map(|url| url.trim().to_owned()),
        fetch_id,
    };
    if changes.is_empty() {
        return Err(CliError::Command(String::from(
            "nothing to modify, pass --name, --url, --fetch-id or --clear-fetch-id",
        )));
    }

    let fund = app
        .warehouse
        .transaction(|session| session.modify_fund(&args.id, &changes))?;
    CommandOutput::new(path, FUND_COLUMNS).with_records(&[fund])
}

fn delete(args: &FundDeleteArgs, app: &AppContext, path: CommandPath) -> Result<CommandOutput, CliError> {
    tracing::debug!(command = %path, funds = args.ids.len(), "running");
    let deleted = app.warehouse.transaction(|session| {
        args.ids
            .iter()
            .map(|id| {
                let prices_deleted = session.delete_fund(id)?;
                tracing::info!(fund_id = %id, prices_deleted, "fund deleted");
                Ok(DeletedFund {
                    id: id.clone(),
                    prices_deleted,
                })
            })
            .collect::<Result<Vec<_>, CliError>>()
    })?;
    CommandOutput::new(path, &["id", "prices_deleted"]).with_records(&deleted)
}

/// Reject identifiers no registered adapter could serve.
fn checked_fetch_id(raw: &str) -> Result<String, ValidationError> {
    let fetch_id = FetchId::parse(raw)?;
    fetch_id.provider()?;
    Ok(fetch_id.as_str().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_ids_are_checked_before_writing() {
        assert_eq!(checked_fetch_id(" ammufg:253425 ").as_deref(), Ok("ammufg:253425"));
        assert!(matches!(
            checked_fetch_id("253425"),
            Err(ValidationError::InvalidFetchId { .. })
        ));
        assert!(matches!(
            checked_fetch_id("nomura:1"),
            Err(ValidationError::UnknownScheme { .. })
        ));
    }
}
