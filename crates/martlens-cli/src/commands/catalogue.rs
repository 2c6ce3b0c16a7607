use martlens_reports::Catalogue;
use serde_json::{json, Value};

use crate::error::CliError;

use super::CommandResult;

pub fn run() -> Result<CommandResult, CliError> {
    let entries = Catalogue::standard()
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            json!({
                "position": index + 1,
                "name": entry.name(),
                "title": entry.title(),
                "category": entry.category(),
            })
        })
        .collect::<Vec<Value>>();

    Ok(CommandResult::ok(json!({ "entries": entries })))
}
