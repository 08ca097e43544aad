//! `update-handles`: point destination handles at the ARKs listed in a CSV.

use super::open_repository;
use anyhow::Result;
use clap::Args;
use dspace_migrate::{MigrationConfig, UpdateHandlesJob};
use serde_json::json;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct UpdateHandlesArgs {
    /// CSV file with dc.identifier.uri and dc.title columns
    #[arg(long)]
    pub csv: PathBuf,
}

pub fn execute(args: UpdateHandlesArgs, config: &MigrationConfig) -> Result<serde_json::Value> {
    let destination = open_repository(&config.destination)?;
    let outcomes = UpdateHandlesJob::new(&destination).run(&args.csv)?;

    let unresolved: Vec<_> = outcomes
        .iter()
        .filter(|outcome| !outcome.is_resolved())
        .collect();

    Ok(json!({
        "command": "update-handles",
        "rows": outcomes.len(),
        "resolved": outcomes.len() - unresolved.len(),
        "unresolved": unresolved,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{add_item, create_config};
    use super::*;
    use dspace_migrate::SqliteRepository;
    use tempfile::TempDir;

    #[test]
    fn test_update_handles_from_csv() {
        let temp = TempDir::new().unwrap();
        let config = create_config(temp.path());
        {
            let destination = SqliteRepository::open(&config.destination.database_path).unwrap();
            add_item(&destination, 500, "A", "2019-03-04");
            destination
                .connection()
                .execute_batch(
                    "INSERT INTO handle (handle, resource_type_id, resource_id) VALUES ('88435/old', 2, 500);",
                )
                .unwrap();
        }

        let csv = temp.path().join("handles.csv");
        std::fs::write(
            &csv,
            "dc.title,dc.identifier.uri\n\
             A,http://arks.princeton.edu/ark:/88435/dsp01a\n\
             Z,http://arks.princeton.edu/ark:/88435/dsp01z\n",
        )
        .unwrap();

        let summary = execute(UpdateHandlesArgs { csv }, &config).unwrap();

        assert_eq!(summary["rows"], 2);
        assert_eq!(summary["resolved"], 1);
        assert_eq!(summary["unresolved"][0]["title"], "Z");
        assert_eq!(summary["unresolved"][0]["handle"], "88435/dsp01z");
    }

    #[test]
    fn test_missing_csv_fails() {
        let temp = TempDir::new().unwrap();
        let config = create_config(temp.path());

        let result = execute(
            UpdateHandlesArgs {
                csv: temp.path().join("absent.csv"),
            },
            &config,
        );
        assert!(result.is_err());
    }
}
