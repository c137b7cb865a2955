use crate::commands::{open_pool, prepare, CommandFailure, CommandResult};
use vendorhub_db::migrations;

pub fn run() -> CommandResult {
    CommandResult::from_outcome("migrate", execute())
}

fn execute() -> Result<String, CommandFailure> {
    let (config, runtime) = prepare()?;

    runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let before = migrations::applied_versions(&pool).await.map_err(ledger_failure)?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| CommandFailure::new("migration", error.to_string(), 5))?;
        let after = migrations::applied_versions(&pool).await.map_err(ledger_failure)?;
        pool.close().await;

        Ok(summarize(&before, &after))
    })
}

fn ledger_failure(error: impl std::fmt::Display) -> CommandFailure {
    CommandFailure::new("migration", format!("failed to read migration ledger: {error}"), 5)
}

fn summarize(before: &[i64], after: &[i64]) -> String {
    let newly_applied: Vec<String> = after
        .iter()
        .filter(|version| !before.contains(version))
        .map(ToString::to_string)
        .collect();
    let schema_version = after.last().map_or_else(|| "none".to_string(), ToString::to_string);

    if newly_applied.is_empty() {
        format!("schema up to date at version {schema_version}")
    } else {
        format!(
            "applied {} pending migration(s) [{}]; schema at version {schema_version}",
            newly_applied.len(),
            newly_applied.join(", ")
        )
    }
}
