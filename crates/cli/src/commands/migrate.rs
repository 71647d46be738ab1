use crate::commands::{exit_codes, run_blocking, CommandResult};
use shiftbot_core::config::{AppConfig, LoadOptions};
use shiftbot_db::{connect_with_settings, migrations};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                exit_codes::CONFIG,
            );
        }
    };

    let outcome = run_blocking(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), exit_codes::DB_CONNECTIVITY))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), exit_codes::STORE))?;

        // Report what the schema holds so the operator can tell a fresh
        // database from a populated one.
        let slots: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM slots")
            .fetch_one(&pool)
            .await
            .map_err(|error| ("query", error.to_string(), exit_codes::STORE))?;
        let claims: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM claims")
            .fetch_one(&pool)
            .await
            .map_err(|error| ("query", error.to_string(), exit_codes::STORE))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>((slots, claims))
    });

    let result = match outcome {
        Ok(result) => result,
        Err(error) => {
            return CommandResult::failure("migrate", "runtime_init", error, exit_codes::RUNTIME)
        }
    };

    match result {
        Ok((slots, claims)) => CommandResult::success(
            "migrate",
            format!("migrations applied; {slots} slots and {claims} claims on record"),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
