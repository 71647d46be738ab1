use chrono::Local;

use crate::commands::{exit_codes, run_blocking, CommandResult};
use shiftbot_core::config::{AppConfig, LoadOptions};
use shiftbot_core::domain::slot::FillState;
use shiftbot_core::timeparse::{format_duration, format_short};
use shiftbot_db::repositories::{SlotRepository, SqlSlotRepository};
use shiftbot_db::connect_with_settings;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "status",
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

        let slots = SqlSlotRepository::new(pool.clone())
            .list_upcoming(Local::now().naive_local())
            .await
            .map_err(|error| ("query", error.to_string(), exit_codes::STORE))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(slots)
    });

    let result = match outcome {
        Ok(result) => result,
        Err(error) => {
            return CommandResult::failure("status", "runtime_init", error, exit_codes::RUNTIME)
        }
    };

    match result {
        Ok(slots) if slots.is_empty() => CommandResult::success("status", "no upcoming slots"),
        Ok(slots) => {
            let lines: Vec<String> = slots
                .iter()
                .map(|slot| {
                    let state = match slot.fill_state() {
                        FillState::Open => "open",
                        FillState::Full => "full",
                    };
                    format!(
                        "{} ({}) {}/{} {}",
                        format_short(slot.slot_at),
                        format_duration(slot.duration_minutes),
                        slot.current_count,
                        slot.capacity,
                        state,
                    )
                })
                .collect();
            CommandResult::success("status", lines.join("\n"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("status", error_class, message, exit_code)
        }
    }
}
