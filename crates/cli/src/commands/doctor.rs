use serde::Serialize;

use crate::commands::run_blocking;
use shiftbot_core::config::{AppConfig, LoadOptions};
use shiftbot_core::domain::admin::SYSTEM_GRANTOR;
use shiftbot_db::{connect_with_settings, DbPool};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn skipped(name: &'static str, details: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: details.to_string() }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.extend(store_checks(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            let reason = "skipped because configuration did not load";
            checks.push(skipped("database_connectivity", reason));
            checks.push(skipped("schema_baseline", reason));
            checks.push(skipped("super_admin_seed", reason));
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = if failed {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else if warned {
        (CheckStatus::Warn, "doctor: ready, with warnings")
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn store_checks(config: &AppConfig) -> Vec<DoctorCheck> {
    match run_blocking(run_store_checks(config)) {
        Ok(checks) => checks,
        Err(error) => vec![
            DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: error,
            },
            skipped("schema_baseline", "skipped because no runtime was available"),
            skipped("super_admin_seed", "skipped because no runtime was available"),
        ],
    }
}

async fn run_store_checks(config: &AppConfig) -> Vec<DoctorCheck> {
    let pool = match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => pool,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to connect to database: {error}"),
                },
                skipped("schema_baseline", "skipped because the database is unreachable"),
                skipped("super_admin_seed", "skipped because the database is unreachable"),
            ];
        }
    };

    let mut checks = vec![DoctorCheck {
        name: "database_connectivity",
        status: CheckStatus::Pass,
        details: format!("connected using `{}`", config.database.url),
    }];

    let (schema, schema_complete) = schema_check(&pool).await;
    checks.push(schema);
    if schema_complete {
        checks.push(super_admin_check(&pool).await);
    } else {
        checks.push(skipped("super_admin_seed", "skipped because the baseline schema is incomplete"));
    }

    pool.close().await;
    checks
}

async fn schema_check(pool: &DbPool) -> (DoctorCheck, bool) {
    let counted: Result<i64, sqlx::Error> = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master
         WHERE type = 'table' AND name IN ('users', 'admins', 'slots', 'claims')",
    )
    .fetch_one(pool)
    .await;

    match counted {
        Ok(4) => (
            DoctorCheck {
                name: "schema_baseline",
                status: CheckStatus::Pass,
                details: "all four baseline tables present".to_string(),
            },
            true,
        ),
        Ok(found) => (
            DoctorCheck {
                name: "schema_baseline",
                status: CheckStatus::Fail,
                details: format!("found {found}/4 baseline tables; run `shiftbot migrate`"),
            },
            false,
        ),
        Err(error) => (
            DoctorCheck {
                name: "schema_baseline",
                status: CheckStatus::Fail,
                details: format!("schema inspection failed: {error}"),
            },
            false,
        ),
    }
}

async fn super_admin_check(pool: &DbPool) -> DoctorCheck {
    let counted: Result<i64, sqlx::Error> =
        sqlx::query_scalar("SELECT COUNT(*) FROM admins WHERE added_by = ?")
            .bind(SYSTEM_GRANTOR)
            .fetch_one(pool)
            .await;

    match counted {
        Ok(0) => DoctorCheck {
            name: "super_admin_seed",
            status: CheckStatus::Warn,
            details: "no system-granted admin row; every admin intent will be denied".to_string(),
        },
        Ok(count) => DoctorCheck {
            name: "super_admin_seed",
            status: CheckStatus::Pass,
            details: format!("{count} system-granted admin(s) present"),
        },
        Err(error) => DoctorCheck {
            name: "super_admin_seed",
            status: CheckStatus::Fail,
            details: format!("admin lookup failed: {error}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
