use nebo_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
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

const DEPENDENT_CHECKS: [&str; 5] = [
    "slack_verification",
    "crm_credentials",
    "analytics_credentials",
    "site_index_credentials",
    "fire_doc_folder",
];

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

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let details = if config.dev_mode {
                "configuration loaded in dev mode".to_string()
            } else {
                "configuration loaded and validated".to_string()
            };
            checks.push(DoctorCheck { name: "config_validation", status: CheckStatus::Pass, details });
            checks.push(check_slack_verification(&config));
            checks.push(credential_check(
                "crm_credentials",
                config.crm.is_configured(),
                "/nebo and /neboidss",
            ));
            checks.push(credential_check(
                "analytics_credentials",
                config.analytics.is_configured(),
                "/nebo",
            ));
            checks.push(credential_check(
                "site_index_credentials",
                config.site_index.is_configured(),
                "/neboid and /neboidnx",
            ));
            checks.push(check_fire_doc_folder(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in DEPENDENT_CHECKS {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_verification(config: &AppConfig) -> DoctorCheck {
    if config.slack.verification_token.expose_secret().trim().is_empty() {
        DoctorCheck {
            name: "slack_verification",
            status: CheckStatus::Fail,
            details: "slack.verification_token is blank; every slash command will be rejected"
                .to_string(),
        }
    } else {
        DoctorCheck {
            name: "slack_verification",
            status: CheckStatus::Pass,
            details: "verification token present".to_string(),
        }
    }
}

fn credential_check(name: &'static str, configured: bool, commands: &str) -> DoctorCheck {
    if configured {
        DoctorCheck { name, status: CheckStatus::Pass, details: "credentials present".to_string() }
    } else {
        DoctorCheck {
            name,
            status: CheckStatus::Fail,
            details: format!("credentials missing; {commands} will report missing credentials"),
        }
    }
}

fn check_fire_doc_folder(config: &AppConfig) -> DoctorCheck {
    if config.docs.fire_doc_folder_id.trim().is_empty() {
        DoctorCheck {
            name: "fire_doc_folder",
            status: CheckStatus::Fail,
            details: "docs.fire_doc_folder_id is blank; /fire will link an empty folder".to_string(),
        }
    } else {
        DoctorCheck {
            name: "fire_doc_folder",
            status: CheckStatus::Pass,
            details: format!("fire docs folder `{}`", config.docs.fire_doc_folder_id),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
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
