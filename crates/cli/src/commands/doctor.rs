use serde::Serialize;

use boostline_client::{
    shared_client, HttpCatalogService, HttpCheckoutService, HttpOrderService, HttpPromotionService,
};
use boostline_core::config::{AppConfig, LoadOptions, StorageBackend};
use boostline_storage::{ClientStorage, FileStorage, MemoryStorage};

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

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('"', "\\\"")
            )
        });
    }

    render_human(&report)
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
            checks.push(check_storage(&config));
            checks.push(check_collaborator_clients(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "storage_readiness",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "collaborator_clients",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
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

/// Writes, reads back, and removes a probe key on the configured backend.
fn check_storage(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "storage_readiness",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let storage: Box<dyn ClientStorage> = match config.storage.backend {
            StorageBackend::Memory => Box::new(MemoryStorage::new()),
            StorageBackend::File => match &config.storage.path {
                Some(path) => Box::new(FileStorage::new(path)),
                None => return Err("file backend configured without a path".to_string()),
            },
        };

        storage
            .set("doctor_probe", "ok".to_string())
            .await
            .map_err(|error| format!("probe write failed: {error}"))?;
        let read_back = storage
            .get("doctor_probe")
            .await
            .map_err(|error| format!("probe read failed: {error}"))?;
        storage
            .remove("doctor_probe")
            .await
            .map_err(|error| format!("probe cleanup failed: {error}"))?;

        if read_back.as_deref() == Some("ok") {
            Ok(())
        } else {
            Err("probe value did not read back".to_string())
        }
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "storage_readiness",
            status: CheckStatus::Pass,
            details: format!("{:?} backend accepted a probe write", config.storage.backend),
        },
        Err(details) => {
            DoctorCheck { name: "storage_readiness", status: CheckStatus::Fail, details }
        }
    }
}

/// Builds the shared HTTP client and constructs all four collaborators from
/// the effective config, without putting anything on the wire.
fn check_collaborator_clients(config: &AppConfig) -> DoctorCheck {
    let client = match shared_client() {
        Ok(client) => client,
        Err(error) => {
            return DoctorCheck {
                name: "collaborator_clients",
                status: CheckStatus::Fail,
                details: format!("failed to build the shared http client: {error}"),
            };
        }
    };

    let _ = HttpCatalogService::from_config(client.clone(), &config.catalog);
    let _ = HttpPromotionService::from_config(client.clone(), &config.promotion);
    let _ = HttpCheckoutService::from_config(client.clone(), &config.checkout);
    let _ = HttpOrderService::from_config(client, &config.orders);

    DoctorCheck {
        name: "collaborator_clients",
        status: CheckStatus::Pass,
        details: "catalog, promotion, checkout, and order clients constructed".to_string(),
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
        lines.push(format!("  [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
