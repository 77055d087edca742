use std::fs;
use std::path::Path;

use boostline_core::domain::order::OrderRecord;
use boostline_core::materializer::{rehydrate, LineDetail};

use super::{CommandResult, ErrorClass};

/// Rehydrates a persisted order record (as the order collaborator returns
/// it) into the display summary, recomputing totals from `order_data`.
pub fn run(record_path: &Path, json_output: bool) -> CommandResult {
    let raw = match fs::read_to_string(record_path) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "order",
                ErrorClass::RecordFile,
                format!("could not read `{}`: {error}", record_path.display()),
            );
        }
    };
    let record: OrderRecord = match serde_json::from_str(&raw) {
        Ok(record) => record,
        Err(error) => {
            return CommandResult::failure(
                "order",
                ErrorClass::RecordFile,
                format!("could not parse order record: {error}"),
            );
        }
    };

    let summary = rehydrate(&record);

    if json_output {
        return match serde_json::to_string_pretty(&summary) {
            Ok(output) => CommandResult::raw(output),
            Err(error) => {
                CommandResult::failure("order", ErrorClass::Serialization, error.to_string())
            }
        };
    }

    let mut out = Vec::new();
    out.push(format!("order {}  state {:?}", summary.id.0, summary.state));
    for line in &summary.lines {
        match line {
            LineDetail::Detailed(line) => out.push(format!(
                "  {} x{}  price {}  tax {}",
                line.product_name, line.quantity, line.price, line.tax
            )),
            LineDetail::Degraded { quantity, .. } => {
                out.push(format!("  (unparsed line) x{quantity}"));
            }
        }
    }
    if let Some(promo) = &summary.promotion {
        out.push(format!("  promotion {} ({}%)", promo.code, promo.discount_percentage));
    }
    out.push(format!(
        "  recomputed total {}  submitted total {}",
        summary.totals.total, summary.submitted_total
    ));
    CommandResult::raw(out.join("\n"))
}
