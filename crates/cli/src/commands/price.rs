use std::fs;
use std::path::Path;

use chrono::Utc;

use boostline_core::domain::promotion::Promotion;
use boostline_core::materializer::{materialize, CheckoutGroup};
use boostline_core::selection::LineSelection;

use super::{CommandResult, ErrorClass};

/// Prices a cart file offline: one checkout group per platform, with
/// presentation-rounded totals. The cart file holds a JSON array of cart
/// lines; the optional promotion file holds one promotion object.
pub fn run(cart_path: &Path, promotion_path: Option<&Path>, json_output: bool) -> CommandResult {
    let lines = match read_lines(cart_path) {
        Ok(lines) => lines,
        Err(message) => return CommandResult::failure("price", ErrorClass::CartFile, message),
    };
    if lines.is_empty() {
        return CommandResult::failure("price", ErrorClass::CartFile, "cart file holds no lines");
    }

    let promotion = match promotion_path.map(read_promotion).transpose() {
        Ok(promotion) => promotion,
        Err(message) => {
            return CommandResult::failure("price", ErrorClass::PromotionFile, message)
        }
    };

    let now = Utc::now();
    if let Some(promotion) = &promotion {
        if !promotion.is_active_at(now) {
            return CommandResult::failure(
                "price",
                ErrorClass::PromotionWindow,
                format!("promotion `{}` is not active right now", promotion.code),
            );
        }
    }
    let groups = materialize(&lines, promotion.as_ref(), now);

    if json_output {
        return match serde_json::to_string_pretty(&groups) {
            Ok(output) => CommandResult::raw(output),
            Err(error) => {
                CommandResult::failure("price", ErrorClass::Serialization, error.to_string())
            }
        };
    }

    CommandResult::raw(render_human(&groups))
}

fn read_lines(path: &Path) -> Result<Vec<LineSelection>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("could not read `{}`: {error}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|error| format!("could not parse cart lines from `{}`: {error}", path.display()))
}

fn read_promotion(path: &Path) -> Result<Promotion, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("could not read `{}`: {error}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|error| format!("could not parse promotion from `{}`: {error}", path.display()))
}

fn render_human(groups: &[CheckoutGroup]) -> String {
    let mut out = Vec::new();
    for group in groups {
        out.push(format!("platform {} ({} lines)", group.platform.name, group.lines.len()));
        for line in &group.lines {
            out.push(format!(
                "  {} x{}  price {}  tax {}",
                line.product_name, line.quantity, line.price, line.tax
            ));
        }
        out.push(format!(
            "  subtotal {}  tax {}  discount {}  total {}",
            group.totals.subtotal,
            group.totals.tax_total,
            group.totals.discount_total,
            group.totals.total
        ));
    }
    out.join("\n")
}
