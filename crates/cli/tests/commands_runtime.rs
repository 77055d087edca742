use std::fs;
use std::sync::{Mutex, OnceLock};

use serde_json::{json, Value};
use tempfile::TempDir;

use boostline_cli::commands::{config, doctor, order, price};

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn env_guard() -> std::sync::MutexGuard<'static, ()> {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned")
}

fn cart_lines() -> Value {
    json!([
        {
            "productId": "coaching",
            "productName": "Coaching Hour",
            "platform": {"id": "pc", "name": "PC"},
            "quantity": 2,
            "price": "10.00",
            "tax": "1.00",
            "itemQty": 2,
            "kind": {"mode": "flat"},
            "startLabel": null,
            "endLabel": null
        },
        {
            "productId": "rank-boost",
            "productName": "Rank Boost",
            "platform": {"id": "xbox", "name": "Xbox"},
            "quantity": 1,
            "price": "25.00",
            "tax": "0.50",
            "itemQty": 4,
            "kind": {"mode": "dropdown_range", "start": 0, "end": 4},
            "startLabel": "Silver",
            "endLabel": "Diamond"
        }
    ])
}

#[test]
fn price_emits_one_group_per_platform() {
    let dir = TempDir::new().expect("tempdir");
    let cart_path = dir.path().join("cart.json");
    fs::write(&cart_path, cart_lines().to_string()).expect("write cart");

    let result = price::run(&cart_path, None, true);
    assert_eq!(result.exit_code, 0, "expected pricing success");

    let groups = parse_payload(&result.output);
    let groups = groups.as_array().expect("groups array");
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["platform"]["id"], "pc");
    assert_eq!(groups[0]["totals"]["total"], "22.00");
    assert_eq!(groups[1]["platform"]["id"], "xbox");
    // 25.00 range price plus 4 units of 0.50 tax folded into the line.
    assert_eq!(groups[1]["totals"]["total"], "27.00");
}

#[test]
fn price_rejects_an_expired_promotion() {
    let dir = TempDir::new().expect("tempdir");
    let cart_path = dir.path().join("cart.json");
    fs::write(&cart_path, cart_lines().to_string()).expect("write cart");

    let promo_path = dir.path().join("promo.json");
    let promotion = json!({
        "id": "promo-old",
        "code": "OLD",
        "discountPercentage": "20",
        "startDate": "2020-01-01T00:00:00Z",
        "endDate": "2020-02-01T00:00:00Z"
    });
    fs::write(&promo_path, promotion.to_string()).expect("write promotion");

    let result = price::run(&cart_path, Some(&promo_path), true);
    assert_eq!(result.exit_code, 3, "expected promotion window failure");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "price");
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "promotion_window");
}

#[test]
fn price_fails_cleanly_on_a_missing_file() {
    let result = price::run(std::path::Path::new("/definitely/not/here.json"), None, true);
    assert_eq!(result.exit_code, 2);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "cart_file");
}

#[test]
fn order_rehydrates_a_record_with_a_degraded_line() {
    let dir = TempDir::new().expect("tempdir");
    let record_path = dir.path().join("order.json");
    let record = json!({
        "id": "ord-1",
        "order_data": [
            "{\"productId\":\"coaching\",\"productName\":\"Coaching Hour\",\"quantity\":2,\"price\":\"10.00\",\"tax\":\"1.00\",\"itemQty\":2}",
            "{\"quantity\": 5}"
        ],
        "promo_data": null,
        "platform": null,
        "state": "in_progress",
        "total_price": "22.00",
        "created_at": "2026-08-01T12:00:00Z"
    });
    fs::write(&record_path, record.to_string()).expect("write record");

    let result = order::run(&record_path, true);
    assert_eq!(result.exit_code, 0, "expected rehydration success");

    let summary = parse_payload(&result.output);
    assert_eq!(summary["state"], "in_progress");
    assert_eq!(summary["lines"][0]["detail"], "detailed");
    assert_eq!(summary["lines"][1]["detail"], "degraded");
    assert_eq!(summary["lines"][1]["quantity"], 5);
    assert_eq!(summary["totals"]["total"], "22.00");
    assert_eq!(summary["submittedTotal"], "22.00");
}

#[test]
fn doctor_reports_pass_with_default_config() {
    let _guard = env_guard();
    let output = doctor::run(true);
    let report = parse_payload(&output);
    assert_eq!(report["overall_status"], "pass");
    assert_eq!(report["checks"][0]["name"], "config_validation");
}

#[test]
fn config_never_prints_the_api_key() {
    let _guard = env_guard();
    std::env::set_var("BOOSTLINE_CHECKOUT_API_KEY", "sk_live_should_not_print");
    let output = config::run();
    std::env::remove_var("BOOSTLINE_CHECKOUT_API_KEY");

    assert!(!output.contains("sk_live_should_not_print"));
    assert!(output.contains("[redacted]"));
}
