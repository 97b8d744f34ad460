//! Integration tests for command output
//!
//! These run the real binary against local files only; no command here
//! reaches the network.

use std::path::Path;
use std::process::{Command, Output};

const ANALYSIS: &str = r#"{
    "flux_stats": {"mean": 1150.0, "min": 900.0, "max": 1300.0},
    "usable_roof_area_sq_meters": 30.0,
    "estimated_capacity_kwp": 5.0,
    "data_source": "PVGIS",
    "has_imagery": false,
    "note": "Estimates based on modeled radiation data."
}"#;

fn solarmatch(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_solarmatch"))
        .current_dir(dir)
        .env_remove("SOLARMATCH_API_URL")
        .env_remove("SOLARMATCH_RADIUS")
        .env_remove("SOLARMATCH_HEATMAP_SCHEME")
        .env_remove("SOLARMATCH_TIMEOUT_SECS")
        .env_remove("SOLARMATCH_PRICING_FILE")
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn parse_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

#[test]
fn test_finance_json_output_is_valid() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("analysis.json"), ANALYSIS).unwrap();

    let output = solarmatch(dir.path(), &["finance", "--input", "analysis.json", "--json"]);
    assert!(output.status.success(), "Command should succeed");

    let parsed = parse_json(&output);
    assert_eq!(parsed["status"], "success");

    let data = parsed.get("data").expect("Should have data field");
    assert_eq!(data["capacity_kwp"], 5.0);
    assert_eq!(data["data_source"], "modeled");
    // 5 kWp falls in the medium tier; the grant bands add up to exactly the cap
    assert_eq!(data["cost"]["pricing_tier"], "medium");
    assert_eq!(data["cost"]["gross_cost"], 6500.0);
    assert_eq!(data["cost"]["grant"], 1800.0);
}

#[test]
fn test_render_without_imagery_writes_pdf() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("analysis.json"), ANALYSIS).unwrap();

    let output = solarmatch(
        dir.path(),
        &[
            "render",
            "--input",
            "analysis.json",
            "--no-imagery",
            "--out",
            "report.pdf",
            "--json",
        ],
    );
    assert!(output.status.success(), "Command should succeed");

    let parsed = parse_json(&output);
    let data = parsed.get("data").expect("Should have data field");
    assert!(data["pages"].as_u64().unwrap() >= 1);
    assert_eq!(data["images"], 0);

    let pdf = std::fs::read(dir.path().join("report.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[test]
fn test_render_with_unreadable_image_still_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("analysis.json"), ANALYSIS).unwrap();
    std::fs::write(dir.path().join("roof.png"), b"not a png").unwrap();

    let output = solarmatch(
        dir.path(),
        &[
            "render",
            "--input",
            "analysis.json",
            "--primary",
            "roof.png",
            "--out",
            "report.pdf",
            "--json",
        ],
    );
    assert!(output.status.success(), "Command should succeed");
    assert_eq!(parse_json(&output)["data"]["images"], 0);
    assert!(dir.path().join("report.pdf").exists());
}

#[test]
fn test_config_reports_sources() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("solarmatch.toml"), "radius_meters = 75.0\n").unwrap();

    let output = solarmatch(
        dir.path(),
        &["config", "--api-url", "http://example.test:9000", "--json"],
    );
    assert!(output.status.success(), "Command should succeed");

    let parsed = parse_json(&output);
    let rows = parsed["data"].as_array().expect("data should be a list");
    let row = |key: &str| {
        rows.iter()
            .find(|r| r["key"] == key)
            .unwrap_or_else(|| panic!("missing {}", key))
            .clone()
    };

    assert_eq!(row("radius_meters")["source"], "File");
    assert_eq!(row("api_base_url")["value"], "http://example.test:9000");
    assert_eq!(row("api_base_url")["source"], "Cli");
    assert_eq!(row("heatmap_scheme")["source"], "Default");
}

#[test]
fn test_invalid_coordinates_fail_before_any_request() {
    let dir = tempfile::tempdir().unwrap();

    let output = solarmatch(
        dir.path(),
        &["report", "--lat", "123.0", "--lon", "0.0", "--api-url", "http://127.0.0.1:9"],
    );
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("latitude"), "stderr was: {}", stderr);
    assert!(!dir.path().join("solar-report.pdf").exists());
}
