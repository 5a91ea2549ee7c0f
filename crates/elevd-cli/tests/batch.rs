//! End-to-end batch lookups through a YAML config file.

use elevd_cli::{commands, Config};
use serde_json::json;
use std::fs;
use std::path::Path;

fn write_hgt(path: &Path, value: i16) {
    let n = 1201usize;
    let bytes: Vec<u8> = std::iter::repeat(value)
        .take(n * n)
        .flat_map(|s| s.to_be_bytes())
        .collect();
    fs::write(path, bytes).unwrap();
}

#[test]
fn test_batch_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("tiles");
    fs::create_dir(&data).unwrap();
    write_hgt(&data.join("S34E018.hgt"), -9999);
    write_hgt(&data.join("N00E000.hgt"), 0);

    let config_path = dir.path().join("elevd.yaml");
    fs::write(
        &config_path,
        format!("data_folder: {}\nopen_handles: 1\n", data.display()),
    )
    .unwrap();
    let config = Config::load(&config_path).unwrap();
    assert_eq!(config.open_handles, 1);

    let body = json!({
        "locations": [
            {"latitude": 0.5, "longitude": 0.5},
            {"latitude": {"degrees": 33, "minutes": 30, "hemisphere": "S"},
             "longitude": {"degrees": 18, "minutes": 30, "hemisphere": "E"}},
            {"latitude": {"degrees": 33, "minutes": 30, "hemisphere": "E"},
             "longitude": {"degrees": 18, "minutes": 30, "hemisphere": "E"}},
            "0.25,0.25"
        ]
    });
    let requests = commands::read_batch(body.to_string().as_bytes()).unwrap();
    let engine = commands::build_engine(&config).unwrap();
    let response = commands::lookup(&engine, &requests);

    let mut out = Vec::new();
    commands::write_json(&mut out, &response).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(
        value,
        json!({"results": [
            {"latitude": 0.5, "longitude": 0.5, "elevation": 0, "status": "ok"},
            {"latitude": -33.5, "longitude": 18.5, "elevation": null, "status": "no_data"},
            {"latitude": null, "longitude": null, "elevation": null, "status": "error"},
            {"latitude": 0.25, "longitude": 0.25, "elevation": 0, "status": "ok"}
        ]})
    );
}
