//! Integration tests for config parsing against the real config.toml.

use std::path::PathBuf;
use polystatus_core::Config;
use polystatus_core::config::Thresholds;

fn project_root() -> PathBuf {
    // Navigate from crates/polystatus-core/ up to project root
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent() // crates/
        .unwrap()
        .parent() // polystatus/
        .unwrap()
        .to_path_buf()
}

#[test]
fn test_load_real_config() {
    let config_path = project_root().join("config.toml");

    let config = Config::load(&config_path).expect("Failed to load config.toml");

    assert!(!config.battery.device.is_empty(), "Battery device should be set");
    assert!(config.battery.poll_interval_secs > 0);
    assert!(
        config
            .temperature
            .thermal_zone
            .starts_with("/sys/class/thermal"),
        "Thermal zone should live under sysfs"
    );
    assert_eq!(config.menu.program, "rofi");
}

#[test]
fn test_real_config_validates() {
    let config_path = project_root().join("config.toml");
    let config = Config::load(&config_path).unwrap();

    config.validate().expect("Real config.toml should be valid");
}

#[test]
fn test_real_config_thresholds() {
    let config_path = project_root().join("config.toml");
    let config = Config::load(&config_path).unwrap();

    assert_eq!(config.system.cpu, Thresholds::new(60.0, 75.0));
    assert_eq!(config.system.ram, Thresholds::new(55.0, 75.0));
    assert_eq!(config.system.gpu, Thresholds::new(60.0, 75.0));
}

#[test]
fn test_explicit_missing_path_is_an_error() {
    let missing = project_root().join("does-not-exist.toml");
    let err = Config::find_and_load(Some(&missing)).unwrap_err();
    assert!(err.to_string().contains("config file not found"));
}

#[test]
fn test_explicit_path_is_reported_as_source() {
    let config_path = project_root().join("config.toml");
    let result = Config::find_and_load(Some(&config_path)).unwrap();

    assert_eq!(result.source.as_deref(), Some(config_path.as_path()));
    assert!(!result.used_defaults);
}

#[test]
fn test_summary_mentions_every_section() {
    let config = Config::from_default_toml().unwrap();
    let summary = config.summary();

    for heading in ["Battery:", "Temperature:", "System:", "Bluetooth:", "Menu:", "Cava:"] {
        assert!(summary.contains(heading), "summary missing {heading}");
    }
}

#[test]
fn test_broken_config_returns_error_not_defaults() {
    use std::io::Write;

    let temp_dir = std::env::temp_dir()
        .join(format!("polystatus_test_broken_config_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&temp_dir); // Clean up any previous run
    std::fs::create_dir_all(&temp_dir).unwrap();

    let broken_config_path = temp_dir.join("config.toml");
    let mut file = std::fs::File::create(&broken_config_path).unwrap();
    writeln!(file, "this is not valid toml {{{{").unwrap();
    drop(file);

    let result = Config::find_and_load(Some(&broken_config_path));
    assert!(result.is_err(), "Broken config should fail to load");

    std::fs::remove_dir_all(&temp_dir).unwrap();
}

#[test]
fn test_partial_user_config_keeps_defaults() {
    use std::io::Write;

    let temp_dir = std::env::temp_dir()
        .join(format!("polystatus_test_partial_config_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&temp_dir);
    std::fs::create_dir_all(&temp_dir).unwrap();

    let path = temp_dir.join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "[battery]\ndevice = \"BAT1\"").unwrap();
    drop(file);

    let config = Config::load(&path).unwrap();
    assert_eq!(config.battery.device, "BAT1");
    assert_eq!(config.battery.adapter, "AC0");
    assert_eq!(config.cava.settle_ms, 500);

    std::fs::remove_dir_all(&temp_dir).unwrap();
}
