//! AxisConfig records through the reference stores.

use anyhow::Result;
use stage_core::units::keys;
use stage_core::{AxisConfig, ConfigStore, MemoryStore, StatusCode, TomlFileStore};

#[test]
fn config_survives_a_file_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = TomlFileStore::new(dir.path().join("stages.toml"), "rotator");

    let mut config = AxisConfig::default()
        .with_units("deg")
        .with_scale(-1.0)
        .with_hard_limits_raw(-108.0, 172.5)
        .with_capabilities(true, true, true);
    config
        .extra
        .insert("serialAxisIndex".into(), toml::Value::Integer(4));
    store.save_all(&config.to_table()?)?;

    let loaded = AxisConfig::from_stored(store.load()?)?;
    assert_eq!(loaded, config);
    assert_eq!(loaded.upper_limit_hard(), 108.0);
    assert_eq!(loaded.lower_limit_hard(), -172.5);

    let text = std::fs::read_to_string(store.path())?;
    assert!(text.contains("[rotator]"));
    assert!(text.contains("serialAxisIndex = 4"));
    Ok(())
}

#[test]
fn partial_record_is_completed_with_defaults() -> Result<()> {
    let mut record = toml::Table::new();
    record.insert(keys::HAS_INDEX.into(), toml::Value::Boolean(true));
    record.insert(keys::LOWER_LIMIT_SOFT_RAW.into(), toml::Value::Float(5.0));
    record.insert(keys::UPPER_LIMIT_SOFT_RAW.into(), toml::Value::Float(-5.0));
    let store = MemoryStore::with_record(record);

    let config = AxisConfig::from_stored(store.load()?)?;
    assert!(config.has_index);
    assert_eq!(config.axis_units, "mm");
    assert_eq!(config.lower_limit_soft_raw(), -5.0);
    assert_eq!(config.upper_limit_soft_raw(), 5.0);
    Ok(())
}

#[test]
fn rejected_soft_limit_leaves_record_unchanged() {
    let mut config = AxisConfig::default()
        .with_scale(100.0)
        .with_hard_limits_raw(0.0, 20_000.0);
    let before = config.clone();

    assert_eq!(
        config.set_upper_limit_soft(250.0),
        Err(StatusCode::DestAboveUpperLimit)
    );
    assert_eq!(
        config.set_lower_limit_soft(-1.0),
        Err(StatusCode::DestBelowLowerLimit)
    );
    assert_eq!(config, before);

    assert_eq!(config.set_upper_limit_soft(150.0), Ok(keys::UPPER_LIMIT_SOFT_RAW));
    assert_eq!(config.upper_limit_soft(), 150.0);
}
