#![allow(clippy::unwrap_used)]

use std::io::Write;

use probeflow::utils::ConfigValidator;
use probeflow::{schema_exports, EngineConfig, ProbeFlowError};

#[test]
fn engine_config_loads_from_file() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"{{
            "agent_name": "walkthrough",
            "intro": "Hello there",
            "stages": {{ "objective": "What is the goal?" }},
            "computer_use": {{ "iteration_cap": 7 }},
            "actuator": {{ "url": "ws://127.0.0.1:9300", "secret": "${{WALKTHROUGH_SECRET}}" }},
            "codec": {{ "max_width": 1280, "max_attempts": 4 }},
            "model": {{ "endpoint": "https://api.example.com/v1/messages", "model": "vision-large" }}
        }}"#
    )?;

    let config = EngineConfig::from_path(file.path())?;
    ConfigValidator::validate_engine(&config)?;

    assert_eq!(config.agent_name, "walkthrough");
    assert_eq!(config.stages.objective, "What is the goal?");
    assert!(config.stages.metrics.contains("metric"));
    assert_eq!(config.computer_use.iteration_cap, 7);
    assert_eq!(config.codec.max_width, 1280);
    assert_eq!(config.codec.max_attempts, 4);
    assert_eq!(config.codec.quality_floor, 60);
    assert_eq!(config.model.as_ref().unwrap().max_tokens, 4096);
    Ok(())
}

#[test]
fn actuator_secret_resolves_from_env() -> anyhow::Result<()> {
    let config = EngineConfig::from_json(
        r#"{"actuator":{"url":"ws://localhost:1","secret":"${PROBEFLOW_CONFIG_TEST_SECRET}"}}"#,
    )?;
    std::env::set_var("PROBEFLOW_CONFIG_TEST_SECRET", "from-env");
    let secret = config.actuator.as_ref().unwrap().resolved_secret()?;
    std::env::remove_var("PROBEFLOW_CONFIG_TEST_SECRET");
    assert_eq!(secret, "from-env");
    Ok(())
}

#[test]
fn missing_file_is_a_config_error() {
    let err = EngineConfig::from_path("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, ProbeFlowError::Config(_)));
}

#[test]
fn invalid_values_fail_validation() -> anyhow::Result<()> {
    let config = EngineConfig::from_json(r#"{"codec":{"initial_quality":0}}"#)?;
    assert!(ConfigValidator::validate_engine(&config).is_err());

    let config = EngineConfig::from_json(r#"{"model":{"endpoint":"api.example.com","model":"m"}}"#)?;
    assert!(ConfigValidator::validate_engine(&config).is_err());
    Ok(())
}

#[test]
fn exported_schemas_match_node_envelopes() {
    let entries = schema_exports();
    let objective = entries.iter().find(|e| e.name == "objective").unwrap();
    assert_eq!(objective.carrier, "workflow_context");
    assert_eq!(
        objective.schema["properties"]["contexts"]["items"]["required"],
        serde_json::json!(["description"])
    );
    let action = entries.iter().find(|e| e.name == "computer_action").unwrap();
    assert_eq!(action.carrier, "computer");
}
