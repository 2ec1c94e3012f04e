// src/config/validate.rs

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, RawConfigFile, RawReaderSection, ReaderSettings};
use crate::errors::{Result, SteplogError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SteplogError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let reader = validate_reader(raw.reader)?;
        Ok(ConfigFile::new_unchecked(reader))
    }
}

fn validate_reader(raw: RawReaderSection) -> Result<ReaderSettings> {
    let pod_wait_timeout = parse_duration(&raw.pod_wait_timeout).map_err(|e| {
        SteplogError::ConfigError(format!("[reader].pod_wait_timeout: {e}"))
    })?;
    if pod_wait_timeout.is_zero() {
        return Err(SteplogError::ConfigError(
            "[reader].pod_wait_timeout must be greater than zero".to_string(),
        ));
    }

    if raw.channel_capacity == 0 {
        return Err(SteplogError::ConfigError(
            "[reader].channel_capacity must be >= 1 (got 0)".to_string(),
        ));
    }

    if raw.pipeline_task_label.trim().is_empty() {
        return Err(SteplogError::ConfigError(
            "[reader].pipeline_task_label must not be empty".to_string(),
        ));
    }

    Ok(ReaderSettings {
        pod_wait_timeout,
        channel_capacity: raw.channel_capacity,
        container_prefix: raw.container_prefix,
        pipeline_task_label: raw.pipeline_task_label,
        describe_command: raw.describe_command,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn parse(toml_text: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_text)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg, ConfigFile::default());
        assert_eq!(cfg.reader.pod_wait_timeout, Duration::from_secs(10));
        assert_eq!(cfg.reader.container_prefix, "step-");
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = parse(
            r#"
[reader]
pod_wait_timeout = "1500ms"
channel_capacity = 1
container_prefix = ""
"#,
        )
        .unwrap();
        assert_eq!(cfg.reader.pod_wait_timeout, Duration::from_millis(1500));
        assert_eq!(cfg.reader.channel_capacity, 1);
        assert_eq!(cfg.reader.container_prefix, "");
        assert_eq!(cfg.reader.pipeline_task_label, "tekton.dev/pipelineTask");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        match parse("[reader]\npod_wait_timeout = \"0s\"\n") {
            Err(SteplogError::ConfigError(msg)) => assert!(msg.contains("pod_wait_timeout")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn zero_capacity_is_rejected() {
        match parse("[reader]\nchannel_capacity = 0\n") {
            Err(SteplogError::ConfigError(msg)) => assert!(msg.contains("channel_capacity")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }
}
