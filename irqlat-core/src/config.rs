// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Validates the monitor configuration before any device is touched.
//! Any invalid field results in a HardValidationError that prevents startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{HardValidationError, IrqLatError, IrqLatResult};
use crate::sampler::WaitPolicy;
use crate::types::{PinIndex, RegisterAddress};

/// Raw device paths as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDevices {
    #[serde(default = "default_memory_device")]
    memory: String,
    #[serde(default = "default_interrupt_device")]
    interrupt: String,
    #[serde(default = "default_accounting_file")]
    accounting: String,
}

fn default_memory_device() -> String {
    "/dev/mem".to_string()
}

fn default_interrupt_device() -> String {
    "/dev/gpio_int".to_string()
}

fn default_accounting_file() -> String {
    "/proc/interrupts".to_string()
}

impl Default for RawDevices {
    fn default() -> Self {
        Self {
            memory: default_memory_device(),
            interrupt: default_interrupt_device(),
            accounting: default_accounting_file(),
        }
    }
}

/// Raw measurement parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMeasurement {
    #[serde(default = "default_register_address")]
    register_address: String,
    #[serde(default)]
    pin: u32,
    #[serde(default = "default_sets")]
    sets: usize,
    #[serde(default = "default_samples")]
    samples: usize,
    #[serde(default = "default_accounting_prefix")]
    accounting_prefix: String,
    #[serde(default)]
    wait_timeout_ms: Option<u64>,
}

fn default_register_address() -> String {
    "0x43C10000".to_string()
}

fn default_sets() -> usize {
    1
}

fn default_samples() -> usize {
    10_000
}

fn default_accounting_prefix() -> String {
    "164".to_string()
}

impl Default for RawMeasurement {
    fn default() -> Self {
        Self {
            register_address: default_register_address(),
            pin: 0,
            sets: default_sets(),
            samples: default_samples(),
            accounting_prefix: default_accounting_prefix(),
            wait_timeout_ms: None,
        }
    }
}

/// Raw output settings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutput {
    #[serde(default = "default_result_log")]
    result_log: String,
}

fn default_result_log() -> String {
    "latency.csv".to_string()
}

impl Default for RawOutput {
    fn default() -> Self {
        Self {
            result_log: default_result_log(),
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    devices: RawDevices,
    #[serde(default)]
    measurement: RawMeasurement,
    #[serde(default)]
    output: RawOutput,
}

/// Validated device paths.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub memory: PathBuf,
    pub interrupt: PathBuf,
    pub accounting: PathBuf,
}

/// Validated measurement parameters.
#[derive(Debug, Clone)]
pub struct MeasurementConfig {
    pub register_address: RegisterAddress,
    pub pin: PinIndex,
    pub sets: usize,
    pub samples: usize,
    pub accounting_prefix: String,
    pub wait: WaitPolicy,
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub devices: DeviceConfig,
    pub measurement: MeasurementConfig,
    pub result_log: PathBuf,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    /// Returns HardValidationError for any invalid fields.
    pub fn load_file(path: impl AsRef<Path>) -> IrqLatResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(IrqLatError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| IrqLatError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> IrqLatResult<Config> {
        let raw: RawConfig = if content.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| IrqLatError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?
        };

        Self::validate(raw)
    }

    /// Built-in defaults, used when no configuration file is given.
    pub fn defaults() -> IrqLatResult<Config> {
        Self::validate(RawConfig::default())
    }

    fn validate(raw: RawConfig) -> IrqLatResult<Config> {
        let devices = Self::validate_devices(raw.devices)?;
        let measurement = Self::validate_measurement(raw.measurement)?;

        if raw.output.result_log.trim().is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "output.result_log",
                value: raw.output.result_log,
                reason: "Result log path cannot be empty".to_string(),
            }
            .into());
        }

        Ok(Config {
            devices,
            measurement,
            result_log: PathBuf::from(raw.output.result_log),
        })
    }

    fn validate_devices(raw: RawDevices) -> IrqLatResult<DeviceConfig> {
        for (field, value) in [
            ("devices.memory", &raw.memory),
            ("devices.interrupt", &raw.interrupt),
            ("devices.accounting", &raw.accounting),
        ] {
            if value.trim().is_empty() {
                return Err(HardValidationError::InvalidFieldValue {
                    field,
                    value: value.clone(),
                    reason: "Device path cannot be empty".to_string(),
                }
                .into());
            }
        }

        Ok(DeviceConfig {
            memory: PathBuf::from(raw.memory),
            interrupt: PathBuf::from(raw.interrupt),
            accounting: PathBuf::from(raw.accounting),
        })
    }

    fn validate_measurement(raw: RawMeasurement) -> IrqLatResult<MeasurementConfig> {
        let register_address = RegisterAddress::parse(&raw.register_address)?;
        let pin = PinIndex::new(raw.pin)?;

        if raw.sets == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "measurement.sets",
                value: "0".to_string(),
                reason: "At least one series is required".to_string(),
            }
            .into());
        }

        if raw.samples == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "measurement.samples",
                value: "0".to_string(),
                reason: "At least one sample is required".to_string(),
            }
            .into());
        }

        if raw.accounting_prefix.is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "measurement.accounting_prefix",
                value: String::new(),
                reason: "Prefix cannot be empty".to_string(),
            }
            .into());
        }

        let wait = match raw.wait_timeout_ms {
            None => WaitPolicy::Unbounded,
            Some(0) => {
                return Err(HardValidationError::InvalidFieldValue {
                    field: "measurement.wait_timeout_ms",
                    value: "0".to_string(),
                    reason: "Timeout must be greater than 0 (omit it to wait forever)"
                        .to_string(),
                }
                .into())
            }
            Some(ms) => WaitPolicy::Deadline(Duration::from_millis(ms)),
        };

        Ok(MeasurementConfig {
            register_address,
            pin,
            sets: raw.sets,
            samples: raw.samples,
            accounting_prefix: raw.accounting_prefix,
            wait,
        })
    }
}
