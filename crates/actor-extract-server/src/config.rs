//! Service configuration loading.
//!
//! Values come from an optional TOML file, then environment variables
//! override individual keys. The result is resolved once at startup.

use std::path::Path;

use actor_extract_core::config::DEFAULT_QUEUE_SLOTS_PER_WORKER;
use actor_extract_core::ProcessorConfig;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct FileConfig {
    pub processor: Option<ProcessorSection>,
    pub server: Option<ServerSection>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ProcessorSection {
    pub max_file_size: Option<u64>,
    pub max_workers: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub allowed_content_types: Option<Vec<String>>,
    pub json_suffix: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ServerSection {
    pub bind_addr: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved settings for one server process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub processor: ProcessorConfig,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub log_level: String,
}

impl FileConfig {
    /// Overlay environment variables onto the file values.
    ///
    /// `lookup` is `std::env::var(..).ok()` in production.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let processor = self.processor.get_or_insert_with(ProcessorSection::default);
        if let Some(value) = lookup("MAX_FILE_SIZE") {
            processor.max_file_size = Some(parse_env("MAX_FILE_SIZE", &value)?);
        }
        if let Some(value) = lookup("MAX_WORKERS") {
            processor.max_workers = Some(parse_env("MAX_WORKERS", &value)?);
        }
        if let Some(value) = lookup("QUEUE_CAPACITY") {
            processor.queue_capacity = Some(parse_env("QUEUE_CAPACITY", &value)?);
        }
        if let Some(value) = lookup("ALLOWED_FILE_TYPES") {
            processor.allowed_content_types = Some(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect(),
            );
        }

        let server = self.server.get_or_insert_with(ServerSection::default);
        if let Some(value) = lookup("SERVER_ADDR") {
            server.bind_addr = Some(value);
        }
        if let Some(value) = lookup("LOG_LEVEL") {
            server.log_level = Some(value);
        }
        Ok(())
    }

    /// Fill unset keys with defaults and validate the processor settings.
    pub fn resolve(self) -> Result<ServiceConfig> {
        let section = self.processor.unwrap_or_default();
        let defaults = match section.max_workers {
            Some(workers) => ProcessorConfig::with_workers(workers),
            None => ProcessorConfig::default(),
        };
        let processor = ProcessorConfig {
            max_file_size: section.max_file_size.unwrap_or(defaults.max_file_size),
            queue_capacity: section.queue_capacity.unwrap_or_else(|| {
                defaults
                    .max_workers
                    .saturating_mul(DEFAULT_QUEUE_SLOTS_PER_WORKER)
            }),
            allowed_content_types: section
                .allowed_content_types
                .unwrap_or(defaults.allowed_content_types),
            json_suffix: section.json_suffix.unwrap_or(defaults.json_suffix),
            max_workers: defaults.max_workers,
        };
        processor
            .validate()
            .context("Invalid processor configuration")?;

        let server = self.server.unwrap_or_default();
        Ok(ServiceConfig {
            processor,
            server: ServerSettings {
                bind_addr: server
                    .bind_addr
                    .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
                log_level: server
                    .log_level
                    .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            },
        })
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid {key} value: '{value}'"))
}

pub fn load_file(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig =
        toml::from_str(&contents).context("Failed to parse config file as TOML")?;
    Ok(config)
}

/// Load the file (if any), apply process environment overrides and resolve.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => FileConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    config.resolve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = FileConfig::default().resolve().expect("resolve");
        assert_eq!(config.server.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.processor.max_file_size, 100 * 1024 * 1024);
        assert_eq!(
            config.processor.queue_capacity,
            config.processor.max_workers * DEFAULT_QUEUE_SLOTS_PER_WORKER
        );
    }

    #[test]
    fn test_workers_drive_queue_default() {
        let config = FileConfig {
            processor: Some(ProcessorSection {
                max_workers: Some(2),
                ..Default::default()
            }),
            ..Default::default()
        }
        .resolve()
        .expect("resolve");
        assert_eq!(config.processor.max_workers, 2);
        assert_eq!(config.processor.queue_capacity, 8);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = FileConfig {
            processor: Some(ProcessorSection {
                max_workers: Some(2),
                max_file_size: Some(1024),
                ..Default::default()
            }),
            server: Some(ServerSection {
                bind_addr: Some("0.0.0.0:9000".to_string()),
                log_level: None,
            }),
        };
        config
            .apply_env(env(&[
                ("MAX_WORKERS", "6"),
                ("ALLOWED_FILE_TYPES", "application/zip, application/x-zip-compressed"),
                ("LOG_LEVEL", "debug"),
            ]))
            .expect("apply env");
        let config = config.resolve().expect("resolve");

        assert_eq!(config.processor.max_workers, 6);
        assert_eq!(config.processor.max_file_size, 1024);
        assert_eq!(
            config.processor.allowed_content_types,
            vec!["application/zip", "application/x-zip-compressed"]
        );
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.server.log_level, "debug");
    }

    #[test]
    fn test_bad_env_value_rejected() {
        let mut config = FileConfig::default();
        let err = config
            .apply_env(env(&[("MAX_WORKERS", "lots")]))
            .expect_err("not a number");
        assert!(err.to_string().contains("MAX_WORKERS"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = FileConfig::default();
        config
            .apply_env(env(&[("MAX_WORKERS", "0")]))
            .expect("apply env");
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[processor]\nmax_workers = 3\njson_suffix = \".ndjson\"\n\n[server]\nbind_addr = \"127.0.0.1:0\""
        )
        .expect("write config");

        let config = load_file(file.path())
            .expect("load")
            .resolve()
            .expect("resolve");
        assert_eq!(config.processor.max_workers, 3);
        assert_eq!(config.processor.json_suffix, ".ndjson");
        assert_eq!(config.server.bind_addr, "127.0.0.1:0");
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = load_file(Path::new("/nonexistent/actor-extract.toml")).expect("load");
        assert!(config.processor.is_none());
        assert!(config.server.is_none());
    }
}
