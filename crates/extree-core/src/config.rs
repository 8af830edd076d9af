//! Tree configuration that drivers can serialize/deserialize.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Elide single-child nodes left behind when a path is removed.
    pub compress_tree: bool,

    /// Keep an append-only log of every branch and termination.
    pub persist_tree: bool,

    /// Directory receiving the log and snapshot files.
    pub output_dir: String,

    pub log_file_name: String,
    pub snapshot_file_name: String,

    /// Pending log records that trigger an automatic commit.
    pub log_batch_size: usize,

    /// Codec for log segments: `none`, `zstd`, or `lz4`.
    pub log_compression: String,

    /// Print each changed snapshot as one compact JSON line on stdout.
    pub stream_snapshots: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            compress_tree: false,
            persist_tree: false,
            output_dir: "klee-out".to_string(),
            log_file_name: "exec_tree.log".to_string(),
            snapshot_file_name: "exec_tree.json".to_string(),
            log_batch_size: 1000,
            log_compression: "none".to_string(),
            stream_snapshots: false,
        }
    }
}

impl TreeConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `EXTREE_COMPRESS_TREE`: elide single-child chains on removal
    /// - `EXTREE_PERSIST_TREE`: write the append-only tree log
    /// - `EXTREE_OUTPUT_DIR`: output directory for log and snapshot
    /// - `EXTREE_LOG_BATCH_SIZE`: records per automatic commit
    /// - `EXTREE_LOG_COMPRESSION`: `none`, `zstd`, or `lz4`
    /// - `EXTREE_STREAM_SNAPSHOTS`: stream changed snapshots to stdout
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`TreeConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("EXTREE_COMPRESS_TREE").and_then(|s| parse_bool(&s)) {
            cfg.compress_tree = v;
        }

        if let Some(v) = lookup("EXTREE_PERSIST_TREE").and_then(|s| parse_bool(&s)) {
            cfg.persist_tree = v;
        }

        if let Some(s) = lookup("EXTREE_OUTPUT_DIR") {
            cfg.output_dir = s;
        }

        if let Some(s) = lookup("EXTREE_LOG_BATCH_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.log_batch_size = v;
            }
        }

        if let Some(s) = lookup("EXTREE_LOG_COMPRESSION") {
            cfg.log_compression = s.trim().to_ascii_lowercase();
        }

        if let Some(v) = lookup("EXTREE_STREAM_SNAPSHOTS").and_then(|s| parse_bool(&s)) {
            cfg.stream_snapshots = v;
        }

        cfg
    }

    /// Reject combinations the tree cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.persist_tree && self.output_dir.trim().is_empty() {
            return Err(Error::Config(
                "persist_tree requires an output directory".into(),
            ));
        }
        if self.log_batch_size == 0 {
            return Err(Error::Config("log_batch_size must be at least 1".into()));
        }
        match self.log_compression.as_str() {
            "none" | "zstd" | "lz4" => Ok(()),
            other => Err(Error::Config(format!("unknown log compression '{other}'"))),
        }
    }

    pub fn log_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join(&self.log_file_name)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join(&self.snapshot_file_name)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_disable_compression_and_persistence() {
        let cfg = TreeConfig::default();
        assert!(!cfg.compress_tree);
        assert!(!cfg.persist_tree);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn env_overrides_are_applied() {
        let cfg = TreeConfig::from_lookup(lookup_from(&[
            ("EXTREE_COMPRESS_TREE", "yes"),
            ("EXTREE_PERSIST_TREE", "1"),
            ("EXTREE_OUTPUT_DIR", "/tmp/run7"),
            ("EXTREE_LOG_BATCH_SIZE", "16"),
            ("EXTREE_LOG_COMPRESSION", " LZ4 "),
        ]));
        assert!(cfg.compress_tree);
        assert!(cfg.persist_tree);
        assert_eq!(cfg.output_dir, "/tmp/run7");
        assert_eq!(cfg.log_batch_size, 16);
        assert_eq!(cfg.log_compression, "lz4");
        assert_eq!(cfg.log_path(), PathBuf::from("/tmp/run7/exec_tree.log"));
    }

    #[test]
    fn unparsable_values_keep_defaults() {
        let cfg = TreeConfig::from_lookup(lookup_from(&[
            ("EXTREE_COMPRESS_TREE", "maybe"),
            ("EXTREE_LOG_BATCH_SIZE", "lots"),
        ]));
        assert!(!cfg.compress_tree);
        assert_eq!(cfg.log_batch_size, 1000);
    }

    #[test]
    fn persistence_requires_output_dir() {
        let cfg = TreeConfig {
            persist_tree: true,
            output_dir: "  ".into(),
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("output directory"));

        let cfg = TreeConfig {
            log_compression: "brotli".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
