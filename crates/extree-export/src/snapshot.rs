//! The exported, append-only view of the tree.
//!
//! A snapshot is a JSON array of records keyed by `name`, the node's
//! allocation identity. Records are never retracted and their child lists
//! only grow, so any two exports of the same run merge cleanly.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use extree_core::hash::{hash_serde, Hash256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;

/// One symbolic memory object, byte by byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryObjectDump {
    pub address: String,
    pub size: u32,
    pub name: String,
    pub bytes: Vec<String>,
}

/// Attributes of the state a node bookmarked when it was exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateAttributes {
    pub id: u32,
    #[serde(default)]
    pub insts_since_cov_new: u64,
    #[serde(default)]
    pub pc: String,
    #[serde(rename = "prevPC", default)]
    pub prev_pc: String,
    #[serde(default)]
    pub stepped_instructions: u64,
    #[serde(default)]
    pub covered_lines: BTreeMap<String, BTreeSet<u32>>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub memory_objects: Vec<MemoryObjectDump>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub name: String,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub state: Option<StateAttributes>,
}

impl SnapshotRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            state: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: Vec<SnapshotRecord>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `record` in by name. New names are appended; for known names
    /// unseen children are appended and attributes are replaced only when
    /// `record` carries a state. Returns whether anything changed.
    pub fn upsert(&mut self, record: SnapshotRecord) -> bool {
        let Some(&pos) = self.index.get(&record.name) else {
            self.index.insert(record.name.clone(), self.records.len());
            self.records.push(record);
            return true;
        };

        let existing = &mut self.records[pos];
        let mut changed = false;
        for child in record.children {
            if !existing.children.contains(&child) {
                existing.children.push(child);
                changed = true;
            }
        }
        if let Some(state) = record.state {
            if existing.state.as_ref() != Some(&state) {
                existing.state = Some(state);
                changed = true;
            }
        }
        changed
    }

    /// Union `other` into `self` by name.
    pub fn merge(&mut self, other: Snapshot) -> bool {
        let mut changed = false;
        for record in other.records {
            changed |= self.upsert(record);
        }
        changed
    }

    pub fn from_records(records: impl IntoIterator<Item = SnapshotRecord>) -> Self {
        let mut snapshot = Self::new();
        for record in records {
            snapshot.upsert(record);
        }
        snapshot
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Single-line JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn digest(&self) -> Result<Hash256> {
        Ok(hash_serde(self)?)
    }

    pub fn records(&self) -> &[SnapshotRecord] {
        &self.records
    }

    pub fn get(&self, name: &str) -> Option<&SnapshotRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.records)
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let records = Vec::<SnapshotRecord>::deserialize(deserializer)?;
        Ok(Snapshot::from_records(records))
    }
}
