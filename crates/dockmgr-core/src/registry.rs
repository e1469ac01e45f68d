//! Command registry
//!
//! Persists the mapping from container identity (short id) to reconstructed
//! launch command in `<data_dir>/container-commands.json`, a flat JSON object
//! written with two-space indentation. Entry order is kept as written.

use crate::{LaunchCommand, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write content to a file atomically using a temp-file-then-rename pattern.
///
/// The temporary file lives next to the target so the rename stays on one
/// filesystem. A crash mid-write leaves the previous file intact.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Ordered identity -> command entries with JSON object (de)serialization
#[derive(Debug, Clone, Default, PartialEq)]
struct Entries(Vec<(String, LaunchCommand)>);

impl Serialize for Entries {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (identity, command) in &self.0 {
            map.serialize_entry(identity, command)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Entries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = Entries;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("an object mapping container ids to launch commands")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Entries, A::Error> {
                let mut entries: Vec<(String, LaunchCommand)> = Vec::new();
                while let Some((identity, command)) = access.next_entry::<String, LaunchCommand>()? {
                    // A repeated key keeps its first position and its last value
                    match entries.iter_mut().find(|(existing, _)| *existing == identity) {
                        Some(entry) => entry.1 = command,
                        None => entries.push((identity, command)),
                    }
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Durable identity -> launch command mapping
#[derive(Debug)]
pub struct CommandRegistry {
    path: PathBuf,
    entries: Entries,
    /// command -> identity view, refreshed after every write
    by_command: Vec<(LaunchCommand, String)>,
}

impl CommandRegistry {
    /// Create an empty registry that will persist to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Entries::default(),
            by_command: Vec::new(),
        }
    }

    /// Load the registry from disk.
    ///
    /// A missing file yields an empty registry. An unreadable or corrupt file
    /// is logged and also yields an empty registry; it is overwritten on the
    /// next successful write.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let mut registry = Self::new(path);

        if !registry.path.exists() {
            tracing::debug!("No command registry at {:?}, starting empty", registry.path);
            return registry;
        }

        let content = match std::fs::read_to_string(&registry.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("Failed to read command registry {:?}: {}", registry.path, e);
                return registry;
            }
        };

        match serde_json::from_str::<Entries>(&content) {
            Ok(entries) => {
                registry.entries = entries;
                registry.dedup();
                registry.refresh_view();
                tracing::debug!(
                    "Loaded {} launch commands from {:?}",
                    registry.len(),
                    registry.path
                );
            }
            Err(e) => {
                tracing::error!(
                    "Command registry {:?} is corrupt, starting empty: {}",
                    registry.path,
                    e
                );
            }
        }

        registry
    }

    /// Path the registry persists to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `command` for `identity` and persist.
    ///
    /// The entry moves to the end of the file. Any other identity holding the
    /// same command is dropped, so each command appears once, owned by the
    /// most recently recorded identity. The in-memory state is updated even
    /// when persisting fails.
    pub fn put(&mut self, identity: impl Into<String>, command: LaunchCommand) -> Result<()> {
        let identity = identity.into();
        self.entries.0.retain(|(existing, _)| *existing != identity);
        self.entries.0.push((identity, command));
        self.dedup();
        self.refresh_view();
        self.persist()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.0.iter().any(|(existing, _)| existing == identity)
    }

    pub fn get(&self, identity: &str) -> Option<&LaunchCommand> {
        self.entries
            .0
            .iter()
            .find(|(existing, _)| existing == identity)
            .map(|(_, command)| command)
    }

    pub fn len(&self) -> usize {
        self.entries.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.0.is_empty()
    }

    /// Entries in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LaunchCommand)> {
        self.entries
            .0
            .iter()
            .map(|(identity, command)| (identity.as_str(), command))
    }

    /// Command -> identity view, in file order
    pub fn by_command(&self) -> &[(LaunchCommand, String)] {
        &self.by_command
    }

    /// Keep only the last identity recorded for each command
    fn dedup(&mut self) {
        let mut seen: HashSet<LaunchCommand> = HashSet::new();
        let mut kept: Vec<(String, LaunchCommand)> = self
            .entries
            .0
            .drain(..)
            .rev()
            .filter(|(_, command)| seen.insert(command.clone()))
            .collect();
        kept.reverse();
        self.entries.0 = kept;
    }

    fn refresh_view(&mut self) {
        self.by_command = self
            .entries
            .0
            .iter()
            .map(|(identity, command)| (command.clone(), identity.clone()))
            .collect();
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.entries)?;
        atomic_write(&self.path, content.as_bytes())?;

        tracing::debug!("Wrote {} launch commands to {:?}", self.len(), self.path);
        Ok(())
    }
}
