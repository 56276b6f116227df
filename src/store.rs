// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Record stores - one ordered NDJSON file per project
//!
//! Stores live in a schema-versioned directory (`<root>/v1/<project>.ndjson`)
//! next to a `stores.toml` manifest that records each store's order. A
//! store is loaded whole, changed in memory, and written back through a
//! temporary file that is renamed over the original. Lines that were not
//! touched are written back exactly as read, line endings included.

use crate::error::{Error, Result};
use crate::types::{validate_entry, ReleaseRecord};
use crate::version::{self, StoreOrder};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Schema version of the directory layout understood by this build
pub const SCHEMA_VERSION: u32 = 1;

/// File name of the per-directory manifest
pub const MANIFEST_FILE: &str = "stores.toml";

/// Extension of store files
pub const STORE_EXTENSION: &str = "ndjson";

// =============================================================================
// Entries
// =============================================================================

/// A validated release record with its parsed version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The record as stored
    pub record: ReleaseRecord,
    /// Parsed form of `record.version`
    pub version: Version,
    /// Line text as read from disk, without the `\n` but keeping any `\r`;
    /// `None` once the record is new or replaced
    raw: Option<String>,
}

impl Entry {
    /// Build an entry from a record, parsing its version
    pub fn new(record: ReleaseRecord) -> Result<Self> {
        let version = version::parse(&record.version, "record", 0)?;
        Ok(Self {
            record,
            version,
            raw: None,
        })
    }

    /// Parse and validate one NDJSON line
    ///
    /// `line` is 1-based and only used for error context.
    pub fn parse(text: &str, source_name: &str, line: usize) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedRecord {
            source_name: source_name.to_string(),
            line,
            reason,
        };

        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;

        let problems = validate_entry(&value);
        if !problems.is_empty() {
            return Err(malformed(problems.join("; ")));
        }

        let record: ReleaseRecord = serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;
        let version = version::parse(&record.version, source_name, line)?;

        Ok(Self {
            record,
            version,
            raw: Some(text.to_string()),
        })
    }

    /// Forget the original line text so the record is re-serialized on save
    #[must_use]
    pub fn detached(mut self) -> Self {
        self.raw = None;
        self
    }

    /// The line written for this entry on save
    pub fn line(&self) -> Result<String> {
        match &self.raw {
            Some(raw) => Ok(raw.clone()),
            None => Ok(self.record.to_line()?),
        }
    }
}

/// Outcome of merging one entry into a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// A new version was added at `index`
    Inserted {
        /// Position of the new record
        index: usize,
    },
    /// An existing record with the same version was replaced at `index`
    Replaced {
        /// Position of the replaced record
        index: usize,
    },
}

// =============================================================================
// Record store
// =============================================================================

/// The ordered, deduplicated records of one project
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    order: StoreOrder,
    entries: Vec<Entry>,
    existed: bool,
    crlf: bool,
}

impl RecordStore {
    /// A store with no records that will be written to `path`
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>, order: StoreOrder) -> Self {
        Self {
            path: path.into(),
            order,
            entries: Vec::new(),
            existed: false,
            crlf: false,
        }
    }

    /// Load a store file; a missing file is an empty store
    ///
    /// A file whose records are not sorted in `order`, or that repeats a
    /// version, is refused with [`Error::InconsistentStore`].
    pub fn load(path: impl Into<PathBuf>, order: StoreOrder) -> Result<Self> {
        let store = Self::read(path.into(), order)?;
        store.ensure_consistent()?;
        Ok(store)
    }

    /// Parse a store file without checking its order
    fn read(path: PathBuf, order: StoreOrder) -> Result<Self> {
        if !path.exists() {
            debug!("Store {} does not exist yet", path.display());
            return Ok(Self::empty(path, order));
        }

        let content = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let source_name = path.display().to_string();

        // Split on `\n` only so CRLF lines keep their `\r` in the raw text.
        let mut entries = Vec::new();
        for (i, line) in content.split('\n').enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(Entry::parse(line, &source_name, i + 1)?);
        }
        let crlf = entries
            .first()
            .and_then(|e| e.raw.as_deref())
            .is_some_and(|raw| raw.ends_with('\r'));

        debug!("Loaded {} records from {}", entries.len(), path.display());
        Ok(Self {
            path,
            order,
            entries,
            existed: true,
            crlf,
        })
    }

    fn ensure_consistent(&self) -> Result<()> {
        let problems = self.check_invariants();
        if problems.is_empty() {
            return Ok(());
        }
        Err(Error::InconsistentStore {
            path: self.path.clone(),
            reason: problems.join("; "),
        })
    }

    fn with_order(mut self, order: StoreOrder) -> Self {
        self.order = order;
        self
    }

    /// Merge one entry, replacing a record with the identical version string
    ///
    /// New versions go before the first record they precede in the store's
    /// order; records of equal precedence keep their place ahead of it.
    pub fn insert(&mut self, entry: Entry) -> Insertion {
        let entry = entry.detached();

        if let Some(index) = self
            .entries
            .iter()
            .position(|e| e.record.version == entry.record.version)
        {
            self.entries[index] = entry;
            return Insertion::Replaced { index };
        }

        let index = self
            .entries
            .iter()
            .position(|e| self.order.cmp(&entry.version, &e.version) == Ordering::Less)
            .unwrap_or(self.entries.len());
        self.entries.insert(index, entry);
        Insertion::Inserted { index }
    }

    /// Render the whole store as NDJSON
    ///
    /// New and replaced records follow the line ending of the file they
    /// were loaded from.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.line()?);
            if entry.raw.is_none() && self.crlf {
                out.push('\r');
            }
            out.push('\n');
        }
        Ok(out)
    }

    /// Replace the store file with the current records
    pub fn save(&mut self) -> Result<()> {
        let content = self.render()?;
        write_atomic(&self.path, content.as_bytes())?;
        self.existed = true;
        debug!("Wrote {} records to {}", self.len(), self.path.display());
        Ok(())
    }

    /// Ordering and uniqueness violations, as human readable messages
    #[must_use]
    pub fn check_invariants(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for (i, entry) in self.entries.iter().enumerate() {
            if !seen.insert(entry.record.version.as_str()) {
                problems.push(format!("duplicate version {}", entry.record.version));
            }
            if let Some(next) = self.entries.get(i + 1) {
                if self.order.cmp(&entry.version, &next.version) == Ordering::Greater {
                    problems.push(format!(
                        "{} listed before {} in a {} store",
                        entry.record.version, next.record.version, self.order
                    ));
                }
            }
        }

        problems
    }

    /// Path of the store file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Direction the store is kept in
    #[must_use]
    pub fn order(&self) -> StoreOrder {
        self.order
    }

    /// Whether the file existed when loaded (or has been saved since)
    #[must_use]
    pub fn existed(&self) -> bool {
        self.existed
    }

    /// Records in store order
    pub fn records(&self) -> impl Iterator<Item = &ReleaseRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    /// Version strings in store order
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.record.version.as_str())
    }

    /// Look up a record by its exact version string
    #[must_use]
    pub fn get(&self, version: &str) -> Option<&ReleaseRecord> {
        self.records().find(|r| r.version == version)
    }

    /// Whether a record with this exact version string exists
    #[must_use]
    pub fn contains(&self, version: &str) -> bool {
        self.get(version).is_some()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Store directory and manifest
// =============================================================================

/// Per-store settings recorded in the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Direction the store was created with
    pub order: StoreOrder,
}

/// Contents of `stores.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Schema version of the directory
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Settings keyed by project name
    #[serde(default)]
    pub stores: BTreeMap<String, StoreSettings>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            stores: BTreeMap::new(),
        }
    }
}

/// A schema-versioned directory of record stores
#[derive(Debug, Clone)]
pub struct StoreDir {
    path: PathBuf,
    manifest: Manifest,
}

impl StoreDir {
    /// Name of the directory holding stores of the current schema
    #[must_use]
    pub fn schema_dir_name() -> String {
        format!("v{SCHEMA_VERSION}")
    }

    /// Open `<root>/v1`
    pub fn open(root: &Path) -> Result<Self> {
        Self::at(root.join(Self::schema_dir_name()))
    }

    /// Open an explicit store directory
    ///
    /// A directory named `v<N>` for another schema version, or whose
    /// manifest declares one, is refused.
    pub fn at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(found) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix('v'))
            .and_then(|n| n.parse::<u32>().ok())
        {
            if found != SCHEMA_VERSION {
                return Err(Error::SchemaVersionMismatch {
                    dir: path,
                    found,
                    expected: SCHEMA_VERSION,
                });
            }
        }

        let manifest_path = path.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            let content = fs::read_to_string(&manifest_path).map_err(|e| Error::io(&manifest_path, e))?;
            toml::from_str::<Manifest>(&content)
                .map_err(|e| Error::Manifest(format!("{}: {e}", manifest_path.display())))?
        } else {
            Manifest::default()
        };

        if manifest.schema_version != SCHEMA_VERSION {
            return Err(Error::SchemaVersionMismatch {
                dir: path,
                found: manifest.schema_version,
                expected: SCHEMA_VERSION,
            });
        }

        Ok(Self { path, manifest })
    }

    /// Directory path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The loaded manifest
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Path of a project's store file
    pub fn store_path(&self, project: &str) -> Result<PathBuf> {
        validate_project_name(project)?;
        Ok(self.path.join(format!("{project}.{STORE_EXTENSION}")))
    }

    /// Order recorded for a project, if any
    #[must_use]
    pub fn recorded_order(&self, project: &str) -> Option<StoreOrder> {
        self.manifest.stores.get(project).map(|s| s.order)
    }

    /// Load a project's store
    ///
    /// The order recorded in the manifest always wins. A store with no
    /// recorded order takes `requested` (else `default`) only while it has
    /// no records; an existing file keeps `default` when its records are
    /// sorted that way and the opposite order when they are sorted the other
    /// way. A file sorted neither way is refused with
    /// [`Error::InconsistentStore`]. A requested order that differs from the
    /// one chosen is ignored with a warning.
    pub fn load_store(
        &self,
        project: &str,
        requested: Option<StoreOrder>,
        default: StoreOrder,
    ) -> Result<RecordStore> {
        let path = self.store_path(project)?;

        let store = match self.recorded_order(project) {
            Some(recorded) => RecordStore::load(path, recorded)?,
            None => {
                let store = RecordStore::read(path, default)?;
                if store.is_empty() {
                    return Ok(store.with_order(requested.unwrap_or(default)));
                }
                infer_order(store)?
            }
        };

        if let Some(req) = requested.filter(|r| *r != store.order()) {
            warn!(
                "Store {} is kept in {} order; ignoring requested {} order",
                project,
                store.order(),
                req
            );
        }
        Ok(store)
    }

    /// Save a project's store, recording its order first if none is recorded
    ///
    /// The manifest is written before the store file, so a store on disk
    /// never outlives a failed manifest update without a recorded order.
    pub fn commit(&mut self, project: &str, store: &mut RecordStore) -> Result<()> {
        fs::create_dir_all(&self.path).map_err(|e| Error::io(&self.path, e))?;

        if self.recorded_order(project).is_none() {
            self.manifest
                .stores
                .insert(project.to_string(), StoreSettings { order: store.order() });
            if let Err(e) = self.write_manifest() {
                self.manifest.stores.remove(project);
                return Err(e);
            }
        }

        store.save()
    }

    fn write_manifest(&self) -> Result<()> {
        let manifest_path = self.path.join(MANIFEST_FILE);
        let content = toml::to_string_pretty(&self.manifest)
            .map_err(|e| Error::Manifest(format!("{}: {e}", manifest_path.display())))?;
        write_atomic(&manifest_path, content.as_bytes())
    }
}

/// Keep an unrecorded store in whichever direction its records are sorted
fn infer_order(store: RecordStore) -> Result<RecordStore> {
    let problems = store.check_invariants();
    if problems.is_empty() {
        return Ok(store);
    }

    let flipped = store.order().reversed();
    let store = store.with_order(flipped);
    if store.check_invariants().is_empty() {
        warn!(
            "Store {} is sorted in {} order; keeping it that way",
            store.path().display(),
            flipped
        );
        return Ok(store);
    }

    Err(Error::InconsistentStore {
        path: store.path,
        reason: problems.join("; "),
    })
}

/// Reject project names that would escape the store directory
pub fn validate_project_name(project: &str) -> Result<()> {
    let bad = project.is_empty()
        || project.starts_with('.')
        || project.contains(['/', '\\'])
        || project.chars().any(char::is_control);
    if bad {
        return Err(Error::InvalidProjectName(project.to_string()));
    }
    Ok(())
}

/// Write `bytes` to `path` through a temporary file in the same directory
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".versions-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|e| Error::io(&dir, e))?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        writer.write_all(bytes).map_err(|e| Error::io(path, e))?;
        writer.flush().map_err(|e| Error::io(path, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| Error::io(path, e))?;

    // Temporary files are created private; keep the target's mode instead.
    let permissions = match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    };
    if let Some(permissions) = permissions {
        fs::set_permissions(tmp.path(), permissions).map_err(|e| Error::io(tmp.path(), e))?;
    }

    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIGEST: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn line(version: &str, date: &str) -> String {
        format!(
            r#"{{"version":"{version}","date":"{date}","artifacts":[{{"platform":"x86_64-unknown-linux-gnu","variant":"default","url":"https://example.com/{version}.tar.gz","archive_format":"tar.gz","sha256":"{DIGEST}"}}]}}"#
        )
    }

    fn entry(version: &str) -> Entry {
        Entry::parse(&line(version, "2025-01-01T00:00:00+00:00"), "test", 1).unwrap()
    }

    fn versions(store: &RecordStore) -> Vec<String> {
        store.versions().map(String::from).collect()
    }

    #[test]
    fn test_insert_between_ascending() {
        let mut store = RecordStore::empty("unused.ndjson", StoreOrder::Ascending);
        store.insert(entry("1.1.0"));
        store.insert(entry("1.3.0"));
        let outcome = store.insert(entry("1.2.0"));

        assert_eq!(outcome, Insertion::Inserted { index: 1 });
        assert_eq!(versions(&store), ["1.1.0", "1.2.0", "1.3.0"]);
    }

    #[test]
    fn test_insert_descending_puts_newest_first() {
        let mut store = RecordStore::empty("unused.ndjson", StoreOrder::Descending);
        for v in ["0.2.0", "0.10.0", "0.1.0", "0.10.0-rc.1"] {
            store.insert(entry(v));
        }
        assert_eq!(versions(&store), ["0.10.0", "0.10.0-rc.1", "0.2.0", "0.1.0"]);
    }

    #[test]
    fn test_replace_keeps_single_entry() {
        let mut store = RecordStore::empty("unused.ndjson", StoreOrder::Ascending);
        store.insert(entry("1.0.0"));
        store.insert(entry("1.1.0"));

        let newer = Entry::parse(&line("1.1.0", "2025-02-01T00:00:00+00:00"), "test", 1).unwrap();
        let outcome = store.insert(newer);

        assert_eq!(outcome, Insertion::Replaced { index: 1 });
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("1.1.0").unwrap().date, "2025-02-01T00:00:00+00:00");
    }

    #[test]
    fn test_round_trip_preserves_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool.ndjson");
        // Spacing differs from compact output on purpose.
        let content = format!(
            "{}\n{}\n",
            line("2.0.0", "2025-02-01T00:00:00+00:00").replace(r#","date""#, r#", "date""#),
            line("1.0.0", "2025-01-01T00:00:00Z"),
        );
        fs::write(&path, &content).unwrap();

        let mut store = RecordStore::load(&path, StoreOrder::Descending).unwrap();
        store.save().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn test_load_reports_malformed_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool.ndjson");
        fs::write(&path, format!("{}\n{{not json\n", line("1.0.0", "2025-01-01T00:00:00Z"))).unwrap();

        match RecordStore::load(&path, StoreOrder::Descending) {
            Err(Error::MalformedRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::load(dir.path().join("absent.ndjson"), StoreOrder::Ascending).unwrap();
        assert!(store.is_empty());
        assert!(!store.existed());
    }

    #[test]
    fn test_round_trip_preserves_crlf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool.ndjson");
        let content = format!(
            "{}\r\n{}\r\n",
            line("2.0.0", "2025-02-01T00:00:00+00:00"),
            line("1.0.0", "2025-01-01T00:00:00Z"),
        );
        fs::write(&path, &content).unwrap();

        let mut store = RecordStore::load(&path, StoreOrder::Descending).unwrap();
        store.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), content);

        // New records follow the file's line ending.
        store.insert(entry("1.5.0"));
        store.save().unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.matches("\r\n").count(), 3);
        assert_eq!(written.matches('\n').count(), 3);
    }

    #[test]
    fn test_load_refuses_disorder_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool.ndjson");
        let content = [
            line("1.0.0", "2025-01-01T00:00:00Z"),
            line("2.0.0", "2025-01-01T00:00:00Z"),
            line("2.0.0", "2025-01-01T00:00:00Z"),
        ]
        .join("\n");
        fs::write(&path, content).unwrap();

        let store = RecordStore::read(path.clone(), StoreOrder::Descending).unwrap();
        let problems = store.check_invariants();
        assert_eq!(problems.len(), 2, "{problems:?}");

        assert!(matches!(
            RecordStore::load(&path, StoreOrder::Descending),
            Err(Error::InconsistentStore { .. })
        ));
    }

    #[test]
    fn test_store_dir_rejects_other_schema_dir() {
        let dir = TempDir::new().unwrap();
        match StoreDir::at(dir.path().join("v2")) {
            Err(Error::SchemaVersionMismatch { found, expected, .. }) => {
                assert_eq!(found, 2);
                assert_eq!(expected, SCHEMA_VERSION);
            }
            other => panic!("expected SchemaVersionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_store_dir_rejects_manifest_schema() {
        let dir = TempDir::new().unwrap();
        let v1 = dir.path().join("v1");
        fs::create_dir_all(&v1).unwrap();
        fs::write(v1.join(MANIFEST_FILE), "schema_version = 3\n").unwrap();

        assert!(matches!(
            StoreDir::open(dir.path()),
            Err(Error::SchemaVersionMismatch { found: 3, .. })
        ));
    }

    #[test]
    fn test_commit_records_order_for_new_store() {
        let dir = TempDir::new().unwrap();
        let mut store_dir = StoreDir::open(dir.path()).unwrap();

        let mut store = store_dir
            .load_store("tool", Some(StoreOrder::Ascending), StoreOrder::Descending)
            .unwrap();
        store.insert(entry("1.0.0"));
        store_dir.commit("tool", &mut store).unwrap();

        let reopened = StoreDir::open(dir.path()).unwrap();
        assert_eq!(reopened.recorded_order("tool"), Some(StoreOrder::Ascending));

        // The recorded order wins over a later request.
        let store = reopened
            .load_store("tool", Some(StoreOrder::Descending), StoreOrder::Descending)
            .unwrap();
        assert_eq!(store.order(), StoreOrder::Ascending);
    }

    fn unrecorded_store(versions: &[&str]) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let v1 = dir.path().join("v1");
        fs::create_dir_all(&v1).unwrap();
        let content: String = versions
            .iter()
            .map(|v| format!("{}\n", line(v, "2025-01-01T00:00:00Z")))
            .collect();
        fs::write(v1.join("tool.ndjson"), content).unwrap();
        (dir, v1)
    }

    #[test]
    fn test_existing_store_without_manifest_uses_default() {
        let (dir, v1) = unrecorded_store(&["1.0.0"]);

        let mut store_dir = StoreDir::open(dir.path()).unwrap();
        let mut store = store_dir.load_store("tool", None, StoreOrder::Descending).unwrap();
        assert_eq!(store.order(), StoreOrder::Descending);

        store_dir.commit("tool", &mut store).unwrap();
        let reopened = StoreDir::open(dir.path()).unwrap();
        assert_eq!(reopened.recorded_order("tool"), Some(StoreOrder::Descending));
        assert!(v1.join(MANIFEST_FILE).exists());
    }

    #[test]
    fn test_existing_store_ignores_requested_order() {
        let (dir, v1) = unrecorded_store(&["2.0.0", "1.0.0"]);

        let mut store_dir = StoreDir::open(dir.path()).unwrap();
        let mut store = store_dir
            .load_store("tool", Some(StoreOrder::Ascending), StoreOrder::Descending)
            .unwrap();
        assert_eq!(store.order(), StoreOrder::Descending);

        store.insert(entry("1.5.0"));
        store_dir.commit("tool", &mut store).unwrap();

        let reloaded = RecordStore::load(v1.join("tool.ndjson"), StoreOrder::Descending).unwrap();
        assert_eq!(versions(&reloaded), ["2.0.0", "1.5.0", "1.0.0"]);
    }

    #[test]
    fn test_existing_store_keeps_its_own_direction() {
        let (dir, v1) = unrecorded_store(&["1.0.0", "2.0.0"]);

        let mut store_dir = StoreDir::open(dir.path()).unwrap();
        let mut store = store_dir.load_store("tool", None, StoreOrder::Descending).unwrap();
        assert_eq!(store.order(), StoreOrder::Ascending);

        store.insert(entry("1.5.0"));
        store_dir.commit("tool", &mut store).unwrap();

        let reloaded = RecordStore::load(v1.join("tool.ndjson"), StoreOrder::Ascending).unwrap();
        assert_eq!(versions(&reloaded), ["1.0.0", "1.5.0", "2.0.0"]);
        let reopened = StoreDir::open(dir.path()).unwrap();
        assert_eq!(reopened.recorded_order("tool"), Some(StoreOrder::Ascending));
    }

    #[test]
    fn test_unsorted_store_is_refused() {
        let (dir, v1) = unrecorded_store(&["1.0.0", "3.0.0", "2.0.0"]);
        let before = fs::read(v1.join("tool.ndjson")).unwrap();

        let store_dir = StoreDir::open(dir.path()).unwrap();
        assert!(matches!(
            store_dir.load_store("tool", None, StoreOrder::Descending),
            Err(Error::InconsistentStore { .. })
        ));
        assert_eq!(fs::read(v1.join("tool.ndjson")).unwrap(), before);
    }

    #[test]
    fn test_recorded_order_checked_against_file() {
        let (dir, v1) = unrecorded_store(&["1.0.0", "2.0.0"]);
        fs::write(
            v1.join(MANIFEST_FILE),
            "schema_version = 1\n\n[stores.tool]\norder = \"descending\"\n",
        )
        .unwrap();

        let store_dir = StoreDir::open(dir.path()).unwrap();
        assert!(matches!(
            store_dir.load_store("tool", None, StoreOrder::Ascending),
            Err(Error::InconsistentStore { .. })
        ));
    }

    #[test]
    fn test_commit_writes_manifest_before_store() {
        let dir = TempDir::new().unwrap();
        let mut store_dir = StoreDir::open(dir.path()).unwrap();
        let v1 = store_dir.path().to_path_buf();
        // A directory in the manifest's place makes the manifest write fail.
        fs::create_dir_all(v1.join(MANIFEST_FILE)).unwrap();

        let mut store = store_dir.load_store("tool", None, StoreOrder::Descending).unwrap();
        store.insert(entry("1.0.0"));

        assert!(store_dir.commit("tool", &mut store).is_err());
        assert!(!v1.join("tool.ndjson").exists());
        assert_eq!(store_dir.recorded_order("tool"), None);
    }

    #[test]
    fn test_project_name_validation() {
        assert!(validate_project_name("uv").is_ok());
        assert!(validate_project_name("python-build-standalone").is_ok());
        for bad in ["", ".hidden", "../escape", "a/b", "a\\b"] {
            assert!(validate_project_name(bad).is_err(), "{bad} should be rejected");
        }
    }
}
