use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, info};

use crate::{
    record::{sample_metadata, Record},
    session::SessionId,
};

const TSV_EXTENSION: &str = "tsv";

/// Which derived file a dataset export goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Export {
    /// The whole working set.
    Modified,
    /// The append-only log of records created in the session.
    Added,
}

impl Export {
    fn suffix(self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Added => "added",
        }
    }

    /// `{stem}_modified.tsv` or `{stem}_added.tsv` for the selected file.
    pub(crate) fn file_name(self, source: &str) -> String {
        let stem = Path::new(source)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(source);
        format!("{stem}_{}.{TSV_EXTENSION}", self.suffix())
    }
}

/// The directories datasets are read from and exported to.
#[derive(Debug, Clone)]
pub(crate) struct Storage {
    data_dir: PathBuf,
    modified_dir: PathBuf,
    added_dir: PathBuf,
}

impl Storage {
    /// Creates any of the directories that do not exist yet.
    pub(crate) fn open(
        data_dir: PathBuf,
        modified_dir: PathBuf,
        added_dir: PathBuf,
    ) -> Result<Self> {
        for dir in [&data_dir, &modified_dir, &added_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(Self {
            data_dir,
            modified_dir,
            added_dir,
        })
    }

    pub(crate) fn files(&self) -> Result<Vec<String>> {
        tsv_files(&self.data_dir)
    }

    /// Resolves a file name picked from [`Storage::files`].
    pub(crate) fn source(&self, name: &str) -> Result<PathBuf> {
        if !self.files()?.iter().any(|f| f == name) {
            bail!("Invalid file selected: {name}");
        }
        Ok(self.data_dir.join(name))
    }

    /// Where the given export of the dataset `session` loaded from `source`
    /// goes: `{dir}/{session}/{stem}_{suffix}.tsv`. Creates the session's
    /// directory when missing.
    pub(crate) fn export_path(
        &self,
        export: Export,
        session: &SessionId,
        source: &str,
    ) -> Result<(String, PathBuf)> {
        let name = export.file_name(source);
        let dir = match export {
            Export::Modified => &self.modified_dir,
            Export::Added => &self.added_dir,
        }
        .join(session.to_string());
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(&name);
        Ok((name, path))
    }

    /// Drops the added log `session` kept for `source`, if any.
    pub(crate) fn clear_added(&self, session: &SessionId, source: &str) -> Result<()> {
        let (_, path) = self.export_path(Export::Added, session, source)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

/// Loads every line of a TSV file as a [`Record`].
///
/// The load is all-or-nothing: the first malformed line fails the whole
/// file, citing its 1-based line number.
pub(crate) fn load(path: &Path) -> Result<Vec<Record>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let records = parse(&content)?;
    info!("Loaded {} data points from {}", records.len(), path.display());
    if !records.is_empty() {
        debug!("Sample metadata: {}", sample_metadata(&records));
    }
    Ok(records)
}

pub(crate) fn parse(content: &str) -> Result<Vec<Record>> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| Record::from_line(line).with_context(|| format!("line {}", i + 1)))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| anyhow!("{e:#}"))
}

/// The records as TSV text, one line each.
pub(crate) fn encode(records: &[Record]) -> Result<String> {
    let mut content = String::new();
    for record in records {
        content.push_str(&record.to_line()?);
    }
    Ok(content)
}

/// Writes the records to `path`, replacing its contents, and returns what
/// was written.
pub(crate) fn save(path: &Path, records: &[Record]) -> Result<String> {
    let content = encode(records)?;
    fs::write(path, &content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(content)
}

/// Appends one record to `path`, creating the file if needed.
pub(crate) fn append(path: &Path, record: &Record) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(record.to_line()?.as_bytes())?;
    Ok(())
}

/// Names of the `.tsv` files directly under `dir`, sorted.
fn tsv_files(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(TSV_EXTENSION) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            files.push(name.to_string());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::record;

    const TWO_LINES: &str = "[{\"text\": \"query1\"}]\t{\"segment\": \"regular\", \"question_intent\": \"intent1\", \"sub_intent\": \"sub1\"}\n\
        [{\"text\": \"query2\"}]\t{\"segment\": \"premium\", \"question_intent\": \"intent2\", \"sub_intent\": \"sub2\"}";

    #[test]
    fn load_two_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.tsv");
        fs::write(&path, TWO_LINES).unwrap();

        let records = load(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text(), "query2");
    }

    #[test]
    fn load_rejects_malformed_line() {
        let content = "[{\"text\": \"query1\"}]\t{\"segment\": \"regular\"}\n[{\"text\": \"query2\"}]\n";
        let err = parse(content).unwrap_err().to_string();
        assert!(err.contains("line 2"));
        assert!(err.contains("Invalid line format"));
    }

    #[test]
    fn load_rejects_invalid_json() {
        let err = parse("{broken\t{}").unwrap_err().to_string();
        assert!(err.contains("line 1"));
        assert!(err.contains("Invalid JSON"));
    }

    #[test]
    fn load_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.tsv");
        fs::write(&path, "").unwrap();
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn save_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        let records = vec![
            record("query1", "regular", "intent1", "sub1"),
            record("query2", "premium", "intent2", "sub2"),
        ];
        save(&path, &records).unwrap();
        append(&path, &record("query3", "regular", "intent1", "sub2")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.lines().next().unwrap().contains("query1"));
        assert_eq!(load(&path).unwrap()[2].text(), "query3");
    }

    #[test]
    fn list_tsv_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.tsv"), "").unwrap();
        fs::write(dir.path().join("a.tsv"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested.tsv")).unwrap();

        assert_eq!(tsv_files(dir.path()).unwrap(), vec!["a.tsv", "b.tsv"]);
    }

    #[test]
    fn storage_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(
            dir.path().join("data"),
            dir.path().join("modified"),
            dir.path().join("added"),
        )
        .unwrap();
        fs::write(dir.path().join("data/test.tsv"), "").unwrap();

        assert_eq!(storage.files().unwrap(), vec!["test.tsv"]);
        assert_eq!(storage.source("test.tsv").unwrap(), dir.path().join("data/test.tsv"));
        let err = storage.source("../secret.tsv").unwrap_err();
        assert!(err.to_string().contains("Invalid file selected"));

        let alice = SessionId::new("alice");
        let (name, path) = storage.export_path(Export::Added, &alice, "test.tsv").unwrap();
        assert_eq!(name, "test_added.tsv");
        assert_eq!(path, dir.path().join("added/alice/test_added.tsv"));
        assert!(dir.path().join("added/alice").is_dir());
    }

    #[test]
    fn exports_are_kept_per_session() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(
            dir.path().join("data"),
            dir.path().join("modified"),
            dir.path().join("added"),
        )
        .unwrap();
        let alice = SessionId::new("alice");
        let bob = SessionId::new("bob");

        let (_, bob_log) = storage.export_path(Export::Added, &bob, "test.tsv").unwrap();
        append(&bob_log, &record("bob_query", "regular", "intent1", "sub1")).unwrap();
        let (_, alice_log) = storage.export_path(Export::Added, &alice, "test.tsv").unwrap();
        assert_ne!(alice_log, bob_log);
        assert!(!alice_log.exists());

        storage.clear_added(&alice, "test.tsv").unwrap();
        assert!(bob_log.exists());
        storage.clear_added(&bob, "test.tsv").unwrap();
        assert!(!bob_log.exists());
    }

    #[test]
    fn export_file_names() {
        assert_eq!(Export::Modified.file_name("test.tsv"), "test_modified.tsv");
        assert_eq!(Export::Added.file_name("test.tsv"), "test_added.tsv");
    }
}
