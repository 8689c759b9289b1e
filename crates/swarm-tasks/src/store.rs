// store.rs — TaskStore: persistence for the shared task document.
//
// All tasks live in one JSON file (tasks.json by default). Every save
// re-seals the checksum and replaces the file via write-then-rename, so a
// concurrent reader sees either the old document or the new one, never a
// partial write. Concurrent sanctioned writers are last-writer-wins.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::document::{DocumentSchema, TaskDocument};
use crate::error::TaskError;

/// File-backed store for the task document.
pub struct TaskStore {
    path: PathBuf,
    schema: DocumentSchema,
}

impl TaskStore {
    /// A store at `path` using the default schema constants.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_schema(path, DocumentSchema::default())
    }

    pub fn with_schema(path: impl AsRef<Path>, schema: DocumentSchema) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            schema,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &DocumentSchema {
        &self.schema
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and parse the document. Does not check the seal.
    pub fn load(&self) -> Result<TaskDocument, TaskError> {
        let json = fs::read_to_string(&self.path).map_err(|e| TaskError::io(&self.path, e))?;
        let doc = TaskDocument::from_json_str(&json)?;
        tracing::debug!(
            path = %self.path.display(),
            tasks = doc.tasks.len(),
            "loaded task document"
        );
        Ok(doc)
    }

    /// Load for modification: refuses documents whose seal is broken, so a
    /// manual edit is never silently re-sealed by the next sanctioned write.
    pub fn load_sealed(&self) -> Result<TaskDocument, TaskError> {
        let doc = self.load()?;
        doc.verify_integrity(&self.schema)?;
        Ok(doc)
    }

    /// Load for modification, accepting a broken seal when `force` is set.
    pub fn load_for_update(&self, force: bool) -> Result<TaskDocument, TaskError> {
        if !force {
            return self.load_sealed();
        }
        let doc = self.load()?;
        if let Some(finding) = doc.integrity_findings(&self.schema)?.into_iter().next() {
            tracing::warn!(
                path = %self.path.display(),
                %finding,
                "forcing write over a document with a broken seal"
            );
        }
        Ok(doc)
    }

    /// Seal and write the document (creates or overwrites).
    pub fn save(&self, doc: &mut TaskDocument) -> Result<(), TaskError> {
        doc.seal(&self.schema)?;
        let json = doc.to_json_string()?;

        // Unique temp name per writer: concurrent saves must never share one.
        let dir = self.parent_dir();
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| TaskError::io(&dir, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| TaskError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| TaskError::io(&self.path, e.error))?;
        tracing::debug!(
            path = %self.path.display(),
            tasks = doc.tasks.len(),
            "saved task document"
        );
        Ok(())
    }

    /// Create an empty sealed document. Refuses to overwrite an existing file.
    pub fn init(&self) -> Result<TaskDocument, TaskError> {
        if self.exists() {
            return Err(TaskError::ValidationError(format!(
                "{} already exists",
                self.path.display()
            )));
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
        }
        let mut doc = TaskDocument::default();
        self.save(&mut doc)?;
        Ok(doc)
    }

    /// Temp files live next to the document so the final rename stays on
    /// one filesystem.
    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::task::Task;
    use tempfile::tempdir;

    #[test]
    fn init_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.json"));

        store.init().unwrap();
        let doc = store.load_sealed().unwrap();
        assert!(doc.tasks.is_empty());

        assert!(matches!(store.init(), Err(TaskError::ValidationError(_))));
    }

    #[test]
    fn save_then_load_keeps_checksum() {
        let dir = tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.json"));

        let mut doc = TaskDocument {
            tasks: vec![Task::new("T-1", "First"), Task::new("T-2", "Second")],
            ..TaskDocument::default()
        };
        store.save(&mut doc).unwrap();
        let recorded = doc.meta.present().unwrap().checksum.text().unwrap().to_string();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.checksum().unwrap(), recorded);
        assert_eq!(reloaded, doc);
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "no temp file left behind");
    }

    #[test]
    fn concurrent_writers_never_leave_a_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        TaskStore::new(&path).init().unwrap();

        let writers: Vec<_> = (0..8)
            .map(|n| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store = TaskStore::new(&path);
                    for round in 0..20 {
                        let mut doc = TaskDocument {
                            tasks: vec![Task::new(format!("T-{}", n), format!("Round {}", round))],
                            ..TaskDocument::default()
                        };
                        store.save(&mut doc).unwrap();
                        store.load_sealed().unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let doc = TaskStore::new(&path).load_sealed().unwrap();
        assert_eq!(doc.tasks.len(), 1);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn hand_edit_is_refused_for_update() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let store = TaskStore::new(&path);

        let mut doc = TaskDocument {
            tasks: vec![Task::new("T-1", "First")],
            ..TaskDocument::default()
        };
        store.save(&mut doc).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, text.replace("First", "Tampered")).unwrap();

        assert!(matches!(
            store.load_sealed(),
            Err(TaskError::IntegrityMismatch { .. })
        ));
        let forced = store.load_for_update(true).unwrap();
        assert_eq!(forced.tasks[0].title, Field::Present("Tampered".to_string()));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(TaskError::IoError { .. })));
    }
}
