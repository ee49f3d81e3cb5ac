// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(BTreeSet<String>), // child names
}

/// In-memory filesystem for tests.
///
/// Paths are keyed without `.` components, so `./src/a.js` and `src/a.js`
/// address the same entry. Writes under a path registered with
/// [`MockFileSystem::deny_writes_under`] fail.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    read_only: Arc<Mutex<Vec<PathBuf>>>,
}

fn key(path: &Path) -> PathBuf {
    let key: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if key.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        key
    }
}

fn parent_key(path: &Path) -> Option<PathBuf> {
    if path == Path::new(".") {
        return None;
    }
    Some(key(path.parent().unwrap_or(Path::new("."))))
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("."), MockEntry::Dir(BTreeSet::new()));

        Self {
            entries: Arc::new(Mutex::new(entries)),
            read_only: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = key(path.as_ref());
        let mut entries = self.lock();
        if let Some(parent) = parent_key(&path) {
            Self::ensure_dir(&mut entries, &parent);
            Self::link_child(&mut entries, &parent, &path);
        }
        entries.insert(path, MockEntry::File(content.into()));
    }

    /// Make every write at or below `path` fail.
    pub fn deny_writes_under(&self, path: impl AsRef<Path>) {
        self.read_only
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(key(path.as_ref()));
    }

    /// All file paths currently stored, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let entries = self.lock();
        let mut files: Vec<PathBuf> = entries
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File(_)))
            .map(|(p, _)| p.clone())
            .collect();
        files.sort();
        files
    }

    fn is_denied(&self, path: &Path) -> bool {
        let path = key(path);
        self.read_only
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .any(|denied| path.starts_with(denied))
    }

    fn ensure_dir(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if entries.contains_key(path) {
            return;
        }
        entries.insert(path.to_path_buf(), MockEntry::Dir(BTreeSet::new()));
        if let Some(parent) = parent_key(path) {
            Self::ensure_dir(entries, &parent);
            Self::link_child(entries, &parent, path);
        }
    }

    fn link_child(entries: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
        if let (Some(MockEntry::Dir(children)), Some(name)) = (
            entries.get_mut(parent),
            child.file_name().and_then(|n| n.to_str()),
        ) {
            children.insert(name.to_string());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.lock().get(&key(path)) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if self.is_denied(path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        if self.is_denied(path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        let mut entries = self.lock();
        Self::ensure_dir(&mut entries, &key(path));
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let target = key(path);
        let mut entries = self.lock();
        entries.retain(|p, _| !p.starts_with(&target) || target == Path::new("."));
        if let Some(parent) = parent_key(&target) {
            if let (Some(MockEntry::Dir(children)), Some(name)) = (
                entries.get_mut(&parent),
                target.file_name().and_then(|n| n.to_str()),
            ) {
                children.remove(name);
            }
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(&key(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(&key(path)), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(&key(path)), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().get(&key(path)) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
