use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Notice shown when no snippet file exists yet.
pub const NO_SNIPPETS_NOTICE: &str = "No predefined commands found.";

/// A named command that can be replayed into a session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CommandSnippet {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub description: String,
}

impl CommandSnippet {
    pub fn new(name: String, command: String, description: String) -> Self {
        Self {
            name,
            command,
            description,
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
struct SnippetFile {
    commands: Vec<CommandSnippet>,
}

/// Snippets keyed by name, backed by a `{"commands": [...]}` JSON file.
pub struct SnippetStore {
    path: PathBuf,
    snippets: Vec<CommandSnippet>,
    missing_on_load: bool,
}

impl SnippetStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (snippets, missing_on_load) = match Self::load(&path)? {
            Some(snippets) => (snippets, false),
            None => (Vec::new(), true),
        };
        info!("Loaded {} command snippets", snippets.len());
        Ok(Self {
            path,
            snippets,
            missing_on_load,
        })
    }

    /// `Ok(None)` when the file is absent.
    pub fn load(path: &Path) -> Result<Option<Vec<CommandSnippet>>> {
        let file: Option<SnippetFile> = super::read_json(path)?;
        Ok(file.map(|f| f.commands))
    }

    pub fn save_to(path: &Path, snippets: &[CommandSnippet]) -> Result<()> {
        let file = SnippetFile {
            commands: snippets.to_vec(),
        };
        super::write_json(path, &file)
    }

    pub fn save(&self) -> Result<()> {
        Self::save_to(&self.path, &self.snippets)
    }

    /// Informational message for the UI when there was nothing to load.
    pub fn notice(&self) -> Option<&'static str> {
        self.missing_on_load.then_some(NO_SNIPPETS_NOTICE)
    }

    pub fn snippets(&self) -> &[CommandSnippet] {
        &self.snippets
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn add(&mut self, snippet: CommandSnippet) -> Result<()> {
        self.snippets.push(snippet);
        self.save()
    }

    /// Remove every snippet called `name`; returns how many were removed.
    pub fn remove(&mut self, name: &str) -> Result<usize> {
        let before = self.snippets.len();
        self.snippets.retain(|s| s.name != name);
        let removed = before - self.snippets.len();
        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }

    /// The snippet a lookup by `name` resolves to: the last one with that name.
    pub fn find(&self, name: &str) -> Option<&CommandSnippet> {
        self.snippets.iter().rev().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn snippet(name: &str, command: &str) -> CommandSnippet {
        CommandSnippet::new(name.to_string(), command.to_string(), String::new())
    }

    #[test]
    fn test_absent_file_is_empty_with_notice() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnippetStore::open(dir.path().join("commands.json")).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.notice(), Some(NO_SNIPPETS_NOTICE));
    }

    #[test]
    fn test_existing_file_has_no_notice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.json");
        std::fs::write(&path, r#"{"commands": []}"#).unwrap();
        let store = SnippetStore::open(&path).unwrap();
        assert!(store.notice().is_none());
    }

    #[test]
    fn test_malformed_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.json");
        std::fs::write(&path, r#"{"commands": 5}"#).unwrap();
        assert!(matches!(
            SnippetStore::open(&path),
            Err(AppError::PersistenceError(_))
        ));
    }

    #[test]
    fn test_legacy_file_without_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.json");
        std::fs::write(
            &path,
            r#"{"commands": [{"name": "disk", "command": "df -h"}]}"#,
        )
        .unwrap();
        let store = SnippetStore::open(&path).unwrap();
        assert_eq!(store.snippets(), &[snippet("disk", "df -h")]);
    }

    #[test]
    fn test_find_prefers_last_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SnippetStore::open(dir.path().join("commands.json")).unwrap();
        store.add(snippet("up", "uptime")).unwrap();
        store.add(snippet("mem", "free -m")).unwrap();
        store.add(snippet("up", "uptime -p")).unwrap();

        assert_eq!(store.find("up").unwrap().command, "uptime -p");
        assert!(store.find("nope").is_none());
    }

    #[test]
    fn test_remove_deletes_all_matches_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.json");
        let mut store = SnippetStore::open(&path).unwrap();
        store.add(snippet("up", "uptime")).unwrap();
        store.add(snippet("mem", "free -m")).unwrap();
        store.add(snippet("up", "uptime -p")).unwrap();

        assert_eq!(store.remove("up").unwrap(), 2);
        assert_eq!(store.remove("up").unwrap(), 0);
        assert_eq!(
            SnippetStore::load(&path).unwrap().unwrap(),
            vec![snippet("mem", "free -m")]
        );

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({"commands": [{"name": "mem", "command": "free -m", "description": ""}]})
        );
    }
}
