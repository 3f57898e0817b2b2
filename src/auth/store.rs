use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::domain::ApiKeyCreds;
use crate::execution::errors::EngineError;

/// Injected credential storage, keyed by wallet address. Persistence is a
/// whole-map read-modify-write; callers must serialize mutation per address.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<HashMap<String, ApiKeyCreds>, EngineError>;
    fn save(&self, map: &HashMap<String, ApiKeyCreds>) -> Result<(), EngineError>;
}

// ==================================================
// FILE-BACKED STORE
// ==================================================

/// JSON file store. A missing file reads as an empty map.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<HashMap<String, ApiKeyCreds>, EngineError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| EngineError::Store(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| EngineError::Store(e.to_string()))
    }

    fn save(&self, map: &HashMap<String, ApiKeyCreds>) -> Result<(), EngineError> {
        let content =
            serde_json::to_string_pretty(map).map_err(|e| EngineError::Store(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| EngineError::Store(e.to_string()))
    }
}

// ==================================================
// IN-MEMORY STORE
// ==================================================

#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<HashMap<String, ApiKeyCreds>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<HashMap<String, ApiKeyCreds>, EngineError> {
        Ok(self.inner.lock().expect("store lock").clone())
    }

    fn save(&self, map: &HashMap<String, ApiKeyCreds>) -> Result<(), EngineError> {
        *self.inner.lock().expect("store lock") = map.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(tag: &str) -> ApiKeyCreds {
        ApiKeyCreds {
            key: format!("key-{}", tag),
            secret: format!("secret-{}", tag),
            passphrase: format!("pass-{}", tag),
        }
    }

    #[test]
    fn file_store_reads_missing_file_as_empty() {
        let path = std::env::temp_dir().join("pwt-store-missing.json");
        let _ = std::fs::remove_file(&path);
        let store = FileCredentialStore::new(path);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn file_store_merge_preserves_other_addresses() {
        let path = std::env::temp_dir().join(format!("pwt-store-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let store = FileCredentialStore::new(path.clone());

        let mut map = store.load().unwrap();
        map.insert("0xaaa".to_string(), creds("a"));
        store.save(&map).unwrap();

        // read-modify-write for a second address keeps the first
        let mut map = store.load().unwrap();
        map.insert("0xbbb".to_string(), creds("b"));
        store.save(&map).unwrap();

        let map = store.load().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["0xaaa"].key, "key-a");
        assert_eq!(map["0xbbb"].key, "key-b");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryCredentialStore::new();
        let mut map = store.load().unwrap();
        map.insert("0xabc".to_string(), creds("m"));
        store.save(&map).unwrap();
        assert_eq!(store.load().unwrap()["0xabc"].secret, "secret-m");
    }
}
