//! In-memory credential source implementation.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;

use super::{CredentialSource, SourceError};

/// In-memory credential source for tests, and for env files loaded at startup.
///
/// # Thread Safety
///
/// This implementation uses interior mutability via `RwLock` and is
/// safe to share across threads.
pub struct MemorySource {
    data: RwLock<HashMap<String, String>>,
}

impl MemorySource {
    /// Create a new empty memory source.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Create a memory source with initial data.
    pub fn with_data(data: HashMap<String, String>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Parse dotenv-style content (`KEY=VALUE` per line, `#` comments).
    ///
    /// `origin` is only used in error messages.
    pub fn from_env_str(content: &str, origin: &str) -> Result<Self, SourceError> {
        let mut data = HashMap::new();

        for (index, raw) in content.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match parse_env_line(raw) {
                Some((key, value)) => {
                    data.insert(key.to_string(), value.to_string());
                }
                None => {
                    return Err(SourceError::Malformed {
                        path: origin.to_string(),
                        line: index + 1,
                    });
                }
            }
        }

        Ok(Self::with_data(data))
    }

    /// Load a dotenv-style file.
    pub async fn load_env_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        tracing::debug!("loading credentials from env file {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SourceError::Io {
                path: path.display().to_string(),
                source,
            })?;

        Self::from_env_str(&content, &path.display().to_string())
    }

    /// Insert or replace a value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.data.write().insert(key.into(), value.into());
    }

    /// Remove a value.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.data.write().remove(key)
    }

    /// All keys currently held, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySource")
            .field("keys_count", &self.data.read().len())
            .finish()
    }
}

impl CredentialSource for MemorySource {
    fn get(&self, key: &str) -> Option<String> {
        self.data
            .read()
            .get(key)
            .filter(|value| !value.is_empty())
            .cloned()
    }
}

/// Split one dotenv line into key and value.
///
/// Accepts an optional `export ` prefix and strips one pair of matching
/// surrounding quotes from the value. Everything after the first `=` belongs
/// to the value. Returns `None` for blank lines, comments, and lines without `=`.
pub fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value = value.trim();
    let value = ['"', '\'']
        .iter()
        .find_map(|q| {
            value
                .strip_prefix(*q)
                .and_then(|v| v.strip_suffix(*q))
        })
        .unwrap_or(value);

    Some((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_insert_get() {
        let source = MemorySource::new();
        source.insert("OPENAI_API_KEY", "sk-test");

        assert_eq!(source.get("OPENAI_API_KEY").as_deref(), Some("sk-test"));
        assert!(source.get("nonexistent").is_none());
    }

    #[test]
    fn test_memory_source_remove() {
        let source = MemorySource::new();
        source.insert("GROQ_API_KEY", "gsk");

        assert_eq!(source.remove("GROQ_API_KEY").as_deref(), Some("gsk"));
        assert!(source.get("GROQ_API_KEY").is_none());
    }

    #[test]
    fn test_memory_source_empty_value_is_absent() {
        let source = MemorySource::new();
        source.insert("COHERE_API_KEY", "");
        assert!(source.get("COHERE_API_KEY").is_none());
    }

    #[test]
    fn test_from_env_str() {
        let content = "\
# API keys
OPENAI_API_KEY=sk-abc=def
export GROQ_API_KEY=\"gsk-quoted\"

API_PRIORITY = groq, openai
";
        let source = MemorySource::from_env_str(content, ".env.local").unwrap();

        assert_eq!(source.get("OPENAI_API_KEY").as_deref(), Some("sk-abc=def"));
        assert_eq!(source.get("GROQ_API_KEY").as_deref(), Some("gsk-quoted"));
        assert_eq!(source.get("API_PRIORITY").as_deref(), Some("groq, openai"));
        assert_eq!(source.keys().len(), 3);
    }

    #[test]
    fn test_from_env_str_malformed_line() {
        let result = MemorySource::from_env_str("OK=1\nnot a pair\n", "broken.env");
        assert!(matches!(
            result,
            Err(SourceError::Malformed { line: 2, .. })
        ));
    }

    #[test]
    fn test_parse_env_line_edge_cases() {
        assert_eq!(parse_env_line("# comment"), None);
        assert_eq!(parse_env_line("   "), None);
        assert_eq!(parse_env_line("=value"), None);
        assert_eq!(parse_env_line("KEY="), Some(("KEY", "")));
        assert_eq!(parse_env_line("KEY='single'"), Some(("KEY", "single")));
    }

    #[tokio::test]
    async fn test_load_env_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".env.local");
        std::fs::write(&path, "HUGGINGFACE_API_KEY=hf_token\n").unwrap();

        let source = MemorySource::load_env_file(&path).await.unwrap();
        assert_eq!(source.get("HUGGINGFACE_API_KEY").as_deref(), Some("hf_token"));
    }

    #[tokio::test]
    async fn test_load_env_file_missing() {
        let result = MemorySource::load_env_file("/nonexistent/sealbox/.env").await;
        assert!(matches!(result, Err(SourceError::Io { .. })));
    }
}
