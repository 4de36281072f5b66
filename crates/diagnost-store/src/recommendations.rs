//! Exact-match recommendation lookup. Unknown labels yield an empty string.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::StoreError;

/// Read-only label → recommendation lookup.
pub trait RecommendationStore: Send + Sync {
    /// Recommendation text for `label`, or `""` when there is none.
    fn recommendation(&self, label: &str) -> Result<String, StoreError>;
}

/// In-memory store loaded from a JSON object `{label: text}`.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecommendations {
    by_label: HashMap<String, String>,
}

impl MemoryRecommendations {
    #[cfg(test)]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            by_label: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let by_label: HashMap<String, String> = serde_json::from_str(&raw)?;
        info!(count = by_label.len(), path = %path.display(), "loaded recommendations");
        Ok(Self { by_label })
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

impl RecommendationStore for MemoryRecommendations {
    fn recommendation(&self, label: &str) -> Result<String, StoreError> {
        Ok(self.by_label.get(label).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn exact_match_only() {
        let store = MemoryRecommendations::from_pairs([("ОРВИ", "Обильное питьё, покой")]);
        assert_eq!(store.recommendation("ОРВИ").unwrap(), "Обильное питьё, покой");
        assert_eq!(store.recommendation("орви").unwrap(), "");
    }

    #[test]
    fn absent_label_is_empty_not_error() {
        let store = MemoryRecommendations::default();
        assert_eq!(store.recommendation("Z00").unwrap(), "");
    }

    #[test]
    fn loads_json_object() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"Гастрит": "Диета, контроль через 2 недели", "ОРВИ": "Покой"}}"#).unwrap();
        let store = MemoryRecommendations::load(f.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.recommendation("ОРВИ").unwrap(), "Покой");
    }

    #[test]
    fn missing_file_errors() {
        let err = MemoryRecommendations::load(Path::new("/nonexistent/recs.json")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn malformed_json_errors() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "[1, 2, 3]").unwrap();
        assert!(matches!(
            MemoryRecommendations::load(f.path()),
            Err(StoreError::Json(_))
        ));
    }
}
