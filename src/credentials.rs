//! Per-session credentials: the user's model key and the deployment search key.

use std::fmt;
use std::sync::Arc;

/// Per-session credentials.
///
/// The model key comes from the user and may be replaced or cleared; the
/// search key is the deployment secret shared by every session.
#[derive(Clone, Default)]
pub struct CredentialStore {
    model_api_key: Option<String>,
    search_api_key: Option<Arc<str>>,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |present: bool| if present { "***" } else { "<unset>" };
        f.debug_struct("CredentialStore")
            .field("model_api_key", &mask(self.model_api_key.is_some()))
            .field("search_api_key", &mask(self.search_api_key.is_some()))
            .finish()
    }
}

impl CredentialStore {
    #[must_use]
    pub fn new(search_api_key: Option<Arc<str>>) -> Self {
        Self {
            model_api_key: None,
            search_api_key: search_api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    /// Stores a trimmed, non-empty model key. Returns `false` (and leaves the
    /// current key alone) for blank input.
    pub fn set_model_key(&mut self, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() {
            return false;
        }
        self.model_api_key = Some(key.to_string());
        true
    }

    pub fn clear_model_key(&mut self) {
        self.model_api_key = None;
    }

    #[must_use]
    pub fn model_key(&self) -> Option<&str> {
        self.model_api_key.as_deref()
    }

    #[must_use]
    pub fn search_key(&self) -> Option<&str> {
        self.search_api_key.as_deref()
    }

    #[must_use]
    pub const fn has_model_key(&self) -> bool {
        self.model_api_key.is_some()
    }

    #[must_use]
    pub const fn has_search_key(&self) -> bool {
        self.search_api_key.is_some()
    }

    /// Both keys are present.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.has_model_key() && self.has_search_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear_model_key() {
        let mut store = CredentialStore::new(Some(Arc::from("search")));
        assert!(!store.is_configured());

        assert!(store.set_model_key("  K1 "));
        assert_eq!(store.model_key(), Some("K1"));
        assert!(store.is_configured());

        store.clear_model_key();
        assert!(store.model_key().is_none());
        assert!(!store.is_configured());
    }

    #[test]
    fn test_blank_model_key_ignored() {
        let mut store = CredentialStore::new(None);
        assert!(store.set_model_key("K1"));
        assert!(!store.set_model_key("   "));
        assert_eq!(store.model_key(), Some("K1"));
    }

    #[test]
    fn test_missing_search_key_never_configured() {
        let mut store = CredentialStore::new(None);
        store.set_model_key("K1");
        assert!(!store.is_configured());

        let store = CredentialStore::new(Some(Arc::from("  ")));
        assert!(!store.has_search_key());
    }

    #[test]
    fn test_debug_masks_keys() {
        let mut store = CredentialStore::new(Some(Arc::from("search-secret")));
        store.set_model_key("model-secret");
        let debug = format!("{store:?}");
        assert!(!debug.contains("search-secret"));
        assert!(!debug.contains("model-secret"));
        assert!(debug.contains("***"));
    }
}
