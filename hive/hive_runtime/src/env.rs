//! Node-wide environment strings.

use std::collections::HashMap;

use hive_concurrency::sync::SpinLock;

/// A write-once key/value store
#[derive(Default)]
pub struct Env {
    vars: SpinLock<HashMap<String, String>>,
}

impl Env {
    /// Create an environment seeded with `initial`
    pub fn new(initial: HashMap<String, String>) -> Self {
        Self {
            vars: SpinLock::new(initial),
        }
    }

    /// Copy of the value for `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars.lock().get(key).cloned()
    }

    /// Set a key. Existing keys are never overwritten; returns false if
    /// `key` was already set.
    pub fn set(&self, key: &str, value: &str) -> bool {
        let mut vars = self.vars.lock();
        if vars.contains_key(key) {
            return false;
        }
        vars.insert(key.to_string(), value.to_string());
        true
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("keys", &self.vars.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_once() {
        let env = Env::default();
        assert_eq!(env.get("thread"), None);
        assert!(env.set("thread", "8"));
        assert!(!env.set("thread", "4"));
        assert_eq!(env.get("thread").as_deref(), Some("8"));
    }

    #[test]
    fn test_seeded() {
        let mut initial = HashMap::new();
        initial.insert("harbor".to_string(), "1".to_string());
        let env = Env::new(initial);
        assert_eq!(env.get("harbor").as_deref(), Some("1"));
        assert!(!env.set("harbor", "2"));
    }
}
