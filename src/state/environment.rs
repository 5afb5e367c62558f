use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVariable {
    pub key: String,
    pub value: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for EnvVariable {
    fn default() -> Self {
        Self {
            key: String::new(),
            value: String::new(),
            enabled: true,
        }
    }
}

impl EnvVariable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }
}

/// A named, ordered set of variables. Keys should be unique; when they are
/// not, the last enabled entry wins during substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub variables: Vec<EnvVariable>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: String::from("New Environment"),
            variables: Vec::new(),
        }
    }
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push(EnvVariable::new(key, value));
        self
    }

    /// Effective value of `key`: the last enabled entry with that key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables
            .iter()
            .rev()
            .find(|v| v.enabled && v.key == key)
            .map(|v| v.value.as_str())
    }

    /// Set `key` to `value`, editing the last entry with that key or appending one.
    pub fn upsert(&mut self, key: &str, value: impl Into<String>) {
        match self.variables.iter_mut().rev().find(|v| v.key == key) {
            Some(var) => var.value = value.into(),
            None => self.variables.push(EnvVariable::new(key, value)),
        }
    }

    /// Remove every entry with `key`. Returns whether anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.variables.len();
        self.variables.retain(|v| v.key != key);
        self.variables.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_last_duplicate_wins() {
        let env = Environment::new("Dev").with_var("host", "a").with_var("host", "b");
        assert_eq!(env.get("host"), Some("b"));
    }

    #[test]
    fn test_get_skips_disabled() {
        let mut env = Environment::new("Dev").with_var("host", "a").with_var("host", "b");
        env.variables[1].enabled = false;
        assert_eq!(env.get("host"), Some("a"));
    }

    #[test]
    fn test_upsert_and_remove() {
        let mut env = Environment::new("Dev");
        env.upsert("token", "one");
        env.upsert("token", "two");
        assert_eq!(env.variables.len(), 1);
        assert_eq!(env.get("token"), Some("two"));
        assert!(env.remove("token"));
        assert!(!env.remove("token"));
        assert_eq!(env.get("token"), None);
    }
}
