use std::collections::HashMap;

use crate::env::interpolator::{parse_vars, substitute};
use crate::state::environment::Environment;

/// Snapshot of one environment's effective variables, ready for substitution.
#[derive(Debug, Clone, Default)]
pub struct EnvResolver {
    vars: HashMap<String, String>,
}

impl EnvResolver {
    /// Build from the active environment. `None` yields a resolver that
    /// returns every input unchanged.
    pub fn new(env: Option<&Environment>) -> Self {
        let mut vars = HashMap::new();
        if let Some(env) = env {
            // Later entries overwrite earlier ones: last write wins.
            for var in env.variables.iter().filter(|v| v.enabled) {
                vars.insert(var.key.clone(), var.value.clone());
            }
        }
        Self { vars }
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn resolve(&self, input: &str) -> String {
        substitute(input, &self.vars)
    }

    /// Placeholder names in `input` that this resolver cannot fill.
    pub fn unresolved(&self, input: &str) -> Vec<String> {
        parse_vars(input)
            .into_iter()
            .map(|(_, _, name)| name)
            .filter(|name| !self.vars.contains_key(name))
            .collect()
    }
}

/// Resolve `text` against `env` in one shot.
pub fn resolve(text: &str, env: Option<&Environment>) -> String {
    EnvResolver::new(env).resolve(text)
}
