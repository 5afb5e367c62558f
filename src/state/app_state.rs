use super::{
    collection::Collection,
    environment::Environment,
    workspace::TabTracker,
};
use crate::error::AppError;

/// Shared application state: environments, the active selection, cached
/// collections and open tabs. Passed explicitly to whatever needs it.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub environments: Vec<Environment>,
    pub active_environment_id: Option<String>,
    pub collections: Vec<Collection>,
    pub tabs: TabTracker,
}

impl AppState {
    pub fn new(
        environments: Vec<Environment>,
        collections: Vec<Collection>,
        active_environment_id: Option<String>,
    ) -> Self {
        // Drop a persisted selection that no longer points anywhere.
        let active_environment_id =
            active_environment_id.filter(|id| environments.iter().any(|e| &e.id == id));
        Self {
            environments,
            active_environment_id,
            collections,
            tabs: TabTracker::default(),
        }
    }

    pub fn active_environment(&self) -> Option<&Environment> {
        let id = self.active_environment_id.as_deref()?;
        self.environment(id)
    }

    pub fn environment(&self, id: &str) -> Option<&Environment> {
        self.environments.iter().find(|e| e.id == id)
    }

    pub fn environment_mut(&mut self, id: &str) -> Option<&mut Environment> {
        self.environments.iter_mut().find(|e| e.id == id)
    }

    /// Look an environment up by id, then by display name.
    pub fn find_environment(&self, id_or_name: &str) -> Option<&Environment> {
        self.environment(id_or_name)
            .or_else(|| self.environments.iter().find(|e| e.name == id_or_name))
    }

    /// Select the active environment; `None` selects no environment.
    pub fn set_active_environment(&mut self, id: Option<&str>) -> Result<(), AppError> {
        match id {
            None => self.active_environment_id = None,
            Some(id) => {
                if self.environment(id).is_none() {
                    return Err(AppError::validation(format!("Unknown environment: {id}")));
                }
                self.active_environment_id = Some(id.to_string());
            }
        }
        Ok(())
    }

    pub fn add_environment(&mut self, env: Environment) -> String {
        let id = env.id.clone();
        self.environments.push(env);
        id
    }

    /// Remove an environment, clearing the active selection if it pointed here.
    pub fn remove_environment(&mut self, id: &str) -> Option<Environment> {
        let idx = self.environments.iter().position(|e| e.id == id)?;
        if self.active_environment_id.as_deref() == Some(id) {
            self.active_environment_id = None;
        }
        Some(self.environments.remove(idx))
    }

    pub fn upsert_variable(&mut self, env_id: &str, key: &str, value: &str) -> Result<(), AppError> {
        if key.is_empty() {
            return Err(AppError::validation("Variable name is empty"));
        }
        let env = self
            .environment_mut(env_id)
            .ok_or_else(|| AppError::validation(format!("Unknown environment: {env_id}")))?;
        env.upsert(key, value);
        Ok(())
    }

    pub fn remove_variable(&mut self, env_id: &str, key: &str) -> bool {
        self.environment_mut(env_id).is_some_and(|env| env.remove(key))
    }

    pub fn collection(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    /// Look a collection up by id, then by display name.
    pub fn find_collection(&self, id_or_name: &str) -> Option<&Collection> {
        self.collection(id_or_name)
            .or_else(|| self.collections.iter().find(|c| c.name == id_or_name))
    }
}
