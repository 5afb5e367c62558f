use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::collection::Collection;
use crate::state::environment::Environment;
use crate::state::request_state::RequestData;

/// Persisted workspace (saved as a single TOML file).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct WorkspaceFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_environment_id: Option<String>,
    #[serde(default)]
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub collections: Vec<Collection>,
}

/// Destination of "save request" and source of saved collections.
pub trait CollectionStore {
    /// Persist `request` under `name` in a collection. Assigns an id to a
    /// request that has none; an existing id replaces the stored copy, even
    /// when it lived in another collection.
    fn save_request(
        &mut self,
        name: &str,
        collection_id: &str,
        request: RequestData,
    ) -> Result<RequestData, AppError>;

    fn load_collections(&self) -> Result<Vec<Collection>, AppError>;
}

/// Environment CRUD plus the persisted active selection.
pub trait EnvironmentStore {
    fn load_environments(&self) -> Result<Vec<Environment>, AppError>;
    fn save_environment(&mut self, env: &Environment) -> Result<(), AppError>;
    fn delete_environment(&mut self, id: &str) -> Result<bool, AppError>;
    fn active_environment_id(&self) -> Option<String>;
    fn set_active_environment_id(&mut self, id: Option<&str>) -> Result<(), AppError>;
}

/// Load a workspace file.
pub fn load_workspace(path: &Path) -> Result<WorkspaceFile, AppError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str::<WorkspaceFile>(&content)?)
}

/// Persist the workspace file, creating the directory if needed.
pub fn save_workspace(path: &Path, ws: &WorkspaceFile) -> Result<(), AppError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(ws)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// File-backed store: the whole workspace lives in one TOML file and is
/// rewritten on every change.
pub struct FileStore {
    path: PathBuf,
    workspace: WorkspaceFile,
}

impl FileStore {
    /// Open `path`, starting an empty workspace named `name` if it does not exist.
    pub fn open(path: impl Into<PathBuf>, name: &str) -> Result<Self, AppError> {
        let path = path.into();
        let workspace = if path.exists() {
            load_workspace(&path)?
        } else {
            WorkspaceFile {
                name: name.to_string(),
                ..Default::default()
            }
        };
        Ok(Self { path, workspace })
    }

    pub fn workspace(&self) -> &WorkspaceFile {
        &self.workspace
    }

    pub fn add_collection(&mut self, collection: Collection) -> Result<(), AppError> {
        self.commit(|ws| {
            ws.collections.push(collection);
            Ok(())
        })
    }

    /// Apply `change` to a copy of the workspace and write it. The in-memory
    /// workspace is replaced only once the file write succeeds.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut WorkspaceFile) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut next = self.workspace.clone();
        let out = change(&mut next)?;
        save_workspace(&self.path, &next)?;
        self.workspace = next;
        Ok(out)
    }
}

impl CollectionStore for FileStore {
    fn save_request(
        &mut self,
        name: &str,
        collection_id: &str,
        request: RequestData,
    ) -> Result<RequestData, AppError> {
        let mut saved = request;
        saved.name = name.to_string();
        if saved.id.is_empty() {
            saved.id = Uuid::new_v4().to_string();
        }

        let collection_name = self.commit(|ws| {
            // Ids are unique across the workspace: saving elsewhere moves it.
            for other in ws.collections.iter_mut().filter(|c| c.id != collection_id) {
                other.remove_request(&saved.id);
            }
            let target = ws
                .collections
                .iter_mut()
                .find(|c| c.id == collection_id)
                .ok_or_else(|| AppError::validation(format!("Unknown collection: {collection_id}")))?;
            target.upsert_request(saved.clone());
            Ok(target.name.clone())
        })?;
        info!(request = %saved.name, collection = %collection_name, "request saved");
        Ok(saved)
    }

    fn load_collections(&self) -> Result<Vec<Collection>, AppError> {
        Ok(self.workspace.collections.clone())
    }
}

impl EnvironmentStore for FileStore {
    fn load_environments(&self) -> Result<Vec<Environment>, AppError> {
        Ok(self.workspace.environments.clone())
    }

    fn save_environment(&mut self, env: &Environment) -> Result<(), AppError> {
        self.commit(|ws| {
            match ws.environments.iter_mut().find(|e| e.id == env.id) {
                Some(slot) => *slot = env.clone(),
                None => ws.environments.push(env.clone()),
            }
            Ok(())
        })
    }

    fn delete_environment(&mut self, id: &str) -> Result<bool, AppError> {
        let known = self.workspace.environments.iter().any(|e| e.id == id);
        let active = self.workspace.active_environment_id.as_deref() == Some(id);
        if !known && !active {
            return Ok(false);
        }
        self.commit(|ws| {
            ws.environments.retain(|e| e.id != id);
            if ws.active_environment_id.as_deref() == Some(id) {
                ws.active_environment_id = None;
            }
            Ok(())
        })?;
        Ok(known)
    }

    fn active_environment_id(&self) -> Option<String> {
        self.workspace.active_environment_id.clone()
    }

    fn set_active_environment_id(&mut self, id: Option<&str>) -> Result<(), AppError> {
        self.commit(|ws| {
            ws.active_environment_id = id.map(str::to_string);
            Ok(())
        })
    }
}
