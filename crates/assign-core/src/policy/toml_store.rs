//! Reference `PolicyStore` implementations: a TOML-file-backed store mirroring
//! the teacher's `storage::config::Config` load pattern, and an in-memory
//! builder used by tests and the in-process reference deployment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{EnvOverlay, GlobalPolicy, MeetingTypePriority, PolicyStore};
use crate::error::{CoreError, PolicyError, Result};
use crate::model::MeetingType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    global: GlobalPolicyRecord,
    #[serde(default)]
    meeting_types: HashMap<String, MeetingTypePriority>,
    #[serde(default)]
    environments: HashMap<String, EnvOverlay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GlobalPolicyRecord(GlobalPolicy);

impl Default for GlobalPolicyRecord {
    fn default() -> Self {
        Self(GlobalPolicy::default())
    }
}

/// Loads policy from a TOML file on disk, matching the shape of a real
/// environment-scoped policy table without requiring the relational store.
pub struct TomlPolicyStore {
    path: PathBuf,
    cache: RwLock<Option<PolicyFile>>,
}

impl TomlPolicyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    fn load_file(&self) -> Result<PolicyFile> {
        if let Some(cached) = self.cache.read().unwrap().as_ref() {
            return Ok(cached.clone());
        }
        let file = read_policy_file(&self.path)?;
        *self.cache.write().unwrap() = Some(file.clone());
        Ok(file)
    }

    /// Invalidate the cache after an external write to the policy file.
    pub fn invalidate(&self) {
        *self.cache.write().unwrap() = None;
    }
}

fn read_policy_file(path: &Path) -> Result<PolicyFile> {
    if !path.exists() {
        return Ok(PolicyFile::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| {
        CoreError::Policy(PolicyError::LoadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    })?;
    toml::from_str(&contents).map_err(|e| {
        CoreError::Policy(PolicyError::LoadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    })
}

#[async_trait]
impl PolicyStore for TomlPolicyStore {
    async fn load_global_policy(&self) -> Result<GlobalPolicy> {
        Ok(self.load_file()?.global.0)
    }

    async fn load_meeting_type_priority(
        &self,
        meeting_type: MeetingType,
        _environment_id: Option<&str>,
    ) -> Result<MeetingTypePriority> {
        let file = self.load_file()?;
        Ok(file
            .meeting_types
            .get(meeting_type_key(meeting_type))
            .copied()
            .unwrap_or_default())
    }

    async fn load_env_overlay(&self, environment_id: &str) -> Result<Option<EnvOverlay>> {
        Ok(self.load_file()?.environments.get(environment_id).cloned())
    }
}

fn meeting_type_key(meeting_type: MeetingType) -> &'static str {
    match meeting_type {
        MeetingType::Dr => "dr",
        MeetingType::Vip => "vip",
        MeetingType::Weekly => "weekly",
        MeetingType::General => "general",
        MeetingType::Urgent => "urgent",
        MeetingType::President => "president",
        MeetingType::Other => "other",
    }
}

/// In-memory `PolicyStore` for tests and the reference deployment.
#[derive(Default)]
pub struct InMemoryPolicyStore {
    global: RwLock<GlobalPolicy>,
    meeting_types: RwLock<HashMap<String, MeetingTypePriority>>,
    overlays: RwLock<HashMap<String, EnvOverlay>>,
}

impl InMemoryPolicyStore {
    pub fn new(global: GlobalPolicy) -> Self {
        Self {
            global: RwLock::new(global),
            meeting_types: RwLock::new(HashMap::new()),
            overlays: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_meeting_type_priority(&self, meeting_type: MeetingType, priority: MeetingTypePriority) {
        self.meeting_types
            .write()
            .unwrap()
            .insert(meeting_type_key(meeting_type).to_string(), priority);
    }

    pub fn set_env_overlay(&self, environment_id: impl Into<String>, overlay: EnvOverlay) {
        self.overlays.write().unwrap().insert(environment_id.into(), overlay);
    }

    pub fn set_global(&self, policy: GlobalPolicy) {
        *self.global.write().unwrap() = policy;
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn load_global_policy(&self) -> Result<GlobalPolicy> {
        Ok(self.global.read().unwrap().clone())
    }

    async fn load_meeting_type_priority(
        &self,
        meeting_type: MeetingType,
        _environment_id: Option<&str>,
    ) -> Result<MeetingTypePriority> {
        Ok(self
            .meeting_types
            .read()
            .unwrap()
            .get(meeting_type_key(meeting_type))
            .copied()
            .unwrap_or_default())
    }

    async fn load_env_overlay(&self, environment_id: &str) -> Result<Option<EnvOverlay>> {
        Ok(self.overlays.read().unwrap().get(environment_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_toml_file_yields_defaults() {
        let store = TomlPolicyStore::new("/nonexistent/path/policy.toml");
        let global = store.load_global_policy().await.unwrap();
        assert_eq!(global, GlobalPolicy::default());
    }

    #[tokio::test]
    async fn in_memory_store_round_trips_overlay() {
        let store = InMemoryPolicyStore::default();
        store.set_env_overlay(
            "env-1",
            EnvOverlay {
                auto_assign_enabled: true,
                ..Default::default()
            },
        );
        let overlay = store.load_env_overlay("env-1").await.unwrap().unwrap();
        assert!(overlay.auto_assign_enabled);
    }
}
