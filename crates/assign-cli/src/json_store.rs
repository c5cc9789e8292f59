//! File-backed `Store`/`PolicyStore` adapters for the CLI demo.
//!
//! `assign-core` treats the real storage engine as an external collaborator
//! and only depends on the `Store` trait. This module is the CLI's own
//! stand-in: a single JSON document, read on open and rewritten after every
//! mutation, in the same load/save-whole-document spirit as the TOML policy
//! file in `assign_core::policy::toml_store`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use assign_core::{AssignmentLog, Booking, CoreError, Environment, Interpreter, Result, Store};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    bookings: HashMap<i64, Booking>,
    interpreters: Vec<Interpreter>,
    environments: HashMap<String, Environment>,
    center_to_environment: HashMap<String, String>,
    logs: Vec<AssignmentLog>,
}

pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<Document>,
    txn_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::Internal(format!("creating {}: {e}", parent.display())))?;
        }
        let data = read_document(&path)?;
        Ok(Self {
            path,
            data: RwLock::new(data),
            txn_lock: Mutex::new(()),
        })
    }

    async fn persist(&self) -> Result<()> {
        let data = self.data.read().await;
        let json = serde_json::to_string_pretty(&*data)?;
        std::fs::write(&self.path, json).map_err(|e| CoreError::Internal(format!("writing {}: {e}", self.path.display())))
    }

    pub async fn seed_interpreter(&self, interpreter: Interpreter) -> Result<()> {
        self.data.write().await.interpreters.push(interpreter);
        self.persist().await
    }

    pub async fn seed_environment(&self, environment: Environment) -> Result<()> {
        {
            let mut data = self.data.write().await;
            for center in &environment.center_codes {
                data.center_to_environment
                    .insert(center.clone(), environment.environment_id.clone());
            }
            data.environments
                .insert(environment.environment_id.clone(), environment);
        }
        self.persist().await
    }
}

fn read_document(path: &Path) -> Result<Document> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).map_err(CoreError::from),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::default()),
        Err(e) => Err(CoreError::Internal(format!("reading {}: {e}", path.display()))),
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn get_booking(&self, booking_id: i64) -> Result<Booking> {
        self.data
            .read()
            .await
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("booking {booking_id}")))
    }

    async fn list_bookings(&self) -> Result<Vec<Booking>> {
        Ok(self.data.read().await.bookings.values().cloned().collect())
    }

    async fn put_booking(&self, booking: Booking) -> Result<()> {
        self.data.write().await.bookings.insert(booking.booking_id, booking);
        self.persist().await
    }

    async fn list_interpreters(&self, environment_id: Option<&str>) -> Result<Vec<Interpreter>> {
        let data = self.data.read().await;
        Ok(data
            .interpreters
            .iter()
            .filter(|i| match environment_id {
                Some(env) => i.environment_id.as_deref() == Some(env),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn get_environment(&self, environment_id: &str) -> Result<Option<Environment>> {
        Ok(self.data.read().await.environments.get(environment_id).cloned())
    }

    async fn environment_for_center(&self, center_code: &str) -> Result<Option<String>> {
        Ok(self
            .data
            .read()
            .await
            .center_to_environment
            .get(center_code)
            .cloned())
    }

    async fn append_assignment_log(&self, log: AssignmentLog) -> Result<()> {
        self.data.write().await.logs.push(log);
        self.persist().await
    }

    async fn assignment_logs_for(&self, emp_code: &str) -> Result<Vec<AssignmentLog>> {
        Ok(self
            .data
            .read()
            .await
            .logs
            .iter()
            .filter(|l| l.interpreter_emp_code.as_deref() == Some(emp_code))
            .cloned()
            .collect())
    }

    async fn with_booking_transaction<F, Fut, T>(&self, booking_id: i64, f: F) -> Result<T>
    where
        F: FnOnce(Booking) -> Fut + Send,
        Fut: std::future::Future<Output = Result<(Booking, T)>> + Send,
        T: Send,
    {
        let _txn_guard = self.txn_lock.lock().await;
        let booking = self.get_booking(booking_id).await?;
        let (updated, value) = f(booking).await?;
        self.put_booking(updated).await?;
        Ok(value)
    }
}

/// Returns `~/.config/assign-cli[-dev]/state.json` based on `ASSIGN_ENV`.
///
/// Set `ASSIGN_ENV=dev` to use a separate development data directory.
pub fn default_store_path() -> PathBuf {
    let base_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config");
    let env = std::env::var("ASSIGN_ENV").unwrap_or_else(|_| "production".to_string());
    let dir = if env == "dev" {
        base_dir.join("assign-cli-dev")
    } else {
        base_dir.join("assign-cli")
    };
    dir.join("state.json")
}
