//! Persistence boundary (the real storage engine is an external collaborator).
//!
//! The core never talks to a database directly. It talks to the `Store`
//! trait; a real deployment backs it with the relational engine described in
//! the system-level design (transactions, row locks). `InMemoryStore` is the
//! reference implementation used by tests and the CLI demo.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{CoreError, Result};
use crate::model::{AssignmentLog, Booking, Environment, Interpreter};

/// Port through which the core reads and mutates booking/interpreter state.
///
/// `with_booking_transaction` models "reload row with `FOR UPDATE`, mutate,
/// commit" as a single async closure so the Run Coordinator never has to
/// reason about the storage engine's specific locking primitive.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_booking(&self, booking_id: i64) -> Result<Booking>;
    async fn list_bookings(&self) -> Result<Vec<Booking>>;
    async fn put_booking(&self, booking: Booking) -> Result<()>;

    async fn list_interpreters(&self, environment_id: Option<&str>) -> Result<Vec<Interpreter>>;
    async fn get_environment(&self, environment_id: &str) -> Result<Option<Environment>>;
    async fn environment_for_center(&self, center_code: &str) -> Result<Option<String>>;

    async fn append_assignment_log(&self, log: AssignmentLog) -> Result<()>;
    async fn assignment_logs_for(&self, emp_code: &str) -> Result<Vec<AssignmentLog>>;

    /// Run `f` with the booking row "locked" for the duration of the closure.
    /// The in-memory reference implementation serializes all transactions
    /// through a single mutex; a relational backend would instead take a row
    /// lock scoped to `booking_id`.
    async fn with_booking_transaction<F, Fut, T>(&self, booking_id: i64, f: F) -> Result<T>
    where
        F: FnOnce(Booking) -> Fut + Send,
        Fut: std::future::Future<Output = Result<(Booking, T)>> + Send,
        T: Send;
}

#[derive(Default)]
struct StoreData {
    bookings: HashMap<i64, Booking>,
    interpreters: Vec<Interpreter>,
    environments: HashMap<String, Environment>,
    center_to_environment: HashMap<String, String>,
    logs: Vec<AssignmentLog>,
}

/// In-memory reference `Store`. Not a database: the real engine is external.
pub struct InMemoryStore {
    data: Arc<RwLock<StoreData>>,
    txn_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            data: Arc::new(RwLock::new(StoreData::default())),
            txn_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_interpreter(&self, interpreter: Interpreter) {
        self.data.write().await.interpreters.push(interpreter);
    }

    pub async fn seed_environment(&self, environment: Environment) {
        let mut data = self.data.write().await;
        for center in &environment.center_codes {
            data.center_to_environment
                .insert(center.clone(), environment.environment_id.clone());
        }
        data.environments
            .insert(environment.environment_id.clone(), environment);
    }
}

#[async_trait]
impl Store for InMemoryStore {
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
        Ok(())
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
        Ok(())
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
