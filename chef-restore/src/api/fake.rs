//! In-memory [`ChefApi`] for restore tests.
//!
//! Entities are keyed by API path (`nodes/web1`, `data/users/alice`). Every
//! call is recorded in order with the ticks at which it started and finished,
//! and the peak number of concurrent calls is kept. Data bag item calls fail
//! with `NotFound` when their bag did not exist as the call started.

use super::{ApiError, ApiResult, ChefApi, ClientPayload, EntityKind, UserPayload};
use crate::cookbook::Cookbook;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Update(String),
    Create(String),
    CreateDataBag(String),
    UpdateItem(String),
    CreateItem(String),
    CreateClient(Value),
    CreateUser(Value),
    UploadCookbook {
        name: String,
        version: String,
        staged: PathBuf,
        staged_existed: bool,
    },
}

/// A finished call with its start and end ticks
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub call: Call,
    pub started: usize,
    pub finished: usize,
}

#[derive(Debug, Default)]
pub struct FakeChefApi {
    existing: Mutex<HashSet<String>>,
    rejected: Mutex<HashMap<String, u16>>,
    calls: Mutex<Vec<Call>>,
    spans: Mutex<Vec<Span>>,
    ticks: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl FakeChefApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities the server already has
    pub fn with_existing<'a>(self, keys: impl IntoIterator<Item = &'a str>) -> Self {
        self.existing
            .lock()
            .unwrap()
            .extend(keys.into_iter().map(str::to_string));
        self
    }

    /// Answer calls touching `key` with `status`
    pub fn rejecting(self, key: &str, status: u16) -> Self {
        self.rejected.lock().unwrap().insert(key.to_string(), status);
        self
    }

    /// Hold every call open for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn spans(&self) -> Vec<Span> {
        self.spans.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, key: &str, call: Call) -> ApiResult<()> {
        let started = self.ticks.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.calls.lock().unwrap().push(call.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let finished = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.spans.lock().unwrap().push(Span {
            call,
            started,
            finished,
        });

        let rejected = self.rejected.lock().unwrap().get(key).copied();
        match rejected {
            Some(status) => Err(ApiError::from_status(status, format!("{key} rejected"))),
            None => Ok(()),
        }
    }

    fn exists(&self, key: &str) -> ApiResult<()> {
        if self.existing.lock().unwrap().contains(key) {
            Ok(())
        } else {
            Err(ApiError::NotFound(key.to_string()))
        }
    }

    fn insert(&self, key: &str) -> ApiResult<()> {
        if self.existing.lock().unwrap().insert(key.to_string()) {
            Ok(())
        } else {
            Err(ApiError::Conflict(key.to_string()))
        }
    }
}

fn name_of<'a>(body: &'a Value, field: &str) -> &'a str {
    body.get(field).and_then(Value::as_str).unwrap_or_default()
}

#[async_trait]
impl ChefApi for FakeChefApi {
    async fn update(&self, kind: EntityKind, name: &str, _body: &Value) -> ApiResult<()> {
        let key = format!("{}/{}", kind.collection(), name);
        self.enter(&key, Call::Update(key.clone())).await?;
        self.exists(&key)
    }

    async fn create(&self, kind: EntityKind, body: &Value) -> ApiResult<()> {
        let key = format!("{}/{}", kind.collection(), name_of(body, "name"));
        self.enter(&key, Call::Create(key.clone())).await?;
        self.insert(&key)
    }

    async fn create_data_bag(&self, name: &str) -> ApiResult<()> {
        let key = format!("data/{name}");
        self.enter(&key, Call::CreateDataBag(name.to_string())).await?;
        self.insert(&key)
    }

    async fn update_data_bag_item(&self, bag: &str, id: &str, _body: &Value) -> ApiResult<()> {
        let key = format!("data/{bag}/{id}");
        let bag_exists = self.exists(&format!("data/{bag}"));
        self.enter(&key, Call::UpdateItem(key.clone())).await?;
        bag_exists?;
        self.exists(&key)
    }

    async fn create_data_bag_item(&self, bag: &str, body: &Value) -> ApiResult<()> {
        let key = format!("data/{bag}/{}", name_of(body, "id"));
        let bag_exists = self.exists(&format!("data/{bag}"));
        self.enter(&key, Call::CreateItem(key.clone())).await?;
        bag_exists?;
        self.insert(&key)
    }

    async fn create_client(&self, payload: &ClientPayload) -> ApiResult<()> {
        let body = serde_json::to_value(payload).map_err(|e| ApiError::Decode(e.to_string()))?;
        let key = format!("clients/{}", name_of(&body, "name"));
        self.enter(&key, Call::CreateClient(body)).await?;
        self.insert(&key)
    }

    async fn create_user(&self, payload: &UserPayload) -> ApiResult<()> {
        let body = serde_json::to_value(payload).map_err(|e| ApiError::Decode(e.to_string()))?;
        let key = format!("users/{}", payload.username);
        self.enter(&key, Call::CreateUser(body)).await?;
        self.insert(&key)
    }

    async fn upload_cookbook(&self, cookbook: &Cookbook) -> ApiResult<()> {
        let key = format!("cookbooks/{}", cookbook.name);
        let call = Call::UploadCookbook {
            name: cookbook.name.clone(),
            version: cookbook.version.clone(),
            staged: cookbook.root.clone(),
            staged_existed: cookbook.root.exists(),
        };
        self.enter(&key, call).await?;
        self.existing.lock().unwrap().insert(key);
        Ok(())
    }
}
