//! Batched loader for one entity kind
//!
//! `load` calls that miss the cache register their key in the open batch,
//! yield once so sibling resolvers of the same request can register theirs,
//! then await the batch. The first waiter to poll the batch seals it and
//! issues a single `fetch_by_ids` for every key collected so far.
//!
//! Batches are plain futures shared between their waiters. Nothing is
//! spawned, so dropping the request drops the in-flight backend call.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt, Shared};
use indexmap::IndexSet;
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::LoaderSettings;
use crate::shared::error::{PlatformError, Result};
use crate::store::entity::{column, Entity, InsertInput, SqlValue, UpdateInput};
use crate::store::{timestamp_now, EntityStore, UpdateOutcome, WhereFilter};

type Resolved<E> = HashMap<Uuid, Option<Arc<E>>>;
type BatchResult<E> = std::result::Result<Arc<Resolved<E>>, Arc<PlatformError>>;
type SharedBatch<E> = Shared<BoxFuture<'static, BatchResult<E>>>;

struct PendingBatch<E> {
    keys: Arc<Mutex<IndexSet<Uuid>>>,
    future: SharedBatch<E>,
}

struct LoaderState<E> {
    /// `None` records a key known to be absent.
    cache: HashMap<Uuid, Option<Arc<E>>>,
    /// Batch still accepting keys.
    pending: Option<PendingBatch<E>>,
    /// Keys waiting on a batch, sealed or not.
    in_flight: HashMap<Uuid, SharedBatch<E>>,
}

/// Request-scoped loader for entity `E`.
pub struct Loader<E: Entity> {
    store: Arc<dyn EntityStore<E>>,
    settings: LoaderSettings,
    state: Arc<Mutex<LoaderState<E>>>,
}

impl<E: Entity> Loader<E> {
    pub fn new(store: Arc<dyn EntityStore<E>>, settings: LoaderSettings) -> Self {
        Self {
            store,
            settings,
            state: Arc::new(Mutex::new(LoaderState {
                cache: HashMap::new(),
                pending: None,
                in_flight: HashMap::new(),
            })),
        }
    }

    /// Load one record by key. Absent keys resolve to `None`.
    pub async fn load(&self, key: Uuid) -> Result<Option<Arc<E>>> {
        let batch = {
            let mut state = self.state.lock();
            if let Some(cached) = state.cache.get(&key) {
                return Ok(cached.clone());
            }
            self.enqueue(&mut state, key)
        };

        // Let the other resolvers of this tick join the batch.
        tokio::task::yield_now().await;

        let resolved = batch.await.map_err(PlatformError::BatchLoad)?;
        Ok(resolved.get(&key).cloned().flatten())
    }

    /// Load several keys; all misses share batches.
    pub async fn load_many(&self, keys: &[Uuid]) -> Result<Vec<Option<Arc<E>>>> {
        future::try_join_all(keys.iter().map(|key| self.load(*key))).await
    }

    /// Records with `field = value`. Not cached.
    pub async fn filter_by(&self, field: &str, value: impl Into<SqlValue>) -> Result<Vec<Arc<E>>> {
        let field = column::<E>(field)?.name;
        let rows = self.store.filter_by(field, value.into()).await?;
        Ok(rows.into_iter().map(Arc::new).collect())
    }

    /// Up to `limit` records after `skip`, optionally filtered.
    pub async fn page(
        &self,
        skip: i64,
        limit: i64,
        filter: Option<&WhereFilter>,
    ) -> Result<Vec<Arc<E>>> {
        if skip < 0 {
            return Err(PlatformError::validation(format!(
                "skip must not be negative, got {}",
                skip
            )));
        }
        if limit <= 0 {
            return Err(PlatformError::validation(format!(
                "limit must be positive, got {}",
                limit
            )));
        }

        let rows = self.store.page(skip, limit, filter).await?;
        Ok(rows.into_iter().map(Arc::new).collect())
    }

    /// Persist a new record and cache it under its key.
    pub async fn insert(&self, input: E::Insert) -> Result<Arc<E>> {
        let id = input.id().unwrap_or_else(Uuid::new_v4);
        let record = Arc::new(self.store.insert(id, timestamp_now(), &input).await?);

        self.state.lock().cache.insert(id, Some(record.clone()));
        debug!(kind = %E::KIND, id = %id, "Inserted");
        Ok(record)
    }

    /// Apply an update guarded by its `lastchange` token.
    ///
    /// Only a successful update touches the cache.
    pub async fn update(&self, input: E::Update) -> Result<UpdateOutcome<Arc<E>>> {
        let id = input.id();
        let outcome = self.store.update(timestamp_now(), &input).await?;

        Ok(match outcome {
            UpdateOutcome::Updated(record) => {
                let record = Arc::new(record);
                self.state.lock().cache.insert(id, Some(record.clone()));
                debug!(kind = %E::KIND, id = %id, "Updated");
                UpdateOutcome::Updated(record)
            }
            UpdateOutcome::NotFound => UpdateOutcome::NotFound,
            UpdateOutcome::Conflict => {
                debug!(kind = %E::KIND, id = %id, "Update conflict");
                UpdateOutcome::Conflict
            }
        })
    }

    /// Whether `key` has a cached entry (present or absent).
    pub fn is_cached(&self, key: Uuid) -> bool {
        self.state.lock().cache.contains_key(&key)
    }

    fn enqueue(&self, state: &mut LoaderState<E>, key: Uuid) -> SharedBatch<E> {
        if let Some(batch) = state.in_flight.get(&key) {
            return batch.clone();
        }

        let full = state
            .pending
            .as_ref()
            .is_some_and(|p| p.keys.lock().len() >= self.settings.max_batch_size);
        if full {
            debug!(kind = %E::KIND, size = self.settings.max_batch_size, "Batch full, sealing");
            state.pending = None;
        }

        let batch = {
            let pending = state.pending.get_or_insert_with(|| self.open_batch());
            pending.keys.lock().insert(key);
            pending.future.clone()
        };
        state.in_flight.insert(key, batch.clone());
        batch
    }

    fn open_batch(&self) -> PendingBatch<E> {
        let keys = Arc::new(Mutex::new(IndexSet::new()));
        let future = dispatch(
            self.store.clone(),
            Arc::downgrade(&self.state),
            keys.clone(),
            self.settings.batch_delay,
        )
        .boxed()
        .shared();

        PendingBatch { keys, future }
    }
}

async fn dispatch<E: Entity>(
    store: Arc<dyn EntityStore<E>>,
    state: Weak<Mutex<LoaderState<E>>>,
    keys: Arc<Mutex<IndexSet<Uuid>>>,
    delay: Duration,
) -> BatchResult<E> {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    // Seal: loads from here on open a new batch.
    if let Some(shared) = state.upgrade() {
        let mut state = shared.lock();
        if state
            .pending
            .as_ref()
            .is_some_and(|p| Arc::ptr_eq(&p.keys, &keys))
        {
            state.pending = None;
        }
    }
    let batch: Vec<Uuid> = keys.lock().iter().copied().collect();

    debug!(kind = %E::KIND, keys = batch.len(), "Dispatching batch");
    let result = store.fetch_by_ids(&batch).await;

    let shared = state.upgrade();
    let mut guard = shared.as_ref().map(|s| s.lock());

    match result {
        Ok(rows) => {
            let mut found: HashMap<Uuid, Arc<E>> = rows
                .into_iter()
                .map(|row| (row.id(), Arc::new(row)))
                .collect();

            let mut resolved = HashMap::with_capacity(batch.len());
            for key in batch {
                let fetched = found.remove(&key);
                let value = match guard.as_deref_mut() {
                    // An insert or update that landed meanwhile wins.
                    Some(state) => {
                        state.in_flight.remove(&key);
                        state.cache.entry(key).or_insert(fetched).clone()
                    }
                    None => fetched,
                };
                resolved.insert(key, value);
            }
            Ok(Arc::new(resolved))
        }
        Err(err) => {
            if let Some(state) = guard.as_deref_mut() {
                for key in &batch {
                    state.in_flight.remove(key);
                }
            }
            warn!(kind = %E::KIND, keys = batch.len(), error = %err, "Batch load failed");
            Err(Arc::new(err))
        }
    }
}
