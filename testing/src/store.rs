use async_trait::async_trait;
use lingocore::{
    error::BackendError,
    store::{
        KeyedStore,
        RangeQuery,
        ancestors,
        nest,
        split_leaf,
    },
    teacher::Teacher,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::sync::Semaphore;

use crate::fixtures::profile_value;

/// Suspends calls until permits are released, so tests can observe
/// state while a remote call is outstanding.
#[derive(Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn new() -> Self {
        Self(Arc::new(Semaphore::new(0)))
    }

    /// Let `n` suspended (or future) calls through.
    pub fn release(&self, n: usize) {
        self.0.add_permits(n);
    }

    async fn pass(&self) {
        if let Ok(permit) = self.0.acquire().await {
            permit.forget();
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct Inner {
    nodes: Mutex<BTreeMap<String, Value>>,
    range_calls: AtomicUsize,
    get_calls: AtomicUsize,
    write_calls: AtomicUsize,
    fail_ranges: AtomicUsize,
    fail_gets: AtomicUsize,
    fail_writes: AtomicUsize,
    range_gate: Mutex<Option<Gate>>,
    write_gate: Mutex<Option<Gate>>,
}

/// An in-memory `KeyedStore` keeping leaf values by full path, with
/// call counters and failure injection.
#[derive(Clone, Default)]
pub struct MemoryStore(Arc<Inner>);

fn take_one(counter: &AtomicUsize) -> bool {
    counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn injected(op: &str) -> BackendError {
    BackendError::Unavailable(format!("injected {op} failure"))
}

fn descendants_prefix(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_teachers<'a>(
        collection: &str,
        teachers: impl IntoIterator<Item = &'a Teacher>,
    ) -> Self {
        let store = Self::new();
        store.insert_teachers(collection, teachers);
        store
    }

    pub fn insert_teachers<'a>(
        &self,
        collection: &str,
        teachers: impl IntoIterator<Item = &'a Teacher>,
    ) {
        let mut nodes = self.0.nodes.lock();
        for teacher in teachers {
            nodes.insert(format!("{collection}/{}", teacher.id), profile_value(teacher));
        }
    }

    /// Write directly, bypassing counters and injected failures.
    pub fn insert(&self, path: &str, value: Value) {
        self.0.nodes.lock().insert(path.to_string(), value);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.nodes.lock().contains_key(path)
    }

    pub fn range_calls(&self) -> usize {
        self.0.range_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.0.get_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.0.write_calls.load(Ordering::SeqCst)
    }

    /// Fail the next `n` range queries.
    pub fn fail_ranges(&self, n: usize) {
        self.0.fail_ranges.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` gets.
    pub fn fail_gets(&self, n: usize) {
        self.0.fail_gets.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` writes or deletes.
    pub fn fail_writes(&self, n: usize) {
        self.0.fail_writes.store(n, Ordering::SeqCst);
    }

    /// Range queries will suspend until the returned gate is released.
    pub fn gate_ranges(&self) -> Gate {
        let gate = Gate::new();
        *self.0.range_gate.lock() = Some(gate.clone());
        gate
    }

    /// Writes and deletes will suspend until the returned gate is
    /// released.
    pub fn gate_writes(&self) -> Gate {
        let gate = Gate::new();
        *self.0.write_gate.lock() = Some(gate.clone());
        gate
    }

    fn remove_subtree(nodes: &mut BTreeMap<String, Value>, path: &str) {
        let prefix = descendants_prefix(path);
        nodes.remove(path);
        nodes.retain(|key, _| !key.starts_with(&prefix));
    }

    fn split_ancestor(nodes: &mut BTreeMap<String, Value>, path: &str) {
        let found = ancestors(path)
            .find(|ancestor| nodes.contains_key(*ancestor))
            .map(str::to_string);
        if let Some(ancestor) = found {
            if let Some(value) = nodes.remove(&ancestor) {
                nodes.extend(split_leaf(&ancestor, value, path));
            }
        }
    }

    async fn pass_write_gate(&self) {
        let gate = self.0.write_gate.lock().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
    }
}

#[async_trait]
impl KeyedStore for MemoryStore {
    async fn range_query(
        &self,
        query: &RangeQuery,
    ) -> Result<Vec<(String, Value)>, BackendError> {
        self.0.range_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.0.range_gate.lock().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if take_one(&self.0.fail_ranges) {
            return Err(injected("range query"));
        }
        let prefix = descendants_prefix(&query.collection);
        let nodes = self.0.nodes.lock();
        Ok(nodes.range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter_map(|(path, value)| {
                let key = &path[prefix.len()..];
                (!key.contains('/')).then(|| (key.to_string(), value.clone()))
            })
            .filter(|(key, _)| query.admits(key))
            .take(query.limit)
            .collect())
    }

    async fn get(
        &self,
        path: &str,
    ) -> Result<Option<Value>, BackendError> {
        self.0.get_calls.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.0.fail_gets) {
            return Err(injected("get"));
        }
        let nodes = self.0.nodes.lock();
        if let Some(value) = nodes.get(path) {
            return Ok(Some(value.clone()));
        }
        let prefix = descendants_prefix(path);
        Ok(nest(
            nodes.range(prefix.clone()..)
                .take_while(|(key, _)| key.starts_with(&prefix))
                .map(|(key, value)| (key[prefix.len()..].to_string(), value.clone()))
        ))
    }

    async fn write(
        &self,
        path: &str,
        value: Value,
    ) -> Result<(), BackendError> {
        self.0.write_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_write_gate().await;
        if take_one(&self.0.fail_writes) {
            return Err(injected("write"));
        }
        let mut nodes = self.0.nodes.lock();
        Self::split_ancestor(&mut nodes, path);
        Self::remove_subtree(&mut nodes, path);
        nodes.insert(path.to_string(), value);
        Ok(())
    }

    async fn delete(
        &self,
        path: &str,
    ) -> Result<(), BackendError> {
        self.0.write_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_write_gate().await;
        if take_one(&self.0.fail_writes) {
            return Err(injected("delete"));
        }
        let mut nodes = self.0.nodes.lock();
        Self::split_ancestor(&mut nodes, path);
        Self::remove_subtree(&mut nodes, path);
        Ok(())
    }
}
