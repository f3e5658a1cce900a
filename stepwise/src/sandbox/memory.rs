//! In-memory stores implementing the sandbox transaction capabilities.
//!
//! Both are cheap to clone; clones share state, so the application under test and the sandbox
//! can each hold a handle to the same store.

use super::{ReadModelTransactions, WriteModelTransactions};
use crate::{correlation::CorrelationId, error::BoxError};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};
use thiserror::Error;

pub type Documents = BTreeMap<String, Value>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
    #[error("A transaction is already open")]
    TransactionAlreadyOpen,
    #[error("No transaction is open")]
    NoActiveTransaction,
    #[error("No transaction is open for {0}")]
    UnknownScope(CorrelationId),
    #[error("The lock was poisoned")]
    PoisonedLock,
}

#[derive(Debug, Default)]
struct WriteState {
    committed: Documents,
    transaction: Option<Documents>,
}

impl WriteState {
    fn visible(&self) -> &Documents {
        self.transaction.as_ref().unwrap_or(&self.committed)
    }

    fn visible_mut(&mut self) -> &mut Documents {
        match self.transaction {
            Some(ref mut documents) => documents,
            None => &mut self.committed,
        }
    }
}

/// Key/value write-model store with a single ambient transaction.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWriteStore {
    state: Arc<Mutex<WriteState>>,
}

impl InMemoryWriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, WriteState>, MemoryStoreError> {
        self.state
            .lock()
            .map_err(|_| MemoryStoreError::PoisonedLock)
    }

    pub fn get<S: AsRef<str>>(&self, key: S) -> Result<Option<Value>, MemoryStoreError> {
        Ok(self.lock()?.visible().get(key.as_ref()).cloned())
    }

    pub fn insert<S: Into<String>>(&self, key: S, value: Value) -> Result<(), MemoryStoreError> {
        self.lock()?.visible_mut().insert(key.into(), value);
        Ok(())
    }

    pub fn remove<S: AsRef<str>>(&self, key: S) -> Result<Option<Value>, MemoryStoreError> {
        Ok(self.lock()?.visible_mut().remove(key.as_ref()))
    }

    pub fn len(&self) -> Result<usize, MemoryStoreError> {
        Ok(self.lock()?.visible().len())
    }

    pub fn is_empty(&self) -> Result<bool, MemoryStoreError> {
        Ok(self.len()? == 0)
    }

    pub fn in_transaction(&self) -> Result<bool, MemoryStoreError> {
        Ok(self.lock()?.transaction.is_some())
    }

    pub fn begin(&self) -> Result<(), MemoryStoreError> {
        let mut state = self.lock()?;
        if state.transaction.is_some() {
            return Err(MemoryStoreError::TransactionAlreadyOpen);
        }
        state.transaction = Some(state.committed.clone());
        Ok(())
    }

    pub fn commit(&self) -> Result<(), MemoryStoreError> {
        let mut state = self.lock()?;
        let documents = state
            .transaction
            .take()
            .ok_or(MemoryStoreError::NoActiveTransaction)?;
        state.committed = documents;
        Ok(())
    }

    pub fn rollback(&self) -> Result<(), MemoryStoreError> {
        self.lock()?
            .transaction
            .take()
            .map(|_| ())
            .ok_or(MemoryStoreError::NoActiveTransaction)
    }
}

impl WriteModelTransactions for InMemoryWriteStore {
    fn begin_transaction(&self) -> Result<(), BoxError> {
        Ok(self.begin()?)
    }

    fn rollback_transaction(&self) -> Result<(), BoxError> {
        Ok(self.rollback()?)
    }
}

#[derive(Debug, Default)]
struct ReadState {
    committed: Documents,
    scopes: HashMap<CorrelationId, Documents>,
}

/// Read-model store whose transactions are scoped per correlation identifier. Requests without
/// an open scope read and write the committed documents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReadStore {
    state: Arc<Mutex<ReadState>>,
}

impl InMemoryReadStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ReadState>, MemoryStoreError> {
        self.state
            .lock()
            .map_err(|_| MemoryStoreError::PoisonedLock)
    }

    pub fn get<S: AsRef<str>>(
        &self,
        scope: Option<&CorrelationId>,
        key: S,
    ) -> Result<Option<Value>, MemoryStoreError> {
        let state = self.lock()?;
        let documents = scope
            .and_then(|id| state.scopes.get(id))
            .unwrap_or(&state.committed);
        Ok(documents.get(key.as_ref()).cloned())
    }

    pub fn upsert<S: Into<String>>(
        &self,
        scope: Option<&CorrelationId>,
        key: S,
        value: Value,
    ) -> Result<(), MemoryStoreError> {
        let mut state = self.lock()?;
        let ReadState { committed, scopes } = &mut *state;
        let documents = match scope {
            Some(id) => scopes.get_mut(id),
            None => None,
        }
        .unwrap_or(committed);
        documents.insert(key.into(), value);
        Ok(())
    }

    pub fn has_scope(&self, id: &CorrelationId) -> Result<bool, MemoryStoreError> {
        Ok(self.lock()?.scopes.contains_key(id))
    }

    pub fn committed_len(&self) -> Result<usize, MemoryStoreError> {
        Ok(self.lock()?.committed.len())
    }

    pub fn begin(&self, id: &CorrelationId) -> Result<(), MemoryStoreError> {
        let mut state = self.lock()?;
        if state.scopes.contains_key(id) {
            return Err(MemoryStoreError::TransactionAlreadyOpen);
        }
        let snapshot = state.committed.clone();
        state.scopes.insert(id.clone(), snapshot);
        Ok(())
    }

    pub fn rollback(&self, id: &CorrelationId) -> Result<(), MemoryStoreError> {
        self.lock()?
            .scopes
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MemoryStoreError::UnknownScope(id.clone()))
    }
}

impl ReadModelTransactions for InMemoryReadStore {
    fn begin_transaction(&self, id: &CorrelationId) -> Result<(), BoxError> {
        Ok(self.begin(id)?)
    }

    fn rollback_transaction(&self, id: &CorrelationId) -> Result<(), BoxError> {
        Ok(self.rollback(id)?)
    }
}
