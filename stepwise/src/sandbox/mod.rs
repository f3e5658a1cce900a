pub mod memory;

use crate::{
    correlation::CorrelationId,
    error::{BoxError, Error, Phase, Store, StoreFailure},
};
use log::{debug, error};
use std::{fmt::Debug, sync::Arc};

/// Write-model store whose transactions are ambient: one at a time, no key.
pub trait WriteModelTransactions: Debug {
    fn begin_transaction(&self) -> Result<(), BoxError>;
    fn rollback_transaction(&self) -> Result<(), BoxError>;
}

/// Read-model store whose transactions are scoped by the correlation identifier of the
/// requests that use them.
pub trait ReadModelTransactions: Debug {
    fn begin_transaction(&self, id: &CorrelationId) -> Result<(), BoxError>;
    fn rollback_transaction(&self, id: &CorrelationId) -> Result<(), BoxError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SandboxState {
    Idle,
    Active(CorrelationId),
}

/// Keeps one scenario's writes to both stores inside transactions that are always rolled back.
#[derive(Debug)]
pub struct Sandbox {
    write_model: Arc<dyn WriteModelTransactions + Send + Sync>,
    read_model: Arc<dyn ReadModelTransactions + Send + Sync>,
    state: SandboxState,
}

impl Sandbox {
    pub fn new(
        write_model: Arc<dyn WriteModelTransactions + Send + Sync>,
        read_model: Arc<dyn ReadModelTransactions + Send + Sync>,
    ) -> Self {
        Self {
            write_model,
            read_model,
            state: SandboxState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SandboxState::Active(_))
    }

    /// Opens the write-model transaction, then the read-model transaction keyed by `id`.
    ///
    /// When the read-model open fails, the write-model transaction that was already opened is
    /// rolled back before the setup failure is returned. A failed rollback is reported alongside
    /// the open failure.
    pub fn open(&mut self, id: &CorrelationId) -> Result<(), Error> {
        if self.is_active() {
            return Err(Error::SandboxAlreadyActive);
        }

        if let Err(source) = self.write_model.begin_transaction() {
            return Err(Error::SandboxSetup(vec![Self::failure(
                Store::WriteModel,
                Phase::Open,
                source,
            )]));
        }

        if let Err(source) = self.read_model.begin_transaction(id) {
            let mut failures = vec![Self::failure(Store::ReadModel, Phase::Open, source)];
            if let Err(source) = self.write_model.rollback_transaction() {
                failures.push(Self::failure(Store::WriteModel, Phase::Rollback, source));
            }
            return Err(Error::SandboxSetup(failures));
        }

        debug!("Sandbox opened for {}", id);
        self.state = SandboxState::Active(id.clone());

        Ok(())
    }

    /// Rolls back both transactions. The read-model rollback is attempted even when the
    /// write-model rollback fails; every failure is reported.
    pub fn close(&mut self) -> Result<(), Error> {
        let id = match std::mem::replace(&mut self.state, SandboxState::Idle) {
            SandboxState::Active(id) => id,
            SandboxState::Idle => return Err(Error::SandboxNotActive),
        };

        let mut failures = Vec::new();

        if let Err(source) = self.write_model.rollback_transaction() {
            failures.push(Self::failure(Store::WriteModel, Phase::Rollback, source));
        }
        if let Err(source) = self.read_model.rollback_transaction(&id) {
            failures.push(Self::failure(Store::ReadModel, Phase::Rollback, source));
        }

        if failures.is_empty() {
            debug!("Sandbox closed for {}", id);
            Ok(())
        } else {
            Err(Error::SandboxTeardown(failures))
        }
    }

    fn failure(store: Store, phase: Phase, source: BoxError) -> StoreFailure {
        error!("The {} store failed to {} the scenario transaction: {}", store, phase, source);
        StoreFailure {
            store,
            phase,
            source,
        }
    }
}
