//! CallbackRegistry - one host handler per output kind

use std::cell::RefCell;
use std::fmt;

use contracts::{ContractError, OutputCallback, OutputKind, OutputRecord};
use tracing::{debug, error};

/// Session-wide output handlers, indexed by kind
///
/// Filled while the session is built and read-only afterwards; only the
/// handlers' own state changes when records are delivered.
#[derive(Default)]
pub struct CallbackRegistry {
    handlers: [Option<RefCell<Box<dyn OutputCallback>>>; 5],
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the handler for `kind`, returning the one it replaces
    pub fn set(
        &mut self,
        kind: OutputKind,
        callback: Box<dyn OutputCallback>,
    ) -> Option<Box<dyn OutputCallback>> {
        debug!(kind = %kind, callback = callback.name(), "Registering output callback");
        self.handlers[kind.index()]
            .replace(RefCell::new(callback))
            .map(RefCell::into_inner)
    }

    pub fn remove(&mut self, kind: OutputKind) -> Option<Box<dyn OutputCallback>> {
        self.handlers[kind.index()].take().map(RefCell::into_inner)
    }

    pub fn contains(&self, kind: OutputKind) -> bool {
        self.handlers[kind.index()].is_some()
    }

    /// Name of the handler for `kind`
    pub fn name(&self, kind: OutputKind) -> Option<String> {
        self.handlers[kind.index()]
            .as_ref()
            .map(|h| h.borrow().name().to_string())
    }

    /// Hand a record to the handler for its kind
    ///
    /// Returns `None` when no handler is installed.
    pub fn deliver(&self, record: &OutputRecord<'_>) -> Option<Result<(), ContractError>> {
        let slot = self.handlers[record.payload.kind().index()].as_ref()?;
        let Ok(mut handler) = slot.try_borrow_mut() else {
            return Some(Err(ContractError::Other(format!(
                "{} callback re-entered during delivery",
                record.payload.kind()
            ))));
        };
        Some(handler.deliver(record))
    }

    /// Flush every installed handler, logging failures
    pub fn flush_all(&self) {
        for slot in self.handlers.iter().flatten() {
            let mut handler = slot.borrow_mut();
            if let Err(e) = handler.flush() {
                error!(callback = handler.name(), error = %e, "Flush failed");
            }
        }
    }

    /// Kinds with an installed handler
    pub fn kinds(&self) -> impl Iterator<Item = OutputKind> + '_ {
        OutputKind::ALL.into_iter().filter(|k| self.contains(*k))
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}
