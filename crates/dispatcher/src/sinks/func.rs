//! FnCallback - closure adapter for embedding hosts

use contracts::{ContractError, OutputCallback, OutputRecord};

type DeliverFn = Box<dyn FnMut(&OutputRecord<'_>) -> Result<(), ContractError>>;

/// Callback backed by a closure
pub struct FnCallback {
    name: String,
    deliver: DeliverFn,
}

impl FnCallback {
    /// Wrap a closure that always accepts the record
    pub fn new<F>(name: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut(&OutputRecord<'_>) + 'static,
    {
        Self::fallible(name, move |record: &OutputRecord<'_>| {
            f(record);
            Ok(())
        })
    }

    /// Wrap a closure that may reject the record
    pub fn fallible<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&OutputRecord<'_>) -> Result<(), ContractError> + 'static,
    {
        Self {
            name: name.into(),
            deliver: Box::new(f),
        }
    }
}

impl OutputCallback for FnCallback {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&mut self, record: &OutputRecord<'_>) -> Result<(), ContractError> {
        (self.deliver)(record)
    }
}
