//! MemorySink - keeps owned copies of delivered records

use std::cell::RefCell;
use std::rc::Rc;

use contracts::{ContractError, InstanceId, OutputCallback, OutputPayload, OutputRecord};
use serde::Serialize;

/// A delivered record detached from its dispatch call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapturedRecord {
    pub start: u64,
    pub end: u64,
    pub instance: InstanceId,
    pub output_id: usize,
    pub proto_id: String,
    pub payload: OutputPayload<'static>,
}

impl From<&OutputRecord<'_>> for CapturedRecord {
    fn from(record: &OutputRecord<'_>) -> Self {
        Self {
            start: record.start,
            end: record.end,
            instance: record.descriptor.owner.clone(),
            output_id: record.descriptor.id,
            proto_id: record.descriptor.proto_id.clone(),
            payload: record.payload.clone().into_owned(),
        }
    }
}

/// Read side of a [`MemorySink`], usable after the sink moved into a session
#[derive(Debug, Clone, Default)]
pub struct MemoryHandle {
    records: Rc<RefCell<Vec<CapturedRecord>>>,
}

impl MemoryHandle {
    /// Copy of everything captured so far
    pub fn records(&self) -> Vec<CapturedRecord> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

/// Callback that stores every record in memory
pub struct MemorySink {
    name: String,
    handle: MemoryHandle,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: MemoryHandle::default(),
        }
    }

    pub fn handle(&self) -> MemoryHandle {
        self.handle.clone()
    }
}

impl OutputCallback for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&mut self, record: &OutputRecord<'_>) -> Result<(), ContractError> {
        self.handle
            .records
            .borrow_mut()
            .push(CapturedRecord::from(record));
        Ok(())
    }
}
