//! OutputRegistry - per-instance, append-only list of output channels

use std::sync::Arc;

use contracts::{DispatchError, InstanceId, MetaSpec, OutputDescriptor, OutputKind};
use tracing::debug;

/// Output channels declared by one instance
///
/// A channel id is its position in the list. Nothing is ever removed, so ids
/// stay valid for the life of the session.
#[derive(Debug)]
pub struct OutputRegistry {
    owner: InstanceId,
    outputs: Vec<Arc<OutputDescriptor>>,
}

impl OutputRegistry {
    pub fn new(owner: InstanceId) -> Self {
        Self {
            owner,
            outputs: Vec::new(),
        }
    }

    pub fn owner(&self) -> &InstanceId {
        &self.owner
    }

    /// Append a new output and return its id
    ///
    /// # Errors
    /// `UnsupportedMetaType` when a meta output comes without a meta declaration.
    pub fn register(
        &mut self,
        kind: OutputKind,
        proto_id: Option<&str>,
        meta: Option<MetaSpec>,
    ) -> Result<usize, DispatchError> {
        let meta = match kind {
            OutputKind::Meta => Some(meta.ok_or_else(|| DispatchError::UnsupportedMetaType {
                type_name: "none".to_string(),
            })?),
            _ => None,
        };

        let proto_id = proto_id.unwrap_or(self.owner.as_str()).to_string();
        let id = self.outputs.len();

        debug!(
            instance = %self.owner,
            output_id = id,
            kind = kind.debug_name(),
            proto_id = %proto_id,
            "Creating new output"
        );

        self.outputs.push(Arc::new(OutputDescriptor {
            id,
            kind,
            owner: self.owner.clone(),
            proto_id,
            meta,
        }));
        Ok(id)
    }

    /// Resolve a channel id
    ///
    /// # Errors
    /// `UnknownOutputChannel` when the id is past the end.
    pub fn get(&self, channel: usize) -> Result<&Arc<OutputDescriptor>, DispatchError> {
        self.outputs
            .get(channel)
            .ok_or(DispatchError::UnknownOutputChannel {
                channel: i64::try_from(channel).unwrap_or(i64::MAX),
                registered: self.outputs.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<OutputDescriptor>> {
        self.outputs.iter()
    }
}
