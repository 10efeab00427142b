//! Session - instance arena, stack topology and the host-facing API
//!
//! A session owns every decoder instance, the decoder type metadata they
//! validate against, and the callback registry. Topology and callbacks are
//! fixed by [`SessionBuilder::build`]; afterwards only the instances' own
//! output registries and decoder state change.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use contracts::{
    Decoder, DecoderType, DispatchReport, InstanceId, MetaSpec, OutputCallback, OutputDescriptor,
    OutputHost, OutputKind, Value, DEFAULT_MAX_STACK_DEPTH,
};
use tracing::{debug, info, instrument};

use crate::callbacks::CallbackRegistry;
use crate::context::DecodeContext;
use crate::dispatcher::invoke_decode;
use crate::error::SessionError;
use crate::metrics::DispatchMetrics;
use crate::registry::OutputRegistry;

/// Depth at which host calls act on an instance
pub(crate) const HOST_DEPTH: usize = 1;

/// One decoder instance in the arena
pub(crate) struct Instance {
    pub(crate) id: InstanceId,
    pub(crate) decoder_type: Arc<DecoderType>,
    pub(crate) outputs: RefCell<OutputRegistry>,
    /// Arena indices of the instances stacked on this one, in delivery order
    pub(crate) downstream: Vec<usize>,
    pub(crate) logic: RefCell<Box<dyn Decoder>>,
}

struct PendingInstance {
    id: InstanceId,
    decoder_type: String,
    logic: Box<dyn Decoder>,
}

/// Builder for creating a Session
pub struct SessionBuilder {
    max_stack_depth: usize,
    decoder_types: Vec<DecoderType>,
    instances: Vec<PendingInstance>,
    edges: Vec<(String, String)>,
    callbacks: CallbackRegistry,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            decoder_types: Vec::new(),
            instances: Vec::new(),
            edges: Vec::new(),
            callbacks: CallbackRegistry::new(),
        }
    }

    /// Longest allowed chain of stacked instances
    pub fn max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    pub fn decoder_type(mut self, decoder_type: DecoderType) -> Self {
        self.decoder_types.push(decoder_type);
        self
    }

    /// Add an instance running `logic`, validated against `decoder_type`
    pub fn instance(
        mut self,
        id: impl Into<String>,
        decoder_type: impl Into<String>,
        logic: Box<dyn Decoder>,
    ) -> Self {
        self.instances.push(PendingInstance {
            id: InstanceId::from(id.into()),
            decoder_type: decoder_type.into(),
            logic,
        });
        self
    }

    /// Stack `downstream` on top of `upstream`
    ///
    /// Downstream instances receive forwarded records in the order they were
    /// connected.
    pub fn connect(mut self, upstream: impl Into<String>, downstream: impl Into<String>) -> Self {
        self.edges.push((upstream.into(), downstream.into()));
        self
    }

    /// Install the session-wide handler for `kind`, replacing any earlier one
    pub fn callback(mut self, kind: OutputKind, callback: Box<dyn OutputCallback>) -> Self {
        self.callbacks.set(kind, callback);
        self
    }

    /// Validate the topology and build the session
    #[instrument(
        name = "session_builder_build",
        skip(self),
        fields(
            instances = self.instances.len(),
            edges = self.edges.len(),
            max_stack_depth = self.max_stack_depth
        )
    )]
    pub fn build(self) -> Result<Session, SessionError> {
        let mut decoder_types: HashMap<String, Arc<DecoderType>> = HashMap::new();
        for decoder_type in self.decoder_types {
            if decoder_types.contains_key(&decoder_type.id) {
                return Err(SessionError::DuplicateDecoderType {
                    decoder_type: decoder_type.id,
                });
            }
            decoder_types.insert(decoder_type.id.clone(), Arc::new(decoder_type));
        }

        let mut index: HashMap<InstanceId, usize> = HashMap::new();
        let mut instances = Vec::with_capacity(self.instances.len());
        for pending in self.instances {
            if index.contains_key(&pending.id) {
                return Err(SessionError::DuplicateInstance {
                    instance: pending.id.to_string(),
                });
            }
            let decoder_type = decoder_types
                .get(&pending.decoder_type)
                .cloned()
                .ok_or_else(|| SessionError::UnknownDecoderType {
                    instance: pending.id.to_string(),
                    decoder_type: pending.decoder_type.clone(),
                })?;

            index.insert(pending.id.clone(), instances.len());
            instances.push(Instance {
                outputs: RefCell::new(OutputRegistry::new(pending.id.clone())),
                id: pending.id,
                decoder_type,
                downstream: Vec::new(),
                logic: RefCell::new(pending.logic),
            });
        }

        for (upstream, downstream) in &self.edges {
            let up = lookup(&index, upstream)?;
            let down = lookup(&index, downstream)?;
            if up == down {
                return Err(SessionError::StackCycle {
                    upstream: upstream.clone(),
                    downstream: downstream.clone(),
                });
            }
            if instances[up].downstream.contains(&down) {
                return Err(SessionError::DuplicateStackEdge {
                    upstream: upstream.clone(),
                    downstream: downstream.clone(),
                });
            }
            instances[up].downstream.push(down);
        }

        let adjacency: Vec<&[usize]> = instances.iter().map(|i| i.downstream.as_slice()).collect();
        let depth = stack_depth(&adjacency).map_err(|(up, down)| SessionError::StackCycle {
            upstream: instances[up].id.to_string(),
            downstream: instances[down].id.to_string(),
        })?;
        if depth > self.max_stack_depth {
            return Err(SessionError::StackTooDeep {
                depth,
                max: self.max_stack_depth,
            });
        }

        info!(
            instances = instances.len(),
            decoder_types = decoder_types.len(),
            stack_depth = depth,
            callbacks = ?self.callbacks,
            "Session built"
        );

        Ok(Session {
            instances,
            index,
            decoder_types,
            callbacks: self.callbacks,
            metrics: Arc::new(DispatchMetrics::new()),
            max_stack_depth: self.max_stack_depth,
            started: false,
        })
    }
}

fn lookup(index: &HashMap<InstanceId, usize>, id: &str) -> Result<usize, SessionError> {
    index
        .get(id)
        .copied()
        .ok_or_else(|| SessionError::unknown_instance(id))
}

/// Longest chain of instances in the stack graph
///
/// Returns the offending edge when the graph has a cycle.
fn stack_depth(adjacency: &[&[usize]]) -> Result<usize, (usize, usize)> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done(usize),
    }

    fn visit(
        node: usize,
        adjacency: &[&[usize]],
        marks: &mut [Mark],
    ) -> Result<usize, (usize, usize)> {
        marks[node] = Mark::Active;
        let mut longest = 0;
        for &next in adjacency[node] {
            let below = match marks[next] {
                Mark::Done(depth) => depth,
                Mark::Active => return Err((node, next)),
                Mark::New => visit(next, adjacency, marks)?,
            };
            longest = longest.max(below);
        }
        marks[node] = Mark::Done(longest + 1);
        Ok(longest + 1)
    }

    let mut marks = vec![Mark::New; adjacency.len()];
    let mut deepest = 0;
    for node in 0..adjacency.len() {
        if marks[node] == Mark::New {
            deepest = deepest.max(visit(node, adjacency, &mut marks)?);
        }
    }
    Ok(deepest)
}

/// A built decoder stack
pub struct Session {
    instances: Vec<Instance>,
    index: HashMap<InstanceId, usize>,
    decoder_types: HashMap<String, Arc<DecoderType>>,
    callbacks: CallbackRegistry,
    metrics: Arc<DispatchMetrics>,
    max_stack_depth: usize,
    started: bool,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Run every decoder's `start`, in build order
    ///
    /// Decoders register their outputs here. Calling it again is a no-op.
    #[instrument(name = "session_start", skip(self), fields(instances = self.instances.len()))]
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.started {
            debug!("Session already started");
            return Ok(());
        }
        for index in 0..self.instances.len() {
            let instance = &self.instances[index];
            let mut ctx = DecodeContext::new(self, index, HOST_DEPTH);
            instance
                .logic
                .borrow_mut()
                .start(&mut ctx)
                .map_err(|source| SessionError::Start {
                    instance: instance.id.to_string(),
                    source,
                })?;
            debug!(
                instance = %instance.id,
                outputs = instance.outputs.borrow().len(),
                "Instance started"
            );
        }
        self.started = true;
        info!("Session started");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Feed a payload into an instance's decode entry point
    ///
    /// This is how sample data enters the bottom of a stack. Errors raised by
    /// the decoder itself are returned, unlike failures further up the stack
    /// which only show up as diagnostics.
    pub fn decode(
        &self,
        instance: &str,
        start: u64,
        end: u64,
        payload: &Value,
    ) -> Result<(), SessionError> {
        let index = lookup(&self.index, instance)?;
        invoke_decode(self, index, HOST_DEPTH, start, end, payload)?;
        Ok(())
    }

    /// Declare an output on behalf of `instance`
    pub fn register(
        &self,
        instance: &str,
        kind: OutputKind,
        proto_id: Option<&str>,
        meta: Option<MetaSpec>,
    ) -> Result<usize, SessionError> {
        let mut ctx = self.context(instance)?;
        Ok(ctx.register(kind, proto_id, meta)?)
    }

    /// Submit a value on one of `instance`'s channels
    pub fn put(
        &self,
        instance: &str,
        start: u64,
        end: u64,
        channel: usize,
        value: &Value,
    ) -> Result<DispatchReport, SessionError> {
        let mut ctx = self.context(instance)?;
        Ok(ctx.put(start, end, channel, value)?)
    }

    /// `put` with untyped arguments: `[start, end, channel, value]`
    pub fn put_args(&self, instance: &str, args: &[Value]) -> Result<DispatchReport, SessionError> {
        let mut ctx = self.context(instance)?;
        Ok(ctx.put_args(args)?)
    }

    /// Outputs registered by `instance`, in channel order
    pub fn descriptors(&self, instance: &str) -> Result<Vec<Arc<OutputDescriptor>>, SessionError> {
        let index = lookup(&self.index, instance)?;
        Ok(self.instances[index]
            .outputs
            .borrow()
            .iter()
            .cloned()
            .collect())
    }

    /// Instances stacked directly on `instance`, in delivery order
    pub fn downstream_of(&self, instance: &str) -> Result<Vec<InstanceId>, SessionError> {
        let index = lookup(&self.index, instance)?;
        Ok(self.instances[index]
            .downstream
            .iter()
            .map(|&d| self.instances[d].id.clone())
            .collect())
    }

    pub fn decoder_type(&self, id: &str) -> Option<&DecoderType> {
        self.decoder_types.get(id).map(Arc::as_ref)
    }

    /// Instance ids in build order
    pub fn instance_ids(&self) -> impl Iterator<Item = &InstanceId> {
        self.instances.iter().map(|i| &i.id)
    }

    pub fn contains(&self, instance: &str) -> bool {
        self.index.contains_key(instance)
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn max_stack_depth(&self) -> usize {
        self.max_stack_depth
    }

    /// Flush all callbacks
    pub fn flush_callbacks(&self) {
        self.callbacks.flush_all();
    }

    pub(crate) fn instance(&self, index: usize) -> &Instance {
        &self.instances[index]
    }

    pub(crate) fn dispatch_metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    fn context(&self, instance: &str) -> Result<DecodeContext<'_>, SessionError> {
        let index = lookup(&self.index, instance)?;
        Ok(DecodeContext::new(self, index, HOST_DEPTH))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("instances", &self.instances.iter().map(|i| &i.id).collect::<Vec<_>>())
            .field("callbacks", &self.callbacks)
            .field("max_stack_depth", &self.max_stack_depth)
            .field("started", &self.started)
            .finish()
    }
}
