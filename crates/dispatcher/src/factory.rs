//! Session construction from a [`SessionBlueprint`]

use contracts::{CallbackConfig, OutputCallback, SessionBlueprint, SinkType};
use tracing::instrument;

use crate::error::SessionError;
use crate::relay::RelayDecoder;
use crate::session::{Session, SessionBuilder};
use crate::sinks::{FileSink, LogSink};

/// Build a session whose instances all run [`RelayDecoder`]
///
/// The session is returned unstarted.
#[instrument(
    name = "dispatcher_create_session",
    skip(blueprint),
    fields(instances = blueprint.instances.len(), callbacks = blueprint.callbacks.len())
)]
pub fn create_session(blueprint: &SessionBlueprint) -> Result<Session, SessionError> {
    let mut builder = SessionBuilder::new().max_stack_depth(blueprint.session.max_stack_depth);

    for decoder_type in &blueprint.decoder_types {
        builder = builder.decoder_type(decoder_type.clone());
    }
    for instance in &blueprint.instances {
        builder = builder.instance(
            &instance.id,
            &instance.decoder_type,
            Box::new(RelayDecoder::from_config(instance)),
        );
    }
    for instance in &blueprint.instances {
        for downstream in &instance.downstream {
            builder = builder.connect(&instance.id, downstream);
        }
    }
    for config in &blueprint.callbacks {
        builder = builder.callback(config.kind, create_callback(config)?);
    }

    builder.build()
}

/// Create a callback from configuration
///
/// The callback name comes from `params.name`, defaulting to `<kind>_<sink>`.
#[instrument(
    name = "dispatcher_create_callback",
    skip(config),
    fields(kind = %config.kind, sink_type = ?config.sink_type)
)]
pub fn create_callback(config: &CallbackConfig) -> Result<Box<dyn OutputCallback>, SessionError> {
    let name = config.params.get("name").cloned().unwrap_or_else(|| {
        let sink = match config.sink_type {
            SinkType::Log => "log",
            SinkType::File => "file",
        };
        format!("{}_{}", config.kind, sink)
    });

    match config.sink_type {
        SinkType::Log => Ok(Box::new(LogSink::new(name))),
        SinkType::File => {
            let sink = FileSink::from_params(&name, &config.params)
                .map_err(|e| SessionError::sink_creation(&name, e.to_string()))?;
            Ok(Box::new(sink))
        }
    }
}
