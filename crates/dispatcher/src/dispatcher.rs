//! Dispatcher - routes a `put` to callbacks and downstream instances
//!
//! | Kind                    | Downstream            | Callback                          |
//! |-------------------------|-----------------------|-----------------------------------|
//! | Annotation, Binary, Meta| never                 | converted, only if a handler exists |
//! | Forward                 | raw value, every one  | raw value                         |
//! | Packet                  | raw value, every one  | converted, only if a handler exists |
//!
//! Conversion failures, callback errors and downstream decode failures are
//! soft: they are logged, recorded in the [`DispatchReport`] and the `put`
//! still succeeds. Only an unknown channel, malformed arguments or a failed
//! allocation abort the call.

use std::borrow::Cow;
use std::sync::Arc;

use contracts::{
    Consumer, DecodeError, Diagnostic, DispatchError, DispatchReport, OutputKind, OutputPayload,
    OutputRecord, Value,
};
use observability::metrics as obs;
use tracing::{trace, warn};

use crate::context::DecodeContext;
use crate::convert::convert;
use crate::session::Session;

/// Route one value submitted on `channel` by the instance at `index`
pub(crate) fn dispatch(
    session: &Session,
    index: usize,
    depth: usize,
    start: u64,
    end: u64,
    channel: usize,
    value: &Value,
) -> Result<DispatchReport, DispatchError> {
    let instance = session.instance(index);
    let metrics = session.dispatch_metrics();

    let resolved = instance.outputs.borrow().get(channel).map(Arc::clone);
    let descriptor = match resolved {
        Ok(descriptor) => descriptor,
        Err(e) => {
            metrics.inc_rejected();
            obs::record_put_rejected(&instance.id, e.code());
            return Err(e);
        }
    };
    let kind = descriptor.kind;

    trace!(
        "Instance {} put {}-{} {} on oid {}",
        instance.id,
        start,
        end,
        kind.debug_name(),
        channel
    );
    metrics.inc_put(kind);
    obs::record_put(&instance.id, kind);

    let mut report = DispatchReport::new(instance.id.clone(), kind);

    if kind.forwards_downstream() {
        forward(session, index, depth, start, end, value, &mut report);
    }

    if !session.callbacks().contains(kind) {
        return Ok(report);
    }

    let payload = match kind {
        OutputKind::Forward => OutputPayload::Forward(Cow::Borrowed(value)),
        _ => match convert(&descriptor, &instance.decoder_type, value) {
            Ok(payload) => payload,
            Err(e) if e.is_fatal() => {
                metrics.inc_rejected();
                obs::record_put_rejected(&instance.id, e.code());
                return Err(e);
            }
            Err(e) => {
                metrics.inc_conversion_failures();
                obs::record_conversion_failure(kind, e.code());
                push_diagnostic(
                    &mut report,
                    Diagnostic {
                        instance: instance.id.clone(),
                        consumer: Consumer::Callback(kind),
                        message: e.to_string(),
                        error: Some(e),
                    },
                );
                return Ok(report);
            }
        },
    };

    let record = OutputRecord {
        start,
        end,
        descriptor: &descriptor,
        payload,
    };
    match session.callbacks().deliver(&record) {
        Some(Ok(())) => {
            report.delivered = true;
            metrics.inc_delivered();
            obs::record_callback(kind, true);
        }
        Some(Err(e)) => {
            metrics.inc_callback_failures();
            obs::record_callback(kind, false);
            push_diagnostic(
                &mut report,
                Diagnostic {
                    instance: instance.id.clone(),
                    consumer: Consumer::Callback(kind),
                    message: format!("{kind} callback failed: {e}"),
                    error: None,
                },
            );
        }
        None => {}
    }

    Ok(report)
}

/// Hand the raw value to every instance stacked on `index`, in order
///
/// Each downstream decode runs to completion, nested puts included, before
/// the next one starts.
fn forward(
    session: &Session,
    index: usize,
    depth: usize,
    start: u64,
    end: u64,
    value: &Value,
    report: &mut DispatchReport,
) {
    let metrics = session.dispatch_metrics();

    for &next in &session.instance(index).downstream {
        let target = &session.instance(next).id;
        let outcome = invoke_decode(session, next, depth + 1, start, end, value);

        let entered = !matches!(
            outcome,
            Err(DecodeError::DepthExceeded { .. } | DecodeError::Reentrant { .. })
        );
        if entered {
            report.forwarded.push(target.clone());
        }

        match outcome {
            Ok(()) => {
                metrics.inc_forwards();
                obs::record_forward(target, true);
            }
            Err(e) => {
                metrics.inc_downstream_failures();
                obs::record_forward(target, false);
                push_diagnostic(
                    report,
                    Diagnostic {
                        instance: target.clone(),
                        consumer: Consumer::Downstream(target.clone()),
                        message: e.to_string(),
                        error: e.dispatch_error().cloned(),
                    },
                );
            }
        }
    }
}

/// Run the decode entry point of the instance at `index`
///
/// `SessionBuilder::build` already rejects stacks longer than the limit, so
/// sessions built through it never trip the depth check. It stays as a guard
/// on this entry point for any caller that passes its own `depth`.
///
/// # Errors
/// - `DepthExceeded` when `depth` is past the session's stack limit
/// - `Reentrant` when the instance is already decoding further down the
///   call stack
/// - whatever the decoder itself returns
pub(crate) fn invoke_decode(
    session: &Session,
    index: usize,
    depth: usize,
    start: u64,
    end: u64,
    value: &Value,
) -> Result<(), DecodeError> {
    let instance = session.instance(index);
    let max = session.max_stack_depth();
    if depth > max {
        return Err(DecodeError::DepthExceeded { depth, max });
    }

    let Ok(mut logic) = instance.logic.try_borrow_mut() else {
        return Err(DecodeError::Reentrant {
            instance: instance.id.clone(),
        });
    };

    let mut ctx = DecodeContext::new(session, index, depth);
    logic.decode(&mut ctx, start, end, value)
}

fn push_diagnostic(report: &mut DispatchReport, diagnostic: Diagnostic) {
    warn!("{}", diagnostic);
    report.diagnostics.push(diagnostic);
}
