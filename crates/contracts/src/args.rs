//! Untyped host call arguments
//!
//! Hosts that drive decoders from a dynamic runtime (or from recorded traces)
//! pass argument lists instead of typed parameters. Arity and primitive kinds
//! are checked here; anything wrong is `MalformedCallArguments`.

use crate::{DispatchError, OutputKind, Value};

/// Parsed `put(start, end, channel, value)` arguments
#[derive(Debug, Clone, PartialEq)]
pub struct PutArgs<'a> {
    pub start: u64,
    pub end: u64,
    /// Left signed; a negative id is an unknown channel, not a malformed call
    pub channel: i64,
    pub value: &'a Value,
}

impl<'a> PutArgs<'a> {
    pub fn parse(args: &'a [Value]) -> Result<Self, DispatchError> {
        let [start, end, channel, value] = args else {
            return Err(DispatchError::malformed(format!(
                "put() takes exactly 4 arguments ({} given)",
                args.len()
            )));
        };

        Ok(Self {
            start: sample(start, "start")?,
            end: sample(end, "end")?,
            channel: channel.as_int().ok_or_else(|| {
                DispatchError::malformed(format!(
                    "put() channel must be int, not {}",
                    channel.type_name()
                ))
            })?,
            value,
        })
    }
}

fn sample(value: &Value, name: &str) -> Result<u64, DispatchError> {
    let raw = value.as_int().ok_or_else(|| {
        DispatchError::malformed(format!(
            "put() {name} sample must be int, not {}",
            value.type_name()
        ))
    })?;
    u64::try_from(raw)
        .map_err(|_| DispatchError::malformed(format!("put() {name} sample {raw} is negative")))
}

/// Parsed `register(kind, proto_id?, meta?)` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterArgs {
    pub kind: OutputKind,
    pub proto_id: Option<String>,
    /// `(type name, meta name, meta description)`
    pub meta: Option<(String, String, String)>,
}

impl RegisterArgs {
    pub fn parse(args: &[Value]) -> Result<Self, DispatchError> {
        if args.is_empty() || args.len() > 3 {
            return Err(DispatchError::malformed(format!(
                "register() takes 1 to 3 arguments ({} given)",
                args.len()
            )));
        }

        let code = args[0].as_int().ok_or_else(|| {
            DispatchError::malformed(format!(
                "register() output type must be int, not {}",
                args[0].type_name()
            ))
        })?;
        let kind = OutputKind::from_code(code)
            .ok_or_else(|| DispatchError::malformed(format!("invalid output type {code}")))?;

        let proto_id = match args.get(1) {
            None | Some(Value::None) => None,
            Some(Value::Str(s)) => Some(s.clone()),
            Some(other) => {
                return Err(DispatchError::malformed(format!(
                    "register() proto_id must be str, not {}",
                    other.type_name()
                )))
            }
        };

        let meta = match args.get(2) {
            None | Some(Value::None) => None,
            Some(Value::List(items)) => Some(parse_meta(items)?),
            Some(other) => {
                return Err(DispatchError::malformed(format!(
                    "register() meta must be a list, not {}",
                    other.type_name()
                )))
            }
        };

        Ok(Self {
            kind,
            proto_id,
            meta,
        })
    }
}

fn parse_meta(items: &[Value]) -> Result<(String, String, String), DispatchError> {
    match items {
        [Value::Str(type_name), Value::Str(name), Value::Str(descr)] => {
            Ok((type_name.clone(), name.clone(), descr.clone()))
        }
        _ => Err(DispatchError::malformed(
            "register() meta must be [type, name, description] strings",
        )),
    }
}
