//! Request validation.
//!
//! A request is validated in two passes. [`RequestEnvelope::parse`] enforces
//! the frame size limit and decodes the JSON object; the guard runs next
//! using the envelope's token hash. [`resolve`] then maps the command name to
//! a built-in or registered command and checks every declared parameter.
//!
//! Only declared parameters survive validation. Anything else the client sent
//! is dropped here and never reaches the executor.

mod errors;
mod parameters;
mod request;

use bridge_config::{
    CommandRegistry, CommandSpec, INTROSPECT_COMMAND, PING_COMMAND, ParameterSpec,
};
use tracing::debug;

pub(crate) use self::errors::RequestError;
pub(crate) use self::parameters::ParameterValue;
pub(crate) use self::request::RequestEnvelope;

use self::parameters::check_parameter;

const VALIDATE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// A validated parameter paired with its schema.
#[derive(Debug, Clone)]
pub(crate) struct BoundParameter<'a> {
    pub(crate) spec: &'a ParameterSpec,
    pub(crate) value: ParameterValue,
}

/// A registered command with its parameters in declaration order.
#[derive(Debug, Clone)]
pub(crate) struct CommandCall<'a> {
    pub(crate) spec: &'a CommandSpec,
    pub(crate) parameters: Vec<BoundParameter<'a>>,
}

/// Closed set of request targets.
#[derive(Debug, Clone)]
pub(crate) enum ValidatedCommand<'a> {
    /// Liveness probe.
    Ping,
    /// Capability manifest request.
    Introspect,
    /// A registered command.
    Run(CommandCall<'a>),
}

/// Resolves the envelope's command and validates its parameters.
pub(crate) fn resolve<'a>(
    envelope: &RequestEnvelope,
    registry: &'a CommandRegistry,
) -> Result<ValidatedCommand<'a>, RequestError> {
    match envelope.command() {
        PING_COMMAND => return Ok(ValidatedCommand::Ping),
        INTROSPECT_COMMAND => return Ok(ValidatedCommand::Introspect),
        _ => {}
    }

    let Some(spec) = registry.get(envelope.command()) else {
        return Err(RequestError::UnknownCommand {
            command: envelope.command().to_owned(),
            available: registry.names().into_iter().map(str::to_owned).collect(),
        });
    };

    let mut parameters = Vec::with_capacity(spec.parameters().len());
    for parameter in spec.parameters() {
        match envelope.parameter(parameter.name()) {
            Some(raw) => parameters.push(BoundParameter {
                spec: parameter,
                value: check_parameter(parameter, raw)?,
            }),
            None if parameter.required() => {
                return Err(RequestError::missing(parameter.name()));
            }
            None => {}
        }
    }

    for name in envelope
        .parameter_names()
        .filter(|name| !spec.parameters().iter().any(|declared| declared.name() == *name))
    {
        debug!(
            target: VALIDATE_TARGET,
            command = spec.name(),
            parameter = name,
            "ignoring undeclared parameter"
        );
    }

    Ok(ValidatedCommand::Run(CommandCall { spec, parameters }))
}
