//! Connection handler that validates, guards and runs requests.

use std::sync::Arc;
use std::time::Duration;

use bridge_config::ServerConfig;
use tracing::{debug, info, warn};

use crate::exec::{CommandExecutor, Invocation};
use crate::guard::{AccessGuard, ClientKey, GuardDecision};
use crate::transport::{ConnectionHandler, ConnectionStream};
use crate::validate::{RequestEnvelope, ValidatedCommand, resolve};

use super::DISPATCH_TARGET;
use super::frame::read_frame;
use super::introspect::ServerInfo;
use super::response::{Response, ResponseWriter};

/// Deadline for receiving the request frame.
pub(crate) const READ_DEADLINE: Duration = Duration::from_secs(5);
/// Deadline for each write of the response.
pub(crate) const WRITE_DEADLINE: Duration = Duration::from_secs(5);

/// Serves one request per connection.
///
/// The request is size-checked and decoded, admitted by the guard, resolved
/// against the registry and finally executed. Any stage may answer early with
/// a failure payload; the connection always ends with exactly one response
/// unless the client sent nothing at all.
#[derive(Debug)]
pub(crate) struct DispatchConnectionHandler<G, E> {
    config: Arc<ServerConfig>,
    guard: G,
    executor: E,
}

impl<G, E> DispatchConnectionHandler<G, E>
where
    G: AccessGuard,
    E: CommandExecutor,
{
    pub(crate) const fn new(config: Arc<ServerConfig>, guard: G, executor: E) -> Self {
        Self {
            config,
            guard,
            executor,
        }
    }

    /// Produces the response for a received frame.
    pub(crate) fn respond(&self, client: &ClientKey, frame: &[u8]) -> Response {
        let envelope = match RequestEnvelope::parse(frame, self.config.limits().max_request_size) {
            Ok(envelope) => envelope,
            Err(error) => {
                debug!(target: DISPATCH_TARGET, %client, %error, "rejected request frame");
                return Response::rejected(&error);
            }
        };

        if let GuardDecision::Deny(denial) =
            self.guard.check(client, envelope.auth_token_hash())
        {
            info!(
                target: DISPATCH_TARGET,
                %client,
                command = envelope.command(),
                ?denial,
                "request denied"
            );
            return Response::denied(denial);
        }

        let call = match resolve(&envelope, self.config.commands()) {
            Ok(ValidatedCommand::Ping) => return Response::pong(),
            Ok(ValidatedCommand::Introspect) => {
                return Response::manifest(ServerInfo::new(Arc::clone(&self.config)));
            }
            Ok(ValidatedCommand::Run(call)) => call,
            Err(error) => {
                info!(
                    target: DISPATCH_TARGET,
                    %client,
                    command = envelope.command(),
                    %error,
                    "request failed validation"
                );
                return Response::rejected(&error);
            }
        };

        let invocation = Invocation::new(&call, self.config.limits().max_output_size);
        info!(
            target: DISPATCH_TARGET,
            %client,
            command = %invocation.command,
            parameters = ?call.parameters.iter().map(|bound| bound.spec.name()).collect::<Vec<_>>(),
            "executing command"
        );
        match self.executor.execute(&invocation) {
            Ok(output) => Response::command(&invocation.command, output, call.spec.parse_json()),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    %client,
                    command = %invocation.command,
                    %error,
                    "command execution failed"
                );
                Response::execution_failed(&invocation.command, &error, self.config.debug())
            }
        }
    }

    fn dispatch(&self, mut stream: ConnectionStream) {
        if let Err(error) = stream.set_deadlines(READ_DEADLINE, WRITE_DEADLINE) {
            warn!(target: DISPATCH_TARGET, %error, "failed to set connection deadlines");
            return;
        }

        let frame = match read_frame(&mut stream, self.config.limits().max_request_size) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!(
                    target: DISPATCH_TARGET,
                    client = %stream.client(),
                    "client disconnected without request"
                );
                return;
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                return;
            }
        };

        let client = stream.client().clone();
        let response = self.respond(&client, &frame);
        if let Err(error) = ResponseWriter::new(&mut stream).write(&response) {
            warn!(target: DISPATCH_TARGET, %client, %error, "failed to write response");
        }
    }
}

impl<G, E> ConnectionHandler for DispatchConnectionHandler<G, E>
where
    G: AccessGuard + 'static,
    E: CommandExecutor + 'static,
{
    fn handle(&self, stream: ConnectionStream) {
        self.dispatch(stream);
    }

    fn overloaded(&self, mut stream: ConnectionStream) {
        if let Err(error) = stream.set_deadlines(READ_DEADLINE, WRITE_DEADLINE) {
            debug!(target: DISPATCH_TARGET, %error, "failed to set connection deadlines");
            return;
        }
        if let Err(error) = ResponseWriter::new(&mut stream).write(&Response::busy()) {
            debug!(target: DISPATCH_TARGET, %error, "failed to write busy response");
        }
    }
}
