//! Response payloads and framing.
//!
//! Every connection receives exactly one JSON object followed by a newline.
//! All payloads carry `success`; failures add a human-readable `error` and a
//! machine-readable `code`.

use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

use crate::exec::{ExecutionError, ExecutionOutput};
use crate::guard::{Denial, retry_after_secs};
use crate::validate::RequestError;

use super::introspect::ServerInfo;

const PARSE_ERROR_MESSAGE: &str = "Output is not valid JSON";

/// Failure taxonomy reported in the `code` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ErrorCode {
    RequestTooLarge,
    MalformedRequest,
    UnknownCommand,
    MissingParameter,
    InvalidParameterType,
    PatternMismatch,
    InvalidEnumValue,
    ParameterTooLong,
    Unauthorized,
    RateLimited,
    Blocked,
    ExecutionTimeout,
    ExecutionFailed,
    ServerBusy,
}

impl From<&RequestError> for ErrorCode {
    fn from(error: &RequestError) -> Self {
        match error {
            RequestError::TooLarge { .. } => Self::RequestTooLarge,
            RequestError::Malformed { .. } => Self::MalformedRequest,
            RequestError::UnknownCommand { .. } => Self::UnknownCommand,
            RequestError::MissingParameter { .. } => Self::MissingParameter,
            RequestError::InvalidParameterType { .. } => Self::InvalidParameterType,
            RequestError::PatternMismatch { .. } => Self::PatternMismatch,
            RequestError::InvalidEnumValue { .. } => Self::InvalidEnumValue,
            RequestError::ParameterTooLong { .. } => Self::ParameterTooLong,
        }
    }
}

/// A single response payload.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum Response {
    Command(CommandResponse),
    Failure(FailureResponse),
    Pong(PongResponse),
    Manifest(ManifestResponse),
}

/// Result of a command that ran to completion.
#[derive(Debug, Serialize)]
pub(crate) struct CommandResponse {
    success: bool,
    command: String,
    returncode: i32,
    stdout: String,
    stderr: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    parsed_output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
}

/// A request that produced no command result.
#[derive(Debug, Serialize)]
pub(crate) struct FailureResponse {
    success: bool,
    error: String,
    code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Liveness acknowledgement.
#[derive(Debug, Serialize)]
pub(crate) struct PongResponse {
    success: bool,
    message: &'static str,
    timestamp: u64,
}

/// Capability manifest.
#[derive(Debug, Serialize)]
pub(crate) struct ManifestResponse {
    success: bool,
    server_info: ServerInfo,
}

impl Response {
    /// Wraps a completed run. A non-zero exit is reported as a failure that
    /// still carries the captured output.
    pub(crate) fn command(command: &str, output: ExecutionOutput, parse_json: bool) -> Self {
        let succeeded = output.succeeded();
        let (parsed_output, parse_error) = if parse_json && !output.stdout.trim().is_empty() {
            match serde_json::from_str::<Value>(&output.stdout) {
                Ok(value) => (Some(value), None),
                Err(_) => (None, Some(PARSE_ERROR_MESSAGE)),
            }
        } else {
            (None, None)
        };
        let (error, code) = if succeeded {
            (None, None)
        } else {
            (
                Some(format!("Command exited with status {}", output.returncode)),
                Some(ErrorCode::ExecutionFailed),
            )
        };
        Self::Command(CommandResponse {
            success: succeeded,
            command: command.to_owned(),
            returncode: output.returncode,
            stdout: output.stdout,
            stderr: output.stderr,
            truncated: output.truncated,
            parsed_output,
            parse_error,
            error,
            code,
        })
    }

    pub(crate) fn rejected(error: &RequestError) -> Self {
        Self::failure(error.to_string(), ErrorCode::from(error))
    }

    /// Generic denial; the message never says which check failed beyond the
    /// category.
    pub(crate) fn denied(denial: Denial) -> Self {
        match denial {
            Denial::Unauthorized => Self::failure("Authentication failed", ErrorCode::Unauthorized),
            Denial::RateLimited { retry_after } => Self::retry(
                "Rate limit exceeded",
                ErrorCode::RateLimited,
                retry_after_secs(retry_after),
            ),
            Denial::Blocked { retry_after } => Self::retry(
                "Too many failed authentication attempts",
                ErrorCode::Blocked,
                retry_after_secs(retry_after),
            ),
        }
    }

    /// Maps an execution failure; internal details only appear in debug mode.
    pub(crate) fn execution_failed(command: &str, error: &ExecutionError, debug: bool) -> Self {
        let (message, code, details) = match error {
            ExecutionError::Timeout { .. } => {
                (error.to_string(), ErrorCode::ExecutionTimeout, None)
            }
            ExecutionError::Spawn { .. } | ExecutionError::Wait { .. } => (
                String::from("Command execution failed"),
                ErrorCode::ExecutionFailed,
                debug.then(|| error.to_string()),
            ),
        };
        Self::Failure(FailureResponse {
            success: false,
            error: message,
            code,
            command: Some(command.to_owned()),
            retry_after: None,
            details,
        })
    }

    pub(crate) fn busy() -> Self {
        Self::failure("Server busy", ErrorCode::ServerBusy)
    }

    pub(crate) fn pong() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        Self::Pong(PongResponse {
            success: true,
            message: "pong",
            timestamp,
        })
    }

    pub(crate) const fn manifest(server_info: ServerInfo) -> Self {
        Self::Manifest(ManifestResponse {
            success: true,
            server_info,
        })
    }

    /// Whether the payload reports success.
    #[cfg(test)]
    pub(crate) const fn is_success(&self) -> bool {
        match self {
            Self::Command(response) => response.success,
            Self::Failure(_) => false,
            Self::Pong(_) | Self::Manifest(_) => true,
        }
    }

    fn failure(message: impl Into<String>, code: ErrorCode) -> Self {
        Self::Failure(FailureResponse {
            success: false,
            error: message.into(),
            code,
            command: None,
            retry_after: None,
            details: None,
        })
    }

    fn retry(message: &str, code: ErrorCode, retry_after: u64) -> Self {
        Self::Failure(FailureResponse {
            success: false,
            error: message.to_owned(),
            code,
            command: None,
            retry_after: Some(retry_after),
            details: None,
        })
    }
}

/// Writes framed responses to a stream.
pub(crate) struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    pub(crate) const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes the response as a single JSON line and flushes.
    pub(crate) fn write(&mut self, response: &Response) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, response)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn render(response: &Response) -> Value {
        let mut output = Vec::new();
        ResponseWriter::new(&mut output)
            .write(response)
            .expect("write response");
        assert_eq!(output.last(), Some(&b'\n'));
        serde_json::from_slice(&output).expect("valid json")
    }

    fn output(returncode: i32, stdout: &str) -> ExecutionOutput {
        ExecutionOutput {
            returncode,
            stdout: stdout.to_owned(),
            stderr: String::new(),
            truncated: false,
        }
    }

    #[test]
    fn successful_runs_carry_output() {
        let response = Response::command("echo", output(0, "Hello World\n"), false);
        assert!(response.is_success());
        assert_eq!(
            render(&response),
            json!({
                "success": true,
                "command": "echo",
                "returncode": 0,
                "stdout": "Hello World\n",
                "stderr": ""
            })
        );
    }

    #[test]
    fn non_zero_exits_fail_with_returncode() {
        let rendered = render(&Response::command("false", output(1, ""), false));
        assert_eq!(rendered["success"], json!(false));
        assert_eq!(rendered["returncode"], json!(1));
        assert_eq!(rendered["code"], json!("execution_failed"));
        assert_eq!(rendered["error"], json!("Command exited with status 1"));
    }

    #[test]
    fn truncation_is_flagged() {
        let mut truncated = output(0, "partial");
        truncated.truncated = true;
        let rendered = render(&Response::command("yes", truncated, false));
        assert_eq!(rendered["truncated"], json!(true));
    }

    #[rstest]
    #[case("{\"ok\": [1, 2]}", Some(json!({"ok": [1, 2]})), None)]
    #[case("not json", None, Some("Output is not valid JSON"))]
    #[case("   ", None, None)]
    fn json_output_is_parsed_on_request(
        #[case] stdout: &str,
        #[case] parsed: Option<Value>,
        #[case] parse_error: Option<&str>,
    ) {
        let rendered = render(&Response::command("report", output(0, stdout), true));
        assert_eq!(rendered.get("parsed_output").cloned(), parsed);
        assert_eq!(
            rendered.get("parse_error").and_then(Value::as_str),
            parse_error
        );
    }

    #[rstest]
    #[case(Denial::Unauthorized, "Authentication failed", "unauthorized", None)]
    #[case(
        Denial::RateLimited { retry_after: Duration::from_millis(1500) },
        "Rate limit exceeded",
        "rate_limited",
        Some(2)
    )]
    #[case(
        Denial::Blocked { retry_after: Duration::from_secs(900) },
        "Too many failed authentication attempts",
        "blocked",
        Some(900)
    )]
    fn denials_use_generic_messages(
        #[case] denial: Denial,
        #[case] message: &str,
        #[case] code: &str,
        #[case] retry_after: Option<u64>,
    ) {
        let rendered = render(&Response::denied(denial));
        assert_eq!(rendered["success"], json!(false));
        assert_eq!(rendered["error"], json!(message));
        assert_eq!(rendered["code"], json!(code));
        assert_eq!(rendered.get("retry_after").and_then(Value::as_u64), retry_after);
    }

    #[test]
    fn validation_failures_name_the_parameter() {
        let rendered = render(&Response::rejected(&RequestError::missing("message")));
        assert_eq!(rendered["code"], json!("missing_parameter"));
        assert!(rendered["error"].as_str().expect("message").contains("message"));
    }

    #[rstest]
    #[case(false, None)]
    #[case(true, Some("command 'ls' failed to start: denied"))]
    fn spawn_details_only_in_debug_mode(#[case] debug: bool, #[case] details: Option<&str>) {
        let error = ExecutionError::Spawn {
            command: String::from("ls"),
            source: Arc::new(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
        };
        let rendered = render(&Response::execution_failed("ls", &error, debug));
        assert_eq!(rendered["error"], json!("Command execution failed"));
        assert_eq!(rendered["code"], json!("execution_failed"));
        assert_eq!(rendered.get("details").and_then(Value::as_str), details);
    }

    #[test]
    fn timeouts_report_the_limit() {
        let error = ExecutionError::Timeout {
            command: String::from("sleep"),
            timeout_secs: 2,
        };
        let rendered = render(&Response::execution_failed("sleep", &error, true));
        assert_eq!(rendered["error"], json!("Command timeout after 2 seconds"));
        assert_eq!(rendered["code"], json!("execution_timeout"));
        assert_eq!(rendered["command"], json!("sleep"));
        assert!(rendered.get("returncode").is_none());
    }

    #[test]
    fn pong_is_a_fixed_acknowledgement() {
        let rendered = render(&Response::pong());
        assert_eq!(rendered["success"], json!(true));
        assert_eq!(rendered["message"], json!("pong"));
        assert!(rendered["timestamp"].as_u64().expect("timestamp") > 0);
    }

    #[test]
    fn busy_response_has_its_own_code() {
        let rendered = render(&Response::busy());
        assert_eq!(rendered["error"], json!("Server busy"));
        assert_eq!(rendered["code"], json!("server_busy"));
    }
}
