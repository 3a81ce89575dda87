/// Example registry printed by `bridged --example`.
pub const EXAMPLE_DOCUMENT: &str = r#"{
  "name": "Example Bridge",
  "description": "Example configuration for the command bridge",
  "version": "1.0.0",
  "socket_path": "/tmp/example-bridge.sock",
  "socket_permissions": "0o660",
  "log_level": "INFO",
  "enable_rate_limit": true,
  "rate_limit": {
    "requests": 30,
    "window": 60
  },
  "auth": {
    "enabled": false,
    "max_attempts": 5,
    "window_seconds": 300,
    "block_duration_seconds": 900
  },
  "max_request_size": 1048576,
  "max_output_size": 100000,
  "max_connections": 16,
  "allowed_executable_dirs": [
    "/usr/bin",
    "/bin",
    "/usr/local/bin"
  ],
  "commands": {
    "echo": {
      "description": "Echo a message",
      "executable": ["echo"],
      "timeout": 5,
      "parameters": {
        "message": {
          "description": "Message to echo",
          "type": "string",
          "required": true,
          "style": "argument",
          "pattern": "[\\w .,!?-]+",
          "max_length": 1000
        }
      },
      "examples": [
        {"message": "Hello World"}
      ]
    },
    "date": {
      "description": "Print the current date",
      "executable": ["date"],
      "timeout": 5,
      "parameters": {
        "utc": {
          "description": "Report in UTC",
          "type": "boolean",
          "style": "single_flag"
        }
      }
    }
  }
}
"#;
