//! Inbound commands

use serde_json::{Map, Value};

/// A decoded client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Refresh,
    /// Store `value` into the named tracked value
    Write {
        target: Option<String>,
        value: Option<i64>,
    },
    /// Add a signed `amount` to the named tracked value
    Add {
        target: Option<String>,
        amount: Option<i64>,
    },
    /// Choose the address table, by tag
    SelectVariant { target: Option<String> },
    /// A well-formed frame with a `cmd` nobody handles
    Unknown(String),
}

impl Command {
    /// Decode a frame.
    ///
    /// Returns `None` for frames that are not JSON objects with a string
    /// `cmd` field; such frames get no reply.
    pub fn decode(frame: &str) -> Option<Self> {
        let object = match serde_json::from_str::<Value>(frame) {
            Ok(Value::Object(object)) => object,
            _ => return None,
        };
        let cmd = object.get("cmd")?.as_str()?;

        let command = match cmd {
            "ping" => Command::Ping,
            "refresh" => Command::Refresh,
            "write" => Command::Write {
                target: string_field(&object, "target"),
                value: integer_field(&object, "value"),
            },
            "add" => Command::Add {
                target: string_field(&object, "target"),
                amount: integer_field(&object, "value"),
            },
            "selectVariant" | "setVersion" => Command::SelectVariant {
                target: string_field(&object, "target"),
            },
            other => Command::Unknown(other.to_string()),
        };
        Some(command)
    }

    /// The `cmd` name, for logging
    pub fn name(&self) -> &str {
        match self {
            Command::Ping => "ping",
            Command::Refresh => "refresh",
            Command::Write { .. } => "write",
            Command::Add { .. } => "add",
            Command::SelectVariant { .. } => "selectVariant",
            Command::Unknown(cmd) => cmd,
        }
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key)?.as_str().map(str::to_string)
}

fn integer_field(object: &Map<String, Value>, key: &str) -> Option<i64> {
    object.get(key)?.as_i64()
}
