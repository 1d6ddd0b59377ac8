//! Outbound messages

use crate::core::types::Address;
use crate::registry::{TrackedValue, ValueRegistry};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Version announced in `hello`
pub const PROTOCOL_VERSION: &str = "1.0";

/// Machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    WriteFailed,
    UnknownTarget,
    UnknownCmd,
    MainramNotFound,
}

/// One value inside a `full` or `delta` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotValue {
    pub v: u32,
    /// Emulated address, 8 upper-case hex digits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a: Option<String>,
    /// Width in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u8>,
}

/// Name-keyed values, serialized as a JSON object in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot(Vec<(String, SnapshotValue)>);

impl Snapshot {
    /// Every value read at least once, with address and width
    pub fn full(registry: &ValueRegistry) -> Self {
        Snapshot(
            registry
                .initialized()
                .map(|value| (value.name.clone(), describe(value)))
                .collect(),
        )
    }

    /// Only values flagged as changed
    pub fn delta(registry: &ValueRegistry) -> Self {
        Snapshot(
            registry
                .changed()
                .map(|value| {
                    (
                        value.name.clone(),
                        SnapshotValue {
                            v: value.current,
                            a: None,
                            s: None,
                        },
                    )
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SnapshotValue> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

fn describe(value: &TrackedValue) -> SnapshotValue {
    SnapshotValue {
        v: value.current,
        a: Some(format!("{:08X}", value.address)),
        s: Some(u8::from(value.width)),
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Messages sent to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Hello {
        version: String,
        addresses: usize,
    },
    Status {
        connected: bool,
        #[serde(rename = "gameActive")]
        game_active: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        mainram: Option<String>,
    },
    Full {
        data: Snapshot,
    },
    Delta {
        data: Snapshot,
    },
    Pong {
        ts: u64,
    },
    Error {
        code: ErrorCode,
        msg: String,
    },
}

impl OutboundMessage {
    pub fn hello(addresses: usize) -> Self {
        OutboundMessage::Hello {
            version: PROTOCOL_VERSION.to_string(),
            addresses,
        }
    }

    pub fn status(connected: bool, mainram: Option<Address>) -> Self {
        OutboundMessage::Status {
            connected,
            game_active: mainram.is_some(),
            mainram: mainram.map(|base| format!("0x{:X}", base.as_usize())),
        }
    }

    /// Complete snapshot of every value read so far
    pub fn full(registry: &ValueRegistry) -> Self {
        OutboundMessage::Full {
            data: Snapshot::full(registry),
        }
    }

    /// Changed values, or `None` when nothing changed
    pub fn delta(registry: &ValueRegistry) -> Option<Self> {
        let data = Snapshot::delta(registry);
        (!data.is_empty()).then_some(OutboundMessage::Delta { data })
    }

    pub fn pong(ts: u64) -> Self {
        OutboundMessage::Pong { ts }
    }

    pub fn error(code: ErrorCode, msg: impl Into<String>) -> Self {
        OutboundMessage::Error {
            code,
            msg: msg.into(),
        }
    }

    /// Serialize to one frame body, terminator excluded
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{MemoryResult, Width};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry() -> ValueRegistry {
        let mut registry = ValueRegistry::new();
        registry.register("ZENY", 0x020F_3394, Width::Word);
        registry.register("NOISE", 0x020F_39C0, Width::Byte);
        registry.register("CARD01", 0x020F_3806, Width::Half);
        registry
    }

    fn to_json(message: &OutboundMessage) -> serde_json::Value {
        serde_json::from_str(&message.to_frame().unwrap()).unwrap()
    }

    #[test]
    fn test_hello_and_status() {
        assert_eq!(
            to_json(&OutboundMessage::hello(35)),
            json!({"type": "hello", "version": "1.0", "addresses": 35})
        );
        assert_eq!(
            to_json(&OutboundMessage::status(true, None)),
            json!({"type": "status", "connected": true, "gameActive": false})
        );
        assert_eq!(
            to_json(&OutboundMessage::status(true, Some(Address::new(0x1_4000_0000)))),
            json!({"type": "status", "connected": true, "gameActive": true, "mainram": "0x140000000"})
        );
    }

    #[test]
    fn test_full_skips_unread_values_and_keeps_order() {
        let mut registry = registry();
        registry.update(&|address: u32, _width: Width| -> MemoryResult<u32> {
            if address == 0x020F_39C0 {
                Err(crate::MemoryError::TargetNotAcquired)
            } else {
                Ok(7)
            }
        });

        let message = OutboundMessage::full(&registry);
        assert_eq!(
            message.to_frame().unwrap(),
            r#"{"type":"full","data":{"ZENY":{"v":7,"a":"020F3394","s":4},"CARD01":{"v":7,"a":"020F3806","s":2}}}"#
        );
    }

    #[test]
    fn test_delta_only_changed_and_never_empty() {
        let mut registry = registry();
        registry.update(&|_address: u32, _width: Width| -> MemoryResult<u32> { Ok(1) });
        registry.reset_change_flags();

        assert!(OutboundMessage::delta(&registry).is_none());

        registry.update(&|address: u32, _width: Width| -> MemoryResult<u32> {
            Ok(if address == 0x020F_3394 { 100_000 } else { 1 })
        });
        let delta = OutboundMessage::delta(&registry).unwrap();
        assert_eq!(
            to_json(&delta),
            json!({"type": "delta", "data": {"ZENY": {"v": 100000}}})
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            to_json(&OutboundMessage::error(ErrorCode::MainramNotFound, "not found")),
            json!({"type": "error", "code": "MAINRAM_NOT_FOUND", "msg": "not found"})
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::UnknownCmd).unwrap(),
            r#""UNKNOWN_CMD""#
        );
    }

    #[test]
    fn test_pong() {
        assert_eq!(
            to_json(&OutboundMessage::pong(1_700_000_000_000)),
            json!({"type": "pong", "ts": 1_700_000_000_000u64})
        );
    }
}
