//! Wire protocol between the bridge and its client
//!
//! Frames are UTF-8 JSON objects terminated by `\n` in both directions.
//! Outbound messages carry a `type` discriminator, inbound commands a `cmd`.

pub mod codec;
pub mod command;
pub mod messages;

pub use codec::{CodecError, FrameCodec, MAX_FRAME_LENGTH};
pub use command::Command;
pub use messages::{ErrorCode, OutboundMessage, Snapshot, SnapshotValue, PROTOCOL_VERSION};
