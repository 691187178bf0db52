//! Wire protocol for Typerace.
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`PlayerSnapshot`], the
//!   identifier newtypes): what travels between browser and server.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those events become
//!   bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! Every frame is one event, adjacently tagged:
//!
//! ```text
//! {"event": "progress", "data": {"typedText": "Typing Ra"}}
//! {"event": "start_timer", "data": 1718000000000}
//! {"event": "restart"}
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientEvent, PlayerId, PlayerSnapshot, Recipient, RoomId, ServerEvent,
    Timestamp,
};
