//! # Typerace
//!
//! Real-time multiplayer typing race server.
//!
//! Players connect over WebSocket, are matchmade into rooms of bounded
//! size, and race to type a shared passage. The server scores every
//! keystroke, broadcasts standings, announces finishers, and deletes rooms
//! once everyone has left.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use typerace::prelude::*;
//!
//! # async fn run() -> Result<(), TyperaceError> {
//! let server = TyperaceServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! Per-connection outbound queues are internal; embedders observe the
//! server through [`StatsHandle`] only.
//!
//! ```compile_fail
//! use typerace::PlayerSender;
//! ```

mod config;
mod error;
mod handler;
mod hub;
mod server;

pub use config::ServerConfig;
pub use error::TyperaceError;
pub use hub::HubStats;
pub use server::{StatsHandle, TyperaceServer, TyperaceServerBuilder};

pub mod prelude {
    pub use crate::{ServerConfig, TyperaceError, TyperaceServer, TyperaceServerBuilder};
    pub use typerace_protocol::{ClientEvent, PlayerId, PlayerSnapshot, RoomId, ServerEvent};
    pub use typerace_race::{
        FinishPolicy, FixedPassage, PassagePool, PassageSource, RaceConfig, TypingClock,
    };
}
