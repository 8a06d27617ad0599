//! Client side of the Sakina community prayer board.
//!
//! The board itself lives in a shared store (the `sakina` server, or the
//! in-process [`store::EmbeddedPostStore`]). Everything here runs on the
//! reader's device: the pseudonymous identity and its secret-word digest,
//! the live subscription, the derived view, delete confirmation and share
//! text. Prayer-time and city lookups are thin HTTP collaborators.

pub mod board;
pub mod config;
pub mod error;
pub mod geocode;
pub mod identity;
pub mod moderation;
pub mod prayer;
pub mod profile;
pub mod share;
pub mod store;
pub mod view;

pub use board::Board;
pub use error::{BoardError, Result};
