//! Client side of the SeedShare signaling relay.
//!
//! Connects over WebSocket, learns the relay-assigned id from the
//! `welcome` notice, joins a room and exchanges offer/answer/candidate
//! messages with other parties.

mod client;
pub(crate) mod pumps;

pub use client::{ClientError, RelayClient};
