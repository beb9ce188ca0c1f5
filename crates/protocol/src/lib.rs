pub mod constants;
pub mod control;
pub mod ice;
pub mod relay;
pub mod types;

// Re-export primary types for convenience.
pub use constants::RelayMessageType;
pub use control::ControlFrame;
pub use ice::{IceServer, IceTransportPolicy, TurnCredentials};
pub use relay::{IceCandidate, Recipient, RelayMessage};
pub use types::FileDescriptor;
