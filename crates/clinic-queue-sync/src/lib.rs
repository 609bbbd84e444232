//! Backend side of the clinic queue sync gateway.
//!
//! - [`wire`]: JSON bodies and push-channel frames exchanged with the backend
//! - [`policy`]: rules the backend applies before accepting a lane move
//! - [`backend`]: an in-process backend implementing
//!   [`StatusSyncGateway`](clinic_queue_core::gateway::StatusSyncGateway),
//!   used to run front-desk sessions against a shared board

pub mod backend;
pub mod policy;
pub mod wire;

pub use backend::InMemoryBackend;
pub use policy::TransitionPolicy;
pub use wire::{PushMessage, TransitionReply, WireError};
