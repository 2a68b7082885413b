#![deny(missing_docs)]

//! # chatbridge models
//!
//! Value types shared by the credential lifecycle (`chatbridge-auth`), the
//! chat session layer (`chatbridge-sdk`) and the bot binary.
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`credentials`] | `CredentialRecord` and the rotated `TokenPair` |
//! | [`identity`] | Chat login identity and normalised `Channel` names |
//! | [`event`] | Inbound `ChatEvent` forwarded to dispatch |
//! | [`network`] | `RemoteEndpoint` reported when a session connects |

pub mod credentials;
pub mod error;
pub mod event;
pub mod identity;
pub mod network;

pub use credentials::*;
pub use error::*;
pub use event::*;
pub use identity::*;
pub use network::*;
