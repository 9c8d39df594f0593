// SPDX-License-Identifier: MPL-2.0

pub mod posts;
pub mod profiles;
pub mod transport;
pub mod wire;

pub use posts::{PostApi, PostClient};
pub use profiles::{ProfileApi, ProfileClient};
pub use transport::{CallMode, HttpTransport, Transport, TransportError};

use thiserror::Error;

/// Outcome of a single canister call that did not succeed: either the
/// service executed it and rejected it with one of its tagged variants, or
/// the call never completed cleanly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError<E> {
    #[error("service error: {0}")]
    Service(E),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type PostCallError = CallError<wire::PostError>;
pub type ProfileCallError = CallError<wire::ProfileError>;
