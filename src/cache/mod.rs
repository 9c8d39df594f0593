// SPDX-License-Identifier: MPL-2.0

mod query;
mod store;
mod tags;

#[cfg(test)]
pub(crate) mod testing;

pub use query::{Phase, QueryCache, Subscription};
pub use store::Store;
pub use tags::Tag;
