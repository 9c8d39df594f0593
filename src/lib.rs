// SPDX-License-Identifier: MPL-2.0

//! Client data layer for a decentralized social network.
//!
//! Two canisters hold the data: one for posts, likes, and comments, one for
//! profiles and follows. This crate wraps them with typed clients, normalizes
//! their wire entities, caches query results with tag-based invalidation, and
//! layers optimistic like toggling and notification-carrying actions on top.
//! Everything a frontend renders comes out of [`cache::Store`] subscriptions;
//! everything it does goes in through [`actions::Actions`].

pub mod actions;
pub mod cache;
pub mod canister;
pub mod config;
pub mod entities;
pub mod state;
pub mod validate;

pub use actions::Actions;
pub use cache::{Store, Tag};
pub use config::ClientConfig;
pub use state::{LikeController, SessionState};
