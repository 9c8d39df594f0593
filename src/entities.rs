// SPDX-License-Identifier: MPL-2.0

//! Application-native entities and their wire conversions.
//!
//! Conversions are exactly invertible for valid data: principals round-trip
//! through their canonical text form, counts and timestamps through checked
//! narrowing. A wire value that cannot be represented is a malformed
//! response, never a silent truncation.

use crate::canister::wire;
use candid::Principal;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("invalid principal: {0}")]
    Principal(String),
    #[error("{0} outside the representable range")]
    OutOfRange(&'static str),
}

/// Parse canonical principal text, e.g. an id taken from a route or a form.
pub fn parse_principal(text: &str) -> Result<Principal, NormalizeError> {
    Principal::from_text(text).map_err(|e| NormalizeError::Principal(e.to_string()))
}

/// Abbreviated principal for display: `aaaaaa...zzzzzz`.
pub fn short_principal(text: &str) -> String {
    if text.len() <= 12 {
        return text.to_string();
    }
    format!("{}...{}", &text[..6], &text[text.len() - 6..])
}

/// Current time in nanoseconds since the epoch. Saturates past year 2262.
pub fn now_ns() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub author: String,
    pub content: String,
    /// Nanoseconds since the epoch.
    pub timestamp: i64,
}

impl Comment {
    pub fn from_wire(wire: &wire::Comment) -> Result<Self, NormalizeError> {
        Ok(Self {
            author: wire.author.to_text(),
            content: wire.content.clone(),
            timestamp: int_to_i64(&wire.timestamp, "comment timestamp")?,
        })
    }

    pub fn to_wire(&self) -> Result<wire::Comment, NormalizeError> {
        Ok(wire::Comment {
            content: self.content.clone(),
            author: parse_principal(&self.author)?,
            timestamp: candid::Int::from(self.timestamp),
        })
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: u64,
    pub content: String,
    pub author: String,
    /// Nanoseconds since the epoch.
    pub timestamp: i64,
    /// Like total as the service reports it. Kept verbatim alongside
    /// `user_likes`; the client never recomputes one from the other.
    pub likes: u64,
    pub user_likes: Vec<String>,
    /// Insertion order, append-only.
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn from_wire(wire: &wire::Post) -> Result<Self, NormalizeError> {
        Ok(Self {
            id: nat_to_u64(&wire.id, "post id")?,
            content: wire.content.clone(),
            author: wire.author.to_text(),
            timestamp: int_to_i64(&wire.timestamp, "post timestamp")?,
            likes: nat_to_u64(&wire.likes, "like count")?,
            user_likes: wire.user_likes.iter().map(Principal::to_text).collect(),
            comments: wire
                .comments
                .iter()
                .map(Comment::from_wire)
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn to_wire(&self) -> Result<wire::Post, NormalizeError> {
        Ok(wire::Post {
            id: candid::Nat::from(self.id),
            content: self.content.clone(),
            user_likes: self
                .user_likes
                .iter()
                .map(|p| parse_principal(p))
                .collect::<Result<_, _>>()?,
            author: parse_principal(&self.author)?,
            likes: candid::Nat::from(self.likes),
            timestamp: candid::Int::from(self.timestamp),
            comments: self
                .comments
                .iter()
                .map(Comment::to_wire)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Whether the given viewer is in the liker set.
    pub fn liked_by(&self, principal: &str) -> bool {
        self.user_likes.iter().any(|p| p == principal)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Canonical principal text; the profile's primary key.
    pub id: String,
    pub username: String,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
    /// Nanoseconds since the epoch.
    pub join_date: i64,
    pub followers: Vec<String>,
    pub following: Vec<String>,
}

impl UserProfile {
    pub fn from_wire(wire: &wire::UserProfile) -> Result<Self, NormalizeError> {
        let id = wire.id.to_text();
        // The service does not reject self-follows; drop them here.
        let own = |p: &String| p != &id;
        Ok(Self {
            username: wire.username.clone(),
            bio: wire.bio.clone(),
            profile_pic: wire.profile_pic.clone(),
            join_date: int_to_i64(&wire.join_date, "join date")?,
            followers: wire
                .followers
                .iter()
                .map(Principal::to_text)
                .filter(own)
                .collect(),
            following: wire
                .following
                .iter()
                .map(Principal::to_text)
                .filter(own)
                .collect(),
            id,
        })
    }

    pub fn to_wire(&self) -> Result<wire::UserProfile, NormalizeError> {
        Ok(wire::UserProfile {
            id: parse_principal(&self.id)?,
            username: self.username.clone(),
            bio: self.bio.clone(),
            profile_pic: self.profile_pic.clone(),
            join_date: candid::Int::from(self.join_date),
            followers: self
                .followers
                .iter()
                .map(|p| parse_principal(p))
                .collect::<Result<_, _>>()?,
            following: self
                .following
                .iter()
                .map(|p| parse_principal(p))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Whether this profile follows the given principal.
    pub fn is_following(&self, principal: &str) -> bool {
        self.following.iter().any(|p| p == principal)
    }

    pub fn joined_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.join_date)
    }
}

fn nat_to_u64(value: &candid::Nat, field: &'static str) -> Result<u64, NormalizeError> {
    u64::try_from(&value.0).map_err(|_| NormalizeError::OutOfRange(field))
}

fn int_to_i64(value: &candid::Int, field: &'static str) -> Result<i64, NormalizeError> {
    i64::try_from(&value.0).map_err(|_| NormalizeError::OutOfRange(field))
}
