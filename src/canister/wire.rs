// SPDX-License-Identifier: MPL-2.0

use candid::{CandidType, Principal};
use serde::Deserialize;
use thiserror::Error;

/// Rejection variants of the post service. Closed set; match exhaustively.
#[derive(CandidType, Deserialize, Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostError {
    #[error("invalid input")]
    InvalidInput,
    #[error("already liked")]
    AlreadyLiked,
    #[error("not liked")]
    NotLiked,
    #[error("not found")]
    NotFound,
    #[error("not authorized")]
    NotAuthorized,
    #[error("system error")]
    SystemError,
}

/// Rejection variants of the profile service. Closed set; match exhaustively.
#[derive(CandidType, Deserialize, Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileError {
    #[error("invalid input")]
    InvalidInput,
    #[error("not found")]
    NotFound,
    #[error("not authorized")]
    NotAuthorized,
    #[error("system error")]
    SystemError,
}

#[derive(CandidType, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub content: String,
    pub author: Principal,
    pub timestamp: candid::Int,
}

#[derive(CandidType, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: candid::Nat,
    pub content: String,
    pub user_likes: Vec<Principal>,
    pub author: Principal,
    pub likes: candid::Nat,
    /// Creation time in nanoseconds since the epoch.
    pub timestamp: candid::Int,
    pub comments: Vec<Comment>,
}

#[derive(CandidType, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Principal,
    pub username: String,
    pub bio: Option<String>,
    #[serde(rename = "profilePic")]
    pub profile_pic: Option<String>,
    /// Registration time in nanoseconds since the epoch.
    #[serde(rename = "joinDate")]
    pub join_date: candid::Int,
    pub followers: Vec<Principal>,
    pub following: Vec<Principal>,
}

/// `variant { ok : Post; err : Error }` as the post service returns it.
#[derive(CandidType, Deserialize, Debug, Clone)]
pub enum PostResult {
    #[serde(rename = "ok")]
    Ok(Post),
    #[serde(rename = "err")]
    Err(PostError),
}

impl From<PostResult> for Result<Post, PostError> {
    fn from(value: PostResult) -> Self {
        match value {
            PostResult::Ok(post) => Ok(post),
            PostResult::Err(e) => Err(e),
        }
    }
}

/// `variant { ok : UserProfile; err : Error }` from the profile service.
#[derive(CandidType, Deserialize, Debug, Clone)]
pub enum ProfileResult {
    #[serde(rename = "ok")]
    Ok(UserProfile),
    #[serde(rename = "err")]
    Err(ProfileError),
}

impl From<ProfileResult> for Result<UserProfile, ProfileError> {
    fn from(value: ProfileResult) -> Self {
        match value {
            ProfileResult::Ok(profile) => Ok(profile),
            ProfileResult::Err(e) => Err(e),
        }
    }
}

/// `variant { ok : vec UserProfile; err : Error }`, used by the follow-list queries.
#[derive(CandidType, Deserialize, Debug, Clone)]
pub enum ProfileListResult {
    #[serde(rename = "ok")]
    Ok(Vec<UserProfile>),
    #[serde(rename = "err")]
    Err(ProfileError),
}

impl From<ProfileListResult> for Result<Vec<UserProfile>, ProfileError> {
    fn from(value: ProfileListResult) -> Self {
        match value {
            ProfileListResult::Ok(profiles) => Ok(profiles),
            ProfileListResult::Err(e) => Err(e),
        }
    }
}
