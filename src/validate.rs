// SPDX-License-Identifier: MPL-2.0

//! Client-side input validation mirroring the services' bounds.
//!
//! Lengths count extended grapheme clusters, so an emoji or a combining
//! sequence costs one unit. Messages are user-facing; the orchestrator
//! surfaces them as inline form feedback.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;
use url::Url;

pub const POST_MAX: usize = 280;
pub const COMMENT_MAX: usize = 500;
pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 20;
pub const BIO_MAX: usize = 160;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Post cannot be empty")]
    EmptyPost,
    #[error("Post cannot exceed 280 characters")]
    PostTooLong,
    #[error("Comment cannot be empty")]
    EmptyComment,
    #[error("Comment cannot exceed 500 characters")]
    CommentTooLong,
    #[error("Username must be at least 3 characters")]
    UsernameTooShort,
    #[error("Username must not exceed 20 characters")]
    UsernameTooLong,
    #[error("Username can only contain letters, numbers, and underscores")]
    UsernameCharset,
    #[error("Bio must not exceed 160 characters")]
    BioTooLong,
    #[error("Must be a valid URL")]
    InvalidUrl,
}

/// Unit count the services bound against.
pub fn units(text: &str) -> usize {
    text.graphemes(true).count()
}

pub fn post_content(text: &str) -> Result<(), ValidationError> {
    match units(text) {
        0 => Err(ValidationError::EmptyPost),
        n if n > POST_MAX => Err(ValidationError::PostTooLong),
        _ => Ok(()),
    }
}

pub fn comment_content(text: &str) -> Result<(), ValidationError> {
    match units(text) {
        0 => Err(ValidationError::EmptyComment),
        n if n > COMMENT_MAX => Err(ValidationError::CommentTooLong),
        _ => Ok(()),
    }
}

pub fn username(name: &str) -> Result<(), ValidationError> {
    let n = units(name);
    if n < USERNAME_MIN {
        return Err(ValidationError::UsernameTooShort);
    }
    if n > USERNAME_MAX {
        return Err(ValidationError::UsernameTooLong);
    }
    if !USERNAME_RE.is_match(name) {
        return Err(ValidationError::UsernameCharset);
    }
    Ok(())
}

pub fn bio(text: &str) -> Result<(), ValidationError> {
    if units(text) > BIO_MAX {
        return Err(ValidationError::BioTooLong);
    }
    Ok(())
}

pub fn profile_pic_url(value: &str) -> Result<(), ValidationError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidUrl)
}
