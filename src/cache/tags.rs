// SPDX-License-Identifier: MPL-2.0

/// What a mutation touched, in cache terms. Mutations declare a set of
/// these; the store routes each to the affected cache keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    /// The timeline listing of all posts.
    AllPosts,
    /// A single post by id.
    Post(u64),
    /// A single profile by principal text.
    Profile(String),
    /// Every cached profile.
    AllProfiles,
    /// Every cached follower/following list.
    FollowLists,
}
