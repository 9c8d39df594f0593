// SPDX-License-Identifier: MPL-2.0

//! Optimistic like state.
//!
//! The like button flips the moment it is pressed; the canister call catches
//! up in the background. Per post the controller keeps a local override of
//! the liked flag which wins over whatever snapshot the caller is rendering
//! until the snapshot agrees with it again.

use crate::cache::{Store, Tag};
use crate::canister::wire::PostError;
use crate::canister::{CallError, PostCallError};
use crate::entities::Post;
use crate::state::SessionState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// What a post's like button should show right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeView {
    pub liked: bool,
    pub likes: u64,
}

/// How a toggle resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    /// A toggle for this post was already in flight; nothing was sent.
    Ignored,
    Liked(Post),
    Unliked(Post),
    /// The canister disagreed about the current state. Local state now
    /// matches it and the affected caches are refetching.
    Reconciled { liked: bool },
    Failed(PostCallError),
}

#[derive(Default)]
struct LikeSlot {
    /// Local truth for the liked flag, `None` once the server agrees.
    override_liked: Option<bool>,
    in_flight: bool,
}

/// One per process, like the store it drives. Overrides are keyed by post
/// and scoped to the signed-in viewer; call [`LikeController::reset`] when
/// the viewer changes.
pub struct LikeController {
    store: Arc<Store>,
    session: Arc<SessionState>,
    slots: Mutex<HashMap<u64, LikeSlot>>,
}

impl LikeController {
    pub fn new(store: Arc<Store>, session: Arc<SessionState>) -> Self {
        Self {
            store,
            session,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Liked flag and count to display for `post`, overlaying the local
    /// override on the snapshot the caller is holding. The count is adjusted
    /// by one relative to the snapshot while the override disagrees with it;
    /// once the snapshot catches up the override is dropped and the server
    /// numbers pass through untouched.
    pub fn view(&self, post: &Post) -> LikeView {
        let viewer = self.session.principal().unwrap_or_default();
        let truth = post.liked_by(&viewer);

        let mut slots = self.slots.lock().unwrap();
        let state = slots.get(&post.id).map(|s| (s.override_liked, s.in_flight));
        match state {
            None | Some((None, _)) => LikeView {
                liked: truth,
                likes: post.likes,
            },
            Some((Some(liked), in_flight)) if liked == truth => {
                if !in_flight {
                    slots.remove(&post.id);
                }
                LikeView {
                    liked: truth,
                    likes: post.likes,
                }
            }
            Some((Some(true), _)) => LikeView {
                liked: true,
                likes: post.likes.saturating_add(1),
            },
            Some((Some(false), _)) => LikeView {
                liked: false,
                likes: post.likes.saturating_sub(1),
            },
        }
    }

    /// Flip the like state for `post` and send the matching canister call.
    /// The flip shows through [`LikeController::view`] immediately; the
    /// outcome settles it. A second toggle while one is in flight for the
    /// same post is ignored, so at most one like call per post is ever
    /// outstanding.
    pub async fn toggle(&self, post: &Post) -> LikeOutcome {
        let viewer = self.session.principal().unwrap_or_default();

        let (liking, prior) = {
            let mut slots = self.slots.lock().unwrap();
            let slot = slots.entry(post.id).or_default();
            if slot.in_flight {
                return LikeOutcome::Ignored;
            }
            let prior = slot.override_liked;
            let liked_now = prior.unwrap_or_else(|| post.liked_by(&viewer));
            slot.override_liked = Some(!liked_now);
            slot.in_flight = true;
            (!liked_now, prior)
        };

        let result = if liking {
            self.store.like_post(post.id).await
        } else {
            self.store.unlike_post(post.id).await
        };

        match result {
            Ok(updated) => {
                // Keep the server-confirmed flag until snapshots catch up.
                self.settle(post.id, Some(updated.liked_by(&viewer)));
                if liking {
                    LikeOutcome::Liked(updated)
                } else {
                    LikeOutcome::Unliked(updated)
                }
            }
            Err(CallError::Service(PostError::AlreadyLiked)) => {
                self.settle(post.id, Some(true));
                self.store.invalidate(&[Tag::Post(post.id), Tag::AllPosts]);
                LikeOutcome::Reconciled { liked: true }
            }
            Err(CallError::Service(PostError::NotLiked)) => {
                self.settle(post.id, Some(false));
                self.store.invalidate(&[Tag::Post(post.id), Tag::AllPosts]);
                LikeOutcome::Reconciled { liked: false }
            }
            Err(e) => {
                self.settle(post.id, prior);
                LikeOutcome::Failed(e)
            }
        }
    }

    /// Forget every local override, e.g. when the viewer signs out.
    pub fn reset(&self) {
        self.slots.lock().unwrap().clear();
    }

    fn settle(&self, post_id: u64, override_liked: Option<bool>) {
        let mut slots = self.slots.lock().unwrap();
        if override_liked.is_none() {
            slots.remove(&post_id);
        } else if let Some(slot) = slots.get_mut(&post_id) {
            slot.override_liked = override_liked;
            slot.in_flight = false;
        }
    }
}
