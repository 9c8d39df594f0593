// SPDX-License-Identifier: MPL-2.0

mod likes;
mod session;

pub use likes::{LikeController, LikeOutcome, LikeView};
pub use session::{Session, SessionState};
