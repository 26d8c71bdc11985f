//! View-state logic shared by the feed, profile, story viewer and composer.
//!
//! Nothing here touches the terminal, the network or the clock; callers feed
//! in events and dispatch whatever mutations come back.

pub mod hashtag;
pub mod reactions;
pub mod story;
pub mod toggle;
