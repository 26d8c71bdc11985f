//! Ephemeral stories and timed playback.
//!
//! Every slide runs for the same fixed duration regardless of whether it is
//! text, an image or a video. Progress is fed in by the caller as fractions
//! of a slide; crossing 1.0 advances to the next slide, and advancing past the
//! last one closes the session.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StoryError {
    #[error("no stories to play")]
    Empty,
    #[error("story index {index} out of range (session has {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("story {id} expires before it was created")]
    InvalidExpiry { id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    #[serde(rename = "user_id")]
    pub owner_user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, rename = "media_url")]
    pub media_ref: Option<String>,
    #[serde(default, rename = "content")]
    pub text_content: Option<String>,
}

impl Story {
    pub fn validate(&self) -> Result<(), StoryError> {
        if self.expires_at <= self.created_at {
            return Err(StoryError::InvalidExpiry {
                id: self.id.clone(),
            });
        }
        Ok(())
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Empty strings from the backend count as absent.
    pub fn media(&self) -> Option<&str> {
        self.media_ref.as_deref().filter(|m| !m.is_empty())
    }

    pub fn text(&self) -> Option<&str> {
        self.text_content.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Keep active stories and order them for playback: owners by their most
/// recent story (newest first), each owner's stories oldest first.
pub fn playback_order(stories: &[Story], now: DateTime<Utc>) -> Vec<Story> {
    let mut active: Vec<&Story> = stories
        .iter()
        .filter(|s| s.is_active(now) && s.validate().is_ok())
        .collect();
    active.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut owners: Vec<&str> = Vec::new();
    let mut seen = HashSet::new();
    for story in &active {
        if seen.insert(story.owner_user_id.as_str()) {
            owners.push(story.owner_user_id.as_str());
        }
    }

    let mut ordered = Vec::with_capacity(active.len());
    for owner in owners {
        let mut own: Vec<&Story> = active
            .iter()
            .copied()
            .filter(|s| s.owner_user_id == owner)
            .collect();
        own.reverse();
        ordered.extend(own.into_iter().cloned());
    }
    ordered
}

/// Index of the first story of each owner within a playback order.
pub fn owner_starts(ordered: &[Story]) -> Vec<usize> {
    ordered
        .iter()
        .enumerate()
        .filter(|(i, s)| *i == 0 || ordered[i - 1].owner_user_id != s.owner_user_id)
        .map(|(i, _)| i)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Back,
    Forward,
}

/// Viewer input, mapped from keys or tap regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryCommand {
    Next,
    Previous,
    TogglePause,
    Close,
}

/// What a call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Moved { from: usize, to: usize },
    Closed,
}

#[derive(Debug, Clone)]
pub struct StoryPlayback {
    story_ids: Vec<String>,
    current: usize,
    progress: f64,
    state: PlaybackState,
}

impl StoryPlayback {
    pub fn open(story_ids: Vec<String>, start: usize) -> Result<Self, StoryError> {
        if story_ids.is_empty() {
            return Err(StoryError::Empty);
        }
        if start >= story_ids.len() {
            return Err(StoryError::OutOfRange {
                index: start,
                len: story_ids.len(),
            });
        }
        Ok(Self {
            story_ids,
            current: start,
            progress: 0.0,
            state: PlaybackState::Playing,
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == PlaybackState::Closed
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_id(&self) -> &str {
        &self.story_ids[self.current]
    }

    pub fn len(&self) -> usize {
        self.story_ids.len()
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Feed elapsed progress. Only a playing session moves.
    pub fn tick(&mut self, delta: f64) -> Transition {
        if self.state != PlaybackState::Playing || !delta.is_finite() || delta <= 0.0 {
            return Transition::Unchanged;
        }
        self.progress = (self.progress + delta).min(1.0);
        if self.progress >= 1.0 {
            self.advance(Direction::Forward)
        } else {
            Transition::Unchanged
        }
    }

    pub fn toggle_pause(&mut self) -> PlaybackState {
        self.state = match self.state {
            PlaybackState::Playing => PlaybackState::Paused,
            PlaybackState::Paused => PlaybackState::Playing,
            PlaybackState::Closed => PlaybackState::Closed,
        };
        self.state
    }

    pub fn advance(&mut self, direction: Direction) -> Transition {
        if self.is_closed() {
            return Transition::Unchanged;
        }
        let from = self.current;
        match direction {
            Direction::Forward if from + 1 >= self.story_ids.len() => self.close(),
            Direction::Forward => self.move_to(from + 1),
            Direction::Back if from == 0 => Transition::Unchanged,
            Direction::Back => self.move_to(from - 1),
        }
    }

    /// Jump to another index, e.g. the first story of the next owner.
    pub fn seek(&mut self, index: usize) -> Transition {
        if self.is_closed() || index >= self.story_ids.len() || index == self.current {
            return Transition::Unchanged;
        }
        self.move_to(index)
    }

    pub fn close(&mut self) -> Transition {
        if self.is_closed() {
            return Transition::Unchanged;
        }
        self.state = PlaybackState::Closed;
        Transition::Closed
    }

    pub fn handle(&mut self, command: StoryCommand) -> Transition {
        match command {
            StoryCommand::Next => self.advance(Direction::Forward),
            StoryCommand::Previous => self.advance(Direction::Back),
            StoryCommand::TogglePause => {
                self.toggle_pause();
                Transition::Unchanged
            }
            StoryCommand::Close => self.close(),
        }
    }

    /// Fill of each segment of the progress strip.
    pub fn progress_bars(&self) -> Vec<f64> {
        (0..self.story_ids.len())
            .map(|i| match i.cmp(&self.current) {
                std::cmp::Ordering::Less => 1.0,
                std::cmp::Ordering::Equal => self.progress,
                std::cmp::Ordering::Greater => 0.0,
            })
            .collect()
    }

    fn move_to(&mut self, to: usize) -> Transition {
        let from = self.current;
        self.current = to;
        self.progress = 0.0;
        Transition::Moved { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(n: usize) -> StoryPlayback {
        let ids = (0..n).map(|i| format!("s{i}")).collect();
        StoryPlayback::open(ids, 0).unwrap()
    }

    fn story(id: &str, owner: &str, age_mins: i64, now: DateTime<Utc>) -> Story {
        let created_at = now - Duration::minutes(age_mins);
        Story {
            id: id.into(),
            owner_user_id: owner.into(),
            created_at,
            expires_at: created_at + Duration::hours(24),
            media_ref: None,
            text_content: Some(format!("story {id}")),
        }
    }

    #[test]
    fn open_rejects_empty_and_out_of_range() {
        assert_eq!(StoryPlayback::open(vec![], 0).unwrap_err(), StoryError::Empty);
        assert_eq!(
            StoryPlayback::open(vec!["a".into()], 1).unwrap_err(),
            StoryError::OutOfRange { index: 1, len: 1 }
        );
    }

    #[test]
    fn advancing_past_last_closes() {
        let mut s = session(3);
        assert_eq!(s.advance(Direction::Forward), Transition::Moved { from: 0, to: 1 });
        assert_eq!(s.advance(Direction::Forward), Transition::Moved { from: 1, to: 2 });
        assert_eq!(s.current_index(), 2);
        assert_eq!(s.advance(Direction::Forward), Transition::Closed);
        assert_eq!(s.state(), PlaybackState::Closed);
    }

    #[test]
    fn retreating_at_first_clamps() {
        let mut s = session(3);
        assert_eq!(s.advance(Direction::Back), Transition::Unchanged);
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.state(), PlaybackState::Playing);
    }

    #[test]
    fn ticks_summing_to_one_advance_exactly_once() {
        let mut s = session(3);
        for _ in 0..3 {
            assert_eq!(s.tick(0.25), Transition::Unchanged);
        }
        assert_eq!(s.tick(0.25), Transition::Moved { from: 0, to: 1 });
        assert_eq!(s.progress(), 0.0);
        assert_eq!(s.current_index(), 1);
    }

    #[test]
    fn overshooting_tick_still_advances_once() {
        let mut s = session(3);
        assert_eq!(s.tick(2.5), Transition::Moved { from: 0, to: 1 });
        assert_eq!(s.current_index(), 1);
        assert_eq!(s.progress(), 0.0);
    }

    #[test]
    fn paused_session_ignores_ticks() {
        let mut s = session(2);
        s.tick(0.5);
        assert_eq!(s.toggle_pause(), PlaybackState::Paused);
        assert_eq!(s.tick(0.9), Transition::Unchanged);
        assert_eq!(s.progress(), 0.5);
        assert_eq!(s.toggle_pause(), PlaybackState::Playing);
    }

    #[test]
    fn toggle_pause_after_close_is_noop() {
        let mut s = session(2);
        s.close();
        assert_eq!(s.toggle_pause(), PlaybackState::Closed);
        assert_eq!(s.tick(1.0), Transition::Unchanged);
        assert_eq!(s.advance(Direction::Forward), Transition::Unchanged);
    }

    #[test]
    fn close_from_paused() {
        let mut s = session(2);
        s.toggle_pause();
        assert_eq!(s.handle(StoryCommand::Close), Transition::Closed);
        assert!(s.is_closed());
    }

    #[test]
    fn progress_bars_reflect_position() {
        let mut s = session(3);
        s.advance(Direction::Forward);
        s.tick(0.4);
        assert_eq!(s.progress_bars(), vec![1.0, 0.4, 0.0]);
    }

    #[test]
    fn commands_map_to_transitions() {
        let mut s = session(2);
        assert_eq!(s.handle(StoryCommand::Next), Transition::Moved { from: 0, to: 1 });
        assert_eq!(s.handle(StoryCommand::Previous), Transition::Moved { from: 1, to: 0 });
        s.handle(StoryCommand::TogglePause);
        assert_eq!(s.state(), PlaybackState::Paused);
    }

    #[test]
    fn seek_resets_progress() {
        let mut s = session(4);
        s.tick(0.7);
        assert_eq!(s.seek(3), Transition::Moved { from: 0, to: 3 });
        assert_eq!(s.progress(), 0.0);
        assert_eq!(s.seek(9), Transition::Unchanged);
    }

    #[test]
    fn playback_order_groups_by_owner_and_drops_expired() {
        let now = Utc::now();
        let mut expired = story("old", "carol", 10, now);
        expired.expires_at = now - Duration::minutes(1);
        let stories = vec![
            story("a1", "alice", 50, now),
            story("b1", "bob", 30, now),
            story("a2", "alice", 5, now),
            expired,
        ];

        let ordered = playback_order(&stories, now);
        let ids: Vec<&str> = ordered.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "b1"]);
        assert_eq!(owner_starts(&ordered), vec![0, 2]);
    }

    #[test]
    fn story_validation() {
        let now = Utc::now();
        let mut s = story("x", "o", 0, now);
        assert!(s.validate().is_ok());
        s.expires_at = s.created_at;
        assert!(s.validate().is_err());
        assert!(!s.is_active(now + Duration::seconds(1)));
    }
}
