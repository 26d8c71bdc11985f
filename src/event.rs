use color_eyre::eyre::OptionExt;
use crossterm::event::Event as CrosstermEvent;
use futures::{FutureExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::api::posts::FeedTab;
use crate::api::types::{
    ConversationEntry, ConversationThread, ExploreData, Hashtag, Message, Notification, Post,
    PostDetail, ProfileData, SearchResults, StoryRow,
};
use crate::compose::ComposeTarget;
use crate::interaction::hashtag::SuggestionRequest;
use crate::interaction::toggle::{RelationKey, Ticket};

/// Representation of all possible events.
#[derive(Clone, Debug)]
pub enum Event {
    /// An event that is emitted on a regular schedule.
    Tick,
    /// Crossterm events from the terminal.
    Crossterm(CrosstermEvent),
    /// Application-level events.
    App(Box<AppEvent>),
}

/// Application events for navigation, backend requests, and their results.
#[derive(Clone, Debug)]
pub enum AppEvent {
    // -- Navigation --
    Quit,
    PushView(ViewKind),
    PopView,
    SwitchView(ViewKind),

    // -- Backend request triggers (sent from key handlers) --
    FetchFeed { tab: FeedTab },
    FetchExplore,
    FetchPost { post_id: String },
    FetchProfile { username: String },
    FetchSearch { query: String },
    FetchStories,
    FetchNotifications,
    FetchUnreadCount,
    FetchConversations,
    OpenConversation { username: String },
    FetchMessages { conversation_id: String },
    MarkNotificationRead { notification_id: String },
    MarkAllNotificationsRead,
    FetchSuggestions(SuggestionRequest),
    Submit { target: ComposeTarget, content: String },

    // -- Backend results (sent from async tasks back to the event loop) --
    FeedLoaded {
        tab: FeedTab,
        result: ApiResult<Vec<Post>>,
    },
    ExploreLoaded(ApiResult<ExploreData>),
    PostLoaded(Box<ApiResult<PostDetail>>),
    ProfileLoaded(Box<ApiResult<ProfileData>>),
    SearchLoaded {
        query: String,
        result: ApiResult<SearchResults>,
    },
    StoriesLoaded(ApiResult<Vec<StoryRow>>),
    NotificationsLoaded(ApiResult<Vec<Notification>>),
    UnreadCountLoaded(ApiResult<u64>),
    NotificationsMarked(ApiResult<Option<String>>),
    ConversationsLoaded(ApiResult<Vec<ConversationEntry>>),
    ConversationOpened(Box<ApiResult<ConversationThread>>),
    MessagesLoaded {
        conversation_id: String,
        result: ApiResult<Vec<Message>>,
    },
    SuggestionsLoaded {
        id: u64,
        result: ApiResult<Vec<Hashtag>>,
    },
    MutationCompleted {
        key: RelationKey,
        ticket: Ticket,
        result: ApiResult<()>,
    },
    Submitted {
        target: ComposeTarget,
        result: ApiResult<()>,
    },

    // -- Timers --
    StoryTick { session: u64 },
}

/// API result type using `Arc<String>` so errors are `Clone`.
pub type ApiResult<T> = Result<T, Arc<String>>;

/// Identifies a view for the view-stack navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewKind {
    Feed,
    Explore,
    Post(String),    // post_id
    Profile(String), // username
    Search,
    Notifications,
    Messages,
    Conversation(String), // conversation_id
    Stories,
    Help,
}

/// Terminal event handler.
///
/// Spawns a background task that emits tick and crossterm events, and exposes
/// an unbounded channel for application events.
#[derive(Debug)]
pub struct EventHandler {
    /// Event sender channel.
    sender: mpsc::UnboundedSender<Event>,
    /// Event receiver channel.
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Constructs a new instance of [`EventHandler`] and spawns the event task.
    pub fn new(tick_rate_fps: f64) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let actor = EventTask::new(sender.clone(), tick_rate_fps);
        tokio::spawn(async { actor.run().await });
        Self { sender, receiver }
    }

    /// Receives the next event, blocking until one is available.
    pub async fn next(&mut self) -> color_eyre::Result<Event> {
        self.receiver
            .recv()
            .await
            .ok_or_eyre("Failed to receive event")
    }

    /// Queue an app event to be processed by the event loop.
    pub fn send(&self, app_event: AppEvent) {
        let _ = self.sender.send(Event::App(Box::new(app_event)));
    }

    /// Clone the underlying sender for use in spawned async tasks.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.sender.clone()
    }
}

/// Background task that reads crossterm events and emits ticks.
struct EventTask {
    sender: mpsc::UnboundedSender<Event>,
    tick_rate_fps: f64,
}

impl EventTask {
    fn new(sender: mpsc::UnboundedSender<Event>, tick_rate_fps: f64) -> Self {
        Self {
            sender,
            tick_rate_fps,
        }
    }

    async fn run(self) -> color_eyre::Result<()> {
        let tick_rate = Duration::from_secs_f64(1.0 / self.tick_rate_fps.max(1.0));
        let mut reader = crossterm::event::EventStream::new();
        let mut tick = tokio::time::interval(tick_rate);
        loop {
            let tick_delay = tick.tick();
            let crossterm_event = reader.next().fuse();
            tokio::select! {
                _ = self.sender.closed() => {
                    break;
                }
                _ = tick_delay => {
                    self.send(Event::Tick);
                }
                Some(Ok(evt)) = crossterm_event => {
                    self.send(Event::Crossterm(evt));
                }
            };
        }
        Ok(())
    }

    fn send(&self, event: Event) {
        let _ = self.sender.send(event);
    }
}

/// Drives an open story viewer with `StoryTick` events.
///
/// The background task stops when the timer is dropped, so closing the viewer
/// leaves no ticks behind.
#[derive(Debug)]
pub struct StoryTimer {
    session: u64,
    _guard: DropGuard,
}

impl StoryTimer {
    pub fn start(sender: mpsc::UnboundedSender<Event>, session: u64, period: Duration) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        let tick = Event::App(Box::new(AppEvent::StoryTick { session }));
                        if sender.send(tick).is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(session, "story timer stopped");
        });
        Self {
            session,
            _guard: token.drop_guard(),
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn story_timer_ticks_until_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = StoryTimer::start(tx, 7, Duration::from_millis(5));
        assert_eq!(timer.session(), 7);

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match first {
            Event::App(event) => {
                assert!(matches!(*event, AppEvent::StoryTick { session: 7 }));
            }
            other => panic!("unexpected event {other:?}"),
        }

        drop(timer);
        // The task owns the only sender; once it stops the channel closes.
        let drained = tokio::time::timeout(Duration::from_secs(1), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok(), "story timer kept running after drop");
    }
}
