use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::DefaultTerminal;

use crate::api::posts::FeedTab;
use crate::api::types::{
    ConversationEntry, ConversationThread, ExploreData, Notification, Post, PostDetail,
    ProfileData, SearchResults, StoryRow,
};
use crate::api::{ApiClientError, BackendClient};
use crate::command::{self, Command};
use crate::compose::{ComposeTarget, Composer};
use crate::config::{AppConfig, DefaultView};
use crate::event::{ApiResult, AppEvent, Event, EventHandler, StoryTimer, ViewKind};
use crate::interaction::hashtag::SuggestionUpdate;
use crate::interaction::reactions::{Category, LikeCount, On, ReactionCounts, ReactionKind};
use crate::interaction::story::{self, StoryCommand, StoryPlayback, Transition};
use crate::interaction::toggle::{
    Completion, PendingMutation, RelationKey, RelationKind, Ticket, ToggleController,
};
use crate::recent::RecentSearches;
use crate::ui;
use crate::ui::post::Engagement;
use crate::validate;

fn mapped<T>(result: Result<T, ApiClientError>) -> ApiResult<T> {
    result.map_err(|e| Arc::new(e.to_string()))
}

// ---------------------------------------------------------------------------
// Feed state
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FeedState {
    pub tab: FeedTab,
    pub posts: Vec<Post>,
    pub loading: bool,
}

// ---------------------------------------------------------------------------
// Local relation state
// ---------------------------------------------------------------------------

/// Optimistic like, reaction and follow state, keyed by target id.
///
/// Fetched rows stay as the server sent them; the displayed state is the
/// controller's current value and counts are shifted from the fetched value
/// to it.
#[derive(Debug, Default)]
pub struct Relations {
    likes: HashMap<String, ToggleController<On>>,
    reactions: HashMap<String, ToggleController<ReactionKind>>,
    follows: HashMap<String, ToggleController<On>>,
}

fn controller_for<C: Category>(
    map: &mut HashMap<String, ToggleController<C>>,
    key: RelationKey,
    fetched: Option<C>,
) -> &mut ToggleController<C> {
    map.entry(key.target_id.clone())
        .or_insert_with(|| ToggleController::new(key, fetched))
}

fn observe<C: Category>(
    map: &mut HashMap<String, ToggleController<C>>,
    key: RelationKey,
    fetched: Option<C>,
) {
    match map.get_mut(&key.target_id) {
        Some(controller) => {
            controller.reconcile(fetched);
        }
        None => {
            map.insert(key.target_id.clone(), ToggleController::new(key, fetched));
        }
    }
}

fn finish<C: Category>(
    controller: Option<&mut ToggleController<C>>,
    ticket: Ticket,
    result: ApiResult<()>,
) -> Option<String> {
    let controller = controller?;
    match controller.complete(ticket, result) {
        Completion::RolledBack { .. } => controller.take_notice(),
        Completion::Confirmed | Completion::Stale => None,
    }
}

impl Relations {
    pub fn observe_post(&mut self, me: &str, post: &Post) {
        observe(
            &mut self.likes,
            RelationKey::new(me, &post.id, RelationKind::Like),
            post.liked_by(me),
        );
        observe(
            &mut self.reactions,
            RelationKey::new(me, &post.id, RelationKind::Reaction),
            post.reaction_of(me),
        );
    }

    pub fn observe_follow(&mut self, me: &str, user_id: &str, followed: Option<On>) {
        observe(
            &mut self.follows,
            RelationKey::new(me, user_id, RelationKind::Follow),
            followed,
        );
    }

    pub fn toggle_like(&mut self, me: &str, post: &Post) -> Option<PendingMutation<On>> {
        let key = RelationKey::new(me, &post.id, RelationKind::Like);
        controller_for(&mut self.likes, key, post.liked_by(me)).toggle(On)
    }

    pub fn toggle_reaction(
        &mut self,
        me: &str,
        post: &Post,
        kind: ReactionKind,
    ) -> Option<PendingMutation<ReactionKind>> {
        let key = RelationKey::new(me, &post.id, RelationKind::Reaction);
        controller_for(&mut self.reactions, key, post.reaction_of(me)).toggle(kind)
    }

    pub fn toggle_follow(
        &mut self,
        me: &str,
        user_id: &str,
        fetched: Option<On>,
    ) -> Option<PendingMutation<On>> {
        let key = RelationKey::new(me, user_id, RelationKind::Follow);
        controller_for(&mut self.follows, key, fetched).toggle(On)
    }

    /// The user's like on `post` and the like count to display.
    pub fn like_view(&self, me: Option<&str>, post: &Post) -> (Option<On>, LikeCount) {
        let fetched = me.and_then(|me| post.liked_by(me));
        let current = self.likes.get(&post.id).map_or(fetched, ToggleController::current);
        (current, post.like_count().apply_local_toggle(fetched, current))
    }

    pub fn reaction_view(
        &self,
        me: Option<&str>,
        post: &Post,
    ) -> (Option<ReactionKind>, ReactionCounts) {
        let fetched = me.and_then(|me| post.reaction_of(me));
        let current = self
            .reactions
            .get(&post.id)
            .map_or(fetched, ToggleController::current);
        (current, post.reaction_counts().apply_local_toggle(fetched, current))
    }

    /// Whether the user follows the profile and its follower count to display.
    pub fn follow_view(&self, data: &ProfileData) -> (Option<On>, u64) {
        let fetched = data.followed;
        let current = self
            .follows
            .get(&data.profile.id)
            .map_or(fetched, ToggleController::current);
        let followers = match (fetched, current) {
            (None, Some(_)) => data.followers + 1,
            (Some(_), None) => data.followers.saturating_sub(1),
            _ => data.followers,
        };
        (current, followers)
    }

    pub fn is_pending(&self, kind: RelationKind, target_id: &str) -> bool {
        match kind {
            RelationKind::Like => self.likes.get(target_id).is_some_and(|c| c.is_in_flight()),
            RelationKind::Reaction => self
                .reactions
                .get(target_id)
                .is_some_and(|c| c.is_in_flight()),
            RelationKind::Follow => self.follows.get(target_id).is_some_and(|c| c.is_in_flight()),
        }
    }

    /// Apply a mutation result. Returns the rollback notice, if any.
    pub fn complete(&mut self, key: &RelationKey, ticket: Ticket, result: ApiResult<()>) -> Option<String> {
        match key.kind {
            RelationKind::Like => finish(self.likes.get_mut(&key.target_id), ticket, result),
            RelationKind::Reaction => finish(self.reactions.get_mut(&key.target_id), ticket, result),
            RelationKind::Follow => finish(self.follows.get_mut(&key.target_id), ticket, result),
        }
    }
}

// ---------------------------------------------------------------------------
// Story viewer
// ---------------------------------------------------------------------------

pub struct StoryViewer {
    pub stories: Vec<StoryRow>,
    pub playback: StoryPlayback,
    timer: StoryTimer,
}

impl StoryViewer {
    pub fn current(&self) -> Option<&StoryRow> {
        self.stories.get(self.playback.current_index())
    }
}

/// First story of the owner after the one playing at `current`.
fn next_owner_start(rows: &[StoryRow], current: usize) -> Option<usize> {
    let stories: Vec<_> = rows.iter().map(|r| r.story.clone()).collect();
    story::owner_starts(&stories).into_iter().find(|&i| i > current)
}

/// Active rows in playback order.
pub fn order_story_rows(rows: Vec<StoryRow>, now: chrono::DateTime<Utc>) -> Vec<StoryRow> {
    let stories: Vec<_> = rows.iter().map(|r| r.story.clone()).collect();
    let ordered = story::playback_order(&stories, now);
    let mut by_id: HashMap<String, StoryRow> = rows
        .into_iter()
        .map(|r| (r.story.id.clone(), r))
        .collect();
    ordered.iter().filter_map(|s| by_id.remove(&s.id)).collect()
}

// ---------------------------------------------------------------------------
// App mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppMode {
    Normal,
    Command,
    Search,
    Compose,
    /// Waiting for a reaction key (1-6).
    React,
}

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

pub struct ViewState {
    pub kind: ViewKind,
    pub scroll_offset: usize,
    pub selected_index: usize,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    pub running: bool,
    pub events: EventHandler,
    pub config: AppConfig,

    // View system
    pub view_stack: Vec<ViewState>,
    pub mode: AppMode,

    // Data state
    pub my_id: Option<String>,
    pub feed: FeedState,
    pub explore: ExploreData,
    pub post_detail: Option<PostDetail>,
    pub profile: Option<ProfileData>,
    pub search_query: String,
    pub search_results: SearchResults,
    pub recent_searches: RecentSearches,
    pub stories: Vec<StoryRow>,
    pub story_viewer: Option<StoryViewer>,
    story_sessions: u64,
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
    last_unread_refresh: Instant,
    pub conversations: Vec<ConversationEntry>,
    pub conversation: Option<ConversationThread>,
    pub relations: Relations,

    // Input state
    pub command_input: String,
    pub search_input: String,
    pub composer: Option<Composer>,

    // API client (wrapped for sharing with spawned tasks)
    pub api_client: Arc<Mutex<BackendClient>>,

    // Status
    pub status_message: Option<String>,
    pub last_error: Option<String>,
    pub error_detail: Option<String>,
    pub loading: bool,
}

impl App {
    pub fn new(config: AppConfig, api_client: BackendClient, recent_searches: RecentSearches) -> Self {
        let default_view = match config.default_view {
            DefaultView::Feed => ViewKind::Feed,
            DefaultView::Explore => ViewKind::Explore,
            DefaultView::Notifications => ViewKind::Notifications,
            DefaultView::Messages => ViewKind::Messages,
            DefaultView::Search => ViewKind::Search,
        };

        let initial_view = ViewState {
            kind: default_view,
            scroll_offset: 0,
            selected_index: 0,
        };

        Self {
            running: true,
            events: EventHandler::new(config.tick_rate_fps),
            config,
            view_stack: vec![initial_view],
            mode: AppMode::Normal,
            my_id: api_client.session().map(|s| s.user.id.clone()),
            feed: FeedState::default(),
            explore: ExploreData::default(),
            post_detail: None,
            profile: None,
            search_query: String::new(),
            search_results: SearchResults::default(),
            recent_searches,
            stories: Vec::new(),
            story_viewer: None,
            story_sessions: 0,
            notifications: Vec::new(),
            unread_count: 0,
            last_unread_refresh: Instant::now(),
            conversations: Vec::new(),
            conversation: None,
            relations: Relations::default(),
            command_input: String::new(),
            search_input: String::new(),
            composer: None,
            api_client: Arc::new(Mutex::new(api_client)),
            status_message: None,
            last_error: None,
            error_detail: None,
            loading: false,
        }
    }

    // -- Main event loop ----------------------------------------------------

    pub async fn run(mut self, mut terminal: DefaultTerminal) -> color_eyre::Result<()> {
        if let Some(kind) = self.current_view().cloned() {
            self.fetch_for_view(&kind);
        }
        self.events.send(AppEvent::FetchStories);
        if self.my_id.is_some() {
            self.events.send(AppEvent::FetchUnreadCount);
        }

        while self.running {
            terminal.draw(|frame| self.draw(frame))?;
            match self.events.next().await? {
                Event::Tick => self.tick(),
                Event::Crossterm(event) => {
                    if let crossterm::event::Event::Key(key) = event
                        && key.kind == crossterm::event::KeyEventKind::Press
                    {
                        self.handle_key_event(key);
                    }
                }
                Event::App(app_event) => self.handle_app_event(*app_event),
            }
        }
        Ok(())
    }

    fn draw(&self, frame: &mut ratatui::Frame) {
        ui::draw(frame, self);
    }

    /// Periodic unread-count refresh in place of push updates.
    fn tick(&mut self) {
        let period = Duration::from_secs(self.config.notification_refresh_secs.max(1));
        if self.my_id.is_some() && self.last_unread_refresh.elapsed() >= period {
            self.last_unread_refresh = Instant::now();
            self.events.send(AppEvent::FetchUnreadCount);
        }
    }

    // -- View stack ---------------------------------------------------------

    pub fn current_view(&self) -> Option<&ViewKind> {
        self.view_stack.last().map(|vs| &vs.kind)
    }

    pub fn push_view(&mut self, kind: ViewKind) {
        self.view_stack.push(ViewState {
            kind,
            scroll_offset: 0,
            selected_index: 0,
        });
    }

    pub fn pop_view(&mut self) {
        if self.view_stack.len() > 1 {
            self.view_stack.pop();
        }
    }

    // -- Key event routing --------------------------------------------------

    fn handle_key_event(&mut self, key: KeyEvent) {
        // Ctrl-C always quits.
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c' | 'C'))
        {
            self.events.send(AppEvent::Quit);
            return;
        }

        if self.error_detail.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.error_detail = None;
            }
            return;
        }

        if self.story_viewer.is_some() {
            self.handle_story_key(key);
            return;
        }

        match self.mode {
            AppMode::Normal => self.handle_normal_key(key),
            AppMode::Command => self.handle_command_key(key),
            AppMode::Search => self.handle_search_key(key),
            AppMode::Compose => self.handle_compose_key(key),
            AppMode::React => self.handle_react_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                if self.view_stack.len() > 1 {
                    self.events.send(AppEvent::PopView);
                } else {
                    self.events.send(AppEvent::Quit);
                }
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.move_selection_down();
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.move_selection_up();
            }
            KeyCode::Enter => {
                self.open_selected();
            }
            KeyCode::Char('/') => {
                self.mode = AppMode::Search;
                self.search_input.clear();
            }
            KeyCode::Char(':') => {
                self.mode = AppMode::Command;
                self.command_input.clear();
            }
            KeyCode::Char('?') => {
                self.events.send(AppEvent::PushView(ViewKind::Help));
            }
            KeyCode::Char('1') => {
                self.events.send(AppEvent::SwitchView(ViewKind::Feed));
            }
            KeyCode::Char('2') => {
                self.events.send(AppEvent::SwitchView(ViewKind::Explore));
            }
            KeyCode::Char('3') => {
                self.events.send(AppEvent::SwitchView(ViewKind::Stories));
            }
            KeyCode::Char('4') => {
                self.events.send(AppEvent::SwitchView(ViewKind::Notifications));
            }
            KeyCode::Char('5') => {
                self.events.send(AppEvent::SwitchView(ViewKind::Messages));
            }
            KeyCode::Char('6') => {
                self.events.send(AppEvent::SwitchView(ViewKind::Search));
            }
            KeyCode::Char('@') => {
                self.mode = AppMode::Command;
                self.command_input = "user ".to_string();
            }
            KeyCode::Tab if self.current_view() == Some(&ViewKind::Feed) => {
                self.feed.tab = self.feed.tab.toggled();
                self.feed.posts.clear();
                self.events.send(AppEvent::FetchFeed { tab: self.feed.tab });
            }
            KeyCode::Char('l') => self.toggle_like_selected(),
            KeyCode::Char('r') => {
                if self.selected_post().is_some() {
                    self.mode = AppMode::React;
                }
            }
            KeyCode::Char('f') => self.toggle_follow_current(),
            KeyCode::Char('u') => {
                if let Some(author) = self
                    .selected_post()
                    .and_then(|p| p.profiles.as_ref())
                    .map(|a| a.username.clone())
                {
                    self.events.send(AppEvent::FetchProfile { username: author });
                }
            }
            KeyCode::Char('p') => self.start_compose(ComposeTarget::Post),
            KeyCode::Char('c') => self.compose_in_context(),
            KeyCode::Char('S') => self.start_compose(ComposeTarget::Story),
            KeyCode::Char('m') if self.current_view() == Some(&ViewKind::Notifications) => {
                if let Some(n) = self.notifications.get(self.selected_index())
                    && !n.read
                {
                    self.events.send(AppEvent::MarkNotificationRead {
                        notification_id: n.id.clone(),
                    });
                }
            }
            KeyCode::Char('M') if self.current_view() == Some(&ViewKind::Notifications) => {
                self.events.send(AppEvent::MarkAllNotificationsRead);
            }
            KeyCode::Char('d') if self.showing_recent_searches() => {
                if let Some(entry) = self
                    .recent_searches
                    .entries()
                    .get(self.selected_index())
                    .cloned()
                    && let Err(e) = self.recent_searches.remove(&entry)
                {
                    self.status_message = Some(format!("Could not update recent searches: {e}"));
                }
            }
            KeyCode::Char('D') if self.showing_recent_searches() => {
                if let Err(e) = self.recent_searches.clear() {
                    self.status_message = Some(format!("Could not update recent searches: {e}"));
                }
            }
            KeyCode::Char('R') => {
                if let Some(kind) = self.current_view().cloned() {
                    self.refresh_view(&kind);
                }
            }
            KeyCode::Char('e') => {
                self.error_detail = self.last_error.clone();
            }
            _ => {}
        }
    }

    fn handle_command_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = AppMode::Normal;
                self.command_input.clear();
            }
            KeyCode::Enter => {
                self.mode = AppMode::Normal;
                self.execute_command();
            }
            KeyCode::Backspace => {
                self.command_input.pop();
            }
            KeyCode::Char(c) => {
                self.command_input.push(c);
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = AppMode::Normal;
                self.search_input.clear();
            }
            KeyCode::Enter => {
                let query = self.search_input.trim().to_owned();
                if !query.is_empty() {
                    self.run_search(query);
                }
                self.mode = AppMode::Normal;
            }
            KeyCode::Backspace => {
                self.search_input.pop();
            }
            KeyCode::Char(c) => {
                self.search_input.push(c);
            }
            _ => {}
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent) {
        let Some(composer) = self.composer.as_mut() else {
            self.mode = AppMode::Normal;
            return;
        };
        let update = match key.code {
            KeyCode::Esc if !composer.suggestions().is_empty() => {
                composer.dismiss_suggestions();
                None
            }
            KeyCode::Esc => {
                self.composer = None;
                self.mode = AppMode::Normal;
                return;
            }
            KeyCode::Enter => {
                self.submit_composer();
                return;
            }
            KeyCode::Tab => composer.accept_suggestion(),
            KeyCode::Down => {
                composer.select_next();
                None
            }
            KeyCode::Up => {
                composer.select_previous();
                None
            }
            KeyCode::Left => Some(composer.move_left()),
            KeyCode::Right => Some(composer.move_right()),
            KeyCode::Backspace => Some(composer.backspace()),
            KeyCode::Char(c) => Some(composer.insert(c)),
            _ => None,
        };
        if let Some(SuggestionUpdate::Issue(request)) = update {
            self.events.send(AppEvent::FetchSuggestions(request));
        }
    }

    fn handle_react_key(&mut self, key: KeyEvent) {
        self.mode = AppMode::Normal;
        let KeyCode::Char(c) = key.code else {
            return;
        };
        let kind = c
            .to_digit(10)
            .and_then(|d| (d as usize).checked_sub(1))
            .and_then(|i| ReactionKind::ALL.get(i).copied());
        if let Some(kind) = kind {
            self.toggle_reaction_selected(kind);
        }
    }

    fn handle_story_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('n') {
            if let Some(viewer) = self.story_viewer.as_mut() {
                let transition =
                    match next_owner_start(&viewer.stories, viewer.playback.current_index()) {
                        Some(start) => viewer.playback.seek(start),
                        None => viewer.playback.close(),
                    };
                self.after_story_transition(transition);
            }
            return;
        }
        let command = match key.code {
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Enter => StoryCommand::Next,
            KeyCode::Left | KeyCode::Char('h') => StoryCommand::Previous,
            KeyCode::Char(' ') | KeyCode::Char('p') => StoryCommand::TogglePause,
            KeyCode::Esc | KeyCode::Char('q') => StoryCommand::Close,
            _ => return,
        };
        if let Some(viewer) = self.story_viewer.as_mut() {
            let transition = viewer.playback.handle(command);
            self.after_story_transition(transition);
        }
    }

    // -- Command execution --------------------------------------------------

    fn execute_command(&mut self) {
        let input = std::mem::take(&mut self.command_input);
        match command::parse_command(&input) {
            Some(Command::User(username)) => {
                self.events.send(AppEvent::FetchProfile { username });
            }
            Some(Command::Search(query)) => {
                self.run_search(query);
            }
            Some(Command::Tag(tag)) => {
                self.run_search(format!("#{tag}"));
            }
            Some(Command::Open(post_id)) => {
                self.events.send(AppEvent::FetchPost { post_id });
            }
            Some(Command::Feed) => {
                self.events.send(AppEvent::SwitchView(ViewKind::Feed));
            }
            Some(Command::Explore) => {
                self.events.send(AppEvent::SwitchView(ViewKind::Explore));
            }
            Some(Command::Stories) => {
                self.events.send(AppEvent::SwitchView(ViewKind::Stories));
            }
            Some(Command::Story(text)) => {
                self.submit(ComposeTarget::Story, &text);
            }
            Some(Command::Post) => {
                self.start_compose(ComposeTarget::Post);
            }
            Some(Command::Notifications) => {
                self.events.send(AppEvent::SwitchView(ViewKind::Notifications));
            }
            Some(Command::ReadAll) => {
                self.events.send(AppEvent::MarkAllNotificationsRead);
            }
            Some(Command::Messages) => {
                self.events.send(AppEvent::SwitchView(ViewKind::Messages));
            }
            Some(Command::Dm(username)) => {
                self.events.send(AppEvent::OpenConversation { username });
            }
            Some(Command::Help) => {
                self.events.send(AppEvent::PushView(ViewKind::Help));
            }
            Some(Command::Logout) => {
                self.status_message =
                    Some("Run `agoratui logout` to sign out of this device".to_string());
            }
            Some(Command::Quit) => {
                self.events.send(AppEvent::Quit);
            }
            None => {
                self.status_message = Some(format!("Unknown command: {input}"));
            }
        }
    }

    fn run_search(&mut self, query: String) {
        if let Err(e) = self.recent_searches.record(&query) {
            tracing::warn!("could not save recent search: {e}");
        }
        self.search_query = query.clone();
        self.events.send(AppEvent::FetchSearch { query });
        if self.current_view() != Some(&ViewKind::Search) {
            self.events.send(AppEvent::SwitchView(ViewKind::Search));
        }
    }

    // -- Compose ------------------------------------------------------------

    fn start_compose(&mut self, target: ComposeTarget) {
        if self.my_id.is_none() {
            self.status_message = Some("Sign in to publish (agoratui login)".to_string());
            return;
        }
        self.composer = Some(Composer::new(target));
        self.mode = AppMode::Compose;
    }

    fn compose_in_context(&mut self) {
        match self.current_view().cloned() {
            Some(ViewKind::Post(post_id)) => self.start_compose(ComposeTarget::Comment { post_id }),
            Some(ViewKind::Conversation(conversation_id)) => {
                self.start_compose(ComposeTarget::Message { conversation_id });
            }
            _ => self.start_compose(ComposeTarget::Post),
        }
    }

    fn submit_composer(&mut self) {
        let Some(composer) = self.composer.as_ref() else {
            return;
        };
        match composer.validate(self.config.max_post_chars) {
            Ok(content) => {
                self.events.send(AppEvent::Submit {
                    target: composer.target().clone(),
                    content: content.to_owned(),
                });
                self.composer = None;
                self.mode = AppMode::Normal;
            }
            Err(e) => {
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Validate and send content that did not go through the composer.
    fn submit(&mut self, target: ComposeTarget, text: &str) {
        if self.my_id.is_none() {
            self.status_message = Some("Sign in to publish (agoratui login)".to_string());
            return;
        }
        match validate::validate_content(target.label(), text, self.config.max_post_chars) {
            Ok(content) => self.events.send(AppEvent::Submit {
                target,
                content: content.to_owned(),
            }),
            Err(e) => self.status_message = Some(e.to_string()),
        }
    }

    // -- Relations ----------------------------------------------------------

    fn require_me(&mut self) -> Option<String> {
        if self.my_id.is_none() {
            self.status_message = Some("Sign in first (agoratui login)".to_string());
        }
        self.my_id.clone()
    }

    fn toggle_like_selected(&mut self) {
        let Some(post) = self.selected_post().cloned() else {
            return;
        };
        let Some(me) = self.require_me() else {
            return;
        };
        if let Some(pending) = self.relations.toggle_like(&me, &post) {
            self.dispatch_binary_mutation(pending);
        }
    }

    fn toggle_reaction_selected(&mut self, kind: ReactionKind) {
        let Some(post) = self.selected_post().cloned() else {
            return;
        };
        let Some(me) = self.require_me() else {
            return;
        };
        if let Some(pending) = self.relations.toggle_reaction(&me, &post, kind) {
            self.dispatch_reaction_mutation(pending);
        }
    }

    fn toggle_follow_current(&mut self) {
        if !matches!(self.current_view(), Some(ViewKind::Profile(_))) {
            return;
        }
        let Some((user_id, fetched)) = self
            .profile
            .as_ref()
            .map(|p| (p.profile.id.clone(), p.followed))
        else {
            return;
        };
        let Some(me) = self.require_me() else {
            return;
        };
        if me == user_id {
            self.status_message = Some("You cannot follow yourself".to_string());
            return;
        }
        if let Some(pending) = self.relations.toggle_follow(&me, &user_id, fetched) {
            self.dispatch_binary_mutation(pending);
        }
    }

    fn dispatch_binary_mutation(&self, pending: PendingMutation<On>) {
        let client = Arc::clone(&self.api_client);
        let sender = self.events.sender();
        tokio::spawn(async move {
            let api = client.lock().await;
            let result = mapped(api.apply_binary_mutation(&pending).await);
            let _ = sender.send(Event::App(Box::new(AppEvent::MutationCompleted {
                key: pending.key,
                ticket: pending.ticket,
                result,
            })));
        });
    }

    fn dispatch_reaction_mutation(&self, pending: PendingMutation<ReactionKind>) {
        let client = Arc::clone(&self.api_client);
        let sender = self.events.sender();
        tokio::spawn(async move {
            let api = client.lock().await;
            let result = mapped(api.apply_reaction_mutation(&pending).await);
            let _ = sender.send(Event::App(Box::new(AppEvent::MutationCompleted {
                key: pending.key,
                ticket: pending.ticket,
                result,
            })));
        });
    }

    // -- Stories ------------------------------------------------------------

    /// First index of each owner's run in `self.stories`.
    pub fn story_owner_starts(&self) -> Vec<usize> {
        let stories: Vec<_> = self.stories.iter().map(|r| r.story.clone()).collect();
        story::owner_starts(&stories)
    }

    fn open_story_viewer(&mut self, start: usize) {
        let ids = self.stories.iter().map(|r| r.story.id.clone()).collect();
        match StoryPlayback::open(ids, start) {
            Ok(playback) => {
                self.story_sessions += 1;
                let timer = StoryTimer::start(
                    self.events.sender(),
                    self.story_sessions,
                    self.config.story_tick(),
                );
                self.story_viewer = Some(StoryViewer {
                    stories: self.stories.clone(),
                    playback,
                    timer,
                });
            }
            Err(e) => {
                self.status_message = Some(format!("Cannot open stories: {e}"));
            }
        }
    }

    fn close_story_viewer(&mut self) {
        // Dropping the viewer stops its timer.
        self.story_viewer = None;
    }

    fn on_story_tick(&mut self, session: u64) {
        let delta = self.config.story_tick_delta();
        let Some(viewer) = self.story_viewer.as_mut() else {
            return;
        };
        if viewer.timer.session() != session {
            return;
        }
        let transition = viewer.playback.tick(delta);
        self.after_story_transition(transition);
    }

    fn after_story_transition(&mut self, transition: Transition) {
        match transition {
            Transition::Closed => self.close_story_viewer(),
            Transition::Moved { from, to } => {
                if let Some(viewer) = &self.story_viewer {
                    tracing::debug!(from, to, story = viewer.playback.current_id(), "story advanced");
                }
            }
            Transition::Unchanged => {}
        }
    }

    /// Like and reaction state for a post card, optimistic changes applied.
    pub fn engagement(&self, post: &Post) -> Engagement {
        let me = self.my_id.as_deref();
        let (liked, likes) = self.relations.like_view(me, post);
        let (reaction, reactions) = self.relations.reaction_view(me, post);
        Engagement {
            liked,
            likes,
            reaction,
            reactions,
            pending: self.relations.is_pending(RelationKind::Like, &post.id)
                || self.relations.is_pending(RelationKind::Reaction, &post.id),
        }
    }

    // -- Selection helpers --------------------------------------------------

    fn move_selection_down(&mut self) {
        let count = self.current_item_count();
        if let Some(vs) = self.view_stack.last_mut()
            && vs.selected_index + 1 < count
        {
            vs.selected_index += 1;
        }
    }

    fn move_selection_up(&mut self) {
        if let Some(vs) = self.view_stack.last_mut() {
            vs.selected_index = vs.selected_index.saturating_sub(1);
        }
    }

    pub fn showing_recent_searches(&self) -> bool {
        self.current_view() == Some(&ViewKind::Search) && self.search_query.is_empty()
    }

    fn current_item_count(&self) -> usize {
        match self.current_view() {
            Some(ViewKind::Feed) => self.feed.posts.len(),
            Some(ViewKind::Explore) => self.explore.trending.len() + self.explore.suggested.len(),
            Some(ViewKind::Post(_)) => self.post_detail.as_ref().map_or(0, |d| d.comments.len()),
            Some(ViewKind::Profile(_)) => self.profile.as_ref().map_or(0, |p| p.posts.len()),
            Some(ViewKind::Search) if self.search_query.is_empty() => {
                self.recent_searches.entries().len()
            }
            Some(ViewKind::Search) => {
                self.search_results.users.len() + self.search_results.posts.len()
            }
            Some(ViewKind::Stories) => self.story_owner_starts().len(),
            Some(ViewKind::Notifications) => self.notifications.len(),
            Some(ViewKind::Messages) => self.conversations.len(),
            Some(ViewKind::Conversation(_)) => {
                self.conversation.as_ref().map_or(0, |c| c.messages.len())
            }
            Some(ViewKind::Help) | None => 0,
        }
    }

    pub fn selected_index(&self) -> usize {
        self.view_stack.last().map_or(0, |vs| vs.selected_index)
    }

    /// The post that like/react keys act on in the current view.
    pub fn selected_post(&self) -> Option<&Post> {
        let idx = self.selected_index();
        match self.current_view()? {
            ViewKind::Feed => self.feed.posts.get(idx),
            ViewKind::Post(_) => self.post_detail.as_ref().map(|d| &d.post),
            ViewKind::Profile(_) => self.profile.as_ref()?.posts.get(idx),
            ViewKind::Search if !self.search_query.is_empty() => idx
                .checked_sub(self.search_results.users.len())
                .and_then(|i| self.search_results.posts.get(i)),
            _ => None,
        }
    }

    fn open_selected(&mut self) {
        let idx = self.selected_index();
        match self.current_view().cloned() {
            Some(ViewKind::Feed | ViewKind::Profile(_)) => {
                if let Some(post) = self.selected_post() {
                    self.events.send(AppEvent::FetchPost {
                        post_id: post.id.clone(),
                    });
                }
            }
            Some(ViewKind::Explore) => {
                let trending = self.explore.trending.len();
                if let Some(tag) = self.explore.trending.get(idx) {
                    let query = format!("#{}", tag.name);
                    self.run_search(query);
                } else if let Some(user) = self.explore.suggested.get(idx - trending) {
                    self.events.send(AppEvent::FetchProfile {
                        username: user.username.clone(),
                    });
                }
            }
            Some(ViewKind::Search) if self.search_query.is_empty() => {
                if let Some(query) = self.recent_searches.entries().get(idx).cloned() {
                    self.run_search(query);
                }
            }
            Some(ViewKind::Search) => {
                if let Some(user) = self.search_results.users.get(idx) {
                    self.events.send(AppEvent::FetchProfile {
                        username: user.username.clone(),
                    });
                } else if let Some(post) = self.selected_post() {
                    self.events.send(AppEvent::FetchPost {
                        post_id: post.id.clone(),
                    });
                }
            }
            Some(ViewKind::Stories) => {
                if let Some(&start) = self.story_owner_starts().get(idx) {
                    self.open_story_viewer(start);
                }
            }
            Some(ViewKind::Notifications) => {
                if let Some(n) = self.notifications.get(idx)
                    && !n.read
                {
                    self.events.send(AppEvent::MarkNotificationRead {
                        notification_id: n.id.clone(),
                    });
                }
            }
            Some(ViewKind::Messages) => {
                let Some(entry) = self.conversations.get(idx) else {
                    return;
                };
                match entry.partner.as_ref().map(|p| p.username.clone()) {
                    Some(username) => self.events.send(AppEvent::OpenConversation { username }),
                    None => self.status_message = Some("Unknown participant".to_string()),
                }
            }
            _ => {}
        }
    }

    // -- App event handling -------------------------------------------------

    fn report_error(&mut self, context: &str, error: &str) {
        tracing::warn!("{context}: {error}");
        self.status_message = Some(format!("{context} (e: details)"));
        self.last_error = Some(format!("{context}\n\n{error}"));
    }

    fn observe_posts<'a>(&mut self, posts: impl IntoIterator<Item = &'a Post>) {
        let Some(me) = self.my_id.clone() else {
            return;
        };
        for post in posts {
            self.relations.observe_post(&me, post);
        }
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            // Navigation
            AppEvent::Quit => {
                self.running = false;
            }
            AppEvent::PushView(kind) => {
                self.push_view(kind);
            }
            AppEvent::PopView => {
                self.pop_view();
            }
            AppEvent::SwitchView(kind) => {
                self.status_message = None;
                // Replace the root view or push if stack is deeper.
                if self.view_stack.len() <= 1 {
                    self.view_stack.clear();
                }
                self.push_view(kind.clone());
                self.fetch_for_view(&kind);
            }

            // Backend request triggers -> dispatch to async tasks.
            ref evt @ (AppEvent::FetchFeed { .. }
            | AppEvent::FetchExplore
            | AppEvent::FetchPost { .. }
            | AppEvent::FetchProfile { .. }
            | AppEvent::FetchSearch { .. }
            | AppEvent::FetchStories
            | AppEvent::FetchNotifications
            | AppEvent::FetchConversations
            | AppEvent::OpenConversation { .. }
            | AppEvent::FetchMessages { .. }
            | AppEvent::MarkNotificationRead { .. }
            | AppEvent::MarkAllNotificationsRead
            | AppEvent::Submit { .. }) => {
                self.loading = true;
                if let AppEvent::FetchFeed { .. } = evt {
                    self.feed.loading = true;
                }
                self.dispatch_api_request(evt.clone());
            }
            // Background requests that should not flash the loading marker.
            ref evt @ (AppEvent::FetchUnreadCount | AppEvent::FetchSuggestions(_)) => {
                self.dispatch_api_request(evt.clone());
            }

            // Backend results
            AppEvent::FeedLoaded { tab, result } => {
                self.loading = false;
                self.feed.loading = false;
                if tab != self.feed.tab {
                    return;
                }
                match result {
                    Ok(posts) => {
                        self.observe_posts(&posts);
                        self.feed.posts = posts;
                    }
                    Err(e) => self.report_error("Error loading feed", &e),
                }
            }
            AppEvent::ExploreLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(data) => {
                        self.observe_posts(&data.recent_posts);
                        self.explore = data;
                    }
                    Err(e) => self.report_error("Error loading explore", &e),
                }
            }
            AppEvent::PostLoaded(result) => {
                self.loading = false;
                match *result {
                    Ok(detail) => {
                        self.observe_posts([&detail.post]);
                        let view = ViewKind::Post(detail.post.id.clone());
                        self.post_detail = Some(detail);
                        if self.current_view() != Some(&view) {
                            self.push_view(view);
                        }
                    }
                    Err(e) => self.report_error("Post not found", &e),
                }
            }
            AppEvent::ProfileLoaded(result) => {
                self.loading = false;
                match *result {
                    Ok(data) => {
                        self.observe_posts(&data.posts);
                        if let Some(me) = self.my_id.clone() {
                            self.relations
                                .observe_follow(&me, &data.profile.id, data.followed);
                        }
                        let view = ViewKind::Profile(data.profile.username.clone());
                        self.profile = Some(data);
                        if self.current_view() != Some(&view) {
                            self.push_view(view);
                        }
                    }
                    Err(e) => self.report_error("User not found", &e),
                }
            }
            AppEvent::SearchLoaded { query, result } => {
                self.loading = false;
                if query != self.search_query {
                    tracing::debug!(%query, "stale search results dropped");
                    return;
                }
                match result {
                    Ok(results) => {
                        self.observe_posts(&results.posts);
                        self.search_results = results;
                        if let Some(vs) = self.view_stack.last_mut() {
                            vs.selected_index = 0;
                        }
                    }
                    Err(e) => self.report_error("Error searching", &e),
                }
            }
            AppEvent::StoriesLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(rows) => self.stories = order_story_rows(rows, Utc::now()),
                    Err(e) => self.report_error("Error loading stories", &e),
                }
            }
            AppEvent::NotificationsLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(list) => {
                        self.unread_count = list.iter().filter(|n| !n.read).count() as u64;
                        self.notifications = list;
                    }
                    Err(e) => self.report_error("Error loading notifications", &e),
                }
            }
            AppEvent::UnreadCountLoaded(result) => match result {
                Ok(count) => self.unread_count = count,
                Err(e) => tracing::warn!("unread count refresh failed: {e}"),
            },
            AppEvent::NotificationsMarked(result) => {
                self.loading = false;
                match result {
                    Ok(Some(id)) => {
                        if let Some(n) = self.notifications.iter_mut().find(|n| n.id == id)
                            && !n.read
                        {
                            n.read = true;
                            self.unread_count = self.unread_count.saturating_sub(1);
                        }
                    }
                    Ok(None) => {
                        self.notifications.iter_mut().for_each(|n| n.read = true);
                        self.unread_count = 0;
                    }
                    Err(e) => self.report_error("Could not mark notifications read", &e),
                }
            }
            AppEvent::ConversationsLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(list) => self.conversations = list,
                    Err(e) => self.report_error("Error loading conversations", &e),
                }
            }
            AppEvent::ConversationOpened(result) => {
                self.loading = false;
                match *result {
                    Ok(thread) => {
                        let view = ViewKind::Conversation(thread.conversation.id.clone());
                        self.conversation = Some(thread);
                        if self.current_view() != Some(&view) {
                            self.push_view(view);
                        }
                    }
                    Err(e) => self.report_error("Could not open conversation", &e),
                }
            }
            AppEvent::MessagesLoaded {
                conversation_id,
                result,
            } => {
                self.loading = false;
                match result {
                    Ok(messages) => {
                        if let Some(thread) = self.conversation.as_mut()
                            && thread.conversation.id == conversation_id
                        {
                            thread.messages = messages;
                        }
                    }
                    Err(e) => self.report_error("Error loading messages", &e),
                }
            }
            AppEvent::SuggestionsLoaded { id, result } => match result {
                Ok(tags) => {
                    if let Some(composer) = self.composer.as_mut() {
                        composer.receive_suggestions(id, tags);
                    }
                }
                Err(e) => tracing::warn!("hashtag suggestions failed: {e}"),
            },
            AppEvent::MutationCompleted {
                key,
                ticket,
                result,
            } => {
                if let Some(notice) = self.relations.complete(&key, ticket, result) {
                    tracing::warn!("{notice}");
                    self.status_message = Some(format!("{notice} (e: details)"));
                    self.last_error = Some(notice);
                }
            }
            AppEvent::Submitted { target, result } => {
                self.loading = false;
                match result {
                    Ok(()) => {
                        self.status_message = Some(format!("Published {}", target.label()));
                        match target {
                            ComposeTarget::Post => self.events.send(AppEvent::FetchFeed {
                                tab: self.feed.tab,
                            }),
                            ComposeTarget::Comment { post_id } => {
                                self.events.send(AppEvent::FetchPost { post_id });
                            }
                            ComposeTarget::Story => self.events.send(AppEvent::FetchStories),
                            ComposeTarget::Message { conversation_id } => {
                                self.events.send(AppEvent::FetchMessages { conversation_id });
                            }
                        }
                    }
                    Err(e) => self.report_error(&format!("Could not publish {}", target.label()), &e),
                }
            }

            // Timers
            AppEvent::StoryTick { session } => self.on_story_tick(session),
        }
    }

    // -- API dispatch -------------------------------------------------------

    fn dispatch_api_request(&self, event: AppEvent) {
        let client = Arc::clone(&self.api_client);
        let sender = self.events.sender();
        let page_size = self.config.default_page_size;
        let suggestion_limit = self.config.suggestion_limit;
        let story_lifetime = self.config.story_lifetime();

        tokio::spawn(async move {
            let send = |event: AppEvent| {
                let _ = sender.send(Event::App(Box::new(event)));
            };
            let mut guard = client.lock().await;
            if let Err(e) = guard.refresh_if_needed().await {
                tracing::warn!("session refresh failed: {e}");
            }
            let api = &*guard;

            match event {
                AppEvent::FetchFeed { tab } => {
                    let result = mapped(api.get_feed(tab, page_size).await);
                    send(AppEvent::FeedLoaded { tab, result });
                }
                AppEvent::FetchExplore => {
                    let result = async {
                        Ok::<_, ApiClientError>(ExploreData {
                            trending: api.trending_hashtags(10).await?,
                            suggested: api.suggested_users(10).await?,
                            recent_posts: api
                                .get_recent_posts(Utc::now() - chrono::Duration::days(7), page_size)
                                .await?,
                        })
                    }
                    .await;
                    send(AppEvent::ExploreLoaded(mapped(result)));
                }
                AppEvent::FetchPost { post_id } => {
                    let result = async {
                        Ok::<_, ApiClientError>(PostDetail {
                            post: api.get_post(&post_id).await?,
                            comments: api.get_comments(&post_id).await?,
                        })
                    }
                    .await;
                    send(AppEvent::PostLoaded(Box::new(mapped(result))));
                }
                AppEvent::FetchProfile { username } => {
                    let result = fetch_profile(api, &username, page_size).await;
                    send(AppEvent::ProfileLoaded(Box::new(mapped(result))));
                }
                AppEvent::FetchSearch { query } => {
                    let result = async {
                        let users = if query.starts_with('#') {
                            Vec::new()
                        } else {
                            api.search_users(&query, page_size).await?
                        };
                        Ok::<_, ApiClientError>(SearchResults {
                            users,
                            posts: api.search_posts(&query, page_size).await?,
                        })
                    }
                    .await;
                    send(AppEvent::SearchLoaded {
                        query,
                        result: mapped(result),
                    });
                }
                AppEvent::FetchStories => {
                    let result = mapped(api.get_active_stories(Utc::now()).await);
                    send(AppEvent::StoriesLoaded(result));
                }
                AppEvent::FetchNotifications => {
                    let result = mapped(api.get_notifications(page_size).await);
                    send(AppEvent::NotificationsLoaded(result));
                }
                AppEvent::FetchUnreadCount => {
                    let result = mapped(api.unread_notification_count().await);
                    send(AppEvent::UnreadCountLoaded(result));
                }
                AppEvent::MarkNotificationRead { notification_id } => {
                    let result = api
                        .mark_notification_read(&notification_id)
                        .await
                        .map(|()| Some(notification_id));
                    send(AppEvent::NotificationsMarked(mapped(result)));
                }
                AppEvent::MarkAllNotificationsRead => {
                    let result = api.mark_all_notifications_read().await.map(|()| None);
                    send(AppEvent::NotificationsMarked(mapped(result)));
                }
                AppEvent::FetchConversations => {
                    let result = fetch_conversations(api).await;
                    send(AppEvent::ConversationsLoaded(mapped(result)));
                }
                AppEvent::OpenConversation { username } => {
                    let result = async {
                        let partner = api.get_profile_by_username(&username).await?;
                        let conversation = api.find_or_create_conversation(&partner.id).await?;
                        let messages = api.get_messages(&conversation.id).await?;
                        Ok::<_, ApiClientError>(ConversationThread {
                            conversation,
                            partner,
                            messages,
                        })
                    }
                    .await;
                    send(AppEvent::ConversationOpened(Box::new(mapped(result))));
                }
                AppEvent::FetchMessages { conversation_id } => {
                    let result = mapped(api.get_messages(&conversation_id).await);
                    send(AppEvent::MessagesLoaded {
                        conversation_id,
                        result,
                    });
                }
                AppEvent::FetchSuggestions(request) => {
                    let result = mapped(api.suggest_hashtags(&request.query, suggestion_limit).await);
                    send(AppEvent::SuggestionsLoaded {
                        id: request.id,
                        result,
                    });
                }
                AppEvent::Submit { target, content } => {
                    let result = match &target {
                        ComposeTarget::Post => api.create_post(&content).await.map(|_| ()),
                        ComposeTarget::Comment { post_id } => api.add_comment(post_id, &content).await,
                        ComposeTarget::Story => api
                            .create_story(Some(&content), None, story_lifetime)
                            .await
                            .map(|_| ()),
                        ComposeTarget::Message { conversation_id } => {
                            api.send_message(conversation_id, &content).await
                        }
                    };
                    send(AppEvent::Submitted {
                        target,
                        result: mapped(result),
                    });
                }
                _ => {
                    // Not a backend request event -- ignore.
                }
            }
        });
    }

    // -- Helpers ------------------------------------------------------------

    fn fetch_for_view(&mut self, kind: &ViewKind) {
        match kind {
            ViewKind::Feed if self.feed.posts.is_empty() => {
                self.events.send(AppEvent::FetchFeed { tab: self.feed.tab });
            }
            ViewKind::Explore | ViewKind::Notifications | ViewKind::Messages | ViewKind::Stories => {
                self.refresh_view(kind);
            }
            _ => {}
        }
    }

    fn refresh_view(&mut self, kind: &ViewKind) {
        match kind {
            ViewKind::Feed => self.events.send(AppEvent::FetchFeed { tab: self.feed.tab }),
            ViewKind::Explore => self.events.send(AppEvent::FetchExplore),
            ViewKind::Post(post_id) => self.events.send(AppEvent::FetchPost {
                post_id: post_id.clone(),
            }),
            ViewKind::Profile(username) => self.events.send(AppEvent::FetchProfile {
                username: username.clone(),
            }),
            ViewKind::Search if !self.search_query.is_empty() => {
                self.events.send(AppEvent::FetchSearch {
                    query: self.search_query.clone(),
                });
            }
            ViewKind::Stories => self.events.send(AppEvent::FetchStories),
            ViewKind::Notifications => self.events.send(AppEvent::FetchNotifications),
            ViewKind::Messages => self.events.send(AppEvent::FetchConversations),
            ViewKind::Conversation(conversation_id) => self.events.send(AppEvent::FetchMessages {
                conversation_id: conversation_id.clone(),
            }),
            ViewKind::Search | ViewKind::Help => {}
        }
    }
}

async fn fetch_profile(
    api: &BackendClient,
    username: &str,
    page_size: u32,
) -> Result<ProfileData, ApiClientError> {
    let profile = api.get_profile_by_username(username).await?;
    let posts = api.get_user_posts(&profile.id, page_size).await?;
    let followers = api.follower_count(&profile.id).await?;
    let following = api.following_count(&profile.id).await?;
    let followed = match api.my_id() {
        Ok(me) if me != profile.id => api.is_following(&profile.id).await?,
        _ => None,
    };
    Ok(ProfileData {
        profile,
        posts,
        followers,
        following,
        followed,
    })
}

async fn fetch_conversations(api: &BackendClient) -> Result<Vec<ConversationEntry>, ApiClientError> {
    let me = api.my_id()?.to_owned();
    let conversations = api.get_conversations().await?;
    let others: Vec<String> = conversations.iter().map(|c| c.other(&me).to_owned()).collect();
    let profiles = api.get_profiles(&others).await?;
    Ok(conversations
        .into_iter()
        .map(|conversation| {
            let partner = profiles
                .iter()
                .find(|p| p.id == conversation.other(&me))
                .cloned();
            ConversationEntry {
                conversation,
                partner,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::api::types::{Profile, ReactionRef, UserRef};
    use crate::auth::credentials::BackendCredentials;
    use crate::interaction::story::Story;
    use crate::recent::MemoryStore;

    fn test_app() -> App {
        let creds = BackendCredentials {
            url: "http://localhost:54321".into(),
            anon_key: "anon".into(),
        };
        App::new(
            AppConfig::default(),
            BackendClient::new(creds, None),
            RecentSearches::load(Box::new(MemoryStore::default()), 5),
        )
    }

    fn story_row(id: &str, owner: &str) -> StoryRow {
        let now = Utc::now();
        StoryRow {
            story: Story {
                id: id.into(),
                owner_user_id: owner.into(),
                created_at: now,
                expires_at: now + chrono::Duration::hours(24),
                media_ref: None,
                text_content: None,
            },
            profiles: None,
        }
    }

    fn post(id: &str, likers: &[&str], reactions: &[(&str, ReactionKind)]) -> Post {
        Post {
            id: id.into(),
            user_id: "author".into(),
            content: "hello".into(),
            image_url: None,
            video_url: None,
            created_at: None,
            profiles: None,
            likes: likers.iter().map(|u| UserRef { user_id: (*u).into() }).collect(),
            reactions: reactions
                .iter()
                .map(|(u, k)| ReactionRef {
                    user_id: (*u).into(),
                    reaction_type: *k,
                })
                .collect(),
            comments: Vec::new(),
        }
    }

    #[test]
    fn like_count_follows_optimistic_state() {
        let mut relations = Relations::default();
        let p = post("p1", &["u2"], &[]);
        relations.observe_post("me", &p);

        let pending = relations.toggle_like("me", &p).unwrap();
        let (liked, count) = relations.like_view(Some("me"), &p);
        assert_eq!(liked, Some(On));
        assert_eq!(count.total(), 2);
        assert!(relations.is_pending(RelationKind::Like, "p1"));

        // A second press while in flight is ignored.
        assert!(relations.toggle_like("me", &p).is_none());

        let notice = relations.complete(&pending.key, pending.ticket, Err(Arc::new("offline".into())));
        assert_eq!(notice.as_deref(), Some("Could not update like: offline"));
        let (liked, count) = relations.like_view(Some("me"), &p);
        assert_eq!(liked, None);
        assert_eq!(count.total(), 1);
    }

    #[test]
    fn replacing_a_reaction_moves_the_count() {
        let mut relations = Relations::default();
        let p = post("p1", &[], &[("me", ReactionKind::Love), ("u2", ReactionKind::Love)]);
        relations.observe_post("me", &p);

        let pending = relations.toggle_reaction("me", &p, ReactionKind::Wow).unwrap();
        assert_eq!(relations.complete(&pending.key, pending.ticket, Ok(())), None);

        let (mine, counts) = relations.reaction_view(Some("me"), &p);
        assert_eq!(mine, Some(ReactionKind::Wow));
        assert_eq!(counts.get(ReactionKind::Love), 1);
        assert_eq!(counts.get(ReactionKind::Wow), 1);
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn refetch_reconciles_once_settled() {
        let mut relations = Relations::default();
        let before = post("p1", &[], &[]);
        relations.observe_post("me", &before);
        let pending = relations.toggle_like("me", &before).unwrap();

        // Data fetched mid-flight does not override the optimistic value.
        relations.observe_post("me", &before);
        assert_eq!(relations.like_view(Some("me"), &before).0, Some(On));

        relations.complete(&pending.key, pending.ticket, Ok(()));
        let after = post("p1", &["me"], &[]);
        relations.observe_post("me", &after);
        let (liked, count) = relations.like_view(Some("me"), &after);
        assert_eq!(liked, Some(On));
        assert_eq!(count.total(), 1);
    }

    #[test]
    fn follow_count_adjusts_and_rolls_back() {
        let mut relations = Relations::default();
        let data = ProfileData {
            profile: Profile {
                id: "u2".into(),
                username: "omar".into(),
                full_name: None,
                bio: None,
                avatar_url: None,
                created_at: None,
            },
            posts: Vec::new(),
            followers: 3,
            following: 1,
            followed: None,
        };
        relations.observe_follow("me", "u2", None);
        let pending = relations.toggle_follow("me", "u2", None).unwrap();
        assert_eq!(relations.follow_view(&data), (Some(On), 4));

        relations.complete(&pending.key, pending.ticket, Err(Arc::new("denied".into())));
        assert_eq!(relations.follow_view(&data), (None, 3));
    }

    #[test]
    fn stale_ticket_leaves_state_alone() {
        let mut relations = Relations::default();
        let p = post("p1", &[], &[]);
        let first = relations.toggle_like("me", &p).unwrap();
        relations.complete(&first.key, first.ticket, Ok(()));
        let second = relations.toggle_like("me", &p).unwrap();

        assert_eq!(
            relations.complete(&first.key, first.ticket, Err(Arc::new("late".into()))),
            None
        );
        assert!(relations.is_pending(RelationKind::Like, "p1"));
        assert_eq!(relations.like_view(Some("me"), &p).0, None);
        relations.complete(&second.key, second.ticket, Ok(()));
        assert!(!relations.is_pending(RelationKind::Like, "p1"));
    }

    #[test]
    fn story_rows_follow_playback_order() {
        let now = Utc::now();
        let row = |id: &str, owner: &str, age_min: i64| StoryRow {
            story: Story {
                id: id.into(),
                owner_user_id: owner.into(),
                created_at: now - chrono::Duration::minutes(age_min),
                expires_at: now - chrono::Duration::minutes(age_min) + chrono::Duration::hours(24),
                media_ref: None,
                text_content: Some(id.into()),
            },
            profiles: None,
        };
        let rows = vec![
            row("b2", "bob", 5),
            row("a1", "amal", 30),
            row("b1", "bob", 60),
            row("old", "amal", 60 * 25),
        ];
        let ordered: Vec<String> = order_story_rows(rows, now)
            .into_iter()
            .map(|r| r.story.id)
            .collect();
        assert_eq!(ordered, vec!["b1", "b2", "a1"]);
    }

    // The event task is spawned but never polled: the test never yields.
    #[tokio::test]
    async fn failed_mutation_reaches_error_popup() {
        let mut app = test_app();
        app.report_error("Could not load feed", "timeout");

        let p = post("p1", &[], &[]);
        let pending = app.relations.toggle_like("me", &p).unwrap();
        app.handle_app_event(AppEvent::MutationCompleted {
            key: pending.key,
            ticket: pending.ticket,
            result: Err(Arc::new("offline".into())),
        });

        assert_eq!(app.last_error.as_deref(), Some("Could not update like: offline"));
        assert_eq!(
            app.status_message.as_deref(),
            Some("Could not update like: offline (e: details)")
        );

        app.handle_normal_key(KeyEvent::from(KeyCode::Char('e')));
        assert_eq!(app.error_detail.as_deref(), Some("Could not update like: offline"));
    }

    #[test]
    fn next_owner_skips_rest_of_current_owner() {
        let rows = vec![
            story_row("a1", "amal"),
            story_row("a2", "amal"),
            story_row("b1", "bob"),
            story_row("c1", "carla"),
        ];
        assert_eq!(next_owner_start(&rows, 0), Some(2));
        assert_eq!(next_owner_start(&rows, 1), Some(2));
        assert_eq!(next_owner_start(&rows, 2), Some(3));
        assert_eq!(next_owner_start(&rows, 3), None);
    }
}
