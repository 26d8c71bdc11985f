pub mod command_bar;
pub mod compose;
pub mod error_popup;
pub mod explore;
pub mod feed;
pub mod help;
pub mod input;
pub mod messages;
pub mod notifications;
pub mod post;
pub mod post_detail;
pub mod post_list;
pub mod profile;
pub mod search;
pub mod status_bar;
pub mod stories;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};

use crate::app::{App, AppMode};
use crate::event::ViewKind;

use command_bar::CommandBar;
use compose::ComposePanel;
use error_popup::ErrorPopup;
use explore::ExploreView;
use feed::FeedView;
use help::HelpView;
use messages::{ConversationView, ConversationsView};
use notifications::NotificationsView;
use post_detail::PostDetailView;
use profile::ProfileView;
use search::SearchView;
use status_bar::StatusBar;
use stories::{StoriesView, StoryViewerOverlay};

pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Layout: main content + status bar + optional command bar
    let show_command_bar = CommandBar::is_visible(&app.mode);
    let bottom_height = if show_command_bar { 2 } else { 1 };

    let [main_area, bottom_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(bottom_height)]).areas(area);

    if show_command_bar {
        let [status_area, cmd_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(bottom_area);
        frame.render_widget(StatusBar::new(app), status_area);
        frame.render_widget(CommandBar::new(app), cmd_area);
    } else {
        frame.render_widget(StatusBar::new(app), bottom_area);
    }

    match app.current_view() {
        Some(ViewKind::Help) => {
            // Render the view underneath first, then overlay help.
            if let Some(prev) = app.view_stack.iter().rev().nth(1) {
                render_view(frame, app, &prev.kind, main_area);
            }
            frame.render_widget(HelpView::new(), main_area);
        }
        Some(kind) => render_view(frame, app, kind, main_area),
        None => frame.render_widget(FeedView::new(app), main_area),
    }

    // Compose panel docks to the bottom of the content area.
    if app.mode == AppMode::Compose
        && let Some(composer) = app.composer.as_ref()
    {
        let panel = ComposePanel::new(composer, app.config.max_post_chars);
        let height = panel.height().min(main_area.height);
        let panel_area = Rect::new(
            main_area.x,
            main_area.y + main_area.height - height,
            main_area.width,
            height,
        );
        frame.render_widget(panel, panel_area);
    }

    if let Some(viewer) = app.story_viewer.as_ref() {
        frame.render_widget(StoryViewerOverlay::new(viewer), main_area);
    }

    // Error detail popup overlay (renders on top of everything)
    if let Some(ref detail) = app.error_detail {
        frame.render_widget(ErrorPopup::new(detail), frame.area());
    }
}

fn render_view(frame: &mut Frame, app: &App, kind: &ViewKind, area: Rect) {
    match kind {
        ViewKind::Feed => frame.render_widget(FeedView::new(app), area),
        ViewKind::Explore => frame.render_widget(ExploreView::new(app), area),
        ViewKind::Post(_) => frame.render_widget(PostDetailView::new(app), area),
        ViewKind::Profile(_) => frame.render_widget(ProfileView::new(app), area),
        ViewKind::Search => frame.render_widget(SearchView::new(app), area),
        ViewKind::Notifications => frame.render_widget(NotificationsView::new(app), area),
        ViewKind::Messages => frame.render_widget(ConversationsView::new(app), area),
        ViewKind::Conversation(_) => frame.render_widget(ConversationView::new(app), area),
        ViewKind::Stories => frame.render_widget(StoriesView::new(app), area),
        ViewKind::Help => {}
    }
}
