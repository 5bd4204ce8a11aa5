//! The browse shell: screens, key handling, and drawing.
//!
//! One synchronous loop owns the terminal: drain fetch results, drop the
//! expired toast, draw, then poll for a key with a short timeout. All
//! network work happens in [`super::data`]; nothing here blocks.
//!
//! Screens mirror the web client: a login/register pair shown until a
//! session exists, then a header, a collapsible sidebar, and one of the
//! dashboard, events, clubs, tickets, or profile routes, with event and
//! club detail screens stacked on top.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use clubhub_api::validate::{validate_registration, validate_review};
use clubhub_api::{
    ApiError, Club, ClubMember, Event, EventReview, QueryCache, RegisterStudent, SessionManager,
    Student, Subscription, Ticket,
};
use crossterm::{
    event::{self, Event as TermEvent, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use crate::commands::matches_search;
use crate::output::{format_availability, format_date, format_money, format_price, stars};

use super::data::{FetchResult, Fetcher, QueryState};

const TOAST_TTL: Duration = Duration::from_secs(4);
const SIDEBAR_WIDTH: u16 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Login,
    Register,
    Browse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Dashboard,
    Events,
    Clubs,
    Tickets,
    Profile,
}

const ROUTES: [Route; 5] = [
    Route::Dashboard,
    Route::Events,
    Route::Clubs,
    Route::Tickets,
    Route::Profile,
];

impl Route {
    fn title(self) -> &'static str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::Events => "Events",
            Route::Clubs => "Clubs",
            Route::Tickets => "My Tickets",
            Route::Profile => "Profile",
        }
    }

    fn index(self) -> usize {
        match self {
            Route::Dashboard => 0,
            Route::Events => 1,
            Route::Clubs => 2,
            Route::Tickets => 3,
            Route::Profile => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventFilter {
    All,
    Free,
    Paid,
}

impl EventFilter {
    fn next(self) -> Self {
        match self {
            EventFilter::All => EventFilter::Free,
            EventFilter::Free => EventFilter::Paid,
            EventFilter::Paid => EventFilter::All,
        }
    }

    fn label(self) -> &'static str {
        match self {
            EventFilter::All => "all",
            EventFilter::Free => "free",
            EventFilter::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToastKind {
    Success,
    Error,
}

/// A transient notice in the bottom-right corner.
struct Toast {
    message: String,
    kind: ToastKind,
    until: Instant,
}

#[derive(Default)]
struct LoginForm {
    username: String,
    password: String,
    focus: usize,
}

#[derive(Default)]
struct RegisterForm {
    username: String,
    email: String,
    password: String,
    password2: String,
    faculty: String,
    speciality: String,
    focus: usize,
}

const REGISTER_LABELS: [&str; 6] = [
    "Username",
    "Email",
    "Password",
    "Confirm password",
    "Faculty (optional)",
    "Speciality (optional)",
];

impl RegisterForm {
    fn field(&self, index: usize) -> &str {
        match index {
            0 => &self.username,
            1 => &self.email,
            2 => &self.password,
            3 => &self.password2,
            4 => &self.faculty,
            _ => &self.speciality,
        }
    }

    fn field_mut(&mut self, index: usize) -> &mut String {
        match index {
            0 => &mut self.username,
            1 => &mut self.email,
            2 => &mut self.password,
            3 => &mut self.password2,
            4 => &mut self.faculty,
            _ => &mut self.speciality,
        }
    }

    fn to_payload(&self) -> RegisterStudent {
        RegisterStudent {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            password2: self.password2.clone(),
            faculty: optional(&self.faculty),
            speciality: optional(&self.speciality),
        }
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

struct ReviewForm {
    event: i64,
    rating: u8,
    comment: String,
}

/// All state behind the browse shell.
pub struct App {
    fetcher: Fetcher,
    session: Arc<SessionManager>,
    cache: Arc<QueryCache>,
    rx: mpsc::Receiver<FetchResult>,

    view: View,
    route: Route,
    booting: bool,
    sidebar: bool,
    should_quit: bool,

    user: Option<Student>,
    toast: Option<Toast>,

    login: LoginForm,
    register: RegisterForm,

    events: QueryState<Vec<Event>>,
    upcoming: QueryState<Vec<Event>>,
    clubs: QueryState<Vec<Club>>,
    tickets: QueryState<Vec<Ticket>>,
    memberships: QueryState<Vec<ClubMember>>,
    subscriptions: QueryState<Vec<Subscription>>,

    event_open: Option<i64>,
    event_detail: QueryState<Event>,
    event_reviews: QueryState<Vec<EventReview>>,
    club_open: Option<i64>,
    club_detail: QueryState<Club>,
    club_events: QueryState<Vec<Event>>,
    club_members: QueryState<Vec<ClubMember>>,

    events_cursor: usize,
    clubs_cursor: usize,
    tickets_cursor: usize,
    club_events_cursor: usize,
    event_search: String,
    club_search: String,
    searching: bool,
    event_filter: EventFilter,
    upcoming_only: bool,

    review_form: Option<ReviewForm>,

    // In-flight mutations; block double submission from held keys
    login_pending: bool,
    register_pending: bool,
    purchase_pending: bool,
    join_pending: bool,
    subscribe_pending: bool,
    review_pending: bool,
    cancel_pending: Option<i64>,
}

impl App {
    pub fn new(
        fetcher: Fetcher,
        session: Arc<SessionManager>,
        cache: Arc<QueryCache>,
        rx: mpsc::Receiver<FetchResult>,
    ) -> Self {
        Self {
            fetcher,
            session,
            cache,
            rx,
            view: View::Login,
            route: Route::Dashboard,
            booting: true,
            sidebar: true,
            should_quit: false,
            user: None,
            toast: None,
            login: LoginForm::default(),
            register: RegisterForm::default(),
            events: QueryState::default(),
            upcoming: QueryState::default(),
            clubs: QueryState::default(),
            tickets: QueryState::default(),
            memberships: QueryState::default(),
            subscriptions: QueryState::default(),
            event_open: None,
            event_detail: QueryState::default(),
            event_reviews: QueryState::default(),
            club_open: None,
            club_detail: QueryState::default(),
            club_events: QueryState::default(),
            club_members: QueryState::default(),
            events_cursor: 0,
            clubs_cursor: 0,
            tickets_cursor: 0,
            club_events_cursor: 0,
            event_search: String::new(),
            club_search: String::new(),
            searching: false,
            event_filter: EventFilter::All,
            upcoming_only: false,
            review_form: None,
            login_pending: false,
            register_pending: false,
            purchase_pending: false,
            join_pending: false,
            subscribe_pending: false,
            review_pending: false,
            cancel_pending: None,
        }
    }

    /// Run the main loop until the user quits.
    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.fetcher.initialize_session();

        while !self.should_quit {
            self.drain_results();
            self.expire_toast();

            terminal.draw(|f| self.draw(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let TermEvent::Key(key) = event::read()? {
                    self.handle_key(key.code, key.modifiers);
                }
            }
        }

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        Ok(())
    }

    fn drain_results(&mut self) {
        while let Ok(result) = self.rx.try_recv() {
            self.apply(result);
        }
    }

    fn expire_toast(&mut self) {
        if let Some(toast) = &self.toast {
            if Instant::now() >= toast.until {
                self.toast = None;
            }
        }
    }

    fn toast_success(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            kind: ToastKind::Success,
            until: Instant::now() + TOAST_TTL,
        });
    }

    fn toast_error(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            kind: ToastKind::Error,
            until: Instant::now() + TOAST_TTL,
        });
    }

    // ------------------------------------------------------------------
    // Fetch results
    // ------------------------------------------------------------------

    fn apply(&mut self, result: FetchResult) {
        match result {
            FetchResult::Session(user) => {
                self.booting = false;
                match user {
                    Some(user) => {
                        self.user = Some(user);
                        self.view = View::Browse;
                        self.enter_route(self.route);
                    }
                    None => self.view = View::Login,
                }
            }
            FetchResult::LoggedIn(result) => {
                self.login_pending = false;
                match result {
                    Ok(user) => {
                        self.user = Some(user);
                        self.login = LoginForm::default();
                        self.view = View::Browse;
                        self.route = Route::Dashboard;
                        self.enter_route(Route::Dashboard);
                        self.toast_success("Login successful!");
                    }
                    Err(err) => self.toast_error(err.to_string()),
                }
            }
            FetchResult::Registered(result) => {
                self.register_pending = false;
                match result {
                    Ok(user) => {
                        self.login = LoginForm::default();
                        self.login.username = user.username;
                        self.register = RegisterForm::default();
                        self.view = View::Login;
                        self.toast_success("Registration successful! You can now log in.");
                    }
                    Err(err) => self.toast_error(err.to_string()),
                }
            }
            FetchResult::User(result) => match result {
                Ok(user) => self.user = Some(user),
                Err(err) => {
                    // A failed refresh keeps the stale balance on screen
                    if err.is_auth_failure() {
                        self.expire_session();
                    }
                }
            },
            FetchResult::Events(result) => {
                self.events = self.apply_query(result);
            }
            FetchResult::Upcoming(result) => {
                self.upcoming = self.apply_query(result);
            }
            FetchResult::EventDetail(id, result) => {
                if self.event_open == Some(id) {
                    self.event_detail = self.apply_query(result);
                }
            }
            FetchResult::EventReviews(id, result) => {
                if self.event_open == Some(id) {
                    self.event_reviews = self.apply_query(result);
                }
            }
            FetchResult::Clubs(result) => {
                self.clubs = self.apply_query(result);
            }
            FetchResult::ClubDetail(id, result) => {
                if self.club_open == Some(id) {
                    self.club_detail = self.apply_query(result);
                }
            }
            FetchResult::ClubEvents(id, result) => {
                if self.club_open == Some(id) {
                    self.club_events = self.apply_query(result);
                }
            }
            FetchResult::ClubMembers(id, result) => {
                if self.club_open == Some(id) {
                    self.club_members = self.apply_query(result);
                }
            }
            FetchResult::Tickets(result) => {
                self.tickets = self.apply_query(result);
            }
            FetchResult::Memberships(result) => {
                self.memberships = self.apply_query(result);
            }
            FetchResult::Subscriptions(result) => {
                self.subscriptions = self.apply_query(result);
            }
            FetchResult::Purchased(result) => {
                self.purchase_pending = false;
                match result {
                    Ok(ticket) => {
                        self.toast_success("Ticket purchased successfully!");
                        self.cache.invalidate("tickets");
                        self.cache.invalidate("events");
                        self.cache.invalidate("events/upcoming");
                        self.cache.invalidate(&format!("event/{}", ticket.event));
                        self.fetcher.load_tickets();
                        if self.event_open == Some(ticket.event) {
                            self.fetcher.load_event(ticket.event);
                        }
                        self.fetcher.refresh_user();
                    }
                    Err(err) => {
                        tracing::warn!(%err, "ticket purchase failed");
                        if err.is_auth_failure() {
                            self.expire_session();
                        } else {
                            self.toast_error("Failed to purchase ticket. Please try again.");
                        }
                    }
                }
            }
            FetchResult::Cancelled(id, result) => {
                self.cancel_pending = None;
                match result {
                    Ok(()) => {
                        self.toast_success("Ticket cancelled successfully");
                        self.cache.invalidate("tickets");
                        self.cache.invalidate("events");
                        self.cache.invalidate("events/upcoming");
                        self.fetcher.load_tickets();
                        self.fetcher.refresh_user();
                        tracing::debug!(ticket = id, "ticket cancelled");
                    }
                    Err(err) => {
                        tracing::warn!(%err, ticket = id, "ticket cancellation failed");
                        if err.is_auth_failure() {
                            self.expire_session();
                        } else {
                            self.toast_error("Failed to cancel ticket. Please try again.");
                        }
                    }
                }
            }
            FetchResult::Joined(club, result) => {
                self.join_pending = false;
                match result {
                    Ok(_) => {
                        self.toast_success("Successfully joined the club");
                        self.cache.invalidate(&format!("club/{club}/members"));
                        self.cache.invalidate("profile/memberships");
                        if self.club_open == Some(club) {
                            self.fetcher.load_club_members(club);
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%err, club, "club join failed");
                        if err.is_auth_failure() {
                            self.expire_session();
                        } else {
                            self.toast_error("Failed to join club");
                        }
                    }
                }
            }
            FetchResult::Subscribed(club, result) => {
                self.subscribe_pending = false;
                match result {
                    Ok(subscription) => {
                        self.toast_success(format!("Subscribed to {}", subscription.club_name));
                        self.cache.invalidate("profile/subscriptions");
                    }
                    Err(err) => {
                        tracing::warn!(%err, club, "club subscription failed");
                        if err.is_auth_failure() {
                            self.expire_session();
                        } else {
                            self.toast_error("Failed to subscribe. Please try again.");
                        }
                    }
                }
            }
            FetchResult::ReviewPosted(event, result) => {
                self.review_pending = false;
                match result {
                    Ok(_) => {
                        self.toast_success("Review submitted successfully!");
                        self.review_form = None;
                        self.cache.invalidate(&format!("event/{event}/reviews"));
                        if self.event_open == Some(event) {
                            self.fetcher.load_event_reviews(event);
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%err, event, "review submission failed");
                        if err.is_auth_failure() {
                            self.expire_session();
                        } else {
                            self.toast_error("Failed to submit review. Please try again.");
                        }
                    }
                }
            }
        }
    }

    /// Fold a dataset result into view state. Auth failures route back to
    /// the login screen instead of rendering as a dataset error.
    fn apply_query<T>(&mut self, result: Result<T, ApiError>) -> QueryState<T> {
        match result {
            Ok(data) => QueryState::Ready(data),
            Err(err) => {
                if err.is_auth_failure() {
                    self.expire_session();
                }
                QueryState::Failed(err.to_string())
            }
        }
    }

    /// The stored session is gone. Drop everything derived from it and
    /// return to the login screen. Safe to hit repeatedly when several
    /// parallel fetches fail at once.
    fn expire_session(&mut self) {
        if self.view == View::Login {
            return;
        }
        self.session.logout();
        self.cache.clear();
        self.user = None;
        self.reset_data();
        self.view = View::Login;
        self.toast_error("Session expired. Please log in again.");
    }

    fn logout(&mut self) {
        self.session.logout();
        self.cache.clear();
        self.user = None;
        self.reset_data();
        self.login = LoginForm::default();
        self.view = View::Login;
        self.toast_success("You have been logged out");
    }

    fn reset_data(&mut self) {
        self.events = QueryState::Idle;
        self.upcoming = QueryState::Idle;
        self.clubs = QueryState::Idle;
        self.tickets = QueryState::Idle;
        self.memberships = QueryState::Idle;
        self.subscriptions = QueryState::Idle;
        self.event_open = None;
        self.event_detail = QueryState::Idle;
        self.event_reviews = QueryState::Idle;
        self.club_open = None;
        self.club_detail = QueryState::Idle;
        self.club_events = QueryState::Idle;
        self.club_members = QueryState::Idle;
        self.review_form = None;
        self.events_cursor = 0;
        self.clubs_cursor = 0;
        self.tickets_cursor = 0;
        self.club_events_cursor = 0;
    }

    // ------------------------------------------------------------------
    // Navigation and data loading
    // ------------------------------------------------------------------

    /// Switch to a route and load everything it shows. Cached datasets
    /// appear immediately; a refetch always runs in the background.
    fn enter_route(&mut self, route: Route) {
        self.route = route;
        self.event_open = None;
        self.club_open = None;
        self.review_form = None;
        self.searching = false;
        match route {
            Route::Dashboard => {
                self.prime_upcoming();
                self.prime_tickets();
                self.prime_clubs();
            }
            Route::Events => self.prime_events(),
            Route::Clubs => self.prime_clubs(),
            Route::Tickets => self.prime_tickets(),
            Route::Profile => self.prime_profile(),
        }
    }

    fn cycle_route(&mut self, step: isize) {
        let count = ROUTES.len() as isize;
        let next = (self.route.index() as isize + step).rem_euclid(count);
        self.enter_route(ROUTES[next as usize]);
    }

    /// Drop the current route's cache entries and reload.
    fn refresh_route(&mut self) {
        match self.route {
            Route::Dashboard => {
                self.cache.invalidate("events/upcoming");
                self.cache.invalidate("tickets");
                self.cache.invalidate("clubs");
            }
            Route::Events => self.cache.invalidate("events"),
            Route::Clubs => self.cache.invalidate("clubs"),
            Route::Tickets => self.cache.invalidate("tickets"),
            Route::Profile => {
                self.cache.invalidate("profile/memberships");
                self.cache.invalidate("profile/subscriptions");
                self.cache.invalidate("tickets");
            }
        }
        self.enter_route(self.route);
    }

    fn prime_events(&mut self) {
        prime(&self.cache, &mut self.events, "events");
        self.fetcher.load_events();
    }

    fn prime_upcoming(&mut self) {
        prime(&self.cache, &mut self.upcoming, "events/upcoming");
        self.fetcher.load_upcoming();
    }

    fn prime_clubs(&mut self) {
        prime(&self.cache, &mut self.clubs, "clubs");
        self.fetcher.load_clubs();
    }

    fn prime_tickets(&mut self) {
        prime(&self.cache, &mut self.tickets, "tickets");
        self.fetcher.load_tickets();
    }

    fn prime_profile(&mut self) {
        let Some(student) = self.user.as_ref().map(|user| user.id) else {
            return;
        };
        prime(&self.cache, &mut self.memberships, "profile/memberships");
        prime(
            &self.cache,
            &mut self.subscriptions,
            "profile/subscriptions",
        );
        self.fetcher.load_memberships(student);
        self.fetcher.load_subscriptions(student);
        self.prime_tickets();
    }

    fn open_event(&mut self, id: i64) {
        self.event_open = Some(id);
        self.review_form = None;
        open_detail(&self.cache, &mut self.event_detail, &format!("event/{id}"));
        open_detail(
            &self.cache,
            &mut self.event_reviews,
            &format!("event/{id}/reviews"),
        );
        self.fetcher.load_event(id);
        self.fetcher.load_event_reviews(id);
    }

    fn open_club(&mut self, id: i64) {
        self.club_open = Some(id);
        self.club_events_cursor = 0;
        open_detail(&self.cache, &mut self.club_detail, &format!("club/{id}"));
        open_detail(
            &self.cache,
            &mut self.club_events,
            &format!("club/{id}/events"),
        );
        open_detail(
            &self.cache,
            &mut self.club_members,
            &format!("club/{id}/members"),
        );
        self.fetcher.load_club(id);
        self.fetcher.load_club_events(id);
        self.fetcher.load_club_members(id);
    }

    // ------------------------------------------------------------------
    // Key handling
    // ------------------------------------------------------------------

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match code {
                KeyCode::Char('c') => self.should_quit = true,
                KeyCode::Char('b') if self.view == View::Browse => self.sidebar = !self.sidebar,
                KeyCode::Char('l') if self.view == View::Browse => self.logout(),
                KeyCode::Char('r') if self.view == View::Login => self.view = View::Register,
                _ => {}
            }
            return;
        }

        if self.booting {
            return;
        }

        match self.view {
            View::Login => self.handle_login_key(code),
            View::Register => self.handle_register_key(code),
            View::Browse => self.handle_browse_key(code),
        }
    }

    fn handle_login_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.login.focus = (self.login.focus + 1) % 2;
            }
            KeyCode::Enter => self.submit_login(),
            KeyCode::Char(c) => match self.login.focus {
                0 => self.login.username.push(c),
                _ => self.login.password.push(c),
            },
            KeyCode::Backspace => {
                match self.login.focus {
                    0 => self.login.username.pop(),
                    _ => self.login.password.pop(),
                };
            }
            _ => {}
        }
    }

    fn submit_login(&mut self) {
        if self.login_pending {
            return;
        }
        let username = self.login.username.trim().to_string();
        if username.is_empty() || self.login.password.is_empty() {
            self.toast_error("Enter your username and password");
            return;
        }
        self.login_pending = true;
        self.fetcher.login(username, self.login.password.clone());
    }

    fn handle_register_key(&mut self, code: KeyCode) {
        let fields = REGISTER_LABELS.len();
        match code {
            KeyCode::Esc => self.view = View::Login,
            KeyCode::Tab | KeyCode::Down => self.register.focus = (self.register.focus + 1) % fields,
            KeyCode::BackTab | KeyCode::Up => {
                self.register.focus = (self.register.focus + fields - 1) % fields;
            }
            KeyCode::Enter => self.submit_register(),
            KeyCode::Char(c) => {
                let focus = self.register.focus;
                self.register.field_mut(focus).push(c);
            }
            KeyCode::Backspace => {
                let focus = self.register.focus;
                self.register.field_mut(focus).pop();
            }
            _ => {}
        }
    }

    fn submit_register(&mut self) {
        if self.register_pending {
            return;
        }
        let form = self.register.to_payload();
        if let Err(errors) = validate_registration(&form) {
            if let Some(first) = errors.iter().next() {
                self.toast_error(format!("{}: {}", first.field, first.message));
            }
            return;
        }
        self.register_pending = true;
        self.fetcher.register(form);
    }

    fn handle_browse_key(&mut self, code: KeyCode) {
        if self.searching {
            self.handle_search_key(code);
            return;
        }
        if self.review_form.is_some() {
            self.handle_review_key(code);
            return;
        }
        if self.event_open.is_some() {
            self.handle_event_detail_key(code);
            return;
        }
        if self.club_open.is_some() {
            self.handle_club_detail_key(code);
            return;
        }

        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.cycle_route(1),
            KeyCode::BackTab => self.cycle_route(-1),
            KeyCode::Char('1') => self.enter_route(Route::Dashboard),
            KeyCode::Char('2') => self.enter_route(Route::Events),
            KeyCode::Char('3') => self.enter_route(Route::Clubs),
            KeyCode::Char('4') => self.enter_route(Route::Tickets),
            KeyCode::Char('5') => self.enter_route(Route::Profile),
            KeyCode::Char('r') => self.refresh_route(),
            _ => match self.route {
                Route::Events => self.handle_events_key(code),
                Route::Clubs => self.handle_clubs_key(code),
                Route::Tickets => self.handle_tickets_key(code),
                _ => {}
            },
        }
    }

    fn handle_search_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.active_search_mut().clear();
                self.searching = false;
                self.reset_list_cursor();
            }
            KeyCode::Enter => self.searching = false,
            KeyCode::Char(c) => {
                self.active_search_mut().push(c);
                self.reset_list_cursor();
            }
            KeyCode::Backspace => {
                self.active_search_mut().pop();
                self.reset_list_cursor();
            }
            _ => {}
        }
    }

    fn active_search_mut(&mut self) -> &mut String {
        match self.route {
            Route::Clubs => &mut self.club_search,
            _ => &mut self.event_search,
        }
    }

    fn reset_list_cursor(&mut self) {
        match self.route {
            Route::Clubs => self.clubs_cursor = 0,
            _ => self.events_cursor = 0,
        }
    }

    fn handle_events_key(&mut self, code: KeyCode) {
        let len = self.filtered_events().len();
        match code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.events_cursor + 1 < len {
                    self.events_cursor += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.events_cursor = self.events_cursor.saturating_sub(1);
            }
            KeyCode::Char('/') => self.searching = true,
            KeyCode::Char('u') => {
                self.upcoming_only = !self.upcoming_only;
                self.events_cursor = 0;
            }
            KeyCode::Char('f') => {
                self.event_filter = self.event_filter.next();
                self.events_cursor = 0;
            }
            KeyCode::Enter => {
                let selected = self
                    .filtered_events()
                    .get(self.events_cursor.min(len.saturating_sub(1)))
                    .map(|event| event.id);
                if let Some(id) = selected {
                    self.open_event(id);
                }
            }
            _ => {}
        }
    }

    fn handle_clubs_key(&mut self, code: KeyCode) {
        let len = self.filtered_clubs().len();
        match code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.clubs_cursor + 1 < len {
                    self.clubs_cursor += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.clubs_cursor = self.clubs_cursor.saturating_sub(1);
            }
            KeyCode::Char('/') => self.searching = true,
            KeyCode::Enter => {
                let selected = self
                    .filtered_clubs()
                    .get(self.clubs_cursor.min(len.saturating_sub(1)))
                    .map(|club| club.id);
                if let Some(id) = selected {
                    self.open_club(id);
                }
            }
            _ => {}
        }
    }

    fn handle_tickets_key(&mut self, code: KeyCode) {
        let len = self.tickets.data().map_or(0, Vec::len);
        match code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.tickets_cursor + 1 < len {
                    self.tickets_cursor += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.tickets_cursor = self.tickets_cursor.saturating_sub(1);
            }
            KeyCode::Enter => {
                let selected = self.selected_ticket().map(|ticket| ticket.event);
                if let Some(event) = selected {
                    self.open_event(event);
                }
            }
            KeyCode::Char('c') => self.cancel_selected_ticket(),
            _ => {}
        }
    }

    fn selected_ticket(&self) -> Option<&Ticket> {
        let tickets = self.tickets.data()?;
        tickets.get(self.tickets_cursor.min(tickets.len().saturating_sub(1)))
    }

    fn cancel_selected_ticket(&mut self) {
        if self.cancel_pending.is_some() {
            return;
        }
        let Some(id) = self.selected_ticket().map(|ticket| ticket.id) else {
            return;
        };
        self.cancel_pending = Some(id);
        self.fetcher.cancel_ticket(id);
    }

    fn handle_event_detail_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => self.event_open = None,
            KeyCode::Char('p') => self.purchase_selected(),
            KeyCode::Char('w') => self.open_review_form(),
            KeyCode::Char('r') => {
                if let Some(id) = self.event_open {
                    self.cache.invalidate(&format!("event/{id}"));
                    self.cache.invalidate_prefix(&format!("event/{id}/"));
                    self.fetcher.load_event(id);
                    self.fetcher.load_event_reviews(id);
                }
            }
            _ => {}
        }
    }

    /// Buy a ticket for the open event. Mirrors the purchase button rules:
    /// disabled while a purchase is pending and when the event is sold out.
    fn purchase_selected(&mut self) {
        if self.purchase_pending {
            return;
        }
        let Some(student) = self.user.as_ref().map(|user| user.id) else {
            self.toast_error("Please log in to purchase tickets");
            return;
        };
        let Some(event) = self.event_detail.data() else {
            return;
        };
        if event.is_sold_out() {
            self.toast_error("Sold Out");
            return;
        }
        let event = event.id;
        self.purchase_pending = true;
        self.fetcher.purchase(event, student);
    }

    fn open_review_form(&mut self) {
        if let Some(event) = self.event_open {
            self.review_form = Some(ReviewForm {
                event,
                rating: 5,
                comment: String::new(),
            });
        }
    }

    fn handle_review_key(&mut self, code: KeyCode) {
        let Some(form) = self.review_form.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => self.review_form = None,
            KeyCode::Left => form.rating = form.rating.saturating_sub(1).max(1),
            KeyCode::Right => form.rating = (form.rating + 1).min(5),
            KeyCode::Char(c) => form.comment.push(c),
            KeyCode::Backspace => {
                form.comment.pop();
            }
            KeyCode::Enter => self.submit_review(),
            _ => {}
        }
    }

    fn submit_review(&mut self) {
        if self.review_pending {
            return;
        }
        let Some(form) = &self.review_form else {
            return;
        };
        if let Err(errors) = validate_review(form.rating, &form.comment) {
            if let Some(first) = errors.iter().next() {
                self.toast_error(format!("{}: {}", first.field, first.message));
            }
            return;
        }
        let (event, rating, comment) = (form.event, form.rating, form.comment.clone());
        self.review_pending = true;
        self.fetcher.post_review(event, rating, comment);
    }

    fn handle_club_detail_key(&mut self, code: KeyCode) {
        let len = self.club_events.data().map_or(0, Vec::len);
        match code {
            KeyCode::Esc | KeyCode::Char('q') => self.club_open = None,
            KeyCode::Char('j') | KeyCode::Down => {
                if self.club_events_cursor + 1 < len {
                    self.club_events_cursor += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.club_events_cursor = self.club_events_cursor.saturating_sub(1);
            }
            KeyCode::Enter => {
                let selected = self
                    .club_events
                    .data()
                    .and_then(|events| events.get(self.club_events_cursor))
                    .map(|event| event.id);
                if let Some(id) = selected {
                    self.open_event(id);
                }
            }
            KeyCode::Char('m') => self.join_open_club(),
            KeyCode::Char('s') => self.subscribe_open_club(),
            KeyCode::Char('r') => {
                if let Some(id) = self.club_open {
                    self.cache.invalidate(&format!("club/{id}"));
                    self.cache.invalidate_prefix(&format!("club/{id}/"));
                    self.fetcher.load_club(id);
                    self.fetcher.load_club_events(id);
                    self.fetcher.load_club_members(id);
                }
            }
            _ => {}
        }
    }

    fn join_open_club(&mut self) {
        if self.join_pending {
            return;
        }
        if let Some(id) = self.club_open {
            self.join_pending = true;
            self.fetcher.join_club(id);
        }
    }

    fn subscribe_open_club(&mut self) {
        if self.subscribe_pending {
            return;
        }
        if let Some(id) = self.club_open {
            self.subscribe_pending = true;
            self.fetcher.subscribe_club(id);
        }
    }

    // ------------------------------------------------------------------
    // Derived data
    // ------------------------------------------------------------------

    fn filtered_events(&self) -> Vec<&Event> {
        let Some(events) = self.events.data() else {
            return Vec::new();
        };
        let now = Utc::now();
        events
            .iter()
            .filter(|event| !self.upcoming_only || event.start_date > now)
            .filter(|event| match self.event_filter {
                EventFilter::All => true,
                EventFilter::Free => event.is_free(),
                EventFilter::Paid => !event.is_free(),
            })
            .filter(|event| {
                self.event_search.is_empty()
                    || matches_search(
                        &[
                            event.title.as_str(),
                            event.description.as_str(),
                            event.club_name.as_str(),
                        ],
                        &self.event_search,
                    )
            })
            .collect()
    }

    fn filtered_clubs(&self) -> Vec<&Club> {
        let Some(clubs) = self.clubs.data() else {
            return Vec::new();
        };
        clubs
            .iter()
            .filter(|club| {
                self.club_search.is_empty()
                    || matches_search(
                        &[club.name.as_str(), club.description.as_str()],
                        &self.club_search,
                    )
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        if self.booting {
            draw_splash(frame, area);
        } else {
            match self.view {
                View::Login => self.draw_login(frame, area),
                View::Register => self.draw_register(frame, area),
                View::Browse => self.draw_browse(frame, area),
            }
        }

        if let Some(toast) = &self.toast {
            draw_toast(frame, area, toast);
        }
    }

    fn draw_login(&self, frame: &mut Frame, area: Rect) {
        let rect = centered_rect(50, 12, area);
        frame.render_widget(Clear, rect);
        let block = Block::default().borders(Borders::ALL).title(" CampusClubHub ");
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        frame.render_widget(
            Paragraph::new(Line::styled("Sign in to your student account", muted()))
                .alignment(Alignment::Center),
            chunks[0],
        );
        draw_field(
            frame,
            chunks[1],
            "Username",
            &self.login.username,
            self.login.focus == 0,
            false,
        );
        draw_field(
            frame,
            chunks[2],
            "Password",
            &self.login.password,
            self.login.focus == 1,
            true,
        );

        let footer = if self.login_pending {
            Line::styled("Signing in...", accent())
        } else {
            Line::styled("Enter: Sign in | Ctrl+R: Register | Ctrl+C: Quit", muted())
        };
        frame.render_widget(
            Paragraph::new(footer).alignment(Alignment::Center),
            chunks[4],
        );
    }

    fn draw_register(&self, frame: &mut Frame, area: Rect) {
        let rect = centered_rect(54, 22, area);
        frame.render_widget(Clear, rect);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Create account ");
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let mut constraints = vec![Constraint::Length(3); REGISTER_LABELS.len()];
        constraints.push(Constraint::Length(1));
        constraints.push(Constraint::Length(1));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(inner);

        for (index, label) in REGISTER_LABELS.iter().enumerate() {
            let mask = matches!(index, 2 | 3);
            draw_field(
                frame,
                chunks[index],
                label,
                self.register.field(index),
                self.register.focus == index,
                mask,
            );
        }

        let footer = if self.register_pending {
            Line::styled("Creating account...", accent())
        } else {
            Line::styled("Enter: Create account | Esc: Back to sign in", muted())
        };
        frame.render_widget(
            Paragraph::new(footer).alignment(Alignment::Center),
            chunks[REGISTER_LABELS.len() + 1],
        );
    }

    fn draw_browse(&self, frame: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        self.draw_header(frame, rows[0]);

        let body = if self.sidebar {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
                .split(rows[1]);
            self.draw_sidebar(frame, cols[0]);
            cols[1]
        } else {
            rows[1]
        };

        if self.event_open.is_some() {
            self.draw_event_detail(frame, body);
        } else if self.club_open.is_some() {
            self.draw_club_detail(frame, body);
        } else {
            match self.route {
                Route::Dashboard => self.draw_dashboard(frame, body),
                Route::Events => self.draw_events(frame, body),
                Route::Clubs => self.draw_clubs(frame, body),
                Route::Tickets => self.draw_tickets(frame, body),
                Route::Profile => self.draw_profile(frame, body),
            }
        }

        self.draw_status_bar(frame, rows[2]);
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let title = " CampusClubHub";
        let account = match &self.user {
            Some(user) => format!(
                "{} | {} ",
                user.username,
                format_money(user.wallet_balance)
            ),
            None => String::new(),
        };
        let pad = (area.width as usize)
            .saturating_sub(title.chars().count() + account.chars().count());
        let line = Line::from(vec![
            Span::styled(
                title,
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" ".repeat(pad)),
            Span::raw(account),
        ]);
        frame.render_widget(
            Paragraph::new(line).style(Style::default().bg(Color::DarkGray).fg(Color::White)),
            area,
        );
    }

    fn draw_sidebar(&self, frame: &mut Frame, area: Rect) {
        let on_detail = self.event_open.is_some() || self.club_open.is_some();
        let items: Vec<ListItem> = ROUTES
            .iter()
            .enumerate()
            .map(|(index, route)| {
                let style = if *route == self.route && !on_detail {
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(format!(" {} {}", index + 1, route.title())).style(style)
            })
            .collect();
        let list = List::new(items).block(Block::default().borders(Borders::RIGHT));
        frame.render_widget(list, area);
    }

    fn draw_status_bar(&self, frame: &mut Frame, area: Rect) {
        let paragraph = Paragraph::new(self.status_hint())
            .style(Style::default().bg(Color::DarkGray).fg(Color::White));
        frame.render_widget(paragraph, area);
    }

    fn status_hint(&self) -> String {
        if self.searching {
            return " Type to filter | Enter: Done | Esc: Clear ".to_string();
        }
        if self.review_form.is_some() {
            return " Left/Right: Rating | Enter: Submit | Esc: Cancel ".to_string();
        }
        if self.event_open.is_some() {
            return " p: Buy ticket | w: Review | r: Refresh | Esc: Back | Ctrl+C: Quit ".to_string();
        }
        if self.club_open.is_some() {
            return " j/k: Select | Enter: Open event | m: Join | s: Subscribe | Esc: Back "
                .to_string();
        }
        match self.route {
            Route::Events => {
                " j/k: Select | Enter: Open | /: Search | u: Upcoming | f: Free/Paid | r: Refresh | q: Quit "
            }
            Route::Clubs => " j/k: Select | Enter: Open | /: Search | r: Refresh | q: Quit ",
            Route::Tickets => " j/k: Select | Enter: Event | c: Cancel | r: Refresh | q: Quit ",
            _ => " Tab: Next screen | 1-5: Jump | Ctrl+B: Sidebar | Ctrl+L: Log out | q: Quit ",
        }
        .to_string()
    }

    fn draw_dashboard(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(area);

        let name = self
            .user
            .as_ref()
            .map(|user| user.username.as_str())
            .unwrap_or("student");
        frame.render_widget(
            Paragraph::new(Line::styled(
                format!(" Welcome back, {name}!"),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            chunks[0],
        );

        let stats = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ])
            .split(chunks[1]);
        draw_stat(
            frame,
            stats[0],
            "upcoming events",
            self.upcoming.data().map(Vec::len),
        );
        draw_stat(
            frame,
            stats[1],
            "tickets",
            self.tickets.data().map(Vec::len),
        );
        draw_stat(frame, stats[2], "clubs", self.clubs.data().map(Vec::len));

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[2]);

        let upcoming = section_lines(&self.upcoming, 3, "No upcoming events", |event: &Event| {
            Line::from(vec![
                Span::styled(format!("{}  ", format_date(&event.start_date)), muted()),
                Span::raw(event.title.clone()),
            ])
        });
        frame.render_widget(
            Paragraph::new(upcoming).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Upcoming Events "),
            ),
            cols[0],
        );

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(cols[1]);

        let tickets = section_lines(&self.tickets, 3, "No tickets yet", |ticket: &Ticket| {
            Line::from(vec![
                Span::styled(format!("{}  ", format_date(&ticket.purchased_at)), muted()),
                Span::raw(ticket.event_title.clone()),
            ])
        });
        frame.render_widget(
            Paragraph::new(tickets)
                .block(Block::default().borders(Borders::ALL).title(" My Tickets ")),
            right[0],
        );

        let clubs = section_lines(&self.clubs, 4, "No clubs yet", |club: &Club| {
            Line::from(club.name.clone())
        });
        frame.render_widget(
            Paragraph::new(clubs).block(Block::default().borders(Borders::ALL).title(" Clubs ")),
            right[1],
        );
    }

    fn draw_events(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(area);

        let events = self.filtered_events();

        let mut filter_line = vec![
            Span::styled(" Search: ", muted()),
            Span::raw(self.event_search.clone()),
        ];
        if self.searching {
            filter_line.push(Span::raw("_"));
        }
        filter_line.push(Span::styled(
            format!("   Filter: {}", self.event_filter.label()),
            muted(),
        ));
        if self.upcoming_only {
            filter_line.push(Span::styled("   upcoming only", accent()));
        }
        frame.render_widget(Paragraph::new(Line::from(filter_line)), chunks[0]);

        if let Some(message) = self.events.error() {
            draw_error_panel(frame, chunks[1], " Events ", message);
            return;
        }
        if self.events.data().is_none() {
            draw_loading_panel(frame, chunks[1], " Events ");
            return;
        }

        let items: Vec<ListItem> = events
            .iter()
            .map(|event| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<18}", format_date(&event.start_date)), muted()),
                    Span::raw(format!("{:<30}", truncate(&event.title, 28))),
                    Span::styled(format!("{:<18}", truncate(&event.club_name, 16)), muted()),
                    Span::raw(format!("{:>8}  ", format_price(event))),
                    availability_span(event),
                ]))
            })
            .collect();
        let cursor = self.events_cursor.min(events.len().saturating_sub(1));
        draw_list(
            frame,
            chunks[1],
            format!(" Events ({}) ", events.len()),
            items,
            cursor,
        );
    }

    fn draw_clubs(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(area);

        let mut filter_line = vec![
            Span::styled(" Search: ", muted()),
            Span::raw(self.club_search.clone()),
        ];
        if self.searching {
            filter_line.push(Span::raw("_"));
        }
        frame.render_widget(Paragraph::new(Line::from(filter_line)), chunks[0]);

        if let Some(message) = self.clubs.error() {
            draw_error_panel(frame, chunks[1], " Clubs ", message);
            return;
        }
        if self.clubs.data().is_none() {
            draw_loading_panel(frame, chunks[1], " Clubs ");
            return;
        }

        let clubs = self.filtered_clubs();
        let items: Vec<ListItem> = clubs
            .iter()
            .map(|club| {
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{:<26}", truncate(&club.name, 24))),
                    Span::styled(truncate(&club.description, 60), muted()),
                ]))
            })
            .collect();
        let cursor = self.clubs_cursor.min(clubs.len().saturating_sub(1));
        draw_list(
            frame,
            chunks[1],
            format!(" Clubs ({}) ", clubs.len()),
            items,
            cursor,
        );
    }

    fn draw_tickets(&self, frame: &mut Frame, area: Rect) {
        if let Some(message) = self.tickets.error() {
            draw_error_panel(frame, area, " My Tickets ", message);
            return;
        }
        let Some(tickets) = self.tickets.data() else {
            draw_loading_panel(frame, area, " My Tickets ");
            return;
        };

        let items: Vec<ListItem> = tickets
            .iter()
            .map(|ticket| {
                let mut spans = vec![
                    Span::styled(format!("{:<18}", format_date(&ticket.purchased_at)), muted()),
                    Span::raw(format!("{:<40}", truncate(&ticket.event_title, 38))),
                    Span::styled(format!("#{}", ticket.id), muted()),
                ];
                if self.cancel_pending == Some(ticket.id) {
                    spans.push(Span::styled("  cancelling...", accent()));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();
        let cursor = self.tickets_cursor.min(tickets.len().saturating_sub(1));
        draw_list(
            frame,
            area,
            format!(" My Tickets ({}) ", tickets.len()),
            items,
            cursor,
        );
    }

    fn draw_profile(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(0)])
            .split(area);

        let mut card = Vec::new();
        if let Some(user) = &self.user {
            card.push(Line::styled(
                user.username.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            card.push(Line::from(user.email.clone()));
            card.push(Line::from(vec![
                Span::styled("Faculty: ", muted()),
                Span::raw(if user.faculty.is_empty() {
                    "-".to_string()
                } else {
                    user.faculty.clone()
                }),
                Span::styled("   Speciality: ", muted()),
                Span::raw(if user.speciality.is_empty() {
                    "-".to_string()
                } else {
                    user.speciality.clone()
                }),
            ]));
            card.push(Line::from(vec![
                Span::styled("Wallet: ", muted()),
                Span::styled(
                    format_money(user.wallet_balance),
                    Style::default().fg(Color::Green),
                ),
            ]));
        }
        frame.render_widget(
            Paragraph::new(card).block(Block::default().borders(Borders::ALL).title(" Profile ")),
            chunks[0],
        );

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ])
            .split(chunks[1]);

        let memberships = section_lines(
            &self.memberships,
            usize::MAX,
            "Not a member of any club",
            |member: &ClubMember| {
                Line::from(vec![
                    Span::raw(format!("{:<20}", truncate(&member.club_name, 18))),
                    Span::styled(member.role.clone(), accent()),
                ])
            },
        );
        frame.render_widget(
            Paragraph::new(memberships)
                .block(Block::default().borders(Borders::ALL).title(" My Clubs ")),
            cols[0],
        );

        let tickets = section_lines(&self.tickets, usize::MAX, "No tickets yet", |ticket: &Ticket| {
            Line::from(vec![
                Span::styled(format!("{}  ", format_date(&ticket.purchased_at)), muted()),
                Span::raw(truncate(&ticket.event_title, 20)),
            ])
        });
        frame.render_widget(
            Paragraph::new(tickets)
                .block(Block::default().borders(Borders::ALL).title(" My Tickets ")),
            cols[1],
        );

        let subscriptions = section_lines(
            &self.subscriptions,
            usize::MAX,
            "No subscriptions",
            |subscription: &Subscription| {
                Line::from(vec![
                    Span::raw(format!("{:<20}", truncate(&subscription.club_name, 18))),
                    Span::styled(
                        format!("since {}", format_date(&subscription.subscribed_at)),
                        muted(),
                    ),
                ])
            },
        );
        frame.render_widget(
            Paragraph::new(subscriptions).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Subscriptions "),
            ),
            cols[2],
        );
    }

    fn draw_event_detail(&self, frame: &mut Frame, area: Rect) {
        if let Some(message) = self.event_detail.error() {
            draw_error_panel(frame, area, " Event ", message);
            return;
        }
        let Some(event) = self.event_detail.data() else {
            draw_loading_panel(frame, area, " Event ");
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),
                Constraint::Length(4),
                Constraint::Min(0),
            ])
            .split(area);

        let mut action = Span::styled("p: Buy ticket", accent());
        if self.purchase_pending {
            action = Span::styled("Purchasing...", accent());
        } else if event.is_sold_out() {
            action = Span::styled("Sold Out", danger().add_modifier(Modifier::BOLD));
        }
        let info = vec![
            Line::styled(
                event.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Line::from(vec![
                Span::styled("Hosted by ", muted()),
                Span::raw(event.club_name.clone()),
                Span::styled("  Room ", muted()),
                Span::raw(event.room_name.clone()),
            ]),
            Line::from(format!(
                "{} to {}",
                format_date(&event.start_date),
                format_date(&event.end_date)
            )),
            Line::from(vec![
                Span::raw(format_price(event)),
                Span::raw("   "),
                availability_span(event),
                Span::styled(
                    format!("   {} sold of {}", event.tickets_sold, event.total_tickets),
                    muted(),
                ),
                Span::raw("   "),
                action,
            ]),
        ];
        frame.render_widget(
            Paragraph::new(info).block(Block::default().borders(Borders::ALL).title(" Event ")),
            chunks[0],
        );

        frame.render_widget(
            Paragraph::new(event.description.clone())
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title(" About ")),
            chunks[1],
        );

        self.draw_reviews(frame, chunks[2]);

        if let Some(form) = &self.review_form {
            draw_review_modal(frame, area, form, self.review_pending);
        }
    }

    fn draw_reviews(&self, frame: &mut Frame, area: Rect) {
        let lines = match &self.event_reviews {
            QueryState::Idle | QueryState::Loading => vec![Line::styled("Loading...", muted())],
            QueryState::Failed(message) => vec![Line::styled(message.clone(), danger())],
            QueryState::Ready(reviews) if reviews.is_empty() => {
                vec![Line::styled("No reviews yet. Press w to write one.", muted())]
            }
            QueryState::Ready(reviews) => {
                let mut lines = Vec::new();
                for review in reviews {
                    lines.push(Line::from(vec![
                        Span::styled(stars(review.rating), Style::default().fg(Color::Yellow)),
                        Span::raw(format!("  {}", review.user_username)),
                        Span::styled(format!("  {}", format_date(&review.created_at)), muted()),
                    ]));
                    lines.push(Line::from(format!("  {}", review.comment)));
                }
                lines
            }
        };

        let count = self
            .event_reviews
            .data()
            .map(Vec::len)
            .unwrap_or_default();
        frame.render_widget(
            Paragraph::new(lines).wrap(Wrap { trim: false }).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Reviews ({count}) ")),
            ),
            area,
        );
    }

    fn draw_club_detail(&self, frame: &mut Frame, area: Rect) {
        if let Some(message) = self.club_detail.error() {
            draw_error_panel(frame, area, " Club ", message);
            return;
        }
        let Some(club) = self.club_detail.data() else {
            draw_loading_panel(frame, area, " Club ");
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0)])
            .split(area);

        let member_count = self.club_members.data().map(Vec::len);
        let mut head = vec![
            Line::from(vec![
                Span::styled(
                    club.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    match member_count {
                        Some(count) => format!("   {count} members"),
                        None => String::new(),
                    },
                    muted(),
                ),
                Span::styled(
                    format!("   since {}", format_date(&club.created_at)),
                    muted(),
                ),
            ]),
            Line::default(),
        ];
        head.push(Line::from(club.description.clone()));
        frame.render_widget(
            Paragraph::new(head)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title(" Club ")),
            chunks[0],
        );

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        match (&self.club_events, self.club_events.data()) {
            (QueryState::Failed(message), _) => {
                draw_error_panel(frame, cols[0], " Events ", message)
            }
            (_, None) => draw_loading_panel(frame, cols[0], " Events "),
            (_, Some(events)) => {
                let items: Vec<ListItem> = events
                    .iter()
                    .map(|event| {
                        ListItem::new(Line::from(vec![
                            Span::styled(
                                format!("{:<18}", format_date(&event.start_date)),
                                muted(),
                            ),
                            Span::raw(format!("{:<26}", truncate(&event.title, 24))),
                            Span::raw(format!("{:>8}", format_price(event))),
                        ]))
                    })
                    .collect();
                let cursor = self.club_events_cursor.min(events.len().saturating_sub(1));
                draw_list(
                    frame,
                    cols[0],
                    format!(" Events ({}) ", events.len()),
                    items,
                    cursor,
                );
            }
        }

        let members = section_lines(&self.club_members, usize::MAX, "No members", |member: &ClubMember| {
            let role_style = if member.role == "head" {
                accent()
            } else {
                muted()
            };
            Line::from(vec![
                Span::raw(format!("{:<18}", truncate(&member.username, 16))),
                Span::styled(member.role.clone(), role_style),
            ])
        });
        frame.render_widget(
            Paragraph::new(members)
                .block(Block::default().borders(Borders::ALL).title(" Members ")),
            cols[1],
        );
    }
}

// ----------------------------------------------------------------------
// Stateless rendering helpers
// ----------------------------------------------------------------------

fn muted() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn accent() -> Style {
    Style::default().fg(Color::Cyan)
}

fn danger() -> Style {
    Style::default().fg(Color::Red)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

fn availability_span(event: &Event) -> Span<'static> {
    let style = if event.is_sold_out() {
        danger().add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Green)
    };
    Span::styled(format_availability(event), style)
}

/// Refresh a list dataset: cached data replaces the view at once, stale
/// data stays visible while the refetch runs, a cold start shows Loading.
fn prime<T: DeserializeOwned>(cache: &QueryCache, state: &mut QueryState<T>, key: &str) {
    if let Some(data) = cache.get::<T>(key) {
        *state = QueryState::Ready(data);
    } else if state.data().is_none() {
        *state = QueryState::Loading;
    }
}

/// Reset a detail dataset for a fresh navigation; data left over from the
/// previously opened record must never show under the new id.
fn open_detail<T: DeserializeOwned>(cache: &QueryCache, state: &mut QueryState<T>, key: &str) {
    *state = match cache.get::<T>(key) {
        Some(data) => QueryState::Ready(data),
        None => QueryState::Loading,
    };
}

fn section_lines<T>(
    state: &QueryState<Vec<T>>,
    take: usize,
    empty: &str,
    render: impl Fn(&T) -> Line<'static>,
) -> Vec<Line<'static>> {
    match state {
        QueryState::Idle | QueryState::Loading => vec![Line::styled("Loading...", muted())],
        QueryState::Failed(message) => vec![Line::styled(message.clone(), danger())],
        QueryState::Ready(items) if items.is_empty() => {
            vec![Line::styled(empty.to_string(), muted())]
        }
        QueryState::Ready(items) => items.iter().take(take).map(render).collect(),
    }
}

fn draw_stat(frame: &mut Frame, area: Rect, label: &str, value: Option<usize>) {
    let count = match value {
        Some(count) => count.to_string(),
        None => "-".to_string(),
    };
    let line = Line::from(vec![
        Span::styled(count, Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!(" {label}"), muted()),
    ]);
    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn draw_list(frame: &mut Frame, area: Rect, title: String, items: Vec<ListItem>, cursor: usize) {
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(Some(cursor));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_error_panel(frame: &mut Frame, area: Rect, title: &str, message: &str) {
    let text = vec![
        Line::styled(message.to_string(), danger()),
        Line::styled("Press r to retry", muted()),
    ];
    frame.render_widget(
        Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string()),
        ),
        area,
    );
}

fn draw_loading_panel(frame: &mut Frame, area: Rect, title: &str) {
    frame.render_widget(
        Paragraph::new(Line::styled("Loading...", muted())).block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string()),
        ),
        area,
    );
}

fn draw_field(frame: &mut Frame, area: Rect, label: &str, value: &str, focused: bool, mask: bool) {
    let shown = if mask {
        "*".repeat(value.chars().count())
    } else {
        value.to_string()
    };
    let text = if focused {
        format!("{shown}_")
    } else {
        shown
    };
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Gray)
    };
    frame.render_widget(
        Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {label} "))
                .border_style(style),
        ),
        area,
    );
}

fn draw_review_modal(frame: &mut Frame, area: Rect, form: &ReviewForm, pending: bool) {
    let rect = centered_rect(54, 9, area);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Write a review ");
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::raw("Rating: "),
            Span::styled(stars(form.rating), Style::default().fg(Color::Yellow)),
            Span::styled("  (Left/Right to adjust)", muted()),
        ])),
        chunks[0],
    );
    draw_field(frame, chunks[1], "Comment", &form.comment, true, false);
    let footer = if pending {
        Line::styled("Submitting...", accent())
    } else {
        Line::styled("Enter: Submit | Esc: Cancel", muted())
    };
    frame.render_widget(
        Paragraph::new(footer).alignment(Alignment::Center),
        chunks[2],
    );
}

fn draw_splash(frame: &mut Frame, area: Rect) {
    let rect = centered_rect(30, 3, area);
    frame.render_widget(
        Paragraph::new(Line::styled("Checking session...", muted()))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" CampusClubHub ")),
        rect,
    );
}

fn draw_toast(frame: &mut Frame, area: Rect, toast: &Toast) {
    let width = (toast.message.chars().count() as u16 + 4).min(area.width);
    let height = 3u16;
    if area.width < width || area.height < height {
        return;
    }
    let rect = Rect::new(
        area.right().saturating_sub(width + 1),
        area.bottom().saturating_sub(height + 1),
        width,
        height,
    );
    let style = match toast.kind {
        ToastKind::Success => Style::default().fg(Color::Green),
        ToastKind::Error => Style::default().fg(Color::Red),
    };
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(toast.message.clone())
            .alignment(Alignment::Center)
            .style(style)
            .block(Block::default().borders(Borders::ALL).border_style(style)),
        rect,
    );
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as TimeDelta;
    use clubhub_api::{ApiClient, SessionStore, TicketType};

    fn sample_student() -> Student {
        Student {
            id: 7,
            username: "ada".to_string(),
            email: "ada@uni.edu".to_string(),
            faculty: String::new(),
            speciality: String::new(),
            wallet_balance: 25.0,
        }
    }

    fn sample_event(
        id: i64,
        title: &str,
        club: &str,
        kind: TicketType,
        price: f64,
        hours_from_now: i64,
        available: i64,
    ) -> Event {
        let start = Utc::now() + TimeDelta::hours(hours_from_now);
        Event {
            id,
            title: title.to_string(),
            description: String::new(),
            club: 1,
            club_name: club.to_string(),
            room: 1,
            room_name: "B-1".to_string(),
            start_date: start,
            end_date: start + TimeDelta::hours(2),
            ticket_price: price,
            ticket_type: kind,
            total_tickets: 100,
            tickets_available: available,
            tickets_sold: 100 - available,
            image: None,
            created_at: Utc::now(),
        }
    }

    fn sample_ticket(id: i64, event: i64) -> Ticket {
        Ticket {
            id,
            student: 7,
            student_username: "ada".to_string(),
            event,
            event_title: "Gala".to_string(),
            purchased_at: Utc::now(),
        }
    }

    fn test_app() -> App {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SessionStore::load(dir.path().join("session.toml")));
        let client = Arc::new(ApiClient::new(
            "http://127.0.0.1:1".to_string(),
            Arc::clone(&store),
        ));
        let session = Arc::new(SessionManager::new(Arc::clone(&client), store));
        let cache = Arc::new(QueryCache::new());
        let (tx, rx) = mpsc::channel(8);
        let fetcher = Fetcher::new(client, Arc::clone(&session), Arc::clone(&cache), tx);
        App::new(fetcher, session, cache, rx)
    }

    fn ids(events: &[&Event]) -> Vec<i64> {
        events.iter().map(|event| event.id).collect()
    }

    #[test]
    fn test_event_filters_compose() {
        let mut app = test_app();
        app.events = QueryState::Ready(vec![
            sample_event(1, "Past Mixer", "Social", TicketType::Free, 0.0, -3, 10),
            sample_event(2, "Paid Gala", "Social", TicketType::Paid, 20.0, 5, 10),
            sample_event(3, "Free Workshop", "Programming Club", TicketType::Free, 0.0, 8, 10),
        ]);

        assert_eq!(ids(&app.filtered_events()), vec![1, 2, 3]);

        app.upcoming_only = true;
        assert_eq!(ids(&app.filtered_events()), vec![2, 3]);

        app.event_filter = EventFilter::Free;
        assert_eq!(ids(&app.filtered_events()), vec![3]);

        app.event_filter = EventFilter::Paid;
        assert_eq!(ids(&app.filtered_events()), vec![2]);
    }

    #[test]
    fn test_event_search_matches_title_and_club() {
        let mut app = test_app();
        app.events = QueryState::Ready(vec![
            sample_event(1, "Chess Blitz", "Chess Club", TicketType::Free, 0.0, 4, 10),
            sample_event(2, "Rust Workshop", "Programming Club", TicketType::Free, 0.0, 4, 10),
        ]);

        app.event_search = "programming".to_string();
        assert_eq!(ids(&app.filtered_events()), vec![2]);

        app.event_search = "BLITZ".to_string();
        assert_eq!(ids(&app.filtered_events()), vec![1]);
    }

    #[test]
    fn test_sold_out_purchase_is_blocked_locally() {
        let mut app = test_app();
        app.booting = false;
        app.view = View::Browse;
        app.user = Some(sample_student());
        app.event_open = Some(9);
        app.event_detail =
            QueryState::Ready(sample_event(9, "Gala", "Social", TicketType::Paid, 10.0, 5, 0));

        app.purchase_selected();

        assert!(!app.purchase_pending);
        assert_eq!(
            app.toast.as_ref().map(|toast| toast.message.as_str()),
            Some("Sold Out")
        );
    }

    #[test]
    fn test_pending_purchase_is_not_resubmitted() {
        let mut app = test_app();
        app.user = Some(sample_student());
        app.event_open = Some(9);
        app.event_detail =
            QueryState::Ready(sample_event(9, "Gala", "Social", TicketType::Paid, 10.0, 5, 3));
        app.purchase_pending = true;

        app.purchase_selected();

        assert!(app.purchase_pending);
        assert!(app.toast.is_none());
    }

    #[tokio::test]
    async fn test_purchase_starts_when_tickets_remain() {
        let mut app = test_app();
        app.user = Some(sample_student());
        app.event_open = Some(9);
        app.event_detail =
            QueryState::Ready(sample_event(9, "Gala", "Social", TicketType::Paid, 10.0, 5, 3));

        app.purchase_selected();

        assert!(app.purchase_pending);
        assert!(app.toast.is_none());
    }

    #[test]
    fn test_session_expiry_routes_to_login() {
        let mut app = test_app();
        app.booting = false;
        app.view = View::Browse;
        app.user = Some(sample_student());
        app.tickets = QueryState::Ready(vec![sample_ticket(1, 9)]);

        app.apply(FetchResult::Events(Err(ApiError::SessionExpired)));

        assert_eq!(app.view, View::Login);
        assert!(app.user.is_none());
        assert!(app.tickets.data().is_none());
        let toast = app.toast.as_ref().unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.message, "Session expired. Please log in again.");
    }

    #[test]
    fn test_stale_detail_result_is_dropped() {
        let mut app = test_app();
        app.event_open = Some(2);
        app.event_detail = QueryState::Loading;

        app.apply(FetchResult::EventDetail(
            1,
            Ok(sample_event(1, "Old", "Social", TicketType::Free, 0.0, 4, 5)),
        ));
        assert!(app.event_detail.data().is_none());

        app.apply(FetchResult::EventDetail(
            2,
            Ok(sample_event(2, "New", "Social", TicketType::Free, 0.0, 4, 5)),
        ));
        assert_eq!(app.event_detail.data().map(|event| event.id), Some(2));
    }

    #[tokio::test]
    async fn test_purchase_result_invalidates_cached_queries() {
        let mut app = test_app();
        app.user = Some(sample_student());
        app.cache.put("tickets", &vec![1i64]);
        app.cache.put("events", &vec![1i64]);
        app.cache.put("event/9", &vec![1i64]);

        app.apply(FetchResult::Purchased(Ok(sample_ticket(11, 9))));

        assert!(!app.cache.contains("events"));
        assert!(!app.cache.contains("event/9"));
        assert_eq!(
            app.toast.as_ref().map(|toast| toast.message.as_str()),
            Some("Ticket purchased successfully!")
        );
    }

    #[test]
    fn test_login_submit_requires_both_fields() {
        let mut app = test_app();
        app.booting = false;

        app.submit_login();

        assert!(!app.login_pending);
        assert_eq!(
            app.toast.as_ref().map(|toast| toast.message.as_str()),
            Some("Enter your username and password")
        );
    }

    #[tokio::test]
    async fn test_route_cycle_wraps_both_ways() {
        let mut app = test_app();
        app.user = Some(sample_student());

        assert_eq!(app.route, Route::Dashboard);
        app.cycle_route(-1);
        assert_eq!(app.route, Route::Profile);
        app.cycle_route(1);
        assert_eq!(app.route, Route::Dashboard);
        app.cycle_route(1);
        assert_eq!(app.route, Route::Events);
    }

    #[test]
    fn test_toast_expires_after_ttl() {
        let mut app = test_app();
        app.toast_success("done");
        app.toast.as_mut().unwrap().until = Instant::now();

        app.expire_toast();

        assert!(app.toast.is_none());
    }

    #[test]
    fn test_review_form_validation_keeps_form_open() {
        let mut app = test_app();
        app.event_open = Some(3);
        app.open_review_form();
        if let Some(form) = app.review_form.as_mut() {
            form.comment = "meh".to_string();
        }

        app.submit_review();

        assert!(!app.review_pending);
        assert!(app.review_form.is_some());
        assert_eq!(
            app.toast.as_ref().map(|toast| toast.message.as_str()),
            Some("comment: Please provide a longer comment")
        );
    }
}
