//! Application routes and the navigator that follows session events.
//!
//! The data layer never navigates. `ApiClient` publishes a
//! [`SessionEvent`] when the server rejects the session, and whichever front
//! end owns a `Navigator` feeds those events into [`Navigator::apply`].

use std::fmt;

use tracing::info;

use crate::api::SessionEvent;
use crate::auth::SessionInspector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Signup,
    Dashboard,
    Gallery,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Dashboard => "/dashboard",
            Route::Gallery => "/gallery",
        }
    }

    /// Resolve a path. The root path lands on the dashboard.
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "" | "/dashboard" => Some(Route::Dashboard),
            "/login" => Some(Route::Login),
            "/signup" => Some(Route::Signup),
            "/gallery" => Some(Route::Gallery),
            _ => None,
        }
    }

    /// Routes that need a live session
    pub fn requires_session(&self) -> bool {
        matches!(self, Route::Dashboard | Route::Gallery)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone)]
pub struct Navigator {
    current: Route,
}

impl Navigator {
    pub fn new(start: Route) -> Self {
        Self { current: start }
    }

    /// Start on the dashboard when signed in, otherwise on the login page
    pub fn initial(session: &SessionInspector) -> Self {
        Self::new(Self::guard(Route::Dashboard, session.is_authenticated()))
    }

    /// The route actually shown when `requested` is asked for
    pub fn guard(requested: Route, authenticated: bool) -> Route {
        if requested.requires_session() && !authenticated {
            Route::Login
        } else {
            requested
        }
    }

    pub fn current(&self) -> Route {
        self.current
    }

    pub fn navigate(&mut self, route: Route) {
        self.current = route;
    }

    /// React to a session event from the API client
    pub fn apply(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Invalidated { path, redirect_to } => {
                info!(path = %path, to = %redirect_to, "Session invalidated, redirecting");
                self.current = *redirect_to;
            }
        }
    }
}
