//! Navigation graph selection
//!
//! The active screen graph is a pure function of the session: splash while
//! initializing, the auth graph while anonymous, and the tabbed main graph
//! once a user is signed in. Navigation inside a graph belongs to the screens.

use crate::session::{Session, SessionSignal};

/// Every screen of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Animated splash shown while the session resolves
    Splash,
    /// Email/password login
    Login,
    /// Account registration
    Register,
    /// Service categories and featured providers
    Home,
    /// Providers of one category
    ServiceProviders,
    /// Form to add a provider
    AddProvider,
    /// User profile and contact data
    User,
    /// Application settings
    Settings,
    /// Profile editing
    EditProfile,
}

/// Tabs of the main graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    /// Home tab
    Home,
    /// User profile tab
    User,
    /// Settings tab
    Settings,
}

impl Tab {
    /// All tabs in display order
    pub fn all() -> Vec<Self> {
        vec![Self::Home, Self::User, Self::Settings]
    }

    /// Tab bar label
    pub fn label(&self) -> &str {
        match self {
            Self::Home => "Home",
            Self::User => "Usuario",
            Self::Settings => "Ajustes",
        }
    }

    /// Screens stacked inside this tab, root first
    pub fn stack(&self) -> &'static [Route] {
        match self {
            Self::Home => &[Route::Home, Route::ServiceProviders, Route::AddProvider],
            Self::User => &[Route::User],
            Self::Settings => &[Route::Settings, Route::EditProfile],
        }
    }
}

/// Top-level screen graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenGraph {
    /// Splash only
    Splash,
    /// Login and registration
    Auth,
    /// Tabbed application
    Main,
}

impl ScreenGraph {
    /// Project a session onto its graph
    pub fn for_session(session: &Session) -> Self {
        match session {
            Session::Initializing => ScreenGraph::Splash,
            Session::Anonymous => ScreenGraph::Auth,
            Session::Authenticated(_) => ScreenGraph::Main,
        }
    }

    /// Screen shown when the graph becomes active
    pub fn initial_route(&self) -> Route {
        match self {
            ScreenGraph::Splash => Route::Splash,
            ScreenGraph::Auth => Route::Login,
            ScreenGraph::Main => Route::Home,
        }
    }

    /// Every screen reachable in this graph
    pub fn routes(&self) -> Vec<Route> {
        match self {
            ScreenGraph::Splash => vec![Route::Splash],
            ScreenGraph::Auth => vec![Route::Login, Route::Register],
            ScreenGraph::Main => Tab::all().iter().flat_map(|t| t.stack().iter().copied()).collect(),
        }
    }

    /// Whether a screen belongs to this graph
    pub fn contains(&self, route: Route) -> bool {
        self.routes().contains(&route)
    }

    /// Tabs of this graph (only the main graph has any)
    pub fn tabs(&self) -> Vec<Tab> {
        match self {
            ScreenGraph::Main => Tab::all(),
            _ => Vec::new(),
        }
    }
}

/// Follows a session signal and reports graph switches
#[derive(Debug)]
pub struct NavigationRouter {
    signal: SessionSignal,
    graph: ScreenGraph,
}

impl NavigationRouter {
    /// Create a router positioned on the signal's current session
    pub fn new(signal: SessionSignal) -> Self {
        let graph = ScreenGraph::for_session(&signal.current());
        Self { signal, graph }
    }

    /// Graph for the last observed session
    pub fn current_graph(&self) -> ScreenGraph {
        self.graph
    }

    /// Session the graph was projected from
    pub fn session(&self) -> Session {
        self.signal.current()
    }

    /// Wait until the projected graph differs from the current one
    ///
    /// Session changes that keep the same graph are absorbed. Returns `None`
    /// once the session controller is gone.
    pub async fn next_graph(&mut self) -> Option<ScreenGraph> {
        loop {
            let session = self.signal.changed().await?;
            let graph = ScreenGraph::for_session(&session);
            if graph != self.graph {
                tracing::debug!("Switching screen graph {:?} -> {:?}", self.graph, graph);
                self.graph = graph;
                return Some(graph);
            }
        }
    }
}
