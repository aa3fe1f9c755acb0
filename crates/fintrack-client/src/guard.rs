//! Route-level authorization for page navigation.

use crate::config::ClientConfig;
use crate::session::SessionStore;
use crate::telemetry::Telemetry;
use std::sync::Arc;

/// Access requirements attached to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub name: String,
    pub path: String,
    pub requires_auth: bool,
    pub requires_admin: bool,
    /// Only reachable while logged out (login, registration).
    pub guest_only: bool,
}

impl RouteMeta {
    pub fn public(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            requires_auth: false,
            requires_admin: false,
            guest_only: false,
        }
    }

    pub fn guest(name: &str, path: &str) -> Self {
        Self { guest_only: true, ..Self::public(name, path) }
    }

    pub fn authenticated(name: &str, path: &str) -> Self {
        Self { requires_auth: true, ..Self::public(name, path) }
    }

    pub fn admin(name: &str, path: &str) -> Self {
        Self { requires_admin: true, ..Self::authenticated(name, path) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteMeta>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteMeta>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[RouteMeta] {
        &self.routes
    }

    /// Exact path match, ignoring query string and trailing slash.
    pub fn resolve(&self, path: &str) -> Option<&RouteMeta> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let normalized = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        self.routes.iter().find(|r| r.path == normalized)
    }

    pub fn by_name(&self, name: &str) -> Option<&RouteMeta> {
        self.routes.iter().find(|r| r.name == name)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(vec![
            RouteMeta::guest("Login", "/login"),
            RouteMeta::guest("Register", "/register"),
            RouteMeta::authenticated("Dashboard", "/"),
            RouteMeta::authenticated("AddTransaction", "/transactions/add"),
            RouteMeta::authenticated("Wallets", "/wallets"),
            RouteMeta::authenticated("Categories", "/categories"),
            RouteMeta::authenticated("Analysis", "/analysis"),
            RouteMeta::admin("Admin", "/admin"),
        ])
    }
}

pub struct NavigationGuard {
    session: Arc<SessionStore>,
    routes: RouteTable,
    login_route: String,
    default_route: String,
    telemetry: Option<Telemetry>,
}

impl NavigationGuard {
    pub fn new(session: Arc<SessionStore>, config: &ClientConfig) -> Self {
        Self {
            session,
            routes: RouteTable::default(),
            login_route: config.login_route.clone(),
            default_route: config.default_route.clone(),
            telemetry: None,
        }
    }

    #[must_use]
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Allowed navigations update the telemetry page path.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Pure decision for a single route. A user not fetched yet counts as
    /// not a superuser.
    pub fn check(&self, route: &RouteMeta) -> GuardDecision {
        let authenticated = self.session.is_authenticated();
        if route.requires_auth && !authenticated {
            return GuardDecision::Redirect(self.login_route.clone());
        }
        if route.requires_admin && !self.session.is_superuser() {
            return GuardDecision::Redirect(self.default_route.clone());
        }
        if route.guest_only && authenticated {
            return GuardDecision::Redirect(self.default_route.clone());
        }
        GuardDecision::Proceed
    }

    /// Resolve a path and decide. Paths outside the table proceed.
    pub fn navigate(&self, path: &str) -> GuardDecision {
        let decision = match self.routes.resolve(path) {
            Some(route) => self.check(route),
            None => GuardDecision::Proceed,
        };
        match &decision {
            GuardDecision::Proceed => {
                if let Some(telemetry) = &self.telemetry {
                    telemetry.set_page(path);
                }
            }
            GuardDecision::Redirect(target) => {
                tracing::debug!("Navigation to {} redirected to {}", path, target);
            }
        }
        decision
    }
}
