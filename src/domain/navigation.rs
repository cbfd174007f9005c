use crate::domain::user::User;
use serde::Serialize;

pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_LANDING: &str = "/admin";
pub const EMPLOYEE_LANDING: &str = "/dashboard";
pub const ARCHITECT_ROLE_ID: &str = "solutions_architect";

/// Views reachable in the helpdesk front-end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "param", rename_all = "snake_case")]
pub enum AppRoute {
    Login,
    Dashboard,
    Admin,
    AdminUsers,
    AdminRoles,
    AdminHierarchy,
    TicketDetails(String),
    CreateTicket,
    Chat,
    Infrastructure,
    Network,
    Tickets,
}

/// Who may see a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteGate {
    AnonymousOnly,
    Authenticated,
    EmployeeOnly,
    AdminOnly,
    Role(&'static str),
}

impl RouteGate {
    pub fn admits(&self, session: Option<&User>) -> bool {
        match (self, session) {
            (RouteGate::AnonymousOnly, session) => session.is_none(),
            (_, None) => false,
            (RouteGate::Authenticated, Some(_)) => true,
            (RouteGate::EmployeeOnly, Some(user)) => !user.is_admin,
            (RouteGate::AdminOnly, Some(user)) => user.is_admin,
            (RouteGate::Role(role_id), Some(user)) => user.role == *role_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Navigation {
    Render { route: AppRoute },
    Redirect { to: String },
}

impl AppRoute {
    /// Parses a path. Returns `None` for `/` and unknown paths.
    pub fn parse(path: &str) -> Option<AppRoute> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let route = match trimmed {
            "/login" => AppRoute::Login,
            "/dashboard" => AppRoute::Dashboard,
            "/admin" => AppRoute::Admin,
            "/admin/users" => AppRoute::AdminUsers,
            "/admin/roles" => AppRoute::AdminRoles,
            "/admin/hierarchy" => AppRoute::AdminHierarchy,
            "/create-ticket" => AppRoute::CreateTicket,
            "/chat" => AppRoute::Chat,
            "/infrastructure" => AppRoute::Infrastructure,
            "/network" => AppRoute::Network,
            "/tickets" => AppRoute::Tickets,
            other => {
                let id = other.strip_prefix("/ticket/")?;
                if id.is_empty() || id.contains('/') {
                    return None;
                }
                AppRoute::TicketDetails(id.to_string())
            }
        };
        Some(route)
    }

    /// Name of the view the route renders.
    pub fn view(&self) -> &'static str {
        match self {
            AppRoute::Login => "login",
            AppRoute::Dashboard => "dashboard",
            AppRoute::Admin => "admin",
            AppRoute::AdminUsers => "admin_users",
            AppRoute::AdminRoles => "admin_roles",
            AppRoute::AdminHierarchy => "admin_hierarchy",
            AppRoute::TicketDetails(_) => "ticket_details",
            AppRoute::CreateTicket => "create_ticket",
            AppRoute::Chat => "chat",
            AppRoute::Infrastructure => "infrastructure",
            AppRoute::Network => "network",
            AppRoute::Tickets => "tickets",
        }
    }

    pub fn param(&self) -> Option<&str> {
        match self {
            AppRoute::TicketDetails(id) => Some(id),
            _ => None,
        }
    }

    pub fn gate(&self) -> RouteGate {
        match self {
            AppRoute::Login => RouteGate::AnonymousOnly,
            AppRoute::Dashboard | AppRoute::CreateTicket | AppRoute::Chat => {
                RouteGate::EmployeeOnly
            }
            AppRoute::Admin
            | AppRoute::AdminUsers
            | AppRoute::AdminRoles
            | AppRoute::AdminHierarchy => RouteGate::AdminOnly,
            AppRoute::TicketDetails(_) | AppRoute::Tickets => RouteGate::Authenticated,
            AppRoute::Infrastructure | AppRoute::Network => RouteGate::Role(ARCHITECT_ROLE_ID),
        }
    }
}

/// Where a user lands after signing in.
pub fn landing_path(session: Option<&User>) -> &'static str {
    match session {
        Some(user) if user.is_admin => ADMIN_LANDING,
        Some(_) => EMPLOYEE_LANDING,
        None => LOGIN_PATH,
    }
}

/// Resolves a requested path for the current session.
pub fn navigate(session: Option<&User>, path: &str) -> Navigation {
    let Some(route) = AppRoute::parse(path) else {
        return Navigation::Redirect {
            to: landing_path(session).to_string(),
        };
    };
    let gate = route.gate();
    if gate.admits(session) {
        return Navigation::Render { route };
    }
    let to = match gate {
        RouteGate::AnonymousOnly => landing_path(session),
        _ => LOGIN_PATH,
    };
    Navigation::Redirect { to: to.to_string() }
}
