//! Route dispatch table.
//!
//! # Responsibilities
//! - Hold the ordered (matcher → route kind) list
//! - Look up the first route matching a path
//! - Return the match or an explicit `None` (no catch-all in this table)

use axum::http::Method;
use url::Url;

use crate::routing::matcher::{ExactMatcher, Matcher, MountMatcher, PathPrefixMatcher};

/// Prefixes the dev server serves its own tooling under.
pub const TOOLING_PREFIXES: [&str; 4] = ["/@vite", "/@fs", "/src", "/node_modules"];

/// Mount point of the checklist application.
pub const CHECKLIST_MOUNT: &str = "/checklist";

/// Which frontend surface a dev-asset route belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevMount {
    /// The checklist SPA under `/checklist`; extensionless misses fall back
    /// to the bundle's root document.
    Checklist,
    /// Dev-server internals, proxied at their own path.
    Tooling,
}

/// Where a matched request goes.
#[derive(Debug, Clone)]
pub enum RouteKind {
    /// Dev server when live, static bundle otherwise.
    DevAsset {
        mount: DevMount,
        /// Check for protocol upgrades before anything else.
        upgrade_redirect: bool,
    },
    /// Fixed external host, reached through the retry coordinator.
    External { base: Url, methods: Vec<Method> },
}

/// A single entry of the table.
#[derive(Debug)]
pub struct Route {
    pub name: &'static str,
    matcher: Box<dyn Matcher>,
    pub kind: RouteKind,
}

impl Route {
    pub fn new(name: &'static str, matcher: impl Matcher + 'static, kind: RouteKind) -> Self {
        Self {
            name,
            matcher: Box::new(matcher),
            kind,
        }
    }
}

/// Successful lookup: the route plus the path below its prefix.
#[derive(Debug)]
pub struct RouteMatch<'r, 'p> {
    pub route: &'r Route,
    pub remainder: &'p str,
}

/// Immutable, ordered route table; first match wins.
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The gateway's fixed table.
    pub fn standard(webhook_base: Url, erp_base: Url) -> Self {
        let external_methods = vec![
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::DELETE,
        ];
        let tooling = RouteKind::DevAsset {
            mount: DevMount::Tooling,
            upgrade_redirect: true,
        };

        let mut routes = vec![Route::new(
            "checklist",
            MountMatcher::new(CHECKLIST_MOUNT),
            RouteKind::DevAsset {
                mount: DevMount::Checklist,
                upgrade_redirect: false,
            },
        )];
        routes.push(Route::new(
            "react-refresh",
            ExactMatcher::new("/@react-refresh"),
            tooling.clone(),
        ));
        for prefix in TOOLING_PREFIXES {
            routes.push(Route::new("dev-tooling", PathPrefixMatcher::new(prefix), tooling.clone()));
        }
        routes.push(Route::new(
            "webhook",
            PathPrefixMatcher::new("/api/webhook"),
            RouteKind::External {
                base: webhook_base,
                methods: external_methods.clone(),
            },
        ));
        routes.push(Route::new(
            "erp",
            PathPrefixMatcher::new("/ssw"),
            RouteKind::External {
                base: erp_base,
                methods: external_methods,
            },
        ));

        Self::new(routes)
    }

    pub fn dispatch<'r, 'p>(&'r self, path: &'p str) -> Option<RouteMatch<'r, 'p>> {
        self.routes.iter().find_map(|route| {
            route
                .matcher
                .strip(path)
                .map(|remainder| RouteMatch { route, remainder })
        })
    }
}
