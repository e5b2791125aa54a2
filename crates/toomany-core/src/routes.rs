//! Immutable route table and the stub's fixed route set
//!
//! Routes are registered once through [`RouteTableBuilder`] and the resulting
//! [`RouteTable`] is shared read-only by every connection. Handlers are
//! pre-built [`Response`] values indexed by the router's handler id, so
//! dispatch is a trie lookup followed by a clone.

use crate::{Error, Method, Response, Result, StatusCode};
use toomany_router::Router;

/// Path of the liveness route
pub const HEALTHCHECK_PATH: &str = "/healthcheck";
/// Body returned by the liveness route
pub const HEALTHCHECK_BODY: &str = "ok";
/// Catch-all pattern the 429 route is registered under
pub const CATCH_ALL_PATH: &str = "/*any_path";
/// Body returned for every rate-limited POST
pub const TOO_MANY_REQUESTS_BODY: &str = "You're making too many requests";

/// Build the stub server's route table
///
/// | Method | Path | Status | Body |
/// |---|---|---|---|
/// | GET | `/healthcheck` | 200 | `ok` |
/// | POST | any non-empty path | 429 | `You're making too many requests` |
pub fn stub_routes() -> Result<RouteTable> {
    RouteTable::builder()
        .get(
            HEALTHCHECK_PATH,
            Response::html(StatusCode::OK, HEALTHCHECK_BODY),
        )
        .post(
            CATCH_ALL_PATH,
            Response::html(StatusCode::TOO_MANY_REQUESTS, TOO_MANY_REQUESTS_BODY),
        )
        .build()
}

/// Read-only mapping of `(method, path pattern)` to a canned response
#[derive(Debug)]
pub struct RouteTable {
    router: Router,
    responses: Vec<Response>,
}

impl RouteTable {
    /// Start building a route table
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Resolve a request to its response
    ///
    /// Never fails: unmatched requests get 405 when another method names the
    /// path explicitly, 404 otherwise. `HEAD` falls back to the `GET` route.
    pub fn dispatch(&self, method: &str, path: &str) -> Response {
        if let Some(res) = self.lookup(method, path) {
            return res.clone();
        }
        if method.eq_ignore_ascii_case(Method::Head.as_str()) {
            if let Some(res) = self.lookup(Method::Get.as_str(), path) {
                return res.clone();
            }
        }

        let allowed = self.allowed_methods(path);
        if allowed.is_empty() {
            Response::not_found()
        } else {
            Response::method_not_allowed(&allowed)
        }
    }

    /// Methods that would succeed for `path`, or empty if the path is unknown
    ///
    /// A path is known when some route matches it without a wildcard. A
    /// catch-all alone does not make a path known, otherwise every `GET` to a
    /// typo would answer 405 instead of 404.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let methods = self.router.methods();
        let known = methods
            .iter()
            .any(|m| self.router.find_exact(m, path).is_some());
        if !known {
            return Vec::new();
        }

        let mut allowed: Vec<Method> = methods
            .iter()
            .filter(|m| self.router.find(m, path).is_some())
            .filter_map(|m| m.parse().ok())
            .collect();
        if allowed.contains(&Method::Get) && !allowed.contains(&Method::Head) {
            allowed.push(Method::Head);
        }
        allowed.sort_by_key(|m| m.as_str());
        allowed
    }

    fn lookup(&self, method: &str, path: &str) -> Option<&Response> {
        let matched = self.router.find(method, path)?;
        self.responses.get(matched.handler_id as usize)
    }
}

/// Collects routes before freezing them into a [`RouteTable`]
///
/// Methods and paths are validated by [`RouteTableBuilder::build`], not when
/// they are added.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    routes: Vec<(String, String, Response)>,
}

impl RouteTableBuilder {
    /// Add a route
    pub fn route(
        mut self,
        method: impl Into<String>,
        path: impl Into<String>,
        response: Response,
    ) -> Self {
        self.routes.push((method.into(), path.into(), response));
        self
    }

    /// Add a GET route
    pub fn get(self, path: impl Into<String>, response: Response) -> Self {
        self.route(Method::Get.as_str(), path, response)
    }

    /// Add a POST route
    pub fn post(self, path: impl Into<String>, response: Response) -> Self {
        self.route(Method::Post.as_str(), path, response)
    }

    /// Freeze the routes
    ///
    /// Fails with [`Error::InvalidMethod`] for a method the server cannot
    /// route and [`Error::InvalidPath`] for a pattern without a leading `/`.
    pub fn build(self) -> Result<RouteTable> {
        let mut router = Router::new();
        let mut responses = Vec::with_capacity(self.routes.len());

        for (method, path, response) in self.routes {
            let method: Method = method.parse()?;
            if !path.starts_with('/') {
                return Err(Error::InvalidPath(path));
            }
            let handler_id = u32::try_from(responses.len())
                .map_err(|_| Error::InvalidPath(format!("too many routes at {path}")))?;
            router.insert(method.as_str(), &path, handler_id);
            responses.push(response);
        }

        Ok(RouteTable { router, responses })
    }
}
