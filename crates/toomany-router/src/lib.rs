//! toomany-router: zero-dependency segment trie HTTP router
//!
//! Maps `(method, path)` to a numeric handler id. The stub server keeps its
//! responses in a side table indexed by that id.
//!
//! ## Path Syntax
//! - `:name` - Named parameter (captures one segment)
//! - `*` or `*name` - Wildcard (captures one or more remaining segments)
//!
//! Request paths match literally: `/healthcheck/` and `//healthcheck` do not
//! match a `/healthcheck` route. Empty segments are only tolerated inside a
//! wildcard remainder.
//!
//! ## Priority
//! 1. Exact static match (highest)
//! 2. Parameter match
//! 3. Wildcard match (lowest)
//!
//! ## Example
//! ```
//! use toomany_router::Router;
//!
//! let mut router = Router::new();
//! router.insert("GET", "/healthcheck", 0);
//! router.insert("POST", "/*any_path", 1);
//!
//! let m = router.find("POST", "/api/v2/call").unwrap();
//! assert_eq!(m.handler_id, 1);
//! assert_eq!(m.params, vec![("any_path".to_string(), "api/v2/call".to_string())]);
//!
//! // The catch-all never matches an empty path.
//! assert!(router.find("POST", "/").is_none());
//! ```

use std::collections::HashMap;

/// Route match result
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// The matched handler ID
    pub handler_id: u32,
    /// Captured path parameters as (name, value) pairs
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct Node {
    children: HashMap<String, Node>,
    param_child: Option<Box<ParamNode>>,
    wildcard_child: Option<Box<WildcardNode>>,
    handler_id: Option<u32>,
}

#[derive(Debug)]
struct ParamNode {
    name: String,
    node: Node,
}

#[derive(Debug)]
struct WildcardNode {
    name: String,
    handler_id: u32,
}

/// Segment trie router keyed by HTTP method
#[derive(Debug, Default)]
pub struct Router {
    /// Method -> Trie root
    trees: HashMap<String, Node>,
}

impl Router {
    /// Create a new router
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a route
    ///
    /// Registering the same method and path twice replaces the handler id.
    ///
    /// # Example
    /// ```
    /// use toomany_router::Router;
    ///
    /// let mut router = Router::new();
    /// router.insert("GET", "/users/:id", 0);
    /// router.insert("POST", "/users", 1);
    /// ```
    pub fn insert(&mut self, method: &str, path: &str, handler_id: u32) {
        let tree = self.trees.entry(method.to_uppercase()).or_default();
        let segments = pattern_segments(path);
        Self::insert_node(tree, &segments, handler_id);
    }

    fn insert_node(node: &mut Node, segments: &[&str], handler_id: u32) {
        let Some((&segment, rest)) = segments.split_first() else {
            node.handler_id = Some(handler_id);
            return;
        };

        if let Some(name) = segment.strip_prefix(':') {
            let param = node.param_child.get_or_insert_with(|| {
                Box::new(ParamNode {
                    name: name.to_string(),
                    node: Node::default(),
                })
            });
            Self::insert_node(&mut param.node, rest, handler_id);
        } else if let Some(name) = segment.strip_prefix('*') {
            // Anything after a wildcard is unreachable, so it is dropped.
            let wildcard_name = if name.is_empty() { "*" } else { name };
            node.wildcard_child = Some(Box::new(WildcardNode {
                name: wildcard_name.to_string(),
                handler_id,
            }));
        } else {
            let child = node.children.entry(segment.to_string()).or_default();
            Self::insert_node(child, rest, handler_id);
        }
    }

    /// Find a matching route
    ///
    /// # Returns
    /// `Some(Match)` with handler_id and captured params, or `None` if no match
    ///
    /// # Example
    /// ```
    /// use toomany_router::Router;
    ///
    /// let mut router = Router::new();
    /// router.insert("GET", "/users/:id", 0);
    ///
    /// let m = router.find("GET", "/users/42").unwrap();
    /// assert_eq!(m.handler_id, 0);
    /// assert_eq!(m.params[0], ("id".to_string(), "42".to_string()));
    /// ```
    pub fn find(&self, method: &str, path: &str) -> Option<Match> {
        self.lookup(method, path, true)
    }

    /// Find a route without descending into wildcard segments
    ///
    /// A path that matches here is one the route table names explicitly,
    /// as opposed to one swallowed by a catch-all.
    pub fn find_exact(&self, method: &str, path: &str) -> Option<Match> {
        self.lookup(method, path, false)
    }

    fn lookup(&self, method: &str, path: &str, wildcards: bool) -> Option<Match> {
        let tree = self.trees.get(&method.to_uppercase())?;
        let segments = request_segments(path);
        let mut params = Vec::new();
        Self::find_node(tree, &segments, &mut params, wildcards)
    }

    fn find_node(
        node: &Node,
        segments: &[&str],
        params: &mut Vec<(String, String)>,
        wildcards: bool,
    ) -> Option<Match> {
        let Some((&segment, rest)) = segments.split_first() else {
            return node.handler_id.map(|id| Match {
                handler_id: id,
                params: params.clone(),
            });
        };

        if let Some(child) = node.children.get(segment) {
            if let Some(m) = Self::find_node(child, rest, params, wildcards) {
                return Some(m);
            }
        }

        if let (Some(param), false) = (&node.param_child, segment.is_empty()) {
            params.push((param.name.clone(), segment.to_string()));
            if let Some(m) = Self::find_node(&param.node, rest, params, wildcards) {
                return Some(m);
            }
            params.pop();
        }

        // The remainder must hold at least one non-empty segment.
        if !wildcards || segments.iter().all(|s| s.is_empty()) {
            return None;
        }
        node.wildcard_child.as_ref().map(|wildcard| {
            params.push((wildcard.name.clone(), segments.join("/")));
            Match {
                handler_id: wildcard.handler_id,
                params: params.clone(),
            }
        })
    }

    /// Get all registered methods, sorted
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.trees.keys().cloned().collect();
        methods.sort();
        methods
    }
}

/// Route patterns are normalised: `/users/` registers the same route as `/users`.
fn pattern_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Request paths keep their empty segments so they only match literally.
fn request_segments(path: &str) -> Vec<&str> {
    let rest = path.strip_prefix('/').unwrap_or(path);
    if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('/').collect()
    }
}
