//! Segment trie used for route lookup.
//!
//! Every node has three kinds of children: literal segments keyed by text, at
//! most one named parameter child and at most one named wildcard child.
//! Lookup tries them in that order and backtracks, so `/users/new` beats
//! `/users/:id` and both beat `/users/*rest`. Each node holds a per-method
//! table of indices into the router's route list.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, RouterError};
use crate::params::Params;
use crate::path::{PathPattern, PathSegment};
use crate::request::{Method, MethodSet};

#[derive(Debug, Default)]
pub(crate) struct Node {
    statics: HashMap<String, Node>,
    param: Option<(Arc<str>, Box<Node>)>,
    wildcard: Option<(Arc<str>, Box<Node>)>,
    routes: [Option<usize>; Method::COUNT],
}

impl Node {
    /// Returns the route registered for `method` on this node.
    pub(crate) fn route(&self, method: Method) -> Option<usize> {
        self.routes[method.index()]
    }

    /// Returns the methods registered on this node.
    pub(crate) fn methods(&self) -> MethodSet {
        Method::ALL
            .into_iter()
            .filter(|m| self.route(*m).is_some())
            .collect()
    }

    pub(crate) fn has_routes(&self) -> bool {
        self.routes.iter().any(Option::is_some)
    }

    fn find<'r, 'p, F>(
        &'r self,
        path: &'p str,
        params: &mut Params<'r, 'p>,
        accept: &F,
    ) -> Option<&'r Node>
    where
        F: Fn(&Node) -> bool,
    {
        let rest = path.trim_start_matches('/');
        if rest.is_empty() {
            return accept(self).then_some(self);
        }

        let end = rest.find('/').unwrap_or(rest.len());
        let (segment, tail) = rest.split_at(end);

        if let Some(child) = self.statics.get(segment) {
            if let Some(found) = child.find(tail, params, accept) {
                return Some(found);
            }
        }

        if let Some((name, child)) = &self.param {
            params.push(name, segment);
            if let Some(found) = child.find(tail, params, accept) {
                return Some(found);
            }
            params.pop();
        }

        if let Some((name, child)) = &self.wildcard {
            if accept(child) {
                params.push(name, rest);
                return Some(child);
            }
        }

        None
    }
}

/// Route trie keyed by path segments.
#[derive(Debug, Default)]
pub(crate) struct Trie {
    root: Node,
}

impl Trie {
    /// Registers `route` for `method` at `pattern`.
    ///
    /// The trie is left untouched when an error is returned.
    pub(crate) fn insert(&mut self, method: Method, pattern: &PathPattern, route: usize) -> Result<()> {
        self.check(method, pattern)?;

        let mut node = &mut self.root;
        for segment in pattern.segments() {
            node = match segment {
                PathSegment::Literal(text) => node.statics.entry(text.clone()).or_default(),
                PathSegment::Param(name) => {
                    &mut *node
                        .param
                        .get_or_insert_with(|| (Arc::clone(name), Box::default()))
                        .1
                }
                PathSegment::Wildcard(name) => {
                    &mut *node
                        .wildcard
                        .get_or_insert_with(|| (Arc::clone(name), Box::default()))
                        .1
                }
            };
        }
        node.routes[method.index()] = Some(route);
        Ok(())
    }

    /// Walks the existing nodes along `pattern` looking for name clashes and
    /// duplicates, without creating anything.
    fn check(&self, method: Method, pattern: &PathPattern) -> Result<()> {
        let mut node = &self.root;
        for segment in pattern.segments() {
            let next = match segment {
                PathSegment::Literal(text) => node.statics.get(text),
                PathSegment::Param(name) => existing_child(pattern, segment, name, &node.param, ':')?,
                PathSegment::Wildcard(name) => {
                    existing_child(pattern, segment, name, &node.wildcard, '*')?
                }
            };
            match next {
                Some(child) => node = child,
                None => return Ok(()),
            }
        }

        if node.route(method).is_some() {
            return Err(RouterError::DuplicateRoute {
                method,
                pattern: pattern.pattern().to_string(),
            });
        }
        Ok(())
    }

    /// Resolves `path` to the first node, in precedence order, for which
    /// `accept` holds.
    pub(crate) fn find<'r, 'p, F>(
        &'r self,
        path: &'p str,
        accept: F,
    ) -> Option<(&'r Node, Params<'r, 'p>)>
    where
        F: Fn(&Node) -> bool,
    {
        let mut params = Params::default();
        let node = self.root.find(path, &mut params, &accept)?;
        Some((node, params))
    }
}

fn existing_child<'t>(
    pattern: &PathPattern,
    segment: &PathSegment,
    name: &Arc<str>,
    child: &'t Option<(Arc<str>, Box<Node>)>,
    sigil: char,
) -> Result<Option<&'t Node>> {
    match child {
        Some((existing, node)) if existing == name => Ok(Some(&**node)),
        Some((existing, _)) => Err(RouterError::RouteConflict {
            pattern: pattern.pattern().to_string(),
            segment: segment.to_pattern_string(),
            existing: format!("{sigil}{existing}"),
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie(routes: &[&str]) -> Trie {
        let mut trie = Trie::default();
        for (index, pattern) in routes.iter().enumerate() {
            let pattern = PathPattern::parse(pattern).unwrap();
            trie.insert(Method::Get, &pattern, index).unwrap();
        }
        trie
    }

    fn resolve(trie: &Trie, path: &str) -> Option<(usize, Vec<(String, String)>)> {
        let (node, params) = trie.find(path, |node| node.route(Method::Get).is_some())?;
        let bound = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Some((node.route(Method::Get)?, bound))
    }

    #[test]
    fn test_static_match() {
        let trie = trie(&["/", "/users", "/users/list"]);
        assert_eq!(resolve(&trie, "/"), Some((0, vec![])));
        assert_eq!(resolve(&trie, "/users"), Some((1, vec![])));
        assert_eq!(resolve(&trie, "/users/list"), Some((2, vec![])));
        assert_eq!(resolve(&trie, "/missing"), None);
    }

    #[test]
    fn test_trailing_and_empty_segments_ignored() {
        let trie = trie(&["/users/list"]);
        assert_eq!(resolve(&trie, "/users/list/"), Some((0, vec![])));
        assert_eq!(resolve(&trie, "//users//list"), Some((0, vec![])));
    }

    #[test]
    fn test_param_and_wildcard() {
        let trie = trie(&["/users/:id/files/*path"]);
        let (route, params) = resolve(&trie, "/users/42/files/a/b/c.txt").unwrap();
        assert_eq!(route, 0);
        assert_eq!(
            params,
            vec![
                ("id".to_string(), "42".to_string()),
                ("path".to_string(), "a/b/c.txt".to_string()),
            ]
        );
    }

    #[test]
    fn test_wildcard_requires_remainder() {
        let trie = trie(&["/static/*file"]);
        assert!(resolve(&trie, "/static").is_none());
        assert!(resolve(&trie, "/static/").is_none());
        assert!(resolve(&trie, "/static/css/site.css").is_some());
    }

    #[test]
    fn test_static_beats_param_beats_wildcard() {
        let trie = trie(&["/users/new", "/users/:id", "/users/*rest"]);
        assert_eq!(resolve(&trie, "/users/new").unwrap().0, 0);
        assert_eq!(resolve(&trie, "/users/7").unwrap().0, 1);
        assert_eq!(resolve(&trie, "/users/7/posts").unwrap().0, 2);
    }

    #[test]
    fn test_backtracks_out_of_dead_static_branch() {
        let trie = trie(&["/users/new/form", "/users/:id"]);
        let (route, params) = resolve(&trie, "/users/new").unwrap();
        assert_eq!(route, 1);
        assert_eq!(params, vec![("id".to_string(), "new".to_string())]);
    }

    #[test]
    fn test_failed_branch_does_not_leak_params() {
        let trie = trie(&["/a/:x/b", "/a/*rest"]);
        let (route, params) = resolve(&trie, "/a/1/c").unwrap();
        assert_eq!(route, 1);
        assert_eq!(params, vec![("rest".to_string(), "1/c".to_string())]);
    }

    #[test]
    fn test_param_name_conflict() {
        let mut trie = trie(&["/users/:id"]);
        let pattern = PathPattern::parse("/users/:name/posts").unwrap();
        let err = trie.insert(Method::Get, &pattern, 1).unwrap_err();
        assert_eq!(
            err,
            RouterError::RouteConflict {
                pattern: "/users/:name/posts".to_string(),
                segment: ":name".to_string(),
                existing: ":id".to_string(),
            }
        );
        assert!(resolve(&trie, "/users/1/posts").is_none());
    }

    #[test]
    fn test_duplicate_route() {
        let mut trie = trie(&["/users/:id"]);
        let pattern = PathPattern::parse("/users/:id/").unwrap();
        let err = trie.insert(Method::Get, &pattern, 1).unwrap_err();
        assert!(matches!(err, RouterError::DuplicateRoute { method: Method::Get, .. }));

        trie.insert(Method::Post, &pattern, 1).unwrap();
        let (node, _) = trie.find("/users/1", Node::has_routes).unwrap();
        assert_eq!(node.methods().to_header_value(), "GET, POST");
    }

    #[test]
    fn test_walk_skips_nodes_without_wanted_method() {
        let mut trie = trie(&["/users/new"]);
        let pattern = PathPattern::parse("/users/:id").unwrap();
        trie.insert(Method::Post, &pattern, 1).unwrap();

        let (node, params) = trie.find("/users/new", |node| node.route(Method::Post).is_some()).unwrap();
        assert_eq!(node.route(Method::Post), Some(1));
        assert_eq!(params.get("id"), Some("new"));

        let (node, params) = trie.find("/users/new", Node::has_routes).unwrap();
        assert_eq!(node.route(Method::Get), Some(0));
        assert!(params.is_empty());
    }

    #[test]
    fn test_wildcard_name_conflict() {
        let mut trie = trie(&["/files/*a"]);
        let pattern = PathPattern::parse("/files/*b").unwrap();
        let err = trie.insert(Method::Post, &pattern, 1).unwrap_err();
        assert_eq!(
            err,
            RouterError::RouteConflict {
                pattern: "/files/*b".to_string(),
                segment: "*b".to_string(),
                existing: "*a".to_string(),
            }
        );

        let (node, params) = trie.find("/files/x/y", Node::has_routes).unwrap();
        assert_eq!(node.methods().to_header_value(), "GET");
        assert_eq!(params.get("a"), Some("x/y"));
        assert_eq!(params.get("b"), None);
    }
}
