//! Path parameter bindings.

use std::sync::Arc;

/// Parameters bound by a route lookup.
///
/// Names borrow from the router, values borrow from the looked-up path. Values
/// are raw; no percent-decoding is applied.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Params<'r, 'p> {
    entries: Vec<(&'r Arc<str>, &'p str)>,
}

impl<'r, 'p> Params<'r, 'p> {
    pub(crate) fn push(&mut self, name: &'r Arc<str>, value: &'p str) {
        self.entries.push((name, value));
    }

    pub(crate) fn pop(&mut self) {
        self.entries.pop();
    }

    /// Returns the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&'p str> {
        self.entries
            .iter()
            .find(|(key, _)| &***key == name)
            .map(|(_, value)| *value)
    }

    /// Iterates over `(name, value)` pairs in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&'r str, &'p str)> + '_ {
        self.entries.iter().map(|&(key, value)| (&**key, value))
    }

    /// Returns the number of bound parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no parameters were bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entries(&self) -> &[(&'r Arc<str>, &'p str)] {
        &self.entries
    }
}

/// Owned path parameters held by a [`Context`](crate::Context).
///
/// Value buffers are kept across resets so a pooled context does not
/// reallocate them for every request.
#[derive(Debug, Default)]
pub struct PathParams {
    slots: Vec<(Arc<str>, String)>,
    len: usize,
}

impl PathParams {
    /// Creates new empty path params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a parameter value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.active()
            .iter()
            .find(|(key, _)| &**key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Parses a parameter as a specific type.
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| v.parse().ok())
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.active().iter().map(|(k, v)| (&**k, v.as_str()))
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a parameter, replacing an existing value with the same name.
    pub fn insert(&mut self, name: impl Into<Arc<str>>, value: &str) {
        let name = name.into();
        if let Some(index) = self.active().iter().position(|(key, _)| *key == name) {
            let slot = &mut self.slots[index].1;
            slot.clear();
            slot.push_str(value);
            return;
        }
        self.push_slot(name, value);
    }

    /// Replaces the current bindings with the ones from a lookup.
    pub(crate) fn fill(&mut self, params: &Params<'_, '_>) {
        self.clear();
        for &(name, value) in params.entries() {
            self.push_slot(Arc::clone(name), value);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }

    fn push_slot(&mut self, name: Arc<str>, value: &str) {
        if let Some(slot) = self.slots.get_mut(self.len) {
            slot.0 = name;
            slot.1.clear();
            slot.1.push_str(value);
        } else {
            self.slots.push((name, value.to_string()));
        }
        self.len += 1;
    }

    fn active(&self) -> &[(Arc<str>, String)] {
        &self.slots[..self.len]
    }
}
