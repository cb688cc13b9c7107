//! Naming and collection helpers shared by the translator stages.

use std::collections::HashSet;
use std::hash::Hash;

/// Sanitize a string to be a valid HLSL identifier.
pub fn sanitize_hlsl_ident(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// HLSL spelling of a qualified host type name: `Demo.Point` -> `Demo_Point`.
pub fn type_ident(qualified: &str) -> String {
    sanitize_hlsl_ident(qualified)
}

/// Macro name for a compile-time constant, unique per owner and field.
pub fn constant_ident(owner: &str, name: &str) -> String {
    format!("__{}__{}", type_ident(owner), name)
}

/// Global name for a static field.
pub fn static_field_ident(owner: &str, name: &str) -> String {
    format!("__{}__{}", type_ident(owner), name)
}

/// Function name for a discovered method.
pub fn method_ident(owner: &str, name: &str) -> String {
    format!("{}__{}", type_ident(owner), name)
}

/// Insertion-ordered set. Items appended while a consumer walks `cursor..`
/// form the pending worklist; membership is checked once per identity.
#[derive(Clone, Debug)]
pub struct OrderedSet<T> {
    items: Vec<T>,
    seen: HashSet<T>,
}

impl<T> Default for OrderedSet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> OrderedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the item was not present.
    pub fn insert(&mut self, item: T) -> bool {
        if self.seen.contains(&item) {
            return false;
        }
        self.seen.insert(item.clone());
        self.items.push(item);
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        self.seen.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}
