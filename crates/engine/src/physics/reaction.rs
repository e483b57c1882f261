use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use super::Rectangle;

pub type ReactionFn<E> = Rc<dyn Fn(&mut E, &mut E)>;

/// Tag-keyed callbacks fired when the owner overlaps another entity.
///
/// Callbacks receive `(owner, other)` and run in registration order. A tag
/// may be registered more than once; every matching entry fires.
pub struct CollisionReactions<E> {
    entries: Vec<(String, ReactionFn<E>)>,
}

impl<E> Default for CollisionReactions<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E> Clone for CollisionReactions<E> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<E> fmt::Debug for CollisionReactions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(tag, _)| tag))
            .finish()
    }
}

impl<E> CollisionReactions<E> {
    pub fn on(&mut self, tag: impl Into<String>, callback: impl Fn(&mut E, &mut E) + 'static) {
        self.entries.push((tag.into(), Rc::new(callback)));
    }

    pub fn with(
        mut self,
        tag: impl Into<String>,
        callback: impl Fn(&mut E, &mut E) + 'static,
    ) -> Self {
        self.on(tag, callback);
        self
    }

    fn matching(&self, tags: &BTreeSet<String>) -> Vec<ReactionFn<E>> {
        self.entries
            .iter()
            .filter(|(tag, _)| tags.contains(tag))
            .map(|(_, callback)| Rc::clone(callback))
            .collect()
    }
}

/// Anything the scene can run pairwise reactions on.
pub trait HasReactions: Sized {
    fn reactions(&self) -> &CollisionReactions<Self>;
    fn tags(&self) -> &BTreeSet<String>;
    fn collision_box(&self) -> Rectangle;
}

/// Fires every reaction of `owner` whose tag `other` carries. Returns how
/// many callbacks ran.
pub fn handle<E: HasReactions>(owner: &mut E, other: &mut E) -> usize {
    let callbacks = owner.reactions().matching(other.tags());
    for callback in &callbacks {
        callback(owner, other);
    }
    callbacks.len()
}

/// Runs both directions of reactions if the two boxes overlap.
pub fn resolve_pair<E: HasReactions>(a: &mut E, b: &mut E) -> bool {
    if !a.collision_box().intersects(&b.collision_box()) {
        return false;
    }
    handle(a, b);
    handle(b, a);
    true
}
