//! Copy-on-write state container.
//!
//! The state lives behind an `Arc`; every update produces a new value and swaps it in,
//! so a snapshot taken before an update keeps seeing the old tree. Subscribers run
//! synchronously, in registration order, right after the swap.

use std::sync::Arc;

pub type SubscriberId = u64;

type Subscriber<T> = Box<dyn FnMut(&T)>;

pub struct Store<T> {
    state: Arc<T>,
    subscribers: Vec<(SubscriberId, Subscriber<T>)>,
    next_id: SubscriberId,
}

impl<T: 'static> Store<T> {
    pub fn new(initial: T) -> Self {
        Self {
            state: Arc::new(initial),
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn get(&self) -> &T {
        &self.state
    }

    pub fn snapshot(&self) -> Arc<T> {
        self.state.clone()
    }

    /// Replaces the state with the value produced by `reducer`. On error the state and
    /// subscribers are left untouched.
    pub fn try_apply<E>(&mut self, reducer: impl FnOnce(&T) -> Result<T, E>) -> Result<(), E> {
        let next = reducer(&self.state)?;
        self.replace(next);
        Ok(())
    }

    pub fn apply(&mut self, reducer: impl FnOnce(&T) -> T) {
        let next = reducer(&self.state);
        self.replace(next);
    }

    fn replace(&mut self, next: T) {
        self.state = Arc::new(next);
        let state = self.state.clone();
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&state);
        }
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&T) + 'static) -> SubscriberId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Calls `on_change` only when the value picked out by `select` differs from the
    /// last one seen.
    pub fn watch<V, S, F>(&mut self, select: S, mut on_change: F) -> SubscriberId
    where
        V: PartialEq + 'static,
        S: Fn(&T) -> V + 'static,
        F: FnMut(&V) + 'static,
    {
        let mut last = select(&self.state);
        self.subscribe(move |state| {
            let current = select(state);
            if current != last {
                on_change(&current);
                last = current;
            }
        })
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Pair {
        left: i32,
        right: i32,
    }

    #[test]
    fn snapshots_survive_updates() {
        let mut store = Store::new(Pair { left: 1, right: 2 });
        let before = store.snapshot();
        store.apply(|p| Pair { left: 10, ..p.clone() });
        assert_eq!(before.left, 1);
        assert_eq!(store.get().left, 10);
        assert_eq!(store.get().right, 2);
    }

    #[test]
    fn failed_reducer_leaves_state_and_skips_subscribers() {
        let calls = Rc::new(RefCell::new(0));
        let mut store = Store::new(Pair { left: 1, right: 2 });
        let seen = calls.clone();
        store.subscribe(move |_| *seen.borrow_mut() += 1);
        let result: Result<(), &str> = store.try_apply(|_| Err("nope"));
        assert!(result.is_err());
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(store.get(), &Pair { left: 1, right: 2 });
    }

    #[test]
    fn watchers_fire_only_on_their_path() {
        let lefts = Rc::new(RefCell::new(Vec::new()));
        let mut store = Store::new(Pair { left: 0, right: 0 });
        let sink = lefts.clone();
        store.watch(|p| p.left, move |v| sink.borrow_mut().push(*v));
        store.apply(|p| Pair { right: 5, ..p.clone() });
        store.apply(|p| Pair { left: 3, ..p.clone() });
        store.apply(|p| Pair { left: 3, ..p.clone() });
        assert_eq!(*lefts.borrow(), vec![3]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let calls = Rc::new(RefCell::new(0));
        let mut store = Store::new(Pair { left: 0, right: 0 });
        let seen = calls.clone();
        let id = store.subscribe(move |_| *seen.borrow_mut() += 1);
        store.apply(|p| p.clone());
        assert!(store.unsubscribe(id));
        store.apply(|p| p.clone());
        assert_eq!(*calls.borrow(), 1);
        assert!(!store.unsubscribe(id));
    }
}
