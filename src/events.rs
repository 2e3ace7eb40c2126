//! Listener registries for panel events.
//!
//! A listener stays registered for exactly as long as its [`Subscription`] is alive.
//! One-shot listeners remove themselves after the first event they see.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Listener<E, C> = Box<dyn FnMut(&E, &mut C)>;

struct Slot<E, C> {
    id: u64,
    once: bool,
    active: Rc<Cell<bool>>,
    listener: Option<Listener<E, C>>,
}

struct Registry<E, C> {
    slots: Vec<Slot<E, C>>,
    next_id: u64,
}

impl<E, C> Registry<E, C> {
    fn remove(&mut self, id: u64) {
        if let Some(index) = self.slots.iter().position(|slot| slot.id == id) {
            let slot = self.slots.remove(index);
            slot.active.set(false);
        }
    }
}

/// Dispatches events of type `E` to listeners that get mutable access to `C`.
pub struct EventTarget<E, C> {
    registry: Rc<RefCell<Registry<E, C>>>,
}

impl<E: 'static, C: 'static> Default for EventTarget<E, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static, C: 'static> EventTarget<E, C> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                slots: Vec::new(),
                next_id: 0,
            })),
        }
    }

    #[must_use = "dropping the subscription removes the listener"]
    pub fn add_listener(&self, listener: impl FnMut(&E, &mut C) + 'static) -> Subscription {
        self.register(Box::new(listener), false)
    }

    #[must_use = "dropping the subscription removes the listener"]
    pub fn add_once_listener(&self, listener: impl FnOnce(&E, &mut C) + 'static) -> Subscription {
        let mut listener = Some(listener);
        self.register(
            Box::new(move |event, ctx| {
                if let Some(listener) = listener.take() {
                    listener(event, ctx);
                }
            }),
            true,
        )
    }

    fn register(&self, listener: Listener<E, C>, once: bool) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        let active = Rc::new(Cell::new(true));
        registry.slots.push(Slot {
            id,
            once,
            active: active.clone(),
            listener: Some(listener),
        });
        let weak: Weak<RefCell<Registry<E, C>>> = Rc::downgrade(&self.registry);
        Subscription {
            active,
            cancel: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    registry.borrow_mut().remove(id);
                }
            })),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.borrow().slots.len()
    }

    /// Runs every listener registered before the call, in registration order.
    /// Returns how many listeners ran.
    pub fn dispatch(&self, event: &E, ctx: &mut C) -> usize {
        let ids: Vec<u64> = self.registry.borrow().slots.iter().map(|s| s.id).collect();
        let mut delivered = 0;
        for id in ids {
            let taken = {
                let mut registry = self.registry.borrow_mut();
                registry
                    .slots
                    .iter_mut()
                    .find(|slot| slot.id == id)
                    .and_then(|slot| slot.listener.take().map(|l| (l, slot.once)))
            };
            let Some((mut listener, once)) = taken else {
                continue;
            };
            listener(event, ctx);
            delivered += 1;

            let mut registry = self.registry.borrow_mut();
            if once {
                registry.remove(id);
            } else if let Some(slot) = registry.slots.iter_mut().find(|slot| slot.id == id) {
                slot.listener = Some(listener);
            }
        }
        delivered
    }
}

/// Handle for a registered listener. Dropping it removes the listener.
pub struct Subscription {
    active: Rc<Cell<bool>>,
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// False once the listener was removed, including after a one-shot listener fired.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            if self.active.get() {
                cancel();
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.active.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_subscription_removes_listener() {
        let target: EventTarget<i32, Vec<i32>> = EventTarget::new();
        let mut seen = Vec::new();
        let sub = target.add_listener(|event, seen: &mut Vec<i32>| seen.push(*event));
        target.dispatch(&1, &mut seen);
        drop(sub);
        target.dispatch(&2, &mut seen);
        assert_eq!(seen, vec![1]);
        assert_eq!(target.listener_count(), 0);
    }

    #[test]
    fn once_listener_fires_a_single_time() {
        let target: EventTarget<i32, Vec<i32>> = EventTarget::new();
        let mut seen = Vec::new();
        let sub = target.add_once_listener(|event, seen: &mut Vec<i32>| seen.push(*event));
        assert!(sub.is_active());
        assert_eq!(target.dispatch(&1, &mut seen), 1);
        assert_eq!(target.dispatch(&2, &mut seen), 0);
        assert_eq!(seen, vec![1]);
        assert!(!sub.is_active());
    }

    #[test]
    fn dispatch_follows_registration_order() {
        let target: EventTarget<(), Vec<&'static str>> = EventTarget::new();
        let mut order = Vec::new();
        let _a = target.add_listener(|_, order: &mut Vec<&'static str>| order.push("a"));
        let _b = target.add_listener(|_, order: &mut Vec<&'static str>| order.push("b"));
        target.dispatch(&(), &mut order);
        target.dispatch(&(), &mut order);
        assert_eq!(order, vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn subscription_outliving_target_is_harmless() {
        let target: EventTarget<(), ()> = EventTarget::new();
        let sub = target.add_listener(|_, _| {});
        drop(target);
        drop(sub);
    }
}
