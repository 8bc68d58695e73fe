//! Synchronous event delivery across the dispatch-target tree.

use std::{cell::Cell, rc::Rc};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use ui_event_contract::{
    descriptor_for, descriptor_for_with, DispatchOptions, EventDescriptor, EventKind, EventName,
};

use crate::model::{EventTree, ListenerCallback, TargetId, TreeState};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Errors surfaced by dispatch and listener registration.
pub enum DispatchError {
    /// The supplied target cannot accept a dispatched event.
    #[error("target does not support event dispatch")]
    InvalidTarget,
}

#[derive(Default)]
struct DeliveryFlags {
    stopped: Cell<bool>,
    default_prevented: Cell<bool>,
}

/// View of one in-flight event exposed to listeners.
pub struct EventContext {
    descriptor: Rc<EventDescriptor>,
    current_target: TargetId,
    original_target: TargetId,
    flags: Rc<DeliveryFlags>,
}

impl EventContext {
    /// Returns the event name.
    pub fn name(&self) -> &EventName {
        &self.descriptor.name
    }

    /// Returns the payload exactly as it was attached to the descriptor.
    pub fn payload(&self) -> Option<&Value> {
        self.descriptor.payload.as_ref()
    }

    /// Decodes the payload into a typed shape; `None` when absent or mismatched.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.payload()
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Returns the propagation flags the event was dispatched with.
    pub fn options(&self) -> DispatchOptions {
        self.descriptor.options
    }

    /// Returns the target whose listener list is currently being delivered to.
    pub fn current_target(&self) -> TargetId {
        self.current_target
    }

    /// Returns the target the event was originally dispatched on.
    pub fn original_target(&self) -> TargetId {
        self.original_target
    }

    /// Stops the event from propagating past the current target.
    ///
    /// Remaining listeners on the current target still run.
    pub fn stop_propagation(&self) {
        self.flags.stopped.set(true);
    }

    /// Marks the event's default action as prevented.
    ///
    /// Ignored unless the event was dispatched as cancelable.
    pub fn prevent_default(&self) {
        if self.descriptor.options.cancelable {
            self.flags.default_prevented.set(true);
        }
    }

    /// Returns whether an earlier listener prevented the default action.
    pub fn default_prevented(&self) -> bool {
        self.flags.default_prevented.get()
    }
}

fn propagation_path(state: &TreeState, origin: TargetId, options: DispatchOptions) -> Vec<TargetId> {
    let mut path = vec![origin];
    if !options.bubbles {
        return path;
    }

    let mut current = origin;
    while let Some(record) = state.targets.get(&current) {
        let next = match record.parent {
            Some(parent) => Some(parent),
            None => record.encapsulation_host.filter(|_| options.composed),
        };
        let Some(next) = next else {
            break;
        };
        path.push(next);
        current = next;
    }
    path
}

impl EventTree {
    /// Dispatches `descriptor` to `target`, synchronously running every listener
    /// registered for the name along the propagation path before returning.
    ///
    /// The path is the target itself, then its ancestors when the event bubbles,
    /// crossing encapsulation boundaries only when the event is composed. Listener
    /// outcomes are invisible to the caller: the call returns `Ok(())` whether or
    /// not anyone listened, stopped propagation, or prevented the default action.
    /// Dispatching again from inside a listener is an ordinary nested call.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidTarget`] when `target` is not in the tree.
    pub fn dispatch(
        &self,
        target: TargetId,
        descriptor: EventDescriptor,
    ) -> Result<(), DispatchError> {
        let options = descriptor.options;
        let path = {
            let state = self.state.borrow();
            if !state.targets.contains_key(&target) {
                return Err(DispatchError::InvalidTarget);
            }
            propagation_path(&state, target, options)
        };

        let descriptor = Rc::new(descriptor);
        let flags = Rc::new(DeliveryFlags::default());

        for node in path {
            // Snapshot per node so the borrow is not held across callbacks.
            let callbacks: Vec<ListenerCallback> = {
                let state = self.state.borrow();
                match state.targets.get(&node) {
                    Some(record) => record
                        .listeners
                        .iter()
                        .filter(|listener| listener.name == descriptor.name)
                        .map(|listener| Rc::clone(&listener.callback))
                        .collect(),
                    // Detached by an earlier listener mid-flight.
                    None => Vec::new(),
                }
            };

            let context = EventContext {
                descriptor: Rc::clone(&descriptor),
                current_target: node,
                original_target: target,
                flags: Rc::clone(&flags),
            };
            for callback in callbacks {
                callback(&context);
            }
            if flags.stopped.get() {
                break;
            }
        }
        Ok(())
    }

    /// Fires a typed event on `target` with default propagation flags.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidTarget`] when `target` is not in the tree.
    pub fn fire_event<E: EventKind>(
        &self,
        target: TargetId,
        payload: E::Payload,
    ) -> Result<(), DispatchError> {
        self.dispatch(target, descriptor_for::<E>(payload))
    }

    /// Fires a typed event on `target` with explicit propagation flags.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidTarget`] when `target` is not in the tree.
    pub fn fire_event_with<E: EventKind>(
        &self,
        target: TargetId,
        payload: E::Payload,
        options: DispatchOptions,
    ) -> Result<(), DispatchError> {
        self.dispatch(target, descriptor_for_with::<E>(payload, options))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use ui_event_contract::{Pressed, ValueChanged};

    use super::*;

    fn named(raw: &str) -> EventName {
        EventName::new(raw).expect("valid event name")
    }

    #[test]
    fn delivers_exactly_once_per_listener_before_returning() {
        let tree = EventTree::new();
        let target = tree.create_target();
        let first = Rc::new(Cell::new(0u32));
        let second = Rc::new(Cell::new(0u32));

        let count = Rc::clone(&first);
        tree.add_listener(target, named("value-changed"), move |_| {
            count.set(count.get() + 1);
        })
        .expect("add first listener");
        let count = Rc::clone(&second);
        tree.add_listener(target, named("value-changed"), move |_| {
            count.set(count.get() + 1);
        })
        .expect("add second listener");

        tree.dispatch(
            target,
            EventDescriptor::new(named("value-changed")).with_payload(json!({ "value": 42 })),
        )
        .expect("dispatch");

        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn listener_reads_payload_verbatim() {
        let tree = EventTree::new();
        let target = tree.create_target();
        let seen = Rc::new(RefCell::new(None));

        let slot = Rc::clone(&seen);
        tree.add_listener(target, named("value-changed"), move |ctx| {
            *slot.borrow_mut() = ctx.payload().cloned();
        })
        .expect("add listener");

        tree.dispatch(
            target,
            EventDescriptor::new(named("value-changed")).with_payload(json!({ "value": 42 })),
        )
        .expect("dispatch");

        assert_eq!(*seen.borrow(), Some(json!({ "value": 42 })));
    }

    #[test]
    fn unregistered_name_is_a_silent_no_op() {
        let tree = EventTree::new();
        let target = tree.create_target();
        let hits = Rc::new(Cell::new(0u32));

        let count = Rc::clone(&hits);
        tree.add_listener(target, named("value-changed"), move |_| {
            count.set(count.get() + 1);
        })
        .expect("add listener");

        tree.dispatch(target, EventDescriptor::new(named("never-registered")))
            .expect("dispatch unknown name");

        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn bubbling_event_reaches_ancestors_in_order() {
        let tree = EventTree::new();
        let root = tree.create_target();
        let child = tree.create_child(root).expect("create child");
        let order = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&order);
        tree.add_listener(child, named("pressed"), move |ctx| {
            log.borrow_mut().push(("child", ctx.current_target()));
        })
        .expect("child listener");
        let log = Rc::clone(&order);
        tree.add_listener(root, named("pressed"), move |ctx| {
            log.borrow_mut().push(("root", ctx.current_target()));
        })
        .expect("root listener");

        tree.dispatch(child, EventDescriptor::new(named("pressed")))
            .expect("dispatch");

        assert_eq!(*order.borrow(), vec![("child", child), ("root", root)]);
    }

    #[test]
    fn non_bubbling_event_never_reaches_the_parent() {
        let tree = EventTree::new();
        let root = tree.create_target();
        let child = tree.create_child(root).expect("create child");
        let parent_hits = Rc::new(Cell::new(0u32));

        let count = Rc::clone(&parent_hits);
        tree.add_listener(root, named("value-changed"), move |_| {
            count.set(count.get() + 1);
        })
        .expect("root listener");

        tree.dispatch(
            child,
            EventDescriptor::new(named("value-changed"))
                .with_payload(json!({ "value": 42 }))
                .with_options(DispatchOptions::default().with_bubbles(false)),
        )
        .expect("dispatch");

        assert_eq!(parent_hits.get(), 0);
    }

    #[test]
    fn composed_event_crosses_the_encapsulation_boundary() {
        let tree = EventTree::new();
        let host = tree.create_target();
        let shadow = tree.create_encapsulated_child(host).expect("create shadow");
        let inner = tree.create_child(shadow).expect("create inner");
        let host_hits = Rc::new(Cell::new(0u32));

        let count = Rc::clone(&host_hits);
        tree.add_listener(host, named("value-changed"), move |_| {
            count.set(count.get() + 1);
        })
        .expect("host listener");

        tree.dispatch(inner, EventDescriptor::new(named("value-changed")))
            .expect("composed dispatch");
        assert_eq!(host_hits.get(), 1);

        tree.dispatch(
            inner,
            EventDescriptor::new(named("value-changed"))
                .with_options(DispatchOptions::default().with_composed(false)),
        )
        .expect("non-composed dispatch");
        assert_eq!(host_hits.get(), 1);
    }

    #[test]
    fn stop_propagation_halts_bubbling_after_the_current_target() {
        let tree = EventTree::new();
        let root = tree.create_target();
        let child = tree.create_child(root).expect("create child");
        let root_hits = Rc::new(Cell::new(0u32));

        tree.add_listener(child, named("pressed"), |ctx| {
            ctx.stop_propagation();
        })
        .expect("child listener");
        let count = Rc::clone(&root_hits);
        tree.add_listener(root, named("pressed"), move |_| {
            count.set(count.get() + 1);
        })
        .expect("root listener");

        tree.dispatch(child, EventDescriptor::new(named("pressed")))
            .expect("dispatch");

        assert_eq!(root_hits.get(), 0);
    }

    #[test]
    fn stop_propagation_still_runs_remaining_listeners_on_the_current_target() {
        let tree = EventTree::new();
        let root = tree.create_target();
        let child = tree.create_child(root).expect("create child");
        let sibling_hits = Rc::new(Cell::new(0u32));
        let root_hits = Rc::new(Cell::new(0u32));

        tree.add_listener(child, named("pressed"), |ctx| {
            ctx.stop_propagation();
        })
        .expect("stopping listener");
        let count = Rc::clone(&sibling_hits);
        tree.add_listener(child, named("pressed"), move |_| {
            count.set(count.get() + 1);
        })
        .expect("second child listener");
        let count = Rc::clone(&root_hits);
        tree.add_listener(root, named("pressed"), move |_| {
            count.set(count.get() + 1);
        })
        .expect("root listener");

        tree.dispatch(child, EventDescriptor::new(named("pressed")))
            .expect("dispatch");

        assert_eq!(sibling_hits.get(), 1);
        assert_eq!(root_hits.get(), 0);
    }

    #[test]
    fn prevent_default_is_visible_to_later_listeners_only_when_cancelable() {
        let tree = EventTree::new();
        let root = tree.create_target();
        let child = tree.create_child(root).expect("create child");
        let seen = Rc::new(RefCell::new(Vec::new()));

        tree.add_listener(child, named("pressed"), |ctx| {
            ctx.prevent_default();
        })
        .expect("child listener");
        let log = Rc::clone(&seen);
        tree.add_listener(root, named("pressed"), move |ctx| {
            log.borrow_mut().push(ctx.default_prevented());
        })
        .expect("root listener");

        tree.dispatch(child, EventDescriptor::new(named("pressed")))
            .expect("cancelable dispatch");
        tree.dispatch(
            child,
            EventDescriptor::new(named("pressed"))
                .with_options(DispatchOptions::default().with_cancelable(false)),
        )
        .expect("non-cancelable dispatch");

        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn reentrant_dispatch_completes_before_the_outer_dispatch_returns() {
        let tree = EventTree::new();
        let target = tree.create_target();
        let order = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&order);
        let nested_tree = tree.clone();
        tree.add_listener(target, named("outer"), move |_| {
            log.borrow_mut().push("outer-start");
            nested_tree
                .dispatch(target, EventDescriptor::new(named("inner")))
                .expect("nested dispatch");
            log.borrow_mut().push("outer-end");
        })
        .expect("outer listener");
        let log = Rc::clone(&order);
        tree.add_listener(target, named("inner"), move |_| {
            log.borrow_mut().push("inner");
        })
        .expect("inner listener");

        tree.dispatch(target, EventDescriptor::new(named("outer")))
            .expect("dispatch");

        assert_eq!(*order.borrow(), vec!["outer-start", "inner", "outer-end"]);
    }

    #[test]
    fn stale_target_reports_invalid_target() {
        let tree = EventTree::new();
        let target = tree.create_target();
        tree.detach(target).expect("detach");

        let err = tree
            .dispatch(target, EventDescriptor::new(named("pressed")))
            .expect_err("dispatch to stale target");
        assert_eq!(err, DispatchError::InvalidTarget);
    }

    #[test]
    fn typed_fire_event_delivers_a_decodable_payload() {
        let tree = EventTree::new();
        let target = tree.create_target();
        let seen = Rc::new(RefCell::new(None));

        let slot = Rc::clone(&seen);
        tree.add_listener(target, named("value-changed"), move |ctx| {
            *slot.borrow_mut() = ctx.payload_as::<ValueChanged>();
        })
        .expect("add listener");

        tree.fire_event::<ValueChanged>(target, ValueChanged { value: json!(42) })
            .expect("fire typed event");

        assert_eq!(
            *seen.borrow(),
            Some(ValueChanged { value: json!(42) })
        );
    }

    #[test]
    fn typed_fire_event_with_flags_respects_bubbles() {
        let tree = EventTree::new();
        let root = tree.create_target();
        let child = tree.create_child(root).expect("create child");
        let root_hits = Rc::new(Cell::new(0u32));

        let count = Rc::clone(&root_hits);
        tree.add_listener(root, named("pressed"), move |_| {
            count.set(count.get() + 1);
        })
        .expect("root listener");

        tree.fire_event_with::<Pressed>(
            child,
            Pressed,
            DispatchOptions::default().with_bubbles(false),
        )
        .expect("fire non-bubbling");

        assert_eq!(root_hits.get(), 0);
    }

    #[test]
    fn listener_detaching_an_ancestor_mid_flight_skips_its_delivery() {
        let tree = EventTree::new();
        let root = tree.create_target();
        let child = tree.create_child(root).expect("create child");
        let root_hits = Rc::new(Cell::new(0u32));

        let detacher = tree.clone();
        tree.add_listener(child, named("pressed"), move |_| {
            detacher.detach(root).expect("detach root");
        })
        .expect("child listener");
        let count = Rc::clone(&root_hits);
        tree.add_listener(root, named("pressed"), move |_| {
            count.set(count.get() + 1);
        })
        .expect("root listener");

        tree.dispatch(child, EventDescriptor::new(named("pressed")))
            .expect("dispatch");

        assert_eq!(root_hits.get(), 0);
    }
}
