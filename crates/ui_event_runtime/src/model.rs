//! Dispatch-target tree and listener state owned by the event runtime.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use ui_event_contract::EventName;

use crate::{
    dispatch::{DispatchError, EventContext},
    registry::ComponentTag,
};

/// Stable identifier for a dispatch target in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

/// Stable identifier for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Callback invoked synchronously for each delivered event.
pub type ListenerCallback = Rc<dyn Fn(&EventContext)>;

pub(crate) struct ListenerRecord {
    pub(crate) id: ListenerId,
    pub(crate) name: EventName,
    pub(crate) callback: ListenerCallback,
}

pub(crate) struct TargetRecord {
    pub(crate) parent: Option<TargetId>,
    pub(crate) encapsulation_host: Option<TargetId>,
    pub(crate) children: Vec<TargetId>,
    pub(crate) encapsulated_children: Vec<TargetId>,
    pub(crate) listeners: Vec<ListenerRecord>,
    pub(crate) component: Option<ComponentTag>,
}

impl TargetRecord {
    fn new(parent: Option<TargetId>, encapsulation_host: Option<TargetId>) -> Self {
        Self {
            parent,
            encapsulation_host,
            children: Vec::new(),
            encapsulated_children: Vec::new(),
            listeners: Vec::new(),
            component: None,
        }
    }
}

#[derive(Default)]
pub(crate) struct TreeState {
    pub(crate) targets: HashMap<TargetId, TargetRecord>,
    next_target: u64,
    next_listener: u64,
}

impl TreeState {
    fn allocate_target(
        &mut self,
        parent: Option<TargetId>,
        encapsulation_host: Option<TargetId>,
    ) -> TargetId {
        self.next_target += 1;
        let id = TargetId(self.next_target);
        self.targets
            .insert(id, TargetRecord::new(parent, encapsulation_host));

        if let Some(parent) = parent {
            if let Some(record) = self.targets.get_mut(&parent) {
                record.children.push(id);
            }
        }
        if let Some(host) = encapsulation_host {
            if let Some(record) = self.targets.get_mut(&host) {
                record.encapsulated_children.push(id);
            }
        }
        id
    }

    fn remove_subtree(&mut self, target: TargetId) {
        let Some(record) = self.targets.remove(&target) else {
            return;
        };
        for child in record.children {
            self.remove_subtree(child);
        }
        for child in record.encapsulated_children {
            self.remove_subtree(child);
        }
    }

    fn detach(&mut self, target: TargetId) -> Result<(), DispatchError> {
        let record = self
            .targets
            .get(&target)
            .ok_or(DispatchError::InvalidTarget)?;
        let parent = record.parent;
        let host = record.encapsulation_host;

        if let Some(parent) = parent {
            if let Some(record) = self.targets.get_mut(&parent) {
                record.children.retain(|child| *child != target);
            }
        }
        if let Some(host) = host {
            if let Some(record) = self.targets.get_mut(&host) {
                record.encapsulated_children.retain(|child| *child != target);
            }
        }
        self.remove_subtree(target);
        Ok(())
    }
}

/// Single-threaded owner of dispatch targets, their listeners, and delivery state.
///
/// Cloning an [`EventTree`] yields another handle to the same tree, so listeners may
/// capture a handle and call back into the tree re-entrantly during delivery.
#[derive(Clone, Default)]
pub struct EventTree {
    pub(crate) state: Rc<RefCell<TreeState>>,
}

impl EventTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a root target with no parent.
    pub fn create_target(&self) -> TargetId {
        self.state.borrow_mut().allocate_target(None, None)
    }

    /// Creates a target nested under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidTarget`] when `parent` is not in the tree.
    pub fn create_child(&self, parent: TargetId) -> Result<TargetId, DispatchError> {
        let mut state = self.state.borrow_mut();
        if !state.targets.contains_key(&parent) {
            return Err(DispatchError::InvalidTarget);
        }
        Ok(state.allocate_target(Some(parent), None))
    }

    /// Creates an encapsulation root whose subtree is hidden behind `host`.
    ///
    /// Events dispatched inside the encapsulated subtree reach `host` and its
    /// ancestors only when dispatched with the `composed` flag.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidTarget`] when `host` is not in the tree.
    pub fn create_encapsulated_child(&self, host: TargetId) -> Result<TargetId, DispatchError> {
        let mut state = self.state.borrow_mut();
        if !state.targets.contains_key(&host) {
            return Err(DispatchError::InvalidTarget);
        }
        Ok(state.allocate_target(None, Some(host)))
    }

    /// Removes `target` and its entire subtree; their ids become stale.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidTarget`] when `target` is not in the tree.
    pub fn detach(&self, target: TargetId) -> Result<(), DispatchError> {
        self.state.borrow_mut().detach(target)
    }

    /// Returns whether `target` is currently in the tree.
    pub fn contains(&self, target: TargetId) -> bool {
        self.state.borrow().targets.contains_key(&target)
    }

    /// Returns the parent of `target`, if it has one.
    pub fn parent_of(&self, target: TargetId) -> Option<TargetId> {
        self.state
            .borrow()
            .targets
            .get(&target)
            .and_then(|record| record.parent)
    }

    /// Returns the encapsulation host of `target`, if it is an encapsulation root.
    pub fn host_of(&self, target: TargetId) -> Option<TargetId> {
        self.state
            .borrow()
            .targets
            .get(&target)
            .and_then(|record| record.encapsulation_host)
    }

    /// Returns the registered component tag the target was instantiated from, if any.
    pub fn component_of(&self, target: TargetId) -> Option<ComponentTag> {
        self.state
            .borrow()
            .targets
            .get(&target)
            .and_then(|record| record.component.clone())
    }

    /// Registers a listener for `name` events delivered to `target`.
    ///
    /// Listeners on one target run in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidTarget`] when `target` is not in the tree.
    pub fn add_listener(
        &self,
        target: TargetId,
        name: EventName,
        callback: impl Fn(&EventContext) + 'static,
    ) -> Result<ListenerId, DispatchError> {
        let mut state = self.state.borrow_mut();
        if !state.targets.contains_key(&target) {
            return Err(DispatchError::InvalidTarget);
        }
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        if let Some(record) = state.targets.get_mut(&target) {
            record.listeners.push(ListenerRecord {
                id,
                name,
                callback: Rc::new(callback),
            });
        }
        Ok(id)
    }

    /// Removes a previously registered listener; unknown ids are ignored.
    pub fn remove_listener(&self, listener: ListenerId) {
        let mut state = self.state.borrow_mut();
        for record in state.targets.values_mut() {
            record.listeners.retain(|entry| entry.id != listener);
        }
    }

    pub(crate) fn set_component(&self, target: TargetId, tag: ComponentTag) {
        let mut state = self.state.borrow_mut();
        if let Some(record) = state.targets.get_mut(&target) {
            record.component = Some(tag);
        }
    }
}
