//! Per-endpoint table of exposed objects.
//!
//! Every object handed out by reference gets one handle per interface it is
//! exposed as, with a retain count. Re-exposing the same object under the
//! same interface bumps the count; the entry disappears once every retain
//! has been matched by a release.

use crate::descriptor::{InterfaceDescriptor, InterfaceRegistry};
use crate::error::TableError;
use crate::handle::Handle;
use crate::ids::{HandleId, HandleIdAllocator};
use crate::object::{object_identity, RemoteObject};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace, warn};

/// Builds proxies for handles owned by other endpoints.
pub trait ProxyFactory: Send + Sync {
    fn make_proxy(&self, handle: Handle, interface: Arc<InterfaceDescriptor>) -> Arc<dyn RemoteObject>;
}

struct Entry {
    handle: Handle,
    object: Arc<dyn RemoteObject>,
    retain: u32,
}

#[derive(Default)]
struct TableState {
    entries: HashMap<HandleId, Entry>,
    by_identity: HashMap<(usize, String), HandleId>,
    published: HashMap<String, Arc<dyn RemoteObject>>,
    exported: HashSet<String>,
}

pub struct HandleTable {
    owner: String,
    queue: String,
    ids: HandleIdAllocator,
    interfaces: InterfaceRegistry,
    state: Mutex<TableState>,
}

impl HandleTable {
    /// Table for the endpoint reachable at `owner` through `queue`.
    pub fn new(owner: impl Into<String>, queue: impl Into<String>) -> Self {
        HandleTable {
            owner: owner.into(),
            queue: queue.into(),
            ids: HandleIdAllocator::new(),
            interfaces: InterfaceRegistry::new(),
            state: Mutex::new(TableState::default()),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn interfaces(&self) -> &InterfaceRegistry {
        &self.interfaces
    }

    fn state(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Existing handle for `(object, interface)` with one more retain, or a
    /// fresh one with a retain count of one.
    pub fn create_or_retain(&self, object: &Arc<dyn RemoteObject>, interface: &str) -> Handle {
        let key = (object_identity(object), interface.to_string());
        let mut state = self.state();

        if let Some(id) = state.by_identity.get(&key).copied() {
            if let Some(entry) = state.entries.get_mut(&id) {
                entry.retain += 1;
                trace!(handle = %entry.handle, retain = entry.retain, "Retained handle");
                return entry.handle.clone();
            }
        }

        let handle = Handle::new(self.ids.allocate(), interface, &self.owner, &self.queue);
        state.by_identity.insert(key, handle.id());
        state.entries.insert(
            handle.id(),
            Entry {
                handle: handle.clone(),
                object: Arc::clone(object),
                retain: 1,
            },
        );
        trace!(handle = %handle, type_name = object.type_name(), "Added handle");
        handle
    }

    /// The object bound to `handle`, if it is still live.
    pub fn resolve_local(&self, handle: &Handle) -> Option<Arc<dyn RemoteObject>> {
        let state = self.state();
        state
            .entries
            .get(&handle.id())
            .filter(|entry| entry.handle == *handle)
            .map(|entry| Arc::clone(&entry.object))
    }

    /// The local object for a handle this endpoint issued, otherwise a proxy
    /// for it built by `factory`.
    pub fn resolve_remote(
        &self,
        handle: &Handle,
        factory: &dyn ProxyFactory,
    ) -> Result<Arc<dyn RemoteObject>, TableError> {
        if handle.is_owned_by(&self.owner, &self.queue) {
            return self
                .resolve_local(handle)
                .ok_or_else(|| TableError::HandleNotFound(handle.clone()));
        }
        let descriptor = self
            .interfaces
            .get(handle.interface())
            .ok_or_else(|| TableError::UnknownInterface(handle.interface().to_string()))?;
        trace!(handle = %handle, "Creating proxy");
        Ok(factory.make_proxy(handle.clone(), descriptor))
    }

    /// Drops one retain. Returns false only when the handle is unknown.
    pub fn release(&self, handle: &Handle) -> bool {
        let mut state = self.state();
        let remaining = match state.entries.get_mut(&handle.id()) {
            Some(entry) if entry.handle == *handle => {
                entry.retain = entry.retain.saturating_sub(1);
                entry.retain
            }
            _ => {
                warn!(handle = %handle, "Release for a handle that is not in the table");
                return false;
            }
        };

        if remaining == 0 {
            if let Some(entry) = state.entries.remove(&handle.id()) {
                let key = (object_identity(&entry.object), handle.interface().to_string());
                state.by_identity.remove(&key);
            }
            trace!(handle = %handle, "Removed handle");
        } else {
            trace!(handle = %handle, retain = remaining, "Released handle");
        }
        true
    }

    /// Makes `object` the implementation returned by lookups of `interface`
    /// and marks the interface as passed by reference.
    pub fn publish(
        &self,
        object: Arc<dyn RemoteObject>,
        interface: &str,
    ) -> Result<Handle, TableError> {
        if !self.interfaces.contains(interface) {
            return Err(TableError::NotAnInterface(interface.to_string()));
        }
        if !object.implements(interface) {
            return Err(TableError::NotImplemented {
                type_name: object.type_name().to_string(),
                interface: interface.to_string(),
            });
        }
        {
            let mut state = self.state();
            state
                .published
                .insert(interface.to_string(), Arc::clone(&object));
            state.exported.insert(interface.to_string());
        }
        debug!(interface, type_name = object.type_name(), "Published object");
        Ok(self.create_or_retain(&object, interface))
    }

    /// A retained handle for the object published under `interface`.
    pub fn lookup_published(&self, interface: &str) -> Option<Handle> {
        let object = self.state().published.get(interface).cloned()?;
        Some(self.create_or_retain(&object, interface))
    }

    pub fn export_interfaces<I, S>(&self, interfaces: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state();
        for name in interfaces {
            state.exported.insert(name.into());
        }
    }

    pub fn is_exported(&self, interface: &str) -> bool {
        self.state().exported.contains(interface)
    }

    /// Current retain count, zero when the handle is not live.
    pub fn retain_count(&self, handle: &Handle) -> u32 {
        self.state()
            .entries
            .get(&handle.id())
            .filter(|entry| entry.handle == *handle)
            .map_or(0, |entry| entry.retain)
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for HandleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleTable")
            .field("owner", &self.owner)
            .field("queue", &self.queue)
            .field("live", &self.len())
            .field("next_id", &self.ids.peek_next())
            .finish()
    }
}
