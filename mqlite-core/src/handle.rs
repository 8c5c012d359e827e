use crate::ids::HandleId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire-transmissible reference to an object exposed by some endpoint.
///
/// Equality is structural over all four fields, so a handle that went out
/// and came back compares equal to the one the owner keeps in its table.
/// Retain counts live in the owner's table, never in the handle itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    id: HandleId,
    interface: String,
    owner: String,
    queue: String,
}

impl Handle {
    pub fn new(
        id: HandleId,
        interface: impl Into<String>,
        owner: impl Into<String>,
        queue: impl Into<String>,
    ) -> Self {
        Handle {
            id,
            interface: interface.into(),
            owner: owner.into(),
            queue: queue.into(),
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Name of the interface the object is exposed as.
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Transport locator of the owning endpoint.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Request queue of the owning endpoint.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// True when the handle was issued by the endpoint listening on `queue`
    /// at `owner`.
    pub fn is_owned_by(&self, owner: &str, queue: &str) -> bool {
        self.owner == owner && self.queue == queue
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Handle[id={}, interface={}, owner={}, queue={}]",
            self.id.as_u32(),
            self.interface,
            self.owner,
            self.queue
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_structural_equality() {
        let a = Handle::new(HandleId::new(1), "demo.Greeter", "memory://a", "server-request");
        let b = Handle::new(HandleId::new(1), "demo.Greeter", "memory://a", "server-request");
        let c = Handle::new(HandleId::new(1), "demo.Other", "memory://a", "server-request");
        let d = Handle::new(HandleId::new(1), "demo.Greeter", "memory://a", "client-request");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);

        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));
    }

    #[test]
    fn test_ownership() {
        let h = Handle::new(HandleId::new(9), "demo.Greeter", "memory://a", "server-request");
        assert!(h.is_owned_by("memory://a", "server-request"));
        assert!(!h.is_owned_by("memory://a", "client-request"));
        assert!(h.to_string().contains("id=9"));
    }
}
