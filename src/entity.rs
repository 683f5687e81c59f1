//! Traced entities and identity-keyed membership
//!
//! Entities are tracked by reference identity, never value equality: two
//! instances that would compare equal are still independent subscriptions.
//! Identity is the address of the trait object's data, which is stable
//! across `Arc` clones of the same allocation.

use std::fmt;
use std::sync::Arc;

use crate::vars::VarsView;

/// Opaque identity of a traced entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Anything the engine can observe: an object, a class, or a module.
pub trait Traceable: Send + Sync {
    /// Enclosing type or module name, used in signature lines.
    fn type_name(&self) -> &str;

    /// Textual representation of the entity itself. Value-to-string
    /// conversion is the host's business; the engine only prints what it
    /// is given.
    fn repr(&self) -> String;

    /// Type- or module-level entity. Signature lines use `Type.method`
    /// for these and `Type#method` for instances.
    fn is_type(&self) -> bool {
        false
    }

    /// Reference identity. The default is the address of the underlying
    /// allocation; wrappers that stand in for another object (the output
    /// sink, the owning session) override this to share that object's
    /// identity.
    fn identity(&self) -> EntityId {
        EntityId((self as *const Self).cast::<()>() as usize)
    }

    /// Which variable-dump capability this entity exposes, if any.
    fn vars_view(&self) -> VarsView {
        VarsView::Unsupported
    }
}

/// Shared handle to a traced entity.
pub type Entity = Arc<dyn Traceable>;

/// Plain observable object for hosts that have nothing richer to offer:
/// a type name, an instance/type flag, and a pre-rendered representation.
pub struct Observed {
    type_name: String,
    repr: String,
    type_level: bool,
}

impl Observed {
    /// An instance-level entity (`Type#method` signatures).
    pub fn instance(type_name: impl Into<String>, repr: impl Into<String>) -> Entity {
        Arc::new(Self {
            type_name: type_name.into(),
            repr: repr.into(),
            type_level: false,
        })
    }

    /// A type- or module-level entity (`Type.method` signatures).
    pub fn type_level(type_name: impl Into<String>) -> Entity {
        let name = type_name.into();
        Arc::new(Self {
            repr: name.clone(),
            type_name: name,
            type_level: true,
        })
    }
}

impl Traceable for Observed {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn repr(&self) -> String {
        self.repr.clone()
    }

    fn is_type(&self) -> bool {
        self.type_level
    }
}

/// Stand-in entity that borrows another object's identity. Registering it
/// is indistinguishable from registering the object it fronts, which is
/// exactly what the self-exclusion checks need.
pub(crate) struct ProxyEntity {
    id: EntityId,
    type_name: &'static str,
    repr: String,
}

impl ProxyEntity {
    pub(crate) fn new(id: EntityId, type_name: &'static str, repr: String) -> Entity {
        Arc::new(Self {
            id,
            type_name,
            repr,
        })
    }
}

impl Traceable for ProxyEntity {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn repr(&self) -> String {
        self.repr.clone()
    }

    fn identity(&self) -> EntityId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_stable_across_clones() {
        let a = Observed::instance("Sample", "#<Sample>");
        let b = Arc::clone(&a);
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_distinct_allocations_have_distinct_identity() {
        let a = Observed::instance("Sample", "#<Sample>");
        let b = Observed::instance("Sample", "#<Sample>");
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_type_level_entity_uses_its_name_as_repr() {
        let t = Observed::type_level("Kernel");
        assert!(t.is_type());
        assert_eq!(t.type_name(), "Kernel");
        assert_eq!(t.repr(), "Kernel");
    }

    #[test]
    fn test_proxy_borrows_identity() {
        let target = Observed::instance("Sink", "#<Sink>");
        let proxy = ProxyEntity::new(target.identity(), "Sink", "#<proxy>".to_string());
        assert_eq!(proxy.identity(), target.identity());
    }
}
