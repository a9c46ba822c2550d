//! Whitelist registry: the only way host members become reachable from filters.
//!
//! Configuration happens on a [`RegistryBuilder`]; [`RegistryBuilder::build`]
//! freezes it into an immutable [`Registry`] that parsers share read-only.
//! A type with no registered members exposes nothing.

mod member;
mod value;

pub use member::{Accessor, MemberDescriptor, MemberSet};
pub use value::{Field, ObjectRef, Record, Scalar, StaticType, TypeKey, Value, ValueType};

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// Configuration-phase failures, reported by [`RegistryBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("type '{type_name}' declares no member named '{member}'")]
    UnknownMember { type_name: String, member: String },

    #[error("type '{type_name}' has not been declared")]
    UnknownType { type_name: String },
}

#[derive(Debug, Clone)]
struct TypeMembers {
    key: TypeKey,
    members: HashMap<String, Arc<MemberDescriptor>>,
}

impl TypeMembers {
    fn new(key: TypeKey) -> Self {
        Self {
            key,
            members: HashMap::new(),
        }
    }
}

/// Member catalog of a declared [`Record`] type, addressable by type name.
pub(crate) struct Catalog {
    pub(crate) key: TypeKey,
    pub(crate) members: Vec<MemberDescriptor>,
}

/// Mutable configuration phase of the registry.
#[derive(Default)]
pub struct RegistryBuilder {
    types: HashMap<TypeId, TypeMembers>,
    catalogs: HashMap<String, Catalog>,
    errors: Vec<RegistryError>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a configuration scope for the members of `T`.
    pub fn configure<T: Any>(
        mut self,
        configure: impl FnOnce(TypeConfig<'_, T>) -> TypeConfig<'_, T>,
    ) -> Self {
        configure(TypeConfig::new(&mut self));
        self
    }

    /// Make the member catalog of `T` available to [`apply_config`](Self::apply_config).
    pub fn declare<T: Record>(mut self) -> Self {
        let key = TypeKey::of::<T>();
        let members = T::members().into_members();
        tracing::debug!("Registry: declared {} with {} members", key, members.len());
        self.catalogs
            .insert(key.name().to_ascii_lowercase(), Catalog { key, members });
        self
    }

    /// Add or overwrite a member; keyed by owner type and lowercased name.
    pub fn register(&mut self, member: MemberDescriptor) -> &mut Self {
        let owner = member.declaring_type();
        let key = member.name().to_ascii_lowercase();
        let entry = self
            .types
            .entry(owner.id())
            .or_insert_with(|| TypeMembers::new(owner));
        if entry.members.insert(key, Arc::new(member)).is_some() {
            tracing::debug!("Registry: re-registered a member of {}", owner);
        } else {
            tracing::debug!("Registry: whitelisted a member of {}", owner);
        }
        self
    }

    pub(crate) fn catalog(&self, type_name: &str) -> Option<&Catalog> {
        self.catalogs.get(&type_name.to_ascii_lowercase())
    }

    pub(crate) fn record_error(&mut self, error: RegistryError) {
        tracing::debug!("Registry: {}", error);
        self.errors.push(error);
    }

    /// Freeze the configuration. Fails with the first recorded error.
    pub fn build(mut self) -> Result<Registry, RegistryError> {
        if !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }
        Ok(Registry { types: self.types })
    }
}

/// Per-type configuration scope handed out by [`RegistryBuilder::configure`].
pub struct TypeConfig<'b, T> {
    builder: &'b mut RegistryBuilder,
    _owner: PhantomData<fn(&T)>,
}

impl<'b, T: Any> TypeConfig<'b, T> {
    fn new(builder: &'b mut RegistryBuilder) -> Self {
        Self {
            builder,
            _owner: PhantomData,
        }
    }

    /// Whitelist a member backed by a field of `T`.
    pub fn field<V, F>(self, name: &str, get: F) -> Self
    where
        V: Field,
        F: Fn(&T) -> &V + Send + Sync + 'static,
    {
        self.builder.register(MemberDescriptor::field(name, get));
        self
    }

    /// Whitelist a member computed from `T`.
    pub fn computed<S, F>(self, name: &str, get: F) -> Self
    where
        S: Scalar,
        F: Fn(&T) -> S + Send + Sync + 'static,
    {
        self.builder.register(MemberDescriptor::computed(name, get));
        self
    }
}

impl<T: Record> TypeConfig<'_, T> {
    /// Whitelist one of the members `T` declares.
    pub fn whitelist(self, name: &str) -> Self {
        match T::members().find(name) {
            Some(member) => {
                self.builder.register(member.clone());
            }
            None => self.builder.record_error(RegistryError::UnknownMember {
                type_name: TypeKey::of::<T>().name().to_string(),
                member: name.to_string(),
            }),
        }
        self
    }

    /// Whitelist every member `T` declares.
    pub fn whitelist_all(self) -> Self {
        for member in T::members().into_members() {
            self.builder.register(member);
        }
        self
    }
}

/// Immutable snapshot of the whitelist, safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: HashMap<TypeId, TypeMembers>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Case-insensitive member lookup; `None` for anything not whitelisted.
    pub fn lookup(&self, owner: TypeKey, name: &str) -> Option<&Arc<MemberDescriptor>> {
        self.types
            .get(&owner.id())?
            .members
            .get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, owner: TypeKey) -> bool {
        self.types
            .get(&owner.id())
            .is_some_and(|entry| !entry.members.is_empty())
    }

    pub fn members(&self, owner: TypeKey) -> impl Iterator<Item = &Arc<MemberDescriptor>> {
        self.types
            .get(&owner.id())
            .into_iter()
            .flat_map(|entry| entry.members.values())
    }

    pub fn types(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.types.values().map(|entry| entry.key)
    }
}
