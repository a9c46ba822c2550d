//! Member descriptors: the capability table entries filters may dereference.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::value::{Field, ObjectRef, Scalar, StaticType, TypeKey, Value};

/// Type-erased read access to one member of a host type.
pub type Accessor = Arc<dyn Fn(&dyn Any) -> Value<'_> + Send + Sync>;

fn erase<F>(read: F) -> Accessor
where
    F: Fn(&dyn Any) -> Value<'_> + Send + Sync + 'static,
{
    Arc::new(read)
}

/// A whitelisted member of a host type.
#[derive(Clone)]
pub struct MemberDescriptor {
    name: String,
    declaring_type: TypeKey,
    value_type: StaticType,
    accessor: Accessor,
}

impl MemberDescriptor {
    /// Member backed by a borrowed field of `T`.
    pub fn field<T, V, F>(name: impl Into<String>, get: F) -> Self
    where
        T: Any,
        V: Field,
        F: Fn(&T) -> &V + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            declaring_type: TypeKey::of::<T>(),
            value_type: V::static_type(),
            accessor: erase(move |owner: &dyn Any| match owner.downcast_ref::<T>() {
                Some(owner) => get(owner).to_value(),
                None => Value::Null,
            }),
        }
    }

    /// Member whose value is computed from `T` on every read.
    pub fn computed<T, S, F>(name: impl Into<String>, get: F) -> Self
    where
        T: Any,
        S: Scalar,
        F: Fn(&T) -> S + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            declaring_type: TypeKey::of::<T>(),
            value_type: S::static_type(),
            accessor: erase(move |owner: &dyn Any| match owner.downcast_ref::<T>() {
                Some(owner) => get(owner).into_value(),
                None => Value::Null,
            }),
        }
    }

    /// Name as registered (lookups ignore case).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_type(&self) -> TypeKey {
        self.declaring_type
    }

    pub fn value_type(&self) -> StaticType {
        self.value_type
    }

    /// Read this member from an instance of its declaring type.
    ///
    /// Yields `Value::Null` when `owner` is not of the declaring type.
    pub fn read<'a>(&self, owner: ObjectRef<'a>) -> Value<'a> {
        (self.accessor)(owner.as_any())
    }
}

impl PartialEq for MemberDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_type == other.declaring_type
            && self.name == other.name
            && self.value_type == other.value_type
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_type)
            .field("value_type", &self.value_type)
            .finish()
    }
}

/// The set of public data members a [`Record`](super::Record) declares.
pub struct MemberSet<T> {
    members: Vec<MemberDescriptor>,
    _owner: PhantomData<fn(&T)>,
}

impl<T: Any> MemberSet<T> {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            _owner: PhantomData,
        }
    }

    pub fn field<V, F>(mut self, name: &str, get: F) -> Self
    where
        V: Field,
        F: Fn(&T) -> &V + Send + Sync + 'static,
    {
        self.members.push(MemberDescriptor::field(name, get));
        self
    }

    pub fn computed<S, F>(mut self, name: &str, get: F) -> Self
    where
        S: Scalar,
        F: Fn(&T) -> S + Send + Sync + 'static,
    {
        self.members.push(MemberDescriptor::computed(name, get));
        self
    }

    pub fn find(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members
            .iter()
            .find(|member| member.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemberDescriptor> {
        self.members.iter()
    }

    pub fn into_members(self) -> Vec<MemberDescriptor> {
        self.members
    }
}

impl<T: Any> Default for MemberSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ValueType;
    use rust_decimal::Decimal;

    struct Gauge {
        label: String,
        level: Option<u8>,
    }

    #[test]
    fn field_accessor_reads_borrowed_member() {
        let member = MemberDescriptor::field("Label", |g: &Gauge| &g.label);
        let gauge = Gauge {
            label: "north".into(),
            level: None,
        };
        assert_eq!(member.value_type(), StaticType::of(ValueType::String));
        assert_eq!(member.read(ObjectRef::new(&gauge)), Value::String("north".into()));
    }

    #[test]
    fn computed_accessor_reads_owned_value() {
        let member = MemberDescriptor::computed("Length", |s: &String| s.len());
        let text = String::from("hello");
        assert_eq!(member.value_type(), StaticType::of(ValueType::Number));
        assert_eq!(member.read(ObjectRef::new(&text)), Value::Number(Decimal::from(5)));
    }

    #[test]
    fn accessor_on_foreign_owner_yields_null() {
        let member = MemberDescriptor::field("Level", |g: &Gauge| &g.level);
        let other = 5u32;
        assert_eq!(member.read(ObjectRef::new(&other)), Value::Null);
    }

    #[test]
    fn member_set_finds_names_ignoring_case() {
        let set = MemberSet::<Gauge>::new()
            .field("Label", |g| &g.label)
            .field("Level", |g| &g.level);
        assert_eq!(set.find("LABEL").map(MemberDescriptor::name), Some("Label"));
        assert!(set.find("Missing").is_none());
        assert_eq!(set.iter().count(), 2);
    }
}
