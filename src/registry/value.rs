//! Static types and runtime values exchanged between host records and filters.

use rust_decimal::Decimal;
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use time::OffsetDateTime;

use super::member::MemberSet;

/// Identity of a host type reachable from filter text.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Type name without its module path, used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let path = full.split('<').next().unwrap_or(full);
    match path.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Kind of value an expression produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Number,
    String,
    Timestamp,
    /// A host type whose members are resolved through the registry.
    Object(TypeKey),
    /// The type of a bare `null` literal.
    Null,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "Bool"),
            ValueType::Number => write!(f, "Number"),
            ValueType::String => write!(f, "String"),
            ValueType::Timestamp => write!(f, "Timestamp"),
            ValueType::Object(key) => write!(f, "{}", key),
            ValueType::Null => write!(f, "Null"),
        }
    }
}

/// Static type recorded on every AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticType {
    pub value: ValueType,
    pub nullable: bool,
}

impl StaticType {
    pub const fn of(value: ValueType) -> Self {
        Self {
            value,
            nullable: false,
        }
    }

    pub const fn nullable(value: ValueType) -> Self {
        Self {
            value,
            nullable: true,
        }
    }

    pub const fn null() -> Self {
        Self::nullable(ValueType::Null)
    }

    pub const fn bool() -> Self {
        Self::of(ValueType::Bool)
    }

    pub fn to_nullable(self) -> Self {
        Self::nullable(self.value)
    }

    /// Strings and objects are reference-like and always admit `null`.
    pub fn accepts_null(&self) -> bool {
        self.nullable
            || matches!(
                self.value,
                ValueType::String | ValueType::Object(_) | ValueType::Null
            )
    }

    /// The registry key to resolve members against, if this is an object type.
    pub fn object(&self) -> Option<TypeKey> {
        match self.value {
            ValueType::Object(key) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable && self.value != ValueType::Null {
            write!(f, "{}?", self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// Borrowed host object together with its type identity.
#[derive(Clone, Copy)]
pub struct ObjectRef<'a> {
    value: &'a dyn Any,
    key: TypeKey,
}

impl<'a> ObjectRef<'a> {
    pub fn new<T: Any>(value: &'a T) -> Self {
        Self {
            value,
            key: TypeKey::of::<T>(),
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub(crate) fn as_any(&self) -> &'a dyn Any {
        self.value
    }
}

impl PartialEq for ObjectRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && std::ptr::addr_eq(self.value, other.value)
    }
}

impl fmt::Debug for ObjectRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.key)
    }
}

/// A value read from a host instance or produced by a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Number(Decimal),
    String(Cow<'a, str>),
    Timestamp(OffsetDateTime),
    Object(ObjectRef<'a>),
}

impl Value<'_> {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Object(obj) => ValueType::Object(obj.key()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A member value type the registry knows how to expose.
pub trait Field: 'static {
    fn static_type() -> StaticType;
    fn to_value(&self) -> Value<'_>;
}

/// Owned field values, returned by computed members.
pub trait Scalar: Field {
    fn into_value(self) -> Value<'static>;
}

/// A host type that declares its public data members.
///
/// This is the catalog `whitelist_all` and name-based whitelisting draw
/// from; nothing in it is reachable from filter text until registered.
pub trait Record: Any + Sized {
    fn members() -> MemberSet<Self>;
}

impl<R: Record> Field for R {
    fn static_type() -> StaticType {
        StaticType::of(ValueType::Object(TypeKey::of::<R>()))
    }

    fn to_value(&self) -> Value<'_> {
        Value::Object(ObjectRef::new(self))
    }
}

impl<V: Field> Field for Option<V> {
    fn static_type() -> StaticType {
        V::static_type().to_nullable()
    }

    fn to_value(&self) -> Value<'_> {
        self.as_ref().map_or(Value::Null, Field::to_value)
    }
}

impl<S: Scalar> Scalar for Option<S> {
    fn into_value(self) -> Value<'static> {
        self.map_or(Value::Null, Scalar::into_value)
    }
}

impl Field for bool {
    fn static_type() -> StaticType {
        StaticType::of(ValueType::Bool)
    }

    fn to_value(&self) -> Value<'_> {
        Value::Bool(*self)
    }
}

impl Scalar for bool {
    fn into_value(self) -> Value<'static> {
        Value::Bool(self)
    }
}

impl Field for Decimal {
    fn static_type() -> StaticType {
        StaticType::of(ValueType::Number)
    }

    fn to_value(&self) -> Value<'_> {
        Value::Number(*self)
    }
}

impl Scalar for Decimal {
    fn into_value(self) -> Value<'static> {
        Value::Number(self)
    }
}

macro_rules! integer_field {
    ($($ty:ty),*) => {
        $(
            impl Field for $ty {
                fn static_type() -> StaticType {
                    StaticType::of(ValueType::Number)
                }

                fn to_value(&self) -> Value<'_> {
                    Value::Number(Decimal::from(*self))
                }
            }

            impl Scalar for $ty {
                fn into_value(self) -> Value<'static> {
                    Value::Number(Decimal::from(self))
                }
            }
        )*
    };
}

integer_field!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Field for String {
    fn static_type() -> StaticType {
        StaticType::of(ValueType::String)
    }

    fn to_value(&self) -> Value<'_> {
        Value::String(Cow::Borrowed(self.as_str()))
    }
}

impl Scalar for String {
    fn into_value(self) -> Value<'static> {
        Value::String(Cow::Owned(self))
    }
}

impl Field for OffsetDateTime {
    fn static_type() -> StaticType {
        StaticType::of(ValueType::Timestamp)
    }

    fn to_value(&self) -> Value<'_> {
        Value::Timestamp(*self)
    }
}

impl Scalar for OffsetDateTime {
    fn into_value(self) -> Value<'static> {
        Value::Timestamp(self)
    }
}
