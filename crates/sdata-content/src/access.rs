//! Uniform read/write access to protocol metadata on arbitrary values.
//!
//! Resources and collections carry their metadata in an info slot. Plain
//! types opt in through [`ProtocolObject`], either by exposing a
//! `$protocol` slot of their own or by describing which members back which
//! protocol properties.
//!
//! ```
//! use sdata_content::{get_protocol_value, set_protocol_value};
//! use sdata_content::{ProtocolMembers, ProtocolObject, ProtocolProperty};
//!
//! #[derive(Default)]
//! struct Account {
//!     code: String,
//! }
//!
//! impl ProtocolObject for Account {
//!     fn protocol_members() -> ProtocolMembers<Self> {
//!         ProtocolMembers::<Self>::new().field(ProtocolProperty::Key, |a| &a.code, |a| &mut a.code)
//!     }
//! }
//!
//! let mut account = Account::default();
//! assert!(set_protocol_value(&mut account, ProtocolProperty::Key, "A-1").unwrap());
//! assert_eq!(account.code, "A-1");
//! assert!(get_protocol_value(&account, ProtocolProperty::ETag).is_none());
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::error::Result;
use crate::mapper::ContentMapper;
use crate::protocol::{ProtocolInfo, ProtocolProperty};
use crate::value::{Collection, Resource, Scalar, Value};

type Getter<T> = Box<dyn Fn(&T) -> Option<Scalar> + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, Scalar) -> Result<()> + Send + Sync>;

struct Member<T> {
    property: ProtocolProperty,
    getter: Option<Getter<T>>,
    setter: Option<Setter<T>>,
}

/// The members of `T` that back protocol properties.
pub struct ProtocolMembers<T> {
    members: Vec<Member<T>>,
}

impl<T> Default for ProtocolMembers<T> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
        }
    }
}

impl<T: 'static> ProtocolMembers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back `property` with a member, converting through the content mapper.
    ///
    /// A member holding `F::default()` reads as absent, so a `String` key
    /// is unset until it is non-empty. Use `Option<F>` where the default
    /// value is meaningful.
    pub fn field<F>(
        self,
        property: ProtocolProperty,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self
    where
        F: Serialize + DeserializeOwned + Default + 'static,
    {
        let unset = match ContentMapper::default().serialize(&F::default()) {
            Ok(Value::Scalar(scalar)) => Some(scalar),
            _ => None,
        };
        self.getter(property, move |target| {
            match ContentMapper::default().serialize(get(target)) {
                Ok(Value::Scalar(scalar))
                    if !scalar.is_null() && Some(&scalar) != unset.as_ref() =>
                {
                    Some(scalar)
                }
                _ => None,
            }
        })
        .setter(property, move |target, value| {
            *get_mut(target) = ContentMapper::default().deserialize(Value::Scalar(value))?;
            Ok(())
        })
    }

    /// Like [`ProtocolMembers::field`], naming the property as a string
    /// (`"ETag"` or `"$etag"`).
    pub fn named<F>(
        self,
        property: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Result<Self>
    where
        F: Serialize + DeserializeOwned + Default + 'static,
    {
        Ok(self.field(property.parse()?, get, get_mut))
    }

    pub fn getter(
        mut self,
        property: ProtocolProperty,
        getter: impl Fn(&T) -> Option<Scalar> + Send + Sync + 'static,
    ) -> Self {
        self.slot(property).getter = Some(Box::new(getter));
        self
    }

    pub fn setter(
        mut self,
        property: ProtocolProperty,
        setter: impl Fn(&mut T, Scalar) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.slot(property).setter = Some(Box::new(setter));
        self
    }

    pub fn properties(&self) -> impl Iterator<Item = ProtocolProperty> + '_ {
        self.members.iter().map(|m| m.property)
    }

    fn slot(&mut self, property: ProtocolProperty) -> &mut Member<T> {
        let index = match self.members.iter().position(|m| m.property == property) {
            Some(index) => index,
            None => {
                self.members.push(Member {
                    property,
                    getter: None,
                    setter: None,
                });
                self.members.len() - 1
            }
        };
        &mut self.members[index]
    }

    fn member(&self, property: ProtocolProperty) -> Option<&Member<T>> {
        self.members.iter().find(|m| m.property == property)
    }

    fn get(&self, target: &T, property: ProtocolProperty) -> Option<Scalar> {
        let getter = self.member(property)?.getter.as_ref()?;
        getter(target)
    }

    fn set(&self, target: &mut T, property: ProtocolProperty, value: Scalar) -> Result<bool> {
        match self.member(property).and_then(|m| m.setter.as_ref()) {
            Some(setter) => setter(target, value).map(|()| true),
            None => Ok(false),
        }
    }
}

/// A type whose protocol metadata can be read and written generically.
pub trait ProtocolObject: 'static {
    /// The value's own metadata slot, for types that carry one.
    fn protocol_slot(&self) -> Option<&Option<ProtocolInfo>> {
        None
    }

    fn protocol_slot_mut(&mut self) -> Option<&mut Option<ProtocolInfo>> {
        None
    }

    /// Members backing protocol properties. Built once per type and cached.
    fn protocol_members() -> ProtocolMembers<Self>
    where
        Self: Sized,
    {
        ProtocolMembers::<Self>::new()
    }
}

static MEMBER_TABLES: LazyLock<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn members_for<T: ProtocolObject>() -> Arc<ProtocolMembers<T>> {
    let id = TypeId::of::<T>();
    let cached = MEMBER_TABLES
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(&id)
        .cloned();
    if let Some(table) = cached.and_then(|t| t.downcast::<ProtocolMembers<T>>().ok()) {
        return table;
    }

    let built = Arc::new(T::protocol_members());
    trace!(type_name = std::any::type_name::<T>(), "building protocol member table");
    let mut tables = MEMBER_TABLES.write().unwrap_or_else(|e| e.into_inner());
    let entry = tables
        .entry(id)
        .or_insert_with(|| built.clone() as Arc<dyn Any + Send + Sync>)
        .clone();
    entry.downcast::<ProtocolMembers<T>>().unwrap_or(built)
}

/// Read `property` from `target`. Absent until something sets it.
pub fn get_protocol_value<T: ProtocolObject>(
    target: &T,
    property: ProtocolProperty,
) -> Option<Scalar> {
    if let Some(slot) = target.protocol_slot() {
        return slot.as_ref().and_then(|info| info.get(property)).cloned();
    }
    members_for::<T>().get(target, property)
}

/// Write `property` on `target`. Returns false when nothing backs it.
///
/// Writing `Null` clears the property.
pub fn set_protocol_value<T: ProtocolObject>(
    target: &mut T,
    property: ProtocolProperty,
    value: impl Into<Scalar>,
) -> Result<bool> {
    let value = value.into();
    if let Some(slot) = target.protocol_slot_mut() {
        match slot {
            Some(info) => info.set(property, value),
            None if value.is_null() => {}
            None => *slot = Some(ProtocolInfo::new().with(property, value)),
        }
        return Ok(true);
    }
    members_for::<T>().set(target, property, value)
}

impl ProtocolObject for Resource {
    fn protocol_slot(&self) -> Option<&Option<ProtocolInfo>> {
        Some(self.info_slot())
    }

    fn protocol_slot_mut(&mut self) -> Option<&mut Option<ProtocolInfo>> {
        Some(self.info_slot_mut())
    }
}

impl ProtocolObject for Collection {
    fn protocol_slot(&self) -> Option<&Option<ProtocolInfo>> {
        Some(self.info_slot())
    }

    fn protocol_slot_mut(&mut self) -> Option<&mut Option<ProtocolInfo>> {
        Some(self.info_slot_mut())
    }
}

impl ProtocolObject for Value {
    fn protocol_slot(&self) -> Option<&Option<ProtocolInfo>> {
        match self {
            Value::Resource(r) => Some(r.info_slot()),
            Value::Collection(c) => Some(c.info_slot()),
            Value::Scalar(_) => None,
        }
    }

    fn protocol_slot_mut(&mut self) -> Option<&mut Option<ProtocolInfo>> {
        Value::protocol_slot_mut(self)
    }
}
