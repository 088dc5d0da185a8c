//! serde `Serializer` producing [`Value`]s, and the shape sniffer.

use std::sync::Arc;

use serde::ser::{self, Serialize};

use crate::error::{Error, ErrorKind, Result};
use crate::mapper::ContentMapper;
use crate::protocol::{is_protocol_key, ProtocolInfo, XmlHints, PROTOCOL_INFO_FIELD};
use crate::schema::{self, TypeSchema};
use crate::value::{assemble_mapping, Collection, Resource, Shape, Value, COLLECTION_TOKEN};

pub(crate) struct ValueSerializer<'a> {
    pub(crate) mapper: &'a ContentMapper,
}

impl<'a> ValueSerializer<'a> {
    fn child<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value> {
        value.serialize(ValueSerializer {
            mapper: self.mapper,
        })
    }
}

fn tagged(variant: &'static str, value: Value) -> Value {
    Value::Resource(Resource::new().field(variant, value))
}

impl<'a> ser::Serializer for ValueSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SeqSerializer<'a>;
    type SerializeTuple = SeqSerializer<'a>;
    type SerializeTupleStruct = SeqSerializer<'a>;
    type SerializeTupleVariant = TupleVariantSerializer<'a>;
    type SerializeMap = MapSerializer<'a>;
    type SerializeStruct = StructSerializer<'a>;
    type SerializeStructVariant = StructVariantSerializer<'a>;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        if let Ok(n) = i64::try_from(v) {
            return Ok(Value::from(n));
        }
        u64::try_from(v)
            .map(Value::from)
            .map_err(|_| Error::serialization(format!("integer {v} out of range")))
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Value> {
        u64::try_from(v)
            .map(Value::from)
            .map_err(|_| Error::serialization(format!("integer {v} out of range")))
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::from(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::Collection(v.iter().map(|b| Value::from(*b)).collect()))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::null())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::null())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::null())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::from(variant))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value> {
        Ok(tagged(variant, self.child(value)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqSerializer<'a>> {
        Ok(SeqSerializer {
            mapper: self.mapper,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqSerializer<'a>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqSerializer<'a>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<TupleVariantSerializer<'a>> {
        Ok(TupleVariantSerializer {
            variant,
            seq: self.serialize_seq(Some(len))?,
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapSerializer<'a>> {
        Ok(MapSerializer {
            mapper: self.mapper,
            entries: Vec::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<StructSerializer<'a>> {
        Ok(StructSerializer::new(self.mapper, name, len))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<StructVariantSerializer<'a>> {
        Ok(StructVariantSerializer {
            variant,
            inner: StructSerializer::new(self.mapper, name, len),
        })
    }
}

pub(crate) struct SeqSerializer<'a> {
    mapper: &'a ContentMapper,
    items: Vec<Value>,
}

impl SeqSerializer<'_> {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let item = value.serialize(ValueSerializer {
            mapper: self.mapper,
        })?;
        self.items.push(item);
        Ok(())
    }

    fn finish(self) -> Value {
        Value::Collection(Collection::new(self.items))
    }
}

impl ser::SerializeSeq for SeqSerializer<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqSerializer<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqSerializer<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

pub(crate) struct TupleVariantSerializer<'a> {
    variant: &'static str,
    seq: SeqSerializer<'a>,
}

impl ser::SerializeTupleVariant for TupleVariantSerializer<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.seq.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(tagged(self.variant, self.seq.finish()))
    }
}

/// Dictionaries. Keys are used verbatim; `$` keys feed fresh metadata.
pub(crate) struct MapSerializer<'a> {
    mapper: &'a ContentMapper,
    entries: Vec<(String, Value)>,
    next_key: Option<String>,
}

fn map_key(key: Value) -> Result<String> {
    match key {
        Value::Scalar(scalar) => scalar
            .to_text()
            .ok_or_else(|| Error::serialization("map key must not be null")),
        other => Err(Error::serialization(format!(
            "map key must be a scalar, found {:?}",
            other.shape()
        ))),
    }
}

impl ser::SerializeMap for MapSerializer<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        let key = key.serialize(ValueSerializer {
            mapper: self.mapper,
        })?;
        self.next_key = Some(map_key(key)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| Error::serialization("map value without a key"))?;
        let value = value.serialize(ValueSerializer {
            mapper: self.mapper,
        })?;
        self.entries.push((key, value));
        Ok(())
    }

    fn end(self) -> Result<Value> {
        assemble_mapping(self.entries, false)
    }
}

/// Plain objects.
pub(crate) struct StructSerializer<'a> {
    mapper: &'a ContentMapper,
    type_name: &'static str,
    schema: Option<Arc<TypeSchema>>,
    fields: Vec<(String, Value)>,
    reserved: Vec<(&'static str, Value)>,
    attached: Option<ProtocolInfo>,
}

impl<'a> StructSerializer<'a> {
    fn new(mapper: &'a ContentMapper, type_name: &'static str, len: usize) -> Self {
        Self {
            mapper,
            type_name,
            schema: schema::schema_for(type_name),
            fields: Vec::with_capacity(len),
            reserved: Vec::new(),
            attached: None,
        }
    }

    fn finish(self) -> Result<Value> {
        let info = match self.attached {
            // The object's own metadata wins; `$` members are not applied over it.
            Some(info) => Some(info),
            None => {
                let mut fresh = ProtocolInfo::default();
                for (key, value) in self.reserved {
                    if !fresh.apply_wire_member(key, value)? {
                        return Err(Error::new(ErrorKind::UnknownProtocolProperty(
                            key.to_string(),
                        )));
                    }
                }
                let declared = schema::declared_hints(self.type_name);
                if fresh.is_empty() && declared.is_none() {
                    None
                } else {
                    let mut hints = declared.unwrap_or_default();
                    hints.merge(fresh.xml());
                    if hints.local_name.is_none() {
                        hints.local_name = Some(self.type_name.to_string());
                    }
                    *fresh.xml_mut() = hints;
                    Some(fresh)
                }
            }
        };

        let mut resource = Resource::new();
        for (key, value) in self.fields {
            resource.insert(key, value);
        }
        resource.set_info(info);
        resource.set_type_name(Some(self.type_name.to_string()));
        Ok(Value::Resource(resource))
    }
}

/// Merge member hints into the metadata of a resource or collection.
fn apply_member_hints(value: &mut Value, hints: &XmlHints) {
    if let Some(slot) = value.protocol_slot_mut() {
        slot.get_or_insert_with(ProtocolInfo::default)
            .xml_mut()
            .merge(hints);
    }
}

impl ser::SerializeStruct for StructSerializer<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        let mut value = value.serialize(ValueSerializer {
            mapper: self.mapper,
        })?;

        if key == PROTOCOL_INFO_FIELD {
            if !value.is_null() {
                self.attached = Some(self.mapper.deserialize::<ProtocolInfo>(value)?);
            }
            return Ok(());
        }
        if is_protocol_key(key) {
            if !value.is_null() {
                self.reserved.push((key, value));
            }
            return Ok(());
        }

        if let Some(hints) = self.schema.as_ref().and_then(|s| s.member_hints(key)) {
            apply_member_hints(&mut value, hints);
        }
        self.fields
            .push((self.mapper.naming().member_name(key), value));
        Ok(())
    }

    fn end(self) -> Result<Value> {
        self.finish()
    }
}

pub(crate) struct StructVariantSerializer<'a> {
    variant: &'static str,
    inner: StructSerializer<'a>,
}

impl ser::SerializeStructVariant for StructVariantSerializer<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        ser::SerializeStruct::serialize_field(&mut self.inner, key, value)
    }

    fn end(self) -> Result<Value> {
        Ok(tagged(self.variant, self.inner.finish()?))
    }
}

/// Classifies a value without serializing its children.
pub(crate) struct ShapeSniffer;

pub(crate) struct ShapeCompound(Shape);

macro_rules! leaf_shapes {
    ($($method:ident($($arg:ty),*)),* $(,)?) => {
        $(
            fn $method(self, $(_: $arg),*) -> Result<Shape> {
                Ok(Shape::Scalar)
            }
        )*
    };
}

impl ser::Serializer for ShapeSniffer {
    type Ok = Shape;
    type Error = Error;

    type SerializeSeq = ShapeCompound;
    type SerializeTuple = ShapeCompound;
    type SerializeTupleStruct = ShapeCompound;
    type SerializeTupleVariant = ShapeCompound;
    type SerializeMap = ShapeCompound;
    type SerializeStruct = ShapeCompound;
    type SerializeStructVariant = ShapeCompound;

    leaf_shapes! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_i128(i128),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_u128(u128),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_none(),
        serialize_unit(),
        serialize_unit_struct(&'static str),
        serialize_unit_variant(&'static str, u32, &'static str),
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Shape> {
        Ok(Shape::Sequence)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Shape> {
        value.serialize(self)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Shape> {
        if name == COLLECTION_TOKEN {
            return Ok(Shape::Sequence);
        }
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Shape> {
        Ok(Shape::Object)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<ShapeCompound> {
        Ok(ShapeCompound(Shape::Sequence))
    }

    fn serialize_tuple(self, _len: usize) -> Result<ShapeCompound> {
        Ok(ShapeCompound(Shape::Sequence))
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<ShapeCompound> {
        Ok(ShapeCompound(Shape::Sequence))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<ShapeCompound> {
        Ok(ShapeCompound(Shape::Object))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<ShapeCompound> {
        Ok(ShapeCompound(Shape::Mapping))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<ShapeCompound> {
        Ok(ShapeCompound(Shape::Object))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<ShapeCompound> {
        Ok(ShapeCompound(Shape::Object))
    }
}

macro_rules! ignore_compound {
    ($($trait:ident :: $method:ident($($arg:ident: $ty:ty),*)),* $(,)?) => {
        $(
            impl ser::$trait for ShapeCompound {
                type Ok = Shape;
                type Error = Error;

                fn $method<T: Serialize + ?Sized>(&mut self, $($arg: $ty),*) -> Result<()> {
                    $(let _ = $arg;)*
                    Ok(())
                }

                fn end(self) -> Result<Shape> {
                    Ok(self.0)
                }
            }
        )*
    };
}

ignore_compound! {
    SerializeSeq::serialize_element(value: &T),
    SerializeTuple::serialize_element(value: &T),
    SerializeTupleStruct::serialize_field(value: &T),
    SerializeTupleVariant::serialize_field(value: &T),
    SerializeStruct::serialize_field(key: &'static str, value: &T),
    SerializeStructVariant::serialize_field(key: &'static str, value: &T),
}

impl ser::SerializeMap for ShapeCompound {
    type Ok = Shape;
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, _key: &T) -> Result<()> {
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<()> {
        Ok(())
    }

    fn end(self) -> Result<Shape> {
        Ok(self.0)
    }
}
