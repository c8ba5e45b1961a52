// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Field listings of serde structs, read off their `Deserialize` impls.
//!
//! A derived (or generated) `Deserialize` impl announces its struct name and
//! field names through `deserialize_struct`. Feeding it a map with a single
//! entry then shows how that one field is deserialized: as a nested struct,
//! a list of structs or anything else. No value is ever produced; every walk
//! ends in an error once it has been observed.

use std::cell::Cell;
use std::fmt;

use serde::de::value::StrDeserializer;
use serde::de::{
    self,
    DeserializeOwned,
    DeserializeSeed,
    IntoDeserializer,
    MapAccess,
    SeqAccess,
    Visitor,
};
use serde::forward_to_deserialize_any;

#[cfg(test)]
#[path = "./reflect_test.rs"]
mod reflect_test;

/// How a single field is deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    /// Scalars, free-form maps, lists of scalars and custom formats.
    Scalar,
    /// A nested struct with the given serde name.
    Struct(&'static str),
    /// A list of the named nested struct.
    ListOf(&'static str),
}

/// A struct as described by its `Deserialize` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reflected {
    pub name: &'static str,
    pub fields: Vec<(&'static str, Shape)>,
}

/// Describe `T`, or `None` if it is not deserialized as a struct.
pub(crate) fn reflect<T: DeserializeOwned>() -> Option<Reflected> {
    let (name, fields) = observe::<T>(None).0?;
    let fields = fields
        .iter()
        .map(|&field| (field, observe::<T>(Some(field)).1.unwrap_or(Shape::Scalar)))
        .collect();
    Some(Reflected { name, fields })
}

type StructInfo = (&'static str, &'static [&'static str]);

fn observe<T: DeserializeOwned>(field: Option<&'static str>) -> (Option<StructInfo>, Option<Shape>) {
    let found = Cell::new(None);
    let shape = Cell::new(None);
    let outer = Outer {
        field,
        found: &found,
        shape: &shape,
    };
    // the walk always stops with an error, what matters is what it recorded
    let _ = T::deserialize(outer);
    (found.get(), shape.get())
}

#[derive(Debug)]
struct Stop;

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("reflection stopped")
    }
}

impl std::error::Error for Stop {}

impl de::Error for Stop {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Stop
    }
}

/// Stands in for the struct itself.
struct Outer<'a> {
    field: Option<&'static str>,
    found: &'a Cell<Option<StructInfo>>,
    shape: &'a Cell<Option<Shape>>,
}

impl<'de> de::Deserializer<'de> for Outer<'_> {
    type Error = Stop;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Stop> {
        Err(Stop)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Stop> {
        self.found.set(Some((name, fields)));
        match self.field {
            Some(field) => visitor.visit_map(Entry {
                key: Some(field),
                value: Some(Inner {
                    shape: self.shape,
                    in_list: false,
                }),
            }),
            None => Err(Stop),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

/// Stands in for the value of the field being observed.
#[derive(Clone, Copy)]
struct Inner<'a> {
    shape: &'a Cell<Option<Shape>>,
    in_list: bool,
}

impl Inner<'_> {
    fn record(&self, shape: Shape) -> Stop {
        if self.shape.get().is_none() {
            self.shape.set(Some(shape));
        }
        Stop
    }
}

impl<'de> de::Deserializer<'de> for Inner<'_> {
    type Error = Stop;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Stop> {
        Err(self.record(Shape::Scalar))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Stop> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Stop> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Stop> {
        if self.in_list {
            return Err(self.record(Shape::Scalar));
        }
        visitor.visit_seq(Element {
            value: Some(Inner {
                in_list: true,
                ..self
            }),
        })
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Stop> {
        let shape = if self.in_list {
            Shape::ListOf(name)
        } else {
            Shape::Struct(name)
        };
        Err(self.record(shape))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct tuple tuple_struct map enum identifier
        ignored_any
    }
}

/// A map holding only the observed field.
struct Entry<'a> {
    key: Option<&'static str>,
    value: Option<Inner<'a>>,
}

impl<'de> MapAccess<'de> for Entry<'_> {
    type Error = Stop;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Stop> {
        match self.key.take() {
            Some(key) => {
                let key: StrDeserializer<'static, Stop> = key.into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Stop> {
        match self.value.take() {
            Some(value) => seed.deserialize(value),
            None => Err(Stop),
        }
    }
}

/// A list holding a single element.
struct Element<'a> {
    value: Option<Inner<'a>>,
}

impl<'de> SeqAccess<'de> for Element<'_> {
    type Error = Stop;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Stop> {
        match self.value.take() {
            Some(value) => seed.deserialize(value).map(Some),
            None => Ok(None),
        }
    }
}
