//! Typed, reflectable property records
//!
//! Behavior component data and rule element parameters are plain structs
//! declared through the [`props!`](crate::props!) macro. The macro generates:
//!
//! - a `Default` impl from the declared defaults
//! - a static descriptor table (name, id, kind, default, attributes)
//! - get/set by [`PropId`] through [`ExpressionValue`]
//! - JSON read/write keyed by field name
//!
//! ## Example
//!
//! ```
//! use tableau_core::{props, PropAttribs, PropId, Props};
//!
//! props! {
//!     /// Body settings
//!     pub struct BodyProps {
//!         x: f64 = 0.0,
//!         visible: bool = true => PropAttribs::new().label("visible").rules_get().rules_set(),
//!     }
//! }
//!
//! let mut body = BodyProps::default();
//! assert!(body.set(PropId::of("x"), &4.0.into()));
//! assert_eq!(body.x, 4.0);
//! assert_eq!(BodyProps::descriptors().len(), 2);
//! ```

use crate::archive::{Reader, Writer};
use crate::rules::LoadCx;
use crate::value::ExpressionValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Interned identifier of a property name
///
/// Computed as the FNV-1a hash of the name, so the same name always maps to
/// the same id without a shared table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropId(u32);

impl PropId {
    /// Intern a property name
    pub const fn of(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash: u32 = 0x811c_9dc5;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u32;
            hash = hash.wrapping_mul(0x0100_0193);
            i += 1;
        }
        PropId(hash)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PropId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prop:{:08x}", self.0)
    }
}

impl From<&str> for PropId {
    fn from(name: &str) -> Self {
        PropId::of(name)
    }
}

/// What kind of value a property holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropKind {
    Number,
    Integer,
    Boolean,
    String,
    Tag,
    Variable,
    Value,
    /// A literal or an authored expression tree, evaluated when a rule runs
    Expression,
}

/// Editor and rule-access metadata attached to a property
///
/// Bounds and allowed values describe what editors should offer. They are
/// not enforced when a property is set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PropAttribs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "no_values")]
    pub allowed_values: &'static [&'static str],
    pub rules_get: bool,
    pub rules_set: bool,
}

fn no_values(values: &&'static [&'static str]) -> bool {
    values.is_empty()
}

impl PropAttribs {
    pub const fn new() -> Self {
        Self {
            label: None,
            min: None,
            max: None,
            allowed_values: &[],
            rules_get: false,
            rules_set: false,
        }
    }

    pub const fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    pub const fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub const fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub const fn allowed(mut self, values: &'static [&'static str]) -> Self {
        self.allowed_values = values;
        self
    }

    /// Rules may read this property
    pub const fn rules_get(mut self) -> Self {
        self.rules_get = true;
        self
    }

    /// Rules may write this property
    pub const fn rules_set(mut self) -> Self {
        self.rules_set = true;
        self
    }
}

/// Static description of one property
#[derive(Debug, Clone, Serialize)]
pub struct PropertyDescriptor {
    #[serde(skip)]
    pub id: PropId,
    pub name: &'static str,
    pub kind: PropKind,
    pub default: ExpressionValue,
    #[serde(flatten)]
    pub attribs: PropAttribs,
}

impl PropertyDescriptor {
    /// Display label, falling back to the field name
    pub fn label(&self) -> &'static str {
        self.attribs.label.unwrap_or(self.name)
    }

    /// Whether an editor should accept `value` for this property
    pub fn accepts(&self, value: &ExpressionValue) -> bool {
        match value {
            ExpressionValue::Number(n) => {
                let numeric = matches!(
                    self.kind,
                    PropKind::Number
                        | PropKind::Integer
                        | PropKind::Boolean
                        | PropKind::Value
                        | PropKind::Expression
                );
                numeric
                    && self.attribs.min.map_or(true, |min| *n >= min)
                    && self.attribs.max.map_or(true, |max| *n <= max)
            }
            ExpressionValue::String(s) => {
                let textual = matches!(
                    self.kind,
                    PropKind::String
                        | PropKind::Tag
                        | PropKind::Variable
                        | PropKind::Value
                        | PropKind::Expression
                );
                textual
                    && (self.attribs.allowed_values.is_empty()
                        || self.attribs.allowed_values.contains(&&**s))
            }
        }
    }
}

/// A field type usable inside a [`props!`](crate::props!) record
pub trait PropValue: Clone + PartialEq + 'static {
    const KIND: PropKind;

    fn to_expression(&self) -> ExpressionValue;

    /// Convert from an expression value, `None` if the value has the wrong shape
    fn from_expression(value: &ExpressionValue) -> Option<Self>;

    /// Read the field at `key`, `None` if missing or malformed
    fn read_from(reader: &Reader<'_>, key: &str) -> Option<Self>;

    fn write_to(&self, writer: &mut Writer, key: &str);

    /// Resolve references to registered rule elements after reading
    fn resolve(&mut self, _cx: &LoadCx<'_>) {}
}

impl PropValue for f64 {
    const KIND: PropKind = PropKind::Number;

    fn to_expression(&self) -> ExpressionValue {
        ExpressionValue::Number(*self)
    }

    fn from_expression(value: &ExpressionValue) -> Option<Self> {
        value.as_number()
    }

    fn read_from(reader: &Reader<'_>, key: &str) -> Option<Self> {
        reader.num(key)
    }

    fn write_to(&self, writer: &mut Writer, key: &str) {
        writer.num(key, *self);
    }
}

impl PropValue for i32 {
    const KIND: PropKind = PropKind::Integer;

    fn to_expression(&self) -> ExpressionValue {
        ExpressionValue::Number(*self as f64)
    }

    fn from_expression(value: &ExpressionValue) -> Option<Self> {
        value.as_number().map(|n| n.round() as i32)
    }

    fn read_from(reader: &Reader<'_>, key: &str) -> Option<Self> {
        reader.num(key).map(|n| n.round() as i32)
    }

    fn write_to(&self, writer: &mut Writer, key: &str) {
        writer.int(key, *self as i64);
    }
}

impl PropValue for bool {
    const KIND: PropKind = PropKind::Boolean;

    fn to_expression(&self) -> ExpressionValue {
        ExpressionValue::from(*self)
    }

    fn from_expression(value: &ExpressionValue) -> Option<Self> {
        value.as_number().map(|n| n != 0.0)
    }

    fn read_from(reader: &Reader<'_>, key: &str) -> Option<Self> {
        reader.boolean(key)
    }

    fn write_to(&self, writer: &mut Writer, key: &str) {
        writer.boolean(key, *self);
    }
}

impl PropValue for String {
    const KIND: PropKind = PropKind::String;

    fn to_expression(&self) -> ExpressionValue {
        ExpressionValue::String(Arc::from(self.as_str()))
    }

    fn from_expression(value: &ExpressionValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn read_from(reader: &Reader<'_>, key: &str) -> Option<Self> {
        reader.str(key).map(str::to_string)
    }

    fn write_to(&self, writer: &mut Writer, key: &str) {
        writer.str(key, self);
    }
}

impl PropValue for ExpressionValue {
    const KIND: PropKind = PropKind::Value;

    fn to_expression(&self) -> ExpressionValue {
        self.clone()
    }

    fn from_expression(value: &ExpressionValue) -> Option<Self> {
        Some(value.clone())
    }

    fn read_from(reader: &Reader<'_>, key: &str) -> Option<Self> {
        reader.expression(key)
    }

    fn write_to(&self, writer: &mut Writer, key: &str) {
        writer.expression(key, self);
    }
}

/// A reflectable property record
///
/// Implemented by the [`props!`](crate::props!) macro; hand-written impls
/// must keep `descriptors()` consistent with `get`/`set`.
pub trait Props: Default + Clone + fmt::Debug + 'static {
    /// Descriptor table in declaration order
    fn descriptors() -> &'static [PropertyDescriptor];

    /// Current value of a property, `None` if this record has no such property
    fn get(&self, id: PropId) -> Option<ExpressionValue>;

    /// Assign a property. Returns `false` for unknown ids or mistyped values.
    fn set(&mut self, id: PropId, value: &ExpressionValue) -> bool;

    /// Overwrite fields present (and well-typed) in `reader`
    fn read(&mut self, reader: &Reader<'_>);

    fn write(&self, writer: &mut Writer);

    /// Resolve every field after reading rule element params
    fn resolve(&mut self, _cx: &LoadCx<'_>) {}

    fn descriptor(id: PropId) -> Option<&'static PropertyDescriptor> {
        Self::descriptors().iter().find(|d| d.id == id)
    }
}

/// Declare a property record
///
/// Each field is written `name: Type = default` with optional
/// `=> attribs` naming a [`PropAttribs`]. Field names double as JSON keys
/// and as the source of each [`PropId`].
#[macro_export]
macro_rules! props {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident : $ty:ty = $default:expr $(=> $attribs:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $ty,
            )*
        }

        impl ::core::default::Default for $name {
            fn default() -> Self {
                Self {
                    $( $field: $default, )*
                }
            }
        }

        impl $crate::Props for $name {
            fn descriptors() -> &'static [$crate::PropertyDescriptor] {
                static DESCRIPTORS: ::std::sync::OnceLock<::std::vec::Vec<$crate::PropertyDescriptor>> =
                    ::std::sync::OnceLock::new();
                DESCRIPTORS.get_or_init(|| {
                    #[allow(unused_variables)]
                    let defaults = <Self as ::core::default::Default>::default();
                    ::std::vec![
                        $(
                            $crate::PropertyDescriptor {
                                id: $crate::PropId::of(::core::stringify!($field)),
                                name: ::core::stringify!($field),
                                kind: <$ty as $crate::PropValue>::KIND,
                                default: $crate::PropValue::to_expression(&defaults.$field),
                                attribs: $crate::__prop_attribs!($($attribs)?),
                            },
                        )*
                    ]
                })
            }

            #[allow(unused_variables)]
            fn get(&self, id: $crate::PropId) -> ::core::option::Option<$crate::ExpressionValue> {
                $(
                    if id == $crate::PropId::of(::core::stringify!($field)) {
                        return ::core::option::Option::Some(
                            $crate::PropValue::to_expression(&self.$field),
                        );
                    }
                )*
                ::core::option::Option::None
            }

            #[allow(unused_variables)]
            fn set(&mut self, id: $crate::PropId, value: &$crate::ExpressionValue) -> bool {
                $(
                    if id == $crate::PropId::of(::core::stringify!($field)) {
                        return match <$ty as $crate::PropValue>::from_expression(value) {
                            ::core::option::Option::Some(v) => {
                                self.$field = v;
                                true
                            }
                            ::core::option::Option::None => false,
                        };
                    }
                )*
                false
            }

            #[allow(unused_variables)]
            fn read(&mut self, reader: &$crate::Reader<'_>) {
                $(
                    if let ::core::option::Option::Some(v) =
                        <$ty as $crate::PropValue>::read_from(reader, ::core::stringify!($field))
                    {
                        self.$field = v;
                    }
                )*
            }

            #[allow(unused_variables)]
            fn write(&self, writer: &mut $crate::Writer) {
                $(
                    $crate::PropValue::write_to(&self.$field, writer, ::core::stringify!($field));
                )*
            }

            #[allow(unused_variables)]
            fn resolve(&mut self, cx: &$crate::rules::LoadCx<'_>) {
                $(
                    $crate::PropValue::resolve(&mut self.$field, cx);
                )*
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __prop_attribs {
    () => {
        $crate::PropAttribs::new()
    };
    ($attribs:expr) => {
        $attribs
    };
}

crate::props! {
    /// The empty property record, for rule elements without parameters
    pub struct NoParams {}
}
