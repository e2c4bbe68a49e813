//! The tree representation the resolver produces and the code generator
//! consumes.
//!
//! One [`FileAst`] is built per input file and discarded once its source has
//! been rendered. Nodes keep descriptor order throughout so that output is
//! deterministic.

use std::collections::BTreeSet;

use crate::descriptor::source_code_info::Location;

/// A resolved input file.
#[derive(Debug)]
pub struct FileAst {
    /// The input file name, relative to the include root.
    pub name: String,
    /// The proto package, possibly empty.
    pub package: String,
    /// Top-level messages and enums, in descriptor order.
    pub nodes: Vec<Node>,
    /// Input files whose types this file references. Generated Rust reaches
    /// siblings through `super::` paths, so nothing is emitted for these,
    /// but the set is kept for diagnostics.
    pub imports: BTreeSet<String>,
}

/// A message or enum definition.
#[derive(Debug)]
pub enum Node {
    Message(MessageNode),
    Enum(EnumNode),
}

#[derive(Debug)]
pub struct MessageNode {
    /// The unqualified proto name.
    pub name: String,
    /// The generated type name.
    pub rust_name: String,
    /// The generated path from the file's type root, e.g. `shirt::Inner`.
    pub namespaced_name: String,
    pub comments: Comments,
    pub fields: Vec<Field>,
    /// Nested messages and enums, in descriptor order. Synthetic map entry
    /// messages are consumed into [`Kind::Map`] fields and do not appear.
    pub children: Vec<Node>,
}

#[derive(Debug)]
pub struct EnumNode {
    pub name: String,
    pub rust_name: String,
    pub namespaced_name: String,
    pub comments: Comments,
    /// Enumerators in descriptor order, aliases removed.
    pub variants: Vec<EnumVariant>,
}

#[derive(Debug)]
pub struct EnumVariant {
    /// The enumerator name as written in the proto file, which is also its
    /// JSON spelling.
    pub proto_name: String,
    /// The generated variant name, enum-name prefix stripped.
    pub rust_name: String,
    pub number: i32,
    pub comments: Comments,
}

/// A message field.
#[derive(Debug, Clone)]
pub struct Field {
    /// The generated attribute name (snake case, raw-escaped as needed).
    pub name: String,
    /// The field name as written in the proto file.
    pub proto_name: String,
    /// The JSON key: the compiler-provided lowerCamel spelling, or the
    /// verbatim `json_name` override.
    pub json_name: String,
    /// The proto field number.
    pub tag: u32,
    /// The value type. For map fields this is the type of the map values.
    pub ty: Ty,
    pub kind: Kind,
    /// Whether the generated field must be boxed to break a reference cycle.
    pub boxed: bool,
    pub comments: Comments,
}

/// Field cardinality. A field is exactly one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    /// A proto3 singular scalar or enum, implicit presence.
    Plain,
    /// Explicit presence: proto3 `optional`, a oneof member, or a singular
    /// message field.
    Optional,
    Repeated {
        /// Whether the field is written packed. Decoding accepts both forms
        /// regardless.
        packed: bool,
    },
    Map {
        key: Ty,
    },
}

/// A field's proto type, with resolved references for enums and messages.
///
/// This is the table that keys both the runtime codec module a field is
/// wired to and the generated type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Float,
    Double,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Enum(TypeRef),
    Message(TypeRef),
}

/// A resolved reference to a message or enum defined in this request.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    /// The fully-qualified proto name, with leading dot.
    pub proto_name: String,
    /// The Rust path to the generated type, valid at the referencing field's
    /// position in the generated module tree.
    pub rust_path: String,
}

impl Ty {
    /// The runtime codec module fields of this type are wired to.
    pub fn module(&self) -> &'static str {
        match self {
            Ty::Float => "float",
            Ty::Double => "double",
            Ty::Int32 => "int32",
            Ty::Int64 => "int64",
            Ty::Uint32 => "uint32",
            Ty::Uint64 => "uint64",
            Ty::Sint32 => "sint32",
            Ty::Sint64 => "sint64",
            Ty::Fixed32 => "fixed32",
            Ty::Fixed64 => "fixed64",
            Ty::Sfixed32 => "sfixed32",
            Ty::Sfixed64 => "sfixed64",
            Ty::Bool => "bool",
            Ty::String => "string",
            Ty::Bytes => "bytes",
            Ty::Enum(_) => "enumeration",
            Ty::Message(_) => "message",
        }
    }

    /// The generated Rust type expression for one value of this type.
    pub fn rust_type(&self) -> String {
        match self {
            Ty::Float => "f32".to_string(),
            Ty::Double => "f64".to_string(),
            Ty::Int32 | Ty::Sint32 | Ty::Sfixed32 => "i32".to_string(),
            Ty::Int64 | Ty::Sint64 | Ty::Sfixed64 => "i64".to_string(),
            Ty::Uint32 | Ty::Fixed32 => "u32".to_string(),
            Ty::Uint64 | Ty::Fixed64 => "u64".to_string(),
            Ty::Bool => "bool".to_string(),
            Ty::String => "::std::string::String".to_string(),
            Ty::Bytes => "::std::vec::Vec<u8>".to_string(),
            Ty::Enum(type_ref) => format!("::protoforge::OpenEnum<{}>", type_ref.rust_path),
            Ty::Message(type_ref) => type_ref.rust_path.clone(),
        }
    }

    /// Whether a repeated field of this type can use the packed encoding.
    pub fn is_packable(&self) -> bool {
        !matches!(self, Ty::String | Ty::Bytes | Ty::Message(_))
    }
}

impl Field {
    /// The generated type expression for the whole field.
    pub fn rust_field_type(&self) -> String {
        let value = if self.boxed {
            format!("::std::boxed::Box<{}>", self.ty.rust_type())
        } else {
            self.ty.rust_type()
        };
        match &self.kind {
            Kind::Plain => value,
            Kind::Optional => format!("::std::option::Option<{}>", value),
            Kind::Repeated { .. } => format!("::std::vec::Vec<{}>", value),
            Kind::Map { key } => format!(
                "::std::collections::HashMap<{}, {}>",
                key.rust_type(),
                value
            ),
        }
    }
}

/// Leading documentation attached to a definition, carried through from the
/// descriptor's source-code-info with its original line structure.
#[derive(Debug, Clone, Default)]
pub struct Comments {
    pub leading: Option<String>,
}

impl Comments {
    pub(crate) fn from_location(location: &Location) -> Comments {
        Comments {
            leading: location.leading_comments.clone(),
        }
    }

    /// The comment split into doc lines, trailing newline dropped.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.leading.as_deref().unwrap_or("").lines()
    }
}
