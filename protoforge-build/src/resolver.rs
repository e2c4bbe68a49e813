//! Resolution of flat file descriptors into the generator's tree
//! representation.
//!
//! A [`TypeIndex`] is built once per request from every file in it, so that
//! fields can reference types across files. [`resolve_file`] then walks one
//! descriptor at a time, producing the [`FileAst`] the code generator
//! renders. All resolution problems are fatal to the containing file and are
//! reported through [`ResolveError`].

use std::collections::{BTreeSet, HashMap, HashSet};
use std::iter;

use itertools::{Either, Itertools};
use log::debug;
use thiserror::Error;

use crate::ast::{
    Comments, EnumNode, EnumVariant, Field, FileAst, Kind, MessageNode, Node, Ty, TypeRef,
};
use crate::descriptor::field_descriptor_proto::{Label, Type};
use crate::descriptor::source_code_info::Location;
use crate::descriptor::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
};
use crate::ident::{strip_enum_prefix, to_lower_camel, to_snake, to_upper_camel};
use crate::message_graph::MessageGraph;

/// A fatal problem with an input file.
///
/// Generation of the containing file is aborted and the message is attached
/// to the response.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{file}: unsupported syntax {syntax:?}; only proto3 is supported")]
    UnsupportedSyntax { file: String, syntax: String },

    #[error("{message}.{field}: reference to unknown type {type_name}")]
    MissingType {
        message: String,
        field: String,
        type_name: String,
    },

    #[error("{message}: duplicate field number {number}")]
    DuplicateFieldNumber { message: String, number: i32 },

    #[error("{name}: enum has no enumerator with number zero")]
    MissingZeroValue { name: String },

    #[error("{message}.{field}: unsupported field type {type_id}")]
    UnsupportedType {
        message: String,
        field: String,
        type_id: i32,
    },

    #[error("{message}.{field}: groups are not supported")]
    GroupField { message: String, field: String },

    #[error("{message}.{entry}: malformed map entry message")]
    MalformedMapEntry { message: String, entry: String },

    #[error("{message}.{field}: invalid map key type")]
    InvalidMapKey { message: String, field: String },
}

/// What a fully-qualified name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Message { map_entry: bool },
    Enum,
}

/// One identifier table entry: where a type lives and what it is.
#[derive(Debug)]
pub struct TypeEntry {
    pub file: String,
    pub kind: DefKind,
}

/// The request-wide identifier table.
///
/// Maps every fully-qualified proto name (leading dot) defined anywhere in
/// the request to its defining file, enabling cross-file reference
/// resolution. Built once per request, read-only afterwards.
#[derive(Debug, Default)]
pub struct TypeIndex {
    entries: HashMap<String, TypeEntry>,
}

impl TypeIndex {
    pub fn new<'a>(files: impl Iterator<Item = &'a FileDescriptorProto>) -> TypeIndex {
        let mut index = TypeIndex::default();
        for file in files {
            let prefix = if file.package.is_empty() {
                String::new()
            } else {
                format!(".{}", file.package)
            };
            for message in &file.message_type {
                index.register_message(&file.name, &prefix, message);
            }
            for nested_enum in &file.enum_type {
                index.register_enum(&file.name, &prefix, nested_enum);
            }
        }
        index
    }

    pub fn get(&self, fq_name: &str) -> Option<&TypeEntry> {
        self.entries.get(fq_name)
    }

    fn register_message(&mut self, file: &str, prefix: &str, message: &DescriptorProto) {
        let fq_name = format!("{}.{}", prefix, message.name);
        let map_entry = message
            .options
            .as_ref()
            .map_or(false, |options| options.map_entry);
        self.entries.insert(
            fq_name.clone(),
            TypeEntry {
                file: file.to_string(),
                kind: DefKind::Message { map_entry },
            },
        );
        for nested in &message.nested_type {
            self.register_message(file, &fq_name, nested);
        }
        for nested_enum in &message.enum_type {
            self.register_enum(file, &fq_name, nested_enum);
        }
    }

    fn register_enum(&mut self, file: &str, prefix: &str, descriptor: &EnumDescriptorProto) {
        self.entries.insert(
            format!("{}.{}", prefix, descriptor.name),
            TypeEntry {
                file: file.to_string(),
                kind: DefKind::Enum,
            },
        );
    }
}

/// Resolves one file descriptor against the request-wide identifier table.
pub fn resolve_file(
    index: &TypeIndex,
    message_graph: &MessageGraph,
    file: &FileDescriptorProto,
) -> Result<FileAst, ResolveError> {
    if file.syntax != "proto3" {
        return Err(ResolveError::UnsupportedSyntax {
            file: file.name.clone(),
            syntax: file.syntax.clone(),
        });
    }

    debug!("file: {:?}, package: {:?}", file.name, file.package);

    // Only locations addressing whole declarations (even-length paths) can
    // carry comments we attach; sort them for binary search.
    let mut locations = file
        .source_code_info
        .as_ref()
        .map(|info| info.location.clone())
        .unwrap_or_default();
    locations.retain(|location| {
        let len = location.path.len();
        len > 0 && len % 2 == 0
    });
    locations.sort_by(|a, b| a.path.cmp(&b.path));

    let mut resolver = Resolver {
        index,
        message_graph,
        file_name: &file.name,
        package: &file.package,
        type_path: Vec::new(),
        path: Vec::new(),
        locations,
        imports: BTreeSet::new(),
    };

    let mut nodes = Vec::new();

    resolver.path.push(4);
    for (idx, message) in file.message_type.iter().enumerate() {
        resolver.path.push(idx as i32);
        nodes.push(Node::Message(resolver.resolve_message(message)?));
        resolver.path.pop();
    }
    resolver.path.pop();

    resolver.path.push(5);
    for (idx, descriptor) in file.enum_type.iter().enumerate() {
        resolver.path.push(idx as i32);
        nodes.push(Node::Enum(resolver.resolve_enum(descriptor)?));
        resolver.path.pop();
    }
    resolver.path.pop();

    Ok(FileAst {
        name: file.name.clone(),
        package: file.package.clone(),
        nodes,
        imports: resolver.imports,
    })
}

struct Resolver<'a> {
    index: &'a TypeIndex,
    message_graph: &'a MessageGraph,
    file_name: &'a str,
    package: &'a str,
    /// Names of the messages enclosing the current position.
    type_path: Vec<String>,
    /// Source-code-info path of the current position.
    path: Vec<i32>,
    locations: Vec<Location>,
    imports: BTreeSet<String>,
}

type MapTypes<'a> = HashMap<String, (&'a FieldDescriptorProto, &'a FieldDescriptorProto)>;

impl<'a> Resolver<'a> {
    fn resolve_message(&mut self, message: &DescriptorProto) -> Result<MessageNode, ResolveError> {
        debug!("  message: {:?}", message.name);

        let fq_message_name = self.fq_name(&message.name);
        let comments = self.comments();
        let rust_name = to_upper_camel(&message.name);
        let namespaced_name = self.namespaced(&rust_name);

        // Split nested types into regular nested messages and synthetic map
        // entry messages, preserving descriptor indexes so comments can still
        // be found. Entry messages never become nodes of their own; their
        // key/value types feed the owning map field instead.
        type NestedTypes<'n> = Vec<(&'n DescriptorProto, usize)>;
        let (nested_types, entries): (NestedTypes<'_>, Vec<(String, &DescriptorProto)>) = message
            .nested_type
            .iter()
            .enumerate()
            .partition_map(|(idx, nested)| {
                let map_entry = nested
                    .options
                    .as_ref()
                    .map_or(false, |options| options.map_entry);
                if map_entry {
                    Either::Right((format!("{}.{}", fq_message_name, nested.name), nested))
                } else {
                    Either::Left((nested, idx))
                }
            });

        let mut map_types = MapTypes::new();
        for (fq_entry_name, entry) in entries {
            let well_formed = entry.field.len() == 2
                && entry.field[0].name == "key"
                && entry.field[0].number == 1
                && entry.field[1].name == "value"
                && entry.field[1].number == 2;
            if !well_formed {
                return Err(ResolveError::MalformedMapEntry {
                    message: fq_message_name.clone(),
                    entry: entry.name.clone(),
                });
            }
            map_types.insert(fq_entry_name, (&entry.field[0], &entry.field[1]));
        }

        let mut fields = Vec::with_capacity(message.field.len());
        let mut seen_numbers = HashSet::new();

        self.path.push(2);
        for (idx, field) in message.field.iter().enumerate() {
            self.path.push(idx as i32);
            if !seen_numbers.insert(field.number) {
                return Err(ResolveError::DuplicateFieldNumber {
                    message: fq_message_name.clone(),
                    number: field.number,
                });
            }
            let resolved = match map_types.get(&field.type_name) {
                Some((key, value)) => self.resolve_map_field(&fq_message_name, field, key, value),
                None => self.resolve_field(&fq_message_name, field),
            }?;
            fields.push(resolved);
            self.path.pop();
        }
        self.path.pop();

        let mut children = Vec::new();
        self.type_path.push(message.name.clone());

        self.path.push(3);
        for (nested, idx) in nested_types {
            self.path.push(idx as i32);
            let child = self.resolve_message(nested);
            self.path.pop();
            children.push(Node::Message(child?));
        }
        self.path.pop();

        self.path.push(4);
        for (idx, nested_enum) in message.enum_type.iter().enumerate() {
            self.path.push(idx as i32);
            let child = self.resolve_enum(nested_enum);
            self.path.pop();
            children.push(Node::Enum(child?));
        }
        self.path.pop();

        self.type_path.pop();

        Ok(MessageNode {
            name: message.name.clone(),
            rust_name,
            namespaced_name,
            comments,
            fields,
            children,
        })
    }

    fn resolve_field(
        &mut self,
        fq_message_name: &str,
        field: &FieldDescriptorProto,
    ) -> Result<Field, ResolveError> {
        let type_ = Type::try_from(field.r#type).map_err(|_| ResolveError::UnsupportedType {
            message: fq_message_name.to_string(),
            field: field.name.clone(),
            type_id: field.r#type,
        })?;
        let ty = self.resolve_type(fq_message_name, field, type_)?;

        debug!("    field: {:?}, type: {:?}", field.name, ty);

        let repeated = matches!(Label::try_from(field.label), Ok(Label::Repeated));
        // Explicit presence: proto3 `optional` (which arrives as a synthetic
        // oneof member), plain oneof members, and singular message fields.
        let optional = !repeated
            && (field.proto3_optional
                || field.oneof_index.is_some()
                || matches!(ty, Ty::Message(_)));

        let kind = if repeated {
            let packed = ty.is_packable()
                && field
                    .options
                    .as_ref()
                    .and_then(|options| options.packed)
                    .unwrap_or(true);
            Kind::Repeated { packed }
        } else if optional {
            Kind::Optional
        } else {
            Kind::Plain
        };

        let boxed = !repeated
            && matches!(ty, Ty::Message(_))
            && self
                .message_graph
                .is_nested(&field.type_name, fq_message_name);

        Ok(Field {
            name: to_snake(&field.name),
            proto_name: field.name.clone(),
            json_name: self.json_name(field),
            tag: field.number as u32,
            ty,
            kind,
            boxed,
            comments: self.comments(),
        })
    }

    fn resolve_map_field(
        &mut self,
        fq_message_name: &str,
        field: &FieldDescriptorProto,
        key: &FieldDescriptorProto,
        value: &FieldDescriptorProto,
    ) -> Result<Field, ResolveError> {
        let key_type = Type::try_from(key.r#type).map_err(|_| ResolveError::UnsupportedType {
            message: fq_message_name.to_string(),
            field: field.name.clone(),
            type_id: key.r#type,
        })?;
        let key_ty = match key_type {
            Type::Int32 => Ty::Int32,
            Type::Int64 => Ty::Int64,
            Type::Uint32 => Ty::Uint32,
            Type::Uint64 => Ty::Uint64,
            Type::Sint32 => Ty::Sint32,
            Type::Sint64 => Ty::Sint64,
            Type::Fixed32 => Ty::Fixed32,
            Type::Fixed64 => Ty::Fixed64,
            Type::Sfixed32 => Ty::Sfixed32,
            Type::Sfixed64 => Ty::Sfixed64,
            Type::Bool => Ty::Bool,
            Type::String => Ty::String,
            _ => {
                return Err(ResolveError::InvalidMapKey {
                    message: fq_message_name.to_string(),
                    field: field.name.clone(),
                })
            }
        };

        let value_type =
            Type::try_from(value.r#type).map_err(|_| ResolveError::UnsupportedType {
                message: fq_message_name.to_string(),
                field: field.name.clone(),
                type_id: value.r#type,
            })?;
        let value_ty = self.resolve_type(fq_message_name, value, value_type)?;

        debug!(
            "    map field: {:?}, key type: {:?}, value type: {:?}",
            field.name, key_ty, value_ty
        );

        Ok(Field {
            name: to_snake(&field.name),
            proto_name: field.name.clone(),
            json_name: self.json_name(field),
            tag: field.number as u32,
            ty: value_ty,
            kind: Kind::Map { key: key_ty },
            boxed: false,
            comments: self.comments(),
        })
    }

    fn resolve_type(
        &mut self,
        fq_message_name: &str,
        field: &FieldDescriptorProto,
        type_: Type,
    ) -> Result<Ty, ResolveError> {
        Ok(match type_ {
            Type::Float => Ty::Float,
            Type::Double => Ty::Double,
            Type::Int32 => Ty::Int32,
            Type::Int64 => Ty::Int64,
            Type::Uint32 => Ty::Uint32,
            Type::Uint64 => Ty::Uint64,
            Type::Sint32 => Ty::Sint32,
            Type::Sint64 => Ty::Sint64,
            Type::Fixed32 => Ty::Fixed32,
            Type::Fixed64 => Ty::Fixed64,
            Type::Sfixed32 => Ty::Sfixed32,
            Type::Sfixed64 => Ty::Sfixed64,
            Type::Bool => Ty::Bool,
            Type::String => Ty::String,
            Type::Bytes => Ty::Bytes,
            Type::Group => {
                return Err(ResolveError::GroupField {
                    message: fq_message_name.to_string(),
                    field: field.name.clone(),
                })
            }
            Type::Message | Type::Enum => {
                let entry = self.index.get(&field.type_name).ok_or_else(|| {
                    ResolveError::MissingType {
                        message: fq_message_name.to_string(),
                        field: field.name.clone(),
                        type_name: field.type_name.clone(),
                    }
                })?;
                if entry.file != self.file_name {
                    self.imports.insert(entry.file.clone());
                }
                let type_ref = TypeRef {
                    proto_name: field.type_name.clone(),
                    rust_path: self.resolve_ident(&field.type_name),
                };
                match entry.kind {
                    DefKind::Enum => Ty::Enum(type_ref),
                    DefKind::Message { .. } => Ty::Message(type_ref),
                }
            }
        })
    }

    fn resolve_enum(&mut self, descriptor: &EnumDescriptorProto) -> Result<EnumNode, ResolveError> {
        debug!("  enum: {:?}", descriptor.name);

        let comments = self.comments();
        let rust_name = to_upper_camel(&descriptor.name);
        let namespaced_name = self.namespaced(&rust_name);

        if !descriptor.value.iter().any(|value| value.number == 0) {
            return Err(ResolveError::MissingZeroValue {
                name: self.fq_name(&descriptor.name),
            });
        }

        let mut numbers = HashSet::new();
        let mut variants = Vec::with_capacity(descriptor.value.len());

        self.path.push(2);
        for (idx, value) in descriptor.value.iter().enumerate() {
            self.path.push(idx as i32);
            let variant_comments = self.comments();
            self.path.pop();

            // Protobuf allows aliased values under the `allow_alias` option;
            // only the first spelling of each number becomes a variant.
            if !numbers.insert(value.number) {
                continue;
            }

            variants.push(EnumVariant {
                proto_name: value.name.clone(),
                rust_name: strip_enum_prefix(&rust_name, &to_upper_camel(&value.name)),
                number: value.number,
                comments: variant_comments,
            });
        }
        self.path.pop();

        Ok(EnumNode {
            name: descriptor.name.clone(),
            rust_name,
            namespaced_name,
            comments,
            variants,
        })
    }

    /// The compiler fills in `json_name` for every field; compute the
    /// lowerCamel form ourselves when working from hand-built descriptors
    /// that leave it empty. An explicit override is honored verbatim.
    fn json_name(&self, field: &FieldDescriptorProto) -> String {
        if field.json_name.is_empty() {
            to_lower_camel(&field.name)
        } else {
            field.json_name.clone()
        }
    }

    /// The fully-qualified proto name of a definition at the current
    /// position.
    fn fq_name(&self, name: &str) -> String {
        let mut fq_name = String::new();
        if !self.package.is_empty() {
            fq_name.push('.');
            fq_name.push_str(self.package);
        }
        for part in &self.type_path {
            fq_name.push('.');
            fq_name.push_str(part);
        }
        fq_name.push('.');
        fq_name.push_str(name);
        fq_name
    }

    /// The generated Rust path of a definition at the current position,
    /// relative to the file's type root.
    fn namespaced(&self, rust_name: &str) -> String {
        self.type_path
            .iter()
            .map(|part| to_snake(part))
            .chain(iter::once(rust_name.to_string()))
            .join("::")
    }

    /// Resolves a fully-qualified proto name to a Rust path valid at the
    /// current position, assuming the generated module tree mirrors proto
    /// packages and message nesting.
    fn resolve_ident(&self, pb_ident: &str) -> String {
        let mut local_path = self
            .package
            .split('.')
            .chain(self.type_path.iter().map(String::as_str))
            .peekable();

        // An empty package yields a single empty segment; drop it so it
        // cannot shadow a real one.
        if local_path.peek() == Some(&"") {
            local_path.next();
        }

        let full = pb_ident.trim_start_matches('.');
        let mut ident_path: Vec<&str> = full.split('.').collect();
        let ident_type = ident_path.pop().expect("empty type name");
        let mut ident_path = ident_path.into_iter().peekable();

        // Skip path elements in common.
        while local_path.peek().is_some() && local_path.peek() == ident_path.peek() {
            local_path.next();
            ident_path.next();
        }

        local_path
            .map(|_| "super".to_string())
            .chain(ident_path.map(to_snake))
            .chain(iter::once(to_upper_camel(ident_type)))
            .join("::")
    }

    /// Leading comments for the declaration at the current path, if the
    /// descriptor carried source info for it.
    fn comments(&self) -> Comments {
        match self
            .locations
            .binary_search_by(|location| location.path.as_slice().cmp(&self.path))
        {
            Ok(idx) => Comments::from_location(&self.locations[idx]),
            Err(_) => Comments::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{
        source_code_info, EnumValueDescriptorProto, FieldOptions, MessageOptions, SourceCodeInfo,
    };

    fn scalar_field(name: &str, number: i32, type_: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: name.to_string(),
            number,
            label: Label::Optional as i32,
            r#type: type_ as i32,
            ..Default::default()
        }
    }

    fn repeated_field(name: &str, number: i32, type_: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            label: Label::Repeated as i32,
            ..scalar_field(name, number, type_)
        }
    }

    fn proto3_file(name: &str, package: &str) -> FileDescriptorProto {
        FileDescriptorProto {
            name: name.to_string(),
            package: package.to_string(),
            syntax: "proto3".to_string(),
            ..Default::default()
        }
    }

    fn resolve(file: &FileDescriptorProto) -> Result<FileAst, ResolveError> {
        let index = TypeIndex::new(iter::once(&*file));
        let graph = MessageGraph::new(iter::once(&*file));
        resolve_file(&index, &graph, file)
    }

    fn only_message(ast: &FileAst) -> &MessageNode {
        match &ast.nodes[0] {
            Node::Message(message) => message,
            Node::Enum(_) => panic!("expected a message node"),
        }
    }

    #[test]
    fn proto2_is_rejected() {
        let mut file = proto3_file("legacy.proto", "demo");
        file.syntax = "proto2".to_string();
        assert!(matches!(
            resolve(&file),
            Err(ResolveError::UnsupportedSyntax { .. })
        ));
    }

    #[test]
    fn scalar_classification() {
        let mut file = proto3_file("scalars.proto", "demo");
        file.message_type = vec![DescriptorProto {
            name: "Scalars".to_string(),
            field: vec![
                scalar_field("plain", 1, Type::Int32),
                FieldDescriptorProto {
                    proto3_optional: true,
                    oneof_index: Some(0),
                    ..scalar_field("maybe", 2, Type::Uint64)
                },
                repeated_field("many", 3, Type::Sint32),
                repeated_field("names", 4, Type::String),
            ],
            ..Default::default()
        }];

        let ast = resolve(&file).unwrap();
        let message = only_message(&ast);
        assert_eq!(message.namespaced_name, "Scalars");

        assert_eq!(message.fields[0].kind, Kind::Plain);
        assert_eq!(message.fields[0].ty, Ty::Int32);

        assert_eq!(message.fields[1].kind, Kind::Optional);
        assert_eq!(message.fields[1].rust_field_type(), "::std::option::Option<u64>");

        // proto3 numeric repeated fields default to packed...
        assert_eq!(message.fields[2].kind, Kind::Repeated { packed: true });
        // ...but length-delimited ones can never be.
        assert_eq!(message.fields[3].kind, Kind::Repeated { packed: false });
    }

    #[test]
    fn explicit_packed_false_is_honored() {
        let mut file = proto3_file("unpacked.proto", "demo");
        file.message_type = vec![DescriptorProto {
            name: "Series".to_string(),
            field: vec![FieldDescriptorProto {
                options: Some(FieldOptions {
                    packed: Some(false),
                }),
                ..repeated_field("xs", 1, Type::Int32)
            }],
            ..Default::default()
        }];

        let ast = resolve(&file).unwrap();
        assert_eq!(
            only_message(&ast).fields[0].kind,
            Kind::Repeated { packed: false }
        );
    }

    #[test]
    fn map_fields_are_detected() {
        let mut file = proto3_file("maps.proto", "demo");
        file.message_type = vec![DescriptorProto {
            name: "Dict".to_string(),
            field: vec![FieldDescriptorProto {
                type_name: ".demo.Dict.MEntry".to_string(),
                ..repeated_field("m", 1, Type::Message)
            }],
            nested_type: vec![DescriptorProto {
                name: "MEntry".to_string(),
                field: vec![
                    scalar_field("key", 1, Type::String),
                    scalar_field("value", 2, Type::Int32),
                ],
                options: Some(MessageOptions { map_entry: true }),
                ..Default::default()
            }],
            ..Default::default()
        }];

        let ast = resolve(&file).unwrap();
        let message = only_message(&ast);
        assert_eq!(message.fields[0].kind, Kind::Map { key: Ty::String });
        assert_eq!(message.fields[0].ty, Ty::Int32);
        assert_eq!(
            message.fields[0].rust_field_type(),
            "::std::collections::HashMap<::std::string::String, i32>"
        );
        // The entry message is consumed by the field, not kept as a child.
        assert!(message.children.is_empty());
    }

    #[test]
    fn malformed_map_entry_is_fatal() {
        let mut file = proto3_file("maps.proto", "demo");
        file.message_type = vec![DescriptorProto {
            name: "Dict".to_string(),
            nested_type: vec![DescriptorProto {
                name: "MEntry".to_string(),
                field: vec![scalar_field("key", 1, Type::String)],
                options: Some(MessageOptions { map_entry: true }),
                ..Default::default()
            }],
            ..Default::default()
        }];

        assert!(matches!(
            resolve(&file),
            Err(ResolveError::MalformedMapEntry { .. })
        ));
    }

    #[test]
    fn float_map_keys_are_rejected() {
        let mut file = proto3_file("maps.proto", "demo");
        file.message_type = vec![DescriptorProto {
            name: "Dict".to_string(),
            field: vec![FieldDescriptorProto {
                type_name: ".demo.Dict.MEntry".to_string(),
                ..repeated_field("m", 1, Type::Message)
            }],
            nested_type: vec![DescriptorProto {
                name: "MEntry".to_string(),
                field: vec![
                    scalar_field("key", 1, Type::Float),
                    scalar_field("value", 2, Type::Int32),
                ],
                options: Some(MessageOptions { map_entry: true }),
                ..Default::default()
            }],
            ..Default::default()
        }];

        assert!(matches!(
            resolve(&file),
            Err(ResolveError::InvalidMapKey { .. })
        ));
    }

    #[test]
    fn duplicate_field_numbers_are_fatal() {
        let mut file = proto3_file("dup.proto", "demo");
        file.message_type = vec![DescriptorProto {
            name: "Dup".to_string(),
            field: vec![
                scalar_field("a", 1, Type::Int32),
                scalar_field("b", 1, Type::Int32),
            ],
            ..Default::default()
        }];

        assert!(matches!(
            resolve(&file),
            Err(ResolveError::DuplicateFieldNumber { number: 1, .. })
        ));
    }

    #[test]
    fn enum_without_zero_is_fatal() {
        let mut file = proto3_file("enums.proto", "demo");
        file.enum_type = vec![EnumDescriptorProto {
            name: "Broken".to_string(),
            value: vec![EnumValueDescriptorProto {
                name: "BROKEN_ONE".to_string(),
                number: 1,
            }],
        }];

        assert!(matches!(
            resolve(&file),
            Err(ResolveError::MissingZeroValue { .. })
        ));
    }

    #[test]
    fn enum_aliases_collapse_and_prefixes_strip() {
        let mut file = proto3_file("enums.proto", "demo");
        file.enum_type = vec![EnumDescriptorProto {
            name: "Mode".to_string(),
            value: vec![
                EnumValueDescriptorProto {
                    name: "MODE_UNSPECIFIED".to_string(),
                    number: 0,
                },
                EnumValueDescriptorProto {
                    name: "MODE_ACTIVE".to_string(),
                    number: 1,
                },
                EnumValueDescriptorProto {
                    name: "MODE_ALIAS".to_string(),
                    number: 1,
                },
            ],
        }];

        let ast = resolve(&file).unwrap();
        let node = match &ast.nodes[0] {
            Node::Enum(node) => node,
            Node::Message(_) => panic!("expected an enum node"),
        };
        assert_eq!(node.variants.len(), 2);
        assert_eq!(node.variants[0].rust_name, "Unspecified");
        assert_eq!(node.variants[0].proto_name, "MODE_UNSPECIFIED");
        assert_eq!(node.variants[1].rust_name, "Active");
    }

    #[test]
    fn missing_type_reference_is_fatal() {
        let mut file = proto3_file("missing.proto", "demo");
        file.message_type = vec![DescriptorProto {
            name: "Holder".to_string(),
            field: vec![FieldDescriptorProto {
                type_name: ".demo.Nowhere".to_string(),
                ..scalar_field("ghost", 1, Type::Message)
            }],
            ..Default::default()
        }];

        assert!(matches!(
            resolve(&file),
            Err(ResolveError::MissingType { .. })
        ));
    }

    #[test]
    fn group_fields_are_fatal() {
        let mut file = proto3_file("group.proto", "demo");
        file.message_type = vec![DescriptorProto {
            name: "Old".to_string(),
            field: vec![scalar_field("grp", 1, Type::Group)],
            ..Default::default()
        }];

        assert!(matches!(resolve(&file), Err(ResolveError::GroupField { .. })));
    }

    #[test]
    fn nested_and_cross_file_references() {
        let mut dep = proto3_file("other.proto", "demo.other");
        dep.message_type = vec![DescriptorProto {
            name: "Remote".to_string(),
            ..Default::default()
        }];

        let mut file = proto3_file("main.proto", "demo");
        file.dependency = vec!["other.proto".to_string()];
        file.message_type = vec![DescriptorProto {
            name: "Outer".to_string(),
            field: vec![
                FieldDescriptorProto {
                    type_name: ".demo.Outer.Inner".to_string(),
                    ..scalar_field("inner", 1, Type::Message)
                },
                FieldDescriptorProto {
                    type_name: ".demo.other.Remote".to_string(),
                    ..scalar_field("remote", 2, Type::Message)
                },
            ],
            nested_type: vec![DescriptorProto {
                name: "Inner".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }];

        let index = TypeIndex::new([&dep, &file].into_iter());
        let graph = MessageGraph::new([&dep, &file].into_iter());
        let ast = resolve_file(&index, &graph, &file).unwrap();

        let message = only_message(&ast);
        // Local nested reference, from the file root.
        assert_eq!(
            message.fields[0].rust_field_type(),
            "::std::option::Option<outer::Inner>"
        );
        // Cross-file reference climbs out of the package module.
        assert_eq!(
            message.fields[1].rust_field_type(),
            "::std::option::Option<other::Remote>"
        );
        assert!(ast.imports.contains("other.proto"));

        match &message.children[0] {
            Node::Message(inner) => assert_eq!(inner.namespaced_name, "outer::Inner"),
            Node::Enum(_) => panic!("expected nested message"),
        }
    }

    #[test]
    fn recursive_fields_are_boxed() {
        let mut file = proto3_file("tree.proto", "demo");
        file.message_type = vec![DescriptorProto {
            name: "TreeNode".to_string(),
            field: vec![FieldDescriptorProto {
                type_name: ".demo.TreeNode".to_string(),
                ..scalar_field("parent", 1, Type::Message)
            }],
            ..Default::default()
        }];

        let ast = resolve(&file).unwrap();
        let message = only_message(&ast);
        assert!(message.fields[0].boxed);
        assert_eq!(
            message.fields[0].rust_field_type(),
            "::std::option::Option<::std::boxed::Box<TreeNode>>"
        );
    }

    #[test]
    fn json_name_override_is_verbatim() {
        let mut file = proto3_file("names.proto", "demo");
        file.message_type = vec![DescriptorProto {
            name: "Named".to_string(),
            field: vec![
                scalar_field("foo_bar", 1, Type::Int32),
                FieldDescriptorProto {
                    json_name: "explicitName".to_string(),
                    ..scalar_field("baz_qux", 2, Type::Int32)
                },
            ],
            ..Default::default()
        }];

        let ast = resolve(&file).unwrap();
        let message = only_message(&ast);
        assert_eq!(message.fields[0].json_name, "fooBar");
        assert_eq!(message.fields[0].name, "foo_bar");
        assert_eq!(message.fields[1].json_name, "explicitName");
    }

    #[test]
    fn comments_attach_by_location_path() {
        let mut file = proto3_file("docs.proto", "demo");
        file.message_type = vec![DescriptorProto {
            name: "Documented".to_string(),
            field: vec![scalar_field("n", 1, Type::Int32)],
            ..Default::default()
        }];
        file.source_code_info = Some(SourceCodeInfo {
            location: vec![
                source_code_info::Location {
                    path: vec![4, 0],
                    leading_comments: Some(" A documented message.\n".to_string()),
                },
                source_code_info::Location {
                    path: vec![4, 0, 2, 0],
                    leading_comments: Some(" Counts things.\n".to_string()),
                },
            ],
        });

        let ast = resolve(&file).unwrap();
        let message = only_message(&ast);
        assert_eq!(
            message.comments.leading.as_deref(),
            Some(" A documented message.\n")
        );
        assert_eq!(
            message.fields[0].comments.leading.as_deref(),
            Some(" Counts things.\n")
        );
    }
}
