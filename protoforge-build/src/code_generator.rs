//! Renders a resolved file into Rust source.
//!
//! Output is assembled as token streams: first the type declarations block
//! (structs, nested namespace modules, enums with their conversions), then
//! one binary codec impl and one JSON codec impl per message, in depth-first
//! descriptor order. The caller stitches the blocks together with the file
//! banner and any plugin-contributed text, and runs the pretty-printer over
//! the code blocks.

use log::debug;
use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

use crate::ast::{Comments, EnumNode, Field, FileAst, Kind, MessageNode, Node, Ty};
use crate::ident::{to_snake, to_syn_ident, to_syn_type};
use crate::Config;

pub struct CodeGenerator<'a> {
    config: &'a Config,
}

impl<'a> CodeGenerator<'a> {
    /// Renders the type declarations block.
    pub fn types(config: &'a Config, file: &FileAst) -> String {
        let code_gen = CodeGenerator { config };
        let tokens: TokenStream = file
            .nodes
            .iter()
            .map(|node| code_gen.node_types(node))
            .collect();
        tokens.to_string()
    }

    /// Renders the codec blocks: every message's binary codec impl followed
    /// by every message's JSON codec impl.
    pub fn codecs(config: &'a Config, file: &FileAst) -> String {
        let code_gen = CodeGenerator { config };
        let mut messages = Vec::new();
        collect_messages(&file.nodes, &mut messages);

        let mut tokens: TokenStream = messages
            .iter()
            .map(|message| code_gen.message_codec(message))
            .collect();
        tokens.extend(
            messages
                .iter()
                .map(|message| code_gen.message_json(message)),
        );
        tokens.to_string()
    }

    fn node_types(&self, node: &Node) -> TokenStream {
        match node {
            Node::Message(message) => self.message_types(message),
            Node::Enum(node) => self.enum_types(node),
        }
    }

    fn message_types(&self, message: &MessageNode) -> TokenStream {
        debug!("  message: {:?}", message.name);

        let documentation = doc_attrs(&message.comments);
        let ident = to_syn_ident(&message.rust_name);
        let fields = message.fields.iter().map(|field| self.field_decl(field));

        let mut tokens = quote! {
            #(#documentation)*
            #[derive(Clone, PartialEq, Debug, Default)]
            pub struct #ident {
                #(#fields,)*
            }
        };

        if !message.children.is_empty() {
            let mod_ident = to_syn_ident(&to_snake(&message.name));
            let mod_doc = format!("Nested message and enum types in `{}`.", message.name);
            let children = message.children.iter().map(|child| self.node_types(child));
            tokens.extend(quote! {
                #[doc = #mod_doc]
                pub mod #mod_ident {
                    #(#children)*
                }
            });
        }

        tokens
    }

    fn field_decl(&self, field: &Field) -> TokenStream {
        let documentation = doc_attrs(&field.comments);
        let ident = to_syn_ident(&field.name);
        let field_type = to_syn_type(&field.rust_field_type());
        quote! {
            #(#documentation)*
            pub #ident: #field_type
        }
    }

    fn enum_types(&self, node: &EnumNode) -> TokenStream {
        debug!("  enum: {:?}", node.name);

        let documentation = doc_attrs(&node.comments);
        let ident = to_syn_ident(&node.rust_name);

        let variants = node.variants.iter().map(|variant| {
            let variant_docs = doc_attrs(&variant.comments);
            let variant_ident = to_syn_ident(&variant.rust_name);
            quote! {
                #(#variant_docs)*
                #variant_ident
            }
        });

        let zero = node
            .variants
            .iter()
            .find(|variant| variant.number == 0)
            .expect("resolver admits only enums with a zero enumerator");
        let zero_ident = to_syn_ident(&zero.rust_name);

        let into_arms = node.variants.iter().map(|variant| {
            let variant_ident = to_syn_ident(&variant.rust_name);
            let number = Literal::i32_unsuffixed(variant.number);
            quote! { #ident::#variant_ident => #number }
        });
        let try_from_arms = node.variants.iter().map(|variant| {
            let variant_ident = to_syn_ident(&variant.rust_name);
            let number = Literal::i32_unsuffixed(variant.number);
            quote! { #number => Ok(#ident::#variant_ident) }
        });
        let as_str_arms = node.variants.iter().map(|variant| {
            let variant_ident = to_syn_ident(&variant.rust_name);
            let name = &variant.proto_name;
            quote! { #ident::#variant_ident => #name }
        });
        let from_str_arms = node.variants.iter().map(|variant| {
            let variant_ident = to_syn_ident(&variant.rust_name);
            let name = &variant.proto_name;
            quote! { #name => Some(#ident::#variant_ident) }
        });

        quote! {
            #(#documentation)*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub enum #ident {
                #(#variants,)*
            }

            impl ::std::default::Default for #ident {
                fn default() -> Self {
                    #ident::#zero_ident
                }
            }

            impl ::std::convert::From<#ident> for i32 {
                fn from(value: #ident) -> i32 {
                    match value {
                        #(#into_arms,)*
                    }
                }
            }

            impl ::std::convert::TryFrom<i32> for #ident {
                type Error = ::protoforge::UnknownEnumValue;

                fn try_from(value: i32) -> ::std::result::Result<Self, ::protoforge::UnknownEnumValue> {
                    match value {
                        #(#try_from_arms,)*
                        other => Err(::protoforge::UnknownEnumValue(other)),
                    }
                }
            }

            impl ::protoforge::Enumeration for #ident {
                fn as_str_name(&self) -> &'static str {
                    match self {
                        #(#as_str_arms,)*
                    }
                }

                fn from_str_name(value: &str) -> ::std::option::Option<Self> {
                    match value {
                        #(#from_str_arms,)*
                        _ => None,
                    }
                }
            }
        }
    }

    fn message_codec(&self, message: &MessageNode) -> TokenStream {
        let message_type = to_syn_type(&message.namespaced_name);
        let buf_ident = if message.fields.is_empty() {
            format_ident!("_buf")
        } else {
            format_ident!("buf")
        };

        let encode_stmts = message.fields.iter().map(|field| self.field_encode(field));
        let merge_arms = message.fields.iter().map(|field| self.field_merge_arm(field));
        let len_exprs = message.fields.iter().map(|field| self.field_encoded_len(field));

        quote! {
            impl ::protoforge::Message for #message_type {
                fn encode_raw(&self, #buf_ident: &mut impl ::protoforge::bytes::BufMut) {
                    #(#encode_stmts)*
                }

                fn merge_field(
                    &mut self,
                    tag: u32,
                    wire_type: ::protoforge::encoding::WireType,
                    buf: &mut impl ::protoforge::bytes::Buf,
                    ctx: ::protoforge::encoding::DecodeContext,
                ) -> ::std::result::Result<(), ::protoforge::DecodeError> {
                    match tag {
                        #(#merge_arms,)*
                        _ => ::protoforge::encoding::skip_field(wire_type, buf, ctx),
                    }
                }

                fn encoded_len(&self) -> usize {
                    0 #(+ #len_exprs)*
                }

                fn clear(&mut self) {
                    *self = Self::default();
                }
            }
        }
    }

    fn field_encode(&self, field: &Field) -> TokenStream {
        let tag = Literal::u32_suffixed(field.tag);
        let ident = to_syn_ident(&field.name);
        let module = format_ident!("{}", field.ty.module());
        let encoding = quote!(::protoforge::encoding::#module);

        match &field.kind {
            Kind::Plain => {
                let guard = plain_guard(field);
                quote! {
                    if #guard {
                        #encoding::encode(#tag, &self.#ident, buf);
                    }
                }
            }
            Kind::Optional => match field.ty {
                Ty::Message(_) => quote! {
                    if let Some(msg) = &self.#ident {
                        #encoding::encode(#tag, msg, buf);
                    }
                },
                _ => quote! {
                    if let Some(value) = &self.#ident {
                        #encoding::encode(#tag, value, buf);
                    }
                },
            },
            Kind::Repeated { packed: true } => quote! {
                #encoding::encode_packed(#tag, &self.#ident, buf);
            },
            Kind::Repeated { packed: false } => quote! {
                #encoding::encode_repeated(#tag, &self.#ident, buf);
            },
            Kind::Map { key } => {
                let key_module = format_ident!("{}", key.module());
                let key_encoding = quote!(::protoforge::encoding::#key_module);
                quote! {
                    ::protoforge::encoding::hash_map::encode(
                        #key_encoding::encode,
                        #key_encoding::encoded_len,
                        #encoding::encode,
                        #encoding::encoded_len,
                        #tag,
                        &self.#ident,
                        buf,
                    );
                }
            }
        }
    }

    fn field_merge_arm(&self, field: &Field) -> TokenStream {
        let tag = Literal::u32_suffixed(field.tag);
        let ident = to_syn_ident(&field.name);
        let module = format_ident!("{}", field.ty.module());
        let encoding = quote!(::protoforge::encoding::#module);

        match &field.kind {
            Kind::Plain => quote! {
                #tag => #encoding::merge(wire_type, &mut self.#ident, buf, ctx)
            },
            Kind::Optional => quote! {
                #tag => #encoding::merge(
                    wire_type,
                    self.#ident.get_or_insert_with(::std::default::Default::default),
                    buf,
                    ctx,
                )
            },
            Kind::Repeated { .. } => quote! {
                #tag => #encoding::merge_repeated(wire_type, &mut self.#ident, buf, ctx)
            },
            Kind::Map { key } => {
                let key_module = format_ident!("{}", key.module());
                let key_encoding = quote!(::protoforge::encoding::#key_module);
                quote! {
                    #tag => {
                        ::protoforge::encoding::check_wire_type(
                            ::protoforge::encoding::WireType::LengthDelimited,
                            wire_type,
                        )?;
                        ::protoforge::encoding::hash_map::merge(
                            #key_encoding::merge,
                            #encoding::merge,
                            &mut self.#ident,
                            buf,
                            ctx,
                        )
                    }
                }
            }
        }
    }

    fn field_encoded_len(&self, field: &Field) -> TokenStream {
        let tag = Literal::u32_suffixed(field.tag);
        let ident = to_syn_ident(&field.name);
        let module = format_ident!("{}", field.ty.module());
        let encoding = quote!(::protoforge::encoding::#module);

        match &field.kind {
            Kind::Plain => {
                let guard = plain_guard(field);
                quote! {
                    if #guard {
                        #encoding::encoded_len(#tag, &self.#ident)
                    } else {
                        0
                    }
                }
            }
            Kind::Optional => quote! {
                self.#ident
                    .as_ref()
                    .map_or(0, |value| #encoding::encoded_len(#tag, value))
            },
            Kind::Repeated { packed: true } => quote! {
                #encoding::encoded_len_packed(#tag, &self.#ident)
            },
            Kind::Repeated { packed: false } => quote! {
                #encoding::encoded_len_repeated(#tag, &self.#ident)
            },
            Kind::Map { key } => {
                let key_module = format_ident!("{}", key.module());
                let key_encoding = quote!(::protoforge::encoding::#key_module);
                quote! {
                    ::protoforge::encoding::hash_map::encoded_len(
                        #key_encoding::encoded_len,
                        #encoding::encoded_len,
                        #tag,
                        &self.#ident,
                    )
                }
            }
        }
    }

    fn message_json(&self, message: &MessageNode) -> TokenStream {
        let message_type = to_syn_type(&message.namespaced_name);

        let to_json = if message.fields.is_empty() {
            quote! {
                fn to_json_map(&self) -> ::protoforge::json::JsonObject {
                    ::protoforge::json::JsonObject::new()
                }
            }
        } else {
            let write_stmts = message
                .fields
                .iter()
                .map(|field| self.field_json_write(field));
            quote! {
                fn to_json_map(&self) -> ::protoforge::json::JsonObject {
                    let mut object = ::protoforge::json::JsonObject::new();
                    #(#write_stmts)*
                    object
                }
            }
        };

        let merge_json = if message.fields.is_empty() {
            quote! {
                fn merge_json(
                    &mut self,
                    value: &::protoforge::json::Value,
                ) -> ::std::result::Result<(), ::protoforge::JsonError> {
                    let _object = ::protoforge::json::object(value)?;
                    Ok(())
                }
            }
        } else {
            let read_stmts = message
                .fields
                .iter()
                .map(|field| self.field_json_read(field));
            quote! {
                fn merge_json(
                    &mut self,
                    value: &::protoforge::json::Value,
                ) -> ::std::result::Result<(), ::protoforge::JsonError> {
                    let object = ::protoforge::json::object(value)?;
                    #(#read_stmts)*
                    Ok(())
                }
            }
        };

        quote! {
            impl ::protoforge::JsonMessage for #message_type {
                #to_json
                #merge_json
            }
        }
    }

    /// The key a field is written under: the JSON name by default, the proto
    /// field name when so configured.
    fn json_key<'f>(&self, field: &'f Field) -> &'f str {
        if self.config.use_proto_field_name {
            &field.proto_name
        } else {
            &field.json_name
        }
    }

    fn field_json_write(&self, field: &Field) -> TokenStream {
        let ident = to_syn_ident(&field.name);
        let key = self.json_key(field);
        let emit_defaults = self.config.emit_fields_with_default_values;

        match &field.kind {
            Kind::Plain => {
                let value = json_value_owned(&field.ty, &ident);
                let insert = quote! {
                    object.insert(#key.to_string(), #value);
                };
                if emit_defaults {
                    insert
                } else {
                    let guard = plain_guard(field);
                    quote! {
                        if #guard {
                            #insert
                        }
                    }
                }
            }
            // Unset optionals are omitted even when defaults are emitted;
            // a set default still shows, preserving presence.
            Kind::Optional => {
                let value = json_value_ref(&field.ty, &quote!(value));
                quote! {
                    if let Some(value) = &self.#ident {
                        object.insert(#key.to_string(), #value);
                    }
                }
            }
            Kind::Repeated { .. } => {
                let element = json_value_ref(&field.ty, &quote!(value));
                let insert = quote! {
                    object.insert(
                        #key.to_string(),
                        ::protoforge::json::Value::Array(
                            self.#ident.iter().map(|value| #element).collect(),
                        ),
                    );
                };
                if emit_defaults {
                    insert
                } else {
                    quote! {
                        if !self.#ident.is_empty() {
                            #insert
                        }
                    }
                }
            }
            Kind::Map { .. } => {
                let element = json_value_ref(&field.ty, &quote!(value));
                let insert = quote! {
                    {
                        let mut entries = ::protoforge::json::JsonObject::new();
                        for (key, value) in &self.#ident {
                            entries.insert(key.to_string(), #element);
                        }
                        object.insert(#key.to_string(), ::protoforge::json::Value::Object(entries));
                    }
                };
                if emit_defaults {
                    insert
                } else {
                    quote! {
                        if !self.#ident.is_empty() {
                            #insert
                        }
                    }
                }
            }
        }
    }

    fn field_json_read(&self, field: &Field) -> TokenStream {
        let ident = to_syn_ident(&field.name);
        let json_name = &field.json_name;
        let proto_name = &field.proto_name;
        let lookup = quote! {
            ::protoforge::json::field(object, #json_name, #proto_name)
        };

        match &field.kind {
            Kind::Plain => {
                let parse = json_parse_expr(&field.ty, &quote!(value));
                quote! {
                    if let Some(value) = #lookup {
                        self.#ident = #parse;
                    }
                }
            }
            Kind::Optional => {
                let parse = json_parse_expr(&field.ty, &quote!(value));
                let parsed = if field.boxed {
                    quote!(::std::boxed::Box::new(#parse))
                } else {
                    parse
                };
                quote! {
                    if let Some(value) = #lookup {
                        self.#ident = ::std::option::Option::Some(#parsed);
                    }
                }
            }
            Kind::Repeated { .. } => {
                let element = json_parse_expr(&field.ty, &quote!(item));
                quote! {
                    if let Some(value) = #lookup {
                        let items = ::protoforge::json::array(value)?;
                        let mut decoded = ::std::vec::Vec::with_capacity(items.len());
                        for item in items {
                            decoded.push(#element);
                        }
                        self.#ident = decoded;
                    }
                }
            }
            Kind::Map { .. } => {
                let element = json_parse_expr(&field.ty, &quote!(item));
                quote! {
                    if let Some(value) = #lookup {
                        let entries = ::protoforge::json::object(value)?;
                        let mut decoded =
                            ::std::collections::HashMap::with_capacity(entries.len());
                        for (key, item) in entries {
                            decoded.insert(::protoforge::json::parse_key(key)?, #element);
                        }
                        self.#ident = decoded;
                    }
                }
            }
        }
    }
}

/// Depth-first collection of every message node, declaration order.
fn collect_messages<'f>(nodes: &'f [Node], out: &mut Vec<&'f MessageNode>) {
    for node in nodes {
        if let Node::Message(message) = node {
            out.push(message);
            collect_messages(&message.children, out);
        }
    }
}

fn doc_attrs(comments: &Comments) -> Vec<TokenStream> {
    comments.lines().map(|line| quote!(#[doc = #line])).collect()
}

/// The non-default test for an implicit-presence field, shared by the binary
/// and JSON write sides.
fn plain_guard(field: &Field) -> TokenStream {
    let ident = to_syn_ident(&field.name);
    match &field.ty {
        Ty::String | Ty::Bytes => quote!(!self.#ident.is_empty()),
        Ty::Bool => quote!(self.#ident),
        Ty::Enum(_) => quote!(self.#ident.to_raw() != 0),
        Ty::Float => quote!(self.#ident != 0f32),
        Ty::Double => quote!(self.#ident != 0f64),
        Ty::Int32 | Ty::Sint32 | Ty::Sfixed32 => quote!(self.#ident != 0i32),
        Ty::Int64 | Ty::Sint64 | Ty::Sfixed64 => quote!(self.#ident != 0i64),
        Ty::Uint32 | Ty::Fixed32 => quote!(self.#ident != 0u32),
        Ty::Uint64 | Ty::Fixed64 => quote!(self.#ident != 0u64),
        Ty::Message(_) => unreachable!("message fields always have explicit presence"),
    }
}

/// The JSON value for a field accessed by value (`self.field`).
fn json_value_owned(ty: &Ty, ident: &syn::Ident) -> TokenStream {
    match ty {
        Ty::Int32 | Ty::Sint32 | Ty::Sfixed32 | Ty::Uint32 | Ty::Fixed32 | Ty::Bool => {
            quote!(::protoforge::json::Value::from(self.#ident))
        }
        Ty::Int64 | Ty::Sint64 | Ty::Sfixed64 => quote!(::protoforge::json::int64(self.#ident)),
        Ty::Uint64 | Ty::Fixed64 => quote!(::protoforge::json::uint64(self.#ident)),
        Ty::Float => quote!(::protoforge::json::float32(self.#ident)),
        Ty::Double => quote!(::protoforge::json::float64(self.#ident)),
        Ty::String => quote!(::protoforge::json::Value::from(self.#ident.clone())),
        Ty::Bytes => quote!(::protoforge::json::bytes(&self.#ident)),
        Ty::Enum(_) => quote!(::protoforge::json::enum_name(self.#ident)),
        Ty::Message(_) => unreachable!("message fields always have explicit presence"),
    }
}

/// The JSON value for an element reached through a reference.
fn json_value_ref(ty: &Ty, value: &TokenStream) -> TokenStream {
    match ty {
        Ty::Int32 | Ty::Sint32 | Ty::Sfixed32 | Ty::Uint32 | Ty::Fixed32 | Ty::Bool => {
            quote!(::protoforge::json::Value::from(*#value))
        }
        Ty::Int64 | Ty::Sint64 | Ty::Sfixed64 => quote!(::protoforge::json::int64(*#value)),
        Ty::Uint64 | Ty::Fixed64 => quote!(::protoforge::json::uint64(*#value)),
        Ty::Float => quote!(::protoforge::json::float32(*#value)),
        Ty::Double => quote!(::protoforge::json::float64(*#value)),
        Ty::String => quote!(::protoforge::json::Value::from(#value.clone())),
        Ty::Bytes => quote!(::protoforge::json::bytes(#value)),
        Ty::Enum(_) => quote!(::protoforge::json::enum_name(*#value)),
        Ty::Message(_) => quote!(::protoforge::json::Value::Object(
            ::protoforge::JsonMessage::to_json_map(#value)
        )),
    }
}

/// The parse expression recovering one value from a JSON value reference.
fn json_parse_expr(ty: &Ty, value: &TokenStream) -> TokenStream {
    match ty {
        Ty::Int32 | Ty::Sint32 | Ty::Sfixed32 => quote!(::protoforge::json::parse_i32(#value)?),
        Ty::Uint32 | Ty::Fixed32 => quote!(::protoforge::json::parse_u32(#value)?),
        Ty::Int64 | Ty::Sint64 | Ty::Sfixed64 => quote!(::protoforge::json::parse_i64(#value)?),
        Ty::Uint64 | Ty::Fixed64 => quote!(::protoforge::json::parse_u64(#value)?),
        Ty::Float => quote!(::protoforge::json::parse_f32(#value)?),
        Ty::Double => quote!(::protoforge::json::parse_f64(#value)?),
        Ty::Bool => quote!(::protoforge::json::parse_bool(#value)?),
        Ty::String => quote!(::protoforge::json::parse_string(#value)?),
        Ty::Bytes => quote!(::protoforge::json::parse_bytes(#value)?),
        Ty::Enum(_) => quote!(::protoforge::json::parse_enum(#value)?),
        Ty::Message(_) => quote! {
            {
                let mut msg = ::std::default::Default::default();
                ::protoforge::JsonMessage::merge_json(&mut msg, #value)?;
                msg
            }
        },
    }
}
