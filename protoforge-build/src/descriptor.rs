//! Hand-maintained translation of the subset of
//! [descriptor.proto](https://github.com/protocolbuffers/protobuf/blob/main/src/google/protobuf/descriptor.proto)
//! and
//! [plugin.proto](https://github.com/protocolbuffers/protobuf/blob/main/src/google/protobuf/compiler/plugin.proto)
//! that the generator consumes.
//!
//! The codec impls are written by hand in the same shape the generator emits,
//! so the toolchain bootstraps on its own wire runtime. Fields the generator
//! does not read are left out of the structs entirely; the decoder skips them
//! like any other unknown field, so these trimmed messages remain decodable
//! against full descriptors.

use protoforge::encoding::{self, DecodeContext, WireType};
use protoforge::{DecodeError, Message};

/// Describes a complete .proto file.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FileDescriptorProto {
    /// File name, relative to the root of the source tree.
    pub name: String,
    /// e.g. "foo", "foo.bar", etc.
    pub package: String,
    /// Names of files imported by this file.
    pub dependency: Vec<String>,
    /// All top-level message definitions in this file.
    pub message_type: Vec<DescriptorProto>,
    /// All top-level enum definitions in this file.
    pub enum_type: Vec<EnumDescriptorProto>,
    /// Optional information about the original source code.
    pub source_code_info: Option<SourceCodeInfo>,
    /// The syntax of the proto file: "proto2" or "proto3".
    pub syntax: String,
}

impl Message for FileDescriptorProto {
    fn encode_raw(&self, buf: &mut impl protoforge::bytes::BufMut) {
        if !self.name.is_empty() {
            encoding::string::encode(1u32, &self.name, buf);
        }
        if !self.package.is_empty() {
            encoding::string::encode(2u32, &self.package, buf);
        }
        encoding::string::encode_repeated(3u32, &self.dependency, buf);
        encoding::message::encode_repeated(4u32, &self.message_type, buf);
        encoding::message::encode_repeated(5u32, &self.enum_type, buf);
        if let Some(msg) = &self.source_code_info {
            encoding::message::encode(9u32, msg, buf);
        }
        if !self.syntax.is_empty() {
            encoding::string::encode(12u32, &self.syntax, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl protoforge::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1u32 => encoding::string::merge(wire_type, &mut self.name, buf, ctx),
            2u32 => encoding::string::merge(wire_type, &mut self.package, buf, ctx),
            3u32 => encoding::string::merge_repeated(wire_type, &mut self.dependency, buf, ctx),
            4u32 => encoding::message::merge_repeated(wire_type, &mut self.message_type, buf, ctx),
            5u32 => encoding::message::merge_repeated(wire_type, &mut self.enum_type, buf, ctx),
            9u32 => encoding::message::merge(
                wire_type,
                self.source_code_info.get_or_insert_with(Default::default),
                buf,
                ctx,
            ),
            12u32 => encoding::string::merge(wire_type, &mut self.syntax, buf, ctx),
            _ => encoding::skip_field(wire_type, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.name.is_empty() {
            len += encoding::string::encoded_len(1u32, &self.name);
        }
        if !self.package.is_empty() {
            len += encoding::string::encoded_len(2u32, &self.package);
        }
        len += encoding::string::encoded_len_repeated(3u32, &self.dependency);
        len += encoding::message::encoded_len_repeated(4u32, &self.message_type);
        len += encoding::message::encoded_len_repeated(5u32, &self.enum_type);
        if let Some(msg) = &self.source_code_info {
            len += encoding::message::encoded_len(9u32, msg);
        }
        if !self.syntax.is_empty() {
            len += encoding::string::encoded_len(12u32, &self.syntax);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Describes a message type.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct DescriptorProto {
    pub name: String,
    pub field: Vec<FieldDescriptorProto>,
    pub nested_type: Vec<DescriptorProto>,
    pub enum_type: Vec<EnumDescriptorProto>,
    pub options: Option<MessageOptions>,
}

impl Message for DescriptorProto {
    fn encode_raw(&self, buf: &mut impl protoforge::bytes::BufMut) {
        if !self.name.is_empty() {
            encoding::string::encode(1u32, &self.name, buf);
        }
        encoding::message::encode_repeated(2u32, &self.field, buf);
        encoding::message::encode_repeated(3u32, &self.nested_type, buf);
        encoding::message::encode_repeated(4u32, &self.enum_type, buf);
        if let Some(msg) = &self.options {
            encoding::message::encode(7u32, msg, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl protoforge::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1u32 => encoding::string::merge(wire_type, &mut self.name, buf, ctx),
            2u32 => encoding::message::merge_repeated(wire_type, &mut self.field, buf, ctx),
            3u32 => encoding::message::merge_repeated(wire_type, &mut self.nested_type, buf, ctx),
            4u32 => encoding::message::merge_repeated(wire_type, &mut self.enum_type, buf, ctx),
            7u32 => encoding::message::merge(
                wire_type,
                self.options.get_or_insert_with(Default::default),
                buf,
                ctx,
            ),
            _ => encoding::skip_field(wire_type, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.name.is_empty() {
            len += encoding::string::encoded_len(1u32, &self.name);
        }
        len += encoding::message::encoded_len_repeated(2u32, &self.field);
        len += encoding::message::encoded_len_repeated(3u32, &self.nested_type);
        len += encoding::message::encoded_len_repeated(4u32, &self.enum_type);
        if let Some(msg) = &self.options {
            len += encoding::message::encoded_len(7u32, msg);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

pub mod field_descriptor_proto {
    use protoforge::UnknownEnumValue;

    /// The declared type of a field.
    ///
    /// 0 is reserved for errors; the order is weird for historical reasons.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Type {
        Double = 1,
        Float = 2,
        Int64 = 3,
        Uint64 = 4,
        Int32 = 5,
        Fixed64 = 6,
        Fixed32 = 7,
        Bool = 8,
        String = 9,
        /// Tag-delimited aggregate. Deprecated and unsupported in proto3.
        Group = 10,
        /// Length-delimited aggregate.
        Message = 11,
        Bytes = 12,
        Uint32 = 13,
        Enum = 14,
        Sfixed32 = 15,
        Sfixed64 = 16,
        Sint32 = 17,
        Sint64 = 18,
    }

    impl TryFrom<i32> for Type {
        type Error = UnknownEnumValue;

        fn try_from(value: i32) -> Result<Type, UnknownEnumValue> {
            match value {
                1 => Ok(Type::Double),
                2 => Ok(Type::Float),
                3 => Ok(Type::Int64),
                4 => Ok(Type::Uint64),
                5 => Ok(Type::Int32),
                6 => Ok(Type::Fixed64),
                7 => Ok(Type::Fixed32),
                8 => Ok(Type::Bool),
                9 => Ok(Type::String),
                10 => Ok(Type::Group),
                11 => Ok(Type::Message),
                12 => Ok(Type::Bytes),
                13 => Ok(Type::Uint32),
                14 => Ok(Type::Enum),
                15 => Ok(Type::Sfixed32),
                16 => Ok(Type::Sfixed64),
                17 => Ok(Type::Sint32),
                18 => Ok(Type::Sint64),
                other => Err(UnknownEnumValue(other)),
            }
        }
    }

    /// The cardinality label of a field. 0 is reserved for errors.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Label {
        Optional = 1,
        Required = 2,
        Repeated = 3,
    }

    impl TryFrom<i32> for Label {
        type Error = UnknownEnumValue;

        fn try_from(value: i32) -> Result<Label, UnknownEnumValue> {
            match value {
                1 => Ok(Label::Optional),
                2 => Ok(Label::Required),
                3 => Ok(Label::Repeated),
                other => Err(UnknownEnumValue(other)),
            }
        }
    }
}

/// Describes a field within a message.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FieldDescriptorProto {
    pub name: String,
    pub number: i32,
    /// One of the `field_descriptor_proto::Label` values, as a raw integer.
    pub label: i32,
    /// One of the `field_descriptor_proto::Type` values, as a raw integer.
    pub r#type: i32,
    /// For message and enum types, the name of the type. If the name starts
    /// with a '.', it is fully-qualified.
    pub type_name: String,
    /// If set, gives the index of a oneof in the containing type's oneof list.
    pub oneof_index: Option<i32>,
    /// JSON name of this field, set by the protocol compiler. Honors a
    /// field-level `json_name` option, otherwise the camelCase field name.
    pub json_name: String,
    pub options: Option<FieldOptions>,
    /// Tracks whether the field was declared with proto3 `optional`.
    pub proto3_optional: bool,
}

impl Message for FieldDescriptorProto {
    fn encode_raw(&self, buf: &mut impl protoforge::bytes::BufMut) {
        if !self.name.is_empty() {
            encoding::string::encode(1u32, &self.name, buf);
        }
        if self.number != 0i32 {
            encoding::int32::encode(3u32, &self.number, buf);
        }
        if self.label != 0i32 {
            encoding::int32::encode(4u32, &self.label, buf);
        }
        if self.r#type != 0i32 {
            encoding::int32::encode(5u32, &self.r#type, buf);
        }
        if !self.type_name.is_empty() {
            encoding::string::encode(6u32, &self.type_name, buf);
        }
        if let Some(msg) = &self.options {
            encoding::message::encode(8u32, msg, buf);
        }
        if let Some(value) = &self.oneof_index {
            encoding::int32::encode(9u32, value, buf);
        }
        if !self.json_name.is_empty() {
            encoding::string::encode(10u32, &self.json_name, buf);
        }
        if self.proto3_optional {
            encoding::bool::encode(17u32, &self.proto3_optional, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl protoforge::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1u32 => encoding::string::merge(wire_type, &mut self.name, buf, ctx),
            3u32 => encoding::int32::merge(wire_type, &mut self.number, buf, ctx),
            4u32 => encoding::int32::merge(wire_type, &mut self.label, buf, ctx),
            5u32 => encoding::int32::merge(wire_type, &mut self.r#type, buf, ctx),
            6u32 => encoding::string::merge(wire_type, &mut self.type_name, buf, ctx),
            8u32 => encoding::message::merge(
                wire_type,
                self.options.get_or_insert_with(Default::default),
                buf,
                ctx,
            ),
            9u32 => encoding::int32::merge(
                wire_type,
                self.oneof_index.get_or_insert_with(Default::default),
                buf,
                ctx,
            ),
            10u32 => encoding::string::merge(wire_type, &mut self.json_name, buf, ctx),
            17u32 => encoding::bool::merge(wire_type, &mut self.proto3_optional, buf, ctx),
            _ => encoding::skip_field(wire_type, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.name.is_empty() {
            len += encoding::string::encoded_len(1u32, &self.name);
        }
        if self.number != 0i32 {
            len += encoding::int32::encoded_len(3u32, &self.number);
        }
        if self.label != 0i32 {
            len += encoding::int32::encoded_len(4u32, &self.label);
        }
        if self.r#type != 0i32 {
            len += encoding::int32::encoded_len(5u32, &self.r#type);
        }
        if !self.type_name.is_empty() {
            len += encoding::string::encoded_len(6u32, &self.type_name);
        }
        if let Some(msg) = &self.options {
            len += encoding::message::encoded_len(8u32, msg);
        }
        if let Some(value) = &self.oneof_index {
            len += encoding::int32::encoded_len(9u32, value);
        }
        if !self.json_name.is_empty() {
            len += encoding::string::encoded_len(10u32, &self.json_name);
        }
        if self.proto3_optional {
            len += encoding::bool::encoded_len(17u32, &self.proto3_optional);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Describes an enum type.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct EnumDescriptorProto {
    pub name: String,
    pub value: Vec<EnumValueDescriptorProto>,
}

impl Message for EnumDescriptorProto {
    fn encode_raw(&self, buf: &mut impl protoforge::bytes::BufMut) {
        if !self.name.is_empty() {
            encoding::string::encode(1u32, &self.name, buf);
        }
        encoding::message::encode_repeated(2u32, &self.value, buf);
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl protoforge::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1u32 => encoding::string::merge(wire_type, &mut self.name, buf, ctx),
            2u32 => encoding::message::merge_repeated(wire_type, &mut self.value, buf, ctx),
            _ => encoding::skip_field(wire_type, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.name.is_empty() {
            len += encoding::string::encoded_len(1u32, &self.name);
        }
        len += encoding::message::encoded_len_repeated(2u32, &self.value);
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Describes a value within an enum.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct EnumValueDescriptorProto {
    pub name: String,
    pub number: i32,
}

impl Message for EnumValueDescriptorProto {
    fn encode_raw(&self, buf: &mut impl protoforge::bytes::BufMut) {
        if !self.name.is_empty() {
            encoding::string::encode(1u32, &self.name, buf);
        }
        if self.number != 0i32 {
            encoding::int32::encode(2u32, &self.number, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl protoforge::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1u32 => encoding::string::merge(wire_type, &mut self.name, buf, ctx),
            2u32 => encoding::int32::merge(wire_type, &mut self.number, buf, ctx),
            _ => encoding::skip_field(wire_type, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.name.is_empty() {
            len += encoding::string::encoded_len(1u32, &self.name);
        }
        if self.number != 0i32 {
            len += encoding::int32::encoded_len(2u32, &self.number);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct MessageOptions {
    /// Whether the message is an automatically generated map entry type for a
    /// `map<K, V>` field. The parsed descriptor of such a field looks like a
    /// repeated message field whose type is a nested two-field entry message
    /// carrying this option.
    pub map_entry: bool,
}

impl Message for MessageOptions {
    fn encode_raw(&self, buf: &mut impl protoforge::bytes::BufMut) {
        if self.map_entry {
            encoding::bool::encode(7u32, &self.map_entry, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl protoforge::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            7u32 => encoding::bool::merge(wire_type, &mut self.map_entry, buf, ctx),
            _ => encoding::skip_field(wire_type, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        if self.map_entry {
            encoding::bool::encoded_len(7u32, &self.map_entry)
        } else {
            0
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct FieldOptions {
    /// In proto3 repeated numeric fields are packed unless this is explicitly
    /// set to false, so presence matters.
    pub packed: Option<bool>,
}

impl Message for FieldOptions {
    fn encode_raw(&self, buf: &mut impl protoforge::bytes::BufMut) {
        if let Some(value) = &self.packed {
            encoding::bool::encode(2u32, value, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl protoforge::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            2u32 => encoding::bool::merge(
                wire_type,
                self.packed.get_or_insert_with(Default::default),
                buf,
                ctx,
            ),
            _ => encoding::skip_field(wire_type, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        self.packed
            .as_ref()
            .map_or(0, |value| encoding::bool::encoded_len(2u32, value))
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

pub mod source_code_info {
    use super::*;

    /// Identifies a piece of source code in a .proto file and the comments
    /// attached to it.
    #[derive(Clone, PartialEq, Debug, Default)]
    pub struct Location {
        /// A path from the root `FileDescriptorProto` to the definition: each
        /// pair of elements is a field number and an index. For example
        /// `[4, 3, 2, 7]` is the whole declaration of the message field
        /// `file.message_type[3].field[7]`.
        pub path: Vec<i32>,
        /// The comment block immediately preceding the declaration, comment
        /// markers stripped, newlines included.
        pub leading_comments: Option<String>,
    }

    impl Message for Location {
        fn encode_raw(&self, buf: &mut impl protoforge::bytes::BufMut) {
            encoding::int32::encode_packed(1u32, &self.path, buf);
            if let Some(value) = &self.leading_comments {
                encoding::string::encode(3u32, value, buf);
            }
        }

        fn merge_field(
            &mut self,
            tag: u32,
            wire_type: WireType,
            buf: &mut impl protoforge::bytes::Buf,
            ctx: DecodeContext,
        ) -> Result<(), DecodeError> {
            match tag {
                1u32 => encoding::int32::merge_repeated(wire_type, &mut self.path, buf, ctx),
                3u32 => encoding::string::merge(
                    wire_type,
                    self.leading_comments.get_or_insert_with(Default::default),
                    buf,
                    ctx,
                ),
                _ => encoding::skip_field(wire_type, buf, ctx),
            }
        }

        fn encoded_len(&self) -> usize {
            let mut len = 0;
            len += encoding::int32::encoded_len_packed(1u32, &self.path);
            if let Some(value) = &self.leading_comments {
                len += encoding::string::encoded_len(3u32, value);
            }
            len
        }

        fn clear(&mut self) {
            *self = Self::default();
        }
    }
}

/// Encapsulates source information about the file a `FileDescriptorProto` was
/// generated from.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct SourceCodeInfo {
    pub location: Vec<source_code_info::Location>,
}

impl Message for SourceCodeInfo {
    fn encode_raw(&self, buf: &mut impl protoforge::bytes::BufMut) {
        encoding::message::encode_repeated(1u32, &self.location, buf);
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl protoforge::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1u32 => encoding::message::merge_repeated(wire_type, &mut self.location, buf, ctx),
            _ => encoding::skip_field(wire_type, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        encoding::message::encoded_len_repeated(1u32, &self.location)
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A request from the protocol compiler to a code generator plugin, read from
/// the standard input byte stream.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct CodeGeneratorRequest {
    /// The .proto files that were explicitly listed on the command line.
    /// Code should be generated for exactly these files.
    pub file_to_generate: Vec<String>,
    /// The generator parameter passed on the command line.
    pub parameter: String,
    /// All files the listed files import, transitively, plus the listed
    /// files themselves, in topological order.
    pub proto_file: Vec<FileDescriptorProto>,
}

impl Message for CodeGeneratorRequest {
    fn encode_raw(&self, buf: &mut impl protoforge::bytes::BufMut) {
        encoding::string::encode_repeated(1u32, &self.file_to_generate, buf);
        if !self.parameter.is_empty() {
            encoding::string::encode(2u32, &self.parameter, buf);
        }
        encoding::message::encode_repeated(15u32, &self.proto_file, buf);
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl protoforge::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1u32 => {
                encoding::string::merge_repeated(wire_type, &mut self.file_to_generate, buf, ctx)
            }
            2u32 => encoding::string::merge(wire_type, &mut self.parameter, buf, ctx),
            15u32 => encoding::message::merge_repeated(wire_type, &mut self.proto_file, buf, ctx),
            _ => encoding::skip_field(wire_type, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        len += encoding::string::encoded_len_repeated(1u32, &self.file_to_generate);
        if !self.parameter.is_empty() {
            len += encoding::string::encoded_len(2u32, &self.parameter);
        }
        len += encoding::message::encoded_len_repeated(15u32, &self.proto_file);
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

pub mod code_generator_response {
    use super::*;

    /// Set in `supported_features` to declare that the plugin understands
    /// proto3 `optional` fields.
    pub const FEATURE_PROTO3_OPTIONAL: u64 = 1;

    /// A single generated output file.
    #[derive(Clone, PartialEq, Debug, Default)]
    pub struct File {
        /// The file name, relative to the output directory; always uses '/'
        /// separators and must not contain "." or ".." components.
        pub name: String,
        /// The file contents.
        pub content: String,
    }

    impl Message for File {
        fn encode_raw(&self, buf: &mut impl protoforge::bytes::BufMut) {
            if !self.name.is_empty() {
                encoding::string::encode(1u32, &self.name, buf);
            }
            if !self.content.is_empty() {
                encoding::string::encode(15u32, &self.content, buf);
            }
        }

        fn merge_field(
            &mut self,
            tag: u32,
            wire_type: WireType,
            buf: &mut impl protoforge::bytes::Buf,
            ctx: DecodeContext,
        ) -> Result<(), DecodeError> {
            match tag {
                1u32 => encoding::string::merge(wire_type, &mut self.name, buf, ctx),
                15u32 => encoding::string::merge(wire_type, &mut self.content, buf, ctx),
                _ => encoding::skip_field(wire_type, buf, ctx),
            }
        }

        fn encoded_len(&self) -> usize {
            let mut len = 0;
            if !self.name.is_empty() {
                len += encoding::string::encoded_len(1u32, &self.name);
            }
            if !self.content.is_empty() {
                len += encoding::string::encoded_len(15u32, &self.content);
            }
            len
        }

        fn clear(&mut self) {
            *self = Self::default();
        }
    }
}

/// The plugin's reply to the protocol compiler, written to the standard
/// output byte stream.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct CodeGeneratorResponse {
    /// An error message for problems in the input, such as an unresolvable
    /// type reference. Reported back through the compiler rather than by
    /// exiting non-zero, which is reserved for internal failures.
    pub error: Option<String>,
    /// A bitmask of supported `FEATURE_*` flags.
    pub supported_features: u64,
    pub file: Vec<code_generator_response::File>,
}

impl Message for CodeGeneratorResponse {
    fn encode_raw(&self, buf: &mut impl protoforge::bytes::BufMut) {
        if let Some(value) = &self.error {
            encoding::string::encode(1u32, value, buf);
        }
        if self.supported_features != 0u64 {
            encoding::uint64::encode(2u32, &self.supported_features, buf);
        }
        encoding::message::encode_repeated(15u32, &self.file, buf);
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl protoforge::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1u32 => encoding::string::merge(
                wire_type,
                self.error.get_or_insert_with(Default::default),
                buf,
                ctx,
            ),
            2u32 => encoding::uint64::merge(wire_type, &mut self.supported_features, buf, ctx),
            15u32 => encoding::message::merge_repeated(wire_type, &mut self.file, buf, ctx),
            _ => encoding::skip_field(wire_type, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if let Some(value) = &self.error {
            len += encoding::string::encoded_len(1u32, value);
        }
        if self.supported_features != 0u64 {
            len += encoding::uint64::encoded_len(2u32, &self.supported_features);
        }
        len += encoding::message::encoded_len_repeated(15u32, &self.file);
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_descriptor_round_trip() {
        let file = FileDescriptorProto {
            name: "widgets.proto".to_string(),
            package: "acme.widgets".to_string(),
            dependency: vec!["acme/common.proto".to_string()],
            message_type: vec![DescriptorProto {
                name: "Widget".to_string(),
                field: vec![FieldDescriptorProto {
                    name: "display_name".to_string(),
                    number: 1,
                    label: field_descriptor_proto::Label::Optional as i32,
                    r#type: field_descriptor_proto::Type::String as i32,
                    json_name: "displayName".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            enum_type: vec![EnumDescriptorProto {
                name: "Kind".to_string(),
                value: vec![EnumValueDescriptorProto {
                    name: "KIND_UNSPECIFIED".to_string(),
                    number: 0,
                }],
            }],
            source_code_info: Some(SourceCodeInfo {
                location: vec![source_code_info::Location {
                    path: vec![4, 0],
                    leading_comments: Some(" A widget.\n".to_string()),
                }],
            }),
            syntax: "proto3".to_string(),
        };

        let encoded = file.encode_to_vec();
        assert_eq!(encoded.len(), file.encoded_len());
        assert_eq!(FileDescriptorProto::decode(encoded.as_slice()).unwrap(), file);
    }

    #[test]
    fn unknown_descriptor_fields_are_tolerated() {
        // Field 8 (FileOptions) is not part of the trimmed FileDescriptorProto;
        // an encoded descriptor carrying it must still decode.
        let mut encoded = Vec::new();
        encoding::string::encode(1u32, &"a.proto".to_string(), &mut encoded);
        encoding::string::encode(8u32, &"ignored".to_string(), &mut encoded);
        encoding::string::encode(12u32, &"proto3".to_string(), &mut encoded);

        let decoded = FileDescriptorProto::decode(encoded.as_slice()).unwrap();
        assert_eq!(decoded.name, "a.proto");
        assert_eq!(decoded.syntax, "proto3");
    }

    #[test]
    fn response_round_trip() {
        let response = CodeGeneratorResponse {
            error: None,
            supported_features: code_generator_response::FEATURE_PROTO3_OPTIONAL,
            file: vec![code_generator_response::File {
                name: "widgets.pb.rs".to_string(),
                content: "pub struct Widget {}\n".to_string(),
            }],
        };
        let encoded = response.encode_to_vec();
        assert_eq!(
            CodeGeneratorResponse::decode(encoded.as_slice()).unwrap(),
            response
        );
    }
}
