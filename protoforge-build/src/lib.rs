#![doc(html_root_url = "https://docs.rs/protoforge-build/0.4.2")]

//! `protoforge-build` compiles `.proto` files into Rust.
//!
//! The crate is the generator half of the protoforge toolchain. It ships the
//! `protoc-gen-protoforge` plugin binary, which speaks the protocol compiler
//! plugin contract: a serialized `CodeGeneratorRequest` arrives on standard
//! input, one generated `<stem>.pb.rs` source per requested file leaves in a
//! serialized `CodeGeneratorResponse` on standard output.
//!
//! Generation runs in three stages. The resolver walks each
//! `FileDescriptorProto` into a tree of message and enum nodes with resolved
//! type references (using a request-wide identifier table for cross-file
//! lookups), the code generator renders that tree into type declarations
//! plus a binary and a JSON codec per message, and the response framing in
//! [`Config::run_plugin`] collects the outputs in request order.

use std::env;

use log::debug;
use regex::Regex;
use thiserror::Error;

pub mod ast;
pub mod descriptor;

mod code_generator;
mod ident;
mod message_graph;
mod resolver;

pub use resolver::ResolveError;

use crate::code_generator::CodeGenerator;
use crate::descriptor::{
    code_generator_response, CodeGeneratorRequest, CodeGeneratorResponse, FileDescriptorProto,
};
use crate::message_graph::MessageGraph;
use crate::resolver::TypeIndex;

/// A problem with the generator configuration or input.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("invalid exclude pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("invalid value {value:?} for option {option:?}")]
    Parameter { option: String, value: String },
}

/// Verbatim text a [`Plugin`] contributes to one generated file.
#[derive(Debug, Default)]
pub struct PluginOutput {
    /// Injected right after the generated-file banner.
    pub imports: String,
    /// Injected after the type declarations block.
    pub services: String,
}

/// An extension point over the resolved tree.
///
/// A plugin is a pure function of the tree and the configuration; the tree
/// is passed by shared reference and cannot be changed. Whatever it returns
/// is injected verbatim into the designated blocks of the generated file.
pub trait Plugin {
    fn generate(&mut self, file: &ast::FileAst, config: &Config) -> PluginOutput;
}

/// Configuration options for Protobuf code generation.
///
/// Programmatic configuration uses the builder methods; when running as a
/// `protoc` plugin the request's comma-separated `key=value` parameter
/// string is layered on top via [`Config::apply_parameter`].
pub struct Config {
    root: Option<String>,
    dest: Option<String>,
    exclude: Vec<String>,
    types_only: bool,
    pub(crate) emit_fields_with_default_values: bool,
    pub(crate) use_proto_field_name: bool,
    plugins: Vec<Box<dyn Plugin>>,
    #[cfg(feature = "format")]
    format: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            root: None,
            dest: None,
            exclude: Vec::new(),
            types_only: false,
            emit_fields_with_default_values: false,
            use_proto_field_name: false,
            plugins: Vec::new(),
            #[cfg(feature = "format")]
            format: true,
        }
    }
}

impl Config {
    /// Creates a new code generator configuration with default options.
    pub fn new() -> Config {
        Config::default()
    }

    /// Sets the directory input paths are resolved against. Output names
    /// mirror the proto path relative to it.
    pub fn root(&mut self, root: impl Into<String>) -> &mut Config {
        self.root = Some(root.into());
        self
    }

    /// Sets the output directory root the generated file names are placed
    /// beneath.
    pub fn dest(&mut self, dest: impl Into<String>) -> &mut Config {
        self.dest = Some(dest.into());
        self
    }

    /// Adds a regex pattern; input files matching it are skipped.
    pub fn exclude(&mut self, pattern: impl Into<String>) -> &mut Config {
        self.exclude.push(pattern.into());
        self
    }

    /// Configures the generator to emit type declarations only, no codecs.
    pub fn types_only(&mut self, enabled: bool) -> &mut Config {
        self.types_only = enabled;
        self
    }

    /// Configures the JSON codec to include fields whose value is the
    /// default, instead of omitting them per the canonical mapping.
    pub fn emit_fields_with_default_values(&mut self, enabled: bool) -> &mut Config {
        self.emit_fields_with_default_values = enabled;
        self
    }

    /// Configures the JSON codec to write keys using the original proto
    /// field names instead of their lowerCamel JSON names.
    pub fn use_proto_field_name(&mut self, enabled: bool) -> &mut Config {
        self.use_proto_field_name = enabled;
        self
    }

    /// Registers a plugin. Plugins run in registration order for every
    /// generated file.
    pub fn plugin(&mut self, plugin: Box<dyn Plugin>) -> &mut Config {
        self.plugins.push(plugin);
        self
    }

    /// Configures whether generated output is run through `prettyplease`.
    #[cfg(feature = "format")]
    pub fn format(&mut self, enabled: bool) -> &mut Config {
        self.format = enabled;
        self
    }

    /// Layers a comma-separated `key=value` parameter string, as passed by
    /// `protoc` via `--protoforge_opt`, over this configuration.
    ///
    /// Unknown keys are logged and ignored so that newer invocations keep
    /// working against older generators.
    pub fn apply_parameter(&mut self, parameter: &str) -> Result<(), Error> {
        for pair in parameter.split(',').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, "true"));
            match key {
                "root" => {
                    self.root = Some(value.to_string());
                }
                "dest" => {
                    self.dest = Some(value.to_string());
                }
                "exclude" => {
                    self.exclude.push(value.to_string());
                }
                "types_only" => {
                    self.types_only = parse_bool(key, value)?;
                }
                "json.emit_fields_with_default_values" => {
                    self.emit_fields_with_default_values = parse_bool(key, value)?;
                }
                "json.use_proto_field_name" => {
                    self.use_proto_field_name = parse_bool(key, value)?;
                }
                unknown => {
                    log::warn!("ignoring unknown option {:?}", unknown);
                }
            }
        }
        Ok(())
    }

    /// Runs the generator over a decoded `CodeGeneratorRequest`.
    ///
    /// Output files appear in the response in the order their inputs
    /// appeared in the request. The first resolution error aborts generation
    /// and is attached to the response; wire-level problems are the caller's
    /// to report.
    pub fn run_plugin(&mut self, request: CodeGeneratorRequest) -> CodeGeneratorResponse {
        let mut response = CodeGeneratorResponse {
            supported_features: code_generator_response::FEATURE_PROTO3_OPTIONAL,
            ..Default::default()
        };

        if let Err(error) = self.apply_parameter(&request.parameter) {
            response.error = Some(error.to_string());
            return response;
        }

        let mut exclude = Vec::with_capacity(self.exclude.len());
        for pattern in &self.exclude {
            match Regex::new(pattern) {
                Ok(regex) => exclude.push(regex),
                Err(source) => {
                    response.error = Some(
                        Error::Pattern {
                            pattern: pattern.clone(),
                            source,
                        }
                        .to_string(),
                    );
                    return response;
                }
            }
        }

        let index = TypeIndex::new(request.proto_file.iter());
        let message_graph = MessageGraph::new(request.proto_file.iter());
        let generate_known_types = env::var_os("GENERATE_KNOWN_TYPES").is_some();

        for file in &request.proto_file {
            if !request.file_to_generate.contains(&file.name) {
                continue;
            }
            if !generate_known_types && file.name.starts_with("google/protobuf/") {
                debug!("skipping well-known types file {:?}", file.name);
                continue;
            }
            if exclude.iter().any(|regex| regex.is_match(&file.name)) {
                debug!("skipping excluded file {:?}", file.name);
                continue;
            }

            match self.generate_file(&index, &message_graph, file) {
                Ok(content) => response.file.push(code_generator_response::File {
                    name: self.output_name(&file.name),
                    content,
                }),
                Err(error) => {
                    response.error = Some(error.to_string());
                    break;
                }
            }
        }

        response
    }

    fn generate_file(
        &mut self,
        index: &TypeIndex,
        message_graph: &MessageGraph,
        file: &FileDescriptorProto,
    ) -> Result<String, Error> {
        let ast = resolver::resolve_file(index, message_graph, file)?;

        // Plugins see the finished tree but cannot change it. In types-only
        // mode their blocks are dropped along with the codecs.
        let outputs: Vec<PluginOutput> = if self.types_only {
            Vec::new()
        } else {
            let mut plugins = std::mem::take(&mut self.plugins);
            let outputs = plugins
                .iter_mut()
                .map(|plugin| plugin.generate(&ast, self))
                .collect();
            self.plugins = plugins;
            outputs
        };

        let mut types = CodeGenerator::types(self, &ast);
        self.apply_format(&mut types);

        let mut codecs = if self.types_only {
            String::new()
        } else {
            CodeGenerator::codecs(self, &ast)
        };
        self.apply_format(&mut codecs);

        let mut content = format!(
            "// This file is @generated by protoc-gen-protoforge. Do not edit!\n// Source: {}\n\n",
            file.name
        );
        for output in &outputs {
            if !output.imports.is_empty() {
                content.push_str(&output.imports);
                if !output.imports.ends_with('\n') {
                    content.push('\n');
                }
            }
        }
        content.push_str(&types);
        for output in &outputs {
            if !output.services.is_empty() {
                content.push('\n');
                content.push_str(&output.services);
                if !output.services.ends_with('\n') {
                    content.push('\n');
                }
            }
        }
        if !codecs.is_empty() {
            content.push('\n');
            content.push_str(&codecs);
        }

        Ok(content)
    }

    /// Derives the response file name for an input path: relative to `root`,
    /// beneath `dest`, with `.proto` swapped for `.pb.rs`.
    fn output_name(&self, proto_name: &str) -> String {
        let relative = match &self.root {
            Some(root) => {
                let prefix = format!("{}/", root.trim_end_matches('/'));
                proto_name.strip_prefix(&prefix).unwrap_or(proto_name)
            }
            None => proto_name,
        };
        let stem = relative.strip_suffix(".proto").unwrap_or(relative);
        match &self.dest {
            Some(dest) => format!("{}/{}.pb.rs", dest.trim_end_matches('/'), stem),
            None => format!("{}.pb.rs", stem),
        }
    }

    #[cfg(feature = "format")]
    fn apply_format(&self, buf: &mut String) {
        if !self.format {
            return;
        }
        if let Ok(file) = syn::parse_file(buf) {
            *buf = prettyplease::unparse(&file);
        }
    }

    #[cfg(not(feature = "format"))]
    fn apply_format(&self, _buf: &mut String) {}
}

fn parse_bool(option: &str, value: &str) -> Result<bool, Error> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::Parameter {
            option: option.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use protoforge::Message;

    use super::*;
    use crate::descriptor::field_descriptor_proto::{Label, Type};
    use crate::descriptor::{
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
        MessageOptions, SourceCodeInfo,
    };

    fn shirt_file() -> FileDescriptorProto {
        FileDescriptorProto {
            name: "shirts.proto".to_string(),
            package: "demo".to_string(),
            message_type: vec![DescriptorProto {
                name: "Shirt".to_string(),
                field: vec![
                    FieldDescriptorProto {
                        name: "color".to_string(),
                        number: 1,
                        label: Label::Optional as i32,
                        r#type: Type::String as i32,
                        ..Default::default()
                    },
                    FieldDescriptorProto {
                        name: "size".to_string(),
                        number: 2,
                        label: Label::Optional as i32,
                        r#type: Type::Enum as i32,
                        type_name: ".demo.Shirt.Size".to_string(),
                        ..Default::default()
                    },
                    FieldDescriptorProto {
                        name: "sku_count".to_string(),
                        number: 3,
                        label: Label::Optional as i32,
                        r#type: Type::Int64 as i32,
                        ..Default::default()
                    },
                ],
                enum_type: vec![EnumDescriptorProto {
                    name: "Size".to_string(),
                    value: vec![
                        EnumValueDescriptorProto {
                            name: "SIZE_UNSPECIFIED".to_string(),
                            number: 0,
                        },
                        EnumValueDescriptorProto {
                            name: "SIZE_SMALL".to_string(),
                            number: 1,
                        },
                    ],
                }],
                ..Default::default()
            }],
            source_code_info: Some(SourceCodeInfo::default()),
            syntax: "proto3".to_string(),
            ..Default::default()
        }
    }

    fn shirt_request() -> CodeGeneratorRequest {
        CodeGeneratorRequest {
            file_to_generate: vec!["shirts.proto".to_string()],
            parameter: String::new(),
            proto_file: vec![shirt_file()],
        }
    }

    #[test]
    fn parameter_layering() {
        let mut config = Config::new();
        config
            .apply_parameter(
                "root=proto,dest=src/gen,exclude=^vendor/,exclude=_test\\.proto$,\
                 types_only=true,json.use_proto_field_name=true,\
                 json.emit_fields_with_default_values=true",
            )
            .unwrap();
        assert_eq!(config.root.as_deref(), Some("proto"));
        assert_eq!(config.dest.as_deref(), Some("src/gen"));
        assert_eq!(config.exclude, vec!["^vendor/", "_test\\.proto$"]);
        assert!(config.types_only);
        assert!(config.use_proto_field_name);
        assert!(config.emit_fields_with_default_values);
    }

    #[test]
    fn unknown_parameter_keys_are_ignored() {
        Config::new().apply_parameter("wat=1,types_only=false").unwrap();
    }

    #[test]
    fn invalid_parameter_value_is_an_error() {
        let error = Config::new()
            .apply_parameter("types_only=maybe")
            .unwrap_err();
        assert!(error.to_string().contains("types_only"));
    }

    #[test]
    fn output_names() {
        let mut config = Config::new();
        assert_eq!(config.output_name("a/b.proto"), "a/b.pb.rs");

        config.root("proto").dest("src/gen");
        assert_eq!(config.output_name("proto/a/b.proto"), "src/gen/a/b.pb.rs");
        assert_eq!(config.output_name("elsewhere.proto"), "src/gen/elsewhere.pb.rs");
    }

    #[test]
    fn generates_types_and_codecs() {
        let response = Config::new().run_plugin(shirt_request());

        assert_eq!(response.error, None);
        assert_eq!(
            response.supported_features,
            code_generator_response::FEATURE_PROTO3_OPTIONAL
        );
        assert_eq!(response.file.len(), 1);
        assert_eq!(response.file[0].name, "shirts.pb.rs");

        let content = &response.file[0].content;
        assert!(content.starts_with("// This file is @generated by protoc-gen-protoforge."));
        assert!(content.contains("// Source: shirts.proto"));
        assert!(content.contains("pub struct Shirt"));
        assert!(content.contains("pub mod shirt"));
        assert!(content.contains("pub enum Size"));
        assert!(content.contains("SIZE_UNSPECIFIED"));
        assert!(content.contains("impl ::protoforge::Message for Shirt"));
        assert!(content.contains("impl ::protoforge::JsonMessage for Shirt"));
        // Enum fields are open; 64-bit integers travel as decimal strings.
        assert!(content.contains("::protoforge::OpenEnum<shirt::Size>"));
        assert!(content.contains("::protoforge::json::int64"));
        // The compiler left json_name empty, so the walker derives it.
        assert!(content.contains("\"skuCount\""));
    }

    #[test]
    fn emitted_bytes_are_deterministic() {
        let first = Config::new().run_plugin(shirt_request());
        let second = Config::new().run_plugin(shirt_request());
        assert_eq!(first, second);
    }

    #[test]
    fn types_only_omits_codecs() {
        let mut request = shirt_request();
        request.parameter = "types_only=true".to_string();
        let response = Config::new().run_plugin(request);

        let content = &response.file[0].content;
        assert!(content.contains("pub struct Shirt"));
        assert!(!content.contains("impl ::protoforge::Message"));
        assert!(!content.contains("impl ::protoforge::JsonMessage"));
    }

    #[test]
    fn proto_field_names_in_json_keys() {
        let mut request = shirt_request();
        request.parameter = "json.use_proto_field_name=true".to_string();
        let response = Config::new().run_plugin(request);

        let content = &response.file[0].content;
        assert!(content.contains("\"sku_count\".to_string()"));
        assert!(!content.contains("\"skuCount\".to_string()"));
    }

    #[test]
    fn well_known_types_are_skipped() {
        let mut timestamp = shirt_file();
        timestamp.name = "google/protobuf/timestamp.proto".to_string();
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["google/protobuf/timestamp.proto".to_string()],
            parameter: String::new(),
            proto_file: vec![timestamp],
        };

        let response = Config::new().run_plugin(request);
        assert_eq!(response.error, None);
        assert!(response.file.is_empty());
    }

    #[test]
    fn excluded_files_are_skipped() {
        let mut request = shirt_request();
        request.parameter = "exclude=^shirts".to_string();
        let response = Config::new().run_plugin(request);
        assert_eq!(response.error, None);
        assert!(response.file.is_empty());
    }

    #[test]
    fn invalid_exclude_pattern_is_reported() {
        let mut request = shirt_request();
        request.parameter = "exclude=(".to_string();
        let response = Config::new().run_plugin(request);
        assert!(response.error.unwrap().contains("invalid exclude pattern"));
        assert!(response.file.is_empty());
    }

    #[test]
    fn resolution_errors_reach_the_response() {
        let mut file = shirt_file();
        file.message_type[0].enum_type[0].value.remove(0);
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["shirts.proto".to_string()],
            parameter: String::new(),
            proto_file: vec![file],
        };

        let response = Config::new().run_plugin(request);
        let error = response.error.unwrap();
        assert!(error.contains("no enumerator with number zero"), "{}", error);
        assert!(response.file.is_empty());
    }

    #[test]
    fn dependencies_are_indexed_but_not_generated() {
        let mut other = shirt_file();
        other.name = "other.proto".to_string();
        other.package = "demo.other".to_string();

        let mut request = shirt_request();
        request.proto_file.push(other);

        let response = Config::new().run_plugin(request);
        assert_eq!(response.error, None);
        assert_eq!(response.file.len(), 1);
        assert_eq!(response.file[0].name, "shirts.pb.rs");
    }

    struct BannerPlugin;

    impl Plugin for BannerPlugin {
        fn generate(&mut self, file: &ast::FileAst, _config: &Config) -> PluginOutput {
            PluginOutput {
                imports: format!("// extras for {}\n", file.name),
                services: "pub struct ShirtService {}\n".to_string(),
            }
        }
    }

    #[test]
    fn plugins_contribute_verbatim_blocks() {
        let mut config = Config::new();
        config.plugin(Box::new(BannerPlugin));
        let response = config.run_plugin(shirt_request());

        let content = &response.file[0].content;
        assert!(content.contains("// extras for shirts.proto"));
        assert!(content.contains("pub struct ShirtService {}"));
        // Services land between the declarations and the codecs.
        let services = content.find("ShirtService").unwrap();
        let codecs = content.find("impl ::protoforge::Message").unwrap();
        assert!(services < codecs);
    }

    #[test]
    fn request_survives_the_wire() {
        let request = shirt_request();
        let encoded = request.encode_to_vec();
        let decoded = CodeGeneratorRequest::decode(encoded.as_slice()).unwrap();
        assert_eq!(decoded, request);

        let response = Config::new().run_plugin(decoded);
        let encoded = response.encode_to_vec();
        assert_eq!(
            CodeGeneratorResponse::decode(encoded.as_slice()).unwrap(),
            response
        );
    }
}
