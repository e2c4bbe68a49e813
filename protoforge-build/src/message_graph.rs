use std::collections::HashMap;

use petgraph::algo::has_path_connecting;
use petgraph::graph::NodeIndex;
use petgraph::Graph;

use crate::descriptor::field_descriptor_proto::{Label, Type};
use crate::descriptor::{DescriptorProto, FileDescriptorProto};

/// `MessageGraph` builds a graph of messages whose edges correspond to
/// containment through singular message fields. Its purpose is recognizing
/// recursively (and co-recursively) nested messages, whose generated fields
/// must be boxed to give the cycle a finite size. Repeated fields already
/// live behind a `Vec`, so they need no edge.
pub struct MessageGraph {
    index: HashMap<String, NodeIndex>,
    graph: Graph<String, ()>,
}

impl MessageGraph {
    pub fn new<'a>(files: impl Iterator<Item = &'a FileDescriptorProto>) -> MessageGraph {
        let mut msg_graph = MessageGraph {
            index: HashMap::new(),
            graph: Graph::new(),
        };

        for file in files {
            let package = if file.package.is_empty() {
                String::new()
            } else {
                format!(".{}", file.package)
            };
            for msg in &file.message_type {
                msg_graph.add_message(&package, msg);
            }
        }

        msg_graph
    }

    fn get_or_insert_index(&mut self, msg_name: String) -> NodeIndex {
        let MessageGraph {
            ref mut index,
            ref mut graph,
        } = *self;
        *index
            .entry(msg_name.clone())
            .or_insert_with(|| graph.add_node(msg_name))
    }

    fn add_message(&mut self, prefix: &str, msg: &DescriptorProto) {
        let msg_name = format!("{}.{}", prefix, msg.name);
        let msg_index = self.get_or_insert_index(msg_name.clone());

        for field in &msg.field {
            if matches!(Type::try_from(field.r#type), Ok(Type::Message))
                && !matches!(Label::try_from(field.label), Ok(Label::Repeated))
            {
                let field_index = self.get_or_insert_index(field.type_name.clone());
                self.graph.add_edge(msg_index, field_index, ());
            }
        }

        for nested in &msg.nested_type {
            self.add_message(&msg_name, nested);
        }
    }

    /// Returns true if there is a containment path from `outer` back to
    /// `inner`, i.e. a singular field of type `outer` inside `inner` closes a
    /// cycle and must be boxed.
    pub fn is_nested(&self, outer: &str, inner: &str) -> bool {
        let outer = match self.index.get(outer) {
            Some(outer) => *outer,
            None => return false,
        };
        let inner = match self.index.get(inner) {
            Some(inner) => *inner,
            None => return false,
        };

        has_path_connecting(&self.graph, outer, inner, None)
    }
}
