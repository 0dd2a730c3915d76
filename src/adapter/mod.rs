//! Defines the capability contract the engine requires from a host syntax tree.

/// The value a key-path segment (or a whole dotted path) resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<N> {
    /// A single child node.
    Node(N),
    /// An ordered sequence of nodes, e.g. a statement list.
    Nodes(Vec<N>),
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
    /// The path fell off the tree; rendered as the `undefined` sentinel.
    Absent,
}

/// Errors raised by adapter capabilities propagate unchanged to the caller.
pub type AdapterError = Box<dyn std::error::Error + Send + Sync>;

/// The universal contract for a node in a read-only syntax tree.
///
/// The engine is written exclusively against this trait, so one compiled query
/// can run over any tree representation (a compiler AST, a CSS object model, a
/// JSON document) whose nodes implement it. A node is a cheap copyable handle;
/// navigation state lives in the tree it borrows from.
///
/// `'a` is the lifetime of the underlying tree.
pub trait AstNode<'a>: std::fmt::Debug + Clone + Copy + PartialEq {
    /// The canonical type tag of the node (e.g. `IfStatement`).
    fn type_name(&self) -> &'a str;

    /// An iterator over the child nodes, in source order.
    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The parent node. Returns `None` for the root. Required for the sibling
    /// relationships.
    fn parent(&self) -> Option<Self>;

    /// Resolves one key-path segment against this node: a same-named field if
    /// the node exposes one, else a same-named zero-argument capability if one
    /// exists, else `None`.
    fn resolve(&self, segment: &str) -> Result<Option<Resolved<Self>>, AdapterError>;

    /// The exact original-source substring covered by this node.
    fn source_text(&self) -> String;
}

// Test utilities - publicly available for integration testing in downstream crates
pub mod tests {
    use super::*;
    use std::collections::HashMap;

    /// One field value exposed by a mock node's reflective lookup.
    #[derive(Debug, Clone)]
    pub enum MockField {
        Node(usize),
        Nodes(Vec<usize>),
        Text(String),
        Number(f64),
        Bool(bool),
        Null,
    }

    #[derive(Debug)]
    struct MockNodeData {
        type_name: String,
        source: String,
        children: Vec<usize>,
        fields: HashMap<String, MockField>,
    }

    /// An arena-backed mock syntax tree.
    #[derive(Debug, Default)]
    pub struct MockTree {
        nodes: Vec<MockNodeData>,
        parents: HashMap<usize, usize>,
    }

    impl MockTree {
        pub fn new() -> Self {
            Self::default()
        }

        /// Adds a node, linking it under `parent` in insertion order, and
        /// returns its id.
        pub fn add_node(&mut self, parent: Option<usize>, type_name: &str, source: &str) -> usize {
            let id = self.nodes.len();
            self.nodes.push(MockNodeData {
                type_name: type_name.to_string(),
                source: source.to_string(),
                children: Vec::new(),
                fields: HashMap::new(),
            });
            if let Some(parent) = parent {
                self.nodes[parent].children.push(id);
                self.parents.insert(id, parent);
            }
            id
        }

        pub fn set_field(&mut self, id: usize, name: &str, field: MockField) {
            self.nodes[id].fields.insert(name.to_string(), field);
        }

        pub fn node(&self, id: usize) -> MockNode<'_> {
            MockNode { id, tree: self }
        }
    }

    /// A copyable handle into a [`MockTree`].
    #[derive(Debug, Clone, Copy)]
    pub struct MockNode<'a> {
        pub id: usize,
        pub tree: &'a MockTree,
    }

    impl PartialEq for MockNode<'_> {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    impl<'a> AstNode<'a> for MockNode<'a> {
        fn type_name(&self) -> &'a str {
            self.tree.nodes[self.id].type_name.as_str()
        }

        fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree; // Re-borrow to help the lifetime checker
            let child_ids = tree.nodes[self.id].children.clone();
            Box::new(child_ids.into_iter().map(move |id| MockNode { id, tree }))
        }

        fn parent(&self) -> Option<Self> {
            self.tree.parents.get(&self.id).map(|&id| MockNode {
                id,
                tree: self.tree,
            })
        }

        fn resolve(&self, segment: &str) -> Result<Option<Resolved<Self>>, AdapterError> {
            let tree = self.tree;
            let data = &tree.nodes[self.id];
            if let Some(field) = data.fields.get(segment) {
                let resolved = match field {
                    MockField::Node(id) => Resolved::Node(MockNode { id: *id, tree }),
                    MockField::Nodes(ids) => {
                        Resolved::Nodes(ids.iter().map(|&id| MockNode { id, tree }).collect())
                    }
                    MockField::Text(s) => Resolved::Text(s.clone()),
                    MockField::Number(n) => Resolved::Number(*n),
                    MockField::Bool(b) => Resolved::Bool(*b),
                    MockField::Null => Resolved::Null,
                };
                return Ok(Some(resolved));
            }
            // Zero-argument capabilities, looked up only when no field shadows them.
            match segment {
                "child_count" => Ok(Some(Resolved::Number(data.children.len() as f64))),
                _ => Ok(None),
            }
        }

        fn source_text(&self) -> String {
            self.tree.nodes[self.id].source.clone()
        }
    }

    /// Builds the shared fixture tree for this source program:
    ///
    /// ```text
    /// if (flag) { }          // 1 IfStatement, 2 Identifier, 3 Block (empty)
    /// foo("hello")           // 4 CallExpression, 5 Identifier, 6 StringLiteral
    /// bar(10)                // 7 CallExpression, 8 Identifier, 9 NumberLiteral
    /// if (done) { baz() }    // 10 IfStatement, 11 Identifier, 12 Block,
    ///                        //   13 CallExpression, 14 Identifier
    /// x = x                  // 15 AssignmentExpression, 16 + 17 Identifier
    /// ```
    ///
    /// Node 0 is the enclosing `Program`.
    pub fn create_test_tree() -> MockTree {
        let mut tree = MockTree::new();
        let program = tree.add_node(
            None,
            "Program",
            "if (flag) { }\nfoo(\"hello\")\nbar(10)\nif (done) { baz() }\nx = x",
        );

        let if1 = tree.add_node(Some(program), "IfStatement", "if (flag) { }");
        let flag = tree.add_node(Some(if1), "Identifier", "flag");
        tree.set_field(flag, "name", MockField::Text("flag".to_string()));
        let empty_block = tree.add_node(Some(if1), "Block", "{ }");
        tree.set_field(empty_block, "statements", MockField::Nodes(vec![]));
        tree.set_field(if1, "condition", MockField::Node(flag));
        tree.set_field(if1, "body", MockField::Node(empty_block));

        let call_foo = tree.add_node(Some(program), "CallExpression", "foo(\"hello\")");
        let foo = tree.add_node(Some(call_foo), "Identifier", "foo");
        tree.set_field(foo, "name", MockField::Text("foo".to_string()));
        let hello = tree.add_node(Some(call_foo), "StringLiteral", "\"hello\"");
        tree.set_field(hello, "value", MockField::Text("hello".to_string()));
        tree.set_field(call_foo, "callee", MockField::Node(foo));
        tree.set_field(call_foo, "arguments", MockField::Nodes(vec![hello]));

        let call_bar = tree.add_node(Some(program), "CallExpression", "bar(10)");
        let bar = tree.add_node(Some(call_bar), "Identifier", "bar");
        tree.set_field(bar, "name", MockField::Text("bar".to_string()));
        let ten = tree.add_node(Some(call_bar), "NumberLiteral", "10");
        tree.set_field(ten, "value", MockField::Number(10.0));
        tree.set_field(call_bar, "callee", MockField::Node(bar));
        tree.set_field(call_bar, "arguments", MockField::Nodes(vec![ten]));

        let if2 = tree.add_node(Some(program), "IfStatement", "if (done) { baz() }");
        let done = tree.add_node(Some(if2), "Identifier", "done");
        tree.set_field(done, "name", MockField::Text("done".to_string()));
        let baz_block = tree.add_node(Some(if2), "Block", "{ baz() }");
        let call_baz = tree.add_node(Some(baz_block), "CallExpression", "baz()");
        let baz = tree.add_node(Some(call_baz), "Identifier", "baz");
        tree.set_field(baz, "name", MockField::Text("baz".to_string()));
        tree.set_field(call_baz, "callee", MockField::Node(baz));
        tree.set_field(call_baz, "arguments", MockField::Nodes(vec![]));
        tree.set_field(baz_block, "statements", MockField::Nodes(vec![call_baz]));
        tree.set_field(if2, "condition", MockField::Node(done));
        tree.set_field(if2, "body", MockField::Node(baz_block));

        let assign = tree.add_node(Some(program), "AssignmentExpression", "x = x");
        let left = tree.add_node(Some(assign), "Identifier", "x");
        tree.set_field(left, "name", MockField::Text("x".to_string()));
        let right = tree.add_node(Some(assign), "Identifier", "x");
        tree.set_field(right, "name", MockField::Text("x".to_string()));
        tree.set_field(assign, "left", MockField::Node(left));
        tree.set_field(assign, "right", MockField::Node(right));
        tree.set_field(assign, "operator", MockField::Text("=".to_string()));

        tree.set_field(
            program,
            "statements",
            MockField::Nodes(vec![if1, call_foo, call_bar, if2, assign]),
        );

        tree
    }
}
