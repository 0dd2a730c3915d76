//! Queries evaluated over a `serde_json` document, exercising the adapter
//! contract on a tree representation the engine knows nothing about.

use astq::{AdapterError, AstNode, Resolved, parse_query, query_nodes};
use serde_json::Value as Json;
use std::collections::HashMap;

/// An ESTree-style JSON document indexed into an arena: every JSON object
/// carrying a string `"type"` field is a node; object fields holding nodes
/// (or arrays of nodes) become its children.
#[derive(Debug)]
struct JsonTree {
    nodes: Vec<JsonNodeData>,
}

#[derive(Debug)]
struct JsonNodeData {
    value: Json,
    parent: Option<usize>,
    children: Vec<usize>,
    node_fields: HashMap<String, NodeField>,
}

#[derive(Debug)]
enum NodeField {
    One(usize),
    Many(Vec<usize>),
}

fn is_node(value: &Json) -> bool {
    value
        .as_object()
        .is_some_and(|object| object.get("type").is_some_and(Json::is_string))
}

impl JsonTree {
    fn build(root: &Json) -> Self {
        let mut tree = JsonTree { nodes: Vec::new() };
        tree.index(root, None);
        tree
    }

    fn index(&mut self, value: &Json, parent: Option<usize>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(JsonNodeData {
            value: value.clone(),
            parent,
            children: Vec::new(),
            node_fields: HashMap::new(),
        });
        if let Some(object) = value.as_object() {
            for (field, child) in object {
                if is_node(child) {
                    let child_id = self.index(child, Some(id));
                    self.nodes[id].children.push(child_id);
                    self.nodes[id]
                        .node_fields
                        .insert(field.clone(), NodeField::One(child_id));
                } else if let Some(items) = child.as_array() {
                    if items.iter().all(is_node) {
                        let mut ids = Vec::new();
                        for item in items {
                            let child_id = self.index(item, Some(id));
                            self.nodes[id].children.push(child_id);
                            ids.push(child_id);
                        }
                        self.nodes[id]
                            .node_fields
                            .insert(field.clone(), NodeField::Many(ids));
                    }
                }
            }
        }
        id
    }

    fn root(&self) -> JsonNode<'_> {
        JsonNode { id: 0, tree: self }
    }
}

#[derive(Debug, Clone, Copy)]
struct JsonNode<'a> {
    id: usize,
    tree: &'a JsonTree,
}

impl PartialEq for JsonNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<'a> AstNode<'a> for JsonNode<'a> {
    fn type_name(&self) -> &'a str {
        let tree = self.tree;
        tree.nodes[self.id].value["type"].as_str().unwrap_or("")
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let tree = self.tree;
        let child_ids = tree.nodes[self.id].children.clone();
        Box::new(child_ids.into_iter().map(move |id| JsonNode { id, tree }))
    }

    fn parent(&self) -> Option<Self> {
        self.tree.nodes[self.id].parent.map(|id| JsonNode {
            id,
            tree: self.tree,
        })
    }

    fn resolve(&self, segment: &str) -> Result<Option<Resolved<Self>>, AdapterError> {
        let tree = self.tree;
        let data = &tree.nodes[self.id];
        if let Some(field) = data.node_fields.get(segment) {
            return Ok(Some(match field {
                NodeField::One(id) => Resolved::Node(JsonNode { id: *id, tree }),
                NodeField::Many(ids) => {
                    Resolved::Nodes(ids.iter().map(|&id| JsonNode { id, tree }).collect())
                }
            }));
        }
        match data.value.get(segment) {
            Some(Json::String(s)) => Ok(Some(Resolved::Text(s.clone()))),
            Some(Json::Number(n)) => Ok(Some(Resolved::Number(n.as_f64().unwrap_or(f64::NAN)))),
            Some(Json::Bool(b)) => Ok(Some(Resolved::Bool(*b))),
            Some(Json::Null) => Ok(Some(Resolved::Null)),
            Some(_) | None => Ok(None),
        }
    }

    fn source_text(&self) -> String {
        let data = &self.tree.nodes[self.id];
        // JSON carries no source text; identifier-like nodes render their
        // name, literal nodes their value.
        if let Some(name) = data.value.get("name").and_then(Json::as_str) {
            return name.to_string();
        }
        if let Some(value) = data.value.get("value") {
            return match value {
                Json::String(s) => format!("\"{}\"", s),
                other => other.to_string(),
            };
        }
        data.value.to_string()
    }
}

fn program() -> Json {
    serde_json::json!({
        "type": "Program",
        "body": [
            {
                "type": "IfStatement",
                "test": { "type": "Identifier", "name": "ready" },
                "consequent": { "type": "BlockStatement", "body": [] }
            },
            {
                "type": "ExpressionStatement",
                "expression": {
                    "type": "CallExpression",
                    "callee": { "type": "Identifier", "name": "log" },
                    "arguments": [
                        { "type": "Literal", "value": "starting", "raw": "\"starting\"" }
                    ]
                }
            },
            {
                "type": "ExpressionStatement",
                "expression": {
                    "type": "CallExpression",
                    "callee": { "type": "Identifier", "name": "run" },
                    "arguments": [
                        { "type": "Literal", "value": 3, "raw": "3" }
                    ]
                }
            }
        ]
    })
}

fn callee_name(node: JsonNode<'_>) -> String {
    let Ok(Some(Resolved::Node(callee))) = node.resolve("callee") else {
        panic!("Expected a callee node");
    };
    match callee.resolve("name") {
        Ok(Some(Resolved::Text(name))) => name,
        other => panic!("Expected a name, got {:?}", other),
    }
}

#[test]
fn test_type_selection_over_json() {
    let json = program();
    let tree = JsonTree::build(&json);
    let expr = parse_query(".CallExpression").unwrap();
    let matches = query_nodes(&expr, tree.root()).unwrap();
    assert_eq!(matches.len(), 2);
    // Sibling order inside the body array is preserved.
    assert_eq!(callee_name(matches[0]), "log");
    assert_eq!(callee_name(matches[1]), "run");
}

#[test]
fn test_attribute_path_over_json() {
    let json = program();
    let tree = JsonTree::build(&json);

    let expr = parse_query(".CallExpression[callee.name=\"log\"]").unwrap();
    let matches = query_nodes(&expr, tree.root()).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(callee_name(matches[0]), "log");

    let expr = parse_query(".BlockStatement[body.length=0]").unwrap();
    assert_eq!(query_nodes(&expr, tree.root()).unwrap().len(), 1);
}

#[test]
fn test_numeric_and_string_literals_over_json() {
    let json = program();
    let tree = JsonTree::build(&json);

    let expr = parse_query(".Literal[value=3]").unwrap();
    assert_eq!(query_nodes(&expr, tree.root()).unwrap().len(), 1);

    let expr = parse_query(".Literal[value>2]").unwrap();
    assert_eq!(query_nodes(&expr, tree.root()).unwrap().len(), 1);

    let expr = parse_query(".Literal[value=\"starting\"]").unwrap();
    assert_eq!(query_nodes(&expr, tree.root()).unwrap().len(), 1);

    let expr = parse_query(".Literal[raw=\"3\"]").unwrap();
    assert_eq!(query_nodes(&expr, tree.root()).unwrap().len(), 1);
}

#[test]
fn test_sibling_relationship_over_json() {
    let json = program();
    let tree = JsonTree::build(&json);

    let expr = parse_query(".IfStatement + .ExpressionStatement").unwrap();
    let matches = query_nodes(&expr, tree.root()).unwrap();
    assert_eq!(matches.len(), 1);

    let expr = parse_query(".IfStatement ~ .ExpressionStatement").unwrap();
    let matches = query_nodes(&expr, tree.root()).unwrap();
    assert_eq!(matches.len(), 2);
}

#[test]
fn test_nested_selector_over_json() {
    let json = program();
    let tree = JsonTree::build(&json);
    let expr = parse_query(".IfStatement[test=.Identifier[name=\"ready\"]]").unwrap();
    assert_eq!(query_nodes(&expr, tree.root()).unwrap().len(), 1);
}
