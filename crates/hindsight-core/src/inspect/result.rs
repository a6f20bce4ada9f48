//! # Inspection Results
//!
//! [`ResultNode`] is the structured form of a decoded object. It serializes
//! to JSON for programmatic callers and renders to the familiar one-line or
//! multi-line text through [`std::fmt::Display`]. Text is always produced
//! from a node, so the two forms cannot disagree.

use std::fmt::{self, Write as _};

use serde::Serialize;

use super::page::Page;
use crate::types::Address;

/// A decoded value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultNode
{
    /// Human-readable kind ("Object", "Smi", "Unknown", ...).
    pub name: String,
    /// The tagged pointer (or raw word for small integers).
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_address: Option<Address>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl ResultNode
{
    /// A node named after its kind.
    #[must_use]
    pub fn new(address: Address, kind: NodeKind) -> Self
    {
        Self {
            name: kind.label().to_string(),
            address,
            map_address: None,
            kind,
        }
    }

    #[must_use]
    pub fn with_map(mut self, map: Option<Address>) -> Self
    {
        self.map_address = map;
        self
    }

    /// Text form as printed for a nested value (address prefix included).
    #[must_use]
    pub fn render_nested(&self) -> String
    {
        let mut out = String::new();
        self.render(&mut out, false);
        out
    }

    fn render(&self, out: &mut String, top: bool)
    {
        match (self.map_address, &self.kind) {
            (_, NodeKind::SmallInt { .. }) => {}
            (Some(map), _) => {
                let _ = write!(out, "{}(map={}):", self.address, map);
            }
            (None, _) if !top => {
                let _ = write!(out, "{}:", self.address);
            }
            (None, _) => {}
        }
        self.kind.render(out);
    }
}

impl fmt::Display for ResultNode
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let mut out = String::new();
        self.render(&mut out, true);
        f.write_str(&out)
    }
}

/// Kind-specific payload of a [`ResultNode`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum NodeKind
{
    SmallInt
    {
        value: String,
    },
    Number
    {
        value: f64,
        /// `%f` at top level, two decimals when nested.
        text: String,
    },
    String(StringNode),
    PlainObject(ObjectNode),
    Error
    {
        #[serde(flatten)]
        object: ObjectNode,
        #[serde(skip_serializing_if = "Option::is_none")]
        stack: Option<Vec<String>>,
    },
    Array
    {
        length: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        elements: Option<Page<Element>>,
    },
    FixedArray
    {
        length: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        elements: Option<Page<Element>>,
    },
    Function(FunctionNode),
    SharedFunctionInfo
    {
        function_name: String,
        location: String,
    },
    Script
    {
        script_name: String,
        line_offset: i64,
        source_length: usize,
    },
    Oddball
    {
        value: String,
    },
    RegExp
    {
        source: String,
        #[serde(flatten)]
        object: Option<ObjectNode>,
    },
    Date
    {
        value: String,
    },
    ArrayBuffer(BufferNode),
    ArrayBufferView(BufferNode),
    Context(ContextNode),
    Map(MapNode),
    DescriptorArray
    {
        length: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        entries: Option<Page<Property>>,
    },
    NameDictionary
    {
        capacity: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        entries: Option<Page<Property>>,
    },
    ScopeInfo(ScopeInfoNode),
    Symbol
    {
        description: String,
    },
    Code,
    Global,
    GlobalProxy,
    Unknown
    {
        type_id: i64,
    },
}

impl NodeKind
{
    /// Display name of the kind.
    #[must_use]
    pub fn label(&self) -> &'static str
    {
        match self {
            NodeKind::SmallInt { .. } => "Smi",
            NodeKind::Number { .. } => "Number",
            NodeKind::String(_) => "String",
            NodeKind::PlainObject(_) => "Object",
            NodeKind::Error { .. } => "Error",
            NodeKind::Array { .. } => "Array",
            NodeKind::FixedArray { .. } => "FixedArray",
            NodeKind::Function(_) => "Function",
            NodeKind::SharedFunctionInfo { .. } => "SharedFunctionInfo",
            NodeKind::Script { .. } => "Script",
            NodeKind::Oddball { .. } => "Oddball",
            NodeKind::RegExp { .. } => "RegExp",
            NodeKind::Date { .. } => "Date",
            NodeKind::ArrayBuffer(_) => "ArrayBuffer",
            NodeKind::ArrayBufferView(_) => "ArrayBufferView",
            NodeKind::Context(_) => "Context",
            NodeKind::Map(_) => "Map",
            NodeKind::DescriptorArray { .. } => "DescriptorArray",
            NodeKind::NameDictionary { .. } => "NameDictionary",
            NodeKind::ScopeInfo(_) => "ScopeInfo",
            NodeKind::Symbol { .. } => "Symbol",
            NodeKind::Code => "Code",
            NodeKind::Global => "Global",
            NodeKind::GlobalProxy => "GlobalProxy",
            NodeKind::Unknown { .. } => "Unknown",
        }
    }

    fn render(&self, out: &mut String)
    {
        match self {
            NodeKind::SmallInt { value } => {
                let _ = write!(out, "<Smi: {value}>");
            }
            NodeKind::Number { text, .. } => {
                let _ = write!(out, "<Number: {text}>");
            }
            NodeKind::String(string) => {
                let _ = write!(out, "<String: \"{}\">", string.value);
            }
            NodeKind::PlainObject(object) => {
                let _ = write!(out, "<Object: {}", object.constructor_label());
                object.render_sections(out);
                out.push('>');
            }
            NodeKind::Error { object, stack } => {
                let _ = write!(out, "<Error: {}", object.constructor_label());
                object.render_sections(out);
                if let Some(frames) = stack {
                    out.push_str("\n  error stack {");
                    for frame in frames {
                        let _ = write!(out, "\n    {frame}");
                    }
                    out.push_str("\n  }");
                }
                out.push('>');
            }
            NodeKind::Array { length, elements } => {
                let _ = write!(out, "<Array: length={length}");
                if let Some(page) = elements {
                    render_elements(out, page);
                }
                out.push('>');
            }
            NodeKind::FixedArray { length, elements } => {
                let _ = write!(out, "<FixedArray, len={length}");
                if let Some(page) = elements {
                    out.push_str(" contents=");
                    render_elements(out, page);
                }
                out.push('>');
            }
            NodeKind::Function(function) => function.render(out),
            NodeKind::SharedFunctionInfo {
                function_name,
                location,
            } => {
                let _ = write!(out, "<SharedFunctionInfo: {function_name} at {location}>");
            }
            NodeKind::Script {
                script_name,
                line_offset,
                source_length,
            } => {
                let _ = write!(
                    out,
                    "<Script: {script_name}, line_offset={line_offset}, source_length={source_length}>"
                );
            }
            NodeKind::Oddball { value } => {
                let _ = write!(out, "<{value}>");
            }
            NodeKind::RegExp { source, object } => {
                let _ = write!(out, "<JSRegExp source=/{source}/");
                if let Some(object) = object {
                    object.render_sections(out);
                }
                out.push('>');
            }
            NodeKind::Date { value } => {
                let _ = write!(out, "<JSDate: {value}>");
            }
            NodeKind::ArrayBuffer(buffer) => buffer.render(out, "ArrayBuffer"),
            NodeKind::ArrayBufferView(buffer) => buffer.render(out, "ArrayBufferView"),
            NodeKind::Context(context) => context.render(out),
            NodeKind::Map(map) => map.render(out),
            NodeKind::DescriptorArray { length, entries } => {
                let _ = write!(out, "<DescriptorArray, len={length}");
                if let Some(page) = entries {
                    render_properties(out, " entries", page);
                }
                out.push('>');
            }
            NodeKind::NameDictionary { capacity, entries } => {
                let _ = write!(out, "<NameDictionary, capacity={capacity}");
                if let Some(page) = entries {
                    render_properties(out, " entries", page);
                }
                out.push('>');
            }
            NodeKind::ScopeInfo(scope) => scope.render(out),
            NodeKind::Symbol { description } => {
                let _ = write!(out, "<Symbol: {description}>");
            }
            NodeKind::Code => out.push_str("<Code>"),
            NodeKind::Global => out.push_str("<Global>"),
            NodeKind::GlobalProxy => out.push_str("<Global proxy>"),
            NodeKind::Unknown { type_id } => {
                let _ = write!(out, "<Unknown: instance type {type_id}>");
            }
        }
    }
}

fn render_more<T>(out: &mut String, page: &Page<T>)
{
    if page.has_more {
        let _ = write!(out, "\n    ... ({} more)", page.remaining_count);
    }
}

fn render_elements(out: &mut String, page: &Page<Element>)
{
    out.push_str(" {");
    for element in &page.items {
        let _ = write!(out, "\n    [{}]=", element.index);
        match &element.value {
            Some(value) => out.push_str(&value.render_nested()),
            None => out.push_str("<hole>"),
        }
        out.push(',');
    }
    render_more(out, page);
    out.push_str("\n  }");
}

fn render_properties(out: &mut String, title: &str, page: &Page<Property>)
{
    let _ = write!(out, "{title} {{");
    for property in &page.items {
        let _ = write!(out, "\n    .{}=", property.key);
        property.value.render(out);
        out.push(',');
    }
    render_more(out, page);
    out.push_str("\n  }");
}

/// A string, possibly windowed or truncated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringNode
{
    /// The displayed text (with a trailing `...` when cut short).
    pub value: String,
    /// Length in bytes of the whole UTF-8 text.
    pub length: usize,
    /// Cursor for the next window, when paginated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<usize>,
    pub has_more: bool,
}

/// Element slot of an array-like collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element
{
    pub index: usize,
    /// `None` for a hole.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Box<ResultNode>>,
}

/// A named property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property
{
    pub key: String,
    pub value: PropertyValue,
}

/// Value of a property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue
{
    /// A decoded tagged value.
    Node(Box<ResultNode>),
    /// An unboxed double field.
    Double
    {
        double: f64,
    },
    /// A field slot, as listed by a descriptor array on its own.
    Field
    {
        field_index: i64,
    },
    /// A descriptor kind that is not decoded (accessor pairs and the like).
    Unsupported
    {
        details: i64,
    },
}

impl PropertyValue
{
    fn render(&self, out: &mut String)
    {
        match self {
            PropertyValue::Node(node) => out.push_str(&node.render_nested()),
            PropertyValue::Double { double } => {
                let _ = write!(out, "<Double: {double:.6}>");
            }
            PropertyValue::Field { field_index } => {
                let _ = write!(out, "<field {field_index}>");
            }
            PropertyValue::Unsupported { .. } => out.push_str("<unknown field type>"),
        }
    }
}

/// The common body of JS objects, errors and regexps.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObjectNode
{
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constructor: Option<String>,
    pub elements_length: usize,
    pub properties_length: usize,
    pub fields_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements: Option<Page<Element>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Page<Property>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_fields: Option<Page<Address>>,
    /// Cursor across all three domains.
    pub next: usize,
    pub has_more: bool,
}

impl ObjectNode
{
    fn constructor_label(&self) -> &str
    {
        self.constructor.as_deref().unwrap_or("no constructor")
    }

    fn render_sections(&self, out: &mut String)
    {
        if let Some(page) = &self.elements {
            out.push_str(" elements");
            render_elements(out, page);
        }
        if let Some(page) = &self.properties {
            render_properties(out, " properties", page);
        }
        if let Some(page) = &self.internal_fields {
            out.push_str("\n  internal fields {");
            for field in &page.items {
                let _ = write!(out, "\n    {field},");
            }
            render_more(out, page);
            out.push_str("\n  }");
        }
    }
}

/// A JS function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionNode
{
    pub function_name: String,
    /// `script:line:column`, or `[native code]`.
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Box<ResultNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl FunctionNode
{
    fn render(&self, out: &mut String)
    {
        let _ = write!(out, "<function: {} at {}", self.function_name, self.location);
        if let Some(context) = &self.context {
            let _ = write!(out, "\n  context={}", context.render_nested());
        }
        if let Some(source) = &self.source {
            let _ = write!(out, "\n  source:\n{source}");
        }
        out.push('>');
    }
}

/// A buffer or a view onto one.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BufferNode
{
    pub neutered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backing_store: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_length: Option<usize>,
    /// Hex bytes of the requested window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Page<String>>,
}

impl BufferNode
{
    fn render(&self, out: &mut String, label: &str)
    {
        if self.neutered {
            let _ = write!(out, "<{label} [neutered]>");
            return;
        }
        let _ = write!(out, "<{label}:");
        if let Some(store) = self.backing_store {
            let _ = write!(out, " backingStore={store}");
        }
        if let Some(offset) = self.byte_offset {
            let _ = write!(out, ", byteOffset={offset}");
        }
        if let Some(length) = self.byte_length {
            let _ = write!(out, ", byteLength={length}");
        }
        if let Some(page) = &self.bytes {
            let _ = write!(out, ": [\n  {}", page.items.join(", "));
            if page.has_more {
                out.push_str(" ...");
            }
            out.push_str("\n]");
        }
        out.push('>');
    }
}

/// A function or block context.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ContextNode
{
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closure: Option<Box<ResultNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_info: Option<Box<ResultNode>>,
    pub locals: Vec<Property>,
}

impl ContextNode
{
    fn render(&self, out: &mut String)
    {
        out.push_str("<Context");
        if self.previous.is_none() && self.closure.is_none() && self.scope_info.is_none() && self.locals.is_empty() {
            out.push('>');
            return;
        }
        out.push_str(": {");
        if let Some(previous) = self.previous {
            let _ = write!(out, "\n    (previous)={previous}:<Context>,");
        }
        if let Some(closure) = &self.closure {
            let _ = write!(out, "\n    (closure)={},", closure.render_nested());
        }
        if let Some(scope) = &self.scope_info {
            let _ = write!(out, "\n    (scope_info)={},", scope.render_nested());
        }
        for local in &self.locals {
            let _ = write!(out, "\n    {}=", local.key);
            local.value.render(out);
            out.push(',');
        }
        out.push_str("\n  }>");
    }
}

/// A hidden class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapNode
{
    pub own_descriptors: usize,
    pub dictionary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_object_properties: Option<i64>,
    pub instance_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptors_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptors: Option<Box<ResultNode>>,
}

impl MapNode
{
    fn render(&self, out: &mut String)
    {
        let _ = write!(out, "<Map own_descriptors={}", self.own_descriptors);
        match self.in_object_properties {
            Some(count) => {
                let _ = write!(out, " in_object_size={count}");
            }
            None => out.push_str(" constructor_index"),
        }
        let _ = write!(out, " instance_size={}", self.instance_size);
        if let Some(descriptors) = self.descriptors_address {
            let _ = write!(out, " descriptors={descriptors}");
        }
        if self.dictionary {
            out.push_str(" [dictionary]");
        }
        if let Some(descriptors) = &self.descriptors {
            let _ = write!(out, ":\n  {}", descriptors.render_nested());
        }
        out.push('>');
    }
}

/// Scope metadata of a function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeInfoNode
{
    pub parameter_count: i64,
    pub stack_local_count: i64,
    pub context_local_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    pub local_names: Vec<String>,
}

impl ScopeInfoNode
{
    fn render(&self, out: &mut String)
    {
        out.push_str("<ScopeInfo");
        if let Some(name) = &self.function_name {
            let _ = write!(out, ": for function {name}");
        }
        let _ = write!(
            out,
            ", params={}, stack_locals={}, context_locals={}",
            self.parameter_count, self.stack_local_count, self.context_local_count
        );
        if !self.local_names.is_empty() {
            let _ = write!(out, " [{}]", self.local_names.join(", "));
        }
        out.push('>');
    }
}

/// Outcome of a user-facing inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InspectReport
{
    Ok
    {
        result: ResultNode,
    },
    Failed
    {
        error: String,
        address: Address,
    },
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::inspect::page::Window;

    fn smi(value: i64) -> ResultNode
    {
        ResultNode::new(
            Address::new((value as u64) << 32),
            NodeKind::SmallInt {
                value: value.to_string(),
            },
        )
    }

    #[test]
    fn test_object_text()
    {
        let properties = vec![
            Property {
                key: "a".into(),
                value: PropertyValue::Node(Box::new(smi(1))),
            },
            Property {
                key: "b".into(),
                value: PropertyValue::Node(Box::new(smi(2))),
            },
        ];
        let node = ResultNode::new(
            Address::new(0x1001),
            NodeKind::PlainObject(ObjectNode {
                constructor: Some("Object".into()),
                properties_length: 2,
                properties: Some(Page::new(properties, Window::new(0, 10, 2))),
                next: 2,
                ..ObjectNode::default()
            }),
        );
        let text = node.to_string();
        assert!(text.starts_with("<Object: Object properties {"));
        assert!(text.contains(".a=<Smi: 1>,"));
        assert!(text.contains(".b=<Smi: 2>,"));
        assert!(text.ends_with("}>"));
    }

    #[test]
    fn test_nested_carries_address()
    {
        let node = ResultNode::new(Address::new(0x1001), NodeKind::Code);
        assert_eq!(node.to_string(), "<Code>");
        assert_eq!(node.render_nested(), "0x0000000000001001:<Code>");
        let mapped = node.with_map(Some(Address::new(0x2001)));
        assert_eq!(mapped.to_string(), "0x0000000000001001(map=0x0000000000002001):<Code>");
    }

    #[test]
    fn test_json_shape()
    {
        let json = serde_json::to_value(smi(1)).unwrap();
        assert_eq!(json["type"], "SmallInt");
        assert_eq!(json["value"], "1");
        assert_eq!(json["name"], "Smi");

        let unknown = ResultNode::new(Address::new(0x11), NodeKind::Unknown { type_id: 9 });
        let json = serde_json::to_value(unknown).unwrap();
        assert_eq!(json["type"], "Unknown");
        assert_eq!(json["name"], "Unknown");
    }

    #[test]
    fn test_failed_report_json()
    {
        let report = InspectReport::Failed {
            error: "Invalid value".into(),
            address: Address::new(0x40),
        };
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "Invalid value");
    }
}
