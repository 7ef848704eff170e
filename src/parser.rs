//! XML to [`MetadataValue`] conversion.
//!
//! The sidecar schema is not known statically, so the document is first read
//! into a small element tree with [`parse_xml`] and then folded into nested
//! mappings by [`convert`]:
//!
//! * attributes become `@name` entries,
//! * children are stored under their tag, repeated tags become lists,
//! * text is the value itself for bare elements and `#text` otherwise,
//! * non-empty text following an element's end tag is kept as `#tail`.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::ConvertError;
use crate::model::MetadataValue;

/// Conversion switches. Both are enabled by default.
#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    /// Render `{uri}local` names as `local`.
    pub strip_namespaces: bool,
    /// Trim leading and trailing whitespace from text and tails.
    pub strip_whitespace: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            strip_namespaces: true,
            strip_whitespace: true,
        }
    }
}

/// Namespace-resolved name of an element or attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlName {
    pub namespace: Option<String>,
    pub local: String,
}

impl XmlName {
    fn render(&self, strip_namespaces: bool) -> String {
        match &self.namespace {
            Some(uri) if !strip_namespaces => format!("{{{}}}{}", uri, self.local),
            _ => self.local.clone(),
        }
    }
}

/// Parsed element with its raw (untrimmed) text and tail.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: XmlName,
    pub attributes: Vec<(XmlName, String)>,
    pub text: String,
    pub tail: String,
    pub children: Vec<Element>,
}

/// Parses a whole document into its root [`Element`].
pub fn parse_xml(xml: &str) -> Result<Element, ConvertError> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(parse_error(&reader, e)),
        };

        match event {
            Event::Start(start) => {
                let element = open_element(&reader, &start, root.is_some() && stack.is_empty())?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&reader, &start, root.is_some() && stack.is_empty())?;
                close_element(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| parse_error(&reader, "unmatched end tag"))?;
                close_element(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| parse_error(&reader, e))?;
                append_text(&reader, &mut stack, &text)?;
            }
            Event::CData(cdata) => {
                let bytes = cdata.into_inner();
                append_text(&reader, &mut stack, &String::from_utf8_lossy(&bytes))?;
            }
            Event::Eof => break,
            // declarations, comments, processing instructions and doctypes
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(parse_error(
            &reader,
            format!("unclosed element <{}>", open.name.local),
        ));
    }

    let root = root.ok_or(ConvertError::EmptyDocument)?;
    debug!(
        "Parsed XML document with root <{}> and {} children",
        root.name.local,
        root.children.len()
    );
    Ok(root)
}

fn open_element(
    reader: &NsReader<&[u8]>,
    start: &BytesStart,
    after_root: bool,
) -> Result<Element, ConvertError> {
    if after_root {
        return Err(parse_error(reader, "multiple root elements"));
    }

    let (ns, local) = reader.resolve_element(start.name());
    let name = XmlName {
        namespace: namespace_uri(reader, ns)?,
        local: String::from_utf8_lossy(local.as_ref()).into_owned(),
    };

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_error(reader, e))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (ns, local) = reader.resolve_attribute(attr.key);
        let attr_name = XmlName {
            namespace: namespace_uri(reader, ns)?,
            local: String::from_utf8_lossy(local.as_ref()).into_owned(),
        };
        let value = attr
            .unescape_value()
            .map_err(|e| parse_error(reader, e))?
            .into_owned();
        attributes.push((attr_name, value));
    }

    Ok(Element {
        name,
        attributes,
        text: String::new(),
        tail: String::new(),
        children: Vec::new(),
    })
}

fn namespace_uri(
    reader: &NsReader<&[u8]>,
    ns: ResolveResult,
) -> Result<Option<String>, ConvertError> {
    match ns {
        ResolveResult::Bound(namespace) => {
            Ok(Some(String::from_utf8_lossy(namespace.as_ref()).into_owned()))
        }
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(parse_error(
            reader,
            format!("unbound prefix '{}'", String::from_utf8_lossy(&prefix)),
        )),
    }
}

fn close_element(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

/// Text before the first child belongs to the element, text after a child
/// belongs to that child's tail.
fn append_text(
    reader: &NsReader<&[u8]>,
    stack: &mut [Element],
    text: &str,
) -> Result<(), ConvertError> {
    match stack.last_mut() {
        Some(current) => {
            match current.children.last_mut() {
                Some(last) => last.tail.push_str(text),
                None => current.text.push_str(text),
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(parse_error(reader, "text outside of the root element")),
    }
}

fn parse_error(reader: &NsReader<&[u8]>, message: impl Display) -> ConvertError {
    ConvertError::Parse {
        position: reader.buffer_position() as u64,
        message: message.to_string(),
    }
}

/// Converts an element into a single-entry mapping `{tag: value}`.
pub fn convert(element: &Element, options: &ConvertOptions) -> MetadataValue {
    let mut document = BTreeMap::new();
    document.insert(
        element.name.render(options.strip_namespaces),
        convert_value(element, options),
    );
    MetadataValue::Map(document)
}

fn convert_value(element: &Element, options: &ConvertOptions) -> MetadataValue {
    let mut map = BTreeMap::new();

    for (name, value) in &element.attributes {
        map.insert(
            format!("@{}", name.render(options.strip_namespaces)),
            MetadataValue::Text(value.clone()),
        );
    }

    for child in &element.children {
        let tag = child.name.render(options.strip_namespaces);
        merge_child(&mut map, tag, convert_value(child, options));
    }

    let text = clean_text(&element.text, options);
    let tail = clean_text(&element.tail, options);

    if let Some(tail) = tail {
        map.insert("#tail".to_string(), MetadataValue::Text(tail));
    }

    if map.is_empty() {
        return text.map_or(MetadataValue::Null, MetadataValue::Text);
    }
    if let Some(text) = text {
        map.insert("#text".to_string(), MetadataValue::Text(text));
    }
    MetadataValue::Map(map)
}

/// absent -> single value -> list
fn merge_child(map: &mut BTreeMap<String, MetadataValue>, tag: String, value: MetadataValue) {
    match map.entry(tag) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(mut slot) => match slot.get_mut() {
            MetadataValue::List(items) => items.push(value),
            existing => {
                let first = std::mem::replace(existing, MetadataValue::Null);
                *existing = MetadataValue::List(vec![first, value]);
            }
        },
    }
}

fn clean_text(raw: &str, options: &ConvertOptions) -> Option<String> {
    let text = if options.strip_whitespace {
        raw.trim()
    } else {
        raw
    };
    (!text.is_empty()).then(|| text.to_string())
}

/// Parses and converts a document. A root without any content is rejected.
pub fn convert_str(xml: &str, options: &ConvertOptions) -> Result<MetadataValue, ConvertError> {
    let root = parse_xml(xml)?;
    let document = convert(&root, options);
    let root_tag = root.name.render(options.strip_namespaces);
    match document.get(&root_tag) {
        Some(value) if !value.is_empty() => Ok(document),
        _ => Err(ConvertError::EmptyDocument),
    }
}

/// Root element of an ESPA metadata sidecar.
pub const METADATA_ROOT: &str = "espa_metadata";

/// Loads a metadata sidecar and returns the mapping under its
/// `espa_metadata` root element.
pub fn load_metadata(path: &Path, options: &ConvertOptions) -> Result<MetadataValue, ConvertError> {
    let xml = fs::read_to_string(path).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root = parse_xml(&xml)?;
    if root.name.local != METADATA_ROOT {
        return Err(ConvertError::UnexpectedRoot {
            expected: METADATA_ROOT.to_string(),
            found: root.name.render(false),
        });
    }
    match convert_value(&root, options) {
        meta @ MetadataValue::Map(_) if !meta.is_empty() => Ok(meta),
        _ => Err(ConvertError::EmptyDocument),
    }
}
