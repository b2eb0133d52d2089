//! # RDF/XML Codec
//!
//! Striped RDF/XML without blank nodes.
//!
//! Serialization writes one `rdf:Description` per subject with predicate
//! elements as QNames. Parsing accepts:
//! - an optional `rdf:RDF` wrapper
//! - `rdf:Description` and typed node elements with `rdf:about`
//! - property attributes on node elements
//! - property elements with `rdf:resource`, text, or a nested node element
//! - `xml:lang`, `xml:base` and `rdf:datatype`
//!
//! `rdf:nodeID`, `rdf:ID`, `rdf:parseType` and node elements without
//! `rdf:about` are rejected.

use crate::formats::{line_column, resolve_iri, split_iri};
use crate::graph::{Graph, GraphStore};
use crate::primitives::{RDF, RDF_TYPE};
use crate::types::is_language_tag;
use crate::{Iri, Literal, PhyloError, Term, Triple};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, HashMap};

const XML_NS_PREFIX: &str = "xml";

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Namespace prefixes assigned for one serialization run.
struct NamespaceTable {
    /// (prefix, namespace) in declaration order.
    declared: Vec<(String, String)>,
    by_namespace: HashMap<String, String>,
}

impl NamespaceTable {
    fn for_graph(graph: &Graph) -> Result<Self, PhyloError> {
        let mut table = Self {
            declared: vec![("rdf".to_string(), RDF.to_string())],
            by_namespace: HashMap::from([(RDF.to_string(), "rdf".to_string())]),
        };

        for triple in graph.iter() {
            let predicate = triple.predicate.as_str();
            let (namespace, _) = split_qname(predicate).ok_or_else(|| {
                PhyloError::SerializationError(format!(
                    "predicate <{}> cannot be written as an XML QName",
                    predicate
                ))
            })?;
            if !table.by_namespace.contains_key(namespace) {
                let prefix = table.choose_prefix(graph, namespace);
                table
                    .by_namespace
                    .insert(namespace.to_string(), prefix.clone());
                table.declared.push((prefix, namespace.to_string()));
            }
        }

        Ok(table)
    }

    /// A bound prefix for the namespace if one is usable, else `nsN`.
    fn choose_prefix(&self, graph: &Graph, namespace: &str) -> String {
        let taken = |p: &str| self.declared.iter().any(|(d, _)| d == p);

        let bound = graph
            .prefixes()
            .iter()
            .filter(|(_, ns)| ns.as_str() == namespace)
            .map(|(prefix, _)| prefix.as_str())
            .find(|p| is_ncname(p) && !p.to_ascii_lowercase().starts_with(XML_NS_PREFIX) && !taken(p));
        if let Some(prefix) = bound {
            return prefix.to_string();
        }

        (0..)
            .map(|n| format!("ns{}", n))
            .find(|p| !taken(p))
            .unwrap_or_default()
    }

    fn qname(&self, iri: &str) -> Option<String> {
        let (namespace, local) = split_qname(iri)?;
        let prefix = self.by_namespace.get(namespace)?;
        Some(format!("{}:{}", prefix, local))
    }
}

fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Namespace and local part, when the local part is a valid NCName.
fn split_qname(iri: &str) -> Option<(&str, &str)> {
    split_iri(iri).filter(|(_, local)| is_ncname(local))
}

fn write_error(e: impl std::fmt::Display) -> PhyloError {
    PhyloError::SerializationError(e.to_string())
}

/// Serialize a graph as RDF/XML.
///
/// Returns `PhyloError::SerializationError` when a predicate cannot be
/// expressed as an XML QName.
pub fn serialize(graph: &Graph) -> Result<String, PhyloError> {
    let table = NamespaceTable::for_graph(graph)?;
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_error)?;

    let mut root = BytesStart::new("rdf:RDF");
    for (prefix, namespace) in &table.declared {
        root.push_attribute((format!("xmlns:{}", prefix).as_str(), namespace.as_str()));
    }
    writer.write_event(Event::Start(root)).map_err(write_error)?;

    for subject in graph.subjects() {
        let mut description = BytesStart::new("rdf:Description");
        description.push_attribute(("rdf:about", subject.as_str()));
        writer
            .write_event(Event::Start(description))
            .map_err(write_error)?;

        for triple in graph.triples_matching(Some(subject), None, None) {
            let name = table.qname(triple.predicate.as_str()).ok_or_else(|| {
                PhyloError::SerializationError(format!(
                    "predicate <{}> has no namespace prefix",
                    triple.predicate
                ))
            })?;
            let mut element = BytesStart::new(name.as_str());

            match &triple.object {
                Term::Iri(iri) => {
                    element.push_attribute(("rdf:resource", iri.as_str()));
                    writer.write_event(Event::Empty(element)).map_err(write_error)?;
                }
                Term::Literal(lit) => {
                    if let Some(lang) = lit.language() {
                        element.push_attribute(("xml:lang", lang));
                    }
                    if let Some(datatype) = lit.datatype() {
                        element.push_attribute(("rdf:datatype", datatype.as_str()));
                    }
                    writer.write_event(Event::Start(element)).map_err(write_error)?;
                    writer
                        .write_event(Event::Text(BytesText::new(lit.value())))
                        .map_err(write_error)?;
                    writer
                        .write_event(Event::End(BytesEnd::new(name.as_str())))
                        .map_err(write_error)?;
                }
                Term::Variable(var) => {
                    return Err(PhyloError::SerializationError(format!(
                        "query variable {} cannot be serialized",
                        var
                    )));
                }
            }
        }

        writer
            .write_event(Event::End(BytesEnd::new("rdf:Description")))
            .map_err(write_error)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("rdf:RDF")))
        .map_err(write_error)?;

    String::from_utf8(writer.into_inner()).map_err(write_error)
}

// =============================================================================
// PARSING
// =============================================================================

/// In-scope namespace declarations, language and base.
#[derive(Debug, Clone, Default)]
struct Scope {
    namespaces: HashMap<String, String>,
    lang: Option<String>,
    base: Option<String>,
}

#[derive(Debug)]
enum Frame {
    Root,
    Node,
    Property {
        subject: Iri,
        predicate: Iri,
        resource: Option<Iri>,
        datatype: Option<Iri>,
        text: String,
        node: Option<Iri>,
    },
}

/// What encloses the element being opened.
#[derive(Debug, Clone, Copy)]
enum Parent {
    Document,
    Root,
    Node,
    Property,
}

/// An expanded XML name.
struct Name {
    namespace: String,
    local: String,
}

impl Name {
    fn is_rdf(&self, local: &str) -> bool {
        self.namespace == RDF && self.local == local
    }

    fn iri(&self) -> Iri {
        Iri::new(format!("{}{}", self.namespace, self.local))
    }
}

/// Parse RDF/XML into a fresh graph.
///
/// The result carries the namespace prefixes declared in the document.
pub fn parse(input: &str) -> Result<Graph, PhyloError> {
    let mut parser = RdfXmlParser {
        input,
        graph: Graph::bare(),
        frames: Vec::new(),
        scopes: vec![Scope::default()],
        prefixes: BTreeMap::new(),
        subjects: Vec::new(),
    };
    parser.run()?;

    let RdfXmlParser {
        mut graph,
        prefixes,
        ..
    } = parser;
    for (prefix, namespace) in prefixes {
        graph.bind_prefix(prefix, namespace);
    }
    Ok(graph)
}

struct RdfXmlParser<'i> {
    input: &'i str,
    graph: Graph,
    frames: Vec<Frame>,
    scopes: Vec<Scope>,
    prefixes: BTreeMap<String, String>,
    /// Subjects of the open node elements.
    subjects: Vec<Iri>,
}

fn offset(position: impl TryInto<usize>) -> usize {
    position.try_into().unwrap_or(usize::MAX)
}

impl RdfXmlParser<'_> {
    fn error(&self, offset: usize, message: impl Into<String>) -> PhyloError {
        let (line, column) = line_column(self.input, offset);
        PhyloError::ParseError {
            line,
            column,
            message: message.into(),
        }
    }

    fn scope(&self) -> &Scope {
        // The document scope is never popped.
        &self.scopes[self.scopes.len() - 1]
    }

    fn run(&mut self) -> Result<(), PhyloError> {
        let mut reader = Reader::from_str(self.input);

        loop {
            let at = offset(reader.buffer_position());
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    let at = offset(reader.error_position());
                    return Err(self.error(at, format!("malformed XML: {}", e)));
                }
            };

            match event {
                Event::Start(e) => self.start(&e, at, false)?,
                Event::Empty(e) => self.start(&e, at, true)?,
                Event::End(_) => self.end(at)?,
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|err| self.error(at, format!("malformed text: {}", err)))?;
                    self.text(&text, at)?;
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    self.text(&text, at)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !self.frames.is_empty() {
            return Err(self.error(self.input.len(), "unexpected end of document"));
        }
        Ok(())
    }

    fn attributes(&self, e: &BytesStart<'_>, at: usize) -> Result<Vec<(String, String)>, PhyloError> {
        e.attributes()
            .map(|attr| {
                let attr =
                    attr.map_err(|err| self.error(at, format!("malformed attribute: {}", err)))?;
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map_err(|err| self.error(at, format!("malformed attribute: {}", err)))?
                    .into_owned();
                Ok((key, value))
            })
            .collect()
    }

    /// Parent scope extended with this element's declarations.
    fn child_scope(&mut self, attrs: &[(String, String)], at: usize) -> Result<Scope, PhyloError> {
        let mut scope = self.scope().clone();

        for (key, value) in attrs {
            if key == "xmlns" {
                scope.namespaces.insert(String::new(), value.clone());
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.namespaces.insert(prefix.to_string(), value.clone());
                // Relative namespaces still expand names but are not kept as
                // serialization prefixes.
                if Iri::new(value.as_str()).is_valid() {
                    self.prefixes.insert(prefix.to_string(), value.clone());
                }
            } else if key == "xml:lang" {
                if value.is_empty() {
                    scope.lang = None;
                } else if is_language_tag(value) {
                    scope.lang = Some(value.clone());
                } else {
                    return Err(self.error(at, format!("invalid xml:lang '{}'", value)));
                }
            } else if key == "xml:base" {
                let base = resolve_iri(scope.base.as_deref(), value);
                scope.base = Some(base.into_string());
            }
        }

        Ok(scope)
    }

    fn expand(&self, qname: &str, scope: &Scope, at: usize) -> Result<Name, PhyloError> {
        let (prefix, local) = qname.split_once(':').unwrap_or(("", qname));
        let namespace = scope
            .namespaces
            .get(prefix)
            .ok_or_else(|| self.error(at, format!("'{}' has no namespace", qname)))?;
        Ok(Name {
            namespace: namespace.clone(),
            local: local.to_string(),
        })
    }

    fn absolute(&self, reference: &str, scope: &Scope, at: usize) -> Result<Iri, PhyloError> {
        let iri = resolve_iri(scope.base.as_deref(), reference);
        iri.validate()
            .map_err(|reason| self.error(at, format!("invalid IRI: {}", reason)))?;
        Ok(iri)
    }

    fn start(&mut self, e: &BytesStart<'_>, at: usize, empty: bool) -> Result<(), PhyloError> {
        let attrs = self.attributes(e, at)?;
        let scope = self.child_scope(&attrs, at)?;
        let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let name = self.expand(&qname, &scope, at)?;

        let parent = match self.frames.last() {
            None => Parent::Document,
            Some(Frame::Root) => Parent::Root,
            Some(Frame::Node) => Parent::Node,
            Some(Frame::Property { .. }) => Parent::Property,
        };

        let frame = match parent {
            Parent::Document if name.is_rdf("RDF") => Frame::Root,
            Parent::Document | Parent::Root => {
                let subject = self.node_element(&name, &attrs, &scope, at)?;
                if !empty {
                    self.subjects.push(subject);
                }
                Frame::Node
            }
            Parent::Property => {
                let subject = self.node_element(&name, &attrs, &scope, at)?;
                if let Some(Frame::Property { node, .. }) = self.frames.last_mut() {
                    if node.is_some() {
                        return Err(self.error(at, "property element has more than one object"));
                    }
                    *node = Some(subject.clone());
                }
                if !empty {
                    self.subjects.push(subject);
                }
                Frame::Node
            }
            Parent::Node => {
                let Some(subject) = self.subjects.last().cloned() else {
                    return Err(self.error(at, "property element outside a node element"));
                };
                match self.property_element(subject, &name, &attrs, &scope, at, empty)? {
                    Some(frame) => frame,
                    None => return Ok(()),
                }
            }
        };

        if !empty {
            self.frames.push(frame);
            self.scopes.push(scope);
        }
        Ok(())
    }

    fn reject_rdf_attribute(&self, name: &Name, at: usize) -> Result<(), PhyloError> {
        for unsupported in ["nodeID", "ID", "parseType", "bagID", "aboutEach"] {
            if name.is_rdf(unsupported) {
                return Err(self.error(at, format!("rdf:{} is not supported", unsupported)));
            }
        }
        Ok(())
    }

    /// Attributes other than namespace and `xml:` declarations.
    fn plain_attributes<'a>(
        &self,
        attrs: &'a [(String, String)],
        scope: &Scope,
        at: usize,
    ) -> Result<Vec<(Name, &'a str)>, PhyloError> {
        attrs
            .iter()
            .filter(|(key, _)| {
                key != "xmlns" && !key.starts_with("xmlns:") && !key.starts_with("xml:")
            })
            .map(|(key, value)| {
                if !key.contains(':') {
                    return Err(self.error(at, format!("unqualified attribute '{}'", key)));
                }
                let name = self.expand(key, scope, at)?;
                self.reject_rdf_attribute(&name, at)?;
                Ok((name, value.as_str()))
            })
            .collect()
    }

    fn node_element(
        &mut self,
        name: &Name,
        attrs: &[(String, String)],
        scope: &Scope,
        at: usize,
    ) -> Result<Iri, PhyloError> {
        let mut about = None;
        let mut properties = Vec::new();

        for (attr, value) in self.plain_attributes(attrs, scope, at)? {
            if attr.is_rdf("about") {
                about = Some(value);
            } else if attr.is_rdf("type") {
                properties.push((Iri::new(RDF_TYPE), Term::Iri(self.absolute(value, scope, at)?)));
            } else if attr.is_rdf("resource") || attr.is_rdf("datatype") {
                return Err(self.error(at, format!("rdf:{} on a node element", attr.local)));
            } else {
                properties.push((attr.iri(), Term::Literal(literal(value, scope.lang.as_deref(), None))));
            }
        }

        let Some(about) = about else {
            return Err(self.error(at, "node element without rdf:about"));
        };
        let subject = self.absolute(about, scope, at)?;

        if !name.is_rdf("Description") {
            self.graph
                .insert(Triple::new(subject.clone(), Iri::new(RDF_TYPE), name.iri()));
        }
        for (predicate, object) in properties {
            self.graph.insert(Triple::new(subject.clone(), predicate, object));
        }

        Ok(subject)
    }

    fn property_element(
        &mut self,
        subject: Iri,
        name: &Name,
        attrs: &[(String, String)],
        scope: &Scope,
        at: usize,
        empty: bool,
    ) -> Result<Option<Frame>, PhyloError> {
        let mut resource = None;
        let mut datatype = None;

        for (attr, value) in self.plain_attributes(attrs, scope, at)? {
            if attr.is_rdf("resource") {
                resource = Some(self.absolute(value, scope, at)?);
            } else if attr.is_rdf("datatype") {
                datatype = Some(self.absolute(value, scope, at)?);
            } else {
                return Err(self.error(
                    at,
                    "property attributes on a property element are not supported",
                ));
            }
        }

        if resource.is_some() && datatype.is_some() {
            return Err(self.error(at, "rdf:resource and rdf:datatype on one element"));
        }

        let predicate = name.iri();
        if empty {
            let object = match resource {
                Some(iri) => Term::Iri(iri),
                None => Term::Literal(literal("", scope.lang.as_deref(), datatype)),
            };
            self.graph.insert(Triple::new(subject, predicate, object));
            return Ok(None);
        }

        Ok(Some(Frame::Property {
            subject,
            predicate,
            resource,
            datatype,
            text: String::new(),
            node: None,
        }))
    }

    fn text(&mut self, text: &str, at: usize) -> Result<(), PhyloError> {
        let blank = text.trim().is_empty();
        match self.frames.last_mut() {
            Some(Frame::Property { text: buf, node, .. }) => {
                if node.is_some() && !blank {
                    return Err(self.error(at, "text next to a nested node element"));
                }
                buf.push_str(text);
                Ok(())
            }
            _ if blank => Ok(()),
            _ => Err(self.error(at, "unexpected text outside a property element")),
        }
    }

    fn end(&mut self, at: usize) -> Result<(), PhyloError> {
        let Some(frame) = self.frames.pop() else {
            return Err(self.error(at, "unbalanced end tag"));
        };
        let Some(scope) = self.scopes.pop() else {
            return Err(self.error(at, "unbalanced end tag"));
        };

        match frame {
            Frame::Root => {}
            Frame::Node => {
                self.subjects.pop();
            }
            Frame::Property {
                subject,
                predicate,
                resource,
                datatype,
                text,
                node,
            } => {
                let object = match (node, resource) {
                    (Some(node), _) => Term::Iri(node),
                    (None, Some(iri)) => {
                        if !text.trim().is_empty() {
                            return Err(self.error(at, "rdf:resource element with text content"));
                        }
                        Term::Iri(iri)
                    }
                    (None, None) => Term::Literal(literal(&text, scope.lang.as_deref(), datatype)),
                };
                self.graph.insert(Triple::new(subject, predicate, object));
            }
        }
        Ok(())
    }
}

fn literal(value: &str, lang: Option<&str>, datatype: Option<Iri>) -> Literal {
    match (datatype, lang) {
        (Some(datatype), _) => Literal::typed(value, datatype),
        (None, Some(lang)) => Literal::with_language(value, lang),
        (None, None) => Literal::plain(value),
    }
}

// =============================================================================
// TESTS
// =============================================================================
