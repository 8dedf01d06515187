//! # SVG Minifier Module
//!
//! Minifier SVG conservativo: il documento viene tokenizzato con
//! `xmlparser`, ripulito e riserializzato. Tutto ciò che può cambiare il
//! risultato visivo o il comportamento (testo, animazioni SMIL, link,
//! `<style>`, `<script>`, `foreignObject`) passa invariato.
//!
//! ## Pipeline:
//! 1. **Parse**: albero leggero che conserva testo ed entità così come sono
//! 2. **Optimize**: rimozione di commenti, metadata, dati dell'editor,
//!    namespace inutilizzati, gruppi senza attributi; numeri, path e colori
//!    compattati con `svgtypes`
//! 3. **Serialize**: output compatto (o indentato con `indent`)
//!
//! Ogni riscrittura di un attributo viene applicata solo se non allunga il
//! valore originale.

use crate::error::CompressError;
use std::borrow::Cow;
use std::collections::HashSet;
use svgtypes::{NumberListParser, PathParser, PathSegment, TransformListParser, TransformListToken};
use xmlparser::{ElementEnd, Token, Tokenizer};

/// Elements whose content is kept byte for byte.
const TEXT_CONTENT: &[&str] = &["text", "title", "desc", "style", "script", "foreignObject"];

/// Namespace prefixes written by vector editors, with no rendering effect.
const EDITOR_PREFIXES: &[&str] = &["sodipodi", "inkscape", "sketch", "serif"];

const NUMERIC_ATTRIBUTES: &[&str] = &[
    "x", "y", "x1", "y1", "x2", "y2", "cx", "cy", "r", "rx", "ry", "fx", "fy", "dx", "dy", "width", "height",
    "stroke-width", "offset", "opacity", "fill-opacity", "stroke-opacity", "stop-opacity",
];

const COLOR_ATTRIBUTES: &[&str] = &["fill", "stroke", "stop-color", "flood-color", "lighting-color", "color"];

const TRANSFORM_ATTRIBUTES: &[&str] = &["transform", "gradientTransform", "patternTransform"];

/// Minification switches and output format.
#[derive(Debug, Clone)]
pub struct MinifyOptions {
    /// Decimal places for coordinates, lengths and path data
    pub coordinates_precision: u8,
    /// Decimal places for transform lists
    pub transforms_precision: u8,
    /// Remove comments (`<!--! ... -->` legal comments are kept)
    pub remove_comments: bool,
    /// Remove `<metadata>` elements
    pub remove_metadata: bool,
    /// Remove the `<?xml ...?>` declaration
    pub remove_xml_declaration: bool,
    /// Remove the DOCTYPE unless it declares entities
    pub remove_doctype: bool,
    /// Remove editor namespaced elements and attributes (Inkscape, Sketch, ...)
    pub remove_editor_data: bool,
    /// Remove `xmlns:*` declarations no element or attribute uses
    pub remove_unused_namespaces: bool,
    /// Unwrap `<g>` elements without attributes (off when the document has a `<style>`)
    pub collapse_groups: bool,
    /// Drop whitespace-only text between elements
    pub collapse_whitespace: bool,
    /// Shorten hex colors (`#FF0000` -> `#f00`)
    pub minify_colors: bool,
    /// Round numeric attributes, number lists and transforms
    pub minify_numbers: bool,
    /// Rewrite path data with the shortest command and number form
    pub minify_paths: bool,
    /// Spaces per nesting level, `None` for compact output
    pub indent: Option<usize>,
    /// Quote attribute values with `'` instead of `"`
    pub single_quote: bool,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        Self {
            coordinates_precision: 3,
            transforms_precision: 5,
            remove_comments: true,
            remove_metadata: true,
            remove_xml_declaration: true,
            remove_doctype: true,
            remove_editor_data: true,
            remove_unused_namespaces: true,
            collapse_groups: true,
            collapse_whitespace: true,
            minify_colors: true,
            minify_numbers: true,
            minify_paths: true,
            indent: None,
            single_quote: false,
        }
    }
}

#[derive(Debug)]
struct Attribute<'a> {
    name: &'a str,
    prefix: &'a str,
    local: &'a str,
    /// Raw value, entities unexpanded
    value: Cow<'a, str>,
}

#[derive(Debug)]
struct Element<'a> {
    name: &'a str,
    prefix: &'a str,
    local: &'a str,
    attributes: Vec<Attribute<'a>>,
    children: Vec<Node<'a>>,
}

#[derive(Debug)]
enum Node<'a> {
    Element(Element<'a>),
    Text(&'a str),
    Cdata(&'a str),
    Comment(&'a str),
    Instruction(&'a str),
}

#[derive(Debug)]
struct Doctype<'a> {
    source: &'a str,
    declares_entities: bool,
}

#[derive(Debug)]
struct Document<'a> {
    declaration: Option<&'a str>,
    doctype: Option<Doctype<'a>>,
    prolog: Vec<Node<'a>>,
    root: Element<'a>,
    epilog: Vec<Node<'a>>,
}

impl<'a> Element<'a> {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_ref())
    }

    fn preserves_content(&self) -> bool {
        TEXT_CONTENT.contains(&self.local) || self.attribute("xml:space") == Some("preserve")
    }

    fn is_bare_group(&self) -> bool {
        self.prefix.is_empty() && self.local == "g" && self.attributes.is_empty()
    }

    fn contains(&self, local: &str) -> bool {
        self.children.iter().any(|child| match child {
            Node::Element(element) => element.local == local || element.contains(local),
            _ => false,
        })
    }
}

fn invalid(message: impl Into<String>) -> CompressError {
    CompressError::Svg(message.into())
}

fn parse(svg: &str) -> Result<Document<'_>, CompressError> {
    let mut declaration = None;
    let mut doctype = None;
    let mut dtd_start = None;
    let mut declares_entities = false;
    let mut prolog = Vec::new();
    let mut epilog = Vec::new();
    let mut root: Option<Element> = None;
    let mut stack: Vec<Element> = Vec::new();

    for token in Tokenizer::from(svg) {
        let node = match token? {
            Token::Declaration { span, .. } => {
                declaration = Some(span.as_str());
                continue;
            }
            Token::DtdStart { span, .. } => {
                dtd_start = Some(span.start());
                continue;
            }
            Token::EntityDeclaration { .. } => {
                declares_entities = true;
                continue;
            }
            Token::DtdEnd { span } => {
                if let Some(start) = dtd_start {
                    doctype = Some(Doctype {
                        source: &svg[start..span.end()],
                        declares_entities,
                    });
                }
                continue;
            }
            Token::EmptyDtd { span, .. } => {
                doctype = Some(Doctype {
                    source: span.as_str(),
                    declares_entities: false,
                });
                continue;
            }
            Token::ElementStart { prefix, local, span } => {
                stack.push(Element {
                    name: &svg[span.start() + 1..local.end()],
                    prefix: prefix.as_str(),
                    local: local.as_str(),
                    attributes: Vec::new(),
                    children: Vec::new(),
                });
                continue;
            }
            Token::Attribute { prefix, local, value, span } => {
                let element = stack.last_mut().ok_or_else(|| invalid("attribute outside of an element"))?;
                element.attributes.push(Attribute {
                    name: &svg[span.start()..local.end()],
                    prefix: prefix.as_str(),
                    local: local.as_str(),
                    value: Cow::Borrowed(value.as_str()),
                });
                continue;
            }
            Token::ElementEnd { end, .. } => match end {
                ElementEnd::Open => continue,
                ElementEnd::Empty => {
                    Node::Element(stack.pop().ok_or_else(|| invalid("unexpected element end"))?)
                }
                ElementEnd::Close(prefix, local) => {
                    let element = stack.pop().ok_or_else(|| invalid("unexpected closing tag"))?;
                    if element.prefix != prefix.as_str() || element.local != local.as_str() {
                        return Err(invalid(format!("mismatched closing tag for <{}>", element.name)));
                    }
                    Node::Element(element)
                }
            },
            Token::Text { text } => Node::Text(text.as_str()),
            Token::Cdata { text, .. } => Node::Cdata(text.as_str()),
            Token::Comment { text, .. } => Node::Comment(text.as_str()),
            Token::ProcessingInstruction { span, .. } => Node::Instruction(span.as_str()),
        };

        match (stack.last_mut(), node) {
            (Some(parent), node) => parent.children.push(node),
            (None, Node::Element(element)) => {
                if root.is_some() {
                    return Err(invalid("multiple root elements"));
                }
                root = Some(element);
            }
            (None, Node::Text(_)) => {}
            (None, node) if root.is_none() => prolog.push(node),
            (None, node) => epilog.push(node),
        }
    }

    if let Some(element) = stack.last() {
        return Err(invalid(format!("unclosed element <{}>", element.name)));
    }

    match root {
        Some(root) if root.local == "svg" => Ok(Document {
            declaration,
            doctype,
            prolog,
            root,
            epilog,
        }),
        Some(root) => Err(invalid(format!("root element is <{}>, not <svg>", root.name))),
        None => Err(invalid("no root element")),
    }
}

/// Rounds to `precision` decimals and drops redundant zeros (`0.500` -> `.5`).
fn format_number(value: f64, precision: u8) -> String {
    let precision = precision.min(12);
    let factor = 10f64.powi(i32::from(precision));
    let rounded = (value * factor).round() / factor;

    let mut text = format!("{:.*}", usize::from(precision), rounded);
    if text.contains('.') {
        text.truncate(text.trim_end_matches('0').trim_end_matches('.').len());
    }

    if text == "-0" {
        return "0".to_string();
    }
    if let Some(fraction) = text.strip_prefix("0.") {
        return format!(".{}", fraction);
    }
    if let Some(fraction) = text.strip_prefix("-0.") {
        return format!("-.{}", fraction);
    }
    text
}

fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    let plain = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
    if !plain {
        return None;
    }
    value.parse::<f64>().ok().filter(|number| number.is_finite())
}

fn minify_number(value: &str, precision: u8) -> Option<String> {
    parse_number(value).map(|number| format_number(number, precision))
}

fn minify_number_list(value: &str, precision: u8) -> Option<String> {
    let numbers = NumberListParser::from(value)
        .map(|number| number.map(|number| format_number(number, precision)))
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    (!numbers.is_empty()).then(|| numbers.join(" "))
}

/// Appends numbers, separating them only where the grammar needs it.
#[derive(Default)]
struct NumberWriter {
    out: String,
    separate: bool,
}

impl NumberWriter {
    fn command(&mut self, command: char) {
        self.out.push(command);
        self.separate = false;
    }

    fn number(&mut self, number: &str) {
        if self.separate && !number.starts_with('-') {
            self.out.push(' ');
        }
        self.out.push_str(number);
        self.separate = true;
    }
}

fn minify_path(d: &str, precision: u8) -> Option<String> {
    let mut writer = NumberWriter::default();
    let mut previous = None;

    for segment in PathParser::from(d) {
        let (abs, command, numbers) = match segment.ok()? {
            PathSegment::MoveTo { abs, x, y } => (abs, 'M', vec![x, y]),
            PathSegment::LineTo { abs, x, y } => (abs, 'L', vec![x, y]),
            PathSegment::HorizontalLineTo { abs, x } => (abs, 'H', vec![x]),
            PathSegment::VerticalLineTo { abs, y } => (abs, 'V', vec![y]),
            PathSegment::CurveTo { abs, x1, y1, x2, y2, x, y } => (abs, 'C', vec![x1, y1, x2, y2, x, y]),
            PathSegment::SmoothCurveTo { abs, x2, y2, x, y } => (abs, 'S', vec![x2, y2, x, y]),
            PathSegment::Quadratic { abs, x1, y1, x, y } => (abs, 'Q', vec![x1, y1, x, y]),
            PathSegment::SmoothQuadratic { abs, x, y } => (abs, 'T', vec![x, y]),
            PathSegment::EllipticalArc {
                abs,
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep,
                x,
                y,
            } => {
                let command = if abs { 'A' } else { 'a' };
                if previous != Some(command) {
                    writer.command(command);
                }
                for number in [rx, ry, x_axis_rotation] {
                    writer.number(&format_number(number, precision));
                }
                for flag in [large_arc, sweep] {
                    writer.number(if flag { "1" } else { "0" });
                }
                for number in [x, y] {
                    writer.number(&format_number(number, precision));
                }
                previous = Some(command);
                continue;
            }
            PathSegment::ClosePath { abs } => (abs, 'Z', vec![]),
        };

        let command = if abs { command } else { command.to_ascii_lowercase() };
        // A repeated moveto letter would turn the coordinates into a lineto
        let implicit = previous == Some(command) && !matches!(command, 'M' | 'm' | 'Z' | 'z');
        if !implicit {
            writer.command(command);
        }
        for number in numbers {
            writer.number(&format_number(number, precision));
        }
        previous = Some(command);
    }

    (!writer.out.is_empty()).then_some(writer.out)
}

fn minify_transform(value: &str, precision: u8) -> Option<String> {
    let number = |value: f64| format_number(value, precision);
    let transforms = TransformListParser::from(value)
        .map(|token| {
            token.map(|token| match token {
                TransformListToken::Matrix { a, b, c, d, e, f } => format!(
                    "matrix({} {} {} {} {} {})",
                    number(a),
                    number(b),
                    number(c),
                    number(d),
                    number(e),
                    number(f)
                ),
                TransformListToken::Translate { tx, ty } if ty == 0.0 => format!("translate({})", number(tx)),
                TransformListToken::Translate { tx, ty } => format!("translate({} {})", number(tx), number(ty)),
                TransformListToken::Scale { sx, sy } if sx == sy => format!("scale({})", number(sx)),
                TransformListToken::Scale { sx, sy } => format!("scale({} {})", number(sx), number(sy)),
                TransformListToken::Rotate { angle } => format!("rotate({})", number(angle)),
                TransformListToken::SkewX { angle } => format!("skewX({})", number(angle)),
                TransformListToken::SkewY { angle } => format!("skewY({})", number(angle)),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    (!transforms.is_empty()).then(|| transforms.join(" "))
}

fn minify_color(value: &str) -> Option<String> {
    let hex = value.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let hex = hex.to_ascii_lowercase();
    let b = hex.as_bytes();
    if b[0] == b[1] && b[2] == b[3] && b[4] == b[5] {
        Some(format!("#{}{}{}", b[0] as char, b[2] as char, b[4] as char))
    } else {
        Some(format!("#{}", hex))
    }
}

fn minify_attribute(element: &str, attribute: &mut Attribute, options: &MinifyOptions) {
    if !attribute.prefix.is_empty() || attribute.value.contains('&') {
        return;
    }

    let value = attribute.value.as_ref();
    let coordinates = options.coordinates_precision;
    let replacement = match attribute.local {
        "d" if options.minify_paths && element == "path" => minify_path(value, coordinates),
        name if options.minify_numbers && TRANSFORM_ATTRIBUTES.contains(&name) => {
            minify_transform(value, options.transforms_precision)
        }
        "viewBox" | "points" if options.minify_numbers => minify_number_list(value, coordinates),
        name if options.minify_numbers && NUMERIC_ATTRIBUTES.contains(&name) => minify_number(value, coordinates),
        name if options.minify_colors && COLOR_ATTRIBUTES.contains(&name) => minify_color(value),
        _ => None,
    };

    if let Some(replacement) = replacement {
        if replacement.len() <= attribute.value.len() {
            attribute.value = Cow::Owned(replacement);
        }
    }
}

#[derive(Clone, Copy)]
struct Context {
    preserve: bool,
    foreign: bool,
    collapse_groups: bool,
}

fn is_removed_comment(text: &str, options: &MinifyOptions) -> bool {
    options.remove_comments && !text.starts_with('!')
}

fn is_removed_element(element: &Element, options: &MinifyOptions) -> bool {
    (options.remove_metadata && element.prefix.is_empty() && element.local == "metadata")
        || (options.remove_editor_data && EDITOR_PREFIXES.contains(&element.prefix))
}

fn clean_element(element: &mut Element, options: &MinifyOptions, context: Context) {
    if options.remove_editor_data {
        element
            .attributes
            .retain(|attribute| !EDITOR_PREFIXES.contains(&attribute.prefix));
    }

    let local = element.local;
    if !context.foreign {
        for attribute in &mut element.attributes {
            minify_attribute(local, attribute, options);
        }
    }

    let context = Context {
        preserve: context.preserve || element.preserves_content(),
        foreign: context.foreign || local == "foreignObject",
        ..context
    };
    let unwrap_groups = context.collapse_groups && !context.preserve && !context.foreign && local != "switch";

    for child in std::mem::take(&mut element.children) {
        match child {
            Node::Comment(text) if is_removed_comment(text, options) => {}
            Node::Text(text) if options.collapse_whitespace && !context.preserve && text.trim().is_empty() => {}
            Node::Element(child) if is_removed_element(&child, options) => {}
            Node::Element(mut child) => {
                clean_element(&mut child, options, context);
                if unwrap_groups && child.is_bare_group() {
                    element.children.extend(child.children);
                } else {
                    element.children.push(Node::Element(child));
                }
            }
            other => element.children.push(other),
        }
    }
}

fn collect_prefixes<'a>(element: &Element<'a>, used: &mut HashSet<&'a str>) {
    if !element.prefix.is_empty() {
        used.insert(element.prefix);
    }
    for attribute in &element.attributes {
        if !attribute.prefix.is_empty() && attribute.prefix != "xmlns" {
            used.insert(attribute.prefix);
        }
    }
    for child in &element.children {
        if let Node::Element(child) = child {
            collect_prefixes(child, used);
        }
    }
}

fn remove_unused_namespaces(element: &mut Element, used: &HashSet<&str>) {
    element
        .attributes
        .retain(|attribute| attribute.prefix != "xmlns" || used.contains(attribute.local));
    for child in &mut element.children {
        if let Node::Element(child) = child {
            remove_unused_namespaces(child, used);
        }
    }
}

fn optimize(document: &mut Document, options: &MinifyOptions) {
    if options.remove_xml_declaration {
        document.declaration = None;
    }
    // Entity references in the body need their declarations
    if options.remove_doctype && matches!(&document.doctype, Some(doctype) if !doctype.declares_entities) {
        document.doctype = None;
    }
    if options.remove_comments {
        for nodes in [&mut document.prolog, &mut document.epilog] {
            nodes.retain(|node| !matches!(node, Node::Comment(text) if is_removed_comment(text, options)));
        }
    }

    let context = Context {
        preserve: false,
        foreign: false,
        collapse_groups: options.collapse_groups && !document.root.contains("style"),
    };
    clean_element(&mut document.root, options, context);

    if options.remove_unused_namespaces {
        let mut used = HashSet::new();
        collect_prefixes(&document.root, &mut used);
        remove_unused_namespaces(&mut document.root, &used);
    }
}

struct Writer {
    out: String,
    indent: Option<usize>,
    quote: char,
}

impl Writer {
    fn new_line(&mut self, depth: usize) {
        if let Some(indent) = self.indent {
            self.out.push('\n');
            self.out.extend(std::iter::repeat(' ').take(indent * depth));
        }
    }

    fn top_level(&mut self) {
        if !self.out.is_empty() {
            self.new_line(0);
        }
    }

    fn node(&mut self, node: &Node, depth: usize, preserve: bool) {
        match node {
            Node::Element(element) => self.element(element, depth, preserve),
            Node::Text(text) => self.out.push_str(text),
            Node::Cdata(text) => {
                self.out.push_str("<![CDATA[");
                self.out.push_str(text);
                self.out.push_str("]]>");
            }
            Node::Comment(text) => {
                self.out.push_str("<!--");
                self.out.push_str(text);
                self.out.push_str("-->");
            }
            Node::Instruction(source) => self.out.push_str(source),
        }
    }

    fn element(&mut self, element: &Element, depth: usize, preserve: bool) {
        self.out.push('<');
        self.out.push_str(element.name);
        for attribute in &element.attributes {
            self.out.push(' ');
            self.out.push_str(attribute.name);
            self.out.push('=');
            self.out.push(self.quote);
            let escaped = if self.quote == '"' { "&quot;" } else { "&apos;" };
            self.out.push_str(&attribute.value.replace(self.quote, escaped));
            self.out.push(self.quote);
        }

        if element.children.is_empty() {
            self.out.push_str("/>");
            return;
        }
        self.out.push('>');

        let preserve = preserve || element.preserves_content();
        for child in &element.children {
            if !preserve {
                self.new_line(depth + 1);
            }
            self.node(child, depth + 1, preserve);
        }
        if !preserve {
            self.new_line(depth);
        }

        self.out.push_str("</");
        self.out.push_str(element.name);
        self.out.push('>');
    }
}

fn serialize(document: &Document, options: &MinifyOptions) -> String {
    let mut writer = Writer {
        out: String::new(),
        indent: options.indent,
        quote: if options.single_quote { '\'' } else { '"' },
    };

    if let Some(declaration) = document.declaration {
        writer.out.push_str(declaration);
    }
    if let Some(ref doctype) = document.doctype {
        writer.top_level();
        writer.out.push_str(doctype.source);
    }
    for node in &document.prolog {
        writer.top_level();
        writer.node(node, 0, false);
    }
    writer.top_level();
    writer.element(&document.root, 0, false);
    for node in &document.epilog {
        writer.top_level();
        writer.node(node, 0, false);
    }

    writer.out
}

/// Runs one minification pass over an SVG document.
pub fn minify(svg: &str, options: &MinifyOptions) -> Result<String, CompressError> {
    let mut document = parse(svg)?;
    optimize(&mut document, options);
    Ok(serialize(&document, options))
}
