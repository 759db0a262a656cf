//! XML peek/poke over a small XPath subset.
//!
//! Supported expressions are location paths of element steps, each optionally
//! prefixed (`ns:Project`) and optionally carrying one attribute-equality
//! predicate (`add[@key='unicorn:define']`), with an optional trailing
//! attribute step (`/@value`). A leading `/` is optional; the first step is
//! matched against the document element. Unprefixed names select nodes in no
//! namespace, prefixed names resolve through the caller's namespace map.
//!
//! Edits are spliced into the original text at the byte ranges reported by
//! the parser, so everything outside the edited nodes is preserved exactly.

use async_trait::async_trait;
use regex::Regex;
use roxmltree::{Document, Node, ParsingOptions};
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::contract::{Namespaces, ToolError, XmlEditor};
use crate::error::DeployError;

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq)]
struct QName {
    namespace: Option<String>,
    local: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    name: QName,
    predicate: Option<(QName, String)>,
}

#[derive(Debug, Clone, PartialEq)]
struct LocationPath {
    steps: Vec<Step>,
    attribute: Option<QName>,
}

fn step_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(?:([A-Za-z_][\w.\-]*):)?([A-Za-z_][\w.\-]*)(?:\[\s*@(?:([A-Za-z_][\w.\-]*):)?([A-Za-z_][\w.\-]*)\s*=\s*(?:'([^']*)'|"([^"]*)")\s*\])?$"#,
        )
        .expect("step pattern is valid")
    })
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@(?:([A-Za-z_][\w.\-]*):)?([A-Za-z_][\w.\-]*)$")
            .expect("attribute pattern is valid")
    })
}

fn syntax(xpath: &str, reason: impl Into<String>) -> DeployError {
    DeployError::XPathSyntax {
        xpath: xpath.to_string(),
        reason: reason.into(),
    }
}

fn resolve(
    xpath: &str,
    prefix: Option<&str>,
    local: &str,
    namespaces: &Namespaces,
) -> Result<QName, DeployError> {
    let namespace = match prefix {
        None => None,
        Some(prefix) => Some(
            namespaces
                .get(prefix)
                .cloned()
                .ok_or_else(|| syntax(xpath, format!("unknown namespace prefix `{prefix}`")))?,
        ),
    };
    Ok(QName {
        namespace,
        local: local.to_string(),
    })
}

fn parse_xpath(xpath: &str, namespaces: &Namespaces) -> Result<LocationPath, DeployError> {
    let trimmed = xpath.trim();
    let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
    if body.is_empty() {
        return Err(syntax(xpath, "empty location path"));
    }

    let mut segments: Vec<&str> = body.split('/').collect();
    let attribute = match segments.last() {
        Some(last) if last.starts_with('@') => {
            let caps = attribute_regex()
                .captures(last)
                .ok_or_else(|| syntax(xpath, format!("bad attribute step `{last}`")))?;
            let qname = resolve(
                xpath,
                caps.get(1).map(|m| m.as_str()),
                &caps[2],
                namespaces,
            )?;
            segments.pop();
            Some(qname)
        }
        _ => None,
    };
    if segments.is_empty() {
        return Err(syntax(xpath, "attribute step needs an element step before it"));
    }

    let mut steps = Vec::with_capacity(segments.len());
    for segment in segments {
        if segment.is_empty() {
            return Err(syntax(xpath, "descendant axis (`//`) is not supported"));
        }
        let caps = step_regex()
            .captures(segment)
            .ok_or_else(|| syntax(xpath, format!("bad element step `{segment}`")))?;
        let name = resolve(xpath, caps.get(1).map(|m| m.as_str()), &caps[2], namespaces)?;
        let predicate = match caps.get(4) {
            Some(local) => {
                let attr = resolve(xpath, caps.get(3).map(|m| m.as_str()), local.as_str(), namespaces)?;
                let value = caps
                    .get(5)
                    .or_else(|| caps.get(6))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                Some((attr, value))
            }
            None => None,
        };
        steps.push(Step { name, predicate });
    }

    Ok(LocationPath { steps, attribute })
}

fn element_matches(node: &Node, step: &Step) -> bool {
    if !node.is_element() {
        return false;
    }
    let tag = node.tag_name();
    if tag.name() != step.name.local || tag.namespace() != step.name.namespace.as_deref() {
        return false;
    }
    match &step.predicate {
        None => true,
        Some((attr, value)) => node
            .attributes()
            .any(|a| attribute_matches(&a, attr) && a.value() == value),
    }
}

fn attribute_matches(attr: &roxmltree::Attribute, name: &QName) -> bool {
    attr.name() == name.local && attr.namespace() == name.namespace.as_deref()
}

fn select_elements<'a, 'input>(doc: &'a Document<'input>, path: &LocationPath) -> Vec<Node<'a, 'input>> {
    let root = doc.root_element();
    let mut current = if element_matches(&root, &path.steps[0]) {
        vec![root]
    } else {
        Vec::new()
    };
    for step in &path.steps[1..] {
        current = current
            .iter()
            .flat_map(|n| n.children().filter(|c| element_matches(c, step)))
            .collect();
    }
    current
}

fn parse_document<'input>(text: &'input str, file: &Path) -> Result<Document<'input>, DeployError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options).map_err(|e| DeployError::Xml {
        path: file.to_path_buf(),
        message: e.to_string(),
    })
}

fn escape(value: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\'' if attribute => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Qualified name exactly as written in the start tag at `start`.
fn written_qname(text: &str, start: usize) -> &str {
    let rest = &text[start + 1..];
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Range covering ` name="value"` for removal of one attribute.
fn attribute_removal_range(text: &str, value: Range<usize>) -> Range<usize> {
    let bytes = text.as_bytes();
    // value range excludes the quotes
    let end = value.end + 1;
    let mut i = value.start.saturating_sub(1);
    while i > 0 && (bytes[i - 1] as char).is_whitespace() {
        i -= 1;
    }
    if i > 0 && bytes[i - 1] == b'=' {
        i -= 1;
    }
    while i > 0 && (bytes[i - 1] as char).is_whitespace() {
        i -= 1;
    }
    while i > 0 && !(bytes[i - 1] as char).is_whitespace() {
        i -= 1;
    }
    while i > 0 && (bytes[i - 1] as char).is_whitespace() {
        i -= 1;
    }
    i..end
}

/// Replacement that sets the text content of `node`.
/// Byte range between the start and end tags of `node`; `None` when the
/// element is self-closing.
fn content_range(text: &str, node: &Node) -> Option<Range<usize>> {
    let range = node.range();
    let element = &text[range.clone()];
    if element.ends_with("/>") {
        return None;
    }
    let qname = written_qname(text, range.start);
    let search_from = node
        .attributes()
        .map(|a| a.range_value().end + 1)
        .max()
        .unwrap_or(range.start + 1 + qname.len());
    let content_start = search_from
        + text[search_from..range.end]
            .find('>')
            .map(|i| i + 1)
            .unwrap_or(0);
    let content_end = range.start + element.rfind("</").unwrap_or(element.len());
    Some(content_start..content_end)
}

fn element_text_edit(text: &str, node: &Node, value: &str) -> (Range<usize>, String) {
    let value = escape(value, false);
    match content_range(text, node) {
        Some(content) => (content, value),
        None => self_closing_expansion(text, node, &value),
    }
}

/// Rewrites a self-closing element so that it wraps `inner`.
fn self_closing_expansion(text: &str, node: &Node, inner: &str) -> (Range<usize>, String) {
    let range = node.range();
    let qname = written_qname(text, range.start);
    let element = &text[range.clone()];
    let start_tag = element[..element.len() - 2].trim_end();
    (range, format!("{start_tag}>{inner}</{qname}>"))
}

/// Raw markup inside the document element of `text`.
pub(crate) fn root_content<'a>(text: &'a str, file: &Path) -> Result<&'a str, DeployError> {
    let doc = parse_document(text, file)?;
    Ok(content_range(text, &doc.root_element())
        .map(|range| &text[range])
        .unwrap_or(""))
}

/// `text` with `markup` inserted just before the end tag of the document
/// element.
pub(crate) fn append_to_root(text: &str, file: &Path, markup: &str) -> Result<String, DeployError> {
    let doc = parse_document(text, file)?;
    let root = doc.root_element();
    let edit = match content_range(text, &root) {
        Some(content) => (content.end..content.end, markup.to_string()),
        None => self_closing_expansion(text, &root, markup),
    };
    Ok(splice(text, vec![edit]))
}

fn splice(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut out = text.to_string();
    for (range, replacement) in edits {
        out.replace_range(range, &replacement);
    }
    out
}

fn miss(file: &Path, xpath: &str) -> DeployError {
    DeployError::XPathMiss {
        path: file.to_path_buf(),
        xpath: xpath.to_string(),
    }
}

/// Rewrites every node selected by `xpath`: sets it to `value`, or removes
/// it when `value` is `None`.
pub fn poke_str(
    text: &str,
    file: &Path,
    xpath: &str,
    value: Option<&str>,
    namespaces: &Namespaces,
) -> Result<String, DeployError> {
    let path = parse_xpath(xpath, namespaces)?;
    let doc = parse_document(text, file)?;
    let elements = select_elements(&doc, &path);

    let mut edits = Vec::new();
    for element in &elements {
        match (&path.attribute, value) {
            (Some(attr), Some(value)) => {
                for a in element.attributes().filter(|a| attribute_matches(a, attr)) {
                    edits.push((a.range_value(), escape(value, true)));
                }
            }
            (Some(attr), None) => {
                for a in element.attributes().filter(|a| attribute_matches(a, attr)) {
                    edits.push((attribute_removal_range(text, a.range_value()), String::new()));
                }
            }
            (None, Some(value)) => edits.push(element_text_edit(text, element, value)),
            (None, None) => edits.push((element.range(), String::new())),
        }
    }

    if edits.is_empty() {
        return Err(miss(file, xpath));
    }
    debug!(xpath, count = edits.len(), "Applying XML edits");
    Ok(splice(text, edits))
}

/// String value of the first node selected by `xpath`.
pub fn peek_str(
    text: &str,
    file: &Path,
    xpath: &str,
    namespaces: &Namespaces,
) -> Result<String, DeployError> {
    let path = parse_xpath(xpath, namespaces)?;
    let doc = parse_document(text, file)?;
    let elements = select_elements(&doc, &path);

    let value = match &path.attribute {
        Some(attr) => elements.iter().find_map(|e| {
            e.attributes()
                .find(|a| attribute_matches(a, attr))
                .map(|a| a.value().to_string())
        }),
        None => elements.first().map(|e| {
            e.descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect::<String>()
        }),
    };
    value.ok_or_else(|| miss(file, xpath))
}

pub(crate) fn read(file: &Path) -> Result<(bool, String), DeployError> {
    let text = std::fs::read_to_string(file).map_err(|e| DeployError::io(file, e))?;
    match text.strip_prefix(BOM) {
        Some(stripped) => Ok((true, stripped.to_string())),
        None => Ok((false, text)),
    }
}

pub(crate) fn write(file: &Path, had_bom: bool, text: String) -> Result<(), DeployError> {
    let text = if had_bom { format!("{BOM}{text}") } else { text };
    std::fs::write(file, text).map_err(|e| DeployError::io(file, e))
}

/// [`XmlEditor`] working on files in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentXmlEditor;

#[async_trait]
impl XmlEditor for DocumentXmlEditor {
    async fn poke(
        &self,
        file: &Path,
        xpath: &str,
        value: &str,
        namespaces: &Namespaces,
    ) -> Result<(), ToolError> {
        let (bom, text) = read(file)?;
        let updated = poke_str(&text, file, xpath, Some(value), namespaces)?;
        write(file, bom, updated)?;
        info!(file = %file.display(), xpath, "Updated XML value");
        Ok(())
    }

    async fn remove(
        &self,
        file: &Path,
        xpath: &str,
        namespaces: &Namespaces,
    ) -> Result<(), ToolError> {
        let (bom, text) = read(file)?;
        let updated = poke_str(&text, file, xpath, None, namespaces)?;
        write(file, bom, updated)?;
        info!(file = %file.display(), xpath, "Removed XML nodes");
        Ok(())
    }

    async fn peek(
        &self,
        file: &Path,
        xpath: &str,
        namespaces: &Namespaces,
    ) -> Result<String, ToolError> {
        let (_, text) = read(file)?;
        Ok(peek_str(&text, file, xpath, namespaces)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEB_CONFIG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<configuration>
  <appSettings>
    <add key="role:define" value="Standalone" />
    <add key="unicorn:define" value="Disabled" />
  </appSettings>
</configuration>
"#;

    const PUBLISH_SETTINGS: &str = r#"<Project xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <Import Project="..\publishsettings.targets" />
  <PropertyGroup>
    <publishUrl>http://old</publishUrl>
    <empty />
  </PropertyGroup>
</Project>"#;

    fn msbuild() -> Namespaces {
        [(
            "ns".to_string(),
            "http://schemas.microsoft.com/developer/msbuild/2003".to_string(),
        )]
        .into_iter()
        .collect()
    }

    fn file() -> &'static Path {
        Path::new("web.config")
    }

    #[test]
    fn pokes_attribute_selected_by_predicate() {
        let out = poke_str(
            WEB_CONFIG,
            file(),
            "configuration/appSettings/add[@key='unicorn:define']/@value",
            Some("Enabled"),
            &Namespaces::new(),
        )
        .unwrap();
        assert!(out.contains(r#"<add key="unicorn:define" value="Enabled" />"#));
        assert!(out.contains(r#"<add key="role:define" value="Standalone" />"#));
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
    }

    #[test]
    fn poke_escapes_attribute_values() {
        let out = poke_str(
            WEB_CONFIG,
            file(),
            "/configuration/appSettings/add[@key=\"role:define\"]/@value",
            Some("a\"b&c"),
            &Namespaces::new(),
        )
        .unwrap();
        assert!(out.contains(r#"value="a&quot;b&amp;c""#));
    }

    #[test]
    fn poke_sets_element_text_in_default_namespace() {
        let out = poke_str(
            PUBLISH_SETTINGS,
            file(),
            "/ns:Project/ns:PropertyGroup/ns:publishUrl",
            Some("https://cms.local"),
            &msbuild(),
        )
        .unwrap();
        assert!(out.contains("<publishUrl>https://cms.local</publishUrl>"));
    }

    #[test]
    fn poke_expands_self_closing_element() {
        let out = poke_str(
            PUBLISH_SETTINGS,
            file(),
            "/ns:Project/ns:PropertyGroup/ns:empty",
            Some("x"),
            &msbuild(),
        )
        .unwrap();
        assert!(out.contains("<empty>x</empty>"));
    }

    #[test]
    fn remove_drops_the_element() {
        let out = poke_str(PUBLISH_SETTINGS, file(), "/ns:Project/ns:Import", None, &msbuild()).unwrap();
        assert!(!out.contains("<Import"));
        assert!(out.contains("<publishUrl>http://old</publishUrl>"));
    }

    #[test]
    fn remove_drops_an_attribute() {
        let out = poke_str(
            WEB_CONFIG,
            file(),
            "configuration/appSettings/add[@key='role:define']/@value",
            None,
            &Namespaces::new(),
        )
        .unwrap();
        assert!(out.contains(r#"<add key="role:define" />"#));
    }

    #[test]
    fn unprefixed_step_does_not_match_namespaced_element() {
        let err = poke_str(PUBLISH_SETTINGS, file(), "/Project/Import", None, &Namespaces::new())
            .unwrap_err();
        assert!(matches!(err, DeployError::XPathMiss { .. }));
    }

    #[test]
    fn zero_matches_is_an_error() {
        let err = poke_str(
            WEB_CONFIG,
            file(),
            "configuration/appSettings/add[@key='missing']/@value",
            Some("x"),
            &Namespaces::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DeployError::XPathMiss { .. }));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = poke_str("<configuration>", file(), "configuration", Some("x"), &Namespaces::new())
            .unwrap_err();
        assert!(matches!(err, DeployError::Xml { .. }));
    }

    #[test]
    fn unknown_prefix_is_a_syntax_error() {
        let err = peek_str(PUBLISH_SETTINGS, file(), "/x:Project", &msbuild()).unwrap_err();
        assert!(matches!(err, DeployError::XPathSyntax { .. }));
    }

    #[test]
    fn descendant_axis_is_rejected() {
        let err = peek_str(WEB_CONFIG, file(), "//add", &Namespaces::new()).unwrap_err();
        assert!(matches!(err, DeployError::XPathSyntax { .. }));
    }

    #[test]
    fn peeks_element_text() {
        let xml = r#"<configuration><sitecore><unicorn><authenticationProvider>
<SharedSecret>abc123</SharedSecret></authenticationProvider></unicorn></sitecore></configuration>"#;
        let secret = peek_str(
            xml,
            file(),
            "/configuration/sitecore/unicorn/authenticationProvider/SharedSecret",
            &Namespaces::new(),
        )
        .unwrap();
        assert_eq!(secret, "abc123");
    }

    #[test]
    fn peeks_first_matching_attribute() {
        let value = peek_str(
            WEB_CONFIG,
            file(),
            "configuration/appSettings/add/@value",
            &Namespaces::new(),
        )
        .unwrap();
        assert_eq!(value, "Standalone");
    }

    #[test]
    fn root_content_and_append_to_root() {
        let fragment = r#"<configuration xmlns:xdt="http://schemas.microsoft.com/XML-Document-Transform">
  <appSettings xdt:Transform="InsertIfMissing" />
</configuration>"#;
        assert_eq!(
            root_content(fragment, file()).unwrap().trim(),
            r#"<appSettings xdt:Transform="InsertIfMissing" />"#
        );

        let merged = append_to_root(fragment, file(), "  <system.web />\n").unwrap();
        assert!(merged.ends_with("  <system.web />\n</configuration>"), "{merged}");

        let expanded = append_to_root("<configuration />", file(), "<a />").unwrap();
        assert_eq!(expanded, "<configuration><a /></configuration>");
        assert_eq!(root_content("<configuration />", file()).unwrap(), "");
    }

    #[tokio::test]
    async fn editor_rewrites_file_and_keeps_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("web.config");
        std::fs::write(&path, format!("{BOM}{WEB_CONFIG}")).unwrap();

        DocumentXmlEditor
            .poke(
                &path,
                "configuration/appSettings/add[@key='unicorn:define']/@value",
                "Enabled",
                &Namespaces::new(),
            )
            .await
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(BOM));
        assert!(written.contains(r#"value="Enabled""#));
    }
}
