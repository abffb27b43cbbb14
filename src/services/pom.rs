//! POM descriptor extraction.
//!
//! Pulls the handful of descriptor fields the catalog records out of a
//! `pom.xml`. Elements are matched in the namespace of the root element, so
//! both namespaced (`http://maven.apache.org/POM/4.0.0`) and bare POMs work.

use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{AppError, Result};
use crate::models::PomMetadata;

/// Parse POM bytes into descriptor metadata.
///
/// Fails only when the document is not well-formed XML. Individual fields
/// that are missing or malformed (blank, or containing child elements) come
/// back as `None`.
pub fn parse(bytes: &[u8]) -> Result<PomMetadata> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| AppError::InvalidPomXml(format!("not valid UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, options)
        .map_err(|e| AppError::InvalidPomXml(e.to_string()))?;

    let project = doc.root_element();
    let ns = project.tag_name().namespace();

    if project.tag_name().name() != "project" {
        log::warn!(
            "POM root element is <{}>, expected <project>",
            project.tag_name().name()
        );
    }

    let parent = find_child(project, ns, "parent");

    let license = find_child(project, ns, "licenses").and_then(|licenses| {
        licenses
            .children()
            .filter(|n| is_element(n, ns, "license"))
            .find_map(|license| field(Some(license), ns, "name"))
    });

    let developers = find_child(project, ns, "developers").and_then(|developers| {
        let names: Vec<String> = developers
            .children()
            .filter(|n| is_element(n, ns, "developer"))
            .filter_map(|developer| field(Some(developer), ns, "name"))
            .collect();
        (!names.is_empty()).then(|| names.join(", "))
    });

    Ok(PomMetadata {
        parent_group_id: field(parent, ns, "groupId"),
        parent_artifact_id: field(parent, ns, "artifactId"),
        parent_version: field(parent, ns, "version"),
        description: field(Some(project), ns, "description"),
        project_url: field(Some(project), ns, "url"),
        license,
        developers,
    })
}

fn is_element(node: &Node, ns: Option<&str>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == ns
}

fn find_child<'a, 'input>(
    node: Node<'a, 'input>,
    ns: Option<&str>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_element(n, ns, name))
}

/// Trimmed text of a leaf element child, if any.
fn field(parent: Option<Node>, ns: Option<&str>, name: &str) -> Option<String> {
    let element = find_child(parent?, ns, name)?;
    if element.children().any(|c| c.is_element()) {
        return None;
    }
    let text: String = element
        .children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
