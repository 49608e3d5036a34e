// SPDX-License-Identifier: MIT OR Apache-2.0
//! Code templates attached to block types.
//!
//! A template is parsed once into segments and rendered per block instance.
//! Placeholders use the `${name}` form:
//! - `${app_name}` expands to the manifest app id
//! - `${next_code}` expands to the code of the block on the `next` flow port
//! - any other name expands to the block property of that name

use crate::port::PropertyValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Placeholder name for the app identifier
pub const APP_NAME_PLACEHOLDER: &str = "app_name";

/// Placeholder name for the flow continuation
pub const CONTINUATION_PLACEHOLDER: &str = "next_code";

/// A parsed template piece
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    /// Text copied verbatim
    Literal(String),
    /// App identifier reference
    AppName,
    /// Block property reference
    Property(String),
    /// Continuation reference
    Continuation,
}

/// A parsed code template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template text into segments
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(start) = rest.find("${") {
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                break;
            };

            literal.push_str(&rest[..start]);
            let name = &after[..end];
            let segment = match name {
                APP_NAME_PLACEHOLDER => Segment::AppName,
                CONTINUATION_PLACEHOLDER => Segment::Continuation,
                _ => Segment::Property(name.to_string()),
            };
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(segment);
            rest = &after[end + 1..];
        }

        // Unterminated placeholders stay literal
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Get the parsed segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether the template produces no text at all
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the template has a continuation placeholder
    pub fn references_continuation(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Continuation))
    }

    /// Names of the properties referenced by this template, in order of first use
    pub fn property_refs(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Property(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Render the template for one block.
    ///
    /// Property references without a value on the block are left in place
    /// as `${name}`.
    pub fn render(
        &self,
        app_name: &str,
        properties: &IndexMap<String, PropertyValue>,
        continuation: &str,
    ) -> String {
        render_segments(&self.segments, app_name, properties, continuation)
    }

    /// Render the text before and after the continuation placeholder.
    ///
    /// Returns `None` unless the template references the continuation
    /// exactly once.
    pub fn render_around(
        &self,
        app_name: &str,
        properties: &IndexMap<String, PropertyValue>,
    ) -> Option<(String, String)> {
        let mut positions = self
            .segments
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s, Segment::Continuation))
            .map(|(i, _)| i);
        let at = positions.next()?;
        if positions.next().is_some() {
            return None;
        }

        let (head, tail) = self.segments.split_at(at);
        Some((
            render_segments(head, app_name, properties, ""),
            render_segments(&tail[1..], app_name, properties, ""),
        ))
    }
}

fn render_segments(
    segments: &[Segment],
    app_name: &str,
    properties: &IndexMap<String, PropertyValue>,
    continuation: &str,
) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::AppName => out.push_str(app_name),
            Segment::Continuation => out.push_str(continuation),
            Segment::Property(name) => match properties.get(name) {
                Some(value) => out.push_str(&value.render()),
                None => {
                    out.push_str("${");
                    out.push_str(name);
                    out.push('}');
                }
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segments() {
        let template = Template::parse("LOG(${msg});${next_code}");
        assert_eq!(
            template.segments(),
            &[
                Segment::Literal("LOG(".to_string()),
                Segment::Property("msg".to_string()),
                Segment::Literal(");".to_string()),
                Segment::Continuation,
            ]
        );
        assert!(template.references_continuation());
        assert_eq!(template.property_refs(), vec!["msg"]);
    }

    #[test]
    fn test_unterminated_placeholder_is_literal() {
        let template = Template::parse("a ${b");
        assert_eq!(template.segments(), &[Segment::Literal("a ${b".to_string())]);
    }

    #[test]
    fn test_empty_template() {
        assert!(Template::parse("").is_empty());
        assert!(!Template::parse("x").is_empty());
    }

    #[test]
    fn test_render() {
        let template = Template::parse("${app_name}: ${msg} ${flag} ${count} ${missing}${next_code}");
        let mut props = IndexMap::new();
        props.insert("msg".to_string(), PropertyValue::from("hi"));
        props.insert("flag".to_string(), PropertyValue::Bool(true));
        props.insert("count".to_string(), PropertyValue::from(3));

        let out = template.render("demo", &props, " NEXT");
        assert_eq!(out, "demo: \"hi\" true 3 ${missing} NEXT");
    }

    #[test]
    fn test_repeated_placeholders() {
        let template = Template::parse("${x}+${x}=${next_code}${next_code}");
        let mut props = IndexMap::new();
        props.insert("x".to_string(), PropertyValue::from(1));
        assert_eq!(template.render("a", &props, "n"), "1+1=nn");
        assert_eq!(template.property_refs(), vec!["x"]);
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let template = Template::parse("${msg}");
        let mut props = IndexMap::new();
        props.insert("msg".to_string(), PropertyValue::from("${next_code}"));
        assert_eq!(template.render("a", &props, "NEXT"), "\"${next_code}\"");
    }

    #[test]
    fn test_render_around_continuation() {
        let template = Template::parse("for(${n}) {\n${next_code}\n}");
        let mut props = IndexMap::new();
        props.insert("n".to_string(), PropertyValue::from(2));

        let (open, close) = template.render_around("a", &props).unwrap();
        assert_eq!(open, "for(2) {\n");
        assert_eq!(close, "\n}");
        assert_eq!(format!("{open}X{close}"), template.render("a", &props, "X"));

        assert!(Template::parse("LOG;").render_around("a", &props).is_none());
        assert!(Template::parse("${next_code}${next_code}").render_around("a", &props).is_none());
    }
}
