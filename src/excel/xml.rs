//! Small quick-xml helpers shared by the package part readers

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, BytesText};
use quick_xml::Reader;

/// Reader over an in-memory part, whitespace preserved
pub(crate) fn reader(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader
}

/// Attribute value by local name (`r:id` matches `id`), entities resolved
pub(crate) fn attr(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Character data between entity references
pub(crate) fn text(e: &BytesText<'_>) -> quick_xml::Result<String> {
    Ok(e.decode()?.into_owned())
}

/// Replacement text of a `&...;` reference
///
/// Character references and the five predefined entities resolve; anything
/// else is kept verbatim.
pub(crate) fn general_ref(e: &BytesRef<'_>) -> quick_xml::Result<String> {
    if let Some(ch) = e.resolve_char_ref()? {
        return Ok(ch.to_string());
    }
    let name = e.decode()?;
    Ok(match resolve_predefined_entity(&name) {
        Some(value) => value.to_string(),
        None => format!("&{};", name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;

    fn collect(xml: &str) -> String {
        let mut reader = reader(xml);
        let mut out = String::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Text(e) => out.push_str(&text(&e).unwrap()),
                Event::GeneralRef(e) => out.push_str(&general_ref(&e).unwrap()),
                Event::Eof => break,
                _ => {}
            }
        }
        out
    }

    #[test]
    fn test_predefined_entities() {
        assert_eq!(collect("<t>P&amp;L</t>"), "P&L");
        assert_eq!(collect("<t>&lt;&gt;&quot;&apos;</t>"), "<>\"'");
    }

    #[test]
    fn test_character_references() {
        assert_eq!(collect("<t>N&#176;</t>"), "N°");
        assert_eq!(collect("<t>N&#xBA; 3</t>"), "Nº 3");
    }

    #[test]
    fn test_escaped_reference_is_not_decoded_twice() {
        assert_eq!(collect("<t>&amp;lt;x&amp;#65;</t>"), "&lt;x&#65;");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(collect("<t>&bogus;</t>"), "&bogus;");
    }

    #[test]
    fn test_attr_unescapes_value() {
        let mut reader = reader(r#"<numFmt r:id="x" formatCode="&quot;$&quot;#,##0"/>"#);
        let Event::Empty(e) = reader.read_event().unwrap() else {
            panic!("expected empty element");
        };
        assert_eq!(attr(&e, b"formatCode").as_deref(), Some("\"$\"#,##0"));
        assert_eq!(attr(&e, b"id").as_deref(), Some("x"));
        assert_eq!(attr(&e, b"missing"), None);
    }
}
