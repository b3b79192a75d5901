//! XML request serialization for the Storage REST API.

/// Escapes special XML characters.
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Serializes a Put Block List body committing `block_ids` in order.
pub fn serialize_block_list(block_ids: &[String]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    xml.push_str("<BlockList>");
    for id in block_ids {
        xml.push_str(&format!("<Latest>{}</Latest>", xml_escape(id)));
    }
    xml.push_str("</BlockList>");
    xml
}
