//! Update descriptors (`update.xml`) pointing browsers at a container.

use crxpack_schema::CrxId;

/// Namespace of the update-check response format.
pub const UPDATE_NAMESPACE: &str = "http://www.google.com/update2/response";

/// Protocol version advertised on the root element.
pub const UPDATE_PROTOCOL: &str = "2.0";

/// Inputs needed to render one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDescriptor {
    /// Id of the package being advertised.
    pub crx_id: CrxId,
    /// Version from the manifest.
    pub version: String,
    /// Where the container can be downloaded.
    pub codebase: String,
}

impl UpdateDescriptor {
    /// Render as XML.
    pub fn render(&self) -> String {
        format!(
            "<?xml version='1.0' encoding='UTF-8'?>\n\
             <gupdate xmlns='{UPDATE_NAMESPACE}' protocol='{UPDATE_PROTOCOL}'>\n  \
             <app appid='{id}'>\n    \
             <updatecheck codebase='{codebase}' version='{version}' />\n  \
             </app>\n\
             </gupdate>\n",
            id = self.crx_id,
            codebase = escape_attr(&self.codebase),
            version = escape_attr(&self.version),
        )
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> CrxId {
        "jpfeocehjgpbcajnnbljhmhegadhhldc".parse().unwrap()
    }

    #[test]
    fn renders_expected_document() {
        let xml = UpdateDescriptor {
            crx_id: id(),
            version: "1.0".into(),
            codebase: "https://example.com/ext.crx".into(),
        }
        .render();

        assert_eq!(
            xml,
            "<?xml version='1.0' encoding='UTF-8'?>\n\
             <gupdate xmlns='http://www.google.com/update2/response' protocol='2.0'>\n  \
             <app appid='jpfeocehjgpbcajnnbljhmhegadhhldc'>\n    \
             <updatecheck codebase='https://example.com/ext.crx' version='1.0' />\n  \
             </app>\n\
             </gupdate>\n"
        );
    }

    #[test]
    fn escapes_attribute_values() {
        let xml = UpdateDescriptor {
            crx_id: id(),
            version: "1.0".into(),
            codebase: "https://example.com/get?a=1&b='2'".into(),
        }
        .render();
        assert!(xml.contains("codebase='https://example.com/get?a=1&amp;b=&apos;2&apos;'"));
    }
}
