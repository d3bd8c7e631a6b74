//! Typed readers for the admin API's XML replies.
//!
//! Only the fields the protocol acts on are extracted; everything else in
//! the documents is skipped. Element names are matched without namespace
//! prefixes.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{FormationError, Result};
use crate::types::TemplateCertificate;

fn xml_error(e: impl std::fmt::Display) -> FormationError {
    FormationError::Xml(e.to_string())
}

/// Text of the first element named `name`, if present and non-empty
pub fn element_text(xml: &str, name: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut inside = false;
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) if !inside && e.local_name().as_ref() == name.as_bytes() => {
                inside = true;
            }
            Event::Text(t) if inside => text.push_str(&t.unescape().map_err(xml_error)?),
            Event::CData(c) if inside => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(e) if inside && e.local_name().as_ref() == name.as_bytes() => {
                let text = text.trim();
                return Ok((!text.is_empty()).then(|| text.to_string()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// The group a host belongs to, from its properties document
pub fn host_group(xml: &str) -> Result<Option<String>> {
    element_text(xml, "group")
}

/// Certificates listed for a certificate template
pub fn template_certificates(xml: &str) -> Result<Vec<TemplateCertificate>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Field {
        Other,
        HostName,
        Temporary,
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut certs = Vec::new();
    let mut depth = 0usize;
    let mut field = Field::Other;
    let mut host_name = String::new();
    let mut temporary = String::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let local = e.local_name();
                if local.as_ref() == b"certificate" {
                    depth += 1;
                    if depth == 1 {
                        host_name.clear();
                        temporary.clear();
                    }
                } else if depth > 0 {
                    field = match local.as_ref() {
                        b"host-name" => Field::HostName,
                        b"temporary" => Field::Temporary,
                        _ => Field::Other,
                    };
                }
            }
            Event::Text(t) if depth > 0 && field != Field::Other => {
                let value = t.unescape().map_err(xml_error)?;
                match field {
                    Field::HostName => host_name.push_str(value.trim()),
                    Field::Temporary => temporary.push_str(value.trim()),
                    Field::Other => {}
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"certificate" && depth > 0 {
                    depth -= 1;
                    if depth == 0 && !host_name.is_empty() {
                        certs.push(TemplateCertificate {
                            host_name: host_name.clone(),
                            temporary: temporary.eq_ignore_ascii_case("true"),
                        });
                    }
                }
                field = Field::Other;
            }
            Event::Eof => return Ok(certs),
            _ => {}
        }
    }
}
