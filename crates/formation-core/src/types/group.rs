use serde::{Deserialize, Serialize};

/// Desired (or reported) properties of a node-group.
///
/// Serializes to the admin API's group document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDescriptor {
    /// Group name
    #[serde(rename = "group-name")]
    pub name: String,

    /// Encrypt XDQP traffic within the group
    #[serde(rename = "xdqp-ssl-enabled", default)]
    pub xdqp_ssl_enabled: bool,
}

impl GroupDescriptor {
    /// Create a new descriptor
    pub fn new(name: impl Into<String>, xdqp_ssl_enabled: bool) -> Self {
        Self {
            name: name.into(),
            xdqp_ssl_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(GroupDescriptor::new("enode", true)).unwrap();
        assert_eq!(json, serde_json::json!({"group-name": "enode", "xdqp-ssl-enabled": true}));
    }

    #[test]
    fn test_reported_properties_ignore_extra_fields() {
        let reported: GroupDescriptor = serde_json::from_str(
            r#"{"group-name":"Default","list-cache-size":3072,"xdqp-ssl-enabled":false}"#,
        )
        .unwrap();
        assert_eq!(reported, GroupDescriptor::new("Default", false));
    }
}
