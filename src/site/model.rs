//! Site configuration data model.

use serde::{Deserialize, Deserializer, Serialize};

/// Where a configuration unit lives on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageClass {
    /// Staging tree; a unit is active only while an activation link exists.
    #[default]
    #[serde(rename = "sites-available")]
    Available,
    /// Always-active tree.
    #[serde(rename = "conf.d")]
    Immediate,
}

impl StorageClass {
    /// Both classes in scan order.
    pub const ALL: [StorageClass; 2] = [StorageClass::Available, StorageClass::Immediate];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::Available => "sites-available",
            StorageClass::Immediate => "conf.d",
        }
    }
}

impl std::fmt::Display for StorageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One virtual-host definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationUnit {
    /// Unique key within a storage class.
    #[serde(deserialize_with = "words")]
    pub server_name: String,

    /// Value of the `listen` directive.
    #[serde(deserialize_with = "words")]
    pub listen: String,

    /// Document root, empty when absent.
    #[serde(default)]
    pub root: String,

    /// Location blocks in file order.
    #[serde(default)]
    pub locations: Vec<LocationRule>,

    /// SSL settings, present only when certificate, key and protocols are all set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<SslInfo>,

    /// True iff an activation link exists (always true for `Immediate`).
    #[serde(default)]
    pub enabled: bool,

    /// Source tree the unit was read from.
    #[serde(default, rename = "source")]
    pub storage_class: StorageClass,
}

impl ConfigurationUnit {
    /// Create a unit with no root, locations or SSL.
    ///
    /// `server_name` and `listen` are word lists; runs of whitespace collapse
    /// to a single space.
    pub fn new(server_name: impl Into<String>, listen: impl Into<String>) -> Self {
        Self {
            server_name: normalize_words(&server_name.into()),
            listen: normalize_words(&listen.into()),
            root: String::new(),
            locations: Vec::new(),
            ssl: None,
            enabled: false,
            storage_class: StorageClass::default(),
        }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_location(mut self, location: LocationRule) -> Self {
        self.locations.push(location);
        self
    }
}

/// A `location` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRule {
    /// Match prefix or pattern (modifier included, e.g. `~ \.php$`).
    #[serde(deserialize_with = "words")]
    pub path: String,

    /// Upstream address from `proxy_pass`. Never blank.
    #[serde(
        default,
        rename = "proxy_pass",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_blank"
    )]
    pub proxy_target: Option<String>,

    /// Port derived from `proxy_target`; never set by hand.
    #[serde(default, skip_deserializing)]
    pub proxy_port: Option<u16>,
}

impl LocationRule {
    /// A location that serves locally.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: normalize_words(&path.into()),
            proxy_target: None,
            proxy_port: None,
        }
    }

    /// A location that forwards to `target`; the port is derived from it.
    /// A blank target leaves the location unproxied.
    pub fn proxied(path: impl Into<String>, target: impl Into<String>) -> Self {
        let mut rule = Self::new(path);
        rule.proxy_target = Some(target.into()).filter(|t| !t.trim().is_empty());
        rule.refresh_port();
        rule
    }

    /// Recompute `proxy_port` from `proxy_target`.
    pub fn refresh_port(&mut self) {
        self.proxy_port = self.proxy_target.as_deref().and_then(upstream_port);
    }
}

/// TLS material referenced by a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslInfo {
    #[serde(rename = "certificate")]
    pub certificate_path: String,
    #[serde(rename = "certificate_key")]
    pub certificate_key_path: String,
    /// Declared protocols, declaration order, no duplicates.
    pub protocols: Vec<String>,
}

/// Collapse whitespace runs to single spaces and trim both ends.
pub fn normalize_words(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn words<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = String::deserialize(deserializer)?;
    Ok(normalize_words(&value))
}

fn non_blank<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

/// Extract the trailing `:port` of an upstream address.
///
/// Handles `scheme://host:port/path`, bracketed IPv6 hosts and bare
/// `host:port`. Returns `None` for missing or non-numeric ports, unix
/// sockets and variables.
pub fn upstream_port(target: &str) -> Option<u16> {
    let rest = match target.find("://") {
        Some(idx) => &target[idx + 3..],
        None => target,
    };
    let authority = rest.split('/').next().unwrap_or(rest);

    let port = if let Some(stripped) = authority.strip_prefix('[') {
        let (_, after) = stripped.split_once(']')?;
        after.strip_prefix(':')?
    } else {
        let (_, port) = authority.rsplit_once(':')?;
        port
    };

    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    port.parse().ok()
}
