//! Parse and render configuration units.

use crate::site::model::{normalize_words, ConfigurationUnit, LocationRule, SslInfo};
use crate::site::scanner::{self, escape_value, escape_word, first_value, Directive};

const INDENT: &str = "    ";

/// Headers emitted for every proxied location.
const FORWARDING_HEADERS: [(&str, &str); 2] = [("Host", "$host"), ("X-Real-IP", "$remote_addr")];

/// Parse a configuration unit from site file text.
///
/// Returns `None` when `server_name` or `listen` is missing or blank; such files are
/// skipped by callers rather than treated as errors. Directives are read
/// from the first `server` block, or from the top level when the file has
/// no `server` block.
pub fn parse(text: &str) -> Option<ConfigurationUnit> {
    let tree = scanner::parse_directives(text);
    let scope = match scanner::find_block(&tree, "server") {
        Some(server) => server.children(),
        None => tree.as_slice(),
    };

    let server_name = required_words(scope, "server_name")?;
    let listen = required_words(scope, "listen")?;

    Some(ConfigurationUnit {
        server_name,
        listen,
        root: first_value(scope, "root").unwrap_or_default(),
        locations: scope.iter().filter_map(parse_location).collect(),
        ssl: parse_ssl(scope),
        enabled: false,
        storage_class: Default::default(),
    })
}

fn required_words(scope: &[Directive], name: &str) -> Option<String> {
    Some(normalize_words(&first_value(scope, name)?)).filter(|v| !v.is_empty())
}

fn parse_location(directive: &Directive) -> Option<LocationRule> {
    if directive.name != "location" || !directive.is_block() || directive.args.is_empty() {
        return None;
    }

    let mut rule = LocationRule::new(directive.value());
    rule.proxy_target = first_value(directive.children(), "proxy_pass");
    rule.refresh_port();
    Some(rule)
}

fn parse_ssl(scope: &[Directive]) -> Option<SslInfo> {
    let certificate_path = first_value(scope, "ssl_certificate")?;
    let certificate_key_path = first_value(scope, "ssl_certificate_key")?;
    let declared = scope
        .iter()
        .find(|d| !d.is_block() && d.name == "ssl_protocols" && !d.args.is_empty())?;

    let mut protocols: Vec<String> = Vec::with_capacity(declared.args.len());
    for protocol in &declared.args {
        if !protocols.contains(protocol) {
            protocols.push(protocol.clone());
        }
    }

    Some(SslInfo {
        certificate_path,
        certificate_key_path,
        protocols,
    })
}

/// Render a unit in canonical directive order.
///
/// `listen`, `server_name` and location paths are word lists; `root` and
/// `proxy_pass` are written as a single argument. SSL settings are not
/// emitted; certificates are layered onto existing files by the issuance
/// workflow.
pub fn render(unit: &ConfigurationUnit) -> String {
    let mut out = String::from("server {\n");
    push_directive(&mut out, 1, "listen", &escape_value(&unit.listen));
    push_directive(&mut out, 1, "server_name", &escape_value(&unit.server_name));
    if !unit.root.is_empty() {
        push_directive(&mut out, 1, "root", &escape_word(&unit.root));
    }

    for location in &unit.locations {
        out.push_str(INDENT);
        out.push_str("location ");
        out.push_str(&escape_value(&location.path));
        out.push_str(" {\n");

        if let Some(target) = location.proxy_target.as_deref().filter(|t| !t.trim().is_empty()) {
            push_directive(&mut out, 2, "proxy_pass", &escape_word(target));
            for (header, value) in FORWARDING_HEADERS {
                push_directive(&mut out, 2, "proxy_set_header", &format!("{} {}", header, value));
            }
        }

        out.push_str(INDENT);
        out.push_str("}\n");
    }

    out.push_str("}\n");
    out
}

/// Append `name args;` where `args` is already escaped.
fn push_directive(out: &mut String, depth: usize, name: &str, args: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(name);
    out.push(' ');
    out.push_str(args);
    out.push_str(";\n");
}
