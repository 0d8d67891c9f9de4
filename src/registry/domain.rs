//! Registrable domain derivation.

use std::net::IpAddr;

/// Multi-label public suffixes under which registrations happen one level down.
///
/// Hosts under any other suffix fall back to their last two labels.
static MULTI_LABEL_SUFFIXES: &[&str] = &[
    // United Kingdom
    "co.uk", "org.uk", "me.uk", "ltd.uk", "plc.uk", "net.uk", "ac.uk", "gov.uk", "sch.uk",
    // Australia
    "com.au", "net.au", "org.au", "edu.au", "gov.au", "asn.au", "id.au",
    // New Zealand
    "co.nz", "net.nz", "org.nz", "ac.nz", "govt.nz", "geek.nz",
    // Japan
    "co.jp", "ne.jp", "or.jp", "ac.jp", "go.jp", "gr.jp",
    // Brazil
    "com.br", "net.br", "org.br", "gov.br", "edu.br",
    // India
    "co.in", "net.in", "org.in", "firm.in", "gen.in", "ind.in",
    // South Africa
    "co.za", "org.za", "net.za", "gov.za",
    // China, Hong Kong, Taiwan
    "com.cn", "net.cn", "org.cn", "gov.cn", "com.hk", "org.hk", "com.tw", "org.tw",
    // Other common second-level registries
    "com.mx", "com.ar", "com.co", "com.tr", "com.sg", "com.my", "com.ph", "co.kr",
    "co.il", "co.id", "com.ua", "com.pl", "co.at", "or.at",
];

/// Derive the unit of registration for `host`.
///
/// `a.b.co.uk` becomes `b.co.uk`; `www.example.com` becomes `example.com`.
/// IP literals have no registrable domain.
pub fn registrable_domain(host: &str) -> Option<String> {
    let host = host.trim().trim_end_matches('.').to_lowercase();
    if host.is_empty() || host.parse::<IpAddr>().is_ok() {
        return None;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.iter().any(|l| l.is_empty()) {
        return None;
    }
    if labels.len() <= 2 {
        return Some(host);
    }

    let take = match MULTI_LABEL_SUFFIXES
        .iter()
        .find(|suffix| host.ends_with(&format!(".{}", suffix)))
    {
        Some(suffix) => suffix.split('.').count() + 1,
        None => 2,
    };

    let start = labels.len().saturating_sub(take);
    Some(labels[start..].join("."))
}
