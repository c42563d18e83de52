use ipnet::IpNet;
use psl::Type;
use regex::Regex;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

/// What an input indicator turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IocKind {
    Ip,
    Domain,
}

impl IocKind {
    /// Value type segment used by the rdata index (`/lookup/rdata/{type}/...`).
    pub fn rdata_type(self) -> &'static str {
        match self {
            IocKind::Ip => "ip",
            IocKind::Domain => "name",
        }
    }
}

impl fmt::Display for IocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IocKind::Ip => f.write_str("IP"),
            IocKind::Domain => f.write_str("Domain"),
        }
    }
}

/// A hostname split on its public suffix, e.g. `www.example.co.uk` becomes
/// `www` / `example` / `co.uk`. Parts that cannot be determined are empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostParts {
    pub subdomain: String,
    pub domain: String,
    pub suffix: String,
}

impl HostParts {
    /// `example.co.uk` for the example above, empty when either half is missing.
    pub fn registered_domain(&self) -> String {
        if self.domain.is_empty() || self.suffix.is_empty() {
            String::new()
        } else {
            format!("{}.{}", self.domain, self.suffix)
        }
    }
}

static LABELS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z\d-]{0,63}(\.[a-zA-Z\d-]{0,63})*$").expect("label pattern compiles")
});

/// Special-use blocks that never count as public routable addresses.
static SPECIAL_USE: LazyLock<Vec<IpNet>> = LazyLock::new(|| {
    let v4: [(Ipv4Addr, u8); 15] = [
        (Ipv4Addr::new(0, 0, 0, 0), 8),
        (Ipv4Addr::new(10, 0, 0, 0), 8),
        (Ipv4Addr::new(100, 64, 0, 0), 10),
        (Ipv4Addr::new(127, 0, 0, 0), 8),
        (Ipv4Addr::new(169, 254, 0, 0), 16),
        (Ipv4Addr::new(172, 16, 0, 0), 12),
        (Ipv4Addr::new(192, 0, 0, 0), 24),
        (Ipv4Addr::new(192, 0, 2, 0), 24),
        (Ipv4Addr::new(192, 88, 99, 0), 24),
        (Ipv4Addr::new(192, 168, 0, 0), 16),
        (Ipv4Addr::new(198, 18, 0, 0), 15),
        (Ipv4Addr::new(198, 51, 100, 0), 24),
        (Ipv4Addr::new(203, 0, 113, 0), 24),
        (Ipv4Addr::new(224, 0, 0, 0), 4),
        (Ipv4Addr::new(240, 0, 0, 0), 4),
    ];
    let v6: [(Ipv6Addr, u8); 10] = [
        (Ipv6Addr::UNSPECIFIED, 8),
        (Ipv6Addr::new(0, 0, 0, 0, 0, 0xffff, 0, 0), 96),
        (Ipv6Addr::new(0x64, 0xff9b, 1, 0, 0, 0, 0, 0), 48),
        (Ipv6Addr::new(0x100, 0, 0, 0, 0, 0, 0, 0), 64),
        (Ipv6Addr::new(0x2001, 0, 0, 0, 0, 0, 0, 0), 23),
        (Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0), 32),
        (Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7),
        (Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10),
        (Ipv6Addr::new(0xfec0, 0, 0, 0, 0, 0, 0, 0), 10),
        (Ipv6Addr::new(0xff00, 0, 0, 0, 0, 0, 0, 0), 8),
    ];

    v4.into_iter()
        .map(|(addr, len)| (IpAddr::V4(addr), len))
        .chain(v6.into_iter().map(|(addr, len)| (IpAddr::V6(addr), len)))
        .filter_map(|(addr, len)| IpNet::new(addr, len).ok())
        .collect()
});

pub fn is_public_ip(candidate: &str) -> bool {
    match candidate.trim().parse::<IpAddr>() {
        Ok(addr) => !SPECIAL_USE.iter().any(|net| net.contains(&addr)),
        Err(_) => false,
    }
}

/// Length of the longest ICANN suffix of `host`, 0 when there is none.
/// Private registrations (github.io, cloudfront.net, ...) are walked past
/// to the ICANN suffix underneath them.
fn icann_suffix_len(host: &str) -> usize {
    let mut candidate = host;
    while let Some(suffix) = psl::suffix(candidate.as_bytes()) {
        match suffix.typ() {
            Some(Type::Icann) => return suffix.as_bytes().len(),
            Some(Type::Private) => {
                let start = candidate.len() - suffix.as_bytes().len();
                match candidate.get(start..).and_then(|s| s.split_once('.')) {
                    Some((_, parent)) => candidate = parent,
                    None => return 0,
                }
            }
            None => return 0,
        }
    }
    0
}

/// Splits a hostname using the ICANN part of the Public Suffix List. For an
/// unlisted TLD the suffix stays empty and the last label becomes the domain.
pub fn split_host(host: &str) -> HostParts {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return HostParts::default();
    }

    let suffix_len = icann_suffix_len(&host);

    let (rest, suffix) = if suffix_len == 0 {
        (host.as_str(), "")
    } else if suffix_len >= host.len() {
        ("", host.as_str())
    } else {
        let split_at = host.len() - suffix_len;
        match (host.get(..split_at - 1), host.get(split_at..)) {
            (Some(rest), Some(suffix)) => (rest, suffix),
            _ => (host.as_str(), ""),
        }
    };

    let (subdomain, domain) = match rest.rsplit_once('.') {
        Some((sub, domain)) => (sub, domain),
        None => ("", rest),
    };

    HostParts {
        subdomain: subdomain.to_string(),
        domain: domain.to_string(),
        suffix: suffix.to_string(),
    }
}

pub fn is_valid_domain(candidate: &str) -> bool {
    let parts = split_host(candidate);
    if parts.domain.is_empty() || parts.suffix.is_empty() {
        return false;
    }

    LABELS.is_match(&format!("{}{}", parts.suffix, parts.domain))
}

pub fn classify(candidate: &str) -> Option<IocKind> {
    if is_public_ip(candidate) {
        Some(IocKind::Ip)
    } else if is_valid_domain(candidate) {
        Some(IocKind::Domain)
    } else {
        None
    }
}
