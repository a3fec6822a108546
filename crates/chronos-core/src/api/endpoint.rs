//! Backend base URL selection.
//!
//! When the client runs against a loopback origin it talks to the local
//! development API; anywhere else the API is served from the origin itself.

use url::{Host, Url};

/// Whether `url` points at this machine.
pub fn is_loopback_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(addr)) => addr.is_loopback(),
        Some(Host::Ipv6(addr)) => addr.is_loopback(),
        None => false,
    }
}

/// Pick the base URL that `/api/...` paths are resolved against.
pub fn resolve_base_url(origin: &Url, dev_api: &Url) -> Url {
    if is_loopback_host(origin) {
        dev_api.clone()
    } else {
        origin.clone()
    }
}
