use crate::models::ObjectHandle;
use std::net::SocketAddr;

/// `http` for a bare `IP:port` authority, `https` for everything else.
pub fn scheme_for_host(host: &str) -> &'static str {
    if host.parse::<SocketAddr>().is_ok() {
        "http"
    } else {
        "https"
    }
}

/// Public retrieval URL for a relayed object: `{scheme}://{host}/file/{handle}`.
pub fn public_object_url(host: &str, handle: &ObjectHandle) -> String {
    format!("{}://{}/file/{}", scheme_for_host(host), host, handle)
}
