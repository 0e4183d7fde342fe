//! Connection URL construction shared by both backends.
//!
//! Renders `scheme://host[:port][/database][?key=value&...]`. The port is left
//! out when it equals the backend default and the query segment is written
//! only for a non-empty property bag. Credentials never appear in the URL.

use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::{Position, Url};

use crate::{Error, Result};

/// Everything outside the RFC 3986 unreserved set is escaped in query keys and values.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Server location of a store plus the driver options carried in its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAddress {
    url: Url,
}

impl StoreAddress {
    /// Build the address, validating host and port.
    pub fn new(
        scheme: &str,
        host: &str,
        port: u16,
        default_port: u16,
        database: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(Error::config("host must not be empty"));
        }
        if port == 0 {
            return Err(Error::config("port must be greater than zero"));
        }

        let mut url = Url::parse(&format!("{scheme}://{host}"))?;
        if url.host_str().is_none() || carries_more_than_host(&url) {
            return Err(Error::config(format!("invalid host: {host}")));
        }

        if port != default_port {
            url.set_port(Some(port))
                .map_err(|()| Error::config(format!("cannot set port {port} on {scheme} URL")))?;
        }

        if !database.is_empty() {
            url.set_path(&format!("/{database}"));
        }

        if !properties.is_empty() {
            url.set_query(Some(&encode_query(properties)));
        }

        Ok(Self { url })
    }

    pub const fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Explicit port, `None` when the backend default applies.
    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }

    /// `host[:port][/database]` without scheme or query.
    pub fn server(&self) -> &str {
        &self.url[Position::BeforeHost..Position::AfterPath]
    }
}

/// A host string may not smuggle in a port, userinfo, path, query or fragment.
fn carries_more_than_host(url: &Url) -> bool {
    url.port().is_some()
        || !url.username().is_empty()
        || url.password().is_some()
        || !matches!(url.path(), "" | "/")
        || url.query().is_some()
        || url.fragment().is_some()
}

fn encode_query(properties: &BTreeMap<String, String>) -> String {
    properties
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, QUERY_COMPONENT),
                utf8_percent_encode(value, QUERY_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

impl fmt::Display for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
