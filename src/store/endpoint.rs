use percent_encoding::percent_decode_str;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use url::{Host, Url};

use crate::errors::StoreError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const SCHEME: &str = "redis";
const TLS_SCHEME: &str = "rediss";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 6379;

// -----------------------------------------------------------------------------
// ----- Endpoint --------------------------------------------------------------

/// The connection string a session supplied, e.g.
/// `redis://:password@localhost:6379/2`. Kept secret because it may carry
/// credentials; equality is on the full string.
#[derive(Clone)]
pub struct Endpoint {
    raw: SecretString,
}

/// The parsed pieces of an [`Endpoint`].
#[derive(Clone, Debug)]
pub struct EndpointParts {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub db: u32,
}

// -----------------------------------------------------------------------------
// ----- Endpoint: Static ------------------------------------------------------

impl Endpoint {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: SecretString::new(raw.into().into_boxed_str()),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Endpoint: Public ------------------------------------------------------

impl Endpoint {
    pub fn is_blank(&self) -> bool {
        self.raw.expose_secret().trim().is_empty()
    }

    pub fn expose(&self) -> &str {
        self.raw.expose_secret()
    }

    /// `host:port/db` without credentials, for logs.
    pub fn redacted(&self) -> String {
        match self.parse() {
            Ok(parts) => format!("{}:{}/{}", parts.host, parts.port, parts.db),
            Err(_) => "<invalid endpoint>".to_string(),
        }
    }

    /// Accepts `redis://[[user]:password@]host[:port][/db]`.
    pub fn parse(&self) -> Result<EndpointParts, StoreError> {
        let raw = self.raw.expose_secret().trim();
        let url = Url::parse(raw).map_err(|e| invalid(format!("not a URL: {e}")))?;

        match url.scheme() {
            SCHEME => {}
            TLS_SCHEME => return Err(invalid("TLS endpoints (rediss://) are not supported")),
            _ => return Err(invalid("expected a redis:// URL")),
        }

        let host = match url.host() {
            Some(Host::Domain("")) | None => DEFAULT_HOST.to_string(),
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
        };
        let port = url.port().unwrap_or(DEFAULT_PORT);

        // Query parameters are not interpreted.
        let db = match url.path().trim_matches('/') {
            "" => 0,
            db => db
                .parse()
                .map_err(|_| invalid(format!("database index '{db}' is not a number")))?,
        };

        let username = non_empty(decode(url.username())?);
        let password = match url.password() {
            Some(password) => non_empty(decode(password)?).map(|p| SecretString::new(p.into_boxed_str())),
            None => None,
        };

        Ok(EndpointParts {
            host,
            port,
            username,
            password,
            db,
        })
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.raw.expose_secret() == other.raw.expose_secret()
    }
}

impl Eq for Endpoint {}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Endpoint").field(&self.redacted()).finish()
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn invalid(reason: impl Into<String>) -> StoreError {
    StoreError::InvalidEndpoint(reason.into())
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// Userinfo comes back from the URL still escaped. A `%` must introduce
/// exactly two hex digits.
fn decode(escaped: &str) -> Result<String, StoreError> {
    let bytes = escaped.as_bytes();
    let well_formed = memchr::memchr_iter(b'%', bytes).all(|at| {
        bytes
            .get(at + 1..at + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if !well_formed {
        return Err(invalid("bad percent-escape in credentials"));
    }

    percent_decode_str(escaped)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| invalid("credentials are not valid UTF-8"))
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
