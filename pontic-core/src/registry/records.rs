//! # Records
//!
//! The in-memory mapping from a gRPC service to its backend hosts. It holds a
//! list of upstream addresses for each (service, version) pair, and implements
//! the disambiguation policy applied when a caller omits the version label.
//!
//! All access goes through a single reader/writer lock: reads (resolution,
//! existence checks) run concurrently, writes (topology changes) exclude
//! everything else. Writes are expected to be rare relative to reads.
use http::Uri;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

/// An opaque backend network address (`scheme://host:port`).
///
/// Immutable once constructed; two addresses are equal when their canonical
/// string forms are equal.
#[derive(Debug, Clone)]
pub struct ServiceUrl(Uri);

/// Error returned when a backend address string is not a valid URL.
#[derive(Debug, thiserror::Error)]
#[error("invalid backend address '{address}': {source}")]
pub struct InvalidServiceUrl {
    address: String,
    source: http::uri::InvalidUri,
}

impl ServiceUrl {
    pub fn parse(address: &str) -> Result<Self, InvalidServiceUrl> {
        let uri = address
            .parse::<Uri>()
            .map_err(|source| InvalidServiceUrl {
                address: address.to_owned(),
                source,
            })?;
        Ok(Self(uri))
    }

    pub fn uri(&self) -> &Uri {
        &self.0
    }
}

impl FromStr for ServiceUrl {
    type Err = InvalidServiceUrl;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        Self::parse(address)
    }
}

impl fmt::Display for ServiceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq for ServiceUrl {
    fn eq(&self, other: &Self) -> bool {
        // Canonical string form is the equality contract.
        self.0.to_string() == other.0.to_string()
    }
}

impl Eq for ServiceUrl {}

/// Reasons a `(service, version)` pair cannot be mapped to a single backend.
///
/// These are structured so the HTTP layer can map each kind to a protocol
/// status without parsing message text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The named service (or the named version of it) has no known backend.
    #[error("{}", unresolvable_message(.service, .version))]
    ServiceUnresolvable {
        service: String,
        version: Option<String>,
    },
    /// The caller omitted the version and more than one version exists.
    #[error("multiple versions of the gRPC service '{service}' are available, one must be specified")]
    VersionNotSpecified { service: String },
    /// The resolved version maps to more than one backend address.
    #[error("multiple backends found for the gRPC service '{service}', unable to decide between them")]
    VersionUndecidable { service: String },
}

fn unresolvable_message(service: &str, version: &Option<String>) -> String {
    match version {
        Some(version) => {
            format!("version '{version}' of the gRPC service '{service}' is unresolvable")
        }
        None => format!("the gRPC service '{service}' is unresolvable"),
    }
}

type Versions = HashMap<String, Vec<ServiceUrl>>;

/// Mapping from a gRPC service name and version label to backend addresses.
///
/// Empty entries never persist: removing the last address of a version prunes
/// the version, and removing the last version prunes the service.
#[derive(Debug, Default)]
pub struct Records {
    inner: RwLock<HashMap<String, Versions>>,
}

impl Records {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the backend address of the specified `(service, version)` pair.
    ///
    /// An empty `version` succeeds only when the service has exactly one known
    /// version; a resolved version with more than one address is rejected
    /// rather than picked from arbitrarily.
    pub fn get_record(&self, service: &str, version: &str) -> Result<ServiceUrl, ResolveError> {
        let map = self.inner.read().expect("records lock poisoned");
        let versions = map
            .get(service)
            .ok_or_else(|| ResolveError::ServiceUnresolvable {
                service: service.to_owned(),
                version: None,
            })?;
        let entries = if version.is_empty() {
            let mut candidates = versions.values();
            match (candidates.next(), candidates.next()) {
                (Some(entries), None) => entries,
                _ => {
                    return Err(ResolveError::VersionNotSpecified {
                        service: service.to_owned(),
                    });
                }
            }
        } else {
            versions
                .get(version)
                .ok_or_else(|| ResolveError::ServiceUnresolvable {
                    service: service.to_owned(),
                    version: Some(version.to_owned()),
                })?
        };
        match entries.as_slice() {
            [url] => Ok(url.clone()),
            _ => Err(ResolveError::VersionUndecidable {
                service: service.to_owned(),
            }),
        }
    }

    /// Appends `url` to the address list of the `(service, version)` pair,
    /// creating intermediate entries as needed. Always succeeds.
    ///
    /// Duplicate addresses are kept: a discovery backend implementing update
    /// semantics must remove the stale entry first, or repeated registrations
    /// will accumulate and make the version undecidable.
    pub fn set_record(&self, service: &str, version: &str, url: ServiceUrl) -> bool {
        let mut map = self.inner.write().expect("records lock poisoned");
        map.entry(service.to_owned())
            .or_default()
            .entry(version.to_owned())
            .or_default()
            .push(url);
        true
    }

    /// Removes every entry equal to `url` from the `(service, version)` list.
    ///
    /// Unknown services or versions are a no-op; emptied entries are pruned.
    pub fn remove_record(&self, service: &str, version: &str, url: &ServiceUrl) {
        let mut map = self.inner.write().expect("records lock poisoned");
        let Some(versions) = map.get_mut(service) else {
            return;
        };
        let Some(entries) = versions.get_mut(version) else {
            return;
        };
        entries.retain(|entry| entry != url);
        if entries.is_empty() {
            versions.remove(version);
        }
        if versions.is_empty() {
            map.remove(service);
        }
    }

    /// Returns true iff the service has exactly one known version.
    pub fn is_service_unique(&self, service: &str) -> bool {
        let map = self.inner.read().expect("records lock poisoned");
        map.get(service).is_some_and(|versions| versions.len() == 1)
    }

    /// Returns true iff the `(service, version)` pair has at least one address.
    pub fn record_exists(&self, service: &str, version: &str) -> bool {
        let map = self.inner.read().expect("records lock poisoned");
        map.get(service)
            .and_then(|versions| versions.get(version))
            .is_some_and(|entries| !entries.is_empty())
    }

    /// Drops every mapping, used by dynamic discovery backends for a full
    /// resync.
    pub fn clear_records(&self) {
        let mut map = self.inner.write().expect("records lock poisoned");
        map.clear();
    }
}
