//! # Static mapping source
//!
//! A [`Resolve`] implementation backed by a declarative YAML file mapping
//! service names and versions to backend addresses:
//!
//! ```yaml
//! my.package.Service:
//!   v1: http://service-v1.internal:50051
//!   v2: http://service-v2.internal:50051
//! ```
//!
//! A file that cannot be read, parsed, or whose addresses are malformed loads
//! an EMPTY registry instead of failing startup: the gateway comes up knowing
//! no routes and logs a warning, rather than refusing to boot over a bad
//! mapping file. The registry is immutable after construction.
use super::Resolve;
use super::records::{InvalidServiceUrl, Records, ResolveError, ServiceUrl};
use std::collections::HashMap;
use std::path::Path;

/// Error raised while loading a mapping file. Recovered locally (empty
/// registry), never propagated out of the constructor.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read mapping file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse mapping file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error(transparent)]
    InvalidUrl(#[from] InvalidServiceUrl),
}

/// Service discovery over a static mapping of services to backend addresses.
pub struct StaticResolver {
    records: Records,
}

impl StaticResolver {
    /// Loads the mapping file at `path`. On any load failure the resolver
    /// starts empty and the failure is logged.
    pub fn from_mapping_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match load_records(path) {
            Ok(records) => Self { records },
            Err(err) => {
                tracing::warn!(
                    file = %path.display(),
                    error = %err,
                    "failed to load mapping file, starting with an empty registry"
                );
                Self::empty()
            }
        }
    }

    /// A resolver with no known routes.
    pub fn empty() -> Self {
        Self {
            records: Records::new(),
        }
    }

    /// The underlying registry.
    pub fn records(&self) -> &Records {
        &self.records
    }
}

fn load_records(path: &Path) -> Result<Records, LoadError> {
    let file = std::fs::File::open(path)?;
    let mapping: HashMap<String, HashMap<String, String>> = serde_yaml::from_reader(file)?;
    let records = Records::new();
    for (service, versions) in mapping {
        for (version, address) in versions {
            let url = address.parse::<ServiceUrl>()?;
            records.set_record(&service, &version, url);
        }
    }
    Ok(records)
}

impl Resolve for StaticResolver {
    fn resolve(&self, service: &str, version: &str) -> Result<ServiceUrl, ResolveError> {
        self.records.get_record(service, version).inspect_err(|err| {
            tracing::error!(service, version, error = %err, "failed to resolve service");
        })
    }
}
