//! Connection configuration for the backing query engine.

use std::fmt;

/// The five values required to reach the ADX cluster.
///
/// All five must be present; if any is missing the process runs in degraded
/// mode and live queries are disabled.
#[derive(Clone)]
pub struct AdxConfig {
    /// Cluster URI, e.g. `https://mycluster.region.kusto.windows.net`
    pub cluster: String,

    /// Database name within the cluster
    pub database: String,

    /// AAD application (client) id
    pub client_id: String,

    /// AAD application secret
    pub client_secret: String,

    /// AAD tenant id
    pub tenant_id: String,
}

impl fmt::Debug for AdxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdxConfig")
            .field("cluster", &self.cluster)
            .field("database", &self.database)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

impl AdxConfig {
    /// Read the connection values from the environment. Returns `None` when
    /// any of the five is missing or empty.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config through an arbitrary lookup, the seam used by
    /// `from_env` and by tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let nonempty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let cluster = nonempty("ADX_CLUSTER_URI").or_else(|| nonempty("ADX_CLUSTER_URL"))?;

        Some(Self {
            cluster,
            database: nonempty("ADX_DATABASE")?,
            client_id: nonempty("ADX_CLIENT_ID")?,
            client_secret: nonempty("ADX_CLIENT_SECRET")?,
            tenant_id: nonempty("ADX_TENANT_ID")?,
        })
    }
}
