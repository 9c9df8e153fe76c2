use serde::Deserialize;
use serde::Serialize;

use crate::acl::parse_acls;
use crate::acl::Acl;
use crate::Error;
use crate::Result;

/// Cluster identity and the ACLs attached to every node this process creates
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Cluster identifier; required for feeders, optional for the authority
    #[serde(default)]
    pub name: String,

    /// ACL specification, e.g. `world:anyone:r,sasl:solr:cdrwa`.
    /// Blank means fully open.
    #[serde(default)]
    pub acls: String,
}

impl ClusterConfig {
    pub fn parsed_acls(&self) -> Result<Vec<Acl>> {
        Ok(parse_acls(&self.acls)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.contains('/') {
            return Err(Error::InvalidConfig(format!(
                "cluster.name must not contain '/', got '{}'",
                self.name
            )));
        }
        // Fail fast rather than run with the wrong permissions
        self.parsed_acls()?;
        Ok(())
    }
}
