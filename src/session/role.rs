use std::fmt;

use bytes::Bytes;
use tokio::time::sleep;
use tracing::info;

use super::ConnectionSession;
use crate::layout::output_root_path;
use crate::layout::ROOT_PATH;
use crate::Acl;
use crate::ConnectionConfig;
use crate::Result;

/// Which side of the deployment this process plays.
///
/// The role is fixed when the session is built and decides both how the
/// tree is bootstrapped and which subtree the store mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Owns the root: provisions `/` and `/output`, mirrors the whole tree,
    /// may overwrite any document
    Authority,
    /// Contributes its own cluster's documents; waits for the authority to
    /// provision the root and mirrors only its cluster subtree
    Feeder,
}

impl fmt::Display for Role {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Role::Authority => write!(f, "authority"),
            Role::Feeder => write!(f, "feeder"),
        }
    }
}

impl Role {
    pub(super) async fn bootstrap(
        &self,
        session: &ConnectionSession,
        config: &ConnectionConfig,
    ) -> Result<()> {
        match self {
            Role::Authority => {
                for path in [ROOT_PATH.to_string(), output_root_path()] {
                    if session
                        .create_if_absent(&path, Bytes::new(), &Acl::open_unsafe())
                        .await?
                    {
                        info!("Created {} under root {}", path, session.root());
                    }
                }
                Ok(())
            }
            Role::Feeder => {
                let interval = config.wait_for_root_interval();
                // No deadline: a feeder may start long before the authority
                while !session.exists(ROOT_PATH).await? {
                    info!(
                        "Root node {} is not present yet, going to sleep for {:?}",
                        session.root(),
                        interval
                    );
                    sleep(interval).await;
                }
                Ok(())
            }
        }
    }
}
