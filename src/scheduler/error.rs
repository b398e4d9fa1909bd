use thiserror::Error;

use crate::client::PreconditionError;
use crate::registry::RegistryError;

/// Why a pool run or single attempt did not reach the network (or had
/// nowhere to record its result).  Remote failures are not errors here:
/// they land as `Error` on the paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("a generation run is already in progress")]
    PoolBusy,

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
