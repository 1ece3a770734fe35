pub mod device;
pub mod name;
pub mod run;

pub use device::{InterfaceInfo, Neighbor, NeighborProtocol, SystemInfo, VlanMapping};
pub use name::{NameCandidate, NameSource};
pub use run::{DiscoveryRun, LogLevel, RunLog, RunScope, RunStats, RunStatus};
