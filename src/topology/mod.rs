mod api;
mod model;

pub use api::{ApiError, HttpTopologyApi, TopologyApi};
pub use model::{
    DataFlow, DiscoveredDevice, InterfaceInfo, LinkRecord, LinkStatus, NodeRecord, NodeStatus,
    NodeType, PingReport, SIMULATION_KEYS, ScanJobState, ScanOptions, ScanStatusReport,
    ScanTicket, ServiceInfo, ServiceStatus, TopologySnapshot,
};
