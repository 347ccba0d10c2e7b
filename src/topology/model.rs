use std::fmt;

use log::warn;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::util::display_or;

pub const SIMULATION_KEYS: [&str; 5] = ["vx", "vy", "fx", "fy", "index"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum NodeType {
    Router,
    Switch,
    AccessPoint,
    Server,
    #[default]
    Device,
    Internet,
}

impl NodeType {
    pub const ALL: [NodeType; 6] = [
        Self::Router,
        Self::Switch,
        Self::AccessPoint,
        Self::Server,
        Self::Device,
        Self::Internet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::Switch => "switch",
            Self::AccessPoint => "access_point",
            Self::Server => "server",
            Self::Device => "device",
            Self::Internet => "internet",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Router => "Router",
            Self::Switch => "Switch",
            Self::AccessPoint => "Access point",
            Self::Server => "Server",
            Self::Device => "Device",
            Self::Internet => "Internet",
        }
    }
}

impl From<String> for NodeType {
    fn from(value: String) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .unwrap_or_default()
    }
}

impl From<NodeType> for String {
    fn from(value: NodeType) -> Self {
        value.as_str().to_owned()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum NodeStatus {
    Online,
    #[default]
    Offline,
}

impl NodeStatus {
    pub fn is_online(self) -> bool {
        self == Self::Online
    }
}

impl From<String> for NodeStatus {
    fn from(value: String) -> Self {
        if value == "online" {
            Self::Online
        } else {
            Self::Offline
        }
    }
}

impl From<NodeStatus> for String {
    fn from(value: NodeStatus) -> Self {
        match value {
            NodeStatus::Online => "online".to_owned(),
            NodeStatus::Offline => "offline".to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum LinkStatus {
    #[default]
    Active,
    Inactive,
}

impl From<String> for LinkStatus {
    fn from(value: String) -> Self {
        if value == "inactive" {
            Self::Inactive
        } else {
            Self::Active
        }
    }
}

impl From<LinkStatus> for String {
    fn from(value: LinkStatus) -> Self {
        match value {
            LinkStatus::Active => "active".to_owned(),
            LinkStatus::Inactive => "inactive".to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum DataFlow {
    #[default]
    None,
    Outgoing,
    Incoming,
}

impl From<String> for DataFlow {
    fn from(value: String) -> Self {
        match value.as_str() {
            "outgoing" => Self::Outgoing,
            "incoming" => Self::Incoming,
            _ => Self::None,
        }
    }
}

impl From<DataFlow> for String {
    fn from(value: DataFlow) -> Self {
        match value {
            DataFlow::None => "none",
            DataFlow::Outgoing => "outgoing",
            DataFlow::Incoming => "incoming",
        }
        .to_owned()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum ServiceStatus {
    Open,
    #[default]
    Closed,
}

impl From<String> for ServiceStatus {
    fn from(value: String) -> Self {
        if value == "open" {
            Self::Open
        } else {
            Self::Closed
        }
    }
}

impl From<ServiceStatus> for String {
    fn from(value: ServiceStatus) -> Self {
        match value {
            ServiceStatus::Open => "open".to_owned(),
            ServiceStatus::Closed => "closed".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub ip: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub mac: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_up: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(
        default,
        deserialize_with = "lenient_port",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub protocol: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_enum")]
    pub status: ServiceStatus,
}

/// A network entity as exchanged with the topology API.
///
/// Fields the console does not interpret are kept in `extra` and written back
/// untouched when the topology is saved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(deserialize_with = "entity_id")]
    pub id: String,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_enum")]
    pub node_type: NodeType,
    #[serde(default, deserialize_with = "lenient_enum")]
    pub status: NodeStatus,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub ip: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub mac: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub vendor: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub interfaces: Vec<InterfaceInfo>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub services: Vec<ServiceInfo>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub x: Option<f32>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub y: Option<f32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            name: None,
            node_type,
            status: NodeStatus::Offline,
            ip: None,
            mac: None,
            vendor: None,
            interfaces: Vec::new(),
            services: Vec::new(),
            x: None,
            y: None,
            extra: Map::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        display_or(self.name.as_deref(), &self.id)
    }

    pub fn short_label(&self) -> &str {
        match self.name.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => name,
            None => display_or(self.ip.as_deref(), &self.id),
        }
    }

    pub fn position(&self) -> Option<(f32, f32)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    #[serde(deserialize_with = "entity_id")]
    pub source: String,
    #[serde(deserialize_with = "entity_id")]
    pub target: String,
    #[serde(default, deserialize_with = "lenient_enum")]
    pub status: LinkStatus,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub bandwidth: Option<f64>,
    #[serde(rename = "dataFlow", default, deserialize_with = "lenient_enum")]
    pub data_flow: DataFlow,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LinkRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            status: LinkStatus::Active,
            bandwidth: None,
            data_flow: DataFlow::None,
            extra: Map::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    #[serde(default, deserialize_with = "lenient_list")]
    pub nodes: Vec<NodeRecord>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub links: Vec<LinkRecord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ScanOptions {
    pub scan_ports: bool,
    pub detect_vendors: bool,
    pub detect_services: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            scan_ports: true,
            detect_vendors: true,
            detect_services: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScanRequest<'a> {
    pub range: &'a str,
    pub options: ScanOptions,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScanTicket {
    #[serde(deserialize_with = "entity_id")]
    pub job_id: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScanJobState {
    #[default]
    Running,
    Completed,
    Failed,
}

impl From<String> for ScanJobState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Running,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DiscoveredDevice {
    #[serde(deserialize_with = "entity_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub mac: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub vendor: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_enum")]
    pub device_type: NodeType,
}

impl DiscoveredDevice {
    pub fn label(&self) -> String {
        let ip = display_or(self.ip.as_deref(), &self.id);
        let name = display_or(self.name.as_deref(), ip);
        format!("{name} ({ip})")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ScanStatusReport {
    #[serde(default, deserialize_with = "lenient_enum")]
    pub status: ScanJobState,
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress: f32,
    #[serde(default, deserialize_with = "lenient_list")]
    pub devices: Vec<DiscoveredDevice>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddDevicesRequest<'a> {
    pub devices: &'a [String],
    pub job_id: &'a str,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PingReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub time: Option<f64>,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

fn entity_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) if !id.is_empty() => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(D::Error::custom(format!("invalid entity id: {other}"))),
    }
}

fn lenient_enum<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String> + Default,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(raw)) => T::from(raw),
        _ => T::default(),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(
        Option::<Value>::deserialize(deserializer)?,
        Some(Value::Bool(true))
    ))
}

fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Number(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

fn lenient_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number.as_u64().and_then(|port| u16::try_from(port).ok()),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Keeps every entry that parses and drops the rest, so one malformed record
/// never hides the whole topology.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut parsed = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<T>(value) {
            Ok(entry) => parsed.push(entry),
            Err(error) => warn!("skipping malformed topology entry: {error}"),
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_node_type_falls_back_to_device() {
        let node: NodeRecord =
            serde_json::from_value(json!({"id": "n1", "type": "toaster"})).unwrap();
        assert_eq!(node.node_type, NodeType::Device);
        assert_eq!(node.status, NodeStatus::Offline);
        assert_eq!(node.display_name(), "n1");
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let link: LinkRecord =
            serde_json::from_value(json!({"source": 1, "target": "2", "bandwidth": 250}))
                .unwrap();
        assert_eq!(link.source, "1");
        assert_eq!(link.target, "2");
        assert_eq!(link.status, LinkStatus::Active);
        assert_eq!(link.data_flow, DataFlow::None);
        assert_eq!(link.bandwidth, Some(250.0));
    }

    #[test]
    fn malformed_entries_are_dropped_from_snapshot() {
        let snapshot: TopologySnapshot = serde_json::from_value(json!({
            "nodes": [{"id": "r1", "type": "router"}, {"name": "no id"}],
            "links": [{"source": "r1"}, {"source": "r1", "target": "d1", "dataFlow": "incoming"}]
        }))
        .unwrap();

        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.links.len(), 1);
        assert_eq!(snapshot.links[0].data_flow, DataFlow::Incoming);
    }

    #[test]
    fn malformed_details_do_not_hide_the_node() {
        let snapshot: TopologySnapshot = serde_json::from_value(json!({
            "nodes": [
                {"id": "r1", "type": "router"},
                {
                    "id": "srv",
                    "type": "server",
                    "name": 42,
                    "ip": ["10.0.0.2"],
                    "x": "left",
                    "interfaces": [{"name": "eth0", "is_up": "yes"}, "garbage"],
                    "services": [
                        {"port": "80", "protocol": "tcp", "status": "open"},
                        {"port": 70000, "name": "bogus"},
                        {"port": "ssh"}
                    ]
                }
            ],
            "links": [{"source": "r1", "target": "srv", "bandwidth": "fast"}]
        }))
        .unwrap();

        assert_eq!(snapshot.nodes.len(), 2);
        let server = &snapshot.nodes[1];
        assert_eq!(server.name.as_deref(), Some("42"));
        assert_eq!(server.ip, None);
        assert_eq!(server.x, None);
        assert_eq!(server.interfaces.len(), 1);
        assert!(!server.interfaces[0].is_up);

        let ports = server
            .services
            .iter()
            .map(|service| service.port)
            .collect::<Vec<_>>();
        assert_eq!(ports, vec![Some(80), None, None]);
        assert_eq!(server.services[0].status, ServiceStatus::Open);

        assert_eq!(snapshot.links.len(), 1);
        assert_eq!(snapshot.links[0].bandwidth, None);
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = json!({
            "id": "ap",
            "type": "access_point",
            "status": "online",
            "location": "attic",
            "interfaces": null
        });
        let node: NodeRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(node.extra.get("location"), Some(&json!("attic")));
        assert!(node.interfaces.is_empty());

        let written = serde_json::to_value(&node).unwrap();
        assert_eq!(written["type"], json!("access_point"));
        assert_eq!(written["status"], json!("online"));
        assert_eq!(written["location"], json!("attic"));
        assert!(written.get("interfaces").is_none());
    }

    #[test]
    fn position_requires_both_coordinates() {
        let mut node = NodeRecord::new("a", NodeType::Server);
        node.x = Some(4.0);
        assert_eq!(node.position(), None);
        node.y = Some(-2.0);
        assert_eq!(node.position(), Some((4.0, -2.0)));
    }

    #[test]
    fn scan_report_defaults_are_lenient() {
        let report: ScanStatusReport =
            serde_json::from_value(json!({"status": "completed", "progress": 100, "devices": [
                {"id": "dev-1", "ip": "192.168.1.20"},
                {"id": "dev-2", "ip": "192.168.1.21", "name": "printer"}
            ]}))
            .unwrap();

        assert_eq!(report.status, ScanJobState::Completed);
        assert_eq!(report.progress, 100.0);
        assert_eq!(report.devices[0].label(), "192.168.1.20 (192.168.1.20)");
        assert_eq!(report.devices[1].label(), "printer (192.168.1.21)");

        let running: ScanStatusReport = serde_json::from_value(json!({"progress": null})).unwrap();
        assert_eq!(running.status, ScanJobState::Running);
        assert_eq!(running.progress, 0.0);
    }
}
