use crate::topology::{NodeRecord, NodeType, ServiceStatus};
use crate::util::display_or;

pub const NO_DATA: &str = "No data";
const UNKNOWN: &str = "Unknown";
const UNNAMED_DEVICE: &str = "Device";

fn status_label(online: bool) -> &'static str {
    if online { "Online" } else { "Offline" }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceRow {
    pub name: String,
    pub ip: String,
    pub mac: String,
    pub is_up: bool,
}

impl InterfaceRow {
    pub fn state_label(&self) -> &'static str {
        if self.is_up { "Up" } else { "Down" }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceRow {
    pub port: String,
    pub protocol: String,
    pub name: String,
    pub open: bool,
}

impl ServiceRow {
    pub fn state_label(&self) -> &'static str {
        if self.open { "Open" } else { "Closed" }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeviceDetails {
    pub id: String,
    pub name: String,
    pub node_type: NodeType,
    pub online: bool,
    pub ip: String,
    pub mac: String,
    pub vendor: String,
    pub scan_target: Option<String>,
    pub interfaces: Vec<InterfaceRow>,
    pub services: Vec<ServiceRow>,
}

impl DeviceDetails {
    pub fn type_name(&self) -> &'static str {
        self.node_type.display_name()
    }

    pub fn status_label(&self) -> &'static str {
        status_label(self.online)
    }
}

impl From<&NodeRecord> for DeviceDetails {
    fn from(node: &NodeRecord) -> Self {
        let interfaces = node
            .interfaces
            .iter()
            .map(|interface| InterfaceRow {
                name: display_or(interface.name.as_deref(), UNKNOWN).to_owned(),
                ip: display_or(interface.ip.as_deref(), NO_DATA).to_owned(),
                mac: display_or(interface.mac.as_deref(), NO_DATA).to_owned(),
                is_up: interface.is_up,
            })
            .collect();

        let services = node
            .services
            .iter()
            .map(|service| ServiceRow {
                port: service
                    .port
                    .map_or_else(|| NO_DATA.to_owned(), |port| port.to_string()),
                protocol: display_or(service.protocol.as_deref(), NO_DATA).to_owned(),
                name: display_or(service.name.as_deref(), UNKNOWN).to_owned(),
                open: service.status == ServiceStatus::Open,
            })
            .collect();

        Self {
            id: node.id.clone(),
            name: display_or(node.name.as_deref(), UNNAMED_DEVICE).to_owned(),
            node_type: node.node_type,
            online: node.status.is_online(),
            ip: display_or(node.ip.as_deref(), NO_DATA).to_owned(),
            mac: display_or(node.mac.as_deref(), NO_DATA).to_owned(),
            vendor: display_or(node.vendor.as_deref(), NO_DATA).to_owned(),
            scan_target: node
                .ip
                .as_deref()
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_owned),
            interfaces,
            services,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeviceRow {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub mac: String,
    pub type_name: &'static str,
    pub online: bool,
}

impl DeviceRow {
    pub fn status_label(&self) -> &'static str {
        status_label(self.online)
    }

    pub fn search_text(&self) -> String {
        format!("{} {} {}", self.name, self.ip, self.mac)
    }
}

impl From<&NodeRecord> for DeviceRow {
    fn from(node: &NodeRecord) -> Self {
        Self {
            id: node.id.clone(),
            name: display_or(node.name.as_deref(), UNNAMED_DEVICE).to_owned(),
            ip: display_or(node.ip.as_deref(), NO_DATA).to_owned(),
            mac: display_or(node.mac.as_deref(), NO_DATA).to_owned(),
            type_name: node.node_type.display_name(),
            online: node.status.is_online(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{InterfaceInfo, NodeStatus, ServiceInfo};

    #[test]
    fn missing_fields_render_as_no_data() {
        let node = NodeRecord::new("n7", NodeType::Server);
        let details = DeviceDetails::from(&node);

        assert_eq!(details.name, "Device");
        assert_eq!(details.ip, NO_DATA);
        assert_eq!(details.mac, NO_DATA);
        assert_eq!(details.vendor, NO_DATA);
        assert_eq!(details.type_name(), "Server");
        assert_eq!(details.status_label(), "Offline");
        assert_eq!(details.scan_target, None);
        assert!(details.interfaces.is_empty());
        assert!(details.services.is_empty());
    }

    #[test]
    fn interface_and_service_rows_are_filled() {
        let mut node = NodeRecord::new("r1", NodeType::Router);
        node.name = Some("Core".to_owned());
        node.status = NodeStatus::Online;
        node.ip = Some("192.168.1.1".to_owned());
        node.interfaces = vec![InterfaceInfo {
            name: Some("eth0".to_owned()),
            ip: None,
            mac: Some("aa:bb:cc:dd:ee:ff".to_owned()),
            is_up: true,
        }];
        node.services = vec![ServiceInfo {
            port: Some(22),
            protocol: Some("tcp".to_owned()),
            name: None,
            status: ServiceStatus::Open,
        }];

        let details = DeviceDetails::from(&node);
        assert_eq!(details.scan_target.as_deref(), Some("192.168.1.1"));
        assert_eq!(details.interfaces[0].ip, NO_DATA);
        assert_eq!(details.interfaces[0].state_label(), "Up");
        assert_eq!(details.services[0].port, "22");
        assert_eq!(details.services[0].name, "Unknown");
        assert_eq!(details.services[0].state_label(), "Open");

        let row = DeviceRow::from(&node);
        assert_eq!(row.mac, NO_DATA);
        assert_eq!(row.search_text(), "Core 192.168.1.1 No data");
        assert_eq!(row.status_label(), "Online");
    }
}
