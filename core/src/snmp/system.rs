use std::net::IpAddr;

use fathom_common::debug;
use fathom_common::models::SystemInfo;
use fathom_protocols::snmp::{ObjectId, VarBind};

use super::{NO_SUCH_NAME, SnmpClient, SnmpError, SnmpVersion, oid};

pub const SYS_DESCR: &[u64] = &[1, 3, 6, 1, 2, 1, 1, 1, 0];
pub const SYS_OBJECT_ID: &[u64] = &[1, 3, 6, 1, 2, 1, 1, 2, 0];
pub const SYS_CONTACT: &[u64] = &[1, 3, 6, 1, 2, 1, 1, 4, 0];
pub const SYS_NAME: &[u64] = &[1, 3, 6, 1, 2, 1, 1, 5, 0];
pub const SYS_LOCATION: &[u64] = &[1, 3, 6, 1, 2, 1, 1, 6, 0];

impl SnmpClient {
    /// Fetches the system group in one batched GET.
    ///
    /// A v1 agent rejects the whole batch with noSuchName when any one
    /// object is missing, so in that case each object is asked for on its
    /// own and the missing ones stay `None`.
    pub async fn get_system(&self, target: IpAddr) -> Result<SystemInfo, SnmpError> {
        let oids: Vec<ObjectId> = [SYS_NAME, SYS_DESCR, SYS_OBJECT_ID, SYS_CONTACT, SYS_LOCATION]
            .iter()
            .map(|arcs| oid(arcs))
            .collect();

        let rows = match self.get(target, &oids).await {
            Ok(rows) => rows,
            Err(SnmpError::Agent { status: NO_SUCH_NAME, .. })
                if self.version() == SnmpVersion::V1 =>
            {
                debug!("{target} rejected batched system GET, retrying per object");
                self.get_each(target, &oids).await?
            }
            Err(err) => return Err(err),
        };

        Ok(system_info(&rows))
    }

    async fn get_each(
        &self,
        target: IpAddr,
        oids: &[ObjectId],
    ) -> Result<Vec<VarBind>, SnmpError> {
        let mut rows = Vec::with_capacity(oids.len());
        for oid in oids {
            match self.get(target, std::slice::from_ref(oid)).await {
                Ok(found) => rows.extend(found),
                Err(SnmpError::Agent { status: NO_SUCH_NAME, .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(rows)
    }
}

fn system_info(rows: &[VarBind]) -> SystemInfo {
    let text = |arcs: &[u64]| {
        rows.iter()
            .find(|vb| vb.oid.arcs() == arcs)
            .and_then(|vb| vb.value.as_text())
    };
    SystemInfo {
        sys_name: text(SYS_NAME),
        sys_descr: text(SYS_DESCR),
        sys_object_id: text(SYS_OBJECT_ID),
        sys_contact: text(SYS_CONTACT),
        sys_location: text(SYS_LOCATION),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snmp::memory::MemoryAgent;
    use fathom_common::config::SnmpConfig;
    use fathom_protocols::snmp::SnmpValue;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));

    fn text(s: &str) -> SnmpValue {
        SnmpValue::OctetString(s.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn decodes_trimmed_fields_and_leaves_missing_ones_absent() {
        let agent = MemoryAgent::new()
            .with(oid(SYS_NAME), text("  core-switch-1 \n"))
            .with(oid(SYS_DESCR), text("Cisco IOS Software"))
            .with(
                oid(SYS_OBJECT_ID),
                SnmpValue::ObjectIdentifier(oid(&[1, 3, 6, 1, 4, 1, 9, 1, 1208])),
            )
            .with(oid(SYS_CONTACT), text("   "));
        let client = SnmpClient::with_connector(&SnmpConfig::default(), Arc::new(agent)).unwrap();

        let info = client.get_system(TARGET).await.unwrap();
        assert_eq!(info.sys_name.as_deref(), Some("core-switch-1"));
        assert_eq!(info.sys_descr.as_deref(), Some("Cisco IOS Software"));
        assert_eq!(info.sys_object_id.as_deref(), Some("1.3.6.1.4.1.9.1.1208"));
        assert_eq!(info.sys_contact, None);
        assert_eq!(info.sys_location, None);
    }

    #[tokio::test]
    async fn v1_agent_missing_one_object_keeps_the_others() {
        let agent = MemoryAgent::new()
            .with(oid(SYS_NAME), text("edge-router"))
            .with(oid(SYS_DESCR), text("RouterOS 6.49"))
            .with(
                oid(SYS_OBJECT_ID),
                SnmpValue::ObjectIdentifier(oid(&[1, 3, 6, 1, 4, 1, 14988, 1])),
            )
            .with(oid(SYS_CONTACT), text("noc@example.net"));
        let cfg = SnmpConfig {
            version: "1".to_string(),
            ..Default::default()
        };
        let client = SnmpClient::with_connector(&cfg, Arc::new(agent.clone())).unwrap();

        let info = client.get_system(TARGET).await.unwrap();
        assert_eq!(info.sys_name.as_deref(), Some("edge-router"));
        assert_eq!(info.sys_descr.as_deref(), Some("RouterOS 6.49"));
        assert_eq!(info.sys_object_id.as_deref(), Some("1.3.6.1.4.1.14988.1"));
        assert_eq!(info.sys_contact.as_deref(), Some("noc@example.net"));
        assert_eq!(info.sys_location, None);
        // one batched GET, then one per object
        assert_eq!(agent.connections(), 6);
    }

    #[tokio::test]
    async fn silent_agent_is_an_error() {
        let agent = MemoryAgent::new().failing(oid(&[1, 3, 6, 1, 2, 1, 1]));
        let client = SnmpClient::with_connector(&SnmpConfig::default(), Arc::new(agent)).unwrap();
        assert!(matches!(
            client.get_system(TARGET).await,
            Err(SnmpError::Timeout(_))
        ));
    }
}
