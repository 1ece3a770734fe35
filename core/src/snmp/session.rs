use async_trait::async_trait;
use fathom_protocols::snmp::{ObjectId, SnmpValue, VarBind};
use snmp2::{AsyncSession, Oid, Pdu, Value};
use tokio::time::timeout;

use super::{SessionParams, SnmpError, SnmpVersion};

/// One open conversation with an agent.
#[async_trait]
pub trait SnmpSession: Send {
    async fn get(&mut self, oids: &[ObjectId]) -> Result<Vec<VarBind>, SnmpError>;

    async fn get_next(&mut self, oid: &ObjectId) -> Result<Vec<VarBind>, SnmpError>;

    async fn get_bulk(
        &mut self,
        oid: &ObjectId,
        max_repetitions: u32,
    ) -> Result<Vec<VarBind>, SnmpError>;
}

/// Opens sessions. Called once per client operation.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, params: &SessionParams) -> Result<Box<dyn SnmpSession>, SnmpError>;
}

/// Connects to real agents over UDP through `snmp2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Snmp2Connector;

#[async_trait]
impl Connector for Snmp2Connector {
    async fn connect(&self, params: &SessionParams) -> Result<Box<dyn SnmpSession>, SnmpError> {
        let community = params.community.as_bytes();
        let opened = match params.version {
            SnmpVersion::V1 => AsyncSession::new_v1(params.target, community, 0).await,
            SnmpVersion::V2c => AsyncSession::new_v2c(params.target, community, 0).await,
        };
        let inner = opened.map_err(|e| SnmpError::Transport(e.to_string()))?;
        Ok(Box::new(Snmp2Session {
            inner,
            timeout: params.timeout,
        }))
    }
}

struct Snmp2Session {
    inner: AsyncSession,
    timeout: std::time::Duration,
}

#[async_trait]
impl SnmpSession for Snmp2Session {
    async fn get(&mut self, oids: &[ObjectId]) -> Result<Vec<VarBind>, SnmpError> {
        let oids: Vec<Oid<'static>> = oids.iter().map(to_snmp2_oid).collect::<Result<_, _>>()?;
        let refs: Vec<&Oid<'static>> = oids.iter().collect();
        let wait = self.timeout;
        let pdu = timeout(wait, self.inner.get_many(&refs))
            .await
            .map_err(|_| SnmpError::Timeout(wait))?
            .map_err(|e| SnmpError::Transport(e.to_string()))?;
        into_varbinds(pdu)
    }

    async fn get_next(&mut self, oid: &ObjectId) -> Result<Vec<VarBind>, SnmpError> {
        let oid = to_snmp2_oid(oid)?;
        let wait = self.timeout;
        let pdu = timeout(wait, self.inner.getnext(&oid))
            .await
            .map_err(|_| SnmpError::Timeout(wait))?
            .map_err(|e| SnmpError::Transport(e.to_string()))?;
        into_varbinds(pdu)
    }

    async fn get_bulk(
        &mut self,
        oid: &ObjectId,
        max_repetitions: u32,
    ) -> Result<Vec<VarBind>, SnmpError> {
        let oid = to_snmp2_oid(oid)?;
        let wait = self.timeout;
        let pdu = timeout(wait, self.inner.getbulk(&[&oid], 0, max_repetitions))
            .await
            .map_err(|_| SnmpError::Timeout(wait))?
            .map_err(|e| SnmpError::Transport(e.to_string()))?;
        into_varbinds(pdu)
    }
}

fn to_snmp2_oid(oid: &ObjectId) -> Result<Oid<'static>, SnmpError> {
    Oid::from(oid.arcs()).map_err(|_| SnmpError::InvalidOid(oid.to_string()))
}

fn from_snmp2_oid(oid: &Oid<'_>) -> Option<ObjectId> {
    oid.iter().map(|arcs| ObjectId::new(arcs.collect::<Vec<u64>>()))
}

fn into_varbinds(pdu: Pdu<'_>) -> Result<Vec<VarBind>, SnmpError> {
    if pdu.error_status != 0 {
        return Err(SnmpError::Agent {
            status: pdu.error_status,
            index: pdu.error_index,
        });
    }
    Ok(pdu
        .varbinds
        .filter_map(|(oid, value)| Some(VarBind::new(from_snmp2_oid(&oid)?, convert(value))))
        .collect())
}

fn convert(value: Value<'_>) -> SnmpValue {
    match value {
        Value::Integer(v) => SnmpValue::Integer(v),
        Value::Counter32(v) => SnmpValue::Counter32(v),
        Value::Unsigned32(v) => SnmpValue::Unsigned32(v),
        Value::Timeticks(v) => SnmpValue::Timeticks(v),
        Value::Counter64(v) => SnmpValue::Counter64(v),
        Value::OctetString(bytes) => SnmpValue::OctetString(bytes.to_vec()),
        Value::IpAddress(octets) => SnmpValue::IpAddress(octets),
        Value::ObjectIdentifier(oid) => from_snmp2_oid(&oid)
            .map(SnmpValue::ObjectIdentifier)
            .unwrap_or(SnmpValue::Other),
        Value::Null => SnmpValue::Null,
        Value::NoSuchObject => SnmpValue::NoSuchObject,
        Value::NoSuchInstance => SnmpValue::NoSuchInstance,
        Value::EndOfMibView => SnmpValue::EndOfMibView,
        _ => SnmpValue::Other,
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
