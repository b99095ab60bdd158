//! Display topology resolution.
//!
//! Finds the one output pipeline this device drives: the first connected
//! connector in enumeration order, and the first CRTC its first encoder can
//! drive. Other connectors and encoders are never considered.

use crate::core::errors::{DisplayError, Result};
use crate::core::transport::{Connector, ConnectorId, CrtcId, KmsDevice};

/// Connector and CRTC chosen for scan-out.
#[derive(Debug, Clone)]
pub struct Pipeline<M> {
    pub connector: Connector<M>,
    pub crtc: CrtcId,
}

pub fn resolve_pipeline<D: KmsDevice>(device: &D) -> Result<Pipeline<D::Mode>> {
    let resources = device
        .resources()
        .map_err(|e| DisplayError::enumeration("resources", e))?;

    tracing::debug!(
        "Display resources: {} connectors, {} CRTCs",
        resources.connectors.len(),
        resources.crtcs.len()
    );

    let connector = find_connected(device, &resources.connectors)?;

    let crtc = find_crtc(device, &connector, &resources.crtcs)?;

    tracing::info!("Connector: {} ({}), CRTC: {}", connector.id, connector.name, crtc);

    Ok(Pipeline { connector, crtc })
}

fn find_connected<D: KmsDevice>(
    device: &D,
    connectors: &[ConnectorId],
) -> Result<Connector<D::Mode>> {
    for &id in connectors {
        let connector = device
            .connector(id)
            .map_err(|e| DisplayError::enumeration("connector", e))?;

        if connector.connected {
            return Ok(connector);
        }

        tracing::trace!("Skipping disconnected connector {}", id);
    }

    tracing::error!("No connector found");
    Err(DisplayError::NoDisplayConnected)
}

fn find_crtc<D: KmsDevice>(
    device: &D,
    connector: &Connector<D::Mode>,
    crtcs: &[CrtcId],
) -> Result<CrtcId> {
    let Some(&encoder_id) = connector.encoders.first() else {
        tracing::error!("Connector {} has no encoder", connector.id);
        return Err(DisplayError::NoCrtcAvailable);
    };

    let encoder = device
        .encoder(encoder_id)
        .map_err(|e| DisplayError::enumeration("encoder", e))?;

    encoder.possible_crtcs.first_in(crtcs).ok_or_else(|| {
        tracing::error!("No CRTC found for encoder {}", encoder.id);
        DisplayError::NoCrtcAvailable
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{test_connector, ScriptedDevice};
    use crate::core::transport::{CrtcMask, EncoderId};

    #[test]
    fn test_picks_first_connected_connector() {
        let mut device = ScriptedDevice::single_output();
        device.add_connector(test_connector(5, false, 50));
        device.add_connector(test_connector(6, true, 51));
        device.add_connector(test_connector(7, true, 52));
        device.add_encoder(50, 0b1);
        device.add_encoder(51, 0b1);
        device.add_encoder(52, 0b1);
        // Put the extra connectors ahead of the default one
        device.reorder_connectors(&[5, 6, 7, 1]);

        let pipeline = resolve_pipeline(&device).unwrap();
        assert_eq!(pipeline.connector.id, ConnectorId(6));
        assert_eq!(pipeline.crtc, CrtcId(100));
    }

    #[test]
    fn test_no_connected_display() {
        let mut device = ScriptedDevice::single_output();
        device.connectors[0].connected = false;

        let err = resolve_pipeline(&device).unwrap_err();
        assert!(matches!(err, DisplayError::NoDisplayConnected));
    }

    #[test]
    fn test_first_possible_crtc_in_list_order() {
        let mut device = ScriptedDevice::single_output();
        device.crtcs = vec![CrtcId(100), CrtcId(101), CrtcId(102)];
        device.encoders[0].possible_crtcs = CrtcMask(0b110);

        let pipeline = resolve_pipeline(&device).unwrap();
        assert_eq!(pipeline.crtc, CrtcId(101));
    }

    #[test]
    fn test_empty_crtc_mask() {
        let mut device = ScriptedDevice::single_output();
        device.encoders[0].possible_crtcs = CrtcMask(0);

        let err = resolve_pipeline(&device).unwrap_err();
        assert!(matches!(err, DisplayError::NoCrtcAvailable));
    }

    #[test]
    fn test_connector_without_encoder() {
        let mut device = ScriptedDevice::single_output();
        device.connectors[0].encoders.clear();

        let err = resolve_pipeline(&device).unwrap_err();
        assert!(matches!(err, DisplayError::NoCrtcAvailable));
    }

    #[test]
    fn test_only_first_encoder_considered() {
        let mut device = ScriptedDevice::single_output();
        device.encoders[0].possible_crtcs = CrtcMask(0);
        device.add_encoder(60, 0b1);
        device.connectors[0].encoders.push(EncoderId(60));

        let err = resolve_pipeline(&device).unwrap_err();
        assert!(matches!(err, DisplayError::NoCrtcAvailable));
    }

    #[test]
    fn test_missing_connector_fails_enumeration() {
        let mut device = ScriptedDevice::single_output();
        device.add_missing_connector(9);

        let err = resolve_pipeline(&device).unwrap_err();
        assert!(matches!(err, DisplayError::Enumeration { what: "connector", .. }));
        assert!(err.is_fatal());
        assert_eq!(err.to_errno(), -libc::ENOENT);
    }

    #[test]
    fn test_missing_encoder_fails_enumeration() {
        let mut device = ScriptedDevice::single_output();
        device.connectors[0].encoders = vec![EncoderId(77)];

        let err = resolve_pipeline(&device).unwrap_err();
        assert!(matches!(err, DisplayError::Enumeration { what: "encoder", .. }));
        assert!(err.is_fatal());
        assert_eq!(err.os_error(), Some(libc::ENOENT));
        assert_eq!(err.to_errno(), -libc::ENOENT);
    }
}
