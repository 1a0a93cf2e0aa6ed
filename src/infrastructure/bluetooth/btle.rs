//! btleplug GATT transport (BlueZ on Linux, CoreBluetooth on macOS)
//!
//! BlueZ only connects to peripherals it has seen, so each attempt scans
//! until the lamp shows up. The connection manager bounds the whole attempt
//! with its connect timeout.

use crate::domain::error::TransportError;
use crate::infrastructure::bluetooth::transport::{Session, Transport};
use anyhow::{Context, Result};
use btleplug::api::{
    BDAddr, Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter,
    WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const SCAN_POLL: Duration = Duration::from_millis(250);

pub struct BtleTransport {
    address: BDAddr,
    characteristic_uuid: Uuid,
    adapter: Option<Adapter>,
}

impl BtleTransport {
    pub fn new(address: &str, characteristic_uuid: &str) -> Result<Self> {
        Ok(Self {
            address: BDAddr::from_str(address)
                .with_context(|| format!("Invalid Bluetooth address: {}", address))?,
            characteristic_uuid: Uuid::parse_str(characteristic_uuid)
                .with_context(|| format!("Invalid characteristic UUID: {}", characteristic_uuid))?,
            adapter: None,
        })
    }

    async fn adapter(&mut self) -> Result<Adapter, TransportError> {
        if let Some(adapter) = &self.adapter {
            return Ok(adapter.clone());
        }

        let manager = Manager::new().await.map_err(connect_error)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(connect_error)?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::Connect("No Bluetooth adapters found".to_string()))?;

        self.adapter = Some(adapter.clone());
        Ok(adapter)
    }

    async fn find_peripheral(&self, adapter: &Adapter) -> Result<Peripheral, TransportError> {
        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(connect_error)?;

        let found = self.wait_for_lamp(adapter).await;
        stop_scan(adapter).await;
        found
    }

    async fn wait_for_lamp(&self, adapter: &Adapter) -> Result<Peripheral, TransportError> {
        loop {
            let peripherals = adapter.peripherals().await.map_err(connect_error)?;
            if let Some(peripheral) = peripherals.into_iter().find(|p| p.address() == self.address)
            {
                return Ok(peripheral);
            }
            tokio::time::sleep(SCAN_POLL).await;
        }
    }
}

impl Transport for BtleTransport {
    type Session = BtleSession;

    async fn connect(&mut self) -> Result<BtleSession, TransportError> {
        info!("Connecting to lamp {}", self.address);

        let adapter = self.adapter().await?;
        let peripheral = self.find_peripheral(&adapter).await?;

        if !peripheral.is_connected().await.map_err(connect_error)? {
            peripheral.connect().await.map_err(connect_error)?;
        }
        peripheral.discover_services().await.map_err(connect_error)?;

        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == self.characteristic_uuid)
            .ok_or_else(|| {
                TransportError::Connect("Command characteristic not found".to_string())
            })?;
        debug!("Command characteristic properties: {:?}", characteristic.properties);

        // Prefer unacknowledged writes when the characteristic allows them
        let write_type = if characteristic
            .properties
            .contains(CharPropFlags::WRITE_WITHOUT_RESPONSE)
        {
            WriteType::WithoutResponse
        } else {
            WriteType::WithResponse
        };

        Ok(BtleSession {
            peripheral,
            characteristic,
            write_type,
        })
    }

    /// A dropped attempt may have been cut off mid-scan
    async fn abandon(&mut self) {
        if let Some(adapter) = &self.adapter {
            stop_scan(adapter).await;
        }
    }
}

pub struct BtleSession {
    peripheral: Peripheral,
    characteristic: Characteristic,
    write_type: WriteType,
}

impl Session for BtleSession {
    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn write(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        self.peripheral
            .write(&self.characteristic, packet, self.write_type)
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn close(self) {
        let _ = self.peripheral.disconnect().await;
        info!("Disconnected from lamp");
    }
}

async fn stop_scan(adapter: &Adapter) {
    if let Err(e) = adapter.stop_scan().await {
        debug!("Failed to stop scan: {}", e);
    }
}

fn connect_error(e: btleplug::Error) -> TransportError {
    TransportError::Connect(e.to_string())
}
