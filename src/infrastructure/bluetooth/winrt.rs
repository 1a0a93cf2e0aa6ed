//! WinRT GATT transport
//!
//! Connects to the lamp by Bluetooth address, keeps a `GattSession` alive
//! for the lifetime of the link and writes packets to the command
//! characteristic.

use crate::domain::error::TransportError;
use crate::infrastructure::bluetooth::transport::{Session, Transport};
use anyhow::Result;
use tracing::{debug, info, warn};
use windows::core::GUID;
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristic, GattCommunicationStatus, GattSession,
};
use windows::Devices::Bluetooth::{BluetoothConnectionStatus, BluetoothLEDevice};
use windows::Storage::Streams::DataWriter;

pub struct WinRtTransport {
    address: u64,
    characteristic_uuid: GUID,
}

impl WinRtTransport {
    pub fn new(address: &str, characteristic_uuid: &str) -> Result<Self> {
        Ok(Self {
            address: parse_address(address)?,
            characteristic_uuid: parse_uuid(characteristic_uuid)?,
        })
    }

    async fn open(&self) -> windows::core::Result<Option<WinRtSession>> {
        let device = BluetoothLEDevice::FromBluetoothAddressAsync(self.address)?.await?;
        info!("Device found: {:?}", device.Name()?);

        // Ask Windows to hold the link open between writes
        let gatt_session = match GattSession::FromDeviceIdAsync(&device.BluetoothDeviceId()?)?.await {
            Ok(session) => {
                session.SetMaintainConnection(true)?;
                Some(session)
            }
            Err(e) => {
                warn!("Failed to create GattSession, continuing anyway: {}", e);
                None
            }
        };

        let services_result = device.GetGattServicesAsync()?.await?;
        if services_result.Status()? != GattCommunicationStatus::Success {
            warn!("Failed to get GATT services: {:?}", services_result.Status()?);
            return Ok(None);
        }

        let services = services_result.Services()?;
        debug!("Found {} services", services.Size()?);

        for i in 0..services.Size()? {
            let service = services.GetAt(i)?;
            let chars_result = service
                .GetCharacteristicsForUuidAsync(self.characteristic_uuid)?
                .await?;
            if chars_result.Status()? != GattCommunicationStatus::Success {
                continue;
            }
            let characteristics = chars_result.Characteristics()?;
            if characteristics.Size()? > 0 {
                info!("Found command characteristic");
                return Ok(Some(WinRtSession {
                    device,
                    characteristic: characteristics.GetAt(0)?,
                    gatt_session,
                }));
            }
        }

        Ok(None)
    }
}

impl Transport for WinRtTransport {
    type Session = WinRtSession;

    async fn connect(&mut self) -> Result<WinRtSession, TransportError> {
        info!("Connecting to lamp {:#X}", self.address);
        match self.open().await {
            Ok(Some(session)) => Ok(session),
            Ok(None) => Err(TransportError::Connect(
                "Command characteristic not found".to_string(),
            )),
            Err(e) => Err(TransportError::Connect(e.to_string())),
        }
    }
}

pub struct WinRtSession {
    device: BluetoothLEDevice,
    characteristic: GattCharacteristic,
    gatt_session: Option<GattSession>,
}

impl WinRtSession {
    async fn write_value(&self, packet: &[u8]) -> windows::core::Result<GattCommunicationStatus> {
        let writer = DataWriter::new()?;
        writer.WriteBytes(packet)?;
        let buffer = writer.DetachBuffer()?;
        self.characteristic.WriteValueAsync(&buffer)?.await
    }
}

impl Session for WinRtSession {
    async fn is_connected(&self) -> bool {
        self.device
            .ConnectionStatus()
            .map(|s| s == BluetoothConnectionStatus::Connected)
            .unwrap_or(false)
    }

    async fn write(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        match self.write_value(packet).await {
            Ok(GattCommunicationStatus::Success) => Ok(()),
            Ok(status) => Err(TransportError::Write(format!("GATT status {:?}", status))),
            Err(e) => Err(TransportError::Write(e.to_string())),
        }
    }

    async fn close(self) {
        if let Some(session) = &self.gatt_session {
            let _ = session.Close();
        }
        let _ = self.device.Close();
        info!("Disconnected from lamp");
    }
}

/// Parse `A8:D2:CD:C7:9C:AC` into the 48-bit address WinRT expects
pub fn parse_address(address: &str) -> Result<u64> {
    let digits = address.replace([':', '-'], "");
    if digits.len() != 12 {
        return Err(anyhow::anyhow!("Invalid Bluetooth address: {}", address));
    }
    Ok(u64::from_str_radix(&digits, 16)?)
}

/// Parse a UUID string into a Windows GUID
pub fn parse_uuid(uuid_str: &str) -> Result<GUID> {
    let uuid_str = uuid_str.replace('-', "");

    if uuid_str.len() != 32 {
        return Err(anyhow::anyhow!("Invalid UUID format"));
    }

    let d1 = u32::from_str_radix(&uuid_str[0..8], 16)?;
    let d2 = u16::from_str_radix(&uuid_str[8..12], 16)?;
    let d3 = u16::from_str_radix(&uuid_str[12..16], 16)?;

    let mut d4 = [0u8; 8];
    for (i, byte) in d4.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&uuid_str[16 + i * 2..18 + i * 2], 16)?;
    }

    Ok(GUID {
        data1: d1,
        data2: d2,
        data3: d3,
        data4: d4,
    })
}
