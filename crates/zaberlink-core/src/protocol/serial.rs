//! Serial port handling
//!
//! Provides the few lines of port configuration the engine needs: opening
//! a port with the controller's fixed line settings, and listing candidate
//! ports for discovery.

use serialport::{SerialPortInfo, SerialPortType};
use std::time::Duration;

use super::connection::ConnectionConfig;
use super::stream::{Channel, SerialChannel};
use super::ProtocolError;

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g. "/dev/ttyUSB0" or "COM4")
    pub name: String,
    /// USB vendor id, if a USB device
    pub vid: Option<u16>,
    /// USB product id, if a USB device
    pub pid: Option<u16>,
    /// Product name, if reported
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (vid, pid, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => (Some(usb.vid), Some(usb.pid), usb.product),
            _ => (None, None, None),
        };
        Self {
            name: info.port_name,
            vid,
            pid,
            product,
        }
    }
}

/// List available serial ports in deterministic (name) order
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(PortInfo::from)
        .collect();
    ports.sort_by(|a, b| a.name.cmp(&b.name));
    ports
}

/// Open and configure the serial channel described by `config`
///
/// The controller speaks 8 data bits, no parity, one stop bit and no flow
/// control at a fixed 9600 baud. The read timeout bounds every reply wait.
pub fn open_channel(config: &ConnectionConfig) -> Result<Box<dyn Channel>, ProtocolError> {
    let port = serialport::new(&config.port_name, config.baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(Duration::from_millis(config.timeout_ms))
        .open()
        .map_err(|e| ProtocolError::ConnectionFailed(e.to_string()))?;
    Ok(Box::new(SerialChannel::new(port)))
}
