use std::io::ErrorKind;

use async_trait::async_trait;
use log::info;
use tokio_modbus::client::{Context, Reader};
use tokio_modbus::prelude::*;

use crate::{DeviceError, Transceiver};

/// Register table the catalog addresses refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisterKind {
    #[default]
    Input,
    Holding,
}

/// A [Transceiver] talking Modbus RTU over a serial port using [tokio_modbus].
///
/// Reads use the configured [RegisterKind]; writes always target holding registers.
pub struct RtuTransceiver {
    ctx: Context,
    register_kind: RegisterKind,
}

impl RtuTransceiver {
    pub fn open(
        port: &str,
        baud_rate: u32,
        slave_id: u8,
        register_kind: RegisterKind,
    ) -> Result<Self, DeviceError> {
        let builder = tokio_serial::new(port, baud_rate)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .data_bits(tokio_serial::DataBits::Eight);
        let serial = tokio_serial::SerialStream::open(&builder)
            .map_err(|e| DeviceError::Io(format!("serial open failed: {e}")))?;
        info!("Opened serial port. port={port} baud={baud_rate} slave={slave_id}");
        Ok(Self {
            ctx: rtu::attach_slave(serial, Slave(slave_id)),
            register_kind,
        })
    }
}

fn flatten<T>(result: tokio_modbus::Result<T>) -> Result<T, DeviceError> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(exception)) => Err(DeviceError::from_exception_code(u8::from(exception))),
        Err(tokio_modbus::Error::Transport(e)) => match e.kind() {
            ErrorKind::TimedOut => Err(DeviceError::Timeout),
            ErrorKind::InvalidData => Err(DeviceError::InvalidCrc),
            _ => Err(DeviceError::Io(e.to_string())),
        },
        Err(e) => Err(DeviceError::Io(e.to_string())),
    }
}

#[async_trait]
impl Transceiver for RtuTransceiver {
    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, DeviceError> {
        let result = match self.register_kind {
            RegisterKind::Input => self.ctx.read_input_registers(address, count).await,
            RegisterKind::Holding => self.ctx.read_holding_registers(address, count).await,
        };
        flatten(result)
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), DeviceError> {
        flatten(self.ctx.write_single_register(address, value).await)
    }
}
