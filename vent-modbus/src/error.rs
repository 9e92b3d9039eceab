use thiserror::Error;

/// Failure of a single register transaction.
///
/// Exception responses keep the numeric code the device reported, link level failures
/// use the codes conventionally assigned by RTU master libraries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Illegal function")]
    IllegalFunction,
    #[error("Illegal data address")]
    IllegalDataAddress,
    #[error("Illegal data value")]
    IllegalDataValue,
    #[error("Slave device failure")]
    SlaveDeviceFailure,
    #[error("Slave device busy")]
    Busy,
    #[error("Device exception {0:#04x}")]
    Exception(u8),
    #[error("Invalid slave id in response")]
    InvalidSlaveId,
    #[error("Invalid function in response")]
    InvalidFunction,
    #[error("Response timed out")]
    Timeout,
    #[error("Invalid CRC")]
    InvalidCrc,
    #[error("Response shorter than requested")]
    ShortResponse,
    #[error("Link error: {0}")]
    Io(String),
}

impl DeviceError {
    /// Map a Modbus exception code to an error.
    pub fn from_exception_code(code: u8) -> Self {
        match code {
            0x01 => DeviceError::IllegalFunction,
            0x02 => DeviceError::IllegalDataAddress,
            0x03 => DeviceError::IllegalDataValue,
            0x04 => DeviceError::SlaveDeviceFailure,
            0x06 => DeviceError::Busy,
            other => DeviceError::Exception(other),
        }
    }

    /// The numeric device error code, if the error has one.
    pub fn code(&self) -> Option<u8> {
        match self {
            DeviceError::IllegalFunction => Some(0x01),
            DeviceError::IllegalDataAddress => Some(0x02),
            DeviceError::IllegalDataValue => Some(0x03),
            DeviceError::SlaveDeviceFailure => Some(0x04),
            DeviceError::Busy => Some(0x06),
            DeviceError::Exception(code) => Some(*code),
            DeviceError::InvalidSlaveId => Some(0xE0),
            DeviceError::InvalidFunction => Some(0xE1),
            DeviceError::Timeout => Some(0xE2),
            DeviceError::InvalidCrc => Some(0xE3),
            DeviceError::ShortResponse | DeviceError::Io(_) => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("Invalid command code {0}")]
    InvalidCommand(u16),
    #[error("Actuator write failed: {0}")]
    Device(#[from] DeviceError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Duplicate register name {0}")]
    DuplicateName(String),
    #[error("Invalid register name: {0}")]
    InvalidName(String),
}
