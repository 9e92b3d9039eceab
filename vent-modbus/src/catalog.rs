use std::{collections::HashSet, ops::RangeInclusive};

use vent_types::{payload::DataType, utils::validate_name};

use crate::{CatalogError, SensorValue};

/// Engineering unit of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Percent,
    Celsius,
    Pascal,
    CubicMetersPerHour,
    Minutes,
    Raw,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Percent => "%",
            Unit::Celsius => "°C",
            Unit::Pascal => "Pa",
            Unit::CubicMetersPerHour => "m³/h",
            Unit::Minutes => "min",
            Unit::Raw => "",
        }
    }
}

/// Maps a logical sensor to a device register.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterDescriptor {
    pub address: u16,
    pub name: String,
    pub unit: Unit,
    pub scale: f64,
}

impl RegisterDescriptor {
    pub fn new(name: &str, address: u16, unit: Unit, scale: f64) -> Self {
        Self {
            address,
            name: name.to_string(),
            unit,
            scale,
        }
    }

    /// A register with unit scale is reported as the raw register word.
    pub fn is_raw(&self) -> bool {
        self.scale == 1.0
    }

    /// The datatype the register is published as.
    pub fn datatype(&self) -> DataType {
        if self.is_raw() {
            DataType::UInt16
        } else {
            DataType::Float
        }
    }

    /// Convert a raw register word into a sample.
    pub fn sample(&self, raw: u16) -> SensorValue {
        if self.is_raw() {
            SensorValue::Raw(raw)
        } else {
            SensorValue::Scaled(raw as f64 * self.scale)
        }
    }
}

/// Ordered set of registers to poll. Names are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterCatalog {
    registers: Vec<RegisterDescriptor>,
}

const DV10_REGISTERS: [(&str, u16, Unit, f64); 15] = [
    ("HeatExchangerEfficiency", 1, Unit::Percent, 0.1),
    ("RunMode", 2, Unit::Raw, 1.0),
    ("OutdoorTemp", 0, Unit::Celsius, 0.1),
    ("SupplyAirTemp", 6, Unit::Celsius, 0.1),
    ("SupplyAirSetpointTemp", 7, Unit::Celsius, 0.1),
    ("ExhaustAirTemp", 8, Unit::Celsius, 0.1),
    ("ExtractAirTemp", 19, Unit::Celsius, 0.1),
    ("SupplyAirPressure", 12, Unit::Pascal, 0.1),
    ("ExtractAirPressure", 13, Unit::Pascal, 0.1),
    ("SupplyAirFlow", 14, Unit::CubicMetersPerHour, 0.1),
    ("ExtractAirFlow", 15, Unit::CubicMetersPerHour, 0.1),
    ("ExtraSupplyAirFlow", 292, Unit::CubicMetersPerHour, 0.1),
    ("ExtraExtractAirFlow", 293, Unit::CubicMetersPerHour, 0.1),
    ("SupplyFanRuntime", 3, Unit::Minutes, 1.0),
    ("ExtractFanRuntime", 4, Unit::Minutes, 1.0),
];

impl RegisterCatalog {
    pub fn new(registers: Vec<RegisterDescriptor>) -> Result<Self, CatalogError> {
        let mut names = HashSet::new();
        for register in &registers {
            validate_name(&register.name).map_err(CatalogError::InvalidName)?;
            if !names.insert(register.name.as_str()) {
                return Err(CatalogError::DuplicateName(register.name.clone()));
            }
        }
        Ok(Self { registers })
    }

    /// The input registers of a DV10 ventilation unit.
    pub fn dv10() -> Self {
        Self {
            registers: DV10_REGISTERS
                .iter()
                .map(|(name, address, unit, scale)| {
                    RegisterDescriptor::new(name, *address, *unit, *scale)
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisterDescriptor> {
        self.registers.iter()
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&RegisterDescriptor> {
        self.registers.iter().find(|r| r.name == name)
    }
}

impl Default for RegisterCatalog {
    fn default() -> Self {
        Self::dv10()
    }
}

/// Holding register selecting the fan mode.
pub const FAN_MODE_REGISTER: u16 = 367;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FanMode {
    Off = 0,
    ManualReduced = 1,
    ManualNormal = 2,
    Auto = 3,
}

impl FanMode {
    pub const ACCEPTED: RangeInclusive<u16> = 0..=3;

    pub fn describe(&self) -> &'static str {
        match self {
            FanMode::Off => "Off",
            FanMode::ManualReduced => "Manual reduced speed",
            FanMode::ManualNormal => "Manual normal speed",
            FanMode::Auto => "Auto",
        }
    }
}

impl TryFrom<u16> for FanMode {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FanMode::Off),
            1 => Ok(FanMode::ManualReduced),
            2 => Ok(FanMode::ManualNormal),
            3 => Ok(FanMode::Auto),
            _ => Err(()),
        }
    }
}

/// Status text of the `RunMode` register.
pub struct RunMode;

impl RunMode {
    pub fn describe(raw: u16) -> &'static str {
        match raw {
            0 => "Stopped",
            1 => "Starting up",
            2 => "Starting reduced speed",
            3 => "Starting full speed",
            4 => "Starting normal run",
            5 => "Normal run",
            6 => "Support control heating",
            7 => "Support control cooling",
            8 => "CO2 run",
            9 => "Night cooling",
            10 => "Full speed stop",
            11 => "Stopping fan",
            _ => "Unknown mode",
        }
    }
}
