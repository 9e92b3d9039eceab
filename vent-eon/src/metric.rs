use vent_modbus::{RegisterDescriptor, SensorValue};
use vent_types::{
    constants::ENG_UNIT,
    payload::{DataType, Metric},
    MetricValue,
};

/// A single metric ready to be placed in a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricEnvelope {
    pub name: String,
    pub timestamp: u64,
    pub value: MetricValue,
    pub unit: Option<&'static str>,
}

impl MetricEnvelope {
    pub fn new<S: Into<String>, V: Into<MetricValue>>(name: S, timestamp: u64, value: V) -> Self {
        Self {
            name: name.into(),
            timestamp,
            value: value.into(),
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn datatype(&self) -> DataType {
        self.value.datatype()
    }

    /// A reading of `register`, typed the way the register is declared at birth.
    pub fn from_sample(register: &RegisterDescriptor, sample: SensorValue, timestamp: u64) -> Self {
        let value = if register.is_raw() {
            match sample {
                SensorValue::Raw(raw) => MetricValue::UInt16(raw),
                SensorValue::Scaled(v) => MetricValue::UInt16(v.round() as u16),
            }
        } else {
            MetricValue::Float(sample.as_f64() as f32)
        };
        Self::new(register.name.as_str(), timestamp, value)
    }

    /// The birth declaration of `register`: a zero value and its unit.
    pub fn placeholder(register: &RegisterDescriptor, timestamp: u64) -> Self {
        let value = if register.is_raw() {
            MetricValue::UInt16(0)
        } else {
            MetricValue::Float(0.0)
        };
        Self::new(register.name.as_str(), timestamp, value).with_unit(register.unit.symbol())
    }
}

impl From<MetricEnvelope> for Metric {
    fn from(envelope: MetricEnvelope) -> Self {
        let mut metric = Metric::new();
        metric
            .set_name(envelope.name)
            .set_timestamp(envelope.timestamp)
            .set_datatype(envelope.value.datatype())
            .set_value(envelope.value.into());
        if let Some(unit) = envelope.unit {
            metric.set_string_property(ENG_UNIT, unit);
        }
        metric
    }
}
