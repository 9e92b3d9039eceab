//! The subset of the `org.eclipse.tahu.protobuf` Sparkplug B schema an edge node
//! needs to publish births, deaths and data, and to decode commands.
//!
//! Field tags match `sparkplug_b.proto` so payloads interoperate with any
//! Sparkplug host application.

pub use prost::Message;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Payload {
    #[prost(uint64, optional, tag = "1")]
    pub timestamp: Option<u64>,
    #[prost(message, repeated, tag = "2")]
    pub metrics: Vec<Metric>,
    #[prost(uint64, optional, tag = "3")]
    pub seq: Option<u64>,
    #[prost(string, optional, tag = "4")]
    pub uuid: Option<String>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub body: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metric {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(uint64, optional, tag = "2")]
    pub alias: Option<u64>,
    #[prost(uint64, optional, tag = "3")]
    pub timestamp: Option<u64>,
    #[prost(uint32, optional, tag = "4")]
    pub datatype: Option<u32>,
    #[prost(bool, optional, tag = "5")]
    pub is_historical: Option<bool>,
    #[prost(bool, optional, tag = "6")]
    pub is_transient: Option<bool>,
    #[prost(bool, optional, tag = "7")]
    pub is_null: Option<bool>,
    #[prost(message, optional, tag = "9")]
    pub properties: Option<PropertySet>,
    #[prost(oneof = "metric::Value", tags = "10, 11, 12, 13, 14, 15")]
    pub value: Option<metric::Value>,
}

pub mod metric {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(uint32, tag = "10")]
        IntValue(u32),
        #[prost(uint64, tag = "11")]
        LongValue(u64),
        #[prost(float, tag = "12")]
        FloatValue(f32),
        #[prost(double, tag = "13")]
        DoubleValue(f64),
        #[prost(bool, tag = "14")]
        BooleanValue(bool),
        #[prost(string, tag = "15")]
        StringValue(String),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PropertySet {
    #[prost(string, repeated, tag = "1")]
    pub keys: Vec<String>,
    #[prost(message, repeated, tag = "2")]
    pub values: Vec<PropertyValue>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PropertyValue {
    #[prost(uint32, optional, tag = "1")]
    pub r#type: Option<u32>,
    #[prost(bool, optional, tag = "2")]
    pub is_null: Option<bool>,
    #[prost(oneof = "property_value::Value", tags = "3, 4, 5, 6, 7, 8")]
    pub value: Option<property_value::Value>,
}

pub mod property_value {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(uint32, tag = "3")]
        IntValue(u32),
        #[prost(uint64, tag = "4")]
        LongValue(u64),
        #[prost(float, tag = "5")]
        FloatValue(f32),
        #[prost(double, tag = "6")]
        DoubleValue(f64),
        #[prost(bool, tag = "7")]
        BooleanValue(bool),
        #[prost(string, tag = "8")]
        StringValue(String),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DataType {
    Unknown = 0,
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    UInt8 = 5,
    UInt16 = 6,
    UInt32 = 7,
    UInt64 = 8,
    Float = 9,
    Double = 10,
    Boolean = 11,
    String = 12,
    DateTime = 13,
    Text = 14,
}

impl Metric {
    pub fn new() -> Self {
        Self {
            name: None,
            alias: None,
            timestamp: None,
            datatype: None,
            is_historical: None,
            is_transient: None,
            is_null: Some(true),
            properties: None,
            value: None,
        }
    }

    pub fn set_name(&mut self, name: String) -> &mut Self {
        self.name = Some(name);
        self
    }

    pub fn set_datatype(&mut self, datatype: DataType) -> &mut Self {
        self.datatype = Some(datatype as u32);
        self
    }

    pub fn set_timestamp(&mut self, timestamp: u64) -> &mut Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn set_value(&mut self, value: metric::Value) -> &mut Self {
        self.value = Some(value);
        self.is_null = None;
        self
    }

    pub fn set_null(&mut self) -> &mut Self {
        self.value = None;
        self.is_null = Some(true);
        self
    }

    /// Adds a String property, creating the property set if needed.
    pub fn set_string_property(&mut self, key: &str, value: &str) -> &mut Self {
        let properties = self.properties.get_or_insert_with(PropertySet::default);
        properties.keys.push(key.to_string());
        properties.values.push(PropertyValue {
            r#type: Some(DataType::String as u32),
            is_null: None,
            value: Some(property_value::Value::StringValue(value.to_string())),
        });
        self
    }

    /// Looks up a String property by key.
    pub fn string_property(&self, key: &str) -> Option<&str> {
        let properties = self.properties.as_ref()?;
        let idx = properties.keys.iter().position(|k| k == key)?;
        match properties.values.get(idx)?.value.as_ref()? {
            property_value::Value::StringValue(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<Payload> for Vec<u8> {
    fn from(value: Payload) -> Self {
        value.encode_to_vec()
    }
}

impl DataType {
    const ALL: [DataType; 15] = [
        DataType::Unknown,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::UInt8,
        DataType::UInt16,
        DataType::UInt32,
        DataType::UInt64,
        DataType::Float,
        DataType::Double,
        DataType::Boolean,
        DataType::String,
        DataType::DateTime,
        DataType::Text,
    ];
}

impl TryFrom<u32> for DataType {
    type Error = ();

    /// Accepts the datatype codes 0 to 14.
    fn try_from(code: u32) -> Result<Self, Self::Error> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| DataType::ALL.get(idx).copied())
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_survives_the_wire() {
        let mut metric = Metric::new();
        metric
            .set_name("SupplyAirTemp".into())
            .set_datatype(DataType::Float)
            .set_timestamp(10)
            .set_value(metric::Value::FloatValue(21.5))
            .set_string_property("engUnit", "°C");
        let payload = Payload {
            timestamp: Some(10),
            metrics: vec![metric],
            seq: Some(2),
            uuid: None,
            body: None,
        };

        let bytes: Vec<u8> = payload.clone().into();
        let decoded = Payload::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(decoded.metrics[0].string_property("engUnit"), Some("°C"));
        assert_eq!(decoded.metrics[0].string_property("missing"), None);
    }

    #[test]
    fn set_value_clears_null_flag() {
        let mut metric = Metric::new();
        assert_eq!(metric.is_null, Some(true));
        metric.set_value(metric::Value::BooleanValue(false));
        assert_eq!(metric.is_null, None);
        metric.set_null();
        assert_eq!(metric.value, None);
        assert_eq!(metric.is_null, Some(true));
    }

    #[test]
    fn datatype_from_wire_value() {
        assert_eq!(DataType::try_from(6u32), Ok(DataType::UInt16));
        assert_eq!(DataType::try_from(9u32), Ok(DataType::Float));
        assert!(DataType::try_from(99u32).is_err());
    }
}
