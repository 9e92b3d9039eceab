use crate::payload::{metric, DataType};

/// A metric value tagged with the Sparkplug datatype it is published as.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
}

/// How a Rust value is carried in the protobuf value field.
///
/// Signed integers travel as their two's complement bit pattern in the unsigned
/// field. 16 bit values occupy the low half of the 32 bit field, and a wire value
/// with any of the upper half set does not decode as a 16 bit type.
trait Wire: Sized {
    type Proto;
    fn to_wire(self) -> Self::Proto;
    fn from_wire(proto: Self::Proto) -> Option<Self>;
}

macro_rules! same_on_wire {
    ($($ty:ty),*) => {
        $(
            impl Wire for $ty {
                type Proto = $ty;
                fn to_wire(self) -> $ty {
                    self
                }
                fn from_wire(proto: $ty) -> Option<$ty> {
                    Some(proto)
                }
            }
        )*
    };
}

same_on_wire!(u32, u64, f32, f64, bool, String);

impl Wire for u16 {
    type Proto = u32;
    fn to_wire(self) -> u32 {
        self as u32
    }
    fn from_wire(proto: u32) -> Option<u16> {
        u16::try_from(proto).ok()
    }
}

impl Wire for i16 {
    type Proto = u32;
    fn to_wire(self) -> u32 {
        (self as u16) as u32
    }
    fn from_wire(proto: u32) -> Option<i16> {
        u16::try_from(proto).ok().map(|bits| bits as i16)
    }
}

impl Wire for i32 {
    type Proto = u32;
    fn to_wire(self) -> u32 {
        self as u32
    }
    fn from_wire(proto: u32) -> Option<i32> {
        Some(proto as i32)
    }
}

impl Wire for i64 {
    type Proto = u64;
    fn to_wire(self) -> u64 {
        self as u64
    }
    fn from_wire(proto: u64) -> Option<i64> {
        Some(proto as i64)
    }
}

macro_rules! metric_value_variants {
    ($($variant:ident($ty:ty) => $field:ident),* $(,)?) => {
        $(
            impl From<$ty> for MetricValue {
                fn from(value: $ty) -> Self {
                    MetricValue::$variant(value)
                }
            }
        )*

        impl MetricValue {
            /// The Sparkplug [DataType] the value is published as
            pub fn datatype(&self) -> DataType {
                match self {
                    $( MetricValue::$variant(_) => DataType::$variant, )*
                }
            }

            /// Interpret a wire value according to the [DataType] the metric declares.
            ///
            /// Returns `None` when the wire value does not fit the declared datatype,
            /// including integers too wide for it.
            pub fn from_proto(datatype: DataType, value: metric::Value) -> Option<Self> {
                match (datatype, value) {
                    $(
                        (DataType::$variant, metric::Value::$field(v)) => {
                            <$ty as Wire>::from_wire(v).map(MetricValue::$variant)
                        }
                    )*
                    _ => None,
                }
            }
        }

        impl From<MetricValue> for metric::Value {
            fn from(value: MetricValue) -> Self {
                match value {
                    $( MetricValue::$variant(v) => metric::Value::$field(v.to_wire()), )*
                }
            }
        }
    };
}

metric_value_variants!(
    Int16(i16) => IntValue,
    Int32(i32) => IntValue,
    Int64(i64) => LongValue,
    UInt16(u16) => IntValue,
    UInt32(u32) => IntValue,
    UInt64(u64) => LongValue,
    Float(f32) => FloatValue,
    Double(f64) => DoubleValue,
    Boolean(bool) => BooleanValue,
    String(String) => StringValue,
);

impl MetricValue {
    /// The placeholder value announced in a birth certificate for `datatype`.
    pub fn zero(datatype: DataType) -> Option<Self> {
        let value = match datatype {
            DataType::Int16 => MetricValue::Int16(0),
            DataType::Int32 => MetricValue::Int32(0),
            DataType::Int64 => MetricValue::Int64(0),
            DataType::UInt16 => MetricValue::UInt16(0),
            DataType::UInt32 => MetricValue::UInt32(0),
            DataType::UInt64 => MetricValue::UInt64(0),
            DataType::Float => MetricValue::Float(0.0),
            DataType::Double => MetricValue::Double(0.0),
            DataType::Boolean => MetricValue::Boolean(false),
            DataType::String => MetricValue::String(String::new()),
            _ => return None,
        };
        Some(value)
    }

    /// Integer view of the value, used for command metrics.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetricValue::Int16(v) => Some(*v as i64),
            MetricValue::Int32(v) => Some(*v as i64),
            MetricValue::Int64(v) => Some(*v),
            MetricValue::UInt16(v) => Some(*v as i64),
            MetricValue::UInt32(v) => Some(*v as i64),
            MetricValue::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}
