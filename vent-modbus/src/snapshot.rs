use std::collections::HashMap;

/// A single sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorValue {
    /// Register word multiplied by the register scale
    Scaled(f64),
    /// Register word as read
    Raw(u16),
}

impl SensorValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            SensorValue::Scaled(v) => *v,
            SensorValue::Raw(v) => *v as f64,
        }
    }
}

/// The readings collected by one poll cycle.
///
/// Registers whose read failed have no entry. A snapshot is valid when at least one read
/// succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSnapshot {
    captured_at_millis: u64,
    values: HashMap<String, SensorValue>,
    success_count: u32,
    total_count: u32,
    valid: bool,
}

impl SensorSnapshot {
    pub(crate) fn begin(captured_at_millis: u64) -> Self {
        Self {
            captured_at_millis,
            values: HashMap::new(),
            success_count: 0,
            total_count: 0,
            valid: false,
        }
    }

    pub(crate) fn record(&mut self, name: &str, value: Option<SensorValue>) {
        self.total_count += 1;
        if let Some(value) = value {
            self.success_count += 1;
            self.values.insert(name.to_string(), value);
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.valid = self.success_count > 0;
        self
    }

    /// Build a snapshot from readings gathered elsewhere.
    ///
    /// `total_count` is the number of reads attempted and is raised to the number of
    /// values if lower.
    pub fn from_values<I>(captured_at_millis: u64, values: I, total_count: u32) -> Self
    where
        I: IntoIterator<Item = (String, SensorValue)>,
    {
        let values: HashMap<String, SensorValue> = values.into_iter().collect();
        let success_count = values.len() as u32;
        Self {
            captured_at_millis,
            values,
            success_count,
            total_count: total_count.max(success_count),
            valid: false,
        }
        .finish()
    }

    pub fn captured_at_millis(&self) -> u64 {
        self.captured_at_millis
    }

    pub fn get(&self, name: &str) -> Option<SensorValue> {
        self.values.get(name).copied()
    }

    pub fn values(&self) -> &HashMap<String, SensorValue> {
        &self.values
    }

    pub fn success_count(&self) -> u32 {
        self.success_count
    }

    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}
