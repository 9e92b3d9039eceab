use std::{str::FromStr, time::Duration};

use crate::CommandError;

pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// An operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Write an actuator code (fan mode)
    SetActuator(u16),
    /// Poll and publish now
    ReadNow,
    ToggleAutoRead,
    SetInterval(Duration),
    /// Console only
    Menu,
    /// Console only
    Status,
}

impl Command {
    pub fn validate_interval(interval: Duration) -> Result<Duration, CommandError> {
        if (MIN_POLL_INTERVAL..=MAX_POLL_INTERVAL).contains(&interval) {
            Ok(interval)
        } else {
            Err(CommandError::IntervalOutOfRange(interval))
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    /// Parse a console line. Everything needed is on the line; parsing never waits for more input.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim().to_lowercase();
        let mut parts = line.split_whitespace();
        let head = parts.next().ok_or(CommandError::Empty)?;

        if head.chars().all(|c| c.is_ascii_digit()) {
            return head
                .parse::<u16>()
                .map(Command::SetActuator)
                .map_err(|_| CommandError::InvalidCode(head.to_string()));
        }

        let command = match head {
            "r" => Command::ReadNow,
            "a" => Command::ToggleAutoRead,
            "m" => Command::Menu,
            "s" => Command::Status,
            "i" => {
                let secs = parts.next().ok_or(CommandError::MissingInterval)?;
                let secs: u64 = secs
                    .parse()
                    .map_err(|_| CommandError::InvalidInterval(secs.to_string()))?;
                Command::SetInterval(Command::validate_interval(Duration::from_secs(secs))?)
            }
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}
