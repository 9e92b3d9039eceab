//! Line based operator console.
//!
//! `m` and `s` are answered here; every other command is forwarded to the bridge.

use log::{debug, warn};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use vent_eon::{BridgeHandle, BridgeStatus, Command, CommandError, MAX_POLL_INTERVAL, MIN_POLL_INTERVAL};
use vent_modbus::FanMode;

pub fn menu() -> String {
    format!(
        "\n=== DV10 edge console ===\n\
         0-3      set fan mode (0 off, 1 manual reduced, 2 manual normal, 3 auto)\n\
         r        read and publish now\n\
         a        toggle automatic reading\n\
         i <secs> set the poll interval ({}-{} s)\n\
         s        show status\n\
         m        show this menu\n",
        MIN_POLL_INTERVAL.as_secs(),
        MAX_POLL_INTERVAL.as_secs()
    )
}

pub fn format_status(status: &BridgeStatus) -> String {
    format!(
        "\n=== Status ===\n\
         session: {:?} bdSeq={}\n\
         auto read: {} every {}s\n\
         last read: {}/{} registers\n\
         births={} published={} not_ready={} publish_failures={}\n\
         connect attempts={} failures={} losses={}\n\
         poll cycles={} reads={} read_failures={}\n\
         writes={} write_failures={} rejected={} invalid_commands={}\n",
        status.state,
        status.bdseq,
        if status.auto_read { "on" } else { "off" },
        status.poll_interval.as_secs(),
        status.last_success_count,
        status.last_total_count,
        status.session.births,
        status.session.data_published,
        status.session.not_ready,
        status.session.publish_failures,
        status.session.connect_attempts,
        status.session.connect_failures,
        status.session.connection_losses,
        status.poll.cycles,
        status.poll.reads_attempted,
        status.poll.reads_failed,
        status.control.writes_issued,
        status.control.writes_failed,
        status.control.rejected,
        status.invalid_commands,
    )
}

/// Lines typed on stdin, read on a dedicated thread.
pub fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Serve console lines until the input ends or the bridge stops.
pub async fn run<W>(
    mut lines: mpsc::UnboundedReceiver<String>,
    mut output: W,
    handle: BridgeHandle,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(menu().as_bytes()).await?;
    output.flush().await?;

    while let Some(line) = lines.recv().await {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                warn!("Invalid console input. error={e}");
                output.write_all(format!("{e}\n").as_bytes()).await?;
                output.flush().await?;
                continue;
            }
        };

        let reply = match command {
            Command::Menu => Some(menu()),
            Command::Status => Some(format_status(&handle.status())),
            Command::SetActuator(code) => Some(match FanMode::try_from(code) {
                Ok(mode) => format!("Setting fan mode: {}\n", mode.describe()),
                Err(_) => format!("Fan mode {code} is not valid, use 0-3\n"),
            }),
            _ => None,
        };
        if let Some(reply) = reply {
            output.write_all(reply.as_bytes()).await?;
            output.flush().await?;
        }

        if matches!(command, Command::Menu | Command::Status) {
            continue;
        }
        if handle.send_command(command).await.is_err() {
            debug!("Bridge stopped, closing console");
            break;
        }
    }
    Ok(())
}
