use std::collections::HashMap;
use std::env;
use std::error::Error;
use std::io::{self, BufRead};
use std::net::{Shutdown, TcpStream};
use std::process::ExitCode;

use outbound::{OutboundSender, SenderConfig, WriteSink};
use tracing::{error, info, warn};

mod cmdline;
mod setup_tracing;

fn main() -> ExitCode {
    setup_tracing::register();

    match run() {
        Ok(report) if report.cause.is_none() => {
            info!(relayed = report.relayed, "Exiting...");
            ExitCode::SUCCESS
        }
        Ok(report) => {
            error!(
                relayed = report.relayed,
                cause = ?report.cause,
                "Sender stopped with a failure"
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<RelayReport, Box<dyn Error>> {
    let matches = cmdline::root_cli().get_matches();
    let addr = matches
        .get_one::<String>(cmdline::ARG_ADDR)
        .ok_or("missing --addr")?;

    let vars: HashMap<String, String> = env::vars().collect();
    let mut config = SenderConfig::try_from(vars)?;
    if let Some(name) = matches.get_one::<String>(cmdline::ARG_NAME) {
        config = config.with_name(name.as_str());
    }

    relay(io::stdin().lock(), addr, config)
}

/// Outcome of a relay run.
#[derive(Debug)]
struct RelayReport {
    /// Lines accepted by the sender.
    relayed: usize,
    /// Why the sender stopped, `None` on a clean stop.
    cause: Option<outbound::Error>,
}

/// Sends every line of `input` to `addr`, newline terminated, then stops and waits for the sender.
fn relay(
    input: impl BufRead,
    addr: &str,
    config: SenderConfig,
) -> Result<RelayReport, Box<dyn Error>> {
    let stream =
        TcpStream::connect(addr).map_err(|e| format!("Error connecting to {addr}: {e}"))?;
    info!(%addr, name = %config.name, "Connected");

    let sink = WriteSink::new(stream.try_clone()?);
    let sender = OutboundSender::builder(sink, move || {
        // also unblocks the peer reading from us
        if let Err(e) = stream.shutdown(Shutdown::Both) {
            warn!(?e, "Failed to shut down the connection");
        }
    })
    .config(config)
    .start()?;

    let mut relayed = 0;
    for line in input.lines() {
        let mut line = line?;
        line.push('\n');
        if let Err(e) = sender.send(line) {
            // the worker already stopped, the cause comes out of join
            warn!(%e, "Stopped relaying input");
            break;
        }
        relayed += 1;
    }
    sender.request_stop();

    let termination = sender.join()?;
    Ok(RelayReport {
        relayed,
        cause: termination.cause,
    })
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    #[test]
    fn test_relay_lines_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let peer = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut received = String::new();
            // EOF only arrives once the completion listener shut the socket down
            conn.read_to_string(&mut received).unwrap();
            received
        });

        let input = Cursor::new("one\ntwo\n\nthree");
        let config = SenderConfig::default().with_name("relay-test");
        let report = relay(input, &addr, config).unwrap();

        assert_eq!(report.relayed, 4);
        assert!(report.cause.is_none());
        assert_eq!(peer.join().unwrap(), "one\ntwo\n\nthree\n");
    }

    #[test]
    fn test_relay_connect_failure() {
        // bind then drop, so nothing is listening on the port
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let result = relay(Cursor::new("x\n"), &addr, SenderConfig::default());
        assert!(result.is_err());
    }
}
