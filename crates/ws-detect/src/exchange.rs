//! Command/response exchange
//!
//! A text exchange opens the line, writes one command byte, waits for the
//! device to settle, reads one ASCII line and checks its shape. Failed
//! attempts are retried with a linear backoff: the pause after attempt `n`
//! is `n × backoff_step`.
//!
//! The mass read is a separate, faster path with no retries of its own:
//! it clears stale input, writes the mass command and waits a short window
//! for exactly two bytes.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, trace, warn};
use ws_protocol::{Command, DistanceReply, MassSample};

use crate::error::{AttemptFailure, DetectError};
use crate::line::{LineSettings, PortOpener, SerialLine};

/// Bounded retry with linear backoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts (at least one is always made)
    pub attempts: u32,
    /// Backoff unit; the pause after attempt `n` is `n` units
    pub backoff_step: Duration,
}

impl RetryPolicy {
    /// Full retry budget used for calibration and ranging
    pub fn standard() -> Self {
        Self {
            attempts: 5,
            backoff_step: Duration::from_secs(1),
        }
    }

    /// Single attempt used to probe unknown ports
    pub fn probe() -> Self {
        Self {
            attempts: 1,
            ..Self::standard()
        }
    }

    /// Pause to take after failed attempt number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Line and timing configuration for a [`DeviceBus`]
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Line settings for text commands
    pub text_line: LineSettings,
    /// Delay between writing a text command and reading the reply
    pub settle: Duration,
    /// Line settings for the mass read
    pub mass_line: LineSettings,
    /// How long to wait for the two mass bytes
    pub mass_window: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            text_line: LineSettings::text(),
            settle: Duration::from_millis(500),
            mass_line: LineSettings::mass(),
            mass_window: Duration::from_secs(1),
        }
    }
}

/// Executes device commands over lines provided by a [`PortOpener`]
pub struct DeviceBus<O> {
    opener: O,
    config: BusConfig,
}

impl<O: PortOpener> DeviceBus<O> {
    /// Create a bus with default configuration
    pub fn new(opener: O) -> Self {
        Self::with_config(opener, BusConfig::default())
    }

    /// Create a bus with custom configuration
    pub fn with_config(opener: O, config: BusConfig) -> Self {
        Self { opener, config }
    }

    /// Bus configuration
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// The opener lines are taken from
    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Send a text command and wait for a well-formed reply
    ///
    /// Returns the trimmed reply line, or [`DetectError::ProtocolTimeout`]
    /// carrying the last attempt's failure once `retry.attempts` are used up.
    pub async fn send_and_await(
        &self,
        port: &str,
        command: Command,
        retry: &RetryPolicy,
    ) -> Result<String, DetectError> {
        let attempts = retry.attempts.max(1);
        let mut last = AttemptFailure::NoReply;

        for attempt in 1..=attempts {
            match self.attempt(port, command, attempt).await {
                Ok(line) => return Ok(line),
                Err(failure) => {
                    match failure {
                        AttemptFailure::NoReply => {
                            debug!(port, attempt, "No reply to {}", command)
                        }
                        _ => warn!(port, attempt, "{} failed: {}", command, failure),
                    }
                    last = failure;
                }
            }

            if attempt < attempts {
                sleep(retry.backoff(attempt)).await;
            }
        }

        Err(DetectError::ProtocolTimeout {
            port: port.to_string(),
            command,
            attempts,
            last,
        })
    }

    /// Query a laser's distance and parse the reply
    pub async fn measure_distance(
        &self,
        port: &str,
        retry: &RetryPolicy,
    ) -> Result<DistanceReply, DetectError> {
        let line = self.send_and_await(port, Command::Distance, retry).await?;
        line.parse::<DistanceReply>()
            .map_err(|source| DetectError::MalformedResponse {
                port: port.to_string(),
                source,
            })
    }

    /// Read one mass sample from the scale
    pub async fn read_mass(&self, port: &str) -> Result<MassSample, DetectError> {
        let io_err = |e: io::Error| DetectError::Io {
            port: port.to_string(),
            reason: e.to_string(),
        };

        let mut line = self.opener.open(port, &self.config.mass_line)?;
        line.clear_input().map_err(io_err)?;
        line.write_all(&[Command::Mass.byte()]).await.map_err(io_err)?;
        line.flush().await.map_err(io_err)?;

        let mut buf = [0u8; 2];
        match timeout(self.config.mass_window, line.read_exact(&mut buf)).await {
            Ok(Ok(_)) => {
                let sample = MassSample::from_bytes(&buf).map_err(|source| {
                    DetectError::MalformedResponse {
                        port: port.to_string(),
                        source,
                    }
                })?;
                debug!(port, "Mass {} g (raw {:02X?})", sample.grams(), buf);
                Ok(sample)
            }
            Ok(Err(e)) => Err(io_err(e)),
            Err(_) => Err(DetectError::ProtocolTimeout {
                port: port.to_string(),
                command: Command::Mass,
                attempts: 1,
                last: AttemptFailure::NoReply,
            }),
        }
    }

    /// One open/write/settle/read cycle; the line is released on return
    async fn attempt(
        &self,
        port: &str,
        command: Command,
        attempt: u32,
    ) -> Result<String, AttemptFailure> {
        let mut line = self
            .opener
            .open(port, &self.config.text_line)
            .map_err(|e| AttemptFailure::Open(e.to_string()))?;

        trace!(port, attempt, "Sending {}", command);
        line.write_all(&[command.byte()])
            .await
            .map_err(|e| AttemptFailure::Io(e.to_string()))?;
        line.flush()
            .await
            .map_err(|e| AttemptFailure::Io(e.to_string()))?;

        sleep(self.config.settle).await;

        let raw = read_line(&mut line, self.config.text_line.timeout)
            .await
            .map_err(|e| AttemptFailure::Io(e.to_string()))?;
        let reply = ascii_line(&raw);
        trace!(port, attempt, "Reply {:?}", reply);

        if command.accepts_reply(&reply) {
            Ok(reply)
        } else if reply.is_empty() {
            Err(AttemptFailure::NoReply)
        } else {
            Err(AttemptFailure::Malformed(reply))
        }
    }
}

/// Read up to and including `\n`, or whatever arrived before `limit`
async fn read_line<S>(stream: &mut S, limit: Duration) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let deadline = Instant::now() + limit;
    let mut line = Vec::new();
    let mut buf = [0u8; 64];

    loop {
        match timeout_at(deadline, stream.read(&mut buf)).await {
            Ok(Ok(0)) | Err(_) => break,
            Ok(Ok(n)) => {
                let chunk = &buf[..n];
                if let Some(pos) = chunk.iter().position(|&b| b == b'\n') {
                    line.extend_from_slice(&chunk[..=pos]);
                    break;
                }
                line.extend_from_slice(chunk);
            }
            Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => break,
            Ok(Err(e)) => return Err(e),
        }
    }

    Ok(line)
}

/// Decode a raw line as ASCII, dropping anything else, and trim it
fn ascii_line(raw: &[u8]) -> String {
    raw.iter()
        .filter(|b| b.is_ascii())
        .map(|&b| char::from(b))
        .collect::<String>()
        .trim()
        .to_string()
}
