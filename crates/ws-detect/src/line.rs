//! Serial line abstraction
//!
//! Protocol code never touches a serial port directly. It asks a
//! [`PortOpener`] for a [`SerialLine`], uses it for exactly one exchange and
//! drops it, which releases the port. The real backend is
//! [`SerialPortOpener`]; tests plug in a simulated bus.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{ClearBuffer, DataBits, SerialPort, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{trace, warn};

use crate::error::DetectError;

/// Parity setting for a serial line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineParity {
    #[default]
    None,
    Odd,
    Even,
    /// Parity bit always 0
    Space,
}

impl LineParity {
    /// Map onto the parity modes the serial backend supports
    ///
    /// The backend has no mark/space modes; space parity is opened as no
    /// parity.
    fn to_backend(self) -> tokio_serial::Parity {
        match self {
            LineParity::None | LineParity::Space => tokio_serial::Parity::None,
            LineParity::Odd => tokio_serial::Parity::Odd,
            LineParity::Even => tokio_serial::Parity::Even,
        }
    }
}

static SPACE_PARITY_WARNED: AtomicBool = AtomicBool::new(false);

/// Log the space-parity fallback once per `warned` flag
///
/// Returns `true` if this call emitted the warning.
fn warn_space_fallback(warned: &AtomicBool, port: &str) -> bool {
    if warned.swap(true, Ordering::Relaxed) {
        return false;
    }
    warn!(
        port,
        "Serial backend has no space parity, opening with no parity; frames differ from 8S1"
    );
    true
}

/// Settings used to open a line (always 8 data bits, 1 stop bit)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSettings {
    /// Baud rate
    pub baud_rate: u32,
    /// Parity
    pub parity: LineParity,
    /// Read timeout
    pub timeout: Duration,
}

impl LineSettings {
    /// Settings for the laser text protocol (19200 8N1, 1 s timeout)
    pub fn text() -> Self {
        Self {
            baud_rate: 19200,
            parity: LineParity::None,
            timeout: Duration::from_secs(1),
        }
    }

    /// Settings for the scale mass read (19200 8S1, 1 s timeout)
    pub fn mass() -> Self {
        Self {
            parity: LineParity::Space,
            ..Self::text()
        }
    }
}

impl Default for LineSettings {
    fn default() -> Self {
        Self::text()
    }
}

/// An open serial line
pub trait SerialLine: AsyncRead + AsyncWrite + Unpin + Send {
    /// Discard anything sitting in the input buffer
    fn clear_input(&mut self) -> io::Result<()>;
}

impl SerialLine for SerialStream {
    fn clear_input(&mut self) -> io::Result<()> {
        SerialPort::clear(self, ClearBuffer::Input).map_err(io::Error::from)
    }
}

/// Opens serial lines by port name
pub trait PortOpener {
    /// Line type produced by this opener
    type Line: SerialLine;

    /// Open `port`; the line is released when dropped
    fn open(&self, port: &str, settings: &LineSettings) -> Result<Self::Line, DetectError>;
}

/// Opens real serial ports through `tokio-serial`
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortOpener;

impl PortOpener for SerialPortOpener {
    type Line = SerialStream;

    fn open(&self, port: &str, settings: &LineSettings) -> Result<Self::Line, DetectError> {
        trace!(
            "Opening {} at {} baud ({:?} parity)",
            port,
            settings.baud_rate,
            settings.parity
        );
        if settings.parity == LineParity::Space {
            warn_space_fallback(&SPACE_PARITY_WARNED, port);
        }

        tokio_serial::new(port, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(settings.parity.to_backend())
            .timeout(settings.timeout)
            .open_native_async()
            .map_err(|e| DetectError::PortUnavailable {
                port: port.to_string(),
                reason: e.to_string(),
            })
    }
}
