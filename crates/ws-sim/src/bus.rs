//! Simulated serial bus
//!
//! [`SimBus`] stands in for the real serial backend. Each port name maps to
//! a virtual device; opening the port yields a [`SimLine`] whose writes are
//! fed to the device and whose reads return the device's replies. Replies
//! are produced as soon as the command byte is written, so a read on an
//! empty line simply stays pending until the caller's timeout fires.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::trace;
use ws_detect::{DetectError, LineSettings, PortOpener, SerialLine};
use ws_protocol::Command;

use crate::laser::VirtualLaser;
use crate::scale::VirtualScale;

/// Any device that can sit on a simulated port
#[derive(Debug, Clone)]
pub enum VirtualDevice {
    Scale(VirtualScale),
    Laser(VirtualLaser),
    /// Answers nothing
    Silent,
}

impl VirtualDevice {
    fn respond(&self, byte: u8) -> Vec<u8> {
        match self {
            VirtualDevice::Scale(scale) => scale.respond(byte),
            VirtualDevice::Laser(laser) => laser.respond(byte),
            VirtualDevice::Silent => Vec::new(),
        }
    }
}

impl From<VirtualScale> for VirtualDevice {
    fn from(scale: VirtualScale) -> Self {
        VirtualDevice::Scale(scale)
    }
}

impl From<VirtualLaser> for VirtualDevice {
    fn from(laser: VirtualLaser) -> Self {
        VirtualDevice::Laser(laser)
    }
}

#[derive(Debug)]
struct DeviceState {
    device: VirtualDevice,
    received: HashMap<u8, usize>,
    opens: usize,
    unplugged: bool,
    last_settings: Option<LineSettings>,
}

/// Shared handle to a device attached to a [`SimBus`]
///
/// Tests keep a handle to change what the device reports and to inspect
/// what it was sent.
#[derive(Debug, Clone)]
pub struct SimDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl SimDevice {
    fn new(device: VirtualDevice) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                device,
                received: HashMap::new(),
                opens: 0,
                unplugged: false,
                last_settings: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the distance a laser measures (no-op for other devices)
    pub fn set_distance(&self, meters: f64) {
        if let VirtualDevice::Laser(laser) = &mut self.lock().device {
            laser.set_distance(meters);
        }
    }

    /// Set the weight a scale reads (no-op for other devices)
    pub fn set_grams(&self, grams: i32) {
        if let VirtualDevice::Scale(scale) = &mut self.lock().device {
            scale.set_grams(grams);
        }
    }

    /// Replace a laser's distance replies with a fixed line
    pub fn set_distance_reply(&self, line: Option<&str>) {
        if let VirtualDevice::Laser(laser) = &mut self.lock().device {
            laser.set_distance_reply(line.map(str::to_string));
        }
    }

    /// Stop (or resume) answering commands
    pub fn set_responsive(&self, responsive: bool) {
        match &mut self.lock().device {
            VirtualDevice::Scale(scale) => scale.set_responsive(responsive),
            VirtualDevice::Laser(laser) => laser.set_responsive(responsive),
            VirtualDevice::Silent => {}
        }
    }

    /// Make opening the port fail
    pub fn set_unplugged(&self, unplugged: bool) {
        self.lock().unplugged = unplugged;
    }

    /// How many times `command` was written to this device
    pub fn commands_received(&self, command: Command) -> usize {
        self.lock()
            .received
            .get(&command.byte())
            .copied()
            .unwrap_or(0)
    }

    /// Total command bytes written to this device
    pub fn total_commands(&self) -> usize {
        self.lock().received.values().sum()
    }

    /// How many times the port was opened
    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    /// Settings used for the most recent open
    pub fn last_settings(&self) -> Option<LineSettings> {
        self.lock().last_settings.clone()
    }

    fn handle_byte(&self, byte: u8) -> Vec<u8> {
        let mut state = self.lock();
        *state.received.entry(byte).or_insert(0) += 1;
        state.device.respond(byte)
    }
}

/// A set of virtual devices addressed by port name
#[derive(Debug, Clone, Default)]
pub struct SimBus {
    ports: Arc<Mutex<BTreeMap<String, SimDevice>>>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device to `port`, replacing whatever was there
    pub fn attach(&self, port: &str, device: impl Into<VirtualDevice>) -> SimDevice {
        let handle = SimDevice::new(device.into());
        self.lock().insert(port.to_string(), handle.clone());
        handle
    }

    /// Attach a device that never answers
    pub fn attach_silent(&self, port: &str) -> SimDevice {
        self.attach(port, VirtualDevice::Silent)
    }

    /// Port names in order
    pub fn ports(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Handle for the device on `port`
    pub fn device(&self, port: &str) -> Option<SimDevice> {
        self.lock().get(port).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, SimDevice>> {
        self.ports.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PortOpener for SimBus {
    type Line = SimLine;

    fn open(&self, port: &str, settings: &LineSettings) -> Result<Self::Line, DetectError> {
        let unavailable = |reason: &str| DetectError::PortUnavailable {
            port: port.to_string(),
            reason: reason.to_string(),
        };

        let device = self.device(port).ok_or_else(|| unavailable("no such port"))?;
        let pending = {
            let mut state = device.lock();
            if state.unplugged {
                return Err(unavailable("device unplugged"));
            }
            state.opens += 1;
            state.last_settings = Some(settings.clone());
            let stale: VecDeque<u8> = match &state.device {
                VirtualDevice::Scale(scale) => scale.stale_input().iter().copied().collect(),
                _ => VecDeque::new(),
            };
            stale
        };

        trace!("Opened simulated port {}", port);
        Ok(SimLine { device, pending })
    }
}

/// An open line to a virtual device
#[derive(Debug)]
pub struct SimLine {
    device: SimDevice,
    pending: VecDeque<u8>,
}

impl SimLine {
    /// Bytes waiting to be read
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl AsyncRead for SimLine {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.pending.is_empty() {
            return Poll::Pending;
        }

        let n = buf.remaining().min(this.pending.len());
        let chunk: Vec<u8> = this.pending.drain(..n).collect();
        buf.put_slice(&chunk);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for SimLine {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        for &byte in buf {
            let reply = this.device.handle_byte(byte);
            this.pending.extend(reply);
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl SerialLine for SimLine {
    fn clear_input(&mut self) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }
}
