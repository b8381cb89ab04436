use crate::error::{Error, Result};

/// Capture collaborator (`spec.md` §6): an iterator of captured frames,
/// each a contiguous byte slice starting at the Ethernet header. The
/// core configures the underlying filter to `"tcp port <P>"` and never
/// reads frames from anywhere else.
pub trait PacketSource {
    /// Blocks until the next frame is available, or returns `Ok(None)`
    /// on a clean end of capture (`spec.md` §5 "Suspension points":
    /// this is one of only two places the loop may block).
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Wraps a live `pcap::Capture` opened on the configured interface.
pub struct PcapSource {
    capture: pcap::Capture<pcap::Active>,
}

impl PcapSource {
    /// Opens `iface` and installs the BPF filter `"tcp port <port>"`
    /// (`spec.md` §6). Both failures are fatal at startup (§7).
    pub fn open(iface: &str, port: u16) -> Result<Self> {
        let device = pcap::Capture::from_device(iface)
            .map_err(|e| Error::DeviceOpen(e.to_string()))?
            .immediate_mode(true)
            .open()
            .map_err(|e| Error::DeviceOpen(e.to_string()))?;

        let mut capture = device;
        capture
            .filter(&format!("tcp port {port}"), true)
            .map_err(|e| Error::FilterInstall(e.to_string()))?;

        Ok(Self { capture })
    }
}

impl PacketSource for PcapSource {
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        match self.capture.next_packet() {
            Ok(packet) => Ok(Some(packet.data.to_vec())),
            Err(pcap::Error::NoMorePackets) => Ok(None),
            Err(pcap::Error::TimeoutExpired) => Ok(Some(Vec::new())),
            Err(e) => Err(Error::Io(std::io::Error::other(e.to_string()))),
        }
    }
}

/// Replays a fixed list of frames, for tests. Yields `Ok(None)` once
/// exhausted, matching `PacketSource`'s end-of-capture contract.
#[derive(Debug, Default)]
pub struct ReplaySource {
    frames: std::collections::VecDeque<Vec<u8>>,
}

impl ReplaySource {
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl PacketSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.frames.pop_front())
    }
}
