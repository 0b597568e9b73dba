/// Head sources that run on a plain terminal machine.
///
/// Face detection lives in an external tracker process that writes samples
/// in the line protocol from `parallax_core::protocol`; these sources read
/// that feed on a background thread and publish into a `SharedHeadOffset`.
/// Without a tracker, `KeyboardHead` lets the arrow keys stand in for the
/// viewer's head.
use parallax_core::head::{HeadOffset, HeadSource, SharedHeadOffset};
use parallax_core::protocol::{last_sample, parse_line};
use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::net::{SocketAddr, UdpSocket};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Pause after a failed read before trying again
pub const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Largest payload a UDP datagram can carry
const MAX_DATAGRAM: usize = 65_535;

/// Which head source to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadSourceKind {
    Keys,
    Stdin,
    Udp(SocketAddr),
}

impl FromStr for HeadSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keys" => Ok(Self::Keys),
            "stdin" => Ok(Self::Stdin),
            _ => match s.strip_prefix("udp:") {
                Some(addr) => addr
                    .parse()
                    .map(Self::Udp)
                    .map_err(|e| format!("invalid UDP address `{addr}`: {e}")),
                None => Err(format!(
                    "unknown head source `{s}` (expected keys, stdin or udp:<addr>)"
                )),
            },
        }
    }
}

impl fmt::Display for HeadSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keys => f.write_str("keys"),
            Self::Stdin => f.write_str("stdin"),
            Self::Udp(addr) => write!(f, "udp:{addr}"),
        }
    }
}

/// Start the requested source
pub fn start(kind: &HeadSourceKind, mirror: bool) -> io::Result<Box<dyn HeadSource>> {
    let source: Box<dyn HeadSource> = match kind {
        HeadSourceKind::Keys => Box::new(KeyboardHead::default()),
        HeadSourceKind::Stdin => Box::new(FeedHead::stdin(mirror)),
        HeadSourceKind::Udp(addr) => Box::new(FeedHead::udp(*addr, mirror)?),
    };
    tracing::info!(source = %kind, mirror, "head source started");
    Ok(source)
}

/// Simulated head moved with the arrow keys
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardHead {
    offset: HeadOffset,
}

impl HeadSource for KeyboardHead {
    fn latest(&self) -> HeadOffset {
        self.offset
    }

    fn nudge(&mut self, dx: f32, dy: f32) {
        self.offset = self.offset.nudged(dx, dy);
    }

    fn recenter(&mut self) {
        self.offset = HeadOffset::CENTER;
    }

    fn stop(&mut self) {}

    fn name(&self) -> &str {
        "keys"
    }
}

/// Head offset fed by an external tracker on a background thread
pub struct FeedHead {
    label: String,
    shared: SharedHeadOffset,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    /// The worker notices `stop` on its own; join it when stopping
    joinable: bool,
}

impl FeedHead {
    /// Read samples from any line-oriented reader.
    ///
    /// A blocking reader cannot be interrupted, so the worker is detached on
    /// stop and exits at its next line; it publishes nothing after stop.
    pub fn from_reader<R>(label: &str, reader: R, mirror: bool) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let shared = SharedHeadOffset::default();
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let shared = shared.clone();
            let stop = stop.clone();
            let label = label.to_string();
            thread::spawn(move || read_loop(&label, reader, mirror, &shared, &stop))
        };

        Self {
            label: label.to_string(),
            shared,
            stop,
            handle: Some(handle),
            joinable: false,
        }
    }

    pub fn stdin(mirror: bool) -> Self {
        Self::from_reader("stdin", BufReader::new(io::stdin()), mirror)
    }

    /// Listen for datagrams of one or more sample lines
    pub fn udp(addr: SocketAddr, mirror: bool) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(RETRY_DELAY))?;
        let local = socket.local_addr()?;

        let shared = SharedHeadOffset::default();
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let shared = shared.clone();
            let stop = stop.clone();
            thread::spawn(move || udp_loop(socket, mirror, &shared, &stop))
        };

        Ok(Self {
            label: format!("udp:{local}"),
            shared,
            stop,
            handle: Some(handle),
            joinable: true,
        })
    }
}

impl HeadSource for FeedHead {
    fn latest(&self) -> HeadOffset {
        self.shared.latest()
    }

    fn stop(&mut self) {
        if self.stop.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.handle.take() {
            if self.joinable || handle.is_finished() {
                if handle.join().is_err() {
                    tracing::warn!(source = %self.label, "head feed worker panicked");
                }
            }
        }
        tracing::info!(source = %self.label, "head source stopped");
    }

    fn name(&self) -> &str {
        &self.label
    }
}

impl Drop for FeedHead {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop<R: BufRead>(
    label: &str,
    mut reader: R,
    mirror: bool,
    shared: &SharedHeadOffset,
    stop: &AtomicBool,
) {
    let mut line = String::new();
    while !stop.load(Ordering::Acquire) {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => {
                tracing::info!(source = label, "head feed closed, keeping last offset");
                break;
            }
            Ok(_) => match parse_line(&line) {
                Ok(Some(sample)) if !stop.load(Ordering::Acquire) => {
                    shared.publish(sample.to_offset(mirror));
                }
                Ok(_) => {}
                Err(err) => tracing::debug!(source = label, %err, "dropping head sample"),
            },
            Err(err) => {
                tracing::debug!(source = label, %err, "head feed read failed");
                thread::sleep(RETRY_DELAY);
            }
        }
    }
}

fn udp_loop(socket: UdpSocket, mirror: bool, shared: &SharedHeadOffset, stop: &AtomicBool) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    while !stop.load(Ordering::Acquire) {
        match socket.recv(&mut buf) {
            Ok(n) => {
                if let Some(sample) = last_sample(&String::from_utf8_lossy(&buf[..n])) {
                    shared.publish(sample.to_offset(mirror));
                }
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) => {}
            Err(err) => {
                tracing::debug!(%err, "head feed receive failed");
                thread::sleep(RETRY_DELAY);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Instant;

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_parse_head_source_kind() {
        assert_eq!("keys".parse::<HeadSourceKind>().unwrap(), HeadSourceKind::Keys);
        assert_eq!("stdin".parse::<HeadSourceKind>().unwrap(), HeadSourceKind::Stdin);
        assert_eq!(
            "udp:127.0.0.1:5005".parse::<HeadSourceKind>().unwrap(),
            HeadSourceKind::Udp("127.0.0.1:5005".parse().unwrap())
        );
        assert!("udp:nowhere".parse::<HeadSourceKind>().is_err());
        assert!("webcam".parse::<HeadSourceKind>().is_err());
        assert_eq!(HeadSourceKind::Udp("127.0.0.1:9".parse().unwrap()).to_string(), "udp:127.0.0.1:9");
    }

    #[test]
    fn test_keyboard_head() {
        let mut head = KeyboardHead::default();
        head.nudge(0.1, 0.0);
        head.nudge(0.1, -0.1);
        let h = head.latest();
        assert!((h.x - 0.2).abs() < 1e-6);
        assert!((h.y + 0.1).abs() < 1e-6);

        for _ in 0..30 {
            head.nudge(0.1, 0.0);
        }
        assert_eq!(head.latest().x, 1.0);

        head.recenter();
        assert_eq!(head.latest(), HeadOffset::CENTER);
    }

    #[test]
    fn test_feed_from_reader_keeps_last_good_sample() {
        let input = "landmark 0.75 0.5\nnot a sample\noffset 0.25 -0.5\n\n";
        let mut head = FeedHead::from_reader("test", Cursor::new(input), false);

        assert!(wait_for(|| head.latest() == HeadOffset::new(0.25, -0.5)));
        // Input ran out; the last offset stays put
        thread::sleep(Duration::from_millis(50));
        assert_eq!(head.latest(), HeadOffset::new(0.25, -0.5));

        head.stop();
        head.stop();
        assert_eq!(head.latest(), HeadOffset::new(0.25, -0.5));
    }

    #[test]
    fn test_feed_keeps_up_with_a_burst() {
        let mut input = String::new();
        for i in 0..300 {
            input.push_str(&format!("offset {:.3} 0.0\n", i as f32 / 1000.0));
        }
        input.push_str("offset 0.9 0.9\n");

        let started = Instant::now();
        let mut head = FeedHead::from_reader("burst", Cursor::new(input), false);
        assert!(wait_for(|| head.latest() == HeadOffset::new(0.9, 0.9)));
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "newest sample took {:?}",
            started.elapsed()
        );
        head.stop();
    }

    #[test]
    fn test_feed_mirrors_landmarks() {
        let mut head = FeedHead::from_reader("test", Cursor::new("landmark 1.0 0.5\n"), true);
        assert!(wait_for(|| head.latest() == HeadOffset::new(-1.0, 0.0)));
        head.stop();
    }

    #[test]
    fn test_udp_feed() {
        let mut head = FeedHead::udp("127.0.0.1:0".parse().unwrap(), false).unwrap();
        let target: SocketAddr = head.name().trim_start_matches("udp:").parse().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        assert!(wait_for(|| {
            sender.send_to(b"garbage\noffset -0.5 0.5\n", target).unwrap();
            head.latest() == HeadOffset::new(-0.5, 0.5)
        }));

        head.stop();
        head.stop();
    }

    #[test]
    fn test_udp_feed_reads_large_datagrams() {
        let mut head = FeedHead::udp("127.0.0.1:0".parse().unwrap(), false).unwrap();
        let target: SocketAddr = head.name().trim_start_matches("udp:").parse().unwrap();

        // Well past a small fixed buffer; only the final line should win
        let mut payload = "offset 0.5 0.5\n".repeat(400);
        payload.push_str("offset 0.125 -0.75\n");
        assert!(payload.len() > 4096);

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        assert!(wait_for(|| {
            sender.send_to(payload.as_bytes(), target).unwrap();
            head.latest() == HeadOffset::new(0.125, -0.75)
        }));

        head.stop();
    }
}
