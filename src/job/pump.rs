//! Background readers that turn child output into progress events.

use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use super::progress::{classify, ProgressEvent};

/// Longest segment forwarded as one event. Longer runs without a line
/// terminator are sent in pieces.
pub const MAX_SEGMENT_LEN: usize = 64 * 1024;

/// Read `stream` to EOF on a dedicated thread, sending one event per line.
///
/// A segment ends at either `\n` or `\r` and is sent as soon as its
/// terminator is read, since progress bars redraw themselves with carriage
/// returns and may not print a newline until they finish. A read error is
/// treated as end of stream. If the receiver goes away the stream is still
/// drained so the child never blocks on a full pipe.
pub fn spawn<R>(
    name: &str,
    stream: R,
    tx: mpsc::Sender<ProgressEvent>,
) -> std::io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    let label = name.to_string();
    thread::Builder::new()
        .name(format!("output-pump-{}", name))
        .spawn(move || pump(&label, stream, tx))
}

fn pump<R: Read>(label: &str, stream: R, tx: mpsc::Sender<ProgressEvent>) {
    let mut reader = BufReader::new(stream);
    let mut forward = Forwarder {
        tx,
        receiver_alive: true,
        sent: 0,
    };
    let mut segment = Vec::with_capacity(256);

    loop {
        let available = match reader.fill_buf() {
            Ok([]) => break,
            Ok(available) => available,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!(stream = label, "read failed, treating as end of stream: {}", e);
                break;
            }
        };

        let room = MAX_SEGMENT_LEN - segment.len();
        let (used, terminated) = match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
            Some(end) if end <= room => {
                segment.extend_from_slice(&available[..end]);
                (end + 1, true)
            }
            _ => {
                let used = available.len().min(room);
                segment.extend_from_slice(&available[..used]);
                (used, false)
            }
        };
        reader.consume(used);

        if terminated || segment.len() >= MAX_SEGMENT_LEN {
            forward.send(&segment);
            segment.clear();
        }
    }

    forward.send(&segment);
    tracing::debug!(stream = label, segments = forward.sent, "output stream closed");
}

struct Forwarder {
    tx: mpsc::Sender<ProgressEvent>,
    receiver_alive: bool,
    sent: usize,
}

impl Forwarder {
    fn send(&mut self, segment: &[u8]) {
        if segment.is_empty() || !self.receiver_alive {
            return;
        }
        self.sent += 1;
        if self.tx.send(classify(segment)).is_err() {
            self.receiver_alive = false;
        }
    }
}
