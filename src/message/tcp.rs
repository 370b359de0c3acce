use std::collections::HashMap;
use std::io::prelude::*;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use log::{error, info, warn};

use super::backoff::ExponentialBackoff;
use super::comm::Communicator;
use super::util;

const RECONNECT_WAIT: Duration = Duration::from_millis(100);
const RECONNECT_MAX_WAIT: Duration = Duration::from_millis(5000);

type SendSink = crossbeam_channel::Sender<(usize, Vec<u8>)>;
type RecvSink = crossbeam_channel::Sender<Vec<u8>>;
type RecvSrc = crossbeam_channel::Receiver<Vec<u8>>;

/// Owns the background threads that move frames between this rank and its
/// peers: a listener accepting inbound connections, and a serial sender
/// draining the outbound channel. Frames are length-prefixed and each one is
/// acknowledged with the byte count the receiver read; a mismatched ack is a
/// fatal transport fault and panics the sender thread, which is how an
/// unrecoverable communication error aborts the whole computation.
///
pub struct TcpHost {
    send_thread: Option<thread::JoinHandle<()>>,
    _listen_thread: thread::JoinHandle<()>,
}

impl TcpHost {
    pub fn new(rank: usize, peers: Vec<SocketAddr>) -> (Self, SendSink, RecvSink, RecvSrc) {
        let (send_sink, send_src) = crossbeam_channel::unbounded();
        let (recv_sink, recv_src) = crossbeam_channel::unbounded();
        let send_thread = Self::start_sender(peers.clone(), send_src);
        let listen_thread = Self::start_listener(peers[rank], recv_sink.clone());

        (
            TcpHost {
                send_thread: Some(send_thread),
                _listen_thread: listen_thread,
            },
            send_sink,
            recv_sink,
            recv_src,
        )
    }

    /// Block until the outbound channel is closed and drained. The channel
    /// closes when every `TcpCommunicator` clone of the send sink has been
    /// dropped.
    pub fn join(&mut self) {
        if let Some(thread) = self.send_thread.take() {
            thread.join().unwrap()
        }
    }

    fn start_sender(
        peers: Vec<SocketAddr>,
        send_src: crossbeam_channel::Receiver<(usize, Vec<u8>)>,
    ) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            let mut connections: HashMap<usize, TcpStream> = HashMap::new();

            for (rank, message) in send_src {
                loop {
                    let stream = connections
                        .entry(rank)
                        .or_insert_with(|| Self::connect_with_retry(peers[rank]));

                    match Self::send_framed(stream, &message) {
                        Ok(()) => break,
                        Err(e) => {
                            warn!("resending to {} over a fresh connection: {}", peers[rank], e);
                            connections.remove(&rank);
                        }
                    }
                }
            }
        })
    }

    fn send_framed(stream: &mut TcpStream, message: &[u8]) -> std::io::Result<()> {
        util::write_frame(stream, message)?;
        let ack = util::read_usize(stream)?;
        if ack != message.len() {
            panic!(
                "peer acked {} bytes for a {} byte frame; the stream is corrupt",
                ack,
                message.len()
            );
        }
        Ok(())
    }

    fn start_listener(addr: SocketAddr, recv_sink: RecvSink) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            info!("listening on {}", addr);
            let listener = TcpListener::bind(addr).unwrap();
            for stream in listener.incoming() {
                Self::serve_connection(stream.unwrap(), recv_sink.clone());
            }
        })
    }

    fn serve_connection(mut stream: TcpStream, recv_sink: RecvSink) -> thread::JoinHandle<()> {
        let remote = stream.peer_addr().unwrap();
        info!("connection from {}", remote);

        thread::spawn(move || loop {
            match util::read_frame(&mut stream) {
                Ok(bytes) => {
                    let size = bytes.len();
                    recv_sink.send(bytes).unwrap();
                    if let Err(e) = stream.write_all(&size.to_le_bytes()) {
                        error!("dropping connection from {}: {}", remote, e);
                        break;
                    }
                }
                Err(e) => {
                    info!("connection from {} closed: {}", remote, e);
                    break;
                }
            }
        })
    }

    fn connect_with_retry(addr: SocketAddr) -> TcpStream {
        ExponentialBackoff::new(RECONNECT_WAIT, RECONNECT_MAX_WAIT, 2)
            .find_map(|wait| match TcpStream::connect(&addr) {
                Ok(stream) => Some(stream),
                Err(e) => {
                    warn!("connect to {} failed ({}), retrying in {:?}", addr, e, wait);
                    thread::sleep(wait);
                    None
                }
            })
            .unwrap()
    }
}

/// The socket-backed `Communicator`. It is a set of channel endpoints into a
/// `TcpHost`; dropping it closes the outbound channel so the host's sender
/// thread can finish.
///
pub struct TcpCommunicator {
    rank: usize,
    num_peers: usize,
    send_sink: Option<SendSink>,
    recv_sink: Option<RecvSink>,
    recv_src: Option<RecvSrc>,
}

impl TcpCommunicator {
    pub fn new(
        rank: usize,
        peers: Vec<SocketAddr>,
        send_sink: SendSink,
        recv_sink: RecvSink,
        recv_src: RecvSrc,
    ) -> Self {
        Self {
            rank,
            num_peers: peers.len(),
            send_sink: Some(send_sink),
            recv_sink: Some(recv_sink),
            recv_src: Some(recv_src),
        }
    }
}

impl Communicator for TcpCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.num_peers
    }

    fn send(&self, rank: usize, message: Vec<u8>) {
        self.send_sink
            .as_ref()
            .unwrap()
            .send((rank, message))
            .unwrap()
    }

    fn recv(&self) -> Vec<u8> {
        self.recv_src.as_ref().unwrap().recv().unwrap()
    }

    fn requeue_recv(&self, bytes: Vec<u8>) {
        self.recv_sink.as_ref().unwrap().send(bytes).unwrap()
    }
}

impl Drop for TcpCommunicator {
    fn drop(&mut self) {
        self.send_sink.take();
        self.recv_src.take();
    }
}
