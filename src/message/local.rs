use crossbeam_channel::{Receiver, Sender};

use super::comm::Communicator;

/// Connects a group of ranks living in one process, one thread per rank,
/// through unbounded channels. Besides serving as the threaded driver
/// transport, this is the mock that lets the halo exchange be tested without
/// any real multi-process runtime.
///
pub struct LocalCommunicator {
    rank: usize,
    outboxes: Vec<Sender<Vec<u8>>>,
    recv_sink: Sender<Vec<u8>>,
    recv_src: Receiver<Vec<u8>>,
}

/// Build the fully wired group. The returned communicators are meant to be
/// moved onto their own threads; each one holds a sender for every peer's
/// inbox.
///
pub fn local_group(size: usize) -> Vec<LocalCommunicator> {
    let (sinks, sources): (Vec<_>, Vec<_>) =
        (0..size).map(|_| crossbeam_channel::unbounded()).unzip();

    sources
        .into_iter()
        .enumerate()
        .map(|(rank, recv_src)| LocalCommunicator {
            rank,
            outboxes: sinks.clone(),
            recv_sink: sinks[rank].clone(),
            recv_src,
        })
        .collect()
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn send(&self, rank: usize, message: Vec<u8>) {
        self.outboxes[rank].send(message).unwrap()
    }

    fn recv(&self) -> Vec<u8> {
        self.recv_src.recv().unwrap()
    }

    fn requeue_recv(&self, bytes: Vec<u8>) {
        self.recv_sink.send(bytes).unwrap()
    }
}
