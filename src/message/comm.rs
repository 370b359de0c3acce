use super::util;

/// Interface for a group of ranks that exchange messages over some
/// transport. The halo exchange and the collectives below are written
/// against this trait only, so a group can be a set of threads joined by
/// channels just as well as a set of processes joined by sockets.
///
pub trait Communicator {
    /// Must be implemented to return the rank of this process within the
    /// group.
    fn rank(&self) -> usize;

    /// Must be implemented to return the number of ranks in the group.
    fn size(&self) -> usize;

    /// Must be implemented to send a message to a peer. This method must
    /// return immediately; it is not allowed to block until a matching
    /// receive is posted. The halo exchange relies on this to post all of
    /// its outgoing planes before any receive, which is what makes the
    /// interior-rank double send deadlock-free.
    fn send(&self, rank: usize, message: Vec<u8>);

    /// Must be implemented to receive a message from any peer, blocking
    /// until one is available.
    fn recv(&self) -> Vec<u8>;

    /// Put a received message back on the inbound queue. Used by receivers
    /// that pulled a message belonging to a later step than the one they are
    /// currently completing.
    fn requeue_recv(&self, bytes: Vec<u8>);

    /// Implements a binomial tree broadcast from rank 0. The message buffer
    /// must be `Some` on rank 0 and `None` everywhere else. At each level a
    /// rank that already holds the value hands it to the peer one stride
    /// above, provided that peer exists; group sizes that are not powers of
    /// two simply leave the out-of-range branches of the tree empty.
    ///
    fn broadcast(&self, value: Option<Vec<u8>>) -> Vec<u8> {
        let r = self.rank();
        let p = self.size();

        let value = match value {
            Some(value) => value,
            None => self.recv(),
        };
        for level in (0..util::ceil_log2(p)).rev() {
            let one = 1 << level;
            let two = 1 << (level + 1);

            if r % two == 0 && r + one < p {
                self.send(r + one, value.clone())
            }
        }
        value
    }

    /// Implements a binomial tree reduce over a commutative binary operator.
    /// All ranks return `None` except rank 0. Levels run ascending: a rank
    /// whose stride-level bit is set sends its partial result one stride
    /// below and drops out, everyone else folds in the partner's value when
    /// that partner exists, so ragged (non-power-of-two) groups fold cleanly.
    ///
    fn reduce<F>(&self, f: F, mut value: Vec<u8>) -> Option<Vec<u8>>
    where
        F: Fn(Vec<u8>, Vec<u8>) -> Vec<u8>,
    {
        let r = self.rank();
        let p = self.size();

        for level in 0..util::ceil_log2(p) {
            let one = 1 << level;
            let two = 1 << (level + 1);

            if r % two == one {
                self.send(r - one, value);
                return None;
            } else if r % two == 0 && r + one < p {
                value = f(value, self.recv())
            }
        }
        Some(value)
    }

    /// Implements an all-reduce: every rank gets the reduction result.
    /// Drivers use this to assemble a global norm from per-slab results.
    ///
    fn all_reduce<F>(&self, f: F, value: Vec<u8>) -> Vec<u8>
    where
        F: Fn(Vec<u8>, Vec<u8>) -> Vec<u8>,
    {
        self.broadcast(self.reduce(f, value))
    }
}

// ============================================================================
#[cfg(test)]
mod test {

    use super::Communicator;
    use crate::message::local::local_group;
    use std::convert::TryInto;
    use std::thread;

    fn f64_max(a: Vec<u8>, b: Vec<u8>) -> Vec<u8> {
        let x = f64::from_le_bytes(a.as_slice().try_into().unwrap());
        let y = f64::from_le_bytes(b.as_slice().try_into().unwrap());
        x.max(y).to_le_bytes().to_vec()
    }

    #[test]
    fn all_reduce_finds_the_group_maximum() {
        let results: Vec<_> = local_group(5)
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let mine = (comm.rank() as f64) * 1.5;
                    let bytes = comm.all_reduce(f64_max, mine.to_le_bytes().to_vec());
                    f64::from_le_bytes(bytes.as_slice().try_into().unwrap())
                })
            })
            .collect();

        for handle in results {
            assert_eq!(handle.join().unwrap(), 6.0);
        }
    }

    #[test]
    fn broadcast_reaches_every_rank() {
        let results: Vec<_> = local_group(4)
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let value = if comm.rank() == 0 {
                        Some(b"planes ready".to_vec())
                    } else {
                        None
                    };
                    comm.broadcast(value)
                })
            })
            .collect();

        for handle in results {
            assert_eq!(handle.join().unwrap(), b"planes ready".to_vec());
        }
    }

    #[test]
    fn broadcast_reaches_every_rank_of_a_ragged_group() {
        let results: Vec<_> = local_group(5)
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let value = if comm.rank() == 0 {
                        Some(vec![42])
                    } else {
                        None
                    };
                    comm.broadcast(value)
                })
            })
            .collect();

        for handle in results {
            assert_eq!(handle.join().unwrap(), vec![42]);
        }
    }

    #[test]
    fn reduce_folds_ragged_groups_onto_rank_zero() {
        fn f64_sum(a: Vec<u8>, b: Vec<u8>) -> Vec<u8> {
            let x = f64::from_le_bytes(a.as_slice().try_into().unwrap());
            let y = f64::from_le_bytes(b.as_slice().try_into().unwrap());
            (x + y).to_le_bytes().to_vec()
        }

        for &size in &[1, 2, 3, 5, 6] {
            let results: Vec<_> = local_group(size)
                .into_iter()
                .map(|comm| {
                    thread::spawn(move || {
                        let mine = comm.rank() as f64;
                        let rank = comm.rank();
                        (rank, comm.reduce(f64_sum, mine.to_le_bytes().to_vec()))
                    })
                })
                .collect();

            let expected = (size * (size - 1) / 2) as f64;
            for handle in results {
                match handle.join().unwrap() {
                    (0, Some(bytes)) => {
                        let total = f64::from_le_bytes(bytes.as_slice().try_into().unwrap());
                        assert_eq!(total, expected, "group of {}", size);
                    }
                    (0, None) => panic!("rank 0 lost the reduction in a group of {}", size),
                    (_, result) => assert_eq!(result, None),
                }
            }
        }
    }
}
