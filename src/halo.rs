use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::grid::Subdomain;
use crate::message::comm::Communicator;




/**
 * The ranks adjacent to this one in the linear chain topology. Rank r's
 * predecessor is r - 1 and its successor is r + 1; endpoints of the chain
 * have one of them absent, and a group of one has neither.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Neighbors {
    pub predecessor: Option<usize>,
    pub successor: Option<usize>,
}




impl Neighbors {

    pub fn linear(rank: usize, size: usize) -> Self {
        Self {
            predecessor: if rank > 0 { Some(rank - 1) } else { None },
            successor: if rank + 1 < size { Some(rank + 1) } else { None },
        }
    }

    pub fn count(&self) -> usize {
        self.predecessor.iter().count() + self.successor.iter().count()
    }
}




/**
 * The ghost planes a rank holds after an exchange. `backward` is the
 * predecessor's last row-plane (the plane at global row `row_offset - 1`)
 * and `forward` is the successor's first row-plane (global row
 * `row_offset + ny`). A plane is `None` exactly where the corresponding
 * neighbor does not exist, which is where the slab's boundary row is a true
 * boundary of the global domain.
 */
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HaloPlanes {
    pub backward: Option<Vec<f64>>,
    pub forward: Option<Vec<f64>>,
}




#[derive(Serialize, Deserialize)]
struct PlaneEnvelope {
    step: u64,
    source: usize,
    plane: Vec<f64>,
}




/**
 * Run one halo exchange: hand this rank's two boundary row-planes to
 * whichever neighbors exist and collect theirs in return. Every outgoing
 * plane is posted with a non-blocking send before any receive, so the
 * interior-rank case (two sends, two receives) cannot deadlock regardless
 * of how the neighbors are scheduled.
 *
 * Envelopes are tagged with the step number; one that arrives for a
 * different step is put back on the inbound queue once the exchange for the
 * current step has completed. An envelope that cannot be decoded, carries a
 * plane of the wrong size, or comes from a rank that is not a neighbor is a
 * protocol fault and fails the exchange.
 */
pub fn exchange<C: Communicator>(
    comm: &C,
    step: u64,
    subdomain: &Subdomain,
    field: &[f64],
) -> Result<HaloPlanes, Error> {
    if field.len() != subdomain.len() {
        return Err(Error::FieldSizeMismatch {
            expected: subdomain.len(),
            actual: field.len(),
        });
    }
    let neighbors = Neighbors::linear(comm.rank(), comm.size());

    if let Some(rank) = neighbors.predecessor {
        send_plane(comm, rank, step, subdomain.extract_plane(field, 0));
    }
    if let Some(rank) = neighbors.successor {
        send_plane(comm, rank, step, subdomain.extract_plane(field, subdomain.ny - 1));
    }

    let mut halo = HaloPlanes::default();
    let mut deferred = Vec::new();
    let mut pending = neighbors.count();

    while pending > 0 {
        let bytes = comm.recv();
        let envelope: PlaneEnvelope = rmp_serde::decode::from_slice(&bytes)
            .map_err(|e| Error::Communication(format!("undecodable plane envelope: {}", e)))?;

        if envelope.step != step {
            debug!(
                "rank {} holding a plane for step {} while exchanging step {}",
                comm.rank(),
                envelope.step,
                step
            );
            deferred.push(bytes);
            continue;
        }
        if envelope.plane.len() != subdomain.plane_len() {
            return Err(Error::Communication(format!(
                "plane from rank {} has {} values, expected {}",
                envelope.source,
                envelope.plane.len(),
                subdomain.plane_len()
            )));
        }

        let slot = if Some(envelope.source) == neighbors.predecessor {
            &mut halo.backward
        } else if Some(envelope.source) == neighbors.successor {
            &mut halo.forward
        } else {
            return Err(Error::Communication(format!(
                "rank {} received a plane from rank {}, which is not a neighbor",
                comm.rank(),
                envelope.source
            )));
        };
        if slot.replace(envelope.plane).is_some() {
            return Err(Error::Communication(format!(
                "duplicate plane from rank {} in step {}",
                envelope.source, step
            )));
        }
        pending -= 1;
    }

    for bytes in deferred {
        comm.requeue_recv(bytes);
    }
    Ok(halo)
}

fn send_plane<C: Communicator>(comm: &C, rank: usize, step: u64, plane: Vec<f64>) {
    let envelope = PlaneEnvelope {
        step,
        source: comm.rank(),
        plane,
    };
    comm.send(rank, rmp_serde::encode::to_vec(&envelope).unwrap());
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::{exchange, send_plane, Neighbors, PlaneEnvelope};
    use crate::error::Error;
    use crate::grid::{GridExtents, Subdomain};
    use crate::message::comm::Communicator;
    use crate::message::local::local_group;
    use std::thread;

    const EXTENTS: GridExtents = GridExtents { nx: 4, nz: 3, ny: 9 };
    const PAIR_EXTENTS: GridExtents = GridExtents { nx: 4, nz: 3, ny: 8 };

    /// Field whose value encodes the owning rank and the global row, so a
    /// received plane identifies exactly which row of which rank it came
    /// from.
    fn tagged_field(slab: &Subdomain) -> Vec<f64> {
        let mut field = vec![0.0; slab.len()];
        for j in 0..slab.ny {
            for k in 0..slab.nz {
                for i in 0..slab.nx {
                    field[slab.offset(i, k, j)] =
                        (slab.global_row(j) * 100 + k * 10 + i) as f64;
                }
            }
        }
        field
    }

    #[test]
    fn linear_chain_roles() {
        assert_eq!(Neighbors::linear(0, 1), Neighbors { predecessor: None, successor: None });
        assert_eq!(Neighbors::linear(0, 3), Neighbors { predecessor: None, successor: Some(1) });
        assert_eq!(Neighbors::linear(1, 3), Neighbors { predecessor: Some(0), successor: Some(2) });
        assert_eq!(Neighbors::linear(2, 3), Neighbors { predecessor: Some(1), successor: None });
        assert_eq!(Neighbors::linear(1, 3).count(), 2);
        assert_eq!(Neighbors::linear(0, 1).count(), 0);
    }

    #[test]
    fn single_rank_skips_the_protocol() {
        let group = local_group(1);
        let slab = Subdomain::split(EXTENTS, 0, 1).unwrap();
        let halo = exchange(&group[0], 0, &slab, &tagged_field(&slab)).unwrap();

        assert_eq!(halo.backward, None);
        assert_eq!(halo.forward, None);
    }

    #[test]
    fn every_rank_gets_its_neighbors_boundary_planes() {
        let halos: Vec<_> = local_group(3)
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let slab = Subdomain::split(EXTENTS, comm.rank(), comm.size()).unwrap();
                    exchange(&comm, 0, &slab, &tagged_field(&slab)).unwrap()
                })
            })
            .collect();
        let halos: Vec<_> = halos.into_iter().map(|h| h.join().unwrap()).collect();

        let slabs: Vec<_> = (0..3)
            .map(|rank| Subdomain::split(EXTENTS, rank, 3).unwrap())
            .collect();

        // Rank r's backward plane is rank r-1's extracted last row, and its
        // forward plane is rank r+1's extracted first row.
        for r in 0..3 {
            let expect_backward = if r > 0 {
                Some(tagged_field(&slabs[r - 1])
                    .chunks(slabs[r - 1].plane_len())
                    .last()
                    .unwrap()
                    .to_vec())
            } else {
                None
            };
            let expect_forward = if r + 1 < 3 {
                Some(tagged_field(&slabs[r + 1])[..slabs[r + 1].plane_len()].to_vec())
            } else {
                None
            };
            assert_eq!(halos[r].backward, expect_backward);
            assert_eq!(halos[r].forward, expect_forward);
        }
    }

    #[test]
    fn planes_from_other_steps_are_requeued() {
        let mut group = local_group(2);
        let receiver = group.pop().unwrap();
        let sender = group.pop().unwrap();

        let slab0 = Subdomain::split(PAIR_EXTENTS, 0, 2).unwrap();
        let slab1 = Subdomain::split(PAIR_EXTENTS, 1, 2).unwrap();

        let sender = thread::spawn(move || {
            // A plane from step 7 lands in rank 1's inbox before the step 0
            // plane does.
            send_plane(&sender, 1, 7, vec![9.0; slab0.plane_len()]);
            exchange(&sender, 0, &slab0, &tagged_field(&slab0)).unwrap()
        });

        let halo = exchange(&receiver, 0, &slab1, &tagged_field(&slab1)).unwrap();
        assert_eq!(
            halo.backward,
            Some(tagged_field(&slab0)
                .chunks(slab0.plane_len())
                .last()
                .unwrap()
                .to_vec())
        );

        // The step 7 plane is back on the queue, undamaged.
        let leftover: PlaneEnvelope = rmp_serde::decode::from_slice(&receiver.recv()).unwrap();
        assert_eq!(leftover.step, 7);
        assert_eq!(leftover.plane, vec![9.0; slab0.plane_len()]);

        sender.join().unwrap();
    }

    #[test]
    fn planes_of_the_wrong_size_fail_the_exchange() {
        let mut group = local_group(2);
        let receiver = group.pop().unwrap();
        let sender = group.pop().unwrap();

        let slab1 = Subdomain::split(PAIR_EXTENTS, 1, 2).unwrap();
        send_plane(&sender, 1, 0, vec![1.0; 2]);

        match exchange(&receiver, 0, &slab1, &tagged_field(&slab1)) {
            Err(Error::Communication(_)) => (),
            other => panic!("expected a communication error, got {:?}", other),
        }
    }

    #[test]
    fn planes_from_non_neighbors_fail_the_exchange() {
        let mut group = local_group(2);
        let receiver = group.pop().unwrap();
        let sender = group.pop().unwrap();

        let slab1 = Subdomain::split(PAIR_EXTENTS, 1, 2).unwrap();

        // Forge an envelope claiming to come from a rank outside the chain.
        let envelope = PlaneEnvelope {
            step: 0,
            source: 5,
            plane: vec![1.0; slab1.plane_len()],
        };
        sender.send(1, rmp_serde::encode::to_vec(&envelope).unwrap());

        match exchange(&receiver, 0, &slab1, &tagged_field(&slab1)) {
            Err(Error::Communication(_)) => (),
            other => panic!("expected a communication error, got {:?}", other),
        }
    }

    #[test]
    fn field_of_the_wrong_size_is_rejected() {
        let group = local_group(1);
        let slab = Subdomain::split(EXTENTS, 0, 1).unwrap();
        assert_eq!(
            exchange(&group[0], 0, &slab, &vec![0.0; 5]),
            Err(Error::FieldSizeMismatch { expected: slab.len(), actual: 5 }));
    }
}
