//! The two-rank parabola scenario over real TCP sockets on loopback: each
//! rank runs on its own thread with its own `TcpHost`, exchanges halo planes
//! with its neighbor through actual socket connections, and checks that the
//! Laplacian of F = i^2 comes out to exactly 2 at every computed point.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::Range;
use std::thread;

use log::info;

use slabgrid::grid::{GridExtents, Subdomain};
use slabgrid::laplace::laplacian_step;
use slabgrid::message::comm::Communicator;
use slabgrid::message::tcp::{TcpCommunicator, TcpHost};

fn peer(rank: usize) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9500 + rank as u16)
}

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let extents = GridExtents { nx: 5, nz: 5, ny: 6 };
    let ranks: Range<usize> = 0..2;
    let peers: Vec<_> = ranks.clone().map(peer).collect();

    let procs: Vec<_> = ranks
        .map(|rank| {
            let peers = peers.clone();
            thread::spawn(move || {
                let (mut host, send, recv_sink, recv) = TcpHost::new(rank, peers.clone());
                let comm = TcpCommunicator::new(rank, peers, send, recv_sink, recv);

                let slab = Subdomain::split(extents, comm.rank(), comm.size()).unwrap();
                let mut field = vec![0.0; slab.len()];
                for j in 0..slab.ny {
                    for k in 0..slab.nz {
                        for i in 0..slab.nx {
                            field[slab.offset(i, k, j)] = (i * i) as f64;
                        }
                    }
                }

                let mut laplace = vec![0.0; slab.len()];
                laplacian_step(&comm, 0, &slab, &field, 1.0, &mut laplace).unwrap();

                for j in 0..slab.ny {
                    let global_j = slab.global_row(j);
                    if global_j == 0 || global_j == extents.ny - 1 {
                        continue;
                    }
                    for k in 1..slab.nz - 1 {
                        for i in 1..slab.nx - 1 {
                            assert_eq!(laplace[slab.offset(i, k, j)], 2.0);
                        }
                    }
                }
                info!("rank {} verified its slab", rank);

                drop(comm);
                host.join();
            })
        })
        .collect();

    for process in procs {
        process.join().unwrap()
    }
    println!("both ranks agree: laplacian of i^2 is 2");
}
