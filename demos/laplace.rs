//! Threaded multi-rank driver: every rank generates the analytic field
//! F(x, z, y) = x^4 exp(-y z) on its slab, runs the halo exchange and the
//! Laplacian kernel once per step, and the group reports the global maximum
//! of |laplacian| through an all-reduce.

use clap::{AppSettings, Clap};
use log::info;
use std::convert::TryInto;
use std::thread;

use slabgrid::grid::{GridExtents, Subdomain};
use slabgrid::laplace::laplacian_step;
use slabgrid::message::comm::Communicator;
use slabgrid::message::local::local_group;

#[derive(Debug, Clap)]
#[clap(version = "0.1.0")]
#[clap(setting = AppSettings::ColoredHelp)]
struct Opts {
    #[clap(short = 'p', long, default_value = "4")]
    ranks: usize,

    #[clap(long, default_value = "32")]
    nx: usize,

    #[clap(long, default_value = "32")]
    nz: usize,

    #[clap(long, default_value = "64")]
    ny: usize,

    #[clap(short = 't', long, default_value = "10")]
    num_steps: u64,
}

/// Coordinates are index times spacing on every axis, and the row coordinate
/// is the global one, so the field is continuous across slab boundaries.
fn generate_field(slab: &Subdomain, h: f64) -> Vec<f64> {
    let mut field = vec![0.0; slab.len()];
    for j in 0..slab.ny {
        for k in 0..slab.nz {
            for i in 0..slab.nx {
                let x = i as f64 * h;
                let z = k as f64 * h;
                let y = slab.global_row(j) as f64 * h;
                field[slab.offset(i, k, j)] = x.powi(4) * (-y * z).exp();
            }
        }
    }
    field
}

fn f64_max(a: Vec<u8>, b: Vec<u8>) -> Vec<u8> {
    let x = f64::from_le_bytes(a.as_slice().try_into().unwrap());
    let y = f64::from_le_bytes(b.as_slice().try_into().unwrap());
    x.max(y).to_le_bytes().to_vec()
}

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let opts = Opts::parse();
    println!("{:?}", opts);

    let extents = GridExtents {
        nx: opts.nx,
        nz: opts.nz,
        ny: opts.ny,
    };

    // Reject bad extents and rank counts up front; the spacing below is
    // derived from nx and needs nx >= 2.
    if let Err(e) = Subdomain::split(extents, 0, opts.ranks) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    let h = 10.0 / (opts.nx - 1) as f64;
    let num_steps = opts.num_steps;

    let ranks: Vec<_> = local_group(opts.ranks)
        .into_iter()
        .map(|comm| {
            thread::spawn(move || {
                let slab = Subdomain::split(extents, comm.rank(), comm.size()).unwrap();
                let mut laplace = vec![0.0; slab.len()];

                for step in 0..num_steps {
                    let field = generate_field(&slab, h);
                    laplacian_step(&comm, step, &slab, &field, h, &mut laplace).unwrap();

                    let local_max = laplace.iter().fold(0.0f64, |a, &b| a.max(b.abs()));
                    let global_max = f64::from_le_bytes(
                        comm.all_reduce(f64_max, local_max.to_le_bytes().to_vec())
                            .as_slice()
                            .try_into()
                            .unwrap(),
                    );
                    if comm.rank() == 0 {
                        info!("step {:3} max |laplacian| = {:.6e}", step, global_max);
                    }
                }
            })
        })
        .collect();

    for rank in ranks {
        rank.join().unwrap()
    }
}
