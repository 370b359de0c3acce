use crate::error::Error;
use crate::grid::Subdomain;
use crate::halo;
use crate::message::comm::Communicator;
use crate::stencil;




/**
 * Run one full Laplacian evaluation on this rank's slab: a halo exchange,
 * then the stencil kernel over the local field with the received ghost
 * planes. The exchange completes before the kernel reads any ghost data, so
 * a rank never consumes a plane its neighbor has not finished extracting.
 *
 * `subdomain` must be the slab that `Subdomain::split` yields for
 * `comm.rank()` in a group of `comm.size()`; the exchange derives its
 * neighbors from the communicator alone. The result is deterministic: the
 * same field, spacing, and group produce bit-identical output every time.
 */
pub fn laplacian_step<C: Communicator>(
    comm: &C,
    step: u64,
    subdomain: &Subdomain,
    field: &[f64],
    h: f64,
    laplace: &mut [f64],
) -> Result<(), Error> {
    let halo = halo::exchange(comm, step, subdomain, field)?;
    stencil::laplacian(subdomain, field, &halo, h, laplace)
}
