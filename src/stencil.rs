use rayon::prelude::*;

use crate::error::Error;
use crate::grid::Subdomain;
use crate::halo::HaloPlanes;




/**
 * Compute the seven-point discrete Laplacian
 *
 * ```text
 * (F[i+1] + F[i-1] + F[j+1] + F[j-1] + F[k+1] + F[k-1] - 6 F[L]) / h^2
 * ```
 *
 * at every grid point of the slab whose six neighbors are defined, writing
 * into `laplace`. The column (i) and depth (k) neighbors are always local;
 * the row (j) neighbor at a slab boundary row comes from the corresponding
 * halo plane. A boundary row whose halo plane is absent lies on the global
 * domain boundary and is skipped, as are the `i = 0`, `i = nx-1`, `k = 0`
 * and `k = nz-1` faces on every rank; skipped entries keep whatever value
 * the caller put there.
 *
 * Output row-planes are independent of one another, so they are computed in
 * parallel. NaN or infinite field values propagate arithmetically.
 */
pub fn laplacian(
    subdomain: &Subdomain,
    field: &[f64],
    halo: &HaloPlanes,
    h: f64,
    laplace: &mut [f64],
) -> Result<(), Error> {
    if !h.is_finite() || h <= 0.0 {
        return Err(Error::NonPositiveSpacing(h));
    }
    for len in [field.len(), laplace.len()].iter() {
        if *len != subdomain.len() {
            return Err(Error::FieldSizeMismatch {
                expected: subdomain.len(),
                actual: *len,
            });
        }
    }
    let plane = subdomain.plane_len();
    for ghost in halo.backward.iter().chain(halo.forward.iter()) {
        if ghost.len() != plane {
            return Err(Error::FieldSizeMismatch {
                expected: plane,
                actual: ghost.len(),
            });
        }
    }

    let (nx, nz, ny) = (subdomain.nx, subdomain.nz, subdomain.ny);
    let inv_h2 = 1.0 / (h * h);

    laplace
        .par_chunks_mut(plane)
        .enumerate()
        .for_each(|(j, out)| {
            // Row neighbors: local planes inside the slab, halo planes at
            // the slab boundary. An absent halo plane marks a true global
            // boundary row, which gets no update at all.
            let below = if j > 0 {
                Some(&field[(j - 1) * plane..j * plane])
            } else {
                halo.backward.as_deref()
            };
            let above = if j + 1 < ny {
                Some(&field[(j + 1) * plane..(j + 2) * plane])
            } else {
                halo.forward.as_deref()
            };
            let (below, above) = match (below, above) {
                (Some(below), Some(above)) => (below, above),
                _ => return,
            };
            let here = &field[j * plane..(j + 1) * plane];

            for k in 1..nz - 1 {
                for i in 1..nx - 1 {
                    let l = i + nx * k;
                    out[l] = (here[l + 1] + here[l - 1]
                        + above[l] + below[l]
                        + here[l + nx] + here[l - nx]
                        - 6.0 * here[l])
                        * inv_h2;
                }
            }
        });

    Ok(())
}
