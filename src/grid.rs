use crate::error::Error;




/**
 * Global extents of the 3-D grid. The `ny` (row) axis is the one that gets
 * decomposed across ranks; `nx` (column) and `nz` (depth) are identical on
 * every rank.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridExtents {
    pub nx: usize,
    pub nz: usize,
    pub ny: usize,
}




impl GridExtents {

    /**
     * Return the total number of grid points.
     */
    pub fn len(&self) -> usize {
        self.nx * self.nz * self.ny
    }
}




/**
 * One rank's slab of the global grid: the full `nx` by `nz` cross section,
 * and a contiguous range of `ny` rows starting at global row `row_offset`.
 * The backing arrays are flat, with linear offset `i + nx * k + j * nx * nz`.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subdomain {
    pub nx: usize,
    pub nz: usize,
    pub ny: usize,
    pub row_offset: usize,
}




// ============================================================================
impl Subdomain {


    /**
     * Split the global row range evenly over `size` ranks and return the
     * slab owned by `rank`. The split must be exact: a row count that does
     * not divide evenly is rejected rather than silently rounded, and every
     * global axis must be at least 3 so the stencil has at least one
     * interior point on each axis.
     */
    pub fn split(extents: GridExtents, rank: usize, size: usize) -> Result<Self, Error> {
        if size == 0 || rank >= size {
            return Err(Error::RankOutOfRange { rank, size });
        }
        for &(axis, len) in &[("column", extents.nx), ("depth", extents.nz), ("row", extents.ny)] {
            if len < 3 {
                return Err(Error::GridTooSmall { axis, len });
            }
        }
        if extents.ny % size != 0 {
            return Err(Error::UnevenDecomposition { ny: extents.ny, size });
        }
        let ny = extents.ny / size;

        Ok(Self {
            nx: extents.nx,
            nz: extents.nz,
            ny,
            row_offset: rank * ny,
        })
    }


    /**
     * Return the number of grid points in this slab.
     */
    pub fn len(&self) -> usize {
        self.nx * self.nz * self.ny
    }


    /**
     * Return the number of grid points in one row-plane (a slice at fixed j).
     */
    pub fn plane_len(&self) -> usize {
        self.nx * self.nz
    }


    /**
     * Return the linear offset of the local coordinate (i, k, j) in this
     * slab's backing array.
     */
    pub fn offset(&self, i: usize, k: usize, j: usize) -> usize {
        debug_assert!(i < self.nx && k < self.nz && j < self.ny,
            "index ({} {} {}) out of range on slab ({} {} {})",
            i, k, j, self.nx, self.nz, self.ny);

        i + self.nx * k + j * self.nx * self.nz
    }


    /**
     * Return the linear offset of the coordinate (i, k) within a single
     * row-plane buffer.
     */
    pub fn plane_offset(&self, i: usize, k: usize) -> usize {
        debug_assert!(i < self.nx && k < self.nz,
            "index ({} {}) out of range on plane ({} {})", i, k, self.nx, self.nz);

        i + self.nx * k
    }


    /**
     * Map a global row index to this slab's local row index.
     */
    pub fn local_row(&self, global_j: usize) -> usize {
        debug_assert!(global_j >= self.row_offset && global_j < self.row_offset + self.ny,
            "global row {} is not owned by the slab at rows {}..{}",
            global_j, self.row_offset, self.row_offset + self.ny);

        global_j - self.row_offset
    }


    /**
     * Map a local row index to the global row it stands for.
     */
    pub fn global_row(&self, j: usize) -> usize {
        debug_assert!(j < self.ny);

        self.row_offset + j
    }


    /**
     * Copy the row-plane at local row `j` out of a field array laid out for
     * this slab. This is the payload a rank hands to a neighbor during the
     * halo exchange.
     */
    pub fn extract_plane(&self, field: &[f64], j: usize) -> Vec<f64> {
        debug_assert!(field.len() == self.len());

        let mut plane = Vec::with_capacity(self.plane_len());
        for k in 0..self.nz {
            for i in 0..self.nx {
                plane.push(field[self.offset(i, k, j)]);
            }
        }
        plane
    }
}
