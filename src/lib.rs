//! Slabgrid evaluates the seven-point (six-neighbor) discrete Laplacian on a
//! 3-D scalar grid that is decomposed into slabs along one axis, with each
//! slab owned by one rank in a group of cooperating processes. The two
//! non-decomposed axes need no communication; the decomposed (row) axis is
//! completed by exchanging halo planes with the numerically adjacent ranks
//! over a linear chain topology. Message passing goes through a minimal
//! `Communicator` trait, so the same exchange code runs over in-process
//! channels (for tests and threaded drivers) or TCP sockets.

pub mod error;
pub mod grid;
pub mod halo;
pub mod laplace;
pub mod message;
pub mod stencil;
