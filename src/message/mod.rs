//! A minimal message-passing layer behind a `Communicator` trait. The halo
//! exchange only needs rank identity, a non-blocking `send`, and a blocking
//! `recv`; the trait adds tree-based collectives on top of those. Two
//! transports are provided: `local` wires a group of ranks together with
//! in-process channels (one thread per rank), and `tcp` runs the same
//! protocol between processes over sockets.

mod backoff;
pub mod comm;
pub mod local;
pub mod tcp;
pub mod util;
