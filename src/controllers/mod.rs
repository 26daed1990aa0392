//! Controllers bound to routes with [`Handler::controller`](crate::dispatcher::Handler::controller).

mod cards;

pub use cards::{Card, CardController};
