//! Domain layer: the campaign aggregate, its value objects, and the ports the
//! application layer talks to.

pub mod campaign;
pub mod money;
pub mod payment;
pub mod pledge;
pub mod ports;
pub mod status;
pub mod user;
