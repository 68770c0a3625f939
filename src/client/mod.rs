//! Client connection layer

pub mod control_plane;
pub mod raw_connection;

pub use control_plane::{ControlPlane, ControlPlaneExt};
pub use raw_connection::RawConnection;
