mod led;
mod mesh;

pub(crate) use led::EspLedDriver;
pub(crate) use mesh::{EspNowMesh, init_mesh, node_id_from_mac};
