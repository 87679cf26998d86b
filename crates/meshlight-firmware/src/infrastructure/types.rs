use meshlight_sync::{Node, PixelRing};

use crate::infrastructure::{config, drivers::EspLedDriver, drivers::EspNowMesh};

pub(crate) type LightDriver = EspLedDriver<'static>;
pub(crate) type LightRing = PixelRing<LightDriver, { config::LIGHT_LED_COUNT }>;
pub(crate) type MeshNode = Node<EspNowMesh, LightDriver, { config::LIGHT_LED_COUNT }>;
