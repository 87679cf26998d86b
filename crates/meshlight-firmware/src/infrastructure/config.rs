pub(crate) struct LightConfig {
    /// Global brightness scale applied to every frame
    pub brightness: u8,
    /// Boot self-test flashes
    pub boot_flashes: u8,
    pub boot_flash_ms: u64,
}

pub(crate) struct MeshConfig {
    pub channel: u8,
    /// How often this node announces itself to its neighbours
    pub beacon_interval_ms: u64,
    /// Peers silent for longer than this are dropped
    pub peer_timeout_ms: u64,
}

pub(crate) struct NodeSettings {
    /// Role name forced at build time, overrides the strap pin
    pub role: Option<&'static str>,
    pub broadcast_interval_ms: u64,
    pub staleness_threshold_ms: u64,
    pub status_interval_ms: u64,
    pub hue_step: u8,
    pub brightness_ceiling: u8,
    /// Upper bound on how long the node loop sleeps between polls
    pub poll_interval_ms: u64,
}

pub(crate) const LIGHT_LED_COUNT: usize = 16;
pub(crate) const MESH_MAX_PEERS: usize = 16;

pub(crate) const LIGHT: LightConfig = LightConfig {
    brightness: 200,
    boot_flashes: 3,
    boot_flash_ms: 100,
};

pub(crate) const MESH: MeshConfig = MeshConfig {
    channel: 1,
    beacon_interval_ms: 5000,
    peer_timeout_ms: 15000,
};

pub(crate) const NODE: NodeSettings = NodeSettings {
    role: option_env!("MESHLIGHT_ROLE"),
    broadcast_interval_ms: 2000,
    staleness_threshold_ms: 5000,
    status_interval_ms: 30000,
    hue_step: 5,
    brightness_ceiling: 200,
    poll_interval_ms: 10,
};

#[macro_export]
macro_rules! led_gpio {
    ($p:expr) => {
        $p.GPIO5
    };
}

/// Role strap: pulled up for a consumer, tie to ground for the producer
#[macro_export]
macro_rules! role_gpio {
    ($p:expr) => {
        $p.GPIO4
    };
}
