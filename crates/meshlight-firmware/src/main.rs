#![no_std]
#![no_main]

mod infrastructure;

use embassy_executor::Spawner;
use embassy_time::{Duration, Instant};

use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{clock::CpuClock, timer::timg::TimerGroup};
use esp_println::println;

use meshlight_sync::{MeshTransport, Node, PixelRing};

use crate::infrastructure::config;
use crate::infrastructure::drivers::{EspLedDriver, init_mesh};
use crate::infrastructure::tasks::{boot_flash, node_config, node_task, select_role};

esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();

    // Initialize hardware
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // The radio stack needs a heap
    esp_alloc::heap_allocator!(
        #[unsafe(link_section = ".dram2_uninit")] size: 64 * 1024
    );

    // Start rtos
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let role = select_role(role_gpio!(peripherals));

    let driver = EspLedDriver::new(peripherals.RMT, led_gpio!(peripherals));
    let mut ring = PixelRing::new(driver).with_brightness(config::LIGHT.brightness);
    boot_flash(&mut ring).await;

    let (mesh, receiver) = init_mesh(peripherals.WIFI);

    println!("meshlight {}", env!("CARGO_PKG_VERSION"));
    println!("role: {} (code {})", role, role.code());
    println!("node id: {}", mesh.node_id());

    let node = Node::new(node_config(role), mesh, ring, Instant::now());
    spawner.spawn(node_task(node, receiver)).ok();

    loop {
        embassy_time::Timer::after(Duration::from_secs(5)).await;
    }
}
