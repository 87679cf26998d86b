use esp_hal::xtensa_lx::interrupt;
use esp_hal::{gpio::interconnect::PeripheralOutput, peripherals::RMT, rmt::Rmt, time::Rate};
use esp_hal_smartled::{SmartLedsAdapter, buffer_size, smart_led_buffer};
use smart_leds::SmartLedsWrite;
use static_cell::make_static;

use meshlight_sync::{LedDriver, Rgb};

use crate::infrastructure::config;

/// WS2812 ring driven by the RMT peripheral
pub(crate) struct EspLedDriver<'a> {
    adapter: SmartLedsAdapter<'a, { buffer_size(config::LIGHT_LED_COUNT) }>,
}

impl<'a> EspLedDriver<'a> {
    pub(crate) fn new<O>(rmt: RMT<'a>, pin: O) -> Self
    where
        O: PeripheralOutput<'a>,
    {
        let rmt = Rmt::new(rmt, Rate::from_mhz(80)).unwrap();

        let rmt_buffer = make_static!(smart_led_buffer!(config::LIGHT_LED_COUNT));
        let adapter = SmartLedsAdapter::new(rmt.channel0, pin, rmt_buffer);

        Self { adapter }
    }
}

impl LedDriver<{ config::LIGHT_LED_COUNT }> for EspLedDriver<'static> {
    fn write(&mut self, colors: &[Rgb; config::LIGHT_LED_COUNT]) {
        // RMT timing breaks if the radio interrupts mid-frame
        interrupt::free(|| {
            let _ = self.adapter.write(colors.iter().copied());
        });
    }
}
