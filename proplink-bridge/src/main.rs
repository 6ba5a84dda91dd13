// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Proplink bridge for RP2040: loads Propeller images over UART0 on behalf of
//! a USB CDC host.

#![no_std]
#![no_main]

mod bridge;
mod peripherals;
mod second_stage;
mod target;
mod usb_transport;

use defmt_rtt as _;
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[entry]
fn main() -> ! {
    defmt::println!("Bridge init");

    let mut p = peripherals::init();

    proplink_common::blink(&mut p.led_pin, &mut p.timer, 3, 200);

    bridge::run(p)
}
