// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Peripheral initialization for the bridge.

use proplink_common::options::DEFAULT_INITIAL_BAUD;
use rp2040_hal as hal;
use rp2040_hal::fugit::{HertzU32, RateExtU32};
use rp2040_hal::gpio::PinState;
use rp2040_hal::uart::{DataBits, StopBits, UartConfig, UartPeripheral};
use rp2040_hal::usb::UsbBus;
use rp2040_hal::Clock;
use usb_device::class_prelude::UsbBusAllocator;

/// GPIO wired to the Propeller's RESn input.
pub const RESET_PIN: u8 = 12;

pub type LedPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio25, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;
pub type ResetPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio12, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;
pub type UartPins = (
    hal::gpio::Pin<hal::gpio::bank0::Gpio0, hal::gpio::FunctionUart, hal::gpio::PullDown>,
    hal::gpio::Pin<hal::gpio::bank0::Gpio1, hal::gpio::FunctionUart, hal::gpio::PullDown>,
);
pub type TargetUart = UartPeripheral<hal::uart::Enabled, hal::pac::UART0, UartPins>;
pub type Rosc = hal::rosc::RingOscillator<hal::rosc::Enabled>;

/// Static storage for UsbBusAllocator (required by usb-device for 'static lifetime).
static mut USB_BUS: Option<UsbBusAllocator<UsbBus>> = None;

pub fn usb_bus_ref() -> &'static UsbBusAllocator<UsbBus> {
    unsafe { (*core::ptr::addr_of!(USB_BUS)).as_ref().unwrap() }
}

pub fn store_usb_bus(bus: UsbBusAllocator<UsbBus>) {
    unsafe {
        USB_BUS = Some(bus);
    }
}

/// 8N1 at `baud`.
pub fn uart_config(baud: u32) -> UartConfig {
    UartConfig::new(baud.Hz(), DataBits::Eight, None, StopBits::One)
}

pub struct Peripherals {
    pub led_pin: LedPin,
    pub reset_pin: ResetPin,
    pub timer: hal::Timer,
    pub uart: TargetUart,
    pub peripheral_freq: HertzU32,
    pub rosc: Rosc,
    pub usb: Option<UsbPeripherals>,
}

pub struct UsbPeripherals {
    pub regs: hal::pac::USBCTRL_REGS,
    pub dpram: hal::pac::USBCTRL_DPRAM,
    pub clock: hal::clocks::UsbClock,
    pub resets: hal::pac::RESETS,
}

pub fn init() -> Peripherals {
    let mut pac = unsafe { hal::pac::Peripherals::steal() };

    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let clocks = hal::clocks::init_clocks_and_plls(
        12_000_000u32,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .unwrap();

    let timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let peripheral_freq = clocks.peripheral_clock.freq();
    let uart_pins = (
        pins.gpio0.into_function::<hal::gpio::FunctionUart>(),
        pins.gpio1.into_function::<hal::gpio::FunctionUart>(),
    );
    let uart = UartPeripheral::new(pac.UART0, uart_pins, &mut pac.RESETS)
        .enable(uart_config(DEFAULT_INITIAL_BAUD), peripheral_freq)
        .unwrap();

    Peripherals {
        led_pin: pins.gpio25.into_push_pull_output(),
        // Held high so the target runs until a load starts.
        reset_pin: pins.gpio12.into_push_pull_output_in_state(PinState::High),
        timer,
        uart,
        peripheral_freq,
        rosc: hal::rosc::RingOscillator::new(pac.ROSC).initialize(),
        usb: Some(UsbPeripherals {
            regs: pac.USBCTRL_REGS,
            dpram: pac.USBCTRL_DPRAM,
            clock: clocks.usb_clock,
            resets: pac.RESETS,
        }),
    }
}
