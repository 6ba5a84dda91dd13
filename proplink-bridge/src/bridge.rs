// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Bridge loop: host requests over USB CDC, target traffic over UART0.
//!
//! Requests map onto the loader's session control:
//! - GetStatus: Report the session state
//! - Begin: Reset the target and bootstrap the second-stage loader
//! - Data: Send one application chunk
//! - End: Verify and launch (or program) the image
//! - RomLoad: Load a small image through the boot ROM alone
//! - Abort: Drop the session
//!
//! Synchronous rejections are answered immediately. Asynchronous outcomes are
//! forwarded as soon as the loader reports them, always ahead of any later
//! answer.

use crate::peripherals::{self, Peripherals};
use crate::second_stage::{self, SECOND_STAGE};
use crate::target::{RoscRng, Target};
use crate::usb_transport::UsbTransport;
use embedded_hal::digital::OutputPin;
use proplink_common::protocol::{Request, Response};
use proplink_common::{LoadError, Loader};
use rp2040_hal as hal;
use usb_device::class_prelude::UsbBusAllocator;

type BridgeLoader = Loader<'static, RoscRng>;

/// Initialize USB and the target link, then serve the host forever.
pub fn run(mut p: Peripherals) -> ! {
    if !second_stage::is_complete() {
        defmt::warn!("no second-stage loader embedded, only ROM loads will work");
    }

    let mut usb = p.usb.take().expect("USB peripherals already taken");
    let usb_bus = UsbBusAllocator::new(hal::usb::UsbBus::new(
        usb.regs,
        usb.dpram,
        usb.clock,
        true,
        &mut usb.resets,
    ));
    peripherals::store_usb_bus(usb_bus);
    let mut transport = UsbTransport::new(peripherals::usb_bus_ref());

    let mut target = Target::new(p.uart, p.peripheral_freq, p.reset_pin, p.timer);
    let mut loader = Loader::new(SECOND_STAGE, RoscRng::new(p.rosc));

    defmt::println!("USB CDC initialized, entering bridge loop");
    serve(&mut transport, &mut target, &mut loader, &mut p.led_pin)
}

fn serve(
    transport: &mut UsbTransport,
    target: &mut Target,
    loader: &mut BridgeLoader,
    led: &mut impl OutputPin,
) -> ! {
    let mut rx = [0u8; 64];

    loop {
        transport.poll();

        if let Some(req) = transport.try_receive() {
            handle_request(transport, target, loader, req);
        }

        let count = target.poll_receive(&mut rx);
        if count > 0 {
            loader.on_receive(target, &rx[..count]);
        }
        if target.timer_expired() {
            loader.on_timer(target);
        }
        forward_outcomes(transport, target);

        // Lit while a session is active.
        if loader.is_idle() {
            led.set_low().ok();
        } else {
            led.set_high().ok();
        }
    }
}

fn forward_outcomes(transport: &mut UsbTransport, target: &mut Target) {
    while let Some(outcome) = target.next_outcome() {
        transport.send(&Response::outcome(outcome));
    }
}

/// Dispatch a request to the loader.
fn handle_request(
    transport: &mut UsbTransport,
    target: &mut Target,
    loader: &mut BridgeLoader,
    req: Request,
) {
    let result: Result<(), LoadError> = match req {
        Request::GetStatus => {
            transport.send(&Response::Status {
                state: loader.state(),
                target_version: loader.target_version(),
                packet_id: loader.packet_id(),
            });
            return;
        }
        Request::Begin { image_size, args } => {
            defmt::println!("Begin: {} bytes", image_size);
            loader.begin_load(target, image_size as usize, &args)
        }
        Request::Data { data } => loader.feed_data(target, &data),
        Request::End { command } => loader.end_load(target, &command),
        Request::RomLoad { args, image } => {
            defmt::println!("RomLoad: {} bytes", image.len());
            loader.begin_rom_load(target, &image, &args)
        }
        Request::Abort => {
            loader.abort(target);
            forward_outcomes(transport, target);
            transport.send(&Response::outcome(Ok(())));
            return;
        }
    };

    // An aborted request's outcome goes out before this one's rejection.
    forward_outcomes(transport, target);
    if let Err(e) = result {
        defmt::println!("Request rejected: {}", e);
        transport.send(&Response::outcome(Err(e)));
    }
}
