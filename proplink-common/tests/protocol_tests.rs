// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the bridge request/response protocol.

#![cfg(feature = "std")]

use proplink_common::protocol::{Request, Response, MAX_DATA_BLOCK_SIZE, MAX_MESSAGE_LEN};
use proplink_common::{LoadArgs, LoadError, LoadState, STATUS_BAD_REQUEST, STATUS_OK};

#[test]
fn test_max_data_block_matches_packet_size() {
    assert_eq!(MAX_DATA_BLOCK_SIZE, 1024);
}

#[test]
fn test_outcome_ok() {
    let resp = Response::outcome(Ok(()));
    assert!(resp.is_ok());
    match resp {
        Response::Outcome { status, message } => {
            assert_eq!(status, STATUS_OK);
            assert!(message.is_empty());
        }
        _ => panic!("expected outcome"),
    }
}

#[test]
fn test_outcome_error_carries_message() {
    let resp = Response::outcome(Err(LoadError::ChecksumError { received: 0x12 }));
    assert!(!resp.is_ok());
    match resp {
        Response::Outcome { status, message } => {
            assert_eq!(status, STATUS_BAD_REQUEST);
            assert_eq!(message, "Checksum error (got 0x12)");
        }
        _ => panic!("expected outcome"),
    }
}

#[test]
fn test_longest_error_message_fits_on_the_bridge() {
    let worst = LoadError::WrongTag {
        expected: i32::MIN,
        received: i32::MIN,
        state: LoadState::ProgramVerifyEepromAck,
    };
    assert!(worst.to_string().len() <= MAX_MESSAGE_LEN);
}

#[test]
fn test_every_error_is_a_bad_request() {
    for e in [
        LoadError::Busy,
        LoadError::HandshakeTimeout,
        LoadError::NoData,
        LoadError::Aborted,
    ] {
        assert_eq!(e.status(), 400);
    }
}

#[test]
fn test_begin_request_survives_cobs_framing() {
    let req = Request::Begin {
        image_size: 4096,
        args: LoadArgs {
            initial_baud: Some(115_200),
            final_baud: None,
            second_stage_baud: Some(921_600),
            reset_pin: Some(12),
        },
    };
    let mut frame = postcard::to_allocvec_cobs(&req).unwrap();
    assert_eq!(frame.last(), Some(&0));
    assert!(frame[..frame.len() - 1].iter().all(|&b| b != 0));

    match postcard::from_bytes_cobs::<Request>(&mut frame).unwrap() {
        Request::Begin { image_size, args } => {
            assert_eq!(image_size, 4096);
            assert_eq!(args.second_stage_baud, Some(921_600));
            assert_eq!(args.final_baud, None);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_status_response_decodes() {
    let resp = Response::Status {
        state: LoadState::DataAck,
        target_version: Some(1),
        packet_id: 3,
    };
    let bytes = postcard::to_allocvec(&resp).unwrap();
    match postcard::from_bytes::<Response>(&bytes).unwrap() {
        Response::Status {
            state,
            target_version,
            packet_id,
        } => {
            assert_eq!(state, LoadState::DataAck);
            assert_eq!(target_version, Some(1));
            assert_eq!(packet_id, 3);
        }
        other => panic!("unexpected {other:?}"),
    }
}
