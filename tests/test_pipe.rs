// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Anonymous pipe transport tests: stream-level exchange between threads,
// a full producer/consumer session across a real fork, and the broken
// stream / role-split edge cases.

use std::thread;

use handoff::process::{self, ForkOutcome};
use handoff::{
    read_exact, write_exact, AnonymousPipe, ExchangeError, Message, Ownership, Session, Transport,
    WireCodec,
};

#[test]
fn stream_round_trip_between_threads() {
    let pipe = AnonymousPipe::create().expect("pipe");
    let codec = WireCodec::for_region(pipe.buffer_bytes(), 0);
    let (mut reader, mut writer) = pipe.split().expect("split");

    let bytes = codec
        .encode(&Message::new(vec![10, 20, 30]))
        .expect("encode");
    let want = bytes.len();

    let producer = thread::spawn(move || {
        write_exact(&mut writer, &bytes).expect("write_exact");
        // writer drops here, closing the write end
    });

    let mut got = vec![0u8; want];
    read_exact(&mut reader, &mut got).expect("read_exact");
    producer.join().expect("join producer");

    let mut header = [0u8; 4];
    header.copy_from_slice(&got[..4]);
    assert_eq!(codec.decode_count(header).expect("count"), 3);
    assert_eq!(WireCodec::decode_payload(&got[4..]), vec![10, 20, 30]);
}

#[test]
fn session_round_trip_across_fork() {
    let pipe = AnonymousPipe::create().expect("pipe");

    match process::fork_split().expect("fork") {
        ForkOutcome::Child => {
            let mut session = Session::new(pipe, Ownership::Peer);
            let code = match session.produce(&Message::new(vec![10, 20, 30])) {
                Ok(()) => 0,
                Err(_) => 2,
            };
            session.finish();
            unsafe { libc::_exit(code) }
        }
        ForkOutcome::Parent(child) => {
            let mut session = Session::new(pipe, Ownership::Owner);
            let message = session.consume(None).expect("consume");
            assert_eq!(message.count(), 3);
            assert_eq!(message.payload(), &[10, 20, 30]);

            let wait = process::wait_for_exit(&child).expect("wait");
            assert!(wait.clean(), "producer exit: {wait:?}");
        }
    }
}

#[test]
fn truncated_writer_breaks_the_read() {
    let pipe = AnonymousPipe::create().expect("pipe");
    let (mut reader, mut writer) = pipe.split().expect("split");

    // Announce 3 elements but deliver only 2 before closing.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&3u32.to_ne_bytes());
    bytes.extend_from_slice(&1i32.to_ne_bytes());
    bytes.extend_from_slice(&2i32.to_ne_bytes());

    let producer = thread::spawn(move || {
        write_exact(&mut writer, &bytes).expect("write_exact");
    });

    let mut header = [0u8; 4];
    read_exact(&mut reader, &mut header).expect("header");
    assert_eq!(u32::from_ne_bytes(header), 3);

    let mut payload = [0u8; 12];
    let err = read_exact(&mut reader, &mut payload).unwrap_err();
    assert!(matches!(err, ExchangeError::IoBroken { done: 8, want: 12 }));
    producer.join().expect("join");
}

#[test]
fn role_split_consumes_the_ends() {
    let mut pipe = AnonymousPipe::create().expect("pipe");
    let _writer = pipe.producer_end().expect("first take");

    // The write end is gone and the read end was released by the split.
    assert!(matches!(
        pipe.producer_end().unwrap_err(),
        ExchangeError::HandleInvalid
    ));
    assert!(matches!(
        pipe.consumer_end().unwrap_err(),
        ExchangeError::HandleInvalid
    ));
}

#[test]
fn split_after_role_split_fails() {
    let mut pipe = AnonymousPipe::create().expect("pipe");
    let _reader = pipe.consumer_end().expect("take reader");
    assert!(matches!(
        pipe.split().unwrap_err(),
        ExchangeError::HandleInvalid
    ));
}
