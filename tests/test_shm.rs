// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Shared memory transport tests: create/open semantics, cursor transfers
// under strict producer-then-consumer phase separation, the join barrier
// across a real fork, and namespace teardown by the owner.
//
// No test reads the region without the barrier (or single-process phase
// separation) in place: an unsynchronized read is a data race, not a
// behavior to assert on.

use std::sync::atomic::{AtomicUsize, Ordering};

use handoff::process::{self, ForkOutcome};
use handoff::{
    read_exact, write_exact, ExchangeError, Message, Ownership, Rendezvous, Session,
    SharedMemorySegment, Stage, Transport, WireCodec,
};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_name(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("/{prefix}_shm_{n}_{}", std::process::id())
}

#[test]
fn create_then_open_then_unlink() {
    let name = unique_name("lifecycle");

    let mut owner = SharedMemorySegment::create(&name, 1024).expect("create");
    assert!(owner.created_name());
    assert_eq!(owner.len(), 1024);
    assert_eq!(owner.rendezvous(), Rendezvous::JoinPeer);

    // A second mapping of the same name, independent of the first.
    let peer = SharedMemorySegment::open(&name, 1024).expect("open");
    assert!(!peer.created_name());
    drop(peer);

    owner.unlink();
    assert!(
        SharedMemorySegment::open(&name, 1024).is_err(),
        "name should be absent after unlink"
    );
}

#[test]
fn open_nonexistent_fails() {
    let name = unique_name("missing");
    assert!(SharedMemorySegment::open(&name, 1024).is_err());
}

#[test]
fn create_tolerates_existing_segment() {
    let name = unique_name("eexist");

    let mut first = SharedMemorySegment::create(&name, 1024).expect("first");
    let second = SharedMemorySegment::create(&name, 1024).expect("second");
    assert!(first.created_name());
    assert!(!second.created_name());

    drop(second);
    first.unlink();
}

#[test]
fn exclusive_create_refuses_existing_segment() {
    let name = unique_name("excl");

    let mut first = SharedMemorySegment::create_exclusive(&name, 1024).expect("first");
    let err = SharedMemorySegment::create_exclusive(&name, 1024).unwrap_err();
    assert!(matches!(err, ExchangeError::ResourceExists { .. }));

    first.unlink();
}

#[test]
fn cursor_transfer_with_phase_separation() {
    let name = unique_name("cursor");
    let mut seg = SharedMemorySegment::create(&name, 1024).expect("create");
    let codec = WireCodec::for_region(seg.buffer_bytes(), seg.reserved_header_slots());
    assert_eq!(codec.capacity_limit(), 255);

    // Producer phase completes entirely before the consumer phase starts;
    // this sequencing is the in-process stand-in for the join barrier.
    let bytes = codec
        .encode(&Message::new(vec![-1, 0, 1, 1000]))
        .expect("encode");
    let mut sink = seg.producer_end().expect("producer end");
    write_exact(&mut sink, &bytes).expect("write");
    drop(sink);

    let mut source = seg.consumer_end().expect("consumer end");
    let mut header = [0u8; 4];
    read_exact(&mut source, &mut header).expect("header");
    let count = codec.decode_count(header).expect("count");
    let mut payload = vec![0u8; WireCodec::payload_bytes(count)];
    read_exact(&mut source, &mut payload).expect("payload");
    assert_eq!(WireCodec::decode_payload(&payload), vec![-1, 0, 1, 1000]);

    seg.unlink();
}

#[test]
fn cursor_keeps_mapping_alive_past_segment_drop() {
    let name = unique_name("liveness");
    let mut seg = SharedMemorySegment::create(&name, 64).expect("create");

    let mut sink = seg.producer_end().expect("producer end");
    let mut source = seg.consumer_end().expect("consumer end");
    seg.unlink();
    drop(seg);

    // The cursors share the mapping with the segment, so the pages stay
    // valid until the last cursor goes away.
    let pattern = [0x5Au8; 16];
    write_exact(&mut sink, &pattern).expect("write after segment drop");
    let mut back = [0u8; 16];
    read_exact(&mut source, &mut back).expect("read after segment drop");
    assert_eq!(back, pattern);
}

#[test]
fn attaching_to_undersized_segment_is_refused() {
    let name = unique_name("undersized");
    let mut small = SharedMemorySegment::create(&name, 64).expect("create");

    // Mapping more than the object holds would SIGBUS on first access;
    // both attach paths check the object size up front instead.
    let err = SharedMemorySegment::open(&name, 1024).unwrap_err();
    assert!(matches!(err, ExchangeError::CapacityExceeded(_)));

    let err = SharedMemorySegment::create(&name, 1024).unwrap_err();
    assert!(matches!(err, ExchangeError::CapacityExceeded(_)));

    small.unlink();
}

#[test]
fn region_overrun_is_broken_transfer() {
    let name = unique_name("overrun");
    let mut seg = SharedMemorySegment::create(&name, 64).expect("create");

    let mut sink = seg.producer_end().expect("producer end");
    let too_big = vec![0xABu8; 65];
    let err = write_exact(&mut sink, &too_big).unwrap_err();
    assert!(matches!(err, ExchangeError::IoBroken { done: 64, want: 65 }));
    drop(sink);

    seg.unlink();
}

#[test]
fn consume_without_peer_is_refused() {
    let name = unique_name("no_barrier");
    let seg = SharedMemorySegment::create(&name, 1024).expect("create");

    // Flat memory has no readiness signal; reading without a peer to join
    // on would be a race, so the session refuses outright.
    let mut session = Session::new(seg, Ownership::Owner);
    let err = session.consume(None).unwrap_err();
    assert_eq!(err.stage, Stage::HandoffPending);
    assert!(matches!(err.kind, ExchangeError::SynchronizationFailed(_)));
    // Session drop unlinks (owner + created), keeping the namespace clean.
}

#[test]
fn session_round_trip_across_fork_with_join_barrier() {
    let name = unique_name("e2e");
    let seg = SharedMemorySegment::create(&name, 1024).expect("create");

    match process::fork_split().expect("fork") {
        ForkOutcome::Child => {
            // Producer: inherited mapping, peer role — never unlinks.
            let mut session = Session::new(seg, Ownership::Peer);
            let code = match session.produce(&Message::new(vec![42])) {
                Ok(()) => 0,
                Err(_) => 2,
            };
            session.finish();
            unsafe { libc::_exit(code) }
        }
        ForkOutcome::Parent(child) => {
            let mut session = Session::new(seg, Ownership::Owner);
            // consume() joins the producer before touching the region.
            let message = session.consume(Some(&child)).expect("consume");
            assert_eq!(message.count(), 1);
            assert_eq!(message.payload(), &[42]);
            assert_eq!(session.stage(), Stage::Completed);
            session.finish();

            // Owner teardown removed the name from the namespace.
            assert!(SharedMemorySegment::open(&name, 1024).is_err());
        }
    }
}
