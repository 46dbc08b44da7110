// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Usage:
//   demo_exchange pipe
//   demo_exchange fifo
//   demo_exchange shm
//
// The parent creates the chosen transport and forks. The child (producer)
// reads an element count and then that many integers from stdin and sends
// them; the parent (consumer) receives and prints them. For shared memory
// the parent waits for the child to exit before reading — the join barrier.

use std::io::{self, BufRead};

use handoff::process::{self, ForkOutcome};
use handoff::{
    AnonymousPipe, Message, NamedFifo, Ownership, Rendezvous, Session, SharedMemorySegment,
    Transport, WireCodec,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: demo_exchange <pipe|fifo|shm>");
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "pipe" => AnonymousPipe::create()
            .map_err(Into::into)
            .and_then(run_session),
        "fifo" => NamedFifo::create_default()
            .map_err(Into::into)
            .and_then(run_session),
        "shm" => SharedMemorySegment::create_default()
            .map_err(Into::into)
            .and_then(run_session),
        other => {
            eprintln!("unknown transport: {other}");
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("demo_exchange: {e}");
        std::process::exit(1);
    }
}

fn run_session<T: Transport>(transport: T) -> Result<(), Box<dyn std::error::Error>> {
    match process::fork_split()? {
        ForkOutcome::Child => {
            let mut session = Session::new(transport, Ownership::Peer);
            let message = match read_stdin_message(&session.codec()) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("input: {e}");
                    session.finish();
                    std::process::exit(1);
                }
            };
            if let Err(e) = session.produce(&message) {
                eprintln!("produce: {e}");
                session.finish();
                std::process::exit(1);
            }
            session.finish();
            std::process::exit(0);
        }
        ForkOutcome::Parent(child) => {
            let mut session = Session::new(transport, Ownership::Owner);
            let needs_join = session.transport().rendezvous() == Rendezvous::JoinPeer;
            let peer = if needs_join { Some(&child) } else { None };

            let message = session.consume(peer)?;
            let rendered: Vec<String> =
                message.payload().iter().map(|v| v.to_string()).collect();
            println!("{}", rendered.join(" "));

            // Stream transports did not join during consume; reap the child.
            if !needs_join {
                process::wait_for_exit(&child)?;
            }
            session.finish();
            Ok(())
        }
    }
}

/// Interactive input: read the element count, then that many integers,
/// whitespace-separated. Only the capacity bound is the library's concern;
/// parsing lives here.
fn read_stdin_message(codec: &WireCodec) -> io::Result<Message> {
    let stdin = io::stdin();
    let mut tokens = Vec::new();

    println!("Enter number of elements, then the elements:");
    for line in stdin.lock().lines() {
        let line = line?;
        for tok in line.split_whitespace() {
            let v: i64 = tok
                .parse()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "not an integer"))?;
            tokens.push(v);
        }
        if let Some(&count) = tokens.first() {
            if count >= 0 && tokens.len() as i64 > count {
                break;
            }
        }
    }

    let count = *tokens.first().ok_or_else(|| {
        io::Error::new(io::ErrorKind::UnexpectedEof, "no input")
    })?;
    if count < 1 || count > u32::MAX as i64 || codec.validate(count as u32).is_err() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("element count must be in 1..={}", codec.capacity_limit()),
        ));
    }

    let values: io::Result<Vec<i32>> = tokens[1..]
        .iter()
        .take(count as usize)
        .map(|&v| {
            i32::try_from(v)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "value out of i32 range"))
        })
        .collect();
    let values = values?;
    if values.len() != count as usize {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "fewer elements than announced",
        ));
    }
    Ok(Message::new(values))
}
