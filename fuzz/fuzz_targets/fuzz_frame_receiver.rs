//! Fuzz target: `FrameReceiver::feed` + `codec::decode`
//!
//! Drives arbitrary byte sequences through the streaming receiver and
//! decodes every completed payload in both modes.  Asserts that nothing
//! panics, that payloads stay within the receive buffer and never carry
//! a frame marker, and that a reset receiver behaves like a fresh one.
//!
//! cargo fuzz run fuzz_frame_receiver

#![no_main]

use libfuzzer_sys::fuzz_target;
use vexbridge::protocol::codec::{self, DecodeMode, FRAME_END, FRAME_START};
use vexbridge::protocol::receiver::FrameReceiver;

fuzz_target!(|data: &[u8]| {
    let mut receiver: FrameReceiver = FrameReceiver::new();
    let mut payloads = Vec::new();

    // Split the input in two so frames straddle feed calls.
    let (head, tail) = data.split_at(data.len() / 2);
    for chunk in [head, tail] {
        receiver.feed(chunk, |frame| {
            assert!(frame.payload.len() <= FrameReceiver::<256>::MAX_PAYLOAD);
            assert!(!frame.payload.contains(&FRAME_START));
            assert!(!frame.payload.contains(&FRAME_END));
            let _ = codec::decode(frame.payload, DecodeMode::Lenient);
            let _ = codec::decode(frame.payload, DecodeMode::Strict);
            payloads.push(frame.payload.to_vec());
        });
        assert!(receiver.len() < receiver.capacity());
    }

    // After a reset, the same bytes in one go yield the same frames.
    receiver.reset();
    let mut again = Vec::new();
    receiver.feed(data, |frame| again.push(frame.payload.to_vec()));
    assert_eq!(payloads, again);
});
