//! Fuzz target: `LineFramer::push`
//!
//! Splits arbitrary bytes into characteristic-sized writes, feeds them to
//! the framer and checks that no completed frame exceeds the bound, that
//! frames never carry the delimiter, and that a reset leaves nothing
//! behind.
//!
//! cargo fuzz run fuzz_line_framer

#![no_main]

use febina::command::LineFramer;
use libfuzzer_sys::fuzz_target;

const LIMIT: usize = 256;

fuzz_target!(|data: &[u8]| {
    // First byte picks the write size, like a peer's negotiated MTU.
    let Some((&mtu, stream)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(mtu % 64) + 1;

    let mut framer = LineFramer::new(LIMIT);
    for c in stream.chunks(chunk) {
        framer.push(c);
        while let Some(frame) = framer.next_frame() {
            if let Ok(text) = frame {
                assert!(!text.is_empty(), "empty frames are skipped");
                assert!(text.len() <= LIMIT, "frame exceeds bound");
                assert!(!text.contains('\n'), "delimiter leaked into frame");
            }
        }
        assert!(framer.pending() <= LIMIT);
    }

    framer.reset();
    assert_eq!(framer.pending(), 0);
    assert!(framer.next_frame().is_none());
});
