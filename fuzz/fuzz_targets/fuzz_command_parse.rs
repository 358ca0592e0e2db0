//! Fuzz target: `parse_frame`
//!
//! Arbitrary UTF-8 must either parse into a request or fail with a
//! `CommandError`; a parsed command carries an object `info`.
//!
//! cargo fuzz run fuzz_command_parse

#![no_main]

use febina::command::{Request, parse_frame};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(Request::Command(cmd)) = parse_frame(text) {
        // Re-serialising the normalised info must not fail.
        assert!(serde_json::to_string(&cmd.info).is_ok());
    }
});
