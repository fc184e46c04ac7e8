//! Fuzz target: `FrameCodec::parse_bytes`
//!
//! Arbitrary bytes from the serial line must either be rejected with a
//! `ParseError` or produce a pair whose validity masks agree with the
//! configured ranges.  Accepted pairs must survive a `to_line` round trip.
//!
//! cargo fuzz run fuzz_frame_parser

#![no_main]

use greenhouse::sensors::{Field, FrameCodec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let codec = FrameCodec::default();
    let Ok(pair) = codec.parse_bytes(data) else {
        return;
    };

    for frame in [&pair.controlled, &pair.control] {
        for field in Field::ALL {
            let in_range = codec.ranges().bounds(field).contains(frame.raw(field));
            assert_eq!(frame.value(field).is_some(), in_range);
        }
    }

    // NaN never equals itself, so compare the re-parsed line textually.
    let line = pair.to_line();
    let again = codec.parse(&line).expect("serialised pair parses");
    assert_eq!(again.to_line(), line);
});
