#![no_main]

use disto_rs::LineAssembler;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // The first byte picks a chunk size; lines must not depend on it.
    // A small line limit exercises overlong splitting too.
    let chunk = (data[0] as usize % 16) + 1;
    let stream = &data[1..];

    let mut whole = LineAssembler::with_max_line_len(32);
    let expected: Vec<String> = whole.feed(stream).collect();

    let mut chunked = LineAssembler::with_max_line_len(32);
    let mut actual = Vec::new();
    for piece in stream.chunks(chunk) {
        actual.extend(chunked.feed(piece));
    }

    assert_eq!(actual, expected);
    assert_eq!(chunked.pending(), whole.pending());
});
