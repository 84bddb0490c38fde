#![no_main]

use disto_rs::disto::token::classify_line;
use disto_rs::parse_token;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    // Parsing must never panic, and anything accepted must round-trip its fields
    if let Some(word) = parse_token(&text) {
        let rebuilt = format!(
            "{:02}..{}{}{}",
            word.word_index,
            word.unit_code,
            word.sign.as_char(),
            &text[7..]
        );
        assert_eq!(rebuilt, text);
        assert!(word.value.is_finite());
    }

    let _ = classify_line(&text);
});
