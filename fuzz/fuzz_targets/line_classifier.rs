#![no_main]

use gclens::classify::classify;
use gclens::GcLogParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    // Classification and feeding must not panic regardless of input
    let mut parser = GcLogParser::new();
    for line in input.lines() {
        let _ = classify(line);
        parser.feed(line);
    }
    let _ = parser.finish();
});
