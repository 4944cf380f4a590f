#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The dispatcher only ever sees valid UTF-8 lines from stdin, but
    // the parser itself must never panic on any of them.
    if let Ok(line) = std::str::from_utf8(data) {
        let _ = caro_client::command::parse_line(line);
    }
});
