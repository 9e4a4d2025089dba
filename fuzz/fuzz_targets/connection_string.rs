#![no_main]

use export_solution::connection::ConnectionString;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must never panic; a parsed Url is always http(s) without a trailing slash
        if let Ok(conn) = input.parse::<ConnectionString>() {
            assert!(conn.url.starts_with("http://") || conn.url.starts_with("https://"));
            assert!(!conn.url.ends_with('/'));
        }
    }
});
