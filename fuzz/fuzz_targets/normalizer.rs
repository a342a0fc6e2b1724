#![no_main]

use libfuzzer_sys::fuzz_target;
use logshield_core::pipeline::LogParser;
use logshield_pipeline::KeyValueNormalizer;

fuzz_target!(|data: &[u8]| {
    let parser = KeyValueNormalizer::new();
    let line = String::from_utf8_lossy(data);

    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    if let Ok(event) = parser.parse(&line) {
        assert!(!event.service.is_empty());
        assert_eq!(event.raw, line);
    }
});
