#![no_main]

use libfuzzer_sys::fuzz_target;
use msgparse_engine::syslog::strip_priority;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);

    // 크래시나 패닉 없이 접미사를 돌려줘야 한다
    let (priority, rest) = strip_priority(&line);
    assert!(line.ends_with(rest));
    if let Some(priority) = priority {
        assert!(priority.severity <= 7);
    }
});
