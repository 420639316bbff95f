#![no_main]

use libfuzzer_sys::fuzz_target;
use uniflow_core::Path;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(path) = Path::parse(input) {
        let rendered = path.to_string();
        let reparsed = Path::parse(&rendered).expect("rendered path must parse");
        assert_eq!(reparsed, path);
        for len in 0..=path.len() {
            assert!(path.prefix(len).relation(&path).covers());
        }
    }
});
