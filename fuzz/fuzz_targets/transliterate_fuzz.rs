#![no_main]
use libfuzzer_sys::fuzz_target;
use tweetfs::modules::mirror::{transliterate, TextPolicy};

fuzz_target!(|text: &str| {
    let ascii = transliterate(text, TextPolicy::Ascii);
    assert!(ascii.is_ascii());
    assert!(ascii.len() <= text.len());

    assert_eq!(transliterate(text, TextPolicy::Verbatim), text);
});
