#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::path::{Component, Path};
use tweetfs::modules::namespace::{InodeTable, Location, Namespace};

#[derive(Debug, Arbitrary)]
struct Input {
    handle: String,
    paths: Vec<String>,
}

fuzz_target!(|input: Input| {
    let namespace = Namespace::new(input.handle);
    let mut inodes = InodeTable::new();

    for raw in &input.paths {
        let path = Path::new(raw);
        match namespace.locate(path) {
            Location::Account { handle, .. } | Location::Post { handle, .. } => {
                // Classified names never step outside the mirror root
                assert!(!handle.is_empty());
                assert!(!handle.contains('/'));
                assert!(handle != "." && handle != "..");
            }
            Location::Root | Location::Other => {}
        }

        if path.is_absolute() && !path.components().any(|c| c == Component::ParentDir) {
            let ino = inodes.get_or_create(path);
            assert_eq!(inodes.get_or_create(path), ino);
        }
    }

    if let [from, to, ..] = input.paths.as_slice() {
        inodes.rename(Path::new(from), Path::new(to));
        inodes.remove_path(Path::new(to));
    }
});
