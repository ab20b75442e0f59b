//! Fuzz target for tree content parsing.
//!
//! Tests that arbitrary tree listings parse or fail cleanly without
//! panicking.

#![no_main]

use gitmap_graph::GitObject;
use gitmap_odb::{MemoryStore, ObjectType, Resolver};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let store = MemoryStore::new();
    let id = store.put(ObjectType::Tree, data.to_vec());
    let resolver = Resolver::new(store);

    if let Ok(object) = GitObject::create(id, &resolver) {
        let _ = object.links(&resolver);
    }
});
