//! Fuzz target for object identifier parsing.
//!
//! Tests that arbitrary strings never panic the hex decoder and that
//! accepted ids round-trip.

#![no_main]

use gitmap_odb::ObjectId;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(id) = ObjectId::from_hex(s) {
            assert_eq!(id.to_hex().len(), 40);
            assert_eq!(ObjectId::from_hex(&id.to_hex()).unwrap(), id);
            let _ = id.short(data.len());
        }
    }
});
