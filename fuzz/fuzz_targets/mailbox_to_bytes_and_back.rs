#![no_main]

use imap_pipeline::mailbox::{decode_mailbox, encode_mailbox};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|name: &str| {
    #[cfg(feature = "debug")]
    println!("[!] Input: {name:?}");

    let encoded = encode_mailbox(name);
    #[cfg(feature = "debug")]
    println!("[!] Encoded: {encoded}");

    assert!(encoded.is_ascii());

    match decode_mailbox(&encoded) {
        Ok(decoded) => assert_eq!(name, decoded),
        Err(error) => panic!("Could not decode produced mailbox {encoded:?}. Error: {error:?}"),
    }
});
