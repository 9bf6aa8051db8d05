#![no_main]

use imap_pipeline::mailbox::{decode_mailbox, encode_mailbox};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: &str| {
    #[cfg(feature = "debug")]
    println!("[!] Input: {input:?}");

    if let Ok(decoded) = decode_mailbox(input) {
        #[cfg(feature = "debug")]
        println!("[!] Decoded: {decoded:?}");

        // Re-encoding may normalize quoting, but must decode to the same name.
        assert_eq!(Ok(&decoded), decode_mailbox(&encode_mailbox(&decoded)).as_ref());
    }
});
