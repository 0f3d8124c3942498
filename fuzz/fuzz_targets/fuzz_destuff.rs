//! Fuzz target: `destuff` / `destuff_in_place`
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Output never longer than input
//! - Destuffing is idempotent
//! - In-place and allocating forms agree
//!
//! cargo fuzz run fuzz_destuff

#![no_main]

use libfuzzer_sys::fuzz_target;
use marklink::link::{destuff, destuff_in_place};

fuzz_target!(|data: &[u8]| {
    let once = destuff(data);
    assert!(once.len() <= data.len());
    assert_eq!(destuff(&once), once, "destuff must be idempotent");

    let mut buf = data.to_vec();
    let len = destuff_in_place(&mut buf);
    assert_eq!(&buf[..len], once.as_slice());
});
