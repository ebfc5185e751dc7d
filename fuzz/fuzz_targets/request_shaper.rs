#![no_main]

use honeyaws_publisher::shaper::shape_request;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|request: &str| {
    let _ = shape_request(request);
});
