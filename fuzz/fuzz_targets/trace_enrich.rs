#![no_main]

use chrono::{TimeZone, Utc};
use honeyaws_core::event::Event;
use honeyaws_publisher::enrich::{add_trace_data, drop_negative_times};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (&str, &str, f64, bool)| {
    let (trace_header, response_time, request_processing_time, edge_mode) = input;
    let Some(ts) = Utc.timestamp_opt(1_530_570_168, 0).single() else {
        return;
    };
    let mut event = Event::new(ts);
    event.insert("trace_id", trace_header);
    event.insert("response_time", response_time);
    event.insert("request_processing_time", request_processing_time);

    drop_negative_times(&mut event);
    add_trace_data(&mut event, edge_mode);
});
