#![no_main]

use arbitrary::Arbitrary;
use honeyaws_core::pipeline::LogParser;
use honeyaws_core::types::LogFormat;
use honeyaws_publisher::parser::FormatParser;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Format {
    Elb,
    Alb,
    CloudFront,
}

fuzz_target!(|input: (Format, &str)| {
    let format = match input.0 {
        Format::Elb => LogFormat::Elb,
        Format::Alb => LogFormat::Alb,
        Format::CloudFront => LogFormat::CloudFront,
    };
    if let Ok(parser) = FormatParser::for_format(format) {
        let _ = parser.parse_line(input.1);
    }
});
