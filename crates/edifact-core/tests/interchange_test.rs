//! Interchange envelope handling: header parsing, message extraction,
//! footer bookkeeping, and file ingestion.

use chrono::NaiveDate;
use edifact_core::collection::SegmentContainer;
use edifact_core::{ControlCharacters, Element, Error, Interchange, Message, Segment};

const ONE_MESSAGE: &str = "UNB+UNOA:3+SENDER+RECIPIENT+200102:1430+REF01'\
UNH+1+ORDERS:D:96A:UN'\
BGM+220+PO1'\
UNT+3+1'\
UNZ+1+REF01'";

#[test]
fn parses_header_fields() {
    let interchange: Interchange = ONE_MESSAGE.parse().unwrap();
    assert_eq!(interchange.sender, Element::from("SENDER"));
    assert_eq!(interchange.recipient, Element::from("RECIPIENT"));
    assert_eq!(interchange.control_reference, Element::from("REF01"));
    assert_eq!(interchange.syntax_identifier, ("UNOA".to_string(), 3));
    assert_eq!(
        interchange.timestamp,
        NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap()
    );
    // Envelope segments are not stored in the body.
    let tags: Vec<_> = interchange.segments.iter().map(|s| s.tag.as_str()).collect();
    assert_eq!(tags, ["UNH", "BGM", "UNT"]);
}

#[test]
fn parses_four_digit_year() {
    let text = "UNB+UNOC:4+SENDER+RECIPIENT+20200102:1430+REF01'BGM+220'";
    let interchange: Interchange = text.parse().unwrap();
    assert_eq!(
        interchange.timestamp,
        NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap()
    );
}

#[test]
fn keeps_composite_party_identifications() {
    let text = "UNB+UNOA:3+SENDER:14:INTERNAL+RECIPIENT:ZZ+200102:1430+REF01'BGM+220'";
    let interchange: Interchange = text.parse().unwrap();
    assert_eq!(
        interchange.sender,
        Element::from(vec!["SENDER", "14", "INTERNAL"])
    );
    assert_eq!(interchange.recipient, Element::from(vec!["RECIPIENT", "ZZ"]));
}

#[test]
fn keeps_extra_header_elements() {
    let text = "UNB+UNOA:3+SENDER+RECIPIENT+200102:1430+REF01+APPREF+A'BGM+220'";
    let interchange: Interchange = text.parse().unwrap();
    assert_eq!(
        interchange.extra_header_elements,
        vec![Element::from("APPREF"), Element::from("A")]
    );
    // They are re-emitted verbatim on the synthesized header.
    let header = interchange.header_segment().unwrap();
    assert_eq!(header.elements.len(), 7);
    assert_eq!(header.elements[5], Element::from("APPREF"));
}

#[test]
fn extracts_messages() {
    let interchange: Interchange = ONE_MESSAGE.parse().unwrap();
    let messages = interchange.get_messages().unwrap();
    assert_eq!(messages.len(), 1);

    let message = &messages[0];
    assert_eq!(message.reference_number, "1");
    assert_eq!(message.message_type(), "ORDERS");
    assert_eq!(message.version(), "D.96A");
    assert_eq!(message.segments.len(), 1);
    assert_eq!(message.segments[0].tag, "BGM");
}

#[test]
fn extracts_multiple_messages() {
    let text = "UNB+UNOA:3+S+R+200102:1430+REF01'\
UNH+1+ORDERS:D:96A:UN'BGM+220'UNT+3+1'\
UNH+2+DESADV:D:96A:UN'BGM+351'UNT+3+2'\
UNZ+2+REF01'";
    let interchange: Interchange = text.parse().unwrap();
    let messages = interchange.get_messages().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].message_type(), "ORDERS");
    assert_eq!(messages[1].message_type(), "DESADV");
}

#[test]
fn unclosed_message_is_an_error() {
    let text = "UNB+UNOA:3+S+R+200102:1430+REF01'UNH+1+ORDERS:D:96A:UN'BGM+220'UNZ+1+REF01'";
    let interchange: Interchange = text.parse().unwrap();
    let err = interchange.get_messages().unwrap_err();
    assert!(matches!(err, Error::Syntax(m) if m.contains("not closed")));
}

#[test]
fn nested_message_start_is_an_error() {
    let text = "UNB+UNOA:3+S+R+200102:1430+REF01'\
UNH+1+ORDERS:D:96A:UN'UNH+2+ORDERS:D:96A:UN'UNT+2+2'UNZ+1+REF01'";
    let interchange: Interchange = text.parse().unwrap();
    let err = interchange.get_messages().unwrap_err();
    assert!(matches!(err, Error::Syntax(m) if m.contains("missing UNT")));
}

#[test]
fn unmatched_message_end_is_an_error() {
    let text = "UNB+UNOA:3+S+R+200102:1430+REF01'BGM+220'UNT+2+1'UNZ+1+REF01'";
    let interchange: Interchange = text.parse().unwrap();
    let err = interchange.get_messages().unwrap_err();
    assert!(matches!(err, Error::Syntax(m) if m.contains("without matching UNH")));
}

#[test]
fn footer_counts_messages() {
    let text = "UNB+UNOA:3+S+R+200102:1430+REF01'\
UNH+1+ORDERS:D:96A:UN'BGM+220'UNT+3+1'\
UNH+2+ORDERS:D:96A:UN'BGM+220'UNT+3+2'\
UNZ+2+REF01'";
    let interchange: Interchange = text.parse().unwrap();
    let footer = interchange.footer_segment().unwrap();
    assert_eq!(footer.tag, "UNZ");
    assert_eq!(footer.elements[0], Element::from("2"));
    assert_eq!(footer.elements[1], Element::from("REF01"));
}

#[test]
fn footer_falls_back_to_body_segment_count() {
    // No message envelopes at all: the footer reports the raw body count.
    let text = "UNB+UNOA:3+S+R+200102:1430+REF01'BGM+220'DTM+137'RFF+ON:1'UNZ+3+REF01'";
    let interchange: Interchange = text.parse().unwrap();
    let footer = interchange.footer_segment().unwrap();
    assert_eq!(footer.elements[0], Element::from("3"));
}

#[test]
fn interchange_must_open_with_its_header() {
    let err = "BGM+220'".parse::<Interchange>().unwrap_err();
    assert!(matches!(err, Error::Syntax(m) if m.contains("must start with UNB")));
}

#[test]
fn short_header_is_an_error() {
    let err = "UNB+UNOA:3+SENDER'".parse::<Interchange>().unwrap_err();
    assert!(matches!(err, Error::Syntax(m) if m.contains("missing elements")));
}

#[test]
fn malformed_timestamp_is_an_error() {
    let err = "UNB+UNOA:3+S+R+2001:1430+REF01'"
        .parse::<Interchange>()
        .unwrap_err();
    assert!(matches!(err, Error::Syntax(m) if m.contains("timestamp")));
}

#[test]
fn malformed_syntax_identifier_is_an_error() {
    let err = "UNB+UNOA+S+R+200102:1430+REF01'"
        .parse::<Interchange>()
        .unwrap_err();
    assert!(matches!(err, Error::Syntax(m) if m.contains("syntax identifier")));
}

#[test]
fn advice_prefix_sets_characters_and_flag() {
    let text = "UNA:+.? 'UNB+UNOA:3+S+R+200102:1430+REF01'BGM+220'";
    let interchange: Interchange = text.parse().unwrap();
    assert!(interchange.has_una());
    assert_eq!(interchange.characters.decimal_point, '.');
    assert!(interchange.serialize(false).starts_with("UNA:+.? 'UNB"));
}

#[test]
fn add_message_appends_envelope_and_body() {
    let mut interchange = Interchange::new(
        "SENDER",
        "RECIPIENT",
        "REF01",
        ("UNOA".to_string(), 3),
    )
    .with_timestamp(
        NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap(),
    );

    let mut message = Message::new(
        "1",
        vec![
            "ORDERS".to_string(),
            "D".to_string(),
            "96A".to_string(),
            "UN".to_string(),
        ],
        ControlCharacters::default(),
    );
    message.add_segment(Segment::new("BGM", vec!["220".into()]));
    interchange.add_message(message);

    let tags: Vec<_> = interchange.segments.iter().map(|s| s.tag.as_str()).collect();
    assert_eq!(tags, ["UNH", "BGM", "UNT"]);
    assert_eq!(
        interchange.serialize(false),
        "UNB+UNOA:3+SENDER+RECIPIENT+200102:1430+REF01'\
UNH+1+ORDERS:D:96A:UN'BGM+220'UNT+3+1'UNZ+1+REF01'"
    );
}

#[test]
fn reads_latin1_file() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    // "MÜLLER" in latin-1: Ü is a single 0xDC byte, invalid as UTF-8.
    let mut bytes = b"UNB+UNOA:3+M".to_vec();
    bytes.push(0xDC);
    bytes.extend_from_slice(b"LLER+RECIPIENT+200102:1430+REF01'BGM+220'");
    file.write_all(&bytes).unwrap();

    let interchange = Interchange::from_file(file.path(), "latin1").unwrap();
    assert_eq!(interchange.sender, Element::from("M\u{dc}LLER"));
}

#[test]
fn unknown_encoding_fails_before_reading() {
    let err = Interchange::from_file("/no/such/file", "not-an-encoding").unwrap_err();
    assert!(matches!(err, Error::UnknownEncoding(label) if label == "not-an-encoding"));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = Interchange::from_file("/no/such/file", "latin1").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
