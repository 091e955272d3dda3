// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

const LINE: &str =
    "127.0.0.1 - james [09/05/2018:16:00:39 +0000] \"GET /report HTTP/1.0\" 200 123";

#[test]
fn parses_every_field() {
    let record = parse_line(LINE).unwrap();
    assert_eq!(record.host, "127.0.0.1");
    assert_eq!(record.ident, "-");
    assert_eq!(record.auth_user, "james");
    assert_eq!(record.timestamp, 1_525_881_639_000);
    assert_eq!(record.method, HttpMethod::Get);
    assert_eq!(record.resource, "/report");
    assert_eq!(record.version, "1.0");
    assert_eq!(record.status, 200);
    assert_eq!(record.bytes, 123);
}

#[test]
fn parses_named_month_datetimes() {
    let record = parse_line(
        "192.168.0.17 - lina [05/November/2020:16:09:42 +0000] \
         \"GET /wp-content/plugins/woocommerce/vendor/maxmind-db/reader HTTP/1.1\" 300 3621",
    )
    .unwrap();
    assert_eq!(record.timestamp, 1_604_592_582_000);
    assert_eq!(record.section(), Some("/wp-content"));
    assert_eq!(record.version, "1.1");
}

#[test]
fn parse_then_render_reproduces_the_line() {
    let record = parse_line(LINE).unwrap();
    assert_eq!(record.to_string(), LINE);
}

#[parameterized(
    all_methods_get = { "GET" },
    all_methods_head = { "HEAD" },
    all_methods_post = { "POST" },
    all_methods_put = { "PUT" },
    all_methods_patch = { "PATCH" },
    all_methods_delete = { "DELETE" },
    all_methods_options = { "OPTIONS" },
)]
fn accepts_every_method(method: &str) {
    let line = format!(
        "127.0.0.1 - - [09/05/2018:16:00:39 +0000] \"{method} /api/user HTTP/1.1\" 200 34"
    );
    assert_eq!(parse_line(&line).unwrap().method.as_str(), method);
}

#[test]
fn rejects_an_empty_line() {
    assert_eq!(parse_line(""), Err(ClfParseError::Missing("host")));
}

#[test]
fn rejects_a_truncated_line() {
    assert_eq!(
        parse_line("127.0.0.1 -"),
        Err(ClfParseError::Missing("authuser"))
    );
}

#[test]
fn rejects_a_missing_datetime_bracket() {
    assert!(matches!(
        parse_line("127.0.0.1 - james 09/05/2018:16:00:39 +0000 \"GET /report HTTP/1.0\" 200 123"),
        Err(ClfParseError::Missing("datetime"))
    ));
}

#[test]
fn rejects_an_unterminated_request() {
    assert!(matches!(
        parse_line("127.0.0.1 - james [09/05/2018:16:00:39 +0000] \"GET /report HTTP/1.0 200 123"),
        Err(ClfParseError::Unterminated { field: "request", .. })
    ));
}

#[parameterized(
    unknown_method = { "FETCH /report HTTP/1.0" },
    missing_version = { "GET /report" },
    lowercase_method = { "get /report HTTP/1.0" },
    spaced_resource = { "GET /a b HTTP/1.0" },
)]
fn rejects_malformed_requests(request: &str) {
    let line = format!("127.0.0.1 - james [09/05/2018:16:00:39 +0000] \"{request}\" 200 123");
    assert!(matches!(parse_line(&line), Err(ClfParseError::Request(_))));
}

#[test]
fn rejects_a_bad_datetime() {
    let line = "127.0.0.1 - james [yesterday] \"GET /report HTTP/1.0\" 200 123";
    assert_eq!(
        parse_line(line),
        Err(ClfParseError::Datetime("yesterday".to_string()))
    );
}

#[test]
fn rejects_non_numeric_status_and_bytes() {
    let bad_status = "127.0.0.1 - - [09/05/2018:16:00:39 +0000] \"GET /report HTTP/1.0\" OK 123";
    assert!(matches!(parse_line(bad_status), Err(ClfParseError::Status(_))));

    let bad_bytes = "127.0.0.1 - - [09/05/2018:16:00:39 +0000] \"GET /report HTTP/1.0\" 200 lots";
    assert!(matches!(parse_line(bad_bytes), Err(ClfParseError::Bytes(_))));
}

#[test]
fn trailing_garbage_is_rejected() {
    let line = "127.0.0.1 - - [09/05/2018:16:00:39 +0000] \"GET /report HTTP/1.0\" 200 123 extra";
    assert!(matches!(parse_line(line), Err(ClfParseError::Bytes(_))));
}

#[test]
fn line_parser_adapter_never_throttles() {
    use pulse_core::LineParser as _;

    let mut parser = ClfLineParser;
    assert_eq!(parser.parse_line(LINE).unwrap().unwrap().status, 200);
    assert!(parser.parse_line("not a log line").is_err());
}
