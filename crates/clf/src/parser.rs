// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Common Log Format line parsing.
//!
//! Fields are walked left to right: three space-separated tokens, a
//! bracketed datetime, a quoted request line, then status and bytes.
//! Errors name the field that failed so malformed lines can be logged
//! with context and skipped.

use crate::record::{Clf, HttpMethod};
use pulse_core::{timestamp, LineParser, ParseLineError};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Error parsing a CLF line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClfParseError {
    #[error("truncated line, missing {0}")]
    Missing(&'static str),
    #[error("unterminated {field}: {text}")]
    Unterminated { field: &'static str, text: String },
    #[error("incorrect datetime format: {0}")]
    Datetime(String),
    #[error("incorrect request format: {0}")]
    Request(String),
    #[error("incorrect status format: {0}")]
    Status(String),
    #[error("incorrect bytes format: {0}")]
    Bytes(String),
}

fn request_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let methods = HttpMethod::ALL.map(|m| m.as_str()).join("|");
        Regex::new(&format!(r"^({methods}) (\S+) HTTP/(\d\.\d)$"))
            .expect("request pattern compiles")
    })
}

/// Parse one CLF log line
pub fn parse_line(line: &str) -> Result<Clf, ClfParseError> {
    let mut fields = Fields { rest: line };
    let host = fields.plain("host")?;
    let ident = fields.plain("ident")?;
    let auth_user = fields.plain("authuser")?;
    let datetime = fields.delimited("datetime", '[', ']')?;
    let request = fields.delimited("request", '"', '"')?;
    let status = fields.plain("status")?;
    let bytes = fields.remainder("bytes")?;

    let ts = timestamp::parse(datetime)
        .map_err(|_| ClfParseError::Datetime(datetime.to_string()))?;
    let captures = request_pattern()
        .captures(request)
        .ok_or_else(|| ClfParseError::Request(request.to_string()))?;
    let method: HttpMethod = captures[1]
        .parse()
        .map_err(|_| ClfParseError::Request(request.to_string()))?;
    let status: u16 = status
        .parse()
        .map_err(|_| ClfParseError::Status(status.to_string()))?;
    let bytes: u64 = bytes
        .parse()
        .map_err(|_| ClfParseError::Bytes(bytes.to_string()))?;

    Ok(Clf {
        host: host.to_string(),
        ident: ident.to_string(),
        auth_user: auth_user.to_string(),
        timestamp: ts,
        method,
        resource: captures[2].to_string(),
        version: captures[3].to_string(),
        status,
        bytes,
    })
}

/// Cursor over the unconsumed remainder of a line
struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    /// Next space-delimited token
    fn plain(&mut self, field: &'static str) -> Result<&'a str, ClfParseError> {
        if self.rest.is_empty() {
            return Err(ClfParseError::Missing(field));
        }
        match self.rest.split_once(' ') {
            Some((token, rest)) => {
                self.rest = rest;
                Ok(token)
            }
            None => {
                let token = self.rest;
                self.rest = "";
                Ok(token)
            }
        }
    }

    /// Everything left on the line; the line must end with this field
    fn remainder(&mut self, field: &'static str) -> Result<&'a str, ClfParseError> {
        if self.rest.is_empty() {
            return Err(ClfParseError::Missing(field));
        }
        let token = self.rest;
        self.rest = "";
        Ok(token)
    }

    /// Next token wrapped in `open`..`close`, e.g. `[datetime]`
    fn delimited(
        &mut self,
        field: &'static str,
        open: char,
        close: char,
    ) -> Result<&'a str, ClfParseError> {
        let after_open = self
            .rest
            .strip_prefix(open)
            .ok_or(ClfParseError::Missing(field))?;
        let (token, rest) = after_open
            .split_once(close)
            .ok_or_else(|| ClfParseError::Unterminated {
                field,
                text: self.rest.to_string(),
            })?;
        self.rest = rest.strip_prefix(' ').unwrap_or(rest);
        Ok(token)
    }
}

/// Adapts the CLF parser to the tailer's line contract.
///
/// CLF parsing never throttles; failures surface as skippable parse
/// errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClfLineParser;

impl LineParser for ClfLineParser {
    type Event = Clf;

    fn parse_line(&mut self, line: &str) -> Result<Option<Clf>, ParseLineError> {
        parse_line(line)
            .map(Some)
            .map_err(|e| ParseLineError(e.to_string()))
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
