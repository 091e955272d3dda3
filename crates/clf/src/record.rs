// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Common Log Format record.
//!
//! A line is `host ident authuser [date] "request" status bytes`, with `-`
//! standing in for missing data:
//!
//! ```text
//! 127.0.0.1 - james [09/05/2018:16:00:39 +0000] "GET /report HTTP/1.0" 200 123
//! ```

use pulse_core::{timestamp, Timestamped};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Head,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// PUT, POST and PATCH carry request bodies; their bytes count as
    /// traffic received from the client
    pub fn is_upload(&self) -> bool {
        matches!(self, HttpMethod::Put | HttpMethod::Post | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown HTTP method token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// One parsed Common Log Format line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clf {
    /// IP address or host name of the client that made the request
    pub host: String,
    /// RFC 1413 identity of the client, usually `-`
    pub ident: String,
    /// Userid requesting the resource, usually `-`
    pub auth_user: String,
    /// UTC Epoch millisecond when the request was received
    pub timestamp: i64,
    pub method: HttpMethod,
    pub resource: String,
    /// HTTP version, e.g. `1.1`
    pub version: String,
    /// HTTP status returned to the client
    pub status: u16,
    /// Size of the object returned to the client
    pub bytes: u64,
}

impl Clf {
    pub fn builder() -> ClfBuilder {
        ClfBuilder::default()
    }

    /// Text before the second `/` of the resource,
    /// e.g. `/pages/create` -> `/pages`. None for single-segment resources.
    pub fn section(&self) -> Option<&str> {
        let first = self.resource.find('/')?;
        let second = self.resource[first + 1..].find('/')? + first + 1;
        Some(&self.resource[first..second])
    }
}

impl Timestamped for Clf {
    fn timestamp_millis(&self) -> i64 {
        self.timestamp
    }
}

impl fmt::Display for Clf {
    /// Canonical CLF rendering; feeding the result back through the parser
    /// yields an equal record
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} [{}] \"{} {} HTTP/{}\" {} {}",
            self.host,
            self.ident,
            self.auth_user,
            timestamp::format(self.timestamp),
            self.method,
            self.resource,
            self.version,
            self.status,
            self.bytes
        )
    }
}

/// Builder for [`Clf`] records; missing text fields default to `-`
#[derive(Debug, Clone)]
pub struct ClfBuilder {
    record: Clf,
}

impl Default for ClfBuilder {
    fn default() -> Self {
        Self {
            record: Clf {
                host: "-".to_string(),
                ident: "-".to_string(),
                auth_user: "-".to_string(),
                timestamp: 0,
                method: HttpMethod::Get,
                resource: "-".to_string(),
                version: "-".to_string(),
                status: 0,
                bytes: 0,
            },
        }
    }
}

impl ClfBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.record.host = host.into();
        self
    }

    pub fn ident(mut self, ident: impl Into<String>) -> Self {
        self.record.ident = ident.into();
        self
    }

    pub fn auth_user(mut self, auth_user: impl Into<String>) -> Self {
        self.record.auth_user = auth_user.into();
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.record.timestamp = timestamp;
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.record.method = method;
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.record.resource = resource.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.record.version = version.into();
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.record.status = status;
        self
    }

    pub fn bytes(mut self, bytes: u64) -> Self {
        self.record.bytes = bytes;
        self
    }

    pub fn build(self) -> Clf {
        self.record
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
