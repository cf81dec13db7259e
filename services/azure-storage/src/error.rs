// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
use std::fmt::{Debug, Formatter};

use blobtour_core::{Error, ErrorKind};
use bytes::{Buf, Bytes};
use http::{Response, StatusCode};
use quick_xml::de;
use serde::Deserialize;

use crate::constants::X_MS_ERROR_CODE;

/// Error body returned by the blob service.
#[derive(Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct BlobServiceError {
    code: String,
    message: String,
}

impl Debug for BlobServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut de = f.debug_struct("BlobServiceError");
        de.field("code", &self.code);
        // replace `\n` to ` ` for better reading.
        de.field("message", &self.message.replace('\n', " "));
        de.finish()
    }
}

/// Strip the UTF-8 byte order mark the service puts in front of XML bodies.
pub(crate) fn strip_bom(bs: &[u8]) -> &[u8] {
    bs.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bs)
}

/// Parse a non-success response into an [`Error`].
pub(crate) fn parse_error(resp: Response<Bytes>) -> Error {
    let (parts, body) = resp.into_parts();

    let mut service_err =
        de::from_reader::<_, BlobServiceError>(strip_bom(&body).reader()).unwrap_or_default();
    if service_err.code.is_empty() {
        if let Some(code) = parts
            .headers
            .get(X_MS_ERROR_CODE)
            .and_then(|v| v.to_str().ok())
        {
            service_err.code = code.to_string();
        }
    }

    let kind = match parts.status {
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        StatusCode::FORBIDDEN => ErrorKind::PermissionDenied,
        StatusCode::CONFLICT if service_err.code.ends_with("AlreadyExists") => {
            ErrorKind::AlreadyExists
        }
        _ => ErrorKind::Unexpected,
    };

    let message = if service_err.code.is_empty() && service_err.message.is_empty() {
        format!(
            "blob service responded {}: {}",
            parts.status,
            String::from_utf8_lossy(&body).trim()
        )
    } else {
        format!("blob service responded {}: {service_err:?}", parts.status)
    };

    Error::new(kind, message.trim_end_matches(": ").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn response(status: StatusCode, body: &str) -> Response<Bytes> {
        Response::builder()
            .status(status)
            .body(Bytes::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_parse_error_body() {
        let err = parse_error(response(
            StatusCode::NOT_FOUND,
            "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Error>\n  <Code>BlobNotFound</Code>\n  <Message>The specified blob does not exist.\nRequestId:8f3b\nTime:2022-03-01T08:12:34Z</Message>\n</Error>",
        ));

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            r#"blob service responded 404 Not Found: BlobServiceError { code: "BlobNotFound", message: "The specified blob does not exist. RequestId:8f3b Time:2022-03-01T08:12:34Z" }"#
        );
    }

    #[test]
    fn test_parse_error_header_only() {
        let resp = Response::builder()
            .status(StatusCode::CONFLICT)
            .header(X_MS_ERROR_CODE, "ContainerAlreadyExists")
            .body(Bytes::new())
            .unwrap();

        let err = parse_error(resp);
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert!(err.to_string().contains("ContainerAlreadyExists"));
    }

    #[test]
    fn test_parse_error_conflict_other_code() {
        let err = parse_error(response(
            StatusCode::CONFLICT,
            "<Error><Code>ContainerBeingDeleted</Code><Message>busy</Message></Error>",
        ));
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }

    #[test]
    fn test_parse_error_conflict_without_code() {
        let err = parse_error(response(StatusCode::CONFLICT, ""));
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(err.to_string(), "blob service responded 409 Conflict");
    }

    #[test]
    fn test_parse_error_forbidden_plain_text() {
        let err = parse_error(response(StatusCode::FORBIDDEN, "denied"));
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(err.to_string(), "blob service responded 403 Forbidden: denied");
    }

    #[test]
    fn test_parse_error_empty() {
        let err = parse_error(response(StatusCode::INTERNAL_SERVER_ERROR, ""));
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(
            err.to_string(),
            "blob service responded 500 Internal Server Error"
        );
    }
}
