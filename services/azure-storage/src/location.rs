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
use std::fmt;
use std::str::FromStr;

use blobtour_core::Error;

use crate::constants::SECONDARY_HOST_MARKER;

/// Which replica of a read-access geo-redundant account served (or should serve) a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Location {
    /// The read-write primary endpoint.
    #[default]
    Primary,
    /// The read-only secondary endpoint.
    Secondary,
}

impl Location {
    /// Classify the host that served a request.
    ///
    /// Secondary hosts are recognised by the `-secondary` marker in their name.
    pub fn from_host(host: &str) -> Self {
        if host.contains(SECONDARY_HOST_MARKER) {
            Location::Secondary
        } else {
            Location::Primary
        }
    }
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Location::Primary),
            "secondary" => Ok(Location::Secondary),
            v => Err(Error::config_invalid(format!(
                "read location must be primary or secondary, got {v:?}"
            ))),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Primary => f.write_str("primary"),
            Location::Secondary => f.write_str("secondary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobtour_core::ErrorKind;
    use test_case::test_case;

    #[test_case("myaccount.blob.core.windows.net", Location::Primary; "primary host")]
    #[test_case("myaccount-secondary.blob.core.windows.net", Location::Secondary; "secondary host")]
    #[test_case("127.0.0.1", Location::Primary; "ip host")]
    #[test_case("", Location::Primary; "empty host")]
    fn test_from_host(host: &str, expected: Location) {
        assert_eq!(Location::from_host(host), expected);
    }

    #[test_case("primary", Location::Primary)]
    #[test_case("Secondary", Location::Secondary)]
    #[test_case(" SECONDARY ", Location::Secondary)]
    fn test_from_str(input: &str, expected: Location) {
        assert_eq!(input.parse::<Location>().unwrap(), expected);
    }

    #[test]
    fn test_from_str_invalid() {
        let err = "tertiary".parse::<Location>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_display() {
        assert_eq!(Location::Secondary.to_string(), "secondary");
        assert_eq!(Location::default().to_string(), "primary");
    }
}
