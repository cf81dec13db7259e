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
use blobtour_core::{Context, Error, Result};
use http::Uri;
use std::net::IpAddr;

use crate::constants::*;
use crate::Location;

/// Config carries the endpoint settings of a blob service client.
///
/// Every field left as `None` falls back to the environment (see [`Config::from_env`]) and
/// then to the public Azure cloud defaults.
#[derive(Clone, Default, Debug)]
pub struct Config {
    /// `account_name` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZURE_STORAGE_ACCOUNT`], then [`AZURE_STORAGE_ACCOUNT_NAME`]
    pub account_name: Option<String>,
    /// `endpoint` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZURE_STORAGE_ENDPOINT`]
    /// - `https://<account_name>.blob.core.windows.net`
    pub endpoint: Option<String>,
    /// `secondary_endpoint` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZURE_STORAGE_SECONDARY_ENDPOINT`]
    /// - the primary endpoint with `-secondary` appended to its first host label
    pub secondary_endpoint: Option<String>,
    /// `read_location` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZURE_STORAGE_READ_LOCATION`]
    /// - [`Location::Primary`]
    pub read_location: Option<Location>,
}

/// Validated endpoints of a storage account, without trailing `/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    /// Read-write endpoint.
    pub primary: String,
    /// Read-only replica, if the account has one.
    pub secondary: Option<String>,
}

impl Config {
    /// Set the account name.
    pub fn with_account_name(mut self, account_name: &str) -> Self {
        self.account_name = Some(account_name.to_string());
        self
    }

    /// Set the primary endpoint.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    /// Set the secondary endpoint.
    pub fn with_secondary_endpoint(mut self, endpoint: &str) -> Self {
        self.secondary_endpoint = Some(endpoint.to_string());
        self
    }

    /// Set which endpoint serves reads.
    pub fn with_read_location(mut self, location: Location) -> Self {
        self.read_location = Some(location);
        self
    }

    /// Fill unset fields from the environment.
    pub fn from_env(mut self, ctx: &Context) -> Result<Self> {
        if self.account_name.is_none() {
            self.account_name = ctx.env_var_any(&[AZURE_STORAGE_ACCOUNT, AZURE_STORAGE_ACCOUNT_NAME]);
        }
        if self.endpoint.is_none() {
            self.endpoint = ctx.env_var_any(&[AZURE_STORAGE_ENDPOINT]);
        }
        if self.secondary_endpoint.is_none() {
            self.secondary_endpoint = ctx.env_var_any(&[AZURE_STORAGE_SECONDARY_ENDPOINT]);
        }
        if self.read_location.is_none() {
            if let Some(v) = ctx.env_var_any(&[AZURE_STORAGE_READ_LOCATION]) {
                self.read_location = Some(v.parse()?);
            }
        }

        Ok(self)
    }

    /// The configured read location, [`Location::Primary`] by default.
    pub fn read_location(&self) -> Location {
        self.read_location.unwrap_or_default()
    }

    /// Resolve and validate the primary and secondary endpoints.
    pub fn endpoints(&self) -> Result<Endpoints> {
        let primary = match (&self.endpoint, &self.account_name) {
            (Some(endpoint), _) => endpoint.trim_end_matches('/').to_string(),
            (None, Some(account_name)) if !account_name.is_empty() => {
                format!("https://{account_name}.blob.core.windows.net")
            }
            _ => {
                return Err(Error::config_invalid(format!(
                    "either an endpoint or an account name is required, set {AZURE_STORAGE_ENDPOINT} or {AZURE_STORAGE_ACCOUNT}"
                )))
            }
        };
        let primary_uri = validate_endpoint(&primary)?;

        let secondary = match &self.secondary_endpoint {
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/').to_string();
                validate_endpoint(&endpoint)?;
                Some(endpoint)
            }
            None => secondary_of(&primary_uri),
        };

        if self.read_location() == Location::Secondary && secondary.is_none() {
            return Err(Error::config_invalid(format!(
                "reads are routed to the secondary endpoint but {primary} has none, set {AZURE_STORAGE_SECONDARY_ENDPOINT}"
            )));
        }

        Ok(Endpoints { primary, secondary })
    }
}

fn validate_endpoint(endpoint: &str) -> Result<Uri> {
    let uri: Uri = endpoint.parse().map_err(|e| {
        Error::config_invalid(format!("endpoint {endpoint:?} is not a valid uri")).with_source(e)
    })?;

    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        _ => {
            return Err(Error::config_invalid(format!(
                "endpoint {endpoint:?} must start with http:// or https://"
            )))
        }
    }
    if uri.authority().is_none() {
        return Err(Error::config_invalid(format!(
            "endpoint {endpoint:?} has no host"
        )));
    }

    Ok(uri)
}

/// Derive the read-only replica: `acct.blob.core.windows.net` becomes
/// `acct-secondary.blob.core.windows.net`.
///
/// IP hosts and single label hosts (emulators, proxies) have no secondary.
fn secondary_of(primary: &Uri) -> Option<String> {
    let host = primary.host()?;
    if host.parse::<IpAddr>().is_ok() || host.starts_with('[') {
        return None;
    }
    let (account, rest) = host.split_once('.')?;

    let mut secondary = format!(
        "{}://{account}{SECONDARY_HOST_MARKER}.{rest}",
        primary.scheme_str().unwrap_or("https")
    );
    if let Some(port) = primary.port_u16() {
        secondary.push_str(&format!(":{port}"));
    }
    secondary.push_str(primary.path().trim_end_matches('/'));

    Some(secondary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobtour_core::{ErrorKind, StaticEnv};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_default_endpoints() {
        let endpoints = Config::default()
            .with_account_name("myaccount")
            .endpoints()
            .unwrap();

        assert_eq!(
            endpoints,
            Endpoints {
                primary: "https://myaccount.blob.core.windows.net".to_string(),
                secondary: Some("https://myaccount-secondary.blob.core.windows.net".to_string()),
            }
        );
    }

    #[test_case("http://127.0.0.1:10000/devstoreaccount1", None; "ip host")]
    #[test_case("http://localhost:10000", None; "single label")]
    #[test_case(
        "https://myaccount.blob.core.chinacloudapi.cn/",
        Some("https://myaccount-secondary.blob.core.chinacloudapi.cn");
        "sovereign cloud"
    )]
    #[test_case(
        "http://myaccount.storage.test:8080/base",
        Some("http://myaccount-secondary.storage.test:8080/base");
        "port and path"
    )]
    fn test_derived_secondary(endpoint: &str, expected: Option<&str>) {
        let endpoints = Config::default().with_endpoint(endpoint).endpoints().unwrap();
        assert_eq!(endpoints.secondary.as_deref(), expected);
    }

    #[test_case("myaccount.blob.core.windows.net"; "no scheme")]
    #[test_case("ftp://myaccount.blob.core.windows.net"; "wrong scheme")]
    #[test_case("https://"; "no host")]
    fn test_invalid_endpoint(endpoint: &str) {
        let err = Config::default().with_endpoint(endpoint).endpoints().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_missing_account() {
        let err = Config::default().endpoints().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_secondary_read_requires_secondary() {
        let err = Config::default()
            .with_endpoint("http://127.0.0.1:10000/devstoreaccount1")
            .with_read_location(Location::Secondary)
            .endpoints()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_from_env() {
        let ctx = Context::new().with_env(StaticEnv::from_iter([
            (AZURE_STORAGE_ACCOUNT_NAME, "envaccount"),
            (AZURE_STORAGE_SECONDARY_ENDPOINT, "https://replica.example.com/"),
            (AZURE_STORAGE_READ_LOCATION, "secondary"),
        ]));

        let cfg = Config::default().from_env(&ctx).unwrap();
        assert_eq!(cfg.account_name.as_deref(), Some("envaccount"));
        assert_eq!(cfg.read_location(), Location::Secondary);

        let endpoints = cfg.endpoints().unwrap();
        assert_eq!(endpoints.primary, "https://envaccount.blob.core.windows.net");
        assert_eq!(
            endpoints.secondary.as_deref(),
            Some("https://replica.example.com")
        );
    }

    #[test]
    fn test_from_env_keeps_explicit_fields() {
        let ctx = Context::new().with_env(StaticEnv::from_iter([
            (AZURE_STORAGE_ACCOUNT, "envaccount"),
            (AZURE_STORAGE_READ_LOCATION, "secondary"),
        ]));

        let cfg = Config::default()
            .with_account_name("explicit")
            .with_read_location(Location::Primary)
            .from_env(&ctx)
            .unwrap();
        assert_eq!(cfg.account_name.as_deref(), Some("explicit"));
        assert_eq!(cfg.read_location(), Location::Primary);
    }

    #[test]
    fn test_from_env_invalid_read_location() {
        let ctx = Context::new().with_env(StaticEnv::from_iter([(
            AZURE_STORAGE_READ_LOCATION,
            "nearest",
        )]));

        let err = Config::default().from_env(&ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }
}
