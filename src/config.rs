//! Per-location policy: the settings a host's `dlg_auth*` directives
//! configure, merged down the location-block inheritance chain the way
//! `ngx_http_dlg_auth_create_loc_conf` / `..._merge_loc_conf` do.

use crate::seal::Password;

/// One location's configured policy. Built via [`LocationConfigBuilder`];
/// `merge` folds a child block's unset directives in from its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationConfig {
    /// `dlg_auth <realm>`. An empty realm, or the literal `"off"`, means
    /// the filter is disabled for this location (spec.md §6).
    pub realm: String,
    pub password: Option<Password>,
    pub allowed_clock_skew: i64,
    /// `dlg_auth_host`; `None` means derive from the request's own
    /// `Host`/authority, the default spec.md §9 describes.
    pub host_override: Option<String>,
    /// `dlg_auth_port`; validated digits-only at build time.
    pub port_override: Option<u16>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        LocationConfig {
            realm: String::new(),
            password: None,
            allowed_clock_skew: 1,
            host_override: None,
            port_override: None,
        }
    }
}

impl LocationConfig {
    /// `true` when this location has no enforced realm: either unset, or
    /// explicitly turned `"off"`.
    pub fn is_disabled(&self) -> bool {
        self.realm.is_empty() || self.realm == "off"
    }
}

/// Errors raised while building or merging a [`LocationConfig`], all
/// surfaced at configuration-load time rather than per-request (spec.md §8:
/// "`dlg_auth_port` configured non-digits at load time: startup fails").
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("dlg_auth_port must be all digits, got {0:?}")]
    PortNotDigits(String),
    #[error("dlg_auth_port out of range: {0}")]
    PortOutOfRange(u64),
    #[error("dlg_auth_iron_pwd given as both a single password and a table")]
    ConflictingPasswordForms,
    #[error("dlg_auth_iron_pwd table has more than {0} entries")]
    TooManyPasswordEntries(usize),
    #[error("a realm is configured but no dlg_auth_iron_pwd was given")]
    RealmWithoutPassword,
}

/// Accumulates directive values for one location block before `merge`
/// folds in inheritance and validates the result.
#[derive(Debug, Clone, Default)]
pub struct LocationConfigBuilder {
    realm: Option<String>,
    single_password: Option<String>,
    password_table: Vec<(String, String)>,
    allowed_clock_skew: Option<i64>,
    host_override: Option<String>,
    port_override_raw: Option<String>,
}

impl LocationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    pub fn single_password(mut self, pwd: impl Into<String>) -> Self {
        self.single_password = Some(pwd.into());
        self
    }

    pub fn password_table_entry(mut self, id: impl Into<String>, pwd: impl Into<String>) -> Self {
        self.password_table.push((id.into(), pwd.into()));
        self
    }

    pub fn allowed_clock_skew(mut self, seconds: i64) -> Self {
        self.allowed_clock_skew = Some(seconds);
        self
    }

    pub fn host_override(mut self, host: impl Into<String>) -> Self {
        self.host_override = Some(host.into());
        self
    }

    /// Accepts the raw directive text; digits-only validation happens in
    /// [`merge`](Self::merge), matching `is_digits_only` being checked at
    /// merge time in the original, not at parse time.
    pub fn port_override(mut self, port: impl Into<String>) -> Self {
        self.port_override_raw = Some(port.into());
        self
    }

    /// Fold this block's directives over `parent`'s already-merged config:
    /// an unset directive inherits the parent's value, exactly as
    /// `ngx_http_dlg_auth_merge_loc_conf` walks each field.
    pub fn merge(self, parent: &LocationConfig) -> Result<LocationConfig, ConfigError> {
        let realm = self.realm.unwrap_or_else(|| parent.realm.clone());

        let password = match (self.single_password, self.password_table.is_empty()) {
            (Some(_), false) => return Err(ConfigError::ConflictingPasswordForms),
            (Some(pwd), true) => Some(Password::Single(pwd)),
            (None, false) => {
                if self.password_table.len() > crate::MAX_PWD_TAB_ENTRIES {
                    return Err(ConfigError::TooManyPasswordEntries(
                        crate::MAX_PWD_TAB_ENTRIES,
                    ));
                }
                Some(Password::Table(self.password_table))
            }
            (None, true) => parent.password.clone(),
        };

        let allowed_clock_skew = self.allowed_clock_skew.unwrap_or(parent.allowed_clock_skew);
        let host_override = self.host_override.or_else(|| parent.host_override.clone());

        let port_override = match self.port_override_raw {
            Some(raw) => Some(parse_port(&raw)?),
            None => parent.port_override,
        };

        if !realm.is_empty() && realm != "off" && password.is_none() {
            return Err(ConfigError::RealmWithoutPassword);
        }

        Ok(LocationConfig {
            realm,
            password,
            allowed_clock_skew,
            host_override,
            port_override,
        })
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::PortNotDigits(raw.to_string()));
    }
    let value: u64 = raw.parse().map_err(|_| ConfigError::PortNotDigits(raw.to_string()))?;
    u16::try_from(value).map_err(|_| ConfigError::PortOutOfRange(value))
}
