//! The request handler: orchestrates the seal/ticket/hawk primitives into
//! the access-phase decision for one request (spec.md §4.1, §4.2).
//!
//! Step order is a direct port of `ngx_dlg_auth_handler` /
//! `ngx_dlg_auth_authenticate`: disabled-location short circuit, missing
//! Authorization, header parse, size pre-check, unseal, ticket parse, MAC
//! verify, clock skew, expiry, unsafe-method/read-write, scope. Each step
//! fails closed into a [`DenyReason`] carrying exactly the context the
//! original's corresponding `ngx_dlg_auth_send_*` call had available.

use http::{HeaderMap, HeaderValue, Method, StatusCode};

use crate::config::LocationConfig;
use crate::hawk::{self, challenge, AuthHeader, HawkAlgorithm, HawkError};
use crate::seal::{self, SealError};
use crate::ticket::{Ticket, TicketError};
use crate::time::epoch_i64;

const AUTHORIZATION: &str = "authorization";
const RENAMED_AUTHORIZATION: &str = "x-thorization";

/// Methods the original module treats as safe regardless of the ticket's
/// `rw` grant (`IS_UNSAFE_METHOD` is, confusingly, named for the opposite:
/// it flags methods that are *not* safe and therefore require `rw`).
const SAFE_METHODS: &[&str] = &["GET", "HEAD", "OPTIONS", "PROPFIND"];

/// The read-only view of an inbound request the handler needs: nothing
/// here is owned, since the host server's request type outlives the call.
pub struct RequestView<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub headers: &'a HeaderMap,
    /// Whether the connection arrived over TLS, used only to pick the
    /// scheme-default port (443 vs. 80) when neither `config` nor the
    /// `Host` header supplies one.
    pub tls: bool,
}

/// Per-request values the handler stores back into the host's request
/// context as they become available, so a host adapter can surface them as
/// request variables even when the request is ultimately denied. Field
/// order matches [`NAMES`]. `client`/`expires` are filled in once the ticket
/// is parsed (before MAC verification); `clockskew` is filled in once the
/// clock-skew check runs. A `None` field was never reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishedContext {
    pub client: Option<String>,
    pub expires: Option<u64>,
    pub clockskew: Option<i64>,
}

/// Host-facing variable names for [`PublishedContext`]'s fields, in the
/// same order, so an adapter can zip them without this crate knowing
/// anything about the host's templating conventions.
pub const NAMES: [&str; 3] = ["dlg_auth_client", "dlg_auth_expires", "dlg_auth_clockskew"];

/// The handler's decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// The location has no realm configured (or `realm = "off"`): this
    /// module does not apply, the host should continue its own dispatch
    /// (`NGX_DECLINED`).
    Disabled,
    Allow,
    Deny(DenyReason),
}

/// The error taxonomy from spec.md §7, one variant per distinguishable
/// rejection. `fresh_ts`/`tsm` on [`DenyReason::ClockSkew`] are the server's
/// current time and the MAC over it under the ticket's own key (spec.md
/// §4.3 "Challenge", "With server time"), computed once at the point of
/// rejection since only `access_phase` still has the ticket's key and
/// algorithm in scope by then.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DenyReason {
    #[error("missing Authorization header")]
    MissingAuthorization,
    #[error("Authorization header is not a Hawk challenge")]
    BadScheme,
    #[error("Authorization header parse error: {0}")]
    HeaderParseError(HawkError),
    #[error("ticket exceeds the configured size ceiling")]
    TicketTooLarge,
    #[error("ticket could not be unsealed: {0}")]
    UnsealFailed(SealError),
    #[error("ticket JSON is invalid: {0}")]
    TicketParseFailed(TicketError),
    #[error("Hawk MAC verification failed")]
    MacInvalid,
    #[error("request timestamp is outside the allowed clock skew")]
    ClockSkew { fresh_ts: i64, tsm: String },
    #[error("ticket does not grant read-write access required for this method")]
    UnsafeMethodReadOnly,
    #[error("ticket has expired")]
    Expired,
    #[error("ticket does not grant the requested realm")]
    ScopeNotGranted,
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl DenyReason {
    pub fn status(&self) -> StatusCode {
        match self {
            DenyReason::MissingAuthorization
            | DenyReason::BadScheme
            | DenyReason::MacInvalid
            | DenyReason::ClockSkew { .. }
            | DenyReason::Expired
            | DenyReason::ScopeNotGranted => StatusCode::UNAUTHORIZED,
            DenyReason::HeaderParseError(_)
            | DenyReason::TicketTooLarge
            | DenyReason::UnsealFailed(_)
            | DenyReason::TicketParseFailed(_) => StatusCode::BAD_REQUEST,
            DenyReason::UnsafeMethodReadOnly => StatusCode::FORBIDDEN,
            DenyReason::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `WWW-Authenticate` challenge to send with this rejection, if
    /// any (a 400/403/500 carries no challenge: the client didn't fail
    /// authentication, its request was simply invalid or we broke).
    pub fn challenge(&self, realm: &str) -> Option<String> {
        match self {
            DenyReason::MissingAuthorization
            | DenyReason::BadScheme
            | DenyReason::MacInvalid
            | DenyReason::Expired
            | DenyReason::ScopeNotGranted => Some(challenge::simple(realm)),
            DenyReason::ClockSkew { fresh_ts, tsm } => {
                Some(challenge::timed(realm, *fresh_ts, tsm))
            }
            _ => None,
        }
    }

    /// A host adapter's convenience conversion to a status+message error,
    /// the same `HttpError` shape `proxmox-rest-server` uses at its own
    /// request boundary.
    pub fn to_http_error(&self) -> proxmox_http_error::HttpError {
        proxmox_http_error::HttpError::new(self.status(), self.to_string())
    }

    fn log(&self, request: &RequestView) {
        log::warn!(
            "dlg-auth denied {} {}: {:?}",
            request.method,
            request.path,
            self
        );
    }
}

/// Run the access-phase decision for one request against `config`, storing
/// whatever per-request values become known along the way into `published`
/// regardless of the final outcome.
pub fn access_phase(
    config: &LocationConfig,
    request: &RequestView,
    published: &mut PublishedContext,
) -> FilterOutcome {
    if config.is_disabled() {
        return FilterOutcome::Disabled;
    }

    let deny = |reason: DenyReason| {
        reason.log(request);
        FilterOutcome::Deny(reason)
    };

    let raw_auth = match request.headers.get(AUTHORIZATION) {
        Some(v) => v,
        None => return deny(DenyReason::MissingAuthorization),
    };
    let raw_auth = match raw_auth.to_str() {
        Ok(s) => s,
        Err(_) => return deny(DenyReason::HeaderParseError(HawkError::Malformed)),
    };

    let header: AuthHeader = match hawk::parse_authorization(raw_auth) {
        Ok(h) => h,
        Err(HawkError::NotHawkScheme) => return deny(DenyReason::BadScheme),
        Err(e) => return deny(DenyReason::HeaderParseError(e)),
    };

    let (host, port) = determine_host_and_port(config, request);

    let work_area = seal::required_work_area_len(header.id.len());
    let output = seal::required_output_len(header.id.len());
    if work_area > crate::ENCRYPTION_WORK_AREA_CEILING || output > crate::UNSEAL_OUTPUT_CEILING {
        return deny(DenyReason::TicketTooLarge);
    }

    let password = match &config.password {
        Some(p) => p,
        None => return deny(DenyReason::Internal("realm configured without a password")),
    };

    let ticket_json = match seal::unseal(password, &header.id) {
        Ok(bytes) => bytes,
        Err(e) => return deny(DenyReason::UnsealFailed(e)),
    };

    let ticket = match Ticket::parse(&ticket_json) {
        Ok(t) => t,
        Err(e) => return deny(DenyReason::TicketParseFailed(e)),
    };

    published.client = Some(ticket.client.clone());
    published.expires = Some(ticket.exp);

    let canonical = hawk::canonical_request(
        header.ts,
        &header.nonce,
        request.method.as_str(),
        request.path,
        &host,
        port,
        header.hash.as_deref().unwrap_or(""),
        header.ext.as_deref().unwrap_or(""),
    );
    if hawk::verify_mac(
        ticket.hawk_algorithm,
        ticket.pwd.as_bytes(),
        &canonical,
        &header.mac,
    )
    .is_err()
    {
        return deny(DenyReason::MacInvalid);
    }

    // Nonce replay is intentionally not checked here; see DESIGN.md.

    let now = epoch_i64();
    let skew = now - header.ts;
    published.clockskew = Some(skew);
    if skew.unsigned_abs() > config.allowed_clock_skew as u64 {
        let ts_canonical = format!("hawk.1.ts\n{now}\n");
        let tsm = match hawk::compute_mac(ticket.hawk_algorithm, ticket.pwd.as_bytes(), &ts_canonical)
        {
            Ok(tsm) => tsm,
            Err(_) => return deny(DenyReason::Internal("failed to compute ts MAC")),
        };
        let reason = DenyReason::ClockSkew { fresh_ts: now, tsm };
        reason.log(request);
        return FilterOutcome::Deny(reason);
    }

    if ticket.exp < now as u64 {
        return deny(DenyReason::Expired);
    }

    if !is_safe_method(request.method) && !ticket.rw {
        return deny(DenyReason::UnsafeMethodReadOnly);
    }

    if !ticket.has_scope(&config.realm) {
        return deny(DenyReason::ScopeNotGranted);
    }

    log::debug!(
        "dlg-auth allowed {} {} for client {:?}",
        request.method,
        request.path,
        ticket.client
    );

    FilterOutcome::Allow
}

fn is_safe_method(method: &Method) -> bool {
    SAFE_METHODS.contains(&method.as_str())
}

/// Determine the `host`/`port` pair the Hawk canonical form is computed
/// over: an explicit `dlg_auth_host`/`dlg_auth_port` override wins
/// individually, else fall back to the request's own `Host` header, else
/// the connection scheme's default port. This is the *corrected* intent of
/// `get_host_and_port` in the original (spec.md §9): the source assigned
/// the wrong struct field and guarded its fallback with the wrong
/// comparison, so a configured port could silently leak into the host
/// string or a present header could be skipped. Neither mistake is
/// reproduced here.
fn determine_host_and_port(config: &LocationConfig, request: &RequestView) -> (String, u16) {
    let (header_host, header_port) = request
        .headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(split_host_port)
        .unwrap_or((None, None));

    let host = config
        .host_override
        .clone()
        .or(header_host)
        .unwrap_or_default();
    let scheme_default_port = if request.tls { 443 } else { 80 };
    let port = config
        .port_override
        .or(header_port)
        .unwrap_or(scheme_default_port);

    (host, port)
}

/// Split a `Host` header at its first `:`, host on the left, port on the
/// right, matching spec.md §4.2 step 1's literal requirement (a `Host`
/// header with more than one colon, e.g. an IPv6 literal, is not a case
/// this filter needs to special-case beyond that).
fn split_host_port(host_header: &str) -> (Option<String>, Option<u16>) {
    match host_header.split_once(':') {
        Some((h, p)) => (Some(h.to_string()), p.parse().ok()),
        None => (Some(host_header.to_string()), None),
    }
}

/// Remove the `Authorization` header and reinsert its value under
/// `X-Thorization` before the request is proxied upstream, so the
/// ticket/MAC never reaches the origin server under its original name.
pub fn rename_authorization_header(headers: &mut HeaderMap) {
    if let Some(value) = headers.remove(AUTHORIZATION) {
        if let Ok(value) = HeaderValue::from_bytes(value.as_bytes()) {
            headers.insert(RENAMED_AUTHORIZATION, value);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::LocationConfigBuilder;
    use crate::seal::Password;
    use http::{HeaderMap, HeaderValue, Method};

    fn build_config(realm: &str, secret: &str) -> LocationConfig {
        LocationConfigBuilder::new()
            .realm(realm)
            .single_password(secret)
            .allowed_clock_skew(300)
            .merge(&LocationConfig::default())
            .unwrap()
    }

    fn seal_ticket(secret: &str, ticket_json: &str) -> String {
        seal::seal(&Password::Single(secret.to_string()), ticket_json.as_bytes()).unwrap()
    }

    fn authorized_request(
        config: &LocationConfig,
        secret: &str,
        ticket_json: &str,
        ticket_pwd: &str,
        method: Method,
        path: &str,
        host: &str,
    ) -> (HeaderMap, i64) {
        let id = seal_ticket(secret, ticket_json);
        let ts = epoch_i64();
        let nonce = "testnonce";
        let canonical =
            hawk::canonical_request(ts, nonce, method.as_str(), path, host, 443, "", "");
        let mac = hawk::compute_mac(HawkAlgorithm::Sha256, ticket_pwd.as_bytes(), &canonical)
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!(
                r#"Hawk id="{id}", ts="{ts}", nonce="{nonce}", mac="{mac}""#
            ))
            .unwrap(),
        );
        headers.insert("host", HeaderValue::from_str(host).unwrap());
        (headers, ts)
    }

    #[test]
    fn tampered_mac_and_unsafe_method_denials_log_a_warning() {
        let _ = env_logger::try_init();
        let config = build_config("api", "seal-secret");
        let headers = HeaderMap::new();
        let req = RequestView {
            method: &Method::GET,
            path: "/",
            headers: &headers,
            tls: true,
        };
        let mut published = PublishedContext::default();
        assert_eq!(
            access_phase(&config, &req, &mut published),
            FilterOutcome::Deny(DenyReason::MissingAuthorization)
        );
    }

    #[test]
    fn disabled_location_declines() {
        let config = LocationConfig::default();
        let headers = HeaderMap::new();
        let req = RequestView {
            method: &Method::GET,
            path: "/",
            headers: &headers,
            tls: true,
        };
        let mut published = PublishedContext::default();
        assert_eq!(
            access_phase(&config, &req, &mut published),
            FilterOutcome::Disabled
        );
    }

    #[test]
    fn missing_authorization_leaves_published_context_empty() {
        let config = build_config("api", "secret");
        let headers = HeaderMap::new();
        let req = RequestView {
            method: &Method::GET,
            path: "/",
            headers: &headers,
            tls: true,
        };
        let mut published = PublishedContext::default();
        assert_eq!(
            access_phase(&config, &req, &mut published),
            FilterOutcome::Deny(DenyReason::MissingAuthorization)
        );
        assert_eq!(published, PublishedContext::default());
    }

    #[test]
    fn deny_reason_maps_to_http_error() {
        let err = DenyReason::MissingAuthorization.to_http_error();
        assert_eq!(err.code, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "missing Authorization header");
    }

    #[test]
    fn valid_ticket_and_mac_allows() {
        let config = build_config("api", "seal-secret");
        let ticket_json =
            r#"{"client":"c1","pwd":"macsecret","hawkAlgorithm":"sha256","exp":9999999999,"rw":false,"scope":["api"]}"#;
        let (headers, ts) = authorized_request(
            &config,
            "seal-secret",
            ticket_json,
            "macsecret",
            Method::GET,
            "/widgets",
            "example.com",
        );
        let req = RequestView {
            method: &Method::GET,
            path: "/widgets",
            headers: &headers,
            tls: true,
        };
        let mut published = PublishedContext::default();
        assert_eq!(
            access_phase(&config, &req, &mut published),
            FilterOutcome::Allow
        );
        assert_eq!(published.client.as_deref(), Some("c1"));
        assert_eq!(published.expires, Some(9999999999));
        assert!(published.clockskew.unwrap().abs() < 5);
        let _ = ts;
    }

    #[test]
    fn tampered_mac_denied() {
        let config = build_config("api", "seal-secret");
        let ticket_json =
            r#"{"client":"c1","pwd":"macsecret","hawkAlgorithm":"sha256","exp":9999999999,"rw":false,"scope":["api"]}"#;
        let (headers, _) = authorized_request(
            &config,
            "seal-secret",
            ticket_json,
            "macsecret",
            Method::GET,
            "/widgets",
            "example.com",
        );
        let req = RequestView {
            method: &Method::POST, // flips the canonical request out from under the MAC
            path: "/widgets",
            headers: &headers,
            tls: true,
        };
        let mut published = PublishedContext::default();
        assert_eq!(
            access_phase(&config, &req, &mut published),
            FilterOutcome::Deny(DenyReason::MacInvalid)
        );
        // Ticket fields surface even though the MAC check denies: the
        // handler stores them as soon as the ticket is parsed.
        assert_eq!(published.client.as_deref(), Some("c1"));
        assert_eq!(published.expires, Some(9999999999));
        assert_eq!(published.clockskew, None);
    }

    #[test]
    fn write_without_rw_grant_forbidden() {
        let config = build_config("api", "seal-secret");
        let ticket_json =
            r#"{"client":"c1","pwd":"macsecret","hawkAlgorithm":"sha256","exp":9999999999,"rw":false,"scope":["api"]}"#;
        let (headers, _) = authorized_request(
            &config,
            "seal-secret",
            ticket_json,
            "macsecret",
            Method::POST,
            "/widgets",
            "example.com",
        );
        let req = RequestView {
            method: &Method::POST,
            path: "/widgets",
            headers: &headers,
            tls: true,
        };
        let mut published = PublishedContext::default();
        assert_eq!(
            access_phase(&config, &req, &mut published),
            FilterOutcome::Deny(DenyReason::UnsafeMethodReadOnly)
        );
        assert_eq!(published.client.as_deref(), Some("c1"));
        assert_eq!(published.expires, Some(9999999999));
        assert!(published.clockskew.unwrap().abs() < 5);
    }

    #[test]
    fn missing_scope_denied() {
        let config = build_config("billing", "seal-secret");
        let ticket_json =
            r#"{"client":"c1","pwd":"macsecret","hawkAlgorithm":"sha256","exp":9999999999,"rw":true,"scope":["api"]}"#;
        let (headers, _) = authorized_request(
            &config,
            "seal-secret",
            ticket_json,
            "macsecret",
            Method::GET,
            "/widgets",
            "example.com",
        );
        let req = RequestView {
            method: &Method::GET,
            path: "/widgets",
            headers: &headers,
            tls: true,
        };
        let mut published = PublishedContext::default();
        assert_eq!(
            access_phase(&config, &req, &mut published),
            FilterOutcome::Deny(DenyReason::ScopeNotGranted)
        );
        assert_eq!(published.client.as_deref(), Some("c1"));
    }

    #[test]
    fn expired_ticket_denied() {
        let config = build_config("api", "seal-secret");
        let ticket_json =
            r#"{"client":"c1","pwd":"macsecret","hawkAlgorithm":"sha256","exp":1,"rw":false,"scope":["api"]}"#;
        let (headers, _) = authorized_request(
            &config,
            "seal-secret",
            ticket_json,
            "macsecret",
            Method::GET,
            "/widgets",
            "example.com",
        );
        let req = RequestView {
            method: &Method::GET,
            path: "/widgets",
            headers: &headers,
            tls: true,
        };
        let mut published = PublishedContext::default();
        assert_eq!(
            access_phase(&config, &req, &mut published),
            FilterOutcome::Deny(DenyReason::Expired)
        );
        assert_eq!(published.client.as_deref(), Some("c1"));
        assert_eq!(published.expires, Some(1));
    }

    #[test]
    fn expiry_is_checked_before_method_authorization() {
        // spec.md §4.2 orders the expiry check (step 9) before the
        // unsafe-method/rw check (step 10): an expired, read-only ticket
        // used for a POST must be denied for expiry, not method.
        let config = build_config("api", "seal-secret");
        let ticket_json =
            r#"{"client":"c1","pwd":"macsecret","hawkAlgorithm":"sha256","exp":1,"rw":false,"scope":["api"]}"#;
        let (headers, _) = authorized_request(
            &config,
            "seal-secret",
            ticket_json,
            "macsecret",
            Method::POST,
            "/widgets",
            "example.com",
        );
        let req = RequestView {
            method: &Method::POST,
            path: "/widgets",
            headers: &headers,
            tls: true,
        };
        let mut published = PublishedContext::default();
        assert_eq!(
            access_phase(&config, &req, &mut published),
            FilterOutcome::Deny(DenyReason::Expired)
        );
    }

    #[test]
    fn clock_skew_denial_carries_a_timed_challenge_under_the_tickets_key() {
        let config = build_config("api", "seal-secret");
        let ticket_json =
            r#"{"client":"c1","pwd":"macsecret","hawkAlgorithm":"sha256","exp":9999999999,"rw":false,"scope":["api"]}"#;
        let id = seal_ticket("seal-secret", ticket_json);
        let stale_ts = epoch_i64() - 1000;
        let nonce = "n1";
        let canonical = hawk::canonical_request(
            stale_ts,
            nonce,
            "GET",
            "/widgets",
            "example.com",
            443,
            "",
            "",
        );
        let mac = hawk::compute_mac(HawkAlgorithm::Sha256, b"macsecret", &canonical).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!(
                r#"Hawk id="{id}", ts="{stale_ts}", nonce="{nonce}", mac="{mac}""#
            ))
            .unwrap(),
        );
        headers.insert("host", HeaderValue::from_static("example.com"));

        let req = RequestView {
            method: &Method::GET,
            path: "/widgets",
            headers: &headers,
            tls: true,
        };

        let mut published = PublishedContext::default();
        match access_phase(&config, &req, &mut published) {
            FilterOutcome::Deny(reason @ DenyReason::ClockSkew { fresh_ts, ref tsm }) => {
                assert!(fresh_ts - stale_ts >= 1000);
                let expected_tsm = hawk::compute_mac(
                    HawkAlgorithm::Sha256,
                    b"macsecret",
                    &format!("hawk.1.ts\n{fresh_ts}\n"),
                )
                .unwrap();
                assert_eq!(*tsm, expected_tsm);
                let challenge = reason.challenge("api").unwrap();
                assert!(challenge.contains(&format!(r#"ts="{fresh_ts}""#)));
                assert!(challenge.contains(&format!(r#"tsm="{expected_tsm}""#)));
            }
            other => panic!("expected ClockSkew, got {other:?}"),
        }
        assert_eq!(published.client.as_deref(), Some("c1"));
        assert_eq!(published.expires, Some(9999999999));
        assert!(published.clockskew.unwrap() >= 1000);
    }

    #[test]
    fn oversized_ticket_id_rejected_before_unseal() {
        let config = build_config("api", "seal-secret");
        let mut headers = HeaderMap::new();
        let huge_id = "x".repeat(crate::ENCRYPTION_WORK_AREA_CEILING + 1);
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!(
                r#"Hawk id="{huge_id}", ts="1", nonce="n", mac="m""#
            ))
            .unwrap(),
        );
        let req = RequestView {
            method: &Method::GET,
            path: "/",
            headers: &headers,
            tls: true,
        };
        let mut published = PublishedContext::default();
        assert_eq!(
            access_phase(&config, &req, &mut published),
            FilterOutcome::Deny(DenyReason::TicketTooLarge)
        );
        assert_eq!(published, PublishedContext::default());
    }

    #[test]
    fn ticket_with_too_many_realms_denied_as_bad_request() {
        let config = build_config("api", "seal-secret");
        let realms: Vec<String> = (0..=crate::MAX_REALMS).map(|i| format!(r#""r{i}""#)).collect();
        let ticket_json = format!(
            r#"{{"client":"c1","pwd":"macsecret","hawkAlgorithm":"sha256","exp":9999999999,"rw":false,"scope":[{}]}}"#,
            realms.join(",")
        );
        let (headers, _) = authorized_request(
            &config,
            "seal-secret",
            &ticket_json,
            "macsecret",
            Method::GET,
            "/widgets",
            "example.com",
        );
        let req = RequestView {
            method: &Method::GET,
            path: "/widgets",
            headers: &headers,
            tls: true,
        };
        let mut published = PublishedContext::default();
        let outcome = access_phase(&config, &req, &mut published);
        assert_eq!(
            outcome,
            FilterOutcome::Deny(DenyReason::TicketParseFailed(TicketError::NRealms))
        );
        assert_eq!(published, PublishedContext::default());
        match outcome {
            FilterOutcome::Deny(reason) => assert_eq!(reason.status(), StatusCode::BAD_REQUEST),
            _ => unreachable!(),
        }
    }

    #[test]
    fn host_override_wins_over_header() {
        let mut config = build_config("api", "seal-secret");
        config.host_override = Some("canonical.example".to_string());
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("attacker.example"));
        let req = RequestView {
            method: &Method::GET,
            path: "/",
            headers: &headers,
            tls: true,
        };
        let (host, _) = determine_host_and_port(&config, &req);
        assert_eq!(host, "canonical.example");
    }

    #[test]
    fn missing_port_in_host_header_falls_back_to_scheme_default() {
        let config = build_config("api", "seal-secret");
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("example.com"));

        let tls_req = RequestView {
            method: &Method::GET,
            path: "/",
            headers: &headers,
            tls: true,
        };
        let (_, tls_port) = determine_host_and_port(&config, &tls_req);
        assert_eq!(tls_port, 443);

        let plain_req = RequestView {
            method: &Method::GET,
            path: "/",
            headers: &headers,
            tls: false,
        };
        let (_, plain_port) = determine_host_and_port(&config, &plain_req);
        assert_eq!(plain_port, 80);
    }

    #[test]
    fn host_header_splits_at_first_colon() {
        let (host, port) = split_host_port("example.com:8080");
        assert_eq!(host.as_deref(), Some("example.com"));
        assert_eq!(port, Some(8080));
    }

    #[test]
    fn rename_header_moves_value_and_removes_original() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Hawk id=\"x\""));
        rename_authorization_header(&mut headers);
        assert!(!headers.contains_key("authorization"));
        assert_eq!(
            headers.get("x-thorization").unwrap().to_str().unwrap(),
            "Hawk id=\"x\""
        );
    }
}
