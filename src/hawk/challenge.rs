//! `WWW-Authenticate` challenge construction.
//!
//! Grounded on `ngx_dlg_auth_send_simple_401` (no timestamp, used when there
//! was no Authorization header to fail against) and `ngx_dlg_auth_send_401`
//! (carries a fresh `ts`/`tsm` pair so a well-behaved client can resync its
//! clock after a clock-skew rejection). The original computed the header's
//! length first and asserted the constructed length matched, a budgeting
//! discipline that made sense against a fixed C buffer; a `String` growing
//! as needed makes that assertion moot here, so it's dropped.

/// A plain challenge: the caller sent no (or an unparsable) Authorization
/// header, or the ticket/MAC was simply wrong. No timestamp hint is given.
pub fn simple(realm: &str) -> String {
    format!(r#"Hawk realm="{}""#, escape(realm))
}

/// A challenge for a timestamp/clock-skew rejection: includes the server's
/// current time (`ts`) and a MAC over it (`tsm`) so the client can detect
/// tampering of the hint itself before trusting it to resync.
pub fn timed(realm: &str, ts: i64, tsm: &str) -> String {
    format!(
        r#"Hawk realm="{}", ts="{}", tsm="{}""#,
        escape(realm),
        ts,
        tsm
    )
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn simple_challenge_has_realm_only() {
        assert_eq!(simple("api"), r#"Hawk realm="api""#);
    }

    #[test]
    fn timed_challenge_carries_ts_and_tsm() {
        let c = timed("api", 1893456000, "abcd==");
        assert_eq!(c, r#"Hawk realm="api", ts="1893456000", tsm="abcd==""#);
    }

    #[test]
    fn realm_with_quotes_is_escaped() {
        assert_eq!(simple(r#"a"b"#), r#"Hawk realm="a\"b""#);
    }
}
