use std::fmt;

use crate::{error::Error, otp::Otp, wsapi::signature};

/// Server-reported verification status, parsed case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadOtp,
    ReplayedOtp,
    ReplayedRequest,
    NoSuchClient,
    BadSignature,
    Other(String),
}

impl Status {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "ok" => Self::Ok,
            "bad_otp" => Self::BadOtp,
            "replayed_otp" => Self::ReplayedOtp,
            "replayed_request" => Self::ReplayedRequest,
            "no_such_client" => Self::NoSuchClient,
            "bad_signature" => Self::BadSignature,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Ok => "ok",
            Self::BadOtp => "bad_otp",
            Self::ReplayedOtp => "replayed_otp",
            Self::ReplayedRequest => "replayed_request",
            Self::NoSuchClient => "no_such_client",
            Self::BadSignature => "bad_signature",
            Self::Other(code) => code,
        }
    }

    /// `replayed_request` means another replica already forwarded an
    /// equivalent request; the answer is not authoritative either way.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ReplayedRequest)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One parsed validation response: parameters in receive order, the reported
/// status, and the response signature separated out. Lives only for the
/// duration of one verification.
#[derive(Debug, Clone)]
pub struct ValidationResponse {
    params: Vec<(String, String)>,
    status: Status,
    signature: Option<String>,
}

impl ValidationResponse {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn status(&self) -> &Status {
        &self.status
    }

    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Server-side generation timestamp in 0.125 second ticks, when the
    /// request asked for one.
    #[must_use]
    pub fn timestamp(&self) -> Option<u64> {
        self.get("timestamp")?.parse().ok()
    }

    /// All parameters except the signature, rejoined the way the server
    /// signed them.
    #[must_use]
    pub fn canonical(&self) -> String {
        let pairs: Vec<String> = self
            .params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        pairs.join("&")
    }
}

/// Parse a raw response body of newline-separated `key=value` lines.
///
/// The `h=` line is the signature over all the others; trailing blank lines
/// are ignored.
///
/// # Errors
/// Returns an error if a line is not a `key=value` pair or no `status` field
/// is present.
pub fn parse(raw: &str) -> Result<ValidationResponse, Error> {
    let mut params = Vec::new();
    let mut signature = None;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(value) = line.strip_prefix("h=") {
            signature = Some(value.to_string());
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::Protocol(format!("malformed response line: {line}")));
        };
        params.push((key.to_string(), value.to_string()));
    }

    let status = params
        .iter()
        .find(|(key, _)| key == "status")
        .map(|(_, value)| Status::parse(value))
        .ok_or_else(|| Error::Protocol("missing status attribute".to_string()))?;

    Ok(ValidationResponse {
        params,
        status,
        signature,
    })
}

/// What a single host's answer means for the whole race.
#[derive(Debug)]
pub(crate) enum Disposition {
    /// Authoritative success; resolves the race.
    Success(ValidationResponse),
    /// Authoritative failure; resolves the race.
    Failure(Error),
    /// Not authoritative; the host withdraws and the race keeps going.
    Transient,
}

/// Interpret one response against the OTP that was sent.
///
/// Checks run in protocol order: echoed OTP, response signature, then status.
/// A signature mismatch is terminal regardless of the reported status.
pub(crate) fn classify(
    response: ValidationResponse,
    expected_otp: &Otp,
    key: Option<&[u8]>,
    client_id: &str,
) -> Disposition {
    if response.get("otp") != Some(expected_otp.as_str()) {
        return Disposition::Failure(Error::Protocol(
            "OTP in the response does not match the provided OTP".to_string(),
        ));
    }

    if let Some(key) = key {
        let Some(actual) = response.signature() else {
            return Disposition::Failure(Error::Protocol(
                "response is missing the signature attribute".to_string(),
            ));
        };

        let expected = match signature::sign(&response.canonical(), key) {
            Ok(expected) => expected,
            Err(e) => return Disposition::Failure(e),
        };

        if expected != actual {
            return Disposition::Failure(Error::SignatureVerification {
                expected,
                actual: actual.to_string(),
            });
        }
    }

    match response.status() {
        Status::Ok => Disposition::Success(response),
        Status::NoSuchClient => Disposition::Failure(Error::InvalidClient(client_id.to_string())),
        Status::ReplayedRequest => Disposition::Transient,
        status => Disposition::Failure(Error::StatusCode(status.code().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OTP: &str = "vvegefendfulhrrihgvibljnnnbikjhnbrtfjlkltvvg";
    const KEY: &[u8] = b"key1234";

    // Body whose h= was produced over the remaining lines with KEY.
    const SIGNED_BODY: &str = "h=KaivS9Y2aU4Mp1NwoJIIHOCfYKw=\n\
                               t=2010-12-30T14:30:12Z0264\n\
                               otp=vvegefendfulhrrihgvibljnnnbikjhnbrtfjlkltvvg\n\
                               nonce=UlVyeUFvU1lVM3FLT0tIeHczWUJpN0\n\
                               sl=75\n\
                               timestamp=10222212\n\
                               sessioncounter=1563\n\
                               sessionuse=3\n\
                               status=OK\n";

    fn otp() -> Otp {
        Otp::new(OTP).expect("valid token")
    }

    fn body(status: &str) -> String {
        format!("otp={OTP}\nnonce=UlVyeUFvU1lVM3FLT0tIeHczWUJpN0\nstatus={status}\n")
    }

    #[test]
    fn test_parse_separates_signature_and_parameters() {
        let response = parse(SIGNED_BODY).expect("body should parse");

        assert_eq!(response.signature(), Some("KaivS9Y2aU4Mp1NwoJIIHOCfYKw="));
        assert_eq!(
            response.canonical(),
            "t=2010-12-30T14:30:12Z0264\
             &otp=vvegefendfulhrrihgvibljnnnbikjhnbrtfjlkltvvg\
             &nonce=UlVyeUFvU1lVM3FLT0tIeHczWUJpN0\
             &sl=75&timestamp=10222212&sessioncounter=1563&sessionuse=3&status=OK"
        );
        assert_eq!(*response.status(), Status::Ok);
        assert_eq!(response.get("sessioncounter"), Some("1563"));
        assert_eq!(response.timestamp(), Some(10_222_212));
    }

    #[test]
    fn test_parse_requires_status() {
        let err = parse("otp=abc\nnonce=def\n").expect_err("should fail without status");
        assert!(matches!(err, Error::Protocol(_)));
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn test_parse_rejects_malformed_line() {
        let err = parse("status=OK\ngarbage\n").expect_err("should reject bare line");
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(Status::parse("OK"), Status::Ok);
        assert_eq!(Status::parse("Replayed_Request"), Status::ReplayedRequest);
        assert_eq!(Status::parse("BAD_OTP"), Status::BadOtp);
        assert_eq!(
            Status::parse("NOT_ENOUGH_ANSWERS"),
            Status::Other("not_enough_answers".to_string())
        );
    }

    #[test]
    fn test_classify_success_without_key() {
        let response = parse(&body("OK")).expect("body should parse");
        let disposition = classify(response, &otp(), None, "1234");
        assert!(matches!(disposition, Disposition::Success(_)));
    }

    #[test]
    fn test_classify_success_with_valid_signature() {
        let response = parse(SIGNED_BODY).expect("body should parse");
        let disposition = classify(response, &otp(), Some(KEY), "1234");
        assert!(matches!(disposition, Disposition::Success(_)));
    }

    #[test]
    fn test_classify_rejects_tampered_response() {
        let tampered = SIGNED_BODY.replace("sl=75", "sl=100");
        let response = parse(&tampered).expect("body should parse");

        let disposition = classify(response, &otp(), Some(KEY), "1234");
        let Disposition::Failure(err) = disposition else {
            panic!("expected failure, got {disposition:?}");
        };
        assert!(matches!(err, Error::SignatureVerification { .. }));
    }

    #[test]
    fn test_classify_signature_failure_beats_status() {
        // Even a definitive negative status is not trusted when the response
        // signature does not check out.
        let tampered = SIGNED_BODY.replace("status=OK", "status=BAD_OTP");
        let response = parse(&tampered).expect("body should parse");

        let disposition = classify(response, &otp(), Some(KEY), "1234");
        let Disposition::Failure(err) = disposition else {
            panic!("expected failure, got {disposition:?}");
        };
        assert!(matches!(err, Error::SignatureVerification { .. }));
    }

    #[test]
    fn test_classify_requires_signature_when_key_present() {
        let response = parse(&body("OK")).expect("body should parse");
        let disposition = classify(response, &otp(), Some(KEY), "1234");
        let Disposition::Failure(err) = disposition else {
            panic!("expected failure, got {disposition:?}");
        };
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_classify_rejects_echo_mismatch() {
        let wrong_echo = body("OK").replace(OTP, "vvegefendfulhrrihgvibljnnnbikjhnbrtfjlklotherx");
        let response = parse(&wrong_echo).expect("body should parse");

        let disposition = classify(response, &otp(), None, "1234");
        let Disposition::Failure(err) = disposition else {
            panic!("expected failure, got {disposition:?}");
        };
        assert!(matches!(err, Error::Protocol(_)));
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_classify_no_such_client() {
        let response = parse(&body("NO_SUCH_CLIENT")).expect("body should parse");
        let disposition = classify(response, &otp(), None, "1234");
        let Disposition::Failure(err) = disposition else {
            panic!("expected failure");
        };
        assert!(matches!(err, Error::InvalidClient(client) if client == "1234"));
    }

    #[test]
    fn test_classify_replayed_request_is_transient() {
        let response = parse(&body("REPLAYED_REQUEST")).expect("body should parse");
        let disposition = classify(response, &otp(), None, "1234");
        assert!(matches!(disposition, Disposition::Transient));
    }

    #[test]
    fn test_classify_terminal_status_codes() {
        for status in ["REPLAYED_OTP", "BAD_OTP", "BAD_SIGNATURE", "BACKEND_ERROR"] {
            let response = parse(&body(status)).expect("body should parse");
            let disposition = classify(response, &otp(), None, "1234");
            let Disposition::Failure(err) = disposition else {
                panic!("expected failure for {status}");
            };
            assert!(
                matches!(&err, Error::StatusCode(code) if *code == status.to_ascii_lowercase()),
                "unexpected error for {status}: {err}"
            );
        }
    }
}
