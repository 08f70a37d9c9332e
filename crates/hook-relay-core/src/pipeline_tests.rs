//! Tests for the validation pipeline.
//!
//! Covers the ordered checks, their short-circuit behaviour, and the shape
//! of the [`EventData`] record produced on success.

use super::*;
use crate::Signer;

// ============================================================================
// Helpers
// ============================================================================

const SECRET: &str = "test-secret";
const HOOK_PATH: &str = "/hook";

fn signer() -> Signer {
    Signer::new(SECRET)
}

/// Header map for a fully valid delivery of `body`, signed with [`SECRET`].
fn valid_headers(body: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert(
        "x-hub-signature".to_string(),
        signer().sign(body.as_bytes()),
    );
    headers.insert("x-github-event".to_string(), "push".to_string());
    headers.insert("x-github-delivery".to_string(), "abc123".to_string());
    headers
}

/// Build a fully valid POST request to [`HOOK_PATH`] carrying `body`.
fn valid_request(body: &str) -> HookRequest {
    HookRequest::new(
        "POST",
        HOOK_PATH,
        valid_headers(body),
        Bytes::from(body.to_string()),
    )
}

// ============================================================================
// Route match tests
// ============================================================================

mod route_match_tests {
    use super::*;

    /// A non-POST method stops the pipeline at stage 1.
    #[test]
    fn test_get_method_is_route_mismatch() {
        let body = "{}";
        let request = HookRequest::new("GET", HOOK_PATH, valid_headers(body), Bytes::from(body));

        let result = validate(HOOK_PATH, &signer(), &request);
        assert!(matches!(result, Err(PipelineError::RouteMismatch { .. })));
    }

    /// A path other than the configured one stops the pipeline at stage 1,
    /// even when every header and the signature are valid.
    #[test]
    fn test_wrong_path_is_route_mismatch() {
        let body = "{}";
        let request = HookRequest::new("POST", "/other", valid_headers(body), Bytes::from(body));

        let result = validate(HOOK_PATH, &signer(), &request);
        assert!(matches!(result, Err(PipelineError::RouteMismatch { .. })));
    }

    /// The query string is ignored for route matching.
    #[test]
    fn test_query_string_is_stripped_for_match() {
        assert!(match_route(HOOK_PATH, "POST", "/hook?token=ignored&x=1").is_ok());
        assert!(match_route(HOOK_PATH, "POST", "/hook").is_ok());
        assert!(match_route(HOOK_PATH, "POST", "/hook2?x=1").is_err());
    }

    /// The route-mismatch error reports the method and target as received.
    #[test]
    fn test_route_mismatch_reports_request_target() {
        match match_route(HOOK_PATH, "GET", "/nope?q=1") {
            Err(PipelineError::RouteMismatch { method, path }) => {
                assert_eq!(method, "GET");
                assert_eq!(path, "/nope?q=1");
            }
            other => panic!("expected RouteMismatch, got {:?}", other),
        }
    }
}

// ============================================================================
// Header presence tests
// ============================================================================

mod header_presence_tests {
    use super::*;

    /// With every required header absent, the signature header is named
    /// first: the check order is signature, event, delivery id.
    #[test]
    fn test_all_headers_missing_names_signature_first() {
        match HookHeaders::from_headers(&HashMap::new()) {
            Err(PipelineError::MissingHeader { header }) => {
                assert_eq!(header, SIGNATURE_HEADER);
            }
            other => panic!("expected MissingHeader, got {:?}", other),
        }
    }

    /// With the signature present but the event name absent, the event
    /// header is named.
    #[test]
    fn test_missing_event_header_named_second() {
        let mut headers = valid_headers("{}");
        headers.remove("x-github-event");

        match HookHeaders::from_headers(&headers) {
            Err(PipelineError::MissingHeader { header }) => {
                assert_eq!(header, EVENT_HEADER);
            }
            other => panic!("expected MissingHeader, got {:?}", other),
        }
    }

    /// With signature and event present but the delivery id absent, the
    /// delivery header is named.
    #[test]
    fn test_missing_delivery_header_named_third() {
        let mut headers = valid_headers("{}");
        headers.remove("x-github-delivery");

        match HookHeaders::from_headers(&headers) {
            Err(PipelineError::MissingHeader { header }) => {
                assert_eq!(header, DELIVERY_HEADER);
            }
            other => panic!("expected MissingHeader, got {:?}", other),
        }
    }

    /// Header lookup is case-insensitive: mixed-case names as sent by a
    /// provider are accepted.
    #[test]
    fn test_mixed_case_header_names_accepted() {
        let body = r#"{"ok":true}"#;
        let mut headers = HashMap::new();
        headers.insert(
            "X-Hub-Signature".to_string(),
            signer().sign(body.as_bytes()),
        );
        headers.insert("X-GitHub-Event".to_string(), "push".to_string());
        headers.insert("X-GitHub-Delivery".to_string(), "id-1".to_string());
        let request = HookRequest::new("POST", HOOK_PATH, headers, Bytes::from(body));

        assert!(validate(HOOK_PATH, &signer(), &request).is_ok());
    }

    /// Arbitrary casings beyond the canonical spelling resolve too, including
    /// all-upper and randomly mixed names.
    #[test]
    fn test_arbitrary_case_header_names_accepted() {
        let body = r#"{"ok":true}"#;
        let mut headers = HashMap::new();
        headers.insert(
            "X-HUB-SIGNATURE".to_string(),
            signer().sign(body.as_bytes()),
        );
        headers.insert("x-gitHub-EVENT".to_string(), "push".to_string());
        headers.insert("X-GITHUB-delivery".to_string(), "id-1".to_string());

        let hook_headers = HookHeaders::from_headers(&headers).unwrap();
        assert_eq!(hook_headers.event, "push");
        assert_eq!(hook_headers.delivery_id, "id-1");

        let request = HookRequest::new("POST", HOOK_PATH, headers, Bytes::from(body));
        assert!(validate(HOOK_PATH, &signer(), &request).is_ok());
    }
}

// ============================================================================
// Signature verification tests
// ============================================================================

mod signature_tests {
    use super::*;

    /// A signature computed under the wrong secret fails with the exact
    /// message the HTTP layer returns to the caller.
    #[test]
    fn test_wrong_secret_is_signature_mismatch() {
        let body = r#"{"ref":"refs/heads/main"}"#;
        let mut headers = valid_headers(body);
        headers.insert(
            "x-hub-signature".to_string(),
            Signer::new("other-secret").sign(body.as_bytes()),
        );
        let request = HookRequest::new("POST", HOOK_PATH, headers, Bytes::from(body));

        match validate(HOOK_PATH, &signer(), &request) {
            Err(ref err @ PipelineError::SignatureMismatch) => {
                assert_eq!(err.to_string(), "X-Hub-Signature verify failure");
            }
            other => panic!("expected SignatureMismatch, got {:?}", other),
        }
    }

    /// A body altered after signing fails verification: the check runs over
    /// the exact bytes received, not a re-serialized form.
    #[test]
    fn test_body_tampered_after_signing_rejected() {
        let signed_body = r#"{"ref":"refs/heads/main"}"#;
        let request = HookRequest::new(
            "POST",
            HOOK_PATH,
            valid_headers(signed_body),
            Bytes::from(r#"{"ref":"refs/heads/evil"}"#),
        );

        assert!(matches!(
            validate(HOOK_PATH, &signer(), &request),
            Err(PipelineError::SignatureMismatch)
        ));
    }
}

// ============================================================================
// Payload decode tests
// ============================================================================

mod payload_tests {
    use super::*;

    /// A correctly signed but malformed JSON body fails at the decode stage;
    /// the signature check has already passed at that point.
    #[test]
    fn test_signed_non_json_body_is_parse_error() {
        let request = valid_request("not json at all");

        assert!(matches!(
            validate(HOOK_PATH, &signer(), &request),
            Err(PipelineError::PayloadParse(_))
        ));
    }

    /// `parse_payload` round-trips any JSON-representable value.
    #[test]
    fn test_parse_round_trips_arbitrary_json() {
        let original = serde_json::json!({
            "ref": "refs/heads/main",
            "commits": [{"id": "a1", "added": []}, {"id": "b2"}],
            "forced": false,
            "count": 3,
        });
        let serialized = serde_json::to_vec(&original).unwrap();

        assert_eq!(parse_payload(&serialized).unwrap(), original);
    }

    /// Strictness: trailing garbage after a valid document is rejected.
    #[test]
    fn test_trailing_garbage_rejected() {
        assert!(parse_payload(b"{} trailing").is_err());
    }
}

// ============================================================================
// Success path tests
// ============================================================================

mod success_tests {
    use super::*;

    /// A fully valid request yields an [`EventData`] echoing the event name,
    /// delivery id, decoded payload, and the request headers.
    #[test]
    fn test_valid_request_produces_event_data() {
        let body = r#"{"ref":"refs/heads/main"}"#;
        let request = valid_request(body);

        let event = validate(HOOK_PATH, &signer(), &request).unwrap();

        assert_eq!(event.event, "push");
        assert_eq!(event.delivery_id, "abc123");
        assert_eq!(event.payload, serde_json::json!({"ref": "refs/heads/main"}));
        assert_eq!(
            event.headers.get("x-github-event").map(String::as_str),
            Some("push")
        );
    }

    /// The staged entry points compose to the same result as `validate`.
    #[test]
    fn test_staged_validation_matches_composed() {
        let body = r#"{"action":"opened"}"#;
        let headers = valid_headers(body);

        match_route(HOOK_PATH, "POST", "/hook?via=staged").unwrap();
        let hook_headers = HookHeaders::from_headers(&headers).unwrap();
        let staged =
            complete_validation(&signer(), &hook_headers, headers.clone(), body.as_bytes())
                .unwrap();

        let composed = validate(
            HOOK_PATH,
            &signer(),
            &HookRequest::new("POST", HOOK_PATH, headers, Bytes::from(body)),
        )
        .unwrap();

        assert_eq!(staged.event, composed.event);
        assert_eq!(staged.delivery_id, composed.delivery_id);
        assert_eq!(staged.payload, composed.payload);
    }
}
