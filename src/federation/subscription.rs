//! Hub subscription verification.
//!
//! When this service subscribes to a remote feed, the remote hub confirms
//! the request with a GET against our feed URL carrying a challenge. The
//! handshake proves control of the callback: echo the challenge verbatim
//! with 200 if the topic and verify token match what we stored at
//! subscribe time, otherwise answer 404 with no body. The 404 on mismatch
//! is mandated by the push protocol; it signals refusal to the hub.

use serde::Deserialize;

/// Hub verification query parameters, as sent on `GET /feeds/{id}.atom`.
///
/// A request without `hub.challenge` is not a verification request; the
/// route serves the rendered feed instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChallengeParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.topic")]
    pub topic: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
}

impl ChallengeParams {
    /// Whether this request is a verification challenge at all.
    pub fn is_verification(&self) -> bool {
        self.challenge.is_some()
    }

    /// Whether the hub is confirming an unsubscribe.
    pub fn is_unsubscribe(&self) -> bool {
        self.mode.as_deref() == Some("unsubscribe")
    }
}

/// Outcome of the challenge handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// Answer 200 with exactly this body
    Echo(String),
    /// Answer 404 with no body
    Rejected,
}

/// Run the challenge handshake for one verification request.
///
/// # Arguments
/// * `params` - Query parameters from the hub's GET
/// * `expected_topic` - The feed's canonical URL
/// * `expected_verify_token` - Token stored on the pending subscription
///
/// The challenge is echoed byte-for-byte; its content is never
/// interpreted.
pub fn handle_challenge(
    params: &ChallengeParams,
    expected_topic: &str,
    expected_verify_token: &str,
) -> ChallengeOutcome {
    let Some(challenge) = params.challenge.as_deref() else {
        return ChallengeOutcome::Rejected;
    };

    let topic_matches = params.topic.as_deref() == Some(expected_topic);
    let token_matches = params.verify_token.as_deref() == Some(expected_verify_token);

    if topic_matches && token_matches {
        ChallengeOutcome::Echo(challenge.to_string())
    } else {
        ChallengeOutcome::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPIC: &str = "http://example.org/feeds/1.atom";
    const TOKEN: &str = "af31c2";

    fn params(topic: &str, challenge: &str, token: &str) -> ChallengeParams {
        ChallengeParams {
            mode: Some("subscribe".to_string()),
            topic: Some(topic.to_string()),
            challenge: Some(challenge.to_string()),
            verify_token: Some(token.to_string()),
        }
    }

    #[test]
    fn matching_topic_and_token_echoes_challenge() {
        let outcome = handle_challenge(&params(TOPIC, "hello-challenge", TOKEN), TOPIC, TOKEN);
        assert_eq!(outcome, ChallengeOutcome::Echo("hello-challenge".to_string()));
    }

    #[test]
    fn challenge_with_special_characters_is_echoed_verbatim() {
        let challenge = "x?&=% <tag> \"quoted\" \u{00e9}\u{6f22}";
        let outcome = handle_challenge(&params(TOPIC, challenge, TOKEN), TOPIC, TOKEN);
        assert_eq!(outcome, ChallengeOutcome::Echo(challenge.to_string()));
    }

    #[test]
    fn topic_mismatch_rejects_even_with_correct_token() {
        let outcome = handle_challenge(
            &params("http://evil.example/feed", "challenge", TOKEN),
            TOPIC,
            TOKEN,
        );
        assert_eq!(outcome, ChallengeOutcome::Rejected);
    }

    #[test]
    fn token_mismatch_rejects_even_with_correct_topic() {
        let outcome = handle_challenge(&params(TOPIC, "challenge", "wrong-token"), TOPIC, TOKEN);
        assert_eq!(outcome, ChallengeOutcome::Rejected);
    }

    #[test]
    fn missing_token_rejects() {
        let mut p = params(TOPIC, "challenge", TOKEN);
        p.verify_token = None;
        assert_eq!(handle_challenge(&p, TOPIC, TOKEN), ChallengeOutcome::Rejected);
    }

    #[test]
    fn missing_topic_rejects() {
        let mut p = params(TOPIC, "challenge", TOKEN);
        p.topic = None;
        assert_eq!(handle_challenge(&p, TOPIC, TOKEN), ChallengeOutcome::Rejected);
    }

    #[test]
    fn missing_challenge_rejects() {
        let mut p = params(TOPIC, "challenge", TOKEN);
        p.challenge = None;
        assert!(!p.is_verification());
        assert_eq!(handle_challenge(&p, TOPIC, TOKEN), ChallengeOutcome::Rejected);
    }

    #[test]
    fn unsubscribe_mode_is_detected() {
        let mut p = params(TOPIC, "challenge", TOKEN);
        p.mode = Some("unsubscribe".to_string());
        assert!(p.is_unsubscribe());
    }
}
