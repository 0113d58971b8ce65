//! XML bodies returned by login and write endpoints.

use lastvault_core::{VaultError, VaultResult};
use roxmltree::Document;

/// What a login response said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated { session_id: String, token: String },
    Failed { cause: String, message: String },
}

/// Parse a login response.
///
/// Success is any element carrying non-empty `sessionid` and `token`
/// attributes; failure is an `error` element with `cause` and `message`. A
/// well-formed document with neither, or a session without a token, is a
/// failure with cause `unknown` and the raw body as message.
pub fn parse_login(body: &str) -> VaultResult<LoginOutcome> {
    let doc = Document::parse(body.trim())
        .map_err(|e| VaultError::TransportFailure(format!("malformed login response: {e}")))?;

    if let Some(node) = doc.descendants().find(|n| n.has_attribute("sessionid")) {
        let session_id = node.attribute("sessionid").unwrap_or_default();
        let token = node.attribute("token").unwrap_or_default();
        if !session_id.is_empty() && !token.is_empty() {
            return Ok(LoginOutcome::Authenticated {
                session_id: session_id.to_string(),
                token: token.to_string(),
            });
        }
        tracing::warn!("login response carried a session without a token");
        return Ok(LoginOutcome::Failed {
            cause: "unknown".into(),
            message: body.trim().to_string(),
        });
    }

    if let Some(node) = doc.descendants().find(|n| n.has_tag_name("error")) {
        return Ok(LoginOutcome::Failed {
            cause: node.attribute("cause").unwrap_or("unknown").to_string(),
            message: node.attribute("message").unwrap_or_default().to_string(),
        });
    }

    Ok(LoginOutcome::Failed {
        cause: "unknown".into(),
        message: body.trim().to_string(),
    })
}

/// Map a login failure cause onto the error taxonomy.
pub fn login_error(cause: &str, message: &str) -> VaultError {
    let message = message.to_string();
    match cause {
        "unknownemail" => VaultError::UnknownAccount(message),
        "unknownpassword" | "password_invalid" => VaultError::InvalidCredentials,
        "googleauthrequired" | "microsoftauthrequired" | "otprequired" | "outofbandrequired" => {
            VaultError::SecondFactorRequired(message)
        }
        "googleauthfailed"
        | "microsoftauthfailed"
        | "otpfailed"
        | "outofbandfailed"
        | "multifactorresponsefailed" => VaultError::SecondFactorRejected(message),
        "yubikeyrestricted" => VaultError::HardwareKeyRestricted(message),
        other => {
            tracing::warn!(cause = other, "unrecognized login failure cause");
            VaultError::Rejected {
                cause: other.to_string(),
                message,
            }
        }
    }
}

/// The `result` element of a write acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteAck {
    pub action: Option<String>,
    pub aid: Option<String>,
    pub msg: Option<String>,
}

/// Parse a write acknowledgement. A document without a `result` element
/// yields an empty ack; unparseable XML is [`VaultError::WriteRejected`].
pub fn parse_ack(body: &str) -> VaultResult<WriteAck> {
    let doc = Document::parse(body.trim())
        .map_err(|e| VaultError::WriteRejected(format!("malformed acknowledgement: {e}")))?;

    let Some(result) = doc.descendants().find(|n| n.has_tag_name("result")) else {
        return Ok(WriteAck::default());
    };
    let attr = |name: &str| {
        result
            .attribute(name)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    Ok(WriteAck {
        action: attr("action"),
        aid: attr("aid"),
        msg: attr("msg"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_success() {
        let body = r#"<ok uid="123" sessionid="sess-1" token="tok-1" accts_version="36"/>"#;
        assert_eq!(
            parse_login(body).unwrap(),
            LoginOutcome::Authenticated {
                session_id: "sess-1".into(),
                token: "tok-1".into(),
            }
        );
    }

    #[test]
    fn login_success_nested() {
        let body = r#"<response><ok sessionid="s" token="t"/></response>"#;
        assert!(matches!(
            parse_login(body).unwrap(),
            LoginOutcome::Authenticated { .. }
        ));
    }

    #[test]
    fn login_session_without_token_is_not_authenticated() {
        for body in [
            r#"<ok sessionid="sess-1"/>"#,
            r#"<ok sessionid="sess-1" token=""/>"#,
            r#"<ok sessionid="" token="tok-1"/>"#,
        ] {
            match parse_login(body).unwrap() {
                LoginOutcome::Failed { cause, message } => {
                    assert_eq!(cause, "unknown");
                    assert_eq!(message, body);
                }
                other => panic!("unexpected outcome for {body}: {other:?}"),
            }
        }
    }

    #[test]
    fn login_failure_cause() {
        let body = r#"<response><error message="Google Authenticator authentication required" cause="googleauthrequired" /></response>"#;
        assert_eq!(
            parse_login(body).unwrap(),
            LoginOutcome::Failed {
                cause: "googleauthrequired".into(),
                message: "Google Authenticator authentication required".into(),
            }
        );
    }

    #[test]
    fn login_neither_is_unknown() {
        match parse_login("<response/>").unwrap() {
            LoginOutcome::Failed { cause, message } => {
                assert_eq!(cause, "unknown");
                assert_eq!(message, "<response/>");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn login_not_xml_is_transport_failure() {
        assert!(matches!(
            parse_login("<html").unwrap_err(),
            VaultError::TransportFailure(_)
        ));
    }

    #[test]
    fn cause_mapping() {
        assert!(matches!(
            login_error("unknownemail", "m"),
            VaultError::UnknownAccount(_)
        ));
        assert!(matches!(
            login_error("unknownpassword", "m"),
            VaultError::InvalidCredentials
        ));
        assert!(matches!(
            login_error("password_invalid", "m"),
            VaultError::InvalidCredentials
        ));
        for cause in [
            "googleauthrequired",
            "microsoftauthrequired",
            "otprequired",
            "outofbandrequired",
        ] {
            assert!(
                matches!(login_error(cause, "m"), VaultError::SecondFactorRequired(_)),
                "{cause}"
            );
        }
        for cause in [
            "googleauthfailed",
            "microsoftauthfailed",
            "otpfailed",
            "outofbandfailed",
            "multifactorresponsefailed",
        ] {
            assert!(
                matches!(login_error(cause, "m"), VaultError::SecondFactorRejected(_)),
                "{cause}"
            );
        }
        assert!(matches!(
            login_error("yubikeyrestricted", "m"),
            VaultError::HardwareKeyRestricted(_)
        ));
    }

    #[test]
    fn unknown_cause_keeps_raw_message() {
        match login_error("captcha", "solve the captcha") {
            VaultError::Rejected { cause, message } => {
                assert_eq!(cause, "captcha");
                assert_eq!(message, "solve the captcha");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ack_added() {
        let body = r#"<xmlresponse><result action="added" aid="2215972459054203220" urid="0" msg="accountadded" grouping="" url="687474703a2f2f66616365626f6f6b2e636f6d" fav="0"></result></xmlresponse>"#;
        let ack = parse_ack(body).unwrap();
        assert_eq!(ack.action.as_deref(), Some("added"));
        assert_eq!(ack.aid.as_deref(), Some("2215972459054203220"));
        assert_eq!(ack.msg.as_deref(), Some("accountadded"));
    }

    #[test]
    fn ack_deleted() {
        let body = r#"<xmlresponse><result action="delete" aid="42" msg="accountdeleted"/></xmlresponse>"#;
        assert_eq!(parse_ack(body).unwrap().msg.as_deref(), Some("accountdeleted"));
    }

    #[test]
    fn ack_without_result_is_empty() {
        assert_eq!(parse_ack("<xmlresponse/>").unwrap(), WriteAck::default());
    }

    #[test]
    fn ack_empty_aid_is_none() {
        let ack = parse_ack(r#"<xmlresponse><result aid=""/></xmlresponse>"#).unwrap();
        assert_eq!(ack.aid, None);
    }

    #[test]
    fn ack_garbage_is_write_rejected() {
        assert!(matches!(
            parse_ack("not xml").unwrap_err(),
            VaultError::WriteRejected(_)
        ));
    }
}
