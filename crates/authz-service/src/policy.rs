//! Authorization decision documents.
//!
//! The decision shape is consumed by an external enforcement point and
//! must be reproduced byte-for-byte: the version tag and action string
//! are compatibility markers, not free-form text. Decisions are
//! resource-scoped, never wildcard, so an allow for one method/resource
//! pair does not implicitly authorize siblings.

use crate::claims::ValidatedClaims;
use serde::{Deserialize, Serialize};

/// Policy-language version tag expected by the enforcement point.
pub const POLICY_VERSION: &str = "2012-10-17";

/// The one action this service ever authorizes.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Effect of a policy statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// One statement of a policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyStatement {
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "Effect")]
    pub effect: Effect,
    #[serde(rename = "Resource")]
    pub resource: String,
}

/// A policy document wrapping one resource-scoped statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Statement")]
    pub statement: Vec<PolicyStatement>,
}

/// The decision returned to the enforcement point.
///
/// When no resource was supplied the decision carries only the
/// principal; diagnostic callers use this form and no policy is
/// attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    #[serde(rename = "principalId")]
    pub principal_id: String,
    #[serde(rename = "policyDocument", skip_serializing_if = "Option::is_none")]
    pub policy_document: Option<PolicyDocument>,
}

/// Build a decision for a validated caller.
///
/// Consuming [`ValidatedClaims`] rather than raw claims means a
/// decision can only be built for a token that passed both signature
/// verification and claims validation.
pub fn build(claims: &ValidatedClaims, resource: Option<&str>) -> AuthorizationDecision {
    let policy_document = resource.map(|resource| PolicyDocument {
        version: POLICY_VERSION.to_string(),
        statement: vec![PolicyStatement {
            action: INVOKE_ACTION.to_string(),
            effect: Effect::Allow,
            resource: resource.to_string(),
        }],
    });

    AuthorizationDecision {
        principal_id: claims.principal().to_string(),
        policy_document,
    }
}
