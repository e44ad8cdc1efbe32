//! Blocking HTTP implementation of [`ZmsClient`] on top of `ureq`.
//!
//! Every call is a single request; there are no retries. A timeout surfaces as
//! [`ClientError::Transport`].

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use zmsync_core::{DomainName, MemberName, RoleName, ZmsSettings};

use crate::api::ZmsClient;
use crate::error::{ClientError, ClientResult};
use crate::model::{Domain, Membership, ResourceError, Role, TopLevelDomain};

/// Header carrying the audit justification on mutating calls.
pub const AUDIT_REF_HEADER: &str = "Y-Audit-Ref";
/// Header carrying a principal token, when one is configured.
pub const PRINCIPAL_HEADER: &str = "Athenz-Principal-Auth";

/// ZMS client bound to one base URL.
#[derive(Debug, Clone)]
pub struct HttpZmsClient {
    base_url: String,
    agent: ureq::Agent,
    principal_token: Option<String>,
}

impl HttpZmsClient {
    pub fn new(settings: &ZmsSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("zmsync/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            base_url: settings.url.trim_end_matches('/').to_owned(),
            agent,
            principal_token: settings.principal_token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: &str, url: &str, audit_ref: Option<&str>) -> ureq::Request {
        let mut req = self
            .agent
            .request(method, url)
            .set("Accept", "application/json");
        if let Some(token) = &self.principal_token {
            req = req.set(PRINCIPAL_HEADER, token);
        }
        if let Some(audit_ref) = audit_ref {
            req = req.set(AUDIT_REF_HEADER, audit_ref);
        }
        req
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<Option<T>> {
        let url = self.url(path);
        tracing::debug!("GET {url}");
        let response = self
            .request("GET", &url, None)
            .call()
            .map_err(|e| map_error(&url, e))?;
        read_optional(&url, response)
    }

    fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        audit_ref: &str,
        body: &B,
    ) -> ClientResult<Option<T>> {
        let url = self.url(path);
        tracing::debug!("{method} {url}");
        let response = self
            .request(method, &url, Some(audit_ref))
            .send_json(body)
            .map_err(|e| map_error(&url, e))?;
        read_optional(&url, response)
    }

    fn delete(&self, path: &str, audit_ref: &str) -> ClientResult<()> {
        let url = self.url(path);
        tracing::debug!("DELETE {url}");
        self.request("DELETE", &url, Some(audit_ref))
            .call()
            .map_err(|e| map_error(&url, e))?;
        Ok(())
    }
}

impl ZmsClient for HttpZmsClient {
    fn get_domain(&self, domain: &DomainName) -> ClientResult<Option<Domain>> {
        self.get_json(&format!("/domain/{domain}"))
    }

    fn post_top_level_domain(
        &self,
        audit_ref: &str,
        detail: &TopLevelDomain,
    ) -> ClientResult<Option<Domain>> {
        self.send_json("POST", "/domain", audit_ref, detail)
    }

    fn delete_top_level_domain(&self, domain: &DomainName, audit_ref: &str) -> ClientResult<()> {
        self.delete(&format!("/domain/{domain}"), audit_ref)
    }

    fn get_role(&self, domain: &DomainName, role: &RoleName) -> ClientResult<Option<Role>> {
        self.get_json(&format!("/domain/{domain}/role/{role}"))
    }

    fn put_role(
        &self,
        domain: &DomainName,
        role: &RoleName,
        audit_ref: &str,
        body: &Role,
    ) -> ClientResult<()> {
        self.send_json::<_, serde_json::Value>(
            "PUT",
            &format!("/domain/{domain}/role/{role}"),
            audit_ref,
            body,
        )?;
        Ok(())
    }

    fn delete_role(
        &self,
        domain: &DomainName,
        role: &RoleName,
        audit_ref: &str,
    ) -> ClientResult<()> {
        self.delete(&format!("/domain/{domain}/role/{role}"), audit_ref)
    }

    fn put_membership(
        &self,
        domain: &DomainName,
        role: &RoleName,
        membership: &Membership,
        audit_ref: &str,
    ) -> ClientResult<()> {
        self.send_json::<_, serde_json::Value>(
            "PUT",
            &format!(
                "/domain/{domain}/role/{role}/member/{}",
                membership.member_name
            ),
            audit_ref,
            membership,
        )?;
        Ok(())
    }

    fn delete_membership(
        &self,
        domain: &DomainName,
        role: &RoleName,
        member: &MemberName,
        audit_ref: &str,
    ) -> ClientResult<()> {
        self.delete(
            &format!("/domain/{domain}/role/{role}/member/{member}"),
            audit_ref,
        )
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// An empty 2xx body becomes `Ok(None)`.
fn read_optional<T: DeserializeOwned>(url: &str, response: ureq::Response) -> ClientResult<Option<T>> {
    let body = response.into_string().map_err(|e| ClientError::Transport {
        url: url.to_owned(),
        message: format!("reading response body: {e}"),
    })?;
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&body)
        .map(Some)
        .map_err(|source| ClientError::Decode {
            url: url.to_owned(),
            source,
        })
}

fn map_error(url: &str, err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            let message = match serde_json::from_str::<ResourceError>(&body) {
                Ok(resource_error) => resource_error.message,
                Err(_) if body.trim().is_empty() => format!("HTTP {code}"),
                Err(_) => body,
            };
            ClientError::Api { code, message }
        }
        ureq::Error::Transport(transport) => ClientError::Transport {
            url: url.to_owned(),
            message: transport.to_string(),
        },
    }
}
