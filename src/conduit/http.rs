//! Conduit over HTTP: form-encoded requests and the response envelope.

use base64::Engine;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, debug_span, trace};

use crate::conduit::client::ReviewService;
use crate::conduit::error::{ConduitError, ConduitResult};
use crate::conduit::models::{
    DiffHandle, RepositoryInfo, Reviewer, Revision, RevisionHandle, SearchResult, Transaction,
};
use crate::diff::DiffSpec;

/// Blocking Conduit client.
///
/// Every call is a form POST to `<api>/<method>` whose `params` field holds
/// the JSON arguments plus the API token.
pub struct ConduitClient {
    http: Client,
    api: Url,
    token: String,
}

impl ConduitClient {
    /// `api` is the server's `api/` endpoint, e.g. `https://phabricator.services.mozilla.com/api/`.
    pub fn new(api: Url, token: impl Into<String>) -> ConduitResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("phlay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api,
            token: token.into(),
        })
    }

    pub fn api(&self) -> &Url {
        &self.api
    }

    /// Call `method` with `args`.
    pub fn call<P, T>(&self, method: &str, args: &P) -> ConduitResult<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let _span = debug_span!("conduit", method).entered();

        let url = self.api.join(method).map_err(|e| ConduitError::InvalidUri {
            uri: format!("{}{method}", self.api),
            reason: e.to_string(),
        })?;
        let params = with_token(serde_json::to_value(args)?, &self.token);

        debug!("POST {url}");
        let body = self
            .http
            .post(url)
            .form(&[
                ("params", serde_json::to_string(&params)?.as_str()),
                ("output", "json"),
                ("__conduit__", "true"),
            ])
            .send()?
            .error_for_status()?
            .text()?;
        trace!("{body}");

        parse_envelope(&body)
    }
}

fn with_token(mut params: Value, token: &str) -> Value {
    if let Value::Object(map) = &mut params {
        map.insert("__conduit__".to_string(), json!({ "token": token }));
    }
    params
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_info: Option<String>,
}

/// Unwrap a Conduit response body into its `result`.
pub(crate) fn parse_envelope<T: DeserializeOwned>(body: &str) -> ConduitResult<T> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if let Some(code) = envelope.error_code {
        return Err(ConduitError::Remote {
            code,
            info: envelope.error_info.unwrap_or_default(),
        });
    }
    Ok(serde_json::from_value(envelope.result)?)
}

#[derive(Serialize)]
struct Search<C> {
    constraints: C,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachments: Option<Attachments>,
}

impl<C> Search<C> {
    fn new(constraints: C) -> Self {
        Self {
            constraints,
            attachments: None,
        }
    }
}

#[derive(Serialize)]
struct Attachments {
    reviewers: bool,
}

#[derive(Serialize)]
struct ByCallsign<'a> {
    callsigns: [&'a str; 1],
}

#[derive(Serialize)]
struct ById<'a> {
    ids: &'a [u64],
}

#[derive(Serialize)]
struct ByUsername<'a> {
    usernames: &'a [&'a str],
}

#[derive(Serialize)]
struct BySlug<'a> {
    slugs: &'a [&'a str],
}

#[derive(Serialize)]
struct SetDiffProperty<'a> {
    diff_id: u64,
    name: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
struct FileUpload {
    data_base64: String,
}

#[derive(Serialize)]
struct RevisionEdit<'a> {
    transactions: &'a [Transaction],
    #[serde(rename = "objectIdentifier", skip_serializing_if = "Option::is_none")]
    object_identifier: Option<&'a str>,
}

impl ReviewService for ConduitClient {
    fn search_repository(&self, callsign: &str) -> ConduitResult<Vec<RepositoryInfo>> {
        let result: SearchResult<RepositoryInfo> = self.call(
            "diffusion.repository.search",
            &Search::new(ByCallsign { callsigns: [callsign] }),
        )?;
        Ok(result.data)
    }

    fn search_revisions(&self, ids: &[u64]) -> ConduitResult<Vec<Revision>> {
        let mut search = Search::new(ById { ids });
        search.attachments = Some(Attachments { reviewers: true });
        let result: SearchResult<Revision> = self.call("differential.revision.search", &search)?;
        Ok(result.data)
    }

    fn search_users(&self, usernames: &[&str]) -> ConduitResult<Vec<Reviewer>> {
        let result: SearchResult<Reviewer> =
            self.call("user.search", &Search::new(ByUsername { usernames }))?;
        Ok(result.data)
    }

    fn search_projects(&self, slugs: &[&str]) -> ConduitResult<Vec<Reviewer>> {
        let result: SearchResult<Reviewer> = self.call("project.search", &Search::new(BySlug { slugs }))?;
        Ok(result.data)
    }

    fn create_diff(&self, diff: &DiffSpec) -> ConduitResult<DiffHandle> {
        self.call("differential.creatediff", diff)
    }

    fn set_diff_property(&self, diff_id: u64, name: &str, data: &str) -> ConduitResult<()> {
        let _: Value = self.call(
            "differential.setdiffproperty",
            &SetDiffProperty { diff_id, name, data },
        )?;
        Ok(())
    }

    fn upload_file(&self, content: &[u8]) -> ConduitResult<String> {
        let data_base64 = base64::engine::general_purpose::STANDARD.encode(content);
        self.call("file.upload", &FileUpload { data_base64 })
    }

    fn edit_revision(&self, object: Option<&str>, transactions: &[Transaction]) -> ConduitResult<RevisionHandle> {
        self.call(
            "differential.revision.edit",
            &RevisionEdit {
                transactions,
                object_identifier: object,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conduit::models::TransactionKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_envelope_result() {
        let handle: DiffHandle = parse_envelope(
            r#"{"result": {"diffid": 7, "phid": "PHID-DIFF-7", "uri": "https://phab/differential/diff/7/"}, "error_code": null, "error_info": null}"#,
        )
        .unwrap();
        assert_eq!(handle.diffid, 7);
        assert_eq!(handle.phid, "PHID-DIFF-7");
    }

    #[test]
    fn test_envelope_null_result() {
        let value: Value = parse_envelope(r#"{"result": null, "error_code": null, "error_info": null}"#).unwrap();
        assert!(value.is_null());
    }

    #[test]
    fn test_envelope_error() {
        let err = parse_envelope::<Value>(
            r#"{"result": null, "error_code": "ERR-INVALID-AUTH", "error_info": "API token is bad"}"#,
        )
        .unwrap_err();
        assert!(err.is_remote());
        assert_eq!(err.to_string(), "ERR-INVALID-AUTH: API token is bad");
    }

    #[test]
    fn test_token_is_added_to_params() {
        let params = with_token(serde_json::to_value(Search::new(ById { ids: &[3] })).unwrap(), "cli-abc");
        assert_eq!(
            params,
            json!({"constraints": {"ids": [3]}, "__conduit__": {"token": "cli-abc"}})
        );
    }

    #[test]
    fn test_revision_edit_params() {
        let txns = [Transaction::text(TransactionKind::Title, "new title")];
        let create = serde_json::to_value(RevisionEdit {
            transactions: &txns,
            object_identifier: None,
        })
        .unwrap();
        assert_eq!(create, json!({"transactions": [{"type": "title", "value": "new title"}]}));

        let update = serde_json::to_value(RevisionEdit {
            transactions: &txns,
            object_identifier: Some("PHID-DREV-1"),
        })
        .unwrap();
        assert_eq!(update["objectIdentifier"], "PHID-DREV-1");
    }

    #[test]
    fn test_revision_search_params() {
        let mut search = Search::new(ById { ids: &[5] });
        search.attachments = Some(Attachments { reviewers: true });
        assert_eq!(
            serde_json::to_value(search).unwrap(),
            json!({"constraints": {"ids": [5]}, "attachments": {"reviewers": true}})
        );
    }
}
