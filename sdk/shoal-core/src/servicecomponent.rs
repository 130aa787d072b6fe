use bytes::Bytes;
use std::sync::Arc;

use crate::error::{self, ErrorKind};
use crate::httpcomponent::HttpComponent;
use crate::httpx::client::Client;
use crate::httpx::error::{Error as HttpError, ServerErrorContext};
use crate::httpx::raw_json_row_streamer::{RawJsonRowItem, RawJsonRowStreamer};
use crate::httpx::request::{Auth, BasicAuth, Request};

const ERROR_BODY_PREFIX_LEN: usize = 256;

/// A streamed row-shaped result: rows come back one at a time while the body
/// is in flight, with the merged metadata blob available once the rows end.
pub struct ServiceRows {
    streamer: RawJsonRowStreamer,
    prelude: Vec<u8>,
    metadata: Option<Vec<u8>>,
    endpoint: String,
}

impl ServiceRows {
    pub fn prelude(&self) -> &[u8] {
        &self.prelude
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the next row, or None once the rows are exhausted; after that
    /// the trailing metadata is available via `metadata`.
    pub async fn read_row(&mut self) -> error::Result<Option<Vec<u8>>> {
        if self.metadata.is_some() {
            return Ok(None);
        }

        match self.streamer.next().await {
            Some(Ok(RawJsonRowItem::Row(row))) => Ok(Some(row)),
            Some(Ok(RawJsonRowItem::Metadata(metadata))) => {
                self.metadata = Some(metadata);
                Ok(None)
            }
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    pub fn metadata(&self) -> Option<&[u8]> {
        self.metadata.as_deref()
    }
}

pub(crate) struct ServiceRequest {
    pub method: http::Method,
    pub path: String,
    pub body: Option<Bytes>,
    pub content_type: Option<String>,
    pub rows_attrib: &'static str,
    pub client_context_id: Option<String>,
    pub endpoint_id: Option<String>,
}

// Executes one row-streaming request against an endpoint picked from the
// component's current set.
pub(crate) async fn execute_service_request<C: Client>(
    http: &HttpComponent<C>,
    req: ServiceRequest,
) -> error::Result<ServiceRows> {
    let method = req.method.clone();
    let path = req.path.clone();
    let body = req.body.clone();
    let content_type = req.content_type.clone();
    let client_context_id = req.client_context_id.clone();
    let rows_attrib = req.rows_attrib;
    let user_agent = http.user_agent().to_string();

    http.orchestrate_endpoint(
        req.endpoint_id,
        move |client, _endpoint_id, endpoint, username, password| {
            let method = method.clone();
            let path = path.clone();
            let body = body.clone();
            let content_type = content_type.clone();
            let client_context_id = client_context_id.clone();
            let user_agent = user_agent.clone();

            async move {
                let uri = format!("{endpoint}{path}");

                let mut request = Request::new(method.clone(), uri)
                    .auth(Auth::BasicAuth(BasicAuth::new(username, password)))
                    .user_agent(user_agent)
                    .unique_id(client_context_id);
                if let Some(content_type) = content_type {
                    request = request.content_type(content_type);
                }
                if let Some(body) = body {
                    request = request.body(body);
                }

                let response = client.execute(request).await.map_err(error::Error::from)?;

                let status = response.status();
                if status != 200 {
                    let body = response.bytes().await.unwrap_or_default();
                    let mut body_prefix = body.to_vec();
                    body_prefix.truncate(ERROR_BODY_PREFIX_LEN);

                    return Err(HttpError::new_server_error(ServerErrorContext {
                        status_code: status,
                        method: method.to_string(),
                        path: path.clone(),
                        endpoint: endpoint.clone(),
                        body_prefix,
                        msg: None,
                    })
                    .into());
                }

                let decoder = crate::httpx::decoder::Decoder::new(response.bytes_stream());
                let mut streamer = RawJsonRowStreamer::new(decoder, rows_attrib);

                let prelude = streamer.read_prelude().await.map_err(error::Error::from)?;

                check_prelude_errors(&prelude, &method, &path, &endpoint)?;

                Ok(ServiceRows {
                    streamer,
                    prelude,
                    metadata: None,
                    endpoint,
                })
            }
        },
    )
    .await
}

// Services report failures inside an otherwise-200 body as a top-level
// "errors" array; surface those as server errors up front.
fn check_prelude_errors(
    prelude: &[u8],
    method: &http::Method,
    path: &str,
    endpoint: &str,
) -> error::Result<()> {
    let parsed: serde_json::Value = match serde_json::from_slice(prelude) {
        Ok(v) => v,
        Err(_) => return Ok(()),
    };

    let errors = match parsed.get("errors").and_then(|e| e.as_array()) {
        Some(errors) if !errors.is_empty() => errors,
        _ => return Ok(()),
    };

    let msg = errors
        .iter()
        .map(|e| {
            format!(
                "{}: {}",
                e.get("code").and_then(|c| c.as_u64()).unwrap_or_default(),
                e.get("msg").and_then(|m| m.as_str()).unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(error::Error::new(ErrorKind::Http(HttpError::new_server_error(
        ServerErrorContext {
            status_code: 200,
            method: method.to_string(),
            path: path.to_string(),
            endpoint: endpoint.to_string(),
            body_prefix: vec![],
            msg: Some(msg),
        },
    ))))
}
