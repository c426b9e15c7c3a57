//! XML-RPC over HTTP transport.

use super::codec;
use crate::{EndpointKind, RemoteCall, RemoteReply, ServiceFactory, ServiceInterface, TransportError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// XML-RPC endpoint reached with a shared `reqwest` client.
pub struct XmlRpcService {
	url: String,
	kind: EndpointKind,
	client: reqwest::Client,
}

impl XmlRpcService {
	pub fn new(url: &str, kind: EndpointKind, client: reqwest::Client) -> Result<Self, TransportError> {
		let parsed =
			reqwest::Url::parse(url).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e)))?;
		if !matches!(parsed.scheme(), "http" | "https") {
			return Err(TransportError::InvalidUrl(format!(
				"{}: unsupported scheme {}",
				url,
				parsed.scheme()
			)));
		}
		Ok(Self {
			url: url.to_string(),
			kind,
			client,
		})
	}
}

#[async_trait]
impl ServiceInterface for XmlRpcService {
	fn url(&self) -> &str {
		&self.url
	}

	fn kind(&self) -> EndpointKind {
		self.kind
	}

	async fn invoke(&self, call: &RemoteCall) -> Result<RemoteReply, TransportError> {
		let body = codec::encode_call(call);

		let response = self
			.client
			.post(&self.url)
			.header(reqwest::header::CONTENT_TYPE, "text/xml")
			.body(body)
			.send()
			.await
			.map_err(|e| TransportError::Http(e.to_string()))?;

		if !response.status().is_success() {
			return Err(TransportError::Status(response.status().as_u16()));
		}

		let text = response
			.text()
			.await
			.map_err(|e| TransportError::Http(e.to_string()))?;

		let reply = codec::decode_reply(codec::decode_response(&text)?)?;
		debug!(method = call.method(), status = %reply.status, "remote reply");
		Ok(reply)
	}
}

/// Factory handing out [`XmlRpcService`] endpoints that share one client.
#[derive(Clone)]
pub struct XmlRpcFactory {
	client: reqwest::Client,
}

impl XmlRpcFactory {
	pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
		let client = reqwest::Client::builder()
			.timeout(request_timeout)
			.build()
			.map_err(|e| TransportError::Http(format!("Failed to create HTTP client: {}", e)))?;
		Ok(Self { client })
	}
}

impl ServiceFactory for XmlRpcFactory {
	fn endpoint(
		&self,
		url: &str,
		kind: EndpointKind,
	) -> Result<Arc<dyn ServiceInterface>, TransportError> {
		Ok(Arc::new(XmlRpcService::new(url, kind, self.client.clone())?))
	}
}

/// Factory function creating the default transport.
pub fn create_factory(request_timeout: Duration) -> Result<Arc<dyn ServiceFactory>, TransportError> {
	Ok(Arc::new(XmlRpcFactory::new(request_timeout)?))
}
