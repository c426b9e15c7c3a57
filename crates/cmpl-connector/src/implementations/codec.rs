//! XML-RPC request and response bodies.

use crate::{RemoteCall, RemoteReply, TransportError};
use cmpl_types::xml::{self, escape_text, XmlElement};
use cmpl_types::RemoteStatus;
use std::fmt::Write;

/// A decoded XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlRpcValue {
	Int(i64),
	Bool(bool),
	Double(f64),
	Str(String),
	Array(Vec<XmlRpcValue>),
	Struct(Vec<(String, XmlRpcValue)>),
}

impl XmlRpcValue {
	fn write(&self, out: &mut String) {
		out.push_str("<value>");
		match self {
			Self::Int(i) => {
				let _ = write!(out, "<int>{}</int>", i);
			}
			Self::Bool(b) => {
				let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
			}
			Self::Double(d) => {
				let _ = write!(out, "<double>{}</double>", d);
			}
			Self::Str(s) => {
				let _ = write!(out, "<string>{}</string>", escape_text(s));
			}
			Self::Array(items) => {
				out.push_str("<array><data>");
				for item in items {
					item.write(out);
				}
				out.push_str("</data></array>");
			}
			Self::Struct(members) => {
				out.push_str("<struct>");
				for (name, value) in members {
					let _ = write!(out, "<member><name>{}</name>", escape_text(name));
					value.write(out);
					out.push_str("</member>");
				}
				out.push_str("</struct>");
			}
		}
		out.push_str("</value>");
	}

	fn read(value: &XmlElement) -> Result<Self, TransportError> {
		let Some(typed) = value.elements().next() else {
			return Ok(Self::Str(value.text()));
		};

		let text = typed.text();
		match typed.name.as_str() {
			"int" | "i4" | "i8" => text
				.trim()
				.parse()
				.map(Self::Int)
				.map_err(|_| TransportError::Decode(format!("invalid integer '{}'", text))),
			"boolean" => Ok(Self::Bool(text.trim() == "1")),
			"double" => text
				.trim()
				.parse()
				.map(Self::Double)
				.map_err(|_| TransportError::Decode(format!("invalid double '{}'", text))),
			"string" => Ok(Self::Str(text)),
			"nil" => Ok(Self::Str(String::new())),
			"array" => {
				let data = typed
					.child("data")
					.ok_or_else(|| TransportError::Decode("array without data".into()))?;
				data.children_named("value")
					.map(Self::read)
					.collect::<Result<Vec<_>, _>>()
					.map(Self::Array)
			}
			"struct" => {
				let mut members = Vec::new();
				for member in typed.children_named("member") {
					let name = member.child_text("name");
					let value = member
						.child("value")
						.ok_or_else(|| TransportError::Decode("member without value".into()))?;
					members.push((name, Self::read(value)?));
				}
				Ok(Self::Struct(members))
			}
			other => Err(TransportError::Decode(format!("unsupported type <{}>", other))),
		}
	}

	fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(i) => Some(*i),
			Self::Str(s) => s.trim().parse().ok(),
			_ => None,
		}
	}

	fn into_text(self) -> String {
		match self {
			Self::Str(s) => s,
			Self::Int(i) => i.to_string(),
			Self::Double(d) => d.to_string(),
			Self::Bool(b) => b.to_string(),
			Self::Array(_) | Self::Struct(_) => String::new(),
		}
	}

	fn member(&self, name: &str) -> Option<&XmlRpcValue> {
		match self {
			Self::Struct(members) => members.iter().find(|(n, _)| n == name).map(|(_, v)| v),
			_ => None,
		}
	}
}

/// Parameters of a call in wire order.
pub fn params(call: &RemoteCall) -> Vec<XmlRpcValue> {
	use XmlRpcValue::{Int, Str};
	match call {
		RemoteCall::GetJobId {
			model_name,
			solver,
			compatibility,
		} => vec![
			Str(model_name.clone()),
			Str(solver.clone()),
			Int(i64::from(*compatibility)),
		],
		RemoteCall::Send { instance } => vec![Str(instance.clone())],
		RemoteCall::SchedulerFailed { worker_url } => vec![Str(worker_url.clone())],
		RemoteCall::Knock { job_id }
		| RemoteCall::GetMessages { job_id }
		| RemoteCall::GetSolutions { job_id }
		| RemoteCall::Cancel { job_id }
		| RemoteCall::RemoveProblem { job_id }
		| RemoteCall::DisconnectFromScheduler { job_id } => vec![Str(job_id.clone())],
	}
}

/// Encodes a `methodCall` document.
pub fn encode_call(call: &RemoteCall) -> String {
	let mut body = String::from("<?xml version=\"1.0\"?>\n<methodCall>");
	let _ = write!(body, "<methodName>{}</methodName><params>", call.method());
	for param in params(call) {
		body.push_str("<param>");
		param.write(&mut body);
		body.push_str("</param>");
	}
	body.push_str("</params></methodCall>\n");
	body
}

/// Decodes a `methodResponse` document into the returned values.
///
/// A returned array is flattened into its items; faults become
/// [`TransportError::Fault`].
pub fn decode_response(body: &str) -> Result<Vec<XmlRpcValue>, TransportError> {
	let root = xml::parse(body).map_err(|e| TransportError::Decode(e.to_string()))?;
	if root.name != "methodResponse" {
		return Err(TransportError::Decode(format!(
			"expected <methodResponse>, found <{}>",
			root.name
		)));
	}

	if let Some(fault) = root.child("fault") {
		let value = fault
			.child("value")
			.ok_or_else(|| TransportError::Decode("fault without value".into()))
			.and_then(XmlRpcValue::read)?;
		return Err(TransportError::Fault {
			code: value.member("faultCode").and_then(XmlRpcValue::as_int).unwrap_or(0),
			message: value
				.member("faultString")
				.cloned()
				.map(XmlRpcValue::into_text)
				.unwrap_or_default(),
		});
	}

	let value = root
		.child("params")
		.and_then(|p| p.child("param"))
		.and_then(|p| p.child("value"))
		.ok_or_else(|| TransportError::Decode("response without value".into()))?;

	match XmlRpcValue::read(value)? {
		XmlRpcValue::Array(items) => Ok(items),
		single => Ok(vec![single]),
	}
}

/// Maps returned values onto `(status, message, payload)`.
pub fn decode_reply(values: Vec<XmlRpcValue>) -> Result<RemoteReply, TransportError> {
	let mut values = values.into_iter();
	let code = values
		.next()
		.and_then(|v| v.as_int())
		.ok_or_else(|| TransportError::Decode("reply without status code".into()))?;
	let message = values.next().map(XmlRpcValue::into_text).unwrap_or_default();
	let payload = values.next().map(XmlRpcValue::into_text).unwrap_or_default();

	Ok(RemoteReply {
		status: RemoteStatus::from_code(code),
		message,
		payload,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_encode_get_job_id() {
		let body = encode_call(&RemoteCall::GetJobId {
			model_name: "diet & co.cmpl".into(),
			solver: "cbc".into(),
			compatibility: 2,
		});
		assert!(body.contains("<methodName>getJobId</methodName>"));
		assert!(body.contains("<value><string>diet &amp; co.cmpl</string></value>"));
		assert!(body.contains("<value><int>2</int></value>"));
	}

	#[test]
	fn test_decode_status_tuple() {
		let body = r#"<?xml version='1.0'?>
<methodResponse>
<params>
<param>
<value><array><data>
<value><int>6</int></value>
<value><string></string></value>
<value><string>job-42</string></value>
</data></array></value>
</param>
</params>
</methodResponse>
"#;
		let reply = decode_reply(decode_response(body).unwrap()).unwrap();
		assert_eq!(reply.status, RemoteStatus::Ok);
		assert_eq!(reply.message, "");
		assert_eq!(reply.payload, "job-42");
	}

	#[test]
	fn test_untyped_values_are_strings() {
		let body = "<methodResponse><params><param><value><array><data>\
			<value><i4>11</i4></value><value>running</value>\
			</data></array></value></param></params></methodResponse>";
		let reply = decode_reply(decode_response(body).unwrap()).unwrap();
		assert_eq!(reply.status, RemoteStatus::Running);
		assert_eq!(reply.message, "running");
		assert_eq!(reply.payload, "");
	}

	#[test]
	fn test_fault_is_transport_error() {
		let body = "<methodResponse><fault><value><struct>\
			<member><name>faultCode</name><value><int>1</int></value></member>\
			<member><name>faultString</name><value><string>boom</string></value></member>\
			</struct></value></fault></methodResponse>";
		assert_eq!(
			decode_response(body).unwrap_err(),
			TransportError::Fault {
				code: 1,
				message: "boom".into()
			}
		);
	}

	#[test]
	fn test_reply_without_status_is_rejected() {
		assert!(decode_reply(vec![]).is_err());
		assert!(decode_reply(vec![XmlRpcValue::Str("x".into())]).is_err());
	}
}
