//! One-shot localhost listener for the OAuth redirect.

use tiny_http::{Header, Response, Server};

use crate::error::{AuthError, Result};

const SUCCESS_HTML: &str = "<html><body><h1>Authentication complete</h1>\
    <p>The authentication flow has completed. You may close this window.</p></body></html>";
const ERROR_HTML: &str = "<html><body><h1>Authentication failed</h1>\
    <p>You may close this window and run gmail-token again.</p></body></html>";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackPayload {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// A bound loopback listener. The port is released when this is dropped.
pub struct CallbackListener {
    server: Server,
    port: u16,
}

impl CallbackListener {
    /// Bind `addr:port`. Port 0 asks the OS for an ephemeral port.
    pub fn bind(addr: &str, port: u16) -> Result<Self> {
        let target = if addr.contains(':') {
            format!("[{}]:{}", addr, port)
        } else {
            format!("{}:{}", addr, port)
        };
        let server = Server::http(target.as_str()).map_err(|e| AuthError::Bind {
            addr: target.clone(),
            reason: e.to_string(),
        })?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|a| a.port())
            .ok_or_else(|| AuthError::Bind {
                addr: target.clone(),
                reason: "listener has no IP address".to_string(),
            })?;
        tracing::debug!(port, "callback listener bound");
        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Block until the redirect arrives.
    ///
    /// Requests without `code`, `error` or `state` (favicon probes and the
    /// like) get a 404 and are skipped. There is no timeout.
    pub fn wait(&self) -> Result<CallbackPayload> {
        loop {
            let request = self.server.recv()?;
            let Some(payload) = parse_callback_target(request.url()) else {
                tracing::debug!(url = %request.url(), "ignoring non-callback request");
                let _ = request.respond(Response::from_string("Not found").with_status_code(404));
                continue;
            };

            let failed = payload.error.is_some() || payload.code.is_none();
            let (body, status) = if failed {
                (ERROR_HTML, 400)
            } else {
                (SUCCESS_HTML, 200)
            };
            let mut response = Response::from_string(body).with_status_code(status);
            if let Ok(header) = "Content-Type: text/html; charset=utf-8".parse::<Header>() {
                response = response.with_header(header);
            }
            if let Err(e) = request.respond(response) {
                tracing::warn!("could not answer browser on callback: {}", e);
            }
            return Ok(payload);
        }
    }
}

/// Parse the request target of a redirect (`/?code=...&state=...`).
///
/// Returns None when the target carries none of the callback parameters.
pub fn parse_callback_target(target: &str) -> Option<CallbackPayload> {
    let url = url::Url::parse("http://localhost/").ok()?.join(target).ok()?;
    let mut payload = CallbackPayload::default();
    for (key, value) in url.query_pairs() {
        let value = value.into_owned();
        match key.as_ref() {
            "code" => payload.code = Some(value),
            "state" => payload.state = Some(value),
            "error" => payload.error = Some(value),
            "error_description" => payload.error_description = Some(value),
            _ => {}
        }
    }
    if payload == CallbackPayload::default() {
        return None;
    }
    Some(payload)
}
