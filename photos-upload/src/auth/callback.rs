//! Loopback redirect server for the installed-app OAuth flow
//!
//! Listens on 127.0.0.1 with a random port, captures the first
//! `?code=...&state=...` redirect and answers with a small HTML page.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, oneshot};

/// Authorization code and state returned by the consent screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub state: String,
}

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<Result<AuthorizationCode, String>>>>>;

/// State for an active OAuth callback server
pub struct OAuthCallbackServer {
    port: u16,
    code_rx: oneshot::Receiver<Result<AuthorizationCode, String>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl OAuthCallbackServer {
    /// Redirect URI to register in the authorization request
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.port)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the redirect; the server stops once this returns.
    pub async fn wait_for_callback(mut self) -> Result<AuthorizationCode, String> {
        let result = (&mut self.code_rx)
            .await
            .map_err(|_| "Callback cancelled".to_string())?;
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        result
    }
}

/// Start the loopback callback server
pub async fn start_callback_server() -> Result<OAuthCallbackServer, String> {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind callback server: {}", e))?;

    let port = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?
        .port();

    let (code_tx, code_rx) = oneshot::channel();
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let code_tx: CallbackSender = Arc::new(Mutex::new(Some(code_tx)));

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    break;
                }
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let code_tx = code_tx.clone();
                            tokio::spawn(async move {
                                handle_callback(stream, code_tx).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }
    });

    Ok(OAuthCallbackServer {
        port,
        code_rx,
        shutdown_tx: Some(shutdown_tx),
    })
}

/// Parse `GET /callback?code=..&state=.. HTTP/1.1`
pub fn parse_callback_request(request_line: &str) -> Result<AuthorizationCode, String> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| "Malformed request line".to_string())?;

    let query = target.split_once('?').map(|(_, q)| q).unwrap_or("");

    let mut code = None;
    let mut state = None;
    let mut error = None;

    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match key {
                "code" => code = Some(value),
                "state" => state = Some(value),
                "error" => error = Some(value),
                _ => {}
            }
        }
    }

    if let Some(err) = error {
        return Err(format!("OAuth error: {}", err));
    }
    match (code, state) {
        (Some(code), Some(state)) => Ok(AuthorizationCode { code, state }),
        _ => Err("Missing code or state parameter".to_string()),
    }
}

async fn handle_callback(mut stream: TcpStream, code_tx: CallbackSender) {
    let mut request_line = String::new();
    {
        let mut reader = BufReader::new(&mut stream);
        if reader.read_line(&mut request_line).await.is_err() {
            return;
        }
    }

    // Browsers also ask for /favicon.ico; only the redirect path counts
    if !request_line.contains("/callback") {
        let _ = stream
            .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .await;
        return;
    }

    let result = parse_callback_request(&request_line);
    let is_success = result.is_ok();

    if let Some(tx) = code_tx.lock().await.take() {
        let _ = tx.send(result);
    }

    let (status, body) = if is_success {
        (
            "200 OK",
            "<!DOCTYPE html><html><head><title>photos-upload</title></head>\
             <body><h1>Authentication successful</h1>\
             <p>You can close this window and return to the terminal.</p></body></html>",
        )
    } else {
        (
            "400 Bad Request",
            "<!DOCTYPE html><html><head><title>photos-upload</title></head>\
             <body><h1>Authentication failed</h1>\
             <p>Check the terminal for details and try again.</p></body></html>",
        )
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );

    let _ = stream.write_all(response.as_bytes()).await;
}
