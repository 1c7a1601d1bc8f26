use std::collections::HashMap;
use std::sync::Arc;

use colored::*;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use crate::config::LensConfig;
use crate::error::{LensError, Result};
use crate::render::{render_timeline_svg, ParsedReasoning, SvgLayout};
use crate::timeline::TimelineParser;
use crate::tree::TreeParser;

const MAX_HEADER_BYTES: usize = 16 * 1024;

/// Single page: paste reasoning text, see the timeline SVG and the tree.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>thought-lens</title>
<style>
body{background:#0d1117;color:#c9d1d9;font:14px/1.5 system-ui,sans-serif;margin:0;padding:24px}
textarea{width:100%;height:180px;background:#161b22;color:inherit;border:1px solid #30363d;border-radius:6px;padding:8px;font-family:ui-monospace,monospace}
button,select{background:#21262d;color:inherit;border:1px solid #30363d;border-radius:6px;padding:6px 12px;margin:8px 8px 8px 0}
#svg{overflow:auto;border:1px solid #30363d;border-radius:6px;margin-top:12px}
ul{list-style:none;padding-left:18px}
.premise{color:#58a6ff}.reasoning{color:#c9d1d9}.evidence{color:#3fb950}.conclusion{color:#a371f7}.alternative{color:#f0883e}
</style>
</head>
<body>
<h1>thought-lens</h1>
<textarea id="text" placeholder="Paste reasoning text"></textarea>
<div>
<select id="mode"><option value="flat">Timeline</option><option value="perspective">Graph</option></select>
<button id="go">Parse</button>
</div>
<div id="svg"></div>
<h2>Thought tree</h2>
<div id="tree"></div>
<script>
const $=s=>document.querySelector(s);
function node(n){
  const li=document.createElement('li');
  li.textContent=n.content;
  if(n.type)li.className=n.type;
  if(n.children&&n.children.length){
    const ul=document.createElement('ul');
    n.children.forEach(c=>ul.appendChild(node(c)));
    li.appendChild(ul);
  }
  return li;
}
async function run(){
  const body=$('#text').value;
  const svg=await fetch('/api/timeline.svg?mode='+$('#mode').value,{method:'POST',body});
  $('#svg').innerHTML=await svg.text();
  const res=await fetch('/api/parse',{method:'POST',body});
  const data=await res.json();
  const ul=document.createElement('ul');
  if(data.tree)ul.appendChild(node(data.tree));
  $('#tree').replaceChildren(ul);
}
let timer;
$('#text').addEventListener('input',()=>{clearTimeout(timer);timer=setTimeout(run,100);});
$('#go').onclick=run;
$('#mode').onchange=run;
</script>
</body>
</html>"##;

/// Percent-decoding for URL query parameters. Escapes are decoded as UTF-8
/// bytes; malformed escapes are kept literally.
pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let byte = s
                    .get(i + 1..i + 3)
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match byte {
                    Some(b) => {
                        out.push(b);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse query string into key-value pairs.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let val = parts.next().unwrap_or("");
            Some((key.to_string(), url_decode(val)))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: String,
}

impl Request {
    /// Parse the request line and split path from query. `None` when the
    /// request line is malformed.
    pub fn from_head(head: &str, body: String) -> Option<Self> {
        let first_line = head.lines().next()?;
        let mut parts = first_line.split_whitespace();
        let method = parts.next()?.to_string();
        let target = parts.next()?;
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        Some(Request { method, path: path.to_string(), query: parse_query(query), body })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn ok(content_type: &'static str, body: String) -> Self {
        Response { status: 200, content_type, body }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        #[derive(Serialize)]
        struct ErrorBody {
            error: String,
        }
        let body = serde_json::to_string(&ErrorBody { error: message.into() })
            .unwrap_or_else(|_| r#"{"error":"internal"}"#.to_string());
        Response { status, content_type: "application/json", body }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            413 => "Payload Too Large",
            _ => "Internal Server Error",
        }
    }

    pub fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len(),
            self.body,
        )
    }
}

/// Stateless parsers shared by every connection.
pub struct Handler {
    timeline: TimelineParser,
    tree: TreeParser,
}

impl Handler {
    pub fn new(config: &LensConfig) -> Self {
        Handler {
            timeline: TimelineParser::new(config.timeline.clone())
                .with_input_limit(config.limits.max_input_bytes),
            tree: TreeParser::new(config.tree.clone()).with_input_limit(config.limits.max_input_bytes),
        }
    }

    pub fn route(&self, req: &Request) -> Response {
        match (req.method.as_str(), req.path.as_str()) {
            ("GET", "/") => Response::ok("text/html; charset=utf-8", INDEX_HTML.to_string()),
            ("POST", "/api/parse") => self.parse(&req.body),
            ("POST", "/api/timeline.svg") => {
                let layout = req
                    .query
                    .get("mode")
                    .map_or(SvgLayout::Flat, |m| SvgLayout::from_str_loose(m));
                self.svg(&req.body, layout)
            }
            (_, "/" | "/api/parse" | "/api/timeline.svg") => Response::error(405, "method not allowed"),
            _ => Response::error(404, "not found"),
        }
    }

    fn parse(&self, text: &str) -> Response {
        let result = self.timeline.parse(text).and_then(|points| {
            let tree = self.tree.parse(text)?;
            crate::render::to_json(&ParsedReasoning { timeline: &points, tree: Some(&tree) })
        });
        match result {
            Ok(json) => Response::ok("application/json", json),
            Err(e) => error_response(&e),
        }
    }

    fn svg(&self, text: &str, layout: SvgLayout) -> Response {
        match self.timeline.parse(text) {
            Ok(points) => Response::ok("image/svg+xml", render_timeline_svg(&points, layout)),
            Err(e) => error_response(&e),
        }
    }
}

fn error_response(e: &LensError) -> Response {
    match e {
        LensError::InputTooLarge { .. } => Response::error(413, e.to_string()),
        _ => Response::error(500, e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Start the web view and open the browser.
pub async fn serve(port: u16, config: &LensConfig) -> Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    eprintln!("{}", format!("  Web view running at http://localhost:{}", port).bright_green());
    eprintln!("{}", "  Press Ctrl+C to stop.".bright_blue());

    #[cfg(target_os = "windows")]
    {
        let _ = std::process::Command::new("cmd")
            .args(["/C", &format!("start http://localhost:{}", port)])
            .spawn();
    }
    #[cfg(target_os = "macos")]
    {
        let _ = std::process::Command::new("open").arg(format!("http://localhost:{}", port)).spawn();
    }
    #[cfg(target_os = "linux")]
    {
        let _ = std::process::Command::new("xdg-open")
            .arg(format!("http://localhost:{}", port))
            .spawn();
    }

    run(listener, config).await
}

/// Accept loop on an already bound listener.
pub async fn run(listener: TcpListener, config: &LensConfig) -> Result<()> {
    let handler = Arc::new(Handler::new(config));
    let max_body = config.limits.max_input_bytes;
    loop {
        let (stream, addr) = listener.accept().await?;
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &handler, max_body).await {
                warn!(peer = %addr, error = %e, "connection error");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, handler: &Handler, max_body: usize) -> Result<()> {
    let response = match read_request(&mut stream, max_body).await? {
        Ok(req) => {
            debug!(method = %req.method, path = %req.path, bytes = req.body.len(), "request");
            handler.route(&req)
        }
        Err(rejected) => rejected,
    };
    stream.write_all(response.to_http().as_bytes()).await?;
    Ok(())
}

/// Read head and `Content-Length` body. The inner `Err` is a response to
/// send back instead of routing.
async fn read_request(
    stream: &mut TcpStream,
    max_body: usize,
) -> Result<std::result::Result<Request, Response>> {
    let mut buf = Vec::with_capacity(8192);
    let mut chunk = [0u8; 8192];

    let head_end = loop {
        if let Some(pos) = find_head_end(&buf) {
            break pos;
        }
        if buf.len() > MAX_HEADER_BYTES {
            return Ok(Err(Response::error(400, "header too large")));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(Err(Response::error(400, "incomplete request")));
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let length = content_length(&head).unwrap_or(0);
    if length > max_body {
        return Ok(Err(Response::error(
            413,
            LensError::InputTooLarge { len: length, max: max_body }.to_string(),
        )));
    }

    let mut body = buf.split_off(head_end + 4);
    while body.len() < length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(length);

    let body = String::from_utf8_lossy(&body).into_owned();
    Ok(Request::from_head(&head, body).ok_or_else(|| Response::error(400, "malformed request line")))
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(head: &str) -> Option<usize> {
    head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(path: &str, body: &str) -> Request {
        Request::from_head(&format!("POST {} HTTP/1.1\r\nHost: x", path), body.to_string()).unwrap()
    }

    // -- url_decode / parse_query --

    #[test]
    fn test_url_decode_basic() {
        assert_eq!(url_decode("hello+world"), "hello world");
        assert_eq!(url_decode("hello%20world"), "hello world");
        assert_eq!(url_decode("a%26b"), "a&b");
        assert_eq!(url_decode(""), "");
    }

    #[test]
    fn test_url_decode_multibyte_and_malformed() {
        assert_eq!(url_decode("caf%C3%A9"), "café");
        assert_eq!(url_decode("%E2%86%92"), "→");
        assert_eq!(url_decode("100%"), "100%");
        assert_eq!(url_decode("%zz1"), "%zz1");
    }

    #[test]
    fn test_parse_query_basic() {
        let params = parse_query("mode=perspective&x=a+b");
        assert_eq!(params.get("mode").map(|s| s.as_str()), Some("perspective"));
        assert_eq!(params.get("x").map(|s| s.as_str()), Some("a b"));
    }

    #[test]
    fn test_parse_query_empty() {
        assert!(parse_query("").is_empty());
    }

    // -- request parsing --

    #[test]
    fn test_request_from_head_splits_query() {
        let req = Request::from_head("POST /api/timeline.svg?mode=flat HTTP/1.1\r\n", String::new()).unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/api/timeline.svg");
        assert_eq!(req.query.get("mode").map(|s| s.as_str()), Some("flat"));
    }

    #[test]
    fn test_request_from_head_malformed() {
        assert!(Request::from_head("GARBAGE", String::new()).is_none());
        assert!(Request::from_head("", String::new()).is_none());
    }

    #[test]
    fn test_content_length_case_insensitive() {
        assert_eq!(content_length("POST / HTTP/1.1\r\ncontent-length: 12\r\n"), Some(12));
        assert_eq!(content_length("GET / HTTP/1.1\r\n"), None);
    }

    // -- routing --

    #[test]
    fn test_index_served() {
        let handler = Handler::new(&LensConfig::default());
        let req = Request::from_head("GET / HTTP/1.1", String::new()).unwrap();
        let res = handler.route(&req);
        assert_eq!(res.status, 200);
        assert!(res.body.contains("thought-lens"));
    }

    #[test]
    fn test_parse_endpoint_returns_both_structures() {
        let handler = Handler::new(&LensConfig::default());
        let res = handler.route(&post("/api/parse", "# Premise\nCats are mammals.\n\n# Conclusion\nFeed them."));
        assert_eq!(res.status, 200);
        let v: serde_json::Value = serde_json::from_str(&res.body).unwrap();
        assert_eq!(v["timeline"][0]["type"], "premise");
        assert_eq!(v["timeline"][1]["connections"][0], "point-0");
        assert_eq!(v["tree"]["id"], "root");
        assert_eq!(v["tree"]["content"], "Thought Process");
    }

    #[test]
    fn test_svg_endpoint_mode() {
        let handler = Handler::new(&LensConfig::default());
        let text = "# Premise\nA.\n\n# Conclusion\nB.";
        let flat = handler.route(&post("/api/timeline.svg", text));
        assert_eq!(flat.content_type, "image/svg+xml");
        assert!(flat.body.contains("<line"));
        let curved = handler.route(&post("/api/timeline.svg?mode=perspective", text));
        assert!(curved.body.contains("<path"));
    }

    #[test]
    fn test_input_limit_maps_to_413() {
        let mut config = LensConfig::default();
        config.limits.max_input_bytes = 8;
        let handler = Handler::new(&config);
        let res = handler.route(&post("/api/parse", "way more than eight bytes"));
        assert_eq!(res.status, 413);
        assert!(res.to_http().starts_with("HTTP/1.1 413 Payload Too Large"));
    }

    #[test]
    fn test_unknown_path_and_wrong_method() {
        let handler = Handler::new(&LensConfig::default());
        assert_eq!(handler.route(&post("/nope", "")).status, 404);
        let get = Request::from_head("GET /api/parse HTTP/1.1", String::new()).unwrap();
        assert_eq!(handler.route(&get).status, 405);
    }

    #[test]
    fn test_response_to_http_has_length() {
        let res = Response::ok("text/plain", "hello".to_string());
        let http = res.to_http();
        assert!(http.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(http.contains("Content-Length: 5\r\n"));
        assert!(http.ends_with("\r\n\r\nhello"));
    }

    // -- end to end over a socket --

    #[tokio::test]
    async fn test_server_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = run(listener, &LensConfig::default()).await;
        });

        let body = "First idea about cats.\n\nTherefore cats need protein.";
        let mut sock = TcpStream::connect(addr).await.unwrap();
        let req = format!(
            "POST /api/parse HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        sock.write_all(req.as_bytes()).await.unwrap();
        let mut out = String::new();
        sock.read_to_string(&mut out).await.unwrap();

        assert!(out.starts_with("HTTP/1.1 200 OK"));
        let json = out.split("\r\n\r\n").nth(1).unwrap();
        let v: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(v["timeline"].as_array().unwrap().len(), 2);
        assert_eq!(v["timeline"][1]["type"], "conclusion");
    }
}
