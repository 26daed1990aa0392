#![allow(dead_code)]

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// Minimal parsed HTTP/1.1 response.
    #[derive(Debug)]
    pub struct RawResponse {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl RawResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Send `request` verbatim on a fresh connection and read until close.
    pub fn send_request(addr: SocketAddr, request: &str) -> RawResponse {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream.write_all(request.as_bytes()).unwrap();

        let mut raw = Vec::new();
        let _ = stream.read_to_end(&mut raw);
        parse_response(&String::from_utf8_lossy(&raw))
    }

    /// Build a request with `Connection: close` so the server ends the stream.
    pub fn request(method: &str, path: &str, headers: &[(&str, &str)], body: &str) -> String {
        let mut out = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n");
        for (name, value) in headers {
            out.push_str(&format!("{name}: {value}\r\n"));
        }
        if !body.is_empty() {
            out.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        out.push_str("\r\n");
        out.push_str(body);
        out
    }

    fn parse_response(raw: &str) -> RawResponse {
        let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        RawResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }
}

pub mod fixtures {
    use cardikit::router::Params;
    use cardikit::server::{Request, Response};
    use cardikit::middleware::Gate;
    use std::sync::{Arc, Mutex};

    /// Gate that records its name and returns a fixed verdict. A rejecting
    /// recorder writes `403 {"error":"<name> rejected"}`.
    pub struct Recorder {
        pub name: &'static str,
        pub pass: bool,
        pub log: Arc<Mutex<Vec<String>>>,
    }

    impl Gate for Recorder {
        fn handle(&self, _req: &Request, res: &mut Response) -> bool {
            self.log.lock().unwrap().push(self.name.to_string());
            if !self.pass {
                res.reject(403, &format!("{} rejected", self.name));
            }
            self.pass
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    pub fn recorder(name: &'static str, pass: bool, log: &Arc<Mutex<Vec<String>>>) -> Arc<Recorder> {
        Arc::new(Recorder {
            name,
            pass,
            log: Arc::clone(log),
        })
    }

    /// Parameter values in order, for assertions.
    pub fn values(params: &Params) -> Vec<String> {
        params.values().map(str::to_string).collect()
    }
}
