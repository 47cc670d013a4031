//! Loopback HTTP stand-in for the planning service.

use std::{
    io::{BufRead, BufReader, Read, Write},
    net::{TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
};

use serde_json::{Value, json};

#[derive(Clone, Debug, PartialEq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct ServiceState {
    trains: Vec<Value>,
    manual_overrides: u32,
    requests: Vec<Recorded>,
    failing_path: Option<String>,
}

/// Serves the planning endpoints from memory until the test process exits.
pub struct FakeService {
    base_url: String,
    state: Arc<Mutex<ServiceState>>,
}

impl FakeService {
    pub fn start(trains: Vec<Value>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let state = Arc::new(Mutex::new(ServiceState {
            trains,
            ..ServiceState::default()
        }));
        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&shared);
                thread::spawn(move || handle(stream, &state));
            }
        });
        Self {
            base_url: format!("http://{addr}/api"),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.lock().requests.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|req| format!("{} {}", req.method, req.path))
            .collect()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    /// Answer `path` with HTTP 500 until changed.
    pub fn fail_path(&self, path: Option<&str>) {
        self.lock().failing_path = path.map(str::to_string);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }
}

pub fn train_json(id: &str, fitness: f64, depot: &str, decision: &str, orders: u32) -> Value {
    json!({
        "train_id": id,
        "fitness_score": fitness,
        "depot": depot,
        "final_decision": decision,
        "open_work_orders": orders,
    })
}

fn handle(mut stream: TcpStream, state: &Mutex<ServiceState>) {
    let Some((method, path, body)) = read_request(&stream) else {
        return;
    };
    let (code, payload) = {
        let mut state = state.lock().unwrap_or_else(|err| err.into_inner());
        state.requests.push(Recorded {
            method: method.clone(),
            path: path.clone(),
            body: body.clone(),
        });
        route(&mut state, &method, &path, body)
    };
    let text = payload.to_string();
    let reason = match code {
        200 => "OK",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let response = format!(
        "HTTP/1.1 {code} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{text}",
        text.len()
    );
    let _ = stream.write_all(response.as_bytes());
}

fn read_request(stream: &TcpStream) -> Option<(String, String, Option<Value>)> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;
    let body = serde_json::from_slice(&body).ok();
    Some((method, path, body))
}

fn route(state: &mut ServiceState, method: &str, path: &str, body: Option<Value>) -> (u16, Value) {
    let endpoint = path.trim_start_matches("/api/");
    if state.failing_path.as_deref() == Some(endpoint) {
        return (500, json!({ "detail": format!("{endpoint} exploded") }));
    }
    match (method, endpoint) {
        ("GET", "status") => (
            200,
            json!({
                "status": "running",
                "trains_count": state.trains.len(),
                "ml_model_trained": true,
                "optimization_completed": true,
                "manual_overrides_count": state.manual_overrides,
                "last_update": "2024-05-01T06:30:00",
            }),
        ),
        ("GET", "get_induction_list") => (
            200,
            json!({ "status": "success", "induction_list": state.trains }),
        ),
        ("GET", "refresh_data") | ("POST", "predict_induction") => {
            (200, json!({ "status": "success" }))
        }
        ("POST", "override_train") => {
            let body = body.unwrap_or(Value::Null);
            let train_id = body["train_id"].as_str().unwrap_or_default().to_string();
            let decision = body["decision"].clone();
            let Some(train) = state
                .trains
                .iter_mut()
                .find(|train| train["train_id"] == train_id.as_str())
            else {
                return (404, json!({ "detail": "Train not found" }));
            };
            train["final_decision"] = decision;
            state.manual_overrides += 1;
            (200, json!({ "status": "success" }))
        }
        ("DELETE", "clear_overrides") => {
            state.manual_overrides = 0;
            (200, json!({ "status": "success" }))
        }
        _ => (404, json!({ "detail": "not found" })),
    }
}
