//! Verify client operations against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected results. Requests are captured by a closure transport that
//! answers with the simulated response. Bodies are compared as parsed JSON so
//! field order does not matter.

use std::cell::RefCell;
use std::rc::Rc;

use agenda_core::{
    AgendaClient, ApiError, Career, CareerInput, GroupFilter, HttpMethod, HttpRequest,
    HttpResponse, InvitationFilter, MemberFilter, MemoryStorage, Transport, UserFilter,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:3001/api";

type Seen = Rc<RefCell<Vec<HttpRequest>>>;

/// Client whose transport records each request and answers `response`.
fn scripted(response: HttpResponse) -> (AgendaClient<impl Transport>, Seen) {
    let seen: Seen = Rc::default();
    let log = Rc::clone(&seen);
    let transport = move |req: &HttpRequest| -> Result<HttpResponse, ApiError> {
        log.borrow_mut().push(req.clone());
        Ok(response.clone())
    };
    (AgendaClient::new(BASE_URL, transport, MemoryStorage::new()), seen)
}

fn simulated(sim: &Value) -> HttpResponse {
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.path, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: path");

    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(req.headers, expected_headers, "{name}: headers");

    match &expected["body"] {
        Value::Null => assert!(req.body.is_none(), "{name}: body should be None"),
        body => {
            let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&sent, body, "{name}: body");
        }
    }
}

fn assert_http_error(name: &str, err: ApiError, expected: &Value) {
    match err {
        ApiError::Http { status, message } => {
            assert_eq!(u64::from(status), expected["status"].as_u64().unwrap(), "{name}: status");
            assert_eq!(message, expected["message"].as_str().unwrap(), "{name}: message");
        }
        other => panic!("{name}: expected Http error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[test]
fn create_career_vectors() {
    let raw = include_str!("../../test-vectors/create_career.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let token = vectors["session_token"].as_str().unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input: CareerInput = serde_json::from_value(case["input"].clone()).unwrap();

        let (c, seen) = scripted(simulated(&case["simulated_response"]));
        c.session().set_token(token).unwrap();
        let result = c.careers().create(&input);

        assert_eq!(seen.borrow().len(), 1, "{name}: one round-trip");
        assert_request(name, &seen.borrow()[0], &case["expected_request"]);

        if let Some(expected_error) = case.get("expected_error") {
            assert_http_error(name, result.unwrap_err(), expected_error);
        } else {
            let career = result.unwrap().into_result().unwrap();
            let expected: Career = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(career, expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// List queries
// ---------------------------------------------------------------------------

#[test]
fn list_query_vectors() {
    let raw = include_str!("../../test-vectors/list_queries.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let response = simulated(&vectors["simulated_response"]);

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let filter = case["filter"].clone();

        let (c, seen) = scripted(response.clone());
        c.session().set_token("session-token").unwrap();
        let pagination = match case["resource"].as_str().unwrap() {
            "usuarios" => {
                let f: UserFilter = serde_json::from_value(filter).unwrap();
                c.users().list_by(&f).unwrap().pagination
            }
            "grupos" => {
                let f: GroupFilter = serde_json::from_value(filter).unwrap();
                c.groups().list_by(&f).unwrap().pagination
            }
            "miembros" => {
                let f: MemberFilter = serde_json::from_value(filter).unwrap();
                c.members().list_by(&f).unwrap().pagination
            }
            "invitaciones" => {
                let f: InvitationFilter = serde_json::from_value(filter).unwrap();
                c.invitations().list_by(&f).unwrap().pagination
            }
            other => panic!("{name}: unknown resource {other}"),
        };

        let req = &seen.borrow()[0];
        assert_eq!(req.method, HttpMethod::Get, "{name}: method");
        assert_eq!(
            req.path,
            format!("{BASE_URL}{}", case["expected_path"].as_str().unwrap()),
            "{name}: path"
        );
        assert!(req.body.is_none(), "{name}: body should be None");
        assert_eq!(pagination.map(|p| p.total), Some(0), "{name}: pagination");
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[test]
fn auth_vectors() {
    let raw = include_str!("../../test-vectors/auth.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let (c, seen) = scripted(simulated(&case["simulated_response"]));
        if let Some(stored) = case["stored_token"].as_str() {
            c.session().set_token(stored).unwrap();
        }

        let error = match case["operation"].as_str().unwrap() {
            "login" => c.login(case["input"].as_str().unwrap()).err(),
            "logout" => c.logout().err(),
            other => panic!("{name}: unknown operation {other}"),
        };

        assert_request(name, &seen.borrow()[0], &case["expected_request"]);
        match (case.get("expected_error"), error) {
            (Some(expected), Some(err)) => assert_http_error(name, err, expected),
            (None, None) => {}
            (expected, got) => panic!("{name}: expected error {expected:?}, got {got:?}"),
        }
        assert_eq!(
            c.session().token().unwrap().as_deref(),
            case["expected_token"].as_str(),
            "{name}: stored token"
        );
    }
}
