//! In-memory backend used by the integration tests.
//!
//! Serves a small course/document catalogue through the [`Transport`] seam,
//! records every request it sees and lets a test hold or delay responses
//! per route to stage races deterministically.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use edudash::api::catalogue;
use edudash::cache::{CacheConfig, QueryClient};
use edudash::error::ApiError;
use edudash::transport::{RequestDescriptor, Transport, TransportResponse};
use reqwest::Method;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

#[derive(Default)]
struct Catalogue {
    courses: Vec<Value>,
    documents: Vec<Value>,
    next_course_id: i64,
}

#[derive(Default)]
pub struct FakeBackend {
    data: Mutex<Catalogue>,
    calls: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    delays: Mutex<HashMap<String, VecDeque<Duration>>>,
    failures: Mutex<HashMap<String, VecDeque<(u16, String)>>>,
}

impl FakeBackend {
    /// `course_count` courses (ids 1..=n) and documents 41 and 42.
    pub fn seeded(course_count: i64) -> Arc<Self> {
        let backend = Self::default();
        {
            let mut data = backend.data.lock().unwrap();
            // Newest first, like the real listing.
            data.courses = (1..=course_count)
                .rev()
                .map(|id| json!({ "id": id, "title": format!("Course {id}"), "status": "published" }))
                .collect();
            data.next_course_id = course_count + 1;
            data.documents = vec![
                json!({ "id": 41, "title": "Syllabus", "courseId": 1, "fileType": "pdf" }),
                json!({ "id": 42, "title": "Slides", "courseId": 1, "fileType": "pptx" }),
            ];
        }
        Arc::new(backend)
    }

    pub fn client(self: &Arc<Self>, config: CacheConfig) -> QueryClient {
        QueryClient::new(
            catalogue().expect("catalogue"),
            Arc::clone(self) as Arc<dyn Transport>,
            config,
        )
    }

    /// Number of requests seen for `"METHOD path"`.
    pub fn calls(&self, route: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.as_str() == route)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Block requests to `route` until [`release`](Self::release) is called.
    pub fn hold(&self, route: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(route.to_string(), Arc::new(Semaphore::new(0)));
    }

    /// Let `count` held requests to `route` through, in arrival order.
    pub fn release(&self, route: &str, count: usize) {
        if let Some(gate) = self.gates.lock().unwrap().get(route) {
            gate.add_permits(count);
        }
    }

    /// Deliver the next response for `route` late. The response body is
    /// computed before the delay, like a slow network after a fast server.
    pub fn delay_next(&self, route: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_default()
            .push_back(delay);
    }

    /// Answer the next request to `route` with an HTTP error.
    pub fn fail_next(&self, route: &str, status: u16, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_default()
            .push_back((status, message.to_string()));
    }

    pub fn rename_course(&self, id: i64, title: &str) {
        let mut data = self.data.lock().unwrap();
        if let Some(course) = data.courses.iter_mut().find(|course| course["id"] == id) {
            course["title"] = json!(title);
        }
    }

    pub fn course_total(&self) -> usize {
        self.data.lock().unwrap().courses.len()
    }

    fn route(&self, request: &RequestDescriptor) -> Result<Value, (u16, String)> {
        let mut data = self.data.lock().unwrap();
        let segments: Vec<&str> = request.path.split('/').collect();
        match (&request.method, segments.as_slice()) {
            (&Method::GET, ["courses"]) => Ok(course_page(&data.courses, &request.query)),
            (&Method::GET, ["courses", "stats"]) => Ok(json!({
                "total": data.courses.len(),
            })),
            (&Method::GET, ["courses", id]) => find(&data.courses, id, "Course"),
            (&Method::POST, ["courses"]) => {
                let id = data.next_course_id;
                data.next_course_id += 1;
                let mut course = request.body.clone().unwrap_or_else(|| json!({}));
                course["id"] = json!(id);
                data.courses.insert(0, course.clone());
                Ok(course)
            }
            (&Method::PUT, ["courses", id]) => {
                let id = parse_id(id)?;
                let course = data
                    .courses
                    .iter_mut()
                    .find(|course| course["id"] == id)
                    .ok_or_else(|| not_found("Course"))?;
                if let (Some(target), Some(Value::Object(changes))) =
                    (course.as_object_mut(), request.body.clone())
                {
                    target.extend(changes);
                }
                Ok(course.clone())
            }
            (&Method::DELETE, ["courses", id]) => {
                remove(&mut data.courses, id, "Course").map(|()| Value::Null)
            }
            (&Method::GET, ["documents", id]) => find(&data.documents, id, "Document"),
            (&Method::DELETE, ["documents", id]) => {
                remove(&mut data.documents, id, "Document").map(|()| Value::Null)
            }
            (&Method::GET, ["analytics", "overview"]) => Ok(json!({
                "totalUsers": 120,
                "totalCourses": data.courses.len(),
            })),
            _ => Err((404, format!("no route for {} {}", request.method, request.path))),
        }
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: &RequestDescriptor) -> Result<TransportResponse, ApiError> {
        let route = format!("{} {}", request.method, request.path);
        self.calls.lock().unwrap().push(route.clone());

        let gate = self.gates.lock().unwrap().get(&route).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate open").forget();
        }

        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&route)
            .and_then(VecDeque::pop_front);
        let outcome = match failure {
            Some(failure) => Err(failure),
            None => self.route(request),
        };

        let delay = self
            .delays
            .lock()
            .unwrap()
            .get_mut(&route)
            .and_then(VecDeque::pop_front);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match outcome {
            Ok(data) => Ok(TransportResponse {
                status: 200,
                body: json!({ "success": true, "message": "", "data": data }),
            }),
            Err((status, message)) => Err(ApiError::Http {
                status,
                data: json!({ "success": false, "message": message }),
            }),
        }
    }
}

fn course_page(courses: &[Value], query: &[(String, String)]) -> Value {
    let param = |name: &str, default: usize| {
        query
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.parse().ok())
            .unwrap_or(default)
    };
    let page = param("page", 1).max(1);
    let limit = param("limit", 10).max(1);
    let total = courses.len();
    let items: Vec<Value> = courses
        .iter()
        .skip((page - 1) * limit)
        .take(limit)
        .cloned()
        .collect();
    json!({
        "courses": items,
        "total": total,
        "currentPage": page,
        "totalPages": total.div_ceil(limit),
    })
}

fn parse_id(raw: &str) -> Result<i64, (u16, String)> {
    raw.parse()
        .map_err(|_| (400, format!("invalid id `{raw}`")))
}

fn not_found(kind: &str) -> (u16, String) {
    (404, format!("{kind} not found"))
}

fn find(items: &[Value], raw: &str, kind: &str) -> Result<Value, (u16, String)> {
    let id = parse_id(raw)?;
    items
        .iter()
        .find(|item| item["id"] == id)
        .cloned()
        .ok_or_else(|| not_found(kind))
}

fn remove(items: &mut Vec<Value>, raw: &str, kind: &str) -> Result<(), (u16, String)> {
    let id = parse_id(raw)?;
    let before = items.len();
    items.retain(|item| item["id"] != id);
    if items.len() == before {
        return Err(not_found(kind));
    }
    Ok(())
}
