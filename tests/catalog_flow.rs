//! End-to-end catalog behavior against a mock server: load, merge, sort,
//! filter, paginate.

use labhub::api::ApiClient;
use labhub::catalog::{load_catalog, CatalogView, PAGE_SIZE};
use labhub::session::SessionStore;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(name: &str, uri: &str) -> ApiClient {
    let dir = std::env::temp_dir().join(format!("labhub_catalog_it_{}", name));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    ApiClient::new(uri, SessionStore::open(&dir)).unwrap()
}

#[tokio::test]
async fn full_load_merges_topics_and_survives_partial_failures() {
    let server = MockServer::start().await;

    // Three topics in the "results" wrapper shape, with mixed field names
    Mock::given(method("GET"))
        .and(path("/api/labs/topics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": 1, "name": "Algorithms"},
                {"id": 2, "title": "Operating Systems"},
                {"id": 3, "short_name": "DB"},
            ]
        })))
        .mount(&server)
        .await;

    // Topic 1: bare array of tasks with assorted dates
    Mock::given(method("GET"))
        .and(path("/api/labs/tasks/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 11, "title": "Sorting lab", "type": "lab", "created_at": "2024-03-01"},
            {"id": 12, "title": "Graphs lab", "type": "lab", "created_at": "2024-01-15"},
        ])))
        .mount(&server)
        .await;

    // Topic 2: no task list yet
    Mock::given(method("GET"))
        .and(path("/api/labs/tasks/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    // Topic 3: server error, must not sink the whole load
    Mock::given(method("GET"))
        .and(path("/api/labs/tasks/3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = test_client("partial", &server.uri());
    let data = load_catalog(&api).await.unwrap();

    assert_eq!(data.topics.len(), 3);
    assert_eq!(data.topics[0].title, "Algorithms");
    assert_eq!(data.topics[2].title, "DB");

    // Only topic 1 contributed tasks, newest first
    assert_eq!(data.tasks.len(), 2);
    assert_eq!(data.tasks[0].title, "Sorting lab");
    assert_eq!(data.tasks[1].title, "Graphs lab");
    assert_eq!(data.tasks[0].topic_title, "Algorithms");
}

#[tokio::test]
async fn failed_topic_list_fails_the_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/labs/topics"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let api = test_client("topics_down", &server.uri());
    assert!(load_catalog(&api).await.is_err());
}

#[tokio::test]
async fn filter_and_paginate_the_merged_catalog() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/labs/topics"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "title": "Algorithms"}])),
        )
        .mount(&server)
        .await;

    // 25 tasks, descending recency by id
    let tasks: Vec<_> = (0..25)
        .map(|i| {
            json!({
                "id": i,
                "title": format!("Lab {}", i),
                "type": if i % 2 == 0 { "lab" } else { "lecture" },
                "created_at": 1_700_000_000 + i,
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/labs/tasks/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(tasks)))
        .mount(&server)
        .await;

    let api = test_client("paginate", &server.uri());
    let data = load_catalog(&api).await.unwrap();
    assert_eq!(data.tasks.len(), 25);
    // Highest timestamp first
    assert_eq!(data.tasks[0].title, "Lab 24");

    let mut view = CatalogView::default();
    assert_eq!(view.total_pages(&data.tasks), 3);
    assert_eq!(view.visible(&data.tasks).len(), PAGE_SIZE);

    view.next_page(&data.tasks);
    view.next_page(&data.tasks);
    assert_eq!(view.visible(&data.tasks).len(), 5);

    // Query narrows across pages and resets to page one
    view.set_query("lecture");
    assert_eq!(view.page(), 0);
    assert_eq!(view.filtered(&data.tasks).len(), 12);
    assert_eq!(view.total_pages(&data.tasks), 2);

    view.set_query("no such thing");
    assert!(view.visible(&data.tasks).is_empty());
    assert_eq!(view.total_pages(&data.tasks), 1);
}

#[tokio::test]
async fn single_object_task_response_is_wrapped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/labs/topics"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": 9, "title": "Networking"}])),
        )
        .mount(&server)
        .await;

    // A single object instead of a list
    Mock::given(method("GET"))
        .and(path("/api/labs/tasks/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 90,
            "title": "Socket lab",
            "has_solution": 1,
        })))
        .mount(&server)
        .await;

    let api = test_client("single", &server.uri());
    let data = load_catalog(&api).await.unwrap();
    assert_eq!(data.tasks.len(), 1);
    assert_eq!(data.tasks[0].title, "Socket lab");
    assert!(data.tasks[0].has_solution);
}
