// End-to-end scenarios against the full router: auth gate, routing,
// handlers, instrumentation and an injected store.
#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        extract::Request,
        http::{StatusCode, header},
        response::Response,
    };
    use base64::{Engine, engine::general_purpose::STANDARD};
    use bookshelf::{
        AppState, Book, BookList, BookStore, CatalogMetrics, CatalogService, Credentials,
        InMemoryBookStore, SqliteBookStore, StoreError, build_router,
        metrics::DEFAULT_DURATION_BUCKETS, ports::StoreResult,
    };
    use tower::ServiceExt;

    const DUNE: &str = r#"{"items":[{"id":"1","name":"Dune","author":"Herbert"}]}"#;

    /// Counts every call before delegating to an in-memory store.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryBookStore,
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn tick(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl BookStore for CountingStore {
        async fn find_all(&self) -> StoreResult<Vec<Book>> {
            self.tick();
            self.inner.find_all().await
        }

        async fn get_by_id(&self, id: &str) -> StoreResult<Option<Book>> {
            self.tick();
            self.inner.get_by_id(id).await
        }

        async fn insert(&self, book: &Book) -> StoreResult<()> {
            self.tick();
            self.inner.insert(book).await
        }

        async fn update_by_id(&self, id: &str, book: &Book) -> StoreResult<()> {
            self.tick();
            self.inner.update_by_id(id, book).await
        }
    }

    /// Every operation fails as if the database were unreachable.
    struct BrokenStore;

    #[async_trait]
    impl BookStore for BrokenStore {
        async fn find_all(&self) -> StoreResult<Vec<Book>> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn get_by_id(&self, _id: &str) -> StoreResult<Option<Book>> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn insert(&self, _book: &Book) -> StoreResult<()> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn update_by_id(&self, _id: &str, _book: &Book) -> StoreResult<()> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
    }

    /// Rejects inserts of one id; everything else reaches the inner store.
    struct RejectingStore {
        inner: InMemoryBookStore,
        rejected: &'static str,
    }

    #[async_trait]
    impl BookStore for RejectingStore {
        async fn find_all(&self) -> StoreResult<Vec<Book>> {
            self.inner.find_all().await
        }

        async fn get_by_id(&self, id: &str) -> StoreResult<Option<Book>> {
            self.inner.get_by_id(id).await
        }

        async fn insert(&self, book: &Book) -> StoreResult<()> {
            if book.id == self.rejected {
                return Err(StoreError::Backend("disk full".to_string()));
            }
            self.inner.insert(book).await
        }

        async fn update_by_id(&self, id: &str, book: &Book) -> StoreResult<()> {
            self.inner.update_by_id(id, book).await
        }
    }

    fn app_with(store: Arc<dyn BookStore>) -> (Router, Arc<CatalogMetrics>) {
        let metrics = Arc::new(CatalogMetrics::new(DEFAULT_DURATION_BUCKETS).unwrap());
        let router = build_router(
            AppState::new(CatalogService::new(store), metrics.clone()),
            Credentials::new("kamol", "hasan", "Authorization Required"),
        );
        (router, metrics)
    }

    fn authed(method: &str, uri: &str, body: Option<&str>) -> Request {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode("kamol:hasan")),
            );
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_repeated_import_keeps_single_record() {
        let (app, _) = app_with(Arc::new(InMemoryBookStore::new()));

        let first = send(&app, authed("POST", "/books", Some(DUNE))).await;
        assert_eq!(first.status(), StatusCode::OK);
        let list: BookList = json(first).await;
        assert_eq!(list.items, vec![Book::new("1", "Dune", "Herbert")]);

        let second = send(&app, authed("POST", "/books", Some(DUNE))).await;
        assert_eq!(second.status(), StatusCode::OK);
        let list: BookList = json(second).await;
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].id, "1");
    }

    #[tokio::test]
    async fn test_import_returns_full_catalog() {
        let (app, _) = app_with(Arc::new(InMemoryBookStore::new()));
        send(&app, authed("POST", "/books", Some(DUNE))).await;

        let response = send(
            &app,
            authed(
                "POST",
                "/books",
                Some(r#"{"items":[{"id":"2","name":"Emma","author":"Austen"}]}"#),
            ),
        )
        .await;

        let mut list: BookList = json(response).await;
        list.items.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(
            list.items,
            vec![
                Book::new("1", "Dune", "Herbert"),
                Book::new("2", "Emma", "Austen"),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_before_and_after_import() {
        let (app, _) = app_with(Arc::new(InMemoryBookStore::new()));

        let before = send(&app, authed("GET", "/books/1", None)).await;
        assert_eq!(before.status(), StatusCode::NOT_FOUND);
        assert!(text(before).await.is_empty());

        send(&app, authed("POST", "/books", Some(DUNE))).await;

        let after = send(&app, authed("GET", "/books/1", None)).await;
        assert_eq!(after.status(), StatusCode::OK);
        let book: Book = json(after).await;
        assert_eq!(book, Book::new("1", "Dune", "Herbert"));
    }

    #[tokio::test]
    async fn test_list_books() {
        let (app, _) = app_with(Arc::new(InMemoryBookStore::new()));

        let empty = send(&app, authed("GET", "/books", None)).await;
        assert_eq!(empty.status(), StatusCode::OK);
        let list: BookList = json(empty).await;
        assert!(list.items.is_empty());

        send(&app, authed("POST", "/books", Some(DUNE))).await;
        let list: BookList = json(send(&app, authed("GET", "/books", None)).await).await;
        assert_eq!(list.items.len(), 1);
    }

    #[tokio::test]
    async fn test_update_echoes_submitted_book() {
        let (app, _) = app_with(Arc::new(InMemoryBookStore::new()));
        send(&app, authed("POST", "/books", Some(DUNE))).await;

        let body = r#"{"id":"ignored","name":"Dune Messiah","author":"Frank Herbert"}"#;
        let response = send(&app, authed("POST", "/books/1", Some(body))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let echoed: Book = json(response).await;
        assert_eq!(echoed, Book::new("ignored", "Dune Messiah", "Frank Herbert"));

        let stored: Book = json(send(&app, authed("GET", "/books/1", None)).await).await;
        assert_eq!(stored, Book::new("1", "Dune Messiah", "Frank Herbert"));
    }

    #[tokio::test]
    async fn test_update_of_missing_book_fails() {
        let (app, _) = app_with(Arc::new(InMemoryBookStore::new()));

        let response = send(
            &app,
            authed(
                "POST",
                "/books/404",
                Some(r#"{"id":"404","name":"x","author":"y"}"#),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = json(response).await;
        assert_eq!(body["error"], "book '404' not found");
    }

    #[tokio::test]
    async fn test_unauthenticated_request_is_rejected_early() {
        let store = Arc::new(CountingStore::default());
        let (app, metrics) = app_with(store.clone());

        let response = send(
            &app,
            Request::builder()
                .uri("/books")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
        assert_eq!(store.calls(), 0);
        let rendered = metrics.render();
        assert!(!rendered.contains("http_requests_total{"));
        assert!(!rendered.contains("http_request_duration_seconds_count{"));
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let store = Arc::new(CountingStore::default());
        let (app, _) = app_with(store.clone());

        let response = send(
            &app,
            Request::builder()
                .uri("/metrics")
                .header(
                    header::AUTHORIZATION,
                    format!("Basic {}", STANDARD.encode("kamol:wrong")),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_path_is_400_and_counted() {
        let (app, metrics) = app_with(Arc::new(InMemoryBookStore::new()));

        let response = send(&app, authed("GET", "/unknown/path", None)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(text(response).await.is_empty());
        let rendered = metrics.render();
        let sample = rendered
            .lines()
            .find(|l| l.starts_with("http_not_found_requests_total{"))
            .expect("not-found sample");
        assert!(sample.contains("method=\"GET\""));
        assert!(sample.contains("path=\"/unknown/path\""));
        assert!(sample.ends_with(" 1"));
    }

    #[tokio::test]
    async fn test_request_metrics_are_recorded_once_per_request() {
        let (app, metrics) = app_with(Arc::new(InMemoryBookStore::new()));

        send(&app, authed("GET", "/books/1", None)).await;
        send(&app, authed("POST", "/books", Some(DUNE))).await;
        send(&app, authed("GET", "/books/1", None)).await;

        let response = send(&app, authed("GET", "/metrics", None)).await;
        let rendered = text(response).await;
        let sample = |method: &str, status: &str| {
            rendered
                .lines()
                .find(|l| {
                    l.starts_with("http_requests_total{")
                        && l.contains(&format!("method=\"{method}\""))
                        && l.contains(&format!("status=\"{status}\""))
                })
                .map(|l| l.rsplit(' ').next().unwrap_or_default().to_string())
        };

        assert_eq!(sample("GET", "404").as_deref(), Some("1"));
        assert_eq!(sample("GET", "200").as_deref(), Some("1"));
        assert_eq!(sample("POST", "200").as_deref(), Some("1"));
        assert!(rendered.contains("http_request_duration_seconds_count{method=\"GET\"} 2"));
    }

    #[tokio::test]
    async fn test_storage_failures_map_to_500() {
        let (app, metrics) = app_with(Arc::new(BrokenStore));

        let list = send(&app, authed("GET", "/books", None)).await;
        assert_eq!(list.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = json(list).await;
        assert!(body["error"].as_str().unwrap().contains("connection refused"));

        let get = send(&app, authed("GET", "/books/1", None)).await;
        assert_eq!(get.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let import = send(&app, authed("POST", "/books", Some(DUNE))).await;
        assert_eq!(import.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert!(metrics.render().contains("status=\"500\""));
    }

    #[tokio::test]
    async fn test_partial_import_failure_is_500_after_every_item() {
        let store = Arc::new(RejectingStore {
            inner: InMemoryBookStore::new(),
            rejected: "2",
        });
        let (app, metrics) = app_with(store.clone());

        let body = r#"{"items":[
            {"id":"1","name":"Dune","author":"Herbert"},
            {"id":"2","name":"Emma","author":"Austen"},
            {"id":"3","name":"Ulysses","author":"Joyce"}
        ]}"#;
        let response = send(&app, authed("POST", "/books", Some(body))).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error: serde_json::Value = json(response).await;
        assert_eq!(error["error"], "storage error: disk full");

        let mut ids: Vec<_> = store
            .inner
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "3"]);

        let rendered = metrics.render();
        let sample = rendered
            .lines()
            .find(|l| {
                l.starts_with("http_requests_total{")
                    && l.contains("method=\"POST\"")
                    && l.contains("status=\"500\"")
            })
            .expect("POST 500 sample");
        assert!(sample.ends_with(" 1"));
    }

    #[tokio::test]
    async fn test_update_without_id_in_body() {
        let (app, _) = app_with(Arc::new(InMemoryBookStore::new()));
        send(&app, authed("POST", "/books", Some(DUNE))).await;

        let response = send(
            &app,
            authed("POST", "/books/1", Some(r#"{"name":"x","author":"y"}"#)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let stored: Book = json(send(&app, authed("GET", "/books/1", None)).await).await;
        assert_eq!(stored, Book::new("1", "x", "y"));
    }

    #[tokio::test]
    async fn test_import_with_empty_id_is_rejected_before_store() {
        let store = Arc::new(CountingStore::default());
        let (app, _) = app_with(store.clone());

        let response = send(
            &app,
            authed(
                "POST",
                "/books",
                Some(r#"{"items":[{"id":"","name":"a","author":"b"}]}"#),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_import_body_must_match_shape() {
        let store = Arc::new(CountingStore::default());
        let (app, _) = app_with(store.clone());

        let wrong_shape = send(
            &app,
            authed("POST", "/books", Some(r#"[{"id":"1","name":"Dune"}]"#)),
        )
        .await;
        assert_eq!(wrong_shape.status(), StatusCode::BAD_REQUEST);

        let not_json = send(&app, authed("POST", "/books/1", Some("{"))).await;
        assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);

        assert_eq!(store.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_overlapping_imports_store_each_id_once() {
        let store = Arc::new(InMemoryBookStore::new());
        let (app, _) = app_with(store.clone());

        let mut handles = Vec::new();
        for worker in 0..8 {
            let app = app.clone();
            handles.push(tokio::spawn(async move {
                let items: Vec<Book> = (0..20)
                    .map(|i| Book::new(i.to_string(), format!("v{worker}"), "anon"))
                    .collect();
                let body = serde_json::to_string(&BookList { items }).unwrap();
                send(&app, authed("POST", "/books", Some(&body))).await.status()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), StatusCode::OK);
        }

        let list: BookList = json(send(&app, authed("GET", "/books", None)).await).await;
        assert_eq!(list.items.len(), 20);
        assert_eq!(store.len(), 20);
    }

    #[tokio::test]
    async fn test_sqlite_backed_import_is_idempotent() {
        let (app, _) = app_with(Arc::new(SqliteBookStore::open_in_memory().unwrap()));

        for _ in 0..3 {
            let response = send(&app, authed("POST", "/books", Some(DUNE))).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let list: BookList = json(send(&app, authed("GET", "/books", None)).await).await;
        assert_eq!(list.items, vec![Book::new("1", "Dune", "Herbert")]);
    }
}
