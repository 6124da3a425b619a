use reqwest::Client;
use serde_json::Value;
use skiff_backend::api;
use skiff_backend::bootstrap;
use skiff_backend::config::{SessionConfig, SkiffConfig, SkiffPaths};
use tempfile::{tempdir, TempDir};
use tokio::time::{sleep, Duration};

struct TestApp {
    _dir: TempDir,
    base_url: String,
    server: tokio::task::JoinHandle<()>,
}

impl TestApp {
    async fn shutdown(self) {
        self.server.abort();
        let _ = self.server.await;
    }
}

fn next_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .unwrap()
        .port()
}

async fn wait_for_health(base_url: &str) {
    let client = Client::new();
    for _ in 0..50 {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        sleep(Duration::from_millis(100)).await;
    }
    panic!("server did not become healthy in time");
}

async fn spawn_app() -> TestApp {
    let dir = tempdir().expect("tempdir");
    let port = next_port();
    let config = SkiffConfig::new(
        port,
        SkiffPaths::from_base_dir(dir.path()).expect("paths"),
        SessionConfig::default(),
    );

    let resources = bootstrap::initialize(&config).expect("bootstrap");
    let database = resources.database.clone();
    let sessions = resources.sessions.clone();
    let server = tokio::spawn(async move {
        let _ = api::serve_http(config, database, sessions).await;
    });

    let base_url = format!("http://127.0.0.1:{port}");
    wait_for_health(&base_url).await;

    TestApp {
        _dir: dir,
        base_url,
        server,
    }
}

fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("client")
}

async fn register(client: &Client, base_url: &str, username: &str) {
    let resp = client
        .post(format!("{base_url}/register"))
        .form(&[("username", username), ("password", "hunter2")])
        .send()
        .await
        .expect("register response");
    assert!(
        resp.status().is_success(),
        "register failed with {}",
        resp.status()
    );
}

/// Submits a question post and returns its id, parsed from the redirect
/// target (/post/:id).
async fn submit_question(client: &Client, base_url: &str, title: &str) -> i64 {
    let resp = client
        .post(format!("{base_url}/post"))
        .form(&[
            ("title", title),
            ("post_type", "question"),
            ("description", "a longer body"),
        ])
        .send()
        .await
        .expect("create post response");
    assert!(resp.status().is_success());
    let path = resp.url().path().to_string();
    path.rsplit('/')
        .next()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| panic!("unexpected post redirect target: {path}"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn register_post_comment_and_vote_roundtrip() {
    let app = spawn_app().await;
    let client = session_client();

    register(&client, &app.base_url, "alice").await;

    let post_id = submit_question(&client, &app.base_url, "Integration question").await;

    // detail page renders the post
    let page = client
        .get(format!("{}/post/{post_id}", app.base_url))
        .send()
        .await
        .expect("detail response");
    assert!(page.status().is_success());
    let body = page.text().await.expect("detail body");
    assert!(body.contains("Integration question"));
    assert!(body.contains("alice"));

    // JSON response mode returns the created comment with its author
    let created: Value = client
        .post(format!("{}/post/{post_id}/comment", app.base_url))
        .header("x-requested-with", "XMLHttpRequest")
        .form(&[("content", "first!")])
        .send()
        .await
        .expect("comment response")
        .json()
        .await
        .expect("comment json");
    assert_eq!(created["success"], Value::Bool(true));
    assert_eq!(created["comment"]["author"], "alice");
    let comment_id = created["comment"]["id"].as_i64().expect("comment id");

    // threaded reply
    let reply: Value = client
        .post(format!("{}/post/{post_id}/comment", app.base_url))
        .header("x-requested-with", "XMLHttpRequest")
        .form(&[
            ("content", "a reply"),
            ("parent_id", &comment_id.to_string()),
        ])
        .send()
        .await
        .expect("reply response")
        .json()
        .await
        .expect("reply json");
    assert_eq!(reply["comment"]["parent_id"].as_i64(), Some(comment_id));

    // both comments render on the thread page
    let body = client
        .get(format!("{}/post/{post_id}", app.base_url))
        .send()
        .await
        .expect("detail response")
        .text()
        .await
        .expect("detail body");
    assert!(body.contains("first!"));
    assert!(body.contains("a reply"));

    // vote toggle: +1 then -1
    for expected in [1, -1] {
        let voted: Value = client
            .post(format!("{}/post/{post_id}/vote", app.base_url))
            .header("x-requested-with", "XMLHttpRequest")
            .send()
            .await
            .expect("vote response")
            .json()
            .await
            .expect("vote json");
        assert_eq!(voted["success"], Value::Bool(true));
        assert_eq!(voted["delta"].as_i64(), Some(expected));
    }

    // comment votes toggle independently
    let voted: Value = client
        .post(format!("{}/comment/{comment_id}/vote", app.base_url))
        .header("x-requested-with", "XMLHttpRequest")
        .send()
        .await
        .expect("comment vote response")
        .json()
        .await
        .expect("comment vote json");
    assert_eq!(voted["delta"].as_i64(), Some(1));

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn url_post_without_url_is_rejected() {
    let app = spawn_app().await;
    let client = session_client();
    register(&client, &app.base_url, "alice").await;

    let resp = client
        .post(format!("{}/post", app.base_url))
        .header("x-requested-with", "XMLHttpRequest")
        .form(&[("title", "No url here"), ("post_type", "url")])
        .send()
        .await
        .expect("create response");
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.expect("error json");
    assert!(body["error"].as_str().expect("message").contains("url"));

    // nothing was persisted
    let listing = client
        .get(format!("{}/urls", app.base_url))
        .send()
        .await
        .expect("listing response")
        .text()
        .await
        .expect("listing body");
    assert!(!listing.contains("No url here"));

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deleting_someone_elses_post_is_forbidden() {
    let app = spawn_app().await;

    let alice = session_client();
    register(&alice, &app.base_url, "alice").await;
    let post_id = submit_question(&alice, &app.base_url, "Alice's post").await;

    let mallory = session_client();
    register(&mallory, &app.base_url, "mallory").await;

    let resp = mallory
        .post(format!("{}/post/{post_id}/delete", app.base_url))
        .header("x-requested-with", "XMLHttpRequest")
        .send()
        .await
        .expect("delete response");
    assert_eq!(resp.status(), 403);

    // the row is intact
    let detail = alice
        .get(format!("{}/post/{post_id}", app.base_url))
        .send()
        .await
        .expect("detail response");
    assert!(detail.status().is_success());

    // the owner may delete it
    let resp = alice
        .post(format!("{}/post/{post_id}/delete", app.base_url))
        .header("x-requested-with", "XMLHttpRequest")
        .send()
        .await
        .expect("owner delete response");
    assert!(resp.status().is_success());

    let gone = alice
        .get(format!("{}/post/{post_id}", app.base_url))
        .send()
        .await
        .expect("detail response");
    assert_eq!(gone.status(), 404);

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn anonymous_and_unknown_sessions_cannot_act() {
    let app = spawn_app().await;

    let alice = session_client();
    register(&alice, &app.base_url, "alice").await;
    let post_id = submit_question(&alice, &app.base_url, "A post").await;

    // fresh session, never authenticated
    let anonymous = session_client();
    let resp = anonymous
        .post(format!("{}/post/{post_id}/comment", app.base_url))
        .header("x-requested-with", "XMLHttpRequest")
        .form(&[("content", "drive-by")])
        .send()
        .await
        .expect("comment response");
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.expect("error json");
    assert!(body["error"].as_str().is_some());

    // a token the store has never seen behaves exactly like no session
    let stranger = Client::new();
    let resp = stranger
        .post(format!("{}/post/{post_id}/vote", app.base_url))
        .header("cookie", "skiff_session=deadbeef-0000-0000-0000-000000000000")
        .header("x-requested-with", "XMLHttpRequest")
        .send()
        .await
        .expect("vote response");
    assert_eq!(resp.status(), 401);

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_registration_is_rejected() {
    let app = spawn_app().await;

    let first = session_client();
    register(&first, &app.base_url, "alice").await;

    let second = session_client();
    let resp = second
        .post(format!("{}/register", app.base_url))
        .form(&[("username", "alice"), ("password", "other")])
        .send()
        .await
        .expect("register response");
    assert_eq!(resp.status(), 400);

    // the original credentials still log in
    let login = second
        .post(format!("{}/login", app.base_url))
        .form(&[("username", "alice"), ("password", "hunter2")])
        .send()
        .await
        .expect("login response");
    assert!(login.status().is_success());

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn login_never_creates_accounts() {
    let app = spawn_app().await;
    let client = session_client();

    let resp = client
        .post(format!("{}/login", app.base_url))
        .form(&[("username", "nobody"), ("password", "whatever")])
        .send()
        .await
        .expect("login response");
    assert_eq!(resp.status(), 401);

    // no account was provisioned by the failed login
    let resp = client
        .post(format!("{}/login", app.base_url))
        .form(&[("username", "nobody"), ("password", "whatever")])
        .send()
        .await
        .expect("second login response");
    assert_eq!(resp.status(), 401);

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn logout_drops_the_authenticated_user() {
    let app = spawn_app().await;
    let client = session_client();
    register(&client, &app.base_url, "alice").await;
    let post_id = submit_question(&client, &app.base_url, "A post").await;

    let resp = client
        .get(format!("{}/logout", app.base_url))
        .send()
        .await
        .expect("logout response");
    assert!(resp.status().is_success());

    let resp = client
        .post(format!("{}/post/{post_id}/comment", app.base_url))
        .header("x-requested-with", "XMLHttpRequest")
        .form(&[("content", "still here?")])
        .send()
        .await
        .expect("comment response");
    assert_eq!(resp.status(), 401);

    app.shutdown().await;
}
