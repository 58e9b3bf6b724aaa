use midjourney_plugin::{
    api::MidjourneyClient,
    app::{App, AppServices},
    chat::{EventAction, MessageContext, MockChannel, Reply, ReplyType},
    models::{Config, Status},
    poller::BackgroundLoop,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE_PATH: &str = "/v1/img/midjourney";

fn test_config(server: &MockServer, budget: u32, interval: Duration) -> Config {
    let mut config = Config::from_lookup(|key: &str| match key {
        "LINKAI_API_KEY" => Some("test-key".to_string()),
        "MJ_ENABLED" => Some("true".to_string()),
        _ => None,
    })
    .unwrap();
    config.base_url = format!("{}{}", server.uri(), BASE_PATH);
    config.poll_budget = budget;
    config.poll_interval = interval;
    config
}

fn build_app(config: &Config, channel: &MockChannel, handle: Handle) -> App {
    let api = MidjourneyClient::new(config.api_key.clone())
        .unwrap()
        .with_base_url(config.base_url.clone());
    App::with_services(
        AppServices {
            api: Arc::new(api),
            channel: Arc::new(channel.clone()),
        },
        config,
        handle,
    )
}

async fn wait_for_sends(channel: &MockChannel, expected: usize) {
    for _ in 0..400 {
        if channel.get_send_count() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

async fn mount_generate(server: &MockServer, task_id: &str) {
    Mock::given(method("POST"))
        .and(path(format!("{}/generate", BASE_PATH)))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 200,
            "data": { "taskId": task_id }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_generate_acknowledges_and_tracks_pending_task() {
    let server = MockServer::start().await;
    mount_generate(&server, "T1").await;
    Mock::given(method("GET"))
        .and(path(format!("{}/tasks/T1", BASE_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "status": "IN_PROGRESS" }
        })))
        .mount(&server)
        .await;

    let channel = MockChannel::new();
    let config = test_config(&server, 2, Duration::from_millis(50));
    let app = build_app(&config, &channel, Handle::current());

    let outcome = app.handle(&MessageContext::text("$mj a cat", "alice")).await;

    assert_eq!(outcome.action, EventAction::BreakPass);
    let reply = outcome.reply.unwrap();
    assert_eq!(reply.reply_type, ReplyType::Info);
    assert!(reply.content.contains("prompt: a cat"));
    assert!(!reply.content.contains("T1"));

    let task = app.registry().get("T1").unwrap();
    assert_eq!(task.status, Status::Pending);
    assert_eq!(task.owner_id, "alice");
}

#[tokio::test]
async fn test_upscale_with_bad_index_never_reaches_remote() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/operate", BASE_PATH)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let channel = MockChannel::new();
    let config = test_config(&server, 2, Duration::from_millis(1));
    let app = build_app(&config, &channel, Handle::current());

    let outcome = app.handle(&MessageContext::text("$mju T1 5", "alice")).await;

    assert_eq!(
        outcome.reply,
        Some(Reply::error("图片序号 5 错误，应在 1 至 4 之间"))
    );
    assert!(app.registry().is_empty());
}

#[tokio::test]
async fn test_poll_recovers_from_errors_and_delivers_once() {
    let server = MockServer::start().await;
    mount_generate(&server, "T1").await;
    Mock::given(method("GET"))
        .and(path(format!("{}/tasks/T1", BASE_PATH)))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/tasks/T1", BASE_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "status": "FINISHED", "imgId": "I1", "imgUrl": "https://img/1.png" }
        })))
        .mount(&server)
        .await;

    let background = BackgroundLoop::start().unwrap();
    let channel = MockChannel::new();
    let config = test_config(&server, 80, Duration::from_millis(1));
    let app = build_app(&config, &channel, background.handle());

    app.handle(&MessageContext::text("$mj a cat", "alice")).await;
    wait_for_sends(&channel, 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(channel.get_send_count(), 2);
    let sent = channel.get_sent();
    assert_eq!(sent[0], ("alice".to_string(), Reply::image_url("https://img/1.png")));
    assert_eq!(sent[1].1.reply_type, ReplyType::Info);
    assert!(sent[1].1.content.contains("$mju I1 1"));

    let polls = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "GET")
        .count();
    assert_eq!(polls, 4);

    let task = app.registry().get("T1").unwrap();
    assert_eq!(task.status, Status::Finished);
    assert_eq!(task.img_url.as_deref(), Some("https://img/1.png"));
}

#[tokio::test]
async fn test_duplicate_upscale_only_calls_remote_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/operate", BASE_PATH)))
        .and(body_json(serde_json::json!({
            "type": "UPSCALE",
            "imgId": "I1",
            "index": 2
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 200,
            "data": { "taskId": "U1" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/tasks/U1", BASE_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "status": "FINISHED", "imgId": "I9", "imgUrl": "https://img/9.png" }
        })))
        .mount(&server)
        .await;

    let channel = MockChannel::new();
    let config = test_config(&server, 5, Duration::from_millis(1));
    let app = build_app(&config, &channel, Handle::current());
    let ctx = MessageContext::text("$mju I1 2", "alice");

    let first = app.handle(&ctx).await.reply.unwrap();
    assert_eq!(first.reply_type, ReplyType::Info);

    let second = app.handle(&ctx).await.reply.unwrap();
    assert_eq!(second, Reply::error("第 2 张图片已经放大过了"));

    wait_for_sends(&channel, 1).await;
    assert_eq!(channel.count_of(ReplyType::ImageUrl), 1);
    assert_eq!(channel.count_of(ReplyType::Info), 0);
}

#[tokio::test]
async fn test_concurrent_duplicate_upscales_call_remote_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/operate", BASE_PATH)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({
                    "code": 200,
                    "data": { "taskId": "U1" }
                }))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let channel = MockChannel::new();
    let config = test_config(&server, 1, Duration::from_millis(1));
    let app = build_app(&config, &channel, Handle::current());
    let ctx = MessageContext::text("$mju I1 2", "alice");

    let (first, second) = tokio::join!(app.handle(&ctx), app.handle(&ctx));
    let mut replies = vec![first.reply.unwrap(), second.reply.unwrap()];
    replies.sort_by_key(|reply| reply.reply_type == ReplyType::Info);

    assert_eq!(replies[0], Reply::error("第 2 张图片已经放大过了"));
    assert_eq!(replies[1].reply_type, ReplyType::Info);
}

#[tokio::test]
async fn test_upscale_with_unknown_image_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/operate", BASE_PATH)))
        .respond_with(ResponseTemplate::new(461).set_body_json(serde_json::json!({
            "code": 461,
            "message": "image not found"
        })))
        .mount(&server)
        .await;

    let channel = MockChannel::new();
    let config = test_config(&server, 5, Duration::from_millis(1));
    let app = build_app(&config, &channel, Handle::current());

    let reply = app
        .handle(&MessageContext::text("$mju nope 1", "alice"))
        .await
        .reply
        .unwrap();
    assert_eq!(reply, Reply::error("请输入正确的图片ID"));

    // A failed submission must not block a later retry of the same pair.
    assert!(app.registry().is_empty());
}

#[tokio::test]
async fn test_exhausted_poll_is_silent_and_leaves_task_pending() {
    let server = MockServer::start().await;
    mount_generate(&server, "T1").await;
    Mock::given(method("GET"))
        .and(path(format!("{}/tasks/T1", BASE_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "status": "IN_PROGRESS" }
        })))
        .expect(3)
        .mount(&server)
        .await;

    let channel = MockChannel::new();
    let config = test_config(&server, 3, Duration::from_millis(1));
    let app = build_app(&config, &channel, Handle::current());

    app.handle(&MessageContext::text("$mj a cat", "alice")).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(channel.get_send_count(), 0);
    assert_eq!(app.registry().get("T1").unwrap().status, Status::Pending);
}

#[tokio::test]
async fn test_disabled_plugin_ignores_commands() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let channel = MockChannel::new();
    let mut config = test_config(&server, 3, Duration::from_millis(1));
    config.enabled = false;
    let app = build_app(&config, &channel, Handle::current());

    let outcome = app.handle(&MessageContext::text("$mj a cat", "alice")).await;
    assert_eq!(outcome.action, EventAction::Continue);
    assert!(outcome.reply.is_none());
}
