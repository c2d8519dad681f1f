//! Playback sessions driven by the real engines over HTTP

use axum::{
    Router,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use streamgate::{
    config::Config,
    playback::{
        DefaultEngineFactory, EngineConfig, EngineEvent, ErrorCategory, EventEmitter,
        HeadlessSink, HlsEngine, MediaSink, NativeSourceEngine, PlatformCapabilities,
        PlaybackController, PlaybackError, PlaybackState, PlaybackStrategy, SessionToken,
        Settled, StreamingEngine, TaggedEvent, TerminalKind, session::SessionTokenMint,
    },
    web::{AppState, create_app},
};

const MASTER_PLAYLIST: &str = r#"#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2400000,RESOLUTION=1280x720
mid/index.m3u8
"#;

const MEDIA_PLAYLIST: &str = r#"#EXTM3U
#EXT-X-TARGETDURATION:6
#EXTINF:6.0,
seg0.ts
#EXT-X-ENDLIST
"#;

async fn protected(headers: HeaderMap) -> Response {
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some("Bearer viewer") => MASTER_PLAYLIST.into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_origin() -> String {
    let app = Router::new()
        .route("/vod/master.m3u8", get(|| async { MASTER_PLAYLIST }))
        .route("/vod/media.m3u8", get(|| async { MEDIA_PLAYLIST }))
        .route("/vod/not-a-playlist", get(|| async { "<html></html>" }))
        .route("/vod/protected.m3u8", get(protected))
        .route(
            "/vod/slow.m3u8",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                MASTER_PLAYLIST
            }),
        );
    serve(app).await
}

fn factory(token: Option<&str>) -> DefaultEngineFactory {
    DefaultEngineFactory::with_client(reqwest::Client::new(), EngineConfig::default())
        .with_bearer_token(token.map(str::to_string))
}

fn new_controller(token: Option<&str>) -> PlaybackController<DefaultEngineFactory> {
    PlaybackController::new(factory(token), PlatformCapabilities::default())
}

#[tokio::test]
async fn test_master_playlist_plays_first_variant() {
    let origin = spawn_origin().await;
    let mut controller = new_controller(None);
    let sink = Arc::new(HeadlessSink::new("player", false));

    controller.start(sink.clone(), &format!("{origin}/vod/master.m3u8"));
    assert_eq!(controller.strategy(), Some(PlaybackStrategy::Adaptive));

    assert_eq!(controller.settle().await, Settled::Playing);
    assert_eq!(
        sink.current_source(),
        Some(format!("{origin}/vod/low/index.m3u8"))
    );
}

#[tokio::test]
async fn test_media_playlist_is_assigned_as_is() {
    let origin = spawn_origin().await;
    let mut controller = new_controller(None);
    let sink = Arc::new(HeadlessSink::new("player", false));
    let source = format!("{origin}/vod/media.m3u8");

    controller.start(sink.clone(), &source);

    assert_eq!(controller.settle().await, Settled::Playing);
    assert_eq!(sink.current_source(), Some(source));
}

#[tokio::test]
async fn test_missing_manifest_reports_not_found() {
    let origin = spawn_origin().await;
    let mut controller = new_controller(None);
    let sink = Arc::new(HeadlessSink::new("player", false));

    let token = controller.start(sink.clone(), &format!("{origin}/vod/gone.m3u8"));

    let report = controller.next_report().await.unwrap();
    assert_eq!(report.token, token);
    assert_eq!(report.kind, TerminalKind::NotFound);
    assert_eq!(report.upstream_status, Some(404));
    assert_eq!(controller.state(), PlaybackState::Terminated);
    assert!(sink.current_source().is_none());
    assert!(controller.next_report().await.is_none());
}

#[tokio::test]
async fn test_unusable_body_is_a_network_failure() {
    let origin = spawn_origin().await;
    let mut controller = new_controller(None);
    let sink = Arc::new(HeadlessSink::new("player", false));

    controller.start(sink, &format!("{origin}/vod/not-a-playlist"));

    match controller.settle().await {
        Settled::Failed(report) => {
            assert_eq!(report.kind, TerminalKind::Network);
            assert_eq!(report.upstream_status, None);
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bearer_token_is_sent_with_manifest_requests() {
    let origin = spawn_origin().await;
    let source = format!("{origin}/vod/protected.m3u8");

    let mut anonymous = new_controller(None);
    anonymous.start(Arc::new(HeadlessSink::new("a", false)), &source);
    match anonymous.settle().await {
        Settled::Failed(report) => {
            assert_eq!(report.kind, TerminalKind::Network);
            assert_eq!(report.upstream_status, Some(401));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    let mut viewer = new_controller(Some("viewer"));
    viewer.start(Arc::new(HeadlessSink::new("b", false)), &source);
    assert_eq!(viewer.settle().await, Settled::Playing);
}

#[tokio::test]
async fn test_manifest_load_timeout_is_enforced() {
    let origin = spawn_origin().await;
    let config = EngineConfig {
        manifest_loading_timeout: Duration::from_millis(200),
        ..EngineConfig::default()
    };
    let factory = DefaultEngineFactory::with_client(reqwest::Client::new(), config);
    let mut controller = PlaybackController::new(factory, PlatformCapabilities::default());

    controller.start(
        Arc::new(HeadlessSink::new("player", false)),
        &format!("{origin}/vod/slow.m3u8"),
    );

    let report = tokio::time::timeout(Duration::from_secs(3), controller.next_report())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.kind, TerminalKind::Network);
}

#[tokio::test]
async fn test_restart_ignores_the_replaced_session() {
    let origin = spawn_origin().await;
    let mut controller = new_controller(None);
    let sink = Arc::new(HeadlessSink::new("player", false));

    controller.start(sink.clone(), &format!("{origin}/vod/gone.m3u8"));
    let current = controller.start(sink.clone(), &format!("{origin}/vod/media.m3u8"));

    assert_eq!(controller.settle().await, Settled::Playing);
    assert_eq!(controller.current_token(), Some(current));
}

#[tokio::test]
async fn test_native_sink_skips_the_adaptive_engine() {
    let mut controller = new_controller(None);
    let sink = Arc::new(HeadlessSink::new("safari", true));

    controller.start(sink.clone(), "http://127.0.0.1:9/never-fetched.m3u8");

    assert_eq!(controller.strategy(), Some(PlaybackStrategy::Native));
    assert_eq!(controller.settle().await, Settled::Playing);
    assert_eq!(
        sink.current_source().as_deref(),
        Some("http://127.0.0.1:9/never-fetched.m3u8")
    );
}

#[tokio::test]
async fn test_plays_through_the_gateway() {
    let media_service = serve(Router::new().route("/streaming", get(protected))).await;

    let mut config = Config::default();
    config.upstream.media_service_base = media_service;
    let gateway = serve(create_app(AppState::new(config).unwrap())).await;

    let sink = Arc::new(HeadlessSink::new("player", false));
    let mut controller = new_controller(Some("viewer"));
    controller.start(sink.clone(), &format!("{gateway}/stream?filmId=42"));

    assert_eq!(controller.settle().await, Settled::Playing);
    assert_eq!(
        sink.current_source(),
        Some(format!("{gateway}/low/index.m3u8"))
    );

    let mut anonymous = new_controller(None);
    anonymous.start(sink, &format!("{gateway}/stream?filmId=42"));
    match anonymous.settle().await {
        Settled::Failed(report) => assert_eq!(report.upstream_status, Some(401)),
        other => panic!("expected failure, got {other:?}"),
    }
}

fn media_error(token: SessionToken) -> TaggedEvent {
    TaggedEvent {
        token,
        event: EngineEvent::Error(PlaybackError::fatal(ErrorCategory::Media, "bufferAppendError")),
    }
}

#[tokio::test]
async fn test_media_recovery_reloads_and_resumes() {
    let origin = spawn_origin().await;
    let mut controller = new_controller(None);
    let sink = Arc::new(HeadlessSink::new("player", false));
    let variant = format!("{origin}/vod/low/index.m3u8");

    controller.start(sink.clone(), &format!("{origin}/vod/master.m3u8"));
    assert_eq!(controller.settle().await, Settled::Playing);

    // Decoder dropped its source; recovery has to put it back
    sink.release();
    let token = controller.current_token().unwrap();
    assert!(controller.handle_event(media_error(token)).is_none());
    assert_eq!(controller.state(), PlaybackState::Recovering);

    assert_eq!(controller.settle().await, Settled::Playing);
    assert_eq!(sink.current_source(), Some(variant));

    let report = controller.handle_event(media_error(token)).unwrap();
    assert_eq!(report.kind, TerminalKind::Playback);
    assert!(sink.current_source().is_none());
}

#[tokio::test]
async fn test_destroy_during_load_leaves_sink_alone() {
    let origin = spawn_origin().await;
    let (tx, mut rx) = mpsc::unbounded_channel::<TaggedEvent>();
    let token = SessionTokenMint::default().mint();
    let sink = Arc::new(HeadlessSink::new("player", false));

    let mut engine = HlsEngine::new(
        reqwest::Client::new(),
        EngineConfig::default(),
        None,
        EventEmitter::new(token, tx),
    );
    engine.attach(sink.clone());
    engine.load(&format!("{origin}/vod/slow.m3u8"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.destroy();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(sink.current_source().is_none());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_replaced_adaptive_load_cannot_overwrite_new_source() {
    let origin = spawn_origin().await;
    let token = SessionTokenMint::default().mint();
    let sink = Arc::new(HeadlessSink::new("player", false));
    let (tx, _rx) = mpsc::unbounded_channel::<TaggedEvent>();

    let mut old = HlsEngine::new(
        reqwest::Client::new(),
        EngineConfig::default(),
        None,
        EventEmitter::new(token, tx.clone()),
    );
    old.attach(sink.clone());
    old.load(&format!("{origin}/vod/master.m3u8"));
    old.destroy();

    let mut replacement = NativeSourceEngine::new(EventEmitter::new(token, tx), false);
    replacement.attach(sink.clone());
    replacement.load("http://gw.local/replacement.m3u8");

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        sink.current_source().as_deref(),
        Some("http://gw.local/replacement.m3u8")
    );
}
