//! End-to-end tests: a controller talking to a local WebSocket server over
//! the JSON envelope, in both wire dialects.

use futures_util::{SinkExt, StreamExt};
use rstest::rstest;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use chatview::bindings::classes;
use chatview::controller::ChatController;
use chatview::protocol::{Inbound, Outbound, OutboundMessage, WireDialect};
use chatview::theme::MemoryStore;
use chatview::{chat_page, ClientConfig, PendingAttachment, SocketTransport};

// ---------------------------------------------------------------------------
// Wire vocabulary
// ---------------------------------------------------------------------------

#[rstest]
#[case(WireDialect::Portuguese, "enviar_mensagem", "mensagem")]
#[case(WireDialect::English, "handle_message", "message")]
fn test_send_event_vocabulary(#[case] dialect: WireDialect, #[case] event: &str, #[case] field: &str) {
    let frame = Outbound::Send(OutboundMessage {
        text: "oi".into(),
        attachment: None,
    })
    .to_frame(dialect);
    assert_eq!(frame["event"], event);
    assert_eq!(frame["data"][field], "oi");
}

#[rstest]
#[case(WireDialect::Portuguese, json!({"event": "resposta_servidor", "data": {"resposta": "r"}}))]
#[case(WireDialect::English, json!({"event": "server_response", "data": {"reply": "r"}}))]
fn test_full_response_vocabulary(#[case] dialect: WireDialect, #[case] frame: Value) {
    assert_eq!(
        Inbound::from_frame(&frame.to_string(), dialect),
        Some(Inbound::FullResponse("r".into()))
    );
}

#[rstest]
#[case(WireDialect::Portuguese)]
#[case(WireDialect::English)]
fn test_stream_events_are_dialect_independent(#[case] dialect: WireDialect) {
    let chunk = json!({"event": "stream_chunk", "data": {"chunk": "x"}}).to_string();
    assert_eq!(Inbound::from_frame(&chunk, dialect), Some(Inbound::StreamChunk("x".into())));
    let end = json!({"event": "stream_end"}).to_string();
    assert_eq!(Inbound::from_frame(&end, dialect), Some(Inbound::StreamEnd));
}

// ---------------------------------------------------------------------------
// Live socket
// ---------------------------------------------------------------------------

/// Accept one client, record the frames it sends, and answer every send with
/// `reply_chunks` streamed then `stream_end`. Stops after `expected` frames.
async fn spawn_server(
    dialect: WireDialect,
    expected: usize,
    reply_chunks: Vec<&'static str>,
) -> (String, tokio::task::JoinHandle<Vec<Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let mut received = Vec::new();
        while received.len() < expected {
            let Some(Ok(WsMessage::Text(text))) = ws.next().await else {
                break;
            };
            let frame: Value = serde_json::from_str(&text).unwrap();
            if frame["event"] == dialect.send_event() {
                for chunk in &reply_chunks {
                    let out = Inbound::StreamChunk(chunk.to_string()).to_frame(dialect).unwrap();
                    ws.send(WsMessage::Text(out.to_string())).await.unwrap();
                }
                let end = Inbound::StreamEnd.to_frame(dialect).unwrap();
                ws.send(WsMessage::Text(end.to_string())).await.unwrap();
            }
            received.push(frame);
        }
        let _ = ws.close(None).await;
        received
    });
    (url, handle)
}

#[tokio::test]
async fn test_streamed_exchange_over_socket() {
    let dialect = WireDialect::Portuguese;
    let (url, server) = spawn_server(dialect, 1, vec!["Hel", "lo ", "world"]).await;

    let (transport, mut inbound) = SocketTransport::connect(&url, dialect).await.unwrap();
    let mut c = ChatController::new(
        chat_page(),
        transport,
        Box::new(MemoryStore::default()),
        &ClientConfig::default(),
    )
    .unwrap();

    c.set_input_text("diga olá");
    assert!(c.submit().unwrap());

    while let Some(event) = inbound.recv().await {
        c.handle_inbound(event).unwrap();
    }
    c.connection_lost();

    let doc = c.document();
    let messages = doc.child_elements(c.view().chat_log);
    assert_eq!(messages.len(), 2);
    assert_eq!(doc.text_content(messages[1]), "Hello world");
    assert!(!doc.has_class(messages[1], classes::THINKING));

    let frames = server.await.unwrap();
    assert_eq!(frames[0]["event"], "enviar_mensagem");
    assert_eq!(frames[0]["data"]["mensagem"], "diga olá");
}

#[tokio::test]
async fn test_handshake_precedes_first_message() {
    let dialect = WireDialect::English;
    let (url, server) = spawn_server(dialect, 2, vec!["ok"]).await;

    let (transport, mut inbound) = SocketTransport::connect(&url, dialect).await.unwrap();
    let config = ClientConfig {
        dialect,
        handshake_on_connect: true,
        ..ClientConfig::default()
    };
    let mut c = ChatController::new(chat_page(), transport, Box::new(MemoryStore::default()), &config).unwrap();

    let first = inbound.recv().await.unwrap();
    assert_eq!(first, Inbound::Connected);
    c.handle_inbound(first).unwrap();
    assert!(c.is_connected());

    c.stage_attachment(PendingAttachment::from_bytes("a.pdf", "application/pdf", b"%PDF-1.7"));
    c.submit().unwrap();
    while let Some(event) = inbound.recv().await {
        c.handle_inbound(event).unwrap();
    }

    let frames = server.await.unwrap();
    assert_eq!(frames[0], json!({"event": "conectar"}));
    assert_eq!(frames[1]["event"], "handle_message");
    assert_eq!(frames[1]["data"]["message"], "Resuma o conteúdo deste PDF para mim.");
    assert!(frames[1]["data"]["arquivo"]
        .as_str()
        .unwrap()
        .starts_with("data:application/pdf;base64,"));

    let doc = c.document();
    let user = doc.child_elements(c.view().chat_log)[0];
    let link = doc.find_by_class(user, classes::DOCUMENT_LINK).unwrap();
    assert_eq!(doc.text_content(link), "a.pdf");
}
