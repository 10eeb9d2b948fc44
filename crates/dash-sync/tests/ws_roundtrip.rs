//! 실제 WebSocket 서버와의 왕복 테스트.

use std::sync::Arc;
use std::time::Duration;

use dash_core::{AppState, Domain};
use dash_sync::{SyncClient, SyncOptions, WsConnector};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

async fn next_json(ws: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        match ws.next().await.expect("stream ended").expect("ws error") {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            _ => continue,
        }
    }
}

fn sale_frame(product_id: &str, ts: &str) -> Message {
    Message::Text(
        json!({
            "type": "data",
            "channel": "sales",
            "data": {
                "timestamp": ts,
                "product_id": product_id,
                "product_name": "Widget",
                "region": "APAC",
                "quantity": 2,
                "unit_price": "12.50",
                "revenue": "25.00"
            }
        })
        .to_string(),
    )
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

#[tokio::test]
async fn subscribes_routes_and_resubscribes_over_websocket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // 첫 번째 연결: 구독 확인 후 데이터 하나 보내고 종료
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        assert_eq!(
            next_json(&mut ws).await,
            json!({"type": "subscribe", "channel": "sales"})
        );
        ws.send(Message::Text(
            r#"{"type":"subscribed","channel":"sales"}"#.to_string(),
        ))
        .await
        .unwrap();
        ws.send(sale_frame("P1", "2024-03-01T10:00:00Z")).await.unwrap();
        ws.close(None).await.unwrap();
        drop(ws);

        // 두 번째 연결: 구독이 다시 전송되어야 함
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        assert_eq!(
            next_json(&mut ws).await,
            json!({"type": "subscribe", "channel": "sales"})
        );
        ws.send(sale_frame("P2", "2024-03-01T10:00:05Z")).await.unwrap();

        // 클라이언트 종료까지 유지
        while let Some(Ok(_)) = ws.next().await {}
    });

    let state = AppState::with_defaults();
    let client = SyncClient::start(
        Arc::new(WsConnector::new(format!("ws://{}/ws", addr))),
        state.clone(),
        SyncOptions::default()
            .with_channels(["sales"])
            .with_reconnect_delay(Duration::from_millis(100)),
    );

    wait_until(|| state.len_of(Domain::Sales) == 2).await;

    {
        let sales = state.sales.read();
        assert_eq!(sales.latest("P2").unwrap().quantity, 2);
        assert_eq!(sales.revenue_by_region().get("APAC").copied(), Some("50.00".parse().unwrap()));
    }
    assert_eq!(client.stats().connects, 2);

    client.shutdown().await;
    server.await.unwrap();
}
