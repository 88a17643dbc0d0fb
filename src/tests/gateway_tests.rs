//! tests/gateway_tests.rs
//! Pruebas del cliente HTTP del gateway (wiremock) y del parseo de webhooks.

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::models::gateway_model::GatewayWebhookEvent;
    use crate::services::gateway_service::{EvolutionGateway, MessageGateway};

    fn gateway_for(server: &MockServer) -> EvolutionGateway {
        EvolutionGateway::new(&format!("{}/", server.uri()), "secret-key", 5)
            .expect("gateway client")
    }

    #[actix_rt::test]
    async fn send_text_posts_number_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/loja"))
            .and(header("apikey", "secret-key"))
            .and(body_json(json!({ "number": "5511987654321", "text": "Olá Ana" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "key": { "remoteJid": "5511987654321@s.whatsapp.net", "fromMe": true, "id": "BAE5F1" },
                "status": "PENDING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = gateway_for(&server)
            .send_text("loja", "5511987654321", "Olá Ana")
            .await
            .expect("send ok");
        assert_eq!(receipt.message_id.as_deref(), Some("BAE5F1"));
    }

    #[actix_rt::test]
    async fn send_text_error_carries_gateway_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/loja"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"message":[{"exists":false,"number":"5511"}]}"#),
            )
            .mount(&server)
            .await;

        let err = gateway_for(&server)
            .send_text("loja", "5511", "Oi")
            .await
            .expect_err("400 must fail");
        let text = format!("{:#}", err);
        assert!(text.contains("400"), "{}", text);
        assert!(text.contains("\"exists\":false"), "{}", text);
    }

    #[actix_rt::test]
    async fn send_text_without_key_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/loja"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
            .mount(&server)
            .await;

        let err = gateway_for(&server)
            .send_text("loja", "5511987654321", "Oi")
            .await
            .expect_err("missing key");
        assert!(format!("{:#}", err).contains("sin 'key'"));
    }

    #[actix_rt::test]
    async fn send_text_network_error_is_a_failure() {
        // Puerto cerrado
        let gateway = EvolutionGateway::new("http://127.0.0.1:9", "k", 2).unwrap();
        assert!(gateway.send_text("loja", "5511987654321", "Oi").await.is_err());
    }

    #[actix_rt::test]
    async fn is_connected_reads_instance_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/instance/connectionState/loja"))
            .and(header("apikey", "secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "instance": { "instanceName": "loja", "state": "open" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/instance/connectionState/filial"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "instance": { "instanceName": "filial", "state": "close" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/instance/connectionState/fantasma"))
            .respond_with(ResponseTemplate::new(404).set_body_string("instance not found"))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        assert!(gateway.is_connected("loja").await.unwrap());
        assert!(!gateway.is_connected("filial").await.unwrap());
        assert!(!gateway.is_connected("fantasma").await.unwrap());
    }

    #[test]
    fn webhook_delivery_ack_is_recognized() {
        let v2: GatewayWebhookEvent = serde_json::from_value(json!({
            "event": "messages.update",
            "instance": "loja",
            "data": { "keyId": "BAE5F1", "status": "DELIVERY_ACK" }
        }))
        .unwrap();
        assert!(v2.is_message_update());
        assert!(v2.is_delivery_ack());
        assert_eq!(v2.message_id(), Some("BAE5F1"));

        let nested: GatewayWebhookEvent = serde_json::from_value(json!({
            "event": "MESSAGES_UPDATE",
            "data": { "key": { "id": "ABC" }, "status": "read" }
        }))
        .unwrap();
        assert!(nested.is_message_update());
        assert!(nested.is_delivery_ack());
        assert_eq!(nested.message_id(), Some("ABC"));
    }

    #[test]
    fn webhook_other_events_are_ignored() {
        let pending: GatewayWebhookEvent = serde_json::from_value(json!({
            "event": "messages.update",
            "data": { "keyId": "BAE5F1", "status": "SERVER_ACK" }
        }))
        .unwrap();
        assert!(!pending.is_delivery_ack());

        let upsert: GatewayWebhookEvent = serde_json::from_value(json!({
            "event": "messages.upsert"
        }))
        .unwrap();
        assert!(!upsert.is_message_update());
        assert_eq!(upsert.message_id(), None);
    }
}
