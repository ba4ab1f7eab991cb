//! Integration tests for the chat and UIDL endpoints

mod test_utils;

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use mockito::Matcher;
    use serde_json::json;
    use tower::util::ServiceExt;

    use crate::test_utils::{body_to_string, chat_request, completion_body, sse_body, test_app};

    fn post(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    /// Tests the chat endpoint streams the model's answer
    #[tokio::test]
    async fn it_streams_a_chat_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "stream": true,
                "temperature": 0.0,
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(sse_body(&["Hello", " there"]))
            .expect(1)
            .create_async()
            .await;
        let app = test_app(&server.url());

        let response = app
            .oneshot(post("/api/chat", chat_request("hi")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_to_string(response.into_body()).await;
        assert_eq!(body, "Hello there");
        mock.assert_async().await;
    }

    /// Tests malformed JSON is reported as a generic server error
    #[tokio::test]
    async fn it_returns_500_for_malformed_json() {
        let server = mockito::Server::new_async().await;
        let app = test_app(&server.url());

        let response = app
            .oneshot(post("/api/chat", String::from("{\"message\": ")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_to_string(response.into_body()).await, "Error");
    }

    /// Tests a body without the message content is reported the same way
    #[tokio::test]
    async fn it_returns_500_for_missing_content() {
        let server = mockito::Server::new_async().await;
        let app = test_app(&server.url());

        let response = app
            .oneshot(post("/api/chat", json!({"message": "hi"}).to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_to_string(response.into_body()).await, "Error");
    }

    /// Tests a model provider failure is reported as a generic server error
    #[tokio::test]
    async fn it_returns_500_when_the_model_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
            .create_async()
            .await;
        let app = test_app(&server.url());

        let response = app
            .oneshot(post("/api/chat", chat_request("hi")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_to_string(response.into_body()).await, "Error");
    }

    /// Tests the UIDL endpoint runs extraction then streams generation
    #[tokio::test]
    async fn it_streams_a_uidl_document() {
        let mut server = mockito::Server::new_async().await;
        let extraction = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({"stream": false})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body(
                "Generate a sign-up interface containing a table, an image, a button, and a form",
            ))
            .expect(1)
            .create_async()
            .await;
        let generation = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({"stream": true})),
                Matcher::Regex(String::from("Generate a sign-up interface containing")),
                Matcher::Regex(String::from("props-template")),
            ]))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(sse_body(&["{\"uidl\":", "\"1.0.0\"}"]))
            .expect(1)
            .create_async()
            .await;
        let app = test_app(&server.url());

        let response = app
            .oneshot(post("/api/uidl", chat_request("登记表单界面")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_to_string(response.into_body()).await;
        assert_eq!(body, r#"{"uidl":"1.0.0"}"#);
        extraction.assert_async().await;
        generation.assert_async().await;
    }

    /// Tests generation is never requested when extraction fails
    #[tokio::test]
    async fn it_skips_generation_when_extraction_fails() {
        let mut server = mockito::Server::new_async().await;
        let extraction = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({"stream": false})))
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let generation = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({"stream": true})))
            .with_status(200)
            .with_body(sse_body(&["never"]))
            .expect(0)
            .create_async()
            .await;
        let app = test_app(&server.url());

        let response = app
            .oneshot(post("/api/uidl", chat_request("登记表单界面")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_to_string(response.into_body()).await, "Error");
        extraction.assert_async().await;
        generation.assert_async().await;
    }
}
