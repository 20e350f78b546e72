//! Mock Provider Tests
//!
//! Verifies the Provider trait can be mocked with mockall the way the
//! orchestrator tests drive it.

use async_trait::async_trait;
use mockall::{mock, Sequence};
use serde_json::json;
use taskloom_provider::{ChatParams, ChatResponse, Message, Provider, ProviderError, ToolCall};

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

#[tokio::test]
async fn test_mock_provider_chat_returns_success() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .returning(|_| Ok(ChatResponse::text("Hello from mock!")));

    let response = mock.chat(ChatParams::default()).await.unwrap();
    assert_eq!(response.text_content(), "Hello from mock!");
}

#[tokio::test]
async fn test_mock_provider_chat_returns_error() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .returning(|_| Err(ProviderError::Api("Mock API error".to_string())));

    match mock.chat(ChatParams::default()).await {
        Err(ProviderError::Api(msg)) => assert_eq!(msg, "Mock API error"),
        _ => panic!("Expected Api error"),
    }
}

#[tokio::test]
async fn test_mock_provider_inspects_messages() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .withf(|params| params.messages.len() == 2 && params.messages[0].role == "system")
        .returning(|_| {
            Ok(ChatResponse {
                content: None,
                tool_calls: vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "write_file".to_string(),
                    arguments: json!({"file_path": "a.txt", "content": "x"}),
                }],
                finish_reason: "tool_calls".to_string(),
                usage: Default::default(),
            })
        });

    let params = ChatParams {
        messages: vec![Message::system("sys"), Message::user("do it")],
        ..Default::default()
    };
    let response = mock.chat(params).await.unwrap();
    assert!(response.has_tool_calls());
    assert_eq!(response.tool_calls[0].name, "write_file");
}

#[tokio::test]
async fn test_mock_provider_sequence() {
    let mut mock = MockProvider::new();
    let mut seq = Sequence::new();
    mock.expect_chat()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(ProviderError::RateLimited));
    mock.expect_chat()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(ChatResponse::text("second")));

    assert!(mock.chat(ChatParams::default()).await.is_err());
    assert_eq!(
        mock.chat(ChatParams::default()).await.unwrap().text_content(),
        "second"
    );
}

#[test]
fn test_mock_provider_metadata() {
    let mut mock = MockProvider::new();
    mock.expect_default_model()
        .returning(|| "mock-model".to_string());
    mock.expect_is_configured().returning(|| true);

    assert_eq!(mock.default_model(), "mock-model");
    assert!(mock.is_configured());
}
