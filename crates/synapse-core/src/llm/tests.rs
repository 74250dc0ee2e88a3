use futures_util::StreamExt;

use super::mock::MockLlmClient;
use super::*;

#[tokio::test]
async fn mock_client_returns_queued_responses_in_order() {
    let client = MockLlmClient::new(vec!["first", "second"]);
    assert_eq!(client.complete(vec![LlmMessage::user("hi")]).await.unwrap(), "first");
    assert_eq!(client.complete(vec![LlmMessage::user("hi")]).await.unwrap(), "second");
}

#[tokio::test]
async fn mock_client_streams_the_queued_response_word_by_word() {
    let client = MockLlmClient::new(vec!["a b c"]);
    let mut stream = client.stream(vec![LlmMessage::user("hi")]).await.unwrap();
    let mut joined = String::new();
    while let Some(delta) = stream.next().await {
        joined.push_str(&delta.unwrap().content);
    }
    assert_eq!(joined, "a b c ");
}
