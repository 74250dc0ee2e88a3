//! OpenAI request-shape adapters: pulling the latest user turn's plain text
//! out of an OpenAI-compatible `messages` array.

use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageContent,
    ChatCompletionRequestUserMessageContentPart,
};

/// Finds the most recent `role: "user"` message and flattens its content to
/// plain text, joining multipart content (text segments, image/audio/file
/// placeholders) into a single string.
pub fn last_user_message_text(messages: &[ChatCompletionRequestMessage]) -> Option<String> {
    messages.iter().rev().find_map(|message| match message {
        ChatCompletionRequestMessage::User(user) => Some(user_content_to_text(user.content.clone())),
        _ => None,
    })
}

fn user_content_to_text(content: ChatCompletionRequestUserMessageContent) -> String {
    match content {
        ChatCompletionRequestUserMessageContent::Text(t) => t,
        ChatCompletionRequestUserMessageContent::Array(parts) => parts
            .into_iter()
            .map(|p| match p {
                ChatCompletionRequestUserMessageContentPart::Text(t) => t.text,
                ChatCompletionRequestUserMessageContentPart::ImageUrl(img) => {
                    format!("[image_url:{}]", img.image_url.url)
                }
                ChatCompletionRequestUserMessageContentPart::InputAudio(_) => "[input_audio]".into(),
                ChatCompletionRequestUserMessageContentPart::File(_) => "[file]".into(),
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}
