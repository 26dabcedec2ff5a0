use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct SendMessageDto {
    #[validate(length(min = 1, message = "Receiver is required"))]
    pub receiver_id: String,
    #[validate(length(min = 1, max = 2000, message = "Message must be between 1-2000 characters"))]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationIdDto {
    pub conversation_id: String,
}
