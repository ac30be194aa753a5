use super::entity::MessageEntity;
use super::user::User;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    pub voter_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<PollOption>,
    pub total_voter_count: i64,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default = "default_anonymous")]
    pub is_anonymous: bool,
    /// "regular" or "quiz".
    #[serde(default, rename = "type")]
    pub poll_type: String,
    #[serde(default)]
    pub allows_multiple_answers: bool,
    pub correct_option_id: Option<i64>,
    pub explanation: Option<String>,
    #[serde(default)]
    pub explanation_entities: Vec<MessageEntity>,
    pub open_period: Option<i64>,
    pub close_date: Option<i64>,
}

fn default_anonymous() -> bool {
    true
}

/// A user changed their answer in a non-anonymous poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollAnswer {
    pub poll_id: String,
    pub user: Option<User>,
    /// Empty when the user retracted their vote.
    #[serde(default)]
    pub option_ids: Vec<i64>,
}
