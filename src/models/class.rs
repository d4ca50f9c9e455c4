use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One unit of curriculum, with its content already ordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(default)]
    pub assessments: Vec<Assessment>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Class {
    /// Malformed ids are never looked up, only reported as invalid.
    pub fn has_valid_id(&self) -> bool {
        self.id > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Video {
    pub id: i32,
    pub class_id: i32,
    pub url: String,
    pub poster: Option<String>,
    #[serde(default)]
    #[sqlx(rename = "position")]
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Resource {
    pub id: i32,
    pub class_id: i32,
    pub title: String,
    pub url: String,
    #[serde(default)]
    #[sqlx(rename = "position")]
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: i32,
    pub class_id: i32,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i32,
    pub text: String,
    pub options: Vec<String>,
    /// Stored as option text, not as an index.
    pub correct_answer: String,
    #[serde(default)]
    pub order: i32,
}

/// What a learner gets to see of a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i32,
    pub text: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}
