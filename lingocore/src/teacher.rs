use serde::{Deserialize, Serialize};

/// A review left for a teacher.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub reviewer_name: String,
    pub reviewer_rating: f64,
    pub comment: String,
    #[serde(default)]
    pub reviewer_avatar: String,
}

/// The value stored under a key of the teachers collection; the key
/// itself is not part of the value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeacherProfile {
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub levels: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub price_per_hour: f64,
    #[serde(default)]
    pub lessons_done: u64,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub lesson_info: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub experience: String,
}

/// A catalog entry as fetched from the store.  The `id` is the key it
/// was stored under and doubles as the pagination ordering key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    #[serde(flatten)]
    pub profile: TeacherProfile,
}

/// One page of teachers as returned by a range query.
///
/// `fetched` counts the raw entries returned by the store and
/// `last_key` is the key of the last of those entries, regardless of
/// whether every entry could be decoded into a `Teacher`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TeacherPage {
    pub teachers: Vec<Teacher>,
    pub last_key: Option<String>,
    pub fetched: usize,
}

mod impls;
pub mod traits;
