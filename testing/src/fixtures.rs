use lingocore::teacher::{
    Review,
    Teacher,
    TeacherProfile,
};
use serde_json::Value;

/// A teacher with the attributes the filters look at; everything else
/// is filled in with plausible values.
pub fn teacher(
    id: &str,
    price_per_hour: f64,
    languages: &[&str],
    levels: &[&str],
) -> Teacher {
    Teacher::new(id, TeacherProfile {
        name: format!("Name{id}"),
        surname: format!("Surname{id}"),
        languages: languages.iter().map(|s| s.to_string()).collect(),
        levels: levels.iter().map(|s| s.to_string()).collect(),
        rating: 4.5,
        reviews: vec![Review {
            reviewer_name: "Frank".to_string(),
            reviewer_rating: 4.0,
            comment: "Great teacher.".to_string(),
            reviewer_avatar: String::new(),
        }],
        price_per_hour,
        lessons_done: 100,
        avatar_url: format!("https://example.com/{id}.jpg"),
        lesson_info: "Lessons are structured.".to_string(),
        conditions: vec!["Teaches only adults.".to_string()],
        experience: "Ten years.".to_string(),
    })
}

/// `count` teachers with ids `t00`, `t01`, ... so that the string
/// ordering of the ids matches their numbering.
pub fn teachers(count: usize, price_per_hour: f64) -> Vec<Teacher> {
    (0..count)
        .map(|n| teacher(&format!("t{n:02}"), price_per_hour, &["English"], &["A1 Beginner"]))
        .collect()
}

pub fn profile_value(teacher: &Teacher) -> Value {
    serde_json::to_value(&teacher.profile)
        .expect("a profile always serializes")
}

/// The `(key, value)` entries a store would hold for these teachers.
pub fn entries(teachers: &[Teacher]) -> Vec<(String, Value)> {
    teachers.iter()
        .map(|t| (t.id.clone(), profile_value(t)))
        .collect()
}
