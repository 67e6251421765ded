use crate::ac::UserId;

/// The store path for the favorites of `user`, or for a single entry
/// within them.
pub fn favorites_path(user: &UserId, teacher_id: Option<&str>) -> String {
    match teacher_id {
        Some(teacher_id) => format!("users/{}/favorites/{teacher_id}", user.as_str()),
        None => format!("users/{}/favorites", user.as_str()),
    }
}

pub mod traits;
