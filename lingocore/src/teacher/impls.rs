use serde_json::Value;
use std::ops::Deref;

use crate::{
    error::BackendError,
    teacher::{
        Teacher,
        TeacherPage,
        TeacherProfile,
    },
};

impl Teacher {
    pub fn new(id: impl Into<String>, profile: TeacherProfile) -> Self {
        Self {
            id: id.into(),
            profile,
        }
    }

    /// Decode a stored `(key, value)` entry.
    pub fn from_entry(id: String, value: Value) -> Result<Self, BackendError> {
        let profile = serde_json::from_value::<TeacherProfile>(value)?;
        Ok(Self { id, profile })
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.profile.name, self.profile.surname)
    }

    pub fn speaks(&self, language: &str) -> bool {
        self.profile.languages.iter().any(|l| l == language)
    }

    pub fn has_level(&self, level: &str) -> bool {
        self.profile.levels.iter().any(|l| l == level)
    }

    pub fn into_inner(self) -> TeacherProfile {
        self.profile
    }
}

impl Deref for Teacher {
    type Target = TeacherProfile;

    fn deref(&self) -> &Self::Target {
        &self.profile
    }
}

impl TeacherPage {
    /// Build a page out of raw store entries.  Entries that fail to
    /// decode are skipped but still count toward `fetched` and
    /// `last_key`.
    pub fn from_entries(entries: Vec<(String, Value)>) -> Self {
        let fetched = entries.len();
        let last_key = entries.last().map(|(key, _)| key.clone());
        let teachers = entries.into_iter()
            .filter_map(|(id, value)| match Teacher::from_entry(id.clone(), value) {
                Ok(teacher) => Some(teacher),
                Err(e) => {
                    log::warn!("skipping undecodable teacher entry {id}: {e}");
                    None
                }
            })
            .collect();
        Self {
            teachers,
            last_key,
            fetched,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fetched == 0
    }
}

impl IntoIterator for TeacherPage {
    type Item = Teacher;
    type IntoIter = std::vec::IntoIter<Teacher>;

    fn into_iter(self) -> Self::IntoIter {
        self.teachers.into_iter()
    }
}
