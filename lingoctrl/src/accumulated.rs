use lingocore::teacher::Teacher;
use std::{
    collections::HashMap,
    ops::Deref,
};

/// Teachers in the order they were first fetched, with constant time
/// lookup by id.  Only ever grows.
#[derive(Clone, Debug, Default)]
pub struct AccumulatedSet {
    teachers: Vec<Teacher>,
    /// Position of each id within `teachers`.
    ids: HashMap<String, usize>,
}

impl AccumulatedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Teacher> {
        self.ids.get(id).and_then(|&index| self.teachers.get(index))
    }

    /// Append the teachers not already present; an id seen before keeps
    /// its first stored value.  Returns the number added.
    pub fn merge(&mut self, teachers: impl IntoIterator<Item = Teacher>) -> usize {
        let before = self.teachers.len();
        for teacher in teachers {
            if self.ids.contains_key(&teacher.id) {
                log::trace!("dropping duplicate teacher {}", teacher.id);
                continue;
            }
            self.ids.insert(teacher.id.clone(), self.teachers.len());
            self.teachers.push(teacher);
        }
        self.teachers.len() - before
    }
}

impl Deref for AccumulatedSet {
    type Target = [Teacher];

    fn deref(&self) -> &Self::Target {
        &self.teachers
    }
}
