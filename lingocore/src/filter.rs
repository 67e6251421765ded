use serde::{Deserialize, Serialize};

use crate::teacher::Teacher;

/// The three optional predicates a teacher listing may be narrowed
/// down with.  Present predicates are combined by conjunction; an
/// absent predicate always matches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub language: Option<String>,
    pub level: Option<String>,
    pub max_price: Option<f64>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(mut self, value: impl Into<String>) -> Self {
        self.language = Some(value.into());
        self
    }

    pub fn level(mut self, value: impl Into<String>) -> Self {
        self.level = Some(value.into());
        self
    }

    pub fn max_price(mut self, value: f64) -> Self {
        self.max_price = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.language.is_none()
            && self.level.is_none()
            && self.max_price.is_none()
    }
}

pub fn is_visible(teacher: &Teacher, filter: &Filter) -> bool {
    filter.language.as_deref()
        .map_or(true, |language| teacher.speaks(language))
    && filter.level.as_deref()
        .map_or(true, |level| teacher.has_level(level))
    && filter.max_price
        .map_or(true, |max| teacher.price_per_hour <= max)
}

/// Lazily yield the teachers passing `filter`, in input order.
pub fn apply<'a, I>(
    teachers: I,
    filter: &'a Filter,
) -> impl Iterator<Item = &'a Teacher> + 'a
where
    I: IntoIterator<Item = &'a Teacher>,
    I::IntoIter: 'a,
{
    teachers.into_iter()
        .filter(move |teacher| is_visible(teacher, filter))
}
