//! The fixed list of lessons a run works through.
//!
//! A catalog is the transcript document minus transcripts, plus a course title. The NLP
//! Practitioner course ships embedded as the default.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::Result;
use crate::course::{Course, Lesson, Module};

const DEFAULT_CATALOG_JSON: &str = include_str!("../catalogs/nlp-practitioner.json");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogLesson {
    pub id: String,
    pub title: String,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogModule {
    pub id: u32,
    pub title: String,
    pub lessons: Vec<CatalogLesson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Catalog {
    /// Course title used for the Markdown header.
    pub title: String,
    pub modules: Vec<CatalogModule>,
}

impl Catalog {
    /// The embedded NLP Practitioner catalog (7 modules, 51 lessons).
    pub fn builtin() -> Result<Self> {
        Self::from_json(DEFAULT_CATALOG_JSON)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog: {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Seed a transcript document with every transcript unset.
    pub fn to_course(&self) -> Course {
        let modules = self
            .modules
            .iter()
            .map(|module| Module {
                id: module.id,
                title: module.title.clone(),
                lessons: module
                    .lessons
                    .iter()
                    .map(|l| Lesson::new(l.id.clone(), l.title.clone(), l.duration.clone()))
                    .collect(),
            })
            .collect();

        Course::new(modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_seven_modules_and_fifty_one_lessons() -> anyhow::Result<()> {
        let catalog = Catalog::builtin()?;
        let course = catalog.to_course();

        assert_eq!(course.module_count(), 7);
        assert_eq!(course.lesson_count(), 51);
        assert_eq!(course.filled_count(), 0);
        assert_eq!(course.modules[0].lessons[0].id, "HdJTrqV-8kw");
        assert_eq!(
            course.modules[0].lessons[0].youtube_url,
            "https://www.youtube.com/watch?v=HdJTrqV-8kw"
        );
        Ok(())
    }

    #[test]
    fn builtin_catalog_video_ids_are_unique() -> anyhow::Result<()> {
        let course = Catalog::builtin()?.to_course();
        let mut ids: Vec<&str> = course.lessons().map(|(_, l)| l.id.as_str()).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
        Ok(())
    }

    #[test]
    fn from_json_rejects_missing_fields() {
        let err = Catalog::from_json(r#"{"modules": []}"#).unwrap_err();
        assert!(err.to_string().contains("title"));
    }
}
