//! Report generation.
//!
//! `BidsReport` walks subjects and sessions, turns each subject's files into
//! one description, and counts identical descriptions across the dataset.
//! The text and JSON writers used by the CLI live here too.

use super::parsing::Parser;
use super::templates::Renderer;
use crate::analysis::{Pattern, ProtocolCounter};
use crate::config::Converters;
use crate::error::{ReportError, Result};
use crate::image::ImageLoader;
use crate::layout::{Layout, Query, SUPPORTED_EXTENSIONS};
use crate::models::{BidsFile, Metadata};
use crate::parameters::final_paragraph;
use crate::utils::reminder;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Methods-section generator for one dataset.
pub struct BidsReport<L, I> {
    layout: L,
    loader: I,
    converters: Converters,
    renderer: Renderer,
    extensions: Vec<String>,
}

impl<L: Layout, I: ImageLoader> BidsReport<L, I> {
    pub fn new(layout: L, loader: I, converters: Converters) -> Self {
        Self {
            layout,
            loader,
            converters,
            renderer: Renderer::bundled(),
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Data file extensions to describe.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    fn parser(&self) -> Parser<'_> {
        Parser::new(&self.layout, &self.loader, &self.converters, &self.renderer)
    }

    /// Describe every subject matching `query` and count distinct descriptions.
    pub fn generate(&self, query: &Query) -> Result<ProtocolCounter> {
        self.generate_with(query, |_| {})
    }

    /// Like [`generate`](Self::generate), calling `on_subject` after each subject.
    pub fn generate_with<F>(&self, query: &Query, mut on_subject: F) -> Result<ProtocolCounter>
    where
        F: FnMut(&str),
    {
        let subjects = self.layout.subjects(query);
        let query = query.without("subject");
        debug!("Reporting on {} subjects", subjects.len());

        let mut counter = ProtocolCounter::new();
        for subject in &subjects {
            counter.add(self.report_subject(subject, &query)?);
            on_subject(subject);
        }

        log_summary(&counter);
        Ok(counter)
    }

    /// Description of one subject across the sessions selected by `query`.
    ///
    /// Sessions without data are skipped with a warning. A session whose
    /// files are all unsupported (PET only, say) adds no paragraph, but as the
    /// last session with files it still supplies the closing conversion sentence.
    pub fn report_subject(&self, subject: &str, query: &Query) -> Result<String> {
        let mut query = query.clone().is("subject", subject);
        let sessions: Vec<Option<String>> = match query.take("session") {
            Some(filter) => filter.values().into_iter().map(Some).collect(),
            None => {
                let found = self.layout.sessions(&query);
                if found.is_empty() {
                    vec![None]
                } else {
                    found.into_iter().map(Some).collect()
                }
            }
        };

        let parser = self.parser();
        let mut descriptions = Vec::new();
        let mut metadata = None;

        for session in sessions {
            let mut session_query = query
                .clone()
                .one_of("extension", self.extensions.iter().cloned());
            if let Some(ref ses) = session {
                session_query = session_query.is("session", ses.clone());
            }

            let files = self.layout.get(&session_query);
            if files.is_empty() {
                let err = ReportError::NoImagingFiles {
                    subject: subject.to_string(),
                    session,
                };
                warn!("{}", err);
                continue;
            }

            let fragments = parser.parse_files(&files)?;
            descriptions.extend(session_fragments(session.as_deref(), fragments));
            metadata = Some(self.layout.metadata(&files[0].path));
        }

        Ok(assemble(&descriptions, metadata.as_ref()))
    }

    /// Describe an explicit file list, partitioned by subject and session.
    ///
    /// Every subject must have files in every session present in `files`.
    pub fn generate_from_files(&self, files: &[BidsFile]) -> Result<ProtocolCounter> {
        let subjects: BTreeSet<&str> = files.iter().filter_map(|f| f.entity("subject")).collect();
        let sessions: BTreeSet<Option<&str>> = files.iter().map(|f| f.entity("session")).collect();

        let parser = self.parser();
        let mut counter = ProtocolCounter::new();

        for subject in subjects {
            let mut descriptions = Vec::new();
            let mut metadata = None;

            for session in &sessions {
                let data_files: Vec<BidsFile> = files
                    .iter()
                    .filter(|f| f.entity("subject") == Some(subject) && f.entity("session") == *session)
                    .cloned()
                    .collect();

                if data_files.is_empty() {
                    return Err(ReportError::NoImagingFiles {
                        subject: subject.to_string(),
                        session: (*session).map(String::from),
                    });
                }

                let fragments = parser.parse_files(&data_files)?;
                descriptions.extend(session_fragments(*session, fragments));
                metadata = Some(self.layout.metadata(&data_files[0].path));
            }

            counter.add(assemble(&descriptions, metadata.as_ref()));
        }

        log_summary(&counter);
        Ok(counter)
    }
}

/// Drop empty fragments and prefix the first with its session.
fn session_fragments(session: Option<&str>, fragments: Vec<String>) -> Vec<String> {
    let mut fragments: Vec<String> = fragments.into_iter().filter(|f| !f.is_empty()).collect();
    if let (Some(ses), Some(first)) = (session, fragments.first_mut()) {
        *first = format!("In session {}, {}", ses, first);
    }
    fragments
}

/// Join paragraphs and close with the conversion sentence when metadata was found.
fn assemble(descriptions: &[String], metadata: Option<&Metadata>) -> String {
    let mut description = descriptions.join("\n");
    if let Some(metadata) = metadata {
        if !description.is_empty() {
            description.push_str("\n\n");
        }
        description.push_str(&final_paragraph(metadata));
    }
    description
}

fn log_summary(counter: &ProtocolCounter) {
    info!("Number of patterns detected: {}", counter.len());
    info!("{}", reminder());
}

/// Sentence naming the generator.
pub fn footer() -> String {
    format!(
        "This section was (in part) generated automatically using bidsreports {}.",
        env!("CARGO_PKG_VERSION")
    )
}

/// Most common description followed by the footer; `None` without patterns.
pub fn generate_text_report(counter: &ProtocolCounter) -> Option<String> {
    let top = counter.most_common().into_iter().next()?;
    Some(format!("{}\n\n{}\n", top.report, footer()))
}

/// Every pattern with its count, most common first.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub generator: String,
    pub patterns: Vec<&'a Pattern>,
}

/// Generate a JSON report.
pub fn generate_json_report(
    counter: &ProtocolCounter,
    generated_at: DateTime<Utc>,
) -> anyhow::Result<String> {
    let report = JsonReport {
        generated_at,
        generator: format!("bidsreports {}", env!("CARGO_PKG_VERSION")),
        patterns: counter.most_common(),
    };
    serde_json::to_string_pretty(&report).map_err(Into::into)
}

/// Write report content to a file.
pub fn write_report(content: &str, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
