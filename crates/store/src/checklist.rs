//! Two-level markdown checklist
//!
//! ```text
//! # Optional title
//!
//! ## 1. Setup
//! - [ ] 1.1 Create config file
//! - [x] 1.2 Install dependencies
//! ```
//!
//! The document text is authoritative. Ids come from the item lines themselves;
//! nothing else indexes them.

use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::{Result, StoreError};

/// Marker every open item carries
pub const UNCHECKED_MARKER: &str = "- [ ]";

fn item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*- \[( |x|X)\]\s+(\d+\.\d+)(?:\s+(.*?))?\s*$").expect("valid item regex")
    })
}

fn task_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+").expect("valid task id regex"))
}

/// Extract the leading `N.M` id from a task label such as `"1.2 Write tests"`
pub fn task_id_from(label: &str) -> Option<String> {
    task_id_re()
        .find(label.trim_start())
        .map(|m| m.as_str().to_string())
}

/// Whole-string `N.M` check for ids that end up in file names
pub fn is_task_id(id: &str) -> bool {
    task_id_re()
        .find(id)
        .is_some_and(|m| m.end() == id.len())
}

/// A single checklist entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanItem {
    pub id: String,
    pub text: String,
    pub done: bool,
}

impl PlanItem {
    /// `"1.1 Create config file"`
    pub fn label(&self) -> String {
        if self.text.is_empty() {
            self.id.clone()
        } else {
            format!("{} {}", self.id, self.text)
        }
    }
}

/// A `## ` section and its items
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanSection {
    /// Heading text after `## `; empty for items that precede any heading
    pub title: String,
    pub items: Vec<PlanItem>,
}

/// Parsed checklist
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    pub title: Option<String>,
    pub sections: Vec<PlanSection>,
}

impl Plan {
    /// Parse checklist text. Lines that are neither headings nor items are dropped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut plan = Plan::default();
        let mut seen = HashSet::new();

        for line in text.lines() {
            let trimmed = line.trim_end();

            if let Some(title) = trimmed.strip_prefix("## ") {
                plan.sections.push(PlanSection {
                    title: title.trim().to_string(),
                    items: Vec::new(),
                });
                continue;
            }

            if let Some(title) = trimmed.strip_prefix("# ") {
                if plan.title.is_none() && plan.sections.is_empty() {
                    plan.title = Some(title.trim().to_string());
                }
                continue;
            }

            let Some(caps) = item_re().captures(trimmed) else {
                continue;
            };

            let id = caps[2].to_string();
            if !seen.insert(id.clone()) {
                return Err(StoreError::DuplicateId(id));
            }

            let item = PlanItem {
                done: &caps[1] != " ",
                text: caps
                    .get(3)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
                id,
            };

            if plan.sections.is_empty() {
                plan.sections.push(PlanSection::default());
            }
            if let Some(section) = plan.sections.last_mut() {
                section.items.push(item);
            }
        }

        Ok(plan)
    }

    /// Render back to checklist text
    pub fn render(&self) -> String {
        let mut out = String::new();

        if let Some(title) = &self.title {
            out.push_str(&format!("# {}\n\n", title));
        }

        for (idx, section) in self.sections.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            if !section.title.is_empty() {
                out.push_str(&format!("## {}\n", section.title));
            }
            for item in &section.items {
                let marker = if item.done { "x" } else { " " };
                out.push_str(&format!("- [{}] {}\n", marker, item.label()));
            }
        }

        out
    }

    /// All items in document order
    pub fn items(&self) -> impl Iterator<Item = &PlanItem> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }

    pub fn find(&self, id: &str) -> Option<&PlanItem> {
        self.items().find(|item| item.id == id)
    }

    /// First open item in section order, then item order
    pub fn next_unchecked(&self) -> Option<&PlanItem> {
        self.items().find(|item| !item.done)
    }

    pub fn all_complete(&self) -> bool {
        self.items().all(|item| item.done)
    }

    /// (done, total)
    pub fn progress(&self) -> (usize, usize) {
        let total = self.items().count();
        let done = self.items().filter(|item| item.done).count();
        (done, total)
    }
}

/// Flip `- [ ] <id>` to `- [x] <id>`.
///
/// The id must be followed by whitespace or the end of the line, so `1.1` never
/// touches `1.10`. Re-marking a done id leaves the text unchanged.
pub fn mark_complete(text: &str, id: &str) -> String {
    let pattern = format!(r"(?m)^(\s*)- \[ \]([ \t]+){}([ \t]|$)", regex::escape(id));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!("Cannot build completion pattern for {}: {}", id, e);
            return text.to_string();
        }
    };

    re.replace_all(text, |caps: &regex::Captures| {
        format!("{}- [x]{}{}{}", &caps[1], &caps[2], id, &caps[3])
    })
    .into_owned()
}

/// True iff no unchecked marker remains anywhere in the text
pub fn all_complete(text: &str) -> bool {
    !text.contains(UNCHECKED_MARKER)
}

/// The checklist document on disk
#[derive(Debug, Clone)]
pub struct ChecklistStore {
    path: PathBuf,
}

impl ChecklistStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Replace the document
    pub async fn save(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, text).await?;
        debug!("Saved checklist: {:?}", self.path);
        Ok(())
    }

    /// Document text; unreadable or missing documents read as empty
    pub async fn load_text(&self) -> String {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No checklist at {:?}", self.path);
                String::new()
            }
            Err(e) => {
                warn!("Failed to read checklist {:?}: {}", self.path, e);
                String::new()
            }
        }
    }

    pub async fn plan(&self) -> Result<Plan> {
        Plan::parse(&self.load_text().await)
    }

    pub async fn next_unchecked(&self) -> Result<Option<PlanItem>> {
        Ok(self.plan().await?.next_unchecked().cloned())
    }

    /// Mark `id` done; returns whether the document changed
    pub async fn mark_complete(&self, id: &str) -> Result<bool> {
        let text = self.load_text().await;
        let updated = mark_complete(&text, id);
        if updated == text {
            debug!("Checklist item {} already complete or absent", id);
            return Ok(false);
        }
        self.save(&updated).await?;
        info!("Marked task {} complete", id);
        Ok(true)
    }

    pub async fn all_complete(&self) -> bool {
        all_complete(&self.load_text().await)
    }
}
