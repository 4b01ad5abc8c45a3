use crate::session::WorkflowKind;
use async_trait::async_trait;
use textwrap::wrap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub heading: String,
    pub body: String,
}

impl ReportSection {
    pub fn new(heading: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            body: body.into(),
        }
    }
}

/// Everything a report generator sees about a finished interview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub kind: WorkflowKind,
    pub title: String,
    pub abstraction_mode: bool,
    pub sections: Vec<ReportSection>,
}

#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, request: &ReportRequest) -> anyhow::Result<String>;
}

/// Renders the request as plain markdown, wrapping prose at `width`.
#[derive(Debug, Clone)]
pub struct MarkdownReportGenerator {
    width: usize,
}

impl MarkdownReportGenerator {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    pub fn render(&self, request: &ReportRequest) -> String {
        let mut out = format!("# {}\n\n", request.title);
        if request.abstraction_mode {
            out.push_str("_Names and specifics are abstracted in this report._\n\n");
        }
        for section in &request.sections {
            out.push_str(&format!("## {}\n\n", section.heading));
            for paragraph in section.body.split('\n') {
                if paragraph.trim().is_empty() {
                    continue;
                }
                if paragraph.starts_with("- ") {
                    out.push_str(paragraph.trim_end());
                    out.push('\n');
                    continue;
                }
                for line in wrap(paragraph, self.width) {
                    out.push_str(line.trim_end());
                    out.push('\n');
                }
            }
            out.push('\n');
        }
        out.trim_end().to_string() + "\n"
    }
}

impl Default for MarkdownReportGenerator {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl ReportGenerator for MarkdownReportGenerator {
    async fn generate(&self, request: &ReportRequest) -> anyhow::Result<String> {
        Ok(self.render(request))
    }
}
