//! The named conversion procedures exposed to MCP clients.
//!
//! All nine conversion tools run the same pipeline. They differ only in which
//! request field they accept ([`SourceKind`]) and in the extension hints used
//! to name a downloaded file, so they are modelled as one enum rather than
//! nine code paths.

use crate::pipeline::input::SourceKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the conversion tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    Youtube,
    BingSearch,
    Webpage,
    Pdf,
    Image,
    Audio,
    Docx,
    Xlsx,
    Pptx,
}

impl ToolKind {
    pub const ALL: [ToolKind; 9] = [
        ToolKind::Youtube,
        ToolKind::BingSearch,
        ToolKind::Webpage,
        ToolKind::Pdf,
        ToolKind::Image,
        ToolKind::Audio,
        ToolKind::Docx,
        ToolKind::Xlsx,
        ToolKind::Pptx,
    ];

    /// The MCP tool name, e.g. `pdf-to-markdown`.
    pub fn tool_name(self) -> &'static str {
        match self {
            ToolKind::Youtube => "youtube-to-markdown",
            ToolKind::BingSearch => "bing-search-to-markdown",
            ToolKind::Webpage => "webpage-to-markdown",
            ToolKind::Pdf => "pdf-to-markdown",
            ToolKind::Image => "image-to-markdown",
            ToolKind::Audio => "audio-to-markdown",
            ToolKind::Docx => "docx-to-markdown",
            ToolKind::Xlsx => "xlsx-to-markdown",
            ToolKind::Pptx => "pptx-to-markdown",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::Youtube => {
                "Convert a YouTube video to markdown, including transcript if available"
            }
            ToolKind::BingSearch => "Convert a Bing search results page to markdown",
            ToolKind::Webpage => "Convert a webpage to markdown",
            ToolKind::Pdf => "Convert a PDF file to markdown",
            ToolKind::Image => "Convert an image to markdown, including metadata and description",
            ToolKind::Audio => {
                "Convert an audio file to markdown, including transcription if possible"
            }
            ToolKind::Docx => "Convert a DOCX file to markdown",
            ToolKind::Xlsx => "Convert an XLSX file to markdown",
            ToolKind::Pptx => "Convert a PPTX file to markdown",
        }
    }

    /// Whether the tool takes a `url` or a `filepath`.
    pub fn source_kind(self) -> SourceKind {
        match self {
            ToolKind::Youtube | ToolKind::BingSearch | ToolKind::Webpage => SourceKind::Remote,
            _ => SourceKind::Local,
        }
    }

    /// Extensions this tool expects its input to carry.
    ///
    /// For remote tools this is the table consulted when naming the
    /// downloaded file: a URL path ending in one of these keeps that
    /// extension, anything else is stored as `.md`.
    pub fn extension_hints(self) -> &'static [&'static str] {
        match self {
            ToolKind::Youtube | ToolKind::BingSearch | ToolKind::Webpage => &["pdf"],
            ToolKind::Pdf => &["pdf"],
            ToolKind::Image => &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"],
            ToolKind::Audio => &["mp3", "wav", "m4a", "ogg", "flac"],
            ToolKind::Docx => &["docx"],
            ToolKind::Xlsx => &["xlsx", "xls"],
            ToolKind::Pptx => &["pptx"],
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    /// Accepts either the full tool name (`pdf-to-markdown`) or its short
    /// form (`pdf`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let short = s.strip_suffix("-to-markdown").unwrap_or(&s);
        ToolKind::ALL
            .into_iter()
            .find(|k| k.tool_name().trim_end_matches("-to-markdown") == short)
            .ok_or_else(|| format!("unknown tool '{s}'"))
    }
}
