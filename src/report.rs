//! The report boundary: formatting classified entries for downstream tools.
//!
//! The orchestrator drives a [`Sink`] with `(stream, entry)` events and
//! knows nothing about rendering. [`FormatSink`] is the built-in renderer: a
//! printf-like template over entry fields, terminated with the active
//! delimiter so NUL-delimited output stays unambiguous for consumers.

use crate::entry::Entry;
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Removed,
    Modified,
    Added,
}

impl StreamKind {
    /// Single-letter change code rendered by `%c`.
    pub fn code(self) -> u8 {
        match self {
            StreamKind::Removed => b'R',
            StreamKind::Modified => b'M',
            StreamKind::Added => b'A',
        }
    }
}

/// Consumes the classified streams. Emission order is removed, then
/// modified, then added, each in snapshot traversal order.
pub trait Sink {
    fn emit(&mut self, stream: StreamKind, entry: &Entry) -> io::Result<()>;
    fn finish(&mut self) -> io::Result<()>;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("unknown placeholder %{0}")]
    UnknownPlaceholder(char),
    #[error("template ends in a bare %")]
    TrailingPercent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(Vec<u8>),
    ChangeCode,
    Mode,
    Uid,
    Gid,
    Size,
    Path,
    LinkTarget,
    XattrNames,
    ChangeTime,
}

pub const DEFAULT_FORMAT: &str = "%c %p";

/// A parsed report template. Placeholders: `%c` change code, `%m` octal
/// mode, `%u` uid, `%g` gid, `%s` size, `%p` path, `%l` symlink target,
/// `%x` xattr names, `%t` change time, `%%` a literal percent sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFormat {
    segments: Vec<Segment>,
}

impl ReportFormat {
    pub fn parse(template: &str) -> Result<Self, FormatError> {
        let mut segments = Vec::new();
        let mut literal = Vec::new();
        let mut bytes = template.bytes();

        while let Some(byte) = bytes.next() {
            if byte != b'%' {
                literal.push(byte);
                continue;
            }
            let Some(selector) = bytes.next() else {
                return Err(FormatError::TrailingPercent);
            };
            if selector == b'%' {
                literal.push(b'%');
                continue;
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(match selector {
                b'c' => Segment::ChangeCode,
                b'm' => Segment::Mode,
                b'u' => Segment::Uid,
                b'g' => Segment::Gid,
                b's' => Segment::Size,
                b'p' => Segment::Path,
                b'l' => Segment::LinkTarget,
                b'x' => Segment::XattrNames,
                b't' => Segment::ChangeTime,
                other => return Err(FormatError::UnknownPlaceholder(other as char)),
            });
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(ReportFormat { segments })
    }

    fn render(&self, out: &mut Vec<u8>, stream: StreamKind, entry: &Entry) {
        for segment in &self.segments {
            match segment {
                Segment::Literal(bytes) => out.extend_from_slice(bytes),
                Segment::ChangeCode => out.push(stream.code()),
                Segment::Mode => out.extend_from_slice(format!("{:o}", entry.mode).as_bytes()),
                Segment::Uid => out.extend_from_slice(entry.uid.to_string().as_bytes()),
                Segment::Gid => out.extend_from_slice(entry.gid.to_string().as_bytes()),
                Segment::Size => out.extend_from_slice(entry.size.to_string().as_bytes()),
                Segment::Path => out.extend_from_slice(entry.path_bytes()),
                Segment::LinkTarget => {
                    if let Some(target) = &entry.link_target {
                        out.extend_from_slice(target.as_os_str().as_bytes());
                    }
                }
                Segment::XattrNames => {
                    for (i, name) in entry.xattrs.iter().enumerate() {
                        if i > 0 {
                            out.push(b',');
                        }
                        out.extend_from_slice(name.as_bytes());
                    }
                }
                Segment::ChangeTime => out.extend_from_slice(entry.ctime.to_string().as_bytes()),
            }
        }
    }
}

/// Which streams the sink lets through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportGates {
    pub removed_only: bool,
    pub modified_only: bool,
}

impl ReportGates {
    fn suppresses(self, stream: StreamKind) -> bool {
        match stream {
            StreamKind::Removed => self.modified_only,
            StreamKind::Modified => self.removed_only,
            StreamKind::Added => self.removed_only || self.modified_only,
        }
    }
}

pub struct FormatSink<W: Write> {
    writer: W,
    format: ReportFormat,
    delimiter: u8,
    gates: ReportGates,
    buf: Vec<u8>,
}

impl<W: Write> FormatSink<W> {
    pub fn new(writer: W, format: ReportFormat, delimiter: u8, gates: ReportGates) -> Self {
        FormatSink {
            writer,
            format,
            delimiter,
            gates,
            buf: Vec::new(),
        }
    }
}

impl<W: Write> Sink for FormatSink<W> {
    fn emit(&mut self, stream: StreamKind, entry: &Entry) -> io::Result<()> {
        if self.gates.suppresses(stream) {
            return Ok(());
        }
        self.buf.clear();
        self.format.render(&mut self.buf, stream, entry);
        self.buf.push(self.delimiter);
        self.writer.write_all(&self.buf)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
