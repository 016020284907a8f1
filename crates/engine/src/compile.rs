use std::borrow::Cow;
use std::fmt;

use wgpu::naga;

/// Marker whose presence means the source already declares the parameter block.
pub const PARAMS_MARKER: &str = "struct Params";

/// Canonical parameter declaration prepended to fragments that lack one.
pub const PARAMS_PREAMBLE: &str = "struct Params {
    time: f32,
    _pad0: f32,
    resolution: vec2f,
    mouse: vec2f,
    deltaTime: f32,
    _pad1: f32,
}

@group(0) @binding(0) var<uniform> params: Params;
";

/// Full-screen quad drawn as two triangles from `vertex_index`; no vertex buffer.
pub(crate) const VERTEX_STAGE: &str = "@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> @builtin(position) vec4f {
    var corners = array<vec2f, 6>(
        vec2f(-1.0, -1.0),
        vec2f(1.0, -1.0),
        vec2f(-1.0, 1.0),
        vec2f(-1.0, 1.0),
        vec2f(1.0, -1.0),
        vec2f(1.0, 1.0),
    );
    return vec4f(corners[vertex_index], 0.0, 1.0);
}
";

pub(crate) const VERTEX_ENTRY: &str = "vs_main";
pub(crate) const FRAGMENT_ENTRY: &str = "fs_main";

/// Prepends [`PARAMS_PREAMBLE`] unless the source already declares `Params`.
pub fn inject_params_preamble(source: &str) -> Cow<'_, str> {
    if source.contains(PARAMS_MARKER) {
        Cow::Borrowed(source)
    } else {
        Cow::Owned(join_sources(PARAMS_PREAMBLE, source))
    }
}

/// Lines that [`inject_params_preamble`] adds in front of the user's first line.
pub(crate) fn preamble_lines(source: &str) -> u32 {
    if source.contains(PARAMS_MARKER) {
        0
    } else {
        prefix_lines(PARAMS_PREAMBLE)
    }
}

/// Program text handed to the compiler with the number of engine-owned lines
/// in front of the caller's source.
pub(crate) struct AssembledSource {
    pub text: String,
    pub prelude_lines: u32,
}

pub(crate) fn with_vertex_stage(fragment: &str) -> AssembledSource {
    AssembledSource {
        text: join_sources(VERTEX_STAGE, fragment),
        prelude_lines: prefix_lines(VERTEX_STAGE),
    }
}

fn join_sources(prefix: &str, source: &str) -> String {
    let mut text = String::with_capacity(prefix.len() + source.len() + 1);
    text.push_str(prefix);
    text.push('\n');
    text.push_str(source);
    text
}

fn prefix_lines(prefix: &str) -> u32 {
    prefix.matches('\n').count() as u32 + 1
}

/// One error-severity compiler message.
///
/// `line` is 1-based in the caller's source; 0 means the message could not be
/// attributed to a line the caller wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    pub fn unattributed(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }
}

/// Ordered error diagnostics; empty means the compile succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileDiagnostics(Vec<Diagnostic>);

impl CompileDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Re-expresses line numbers relative to source that followed `lines`
    /// lines of engine-owned prelude.
    pub(crate) fn rebased(self, lines: u32) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|diagnostic| Diagnostic {
                    line: diagnostic.line.checked_sub(lines).filter(|l| *l > 0).unwrap_or(0),
                    message: diagnostic.message,
                })
                .collect(),
        )
    }
}

impl From<Diagnostic> for CompileDiagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl FromIterator<Diagnostic> for CompileDiagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for CompileDiagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for CompileDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, diagnostic) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "Line {}: {}", diagnostic.line, diagnostic.message)?;
        }
        Ok(())
    }
}

/// Parses and validates assembled WGSL with naga, then checks that the
/// fragment entry point exists. Lines refer to `source` as given.
pub(crate) fn front_end_check(source: &str) -> CompileDiagnostics {
    let module = match naga::front::wgsl::parse_str(source) {
        Ok(module) => module,
        Err(err) => {
            let mut message = err.message().to_string();
            if let Some((_, label)) = err.labels().next() {
                if !label.is_empty() {
                    message = format!("{message}: {label}");
                }
            }
            let line = err.location(source).map_or(0, |loc| loc.line_number);
            return Diagnostic::new(line, message).into();
        }
    };

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    if let Err(err) = validator.validate(&module) {
        let line = err.location(source).map_or(0, |loc| loc.line_number);
        return Diagnostic::new(line, error_chain(err.as_inner())).into();
    }

    let has_fragment = module
        .entry_points
        .iter()
        .any(|ep| ep.stage == naga::ShaderStage::Fragment && ep.name == FRAGMENT_ENTRY);
    if !has_fragment {
        return Diagnostic::unattributed(format!(
            "missing fragment entry point `{FRAGMENT_ENTRY}`"
        ))
        .into();
    }

    CompileDiagnostics::new()
}

/// Runs the front-end checks a submission goes through without touching a
/// device. Lines refer to `fragment` exactly as the caller wrote it.
pub fn preflight(fragment: &str) -> CompileDiagnostics {
    let injected = inject_params_preamble(fragment);
    let assembled = with_vertex_stage(&injected);
    front_end_check(&assembled.text)
        .rebased(assembled.prelude_lines)
        .rebased(preamble_lines(fragment))
}

/// Keeps error-severity messages reported by the device compiler.
pub(crate) fn collect_device_errors(info: &wgpu::CompilationInfo) -> CompileDiagnostics {
    info.messages
        .iter()
        .filter(|message| message.message_type == wgpu::CompilationMessageType::Error)
        .map(|message| {
            Diagnostic::new(
                message.location.map_or(0, |loc| loc.line_number),
                message.message.clone(),
            )
        })
        .collect()
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
