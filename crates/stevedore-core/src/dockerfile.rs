//! In-memory Dockerfile model.
//!
//! A document holds at most one directive per [`Section`]. Sections are an
//! ordered enum, so rendering always follows the same instruction order no
//! matter in which order directives were added.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use stevedore_runtime::InstallBlock;
use stevedore_schema::options;

/// Position of a directive in the rendered file, in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    From,
    Maintainer,
    Label,
    Env,
    Copy,
    Volume,
    Expose,
    PreDepends,
    Dependencies,
    User,
    Workdir,
    PostDepends,
    Onbuild,
    Entrypoint,
    Cmd,
}

impl Section {
    pub const ALL: [Self; 15] = [
        Self::From,
        Self::Maintainer,
        Self::Label,
        Self::Env,
        Self::Copy,
        Self::Volume,
        Self::Expose,
        Self::PreDepends,
        Self::Dependencies,
        Self::User,
        Self::Workdir,
        Self::PostDepends,
        Self::Onbuild,
        Self::Entrypoint,
        Self::Cmd,
    ];
}

/// One rendered block of the Dockerfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    From(String),
    Maintainer(String),
    /// Label entries, already in `key="value"` form.
    Label(Vec<String>),
    Env(Vec<(String, String)>),
    Copy {
        source: String,
        destination: String,
    },
    Volume(Vec<String>),
    Expose(Vec<String>),
    PreDepends(Vec<String>),
    Dependencies(InstallBlock),
    User(String),
    Workdir(String),
    PostDepends(Vec<String>),
    Onbuild(Vec<String>),
    Entrypoint(Vec<String>),
    Cmd(Vec<String>),
}

const CONTINUATION: &str = " \\\n";
const RUN_INDENT: &str = "    ";

/// Double-quote `value`, escaping backslashes and quotes. Line breaks are
/// written as `\n`/`\r` so a value always stays inside its directive.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' | '"' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn json_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// `KEYWORD a \` / `        b` with continuation lines aligned under the
/// first argument.
fn continued(keyword: &str, items: &[String]) -> String {
    let separator = format!("{CONTINUATION}{}", " ".repeat(keyword.len() + 1));
    format!("{keyword} {}", items.join(&separator))
}

fn exec_form(keyword: &str, args: &[String]) -> String {
    let separator = format!(",{CONTINUATION}{}", " ".repeat(keyword.len() + 2));
    let quoted: Vec<String> = args.iter().map(|a| json_string(a)).collect();
    format!("{keyword} [{}]", quoted.join(&separator))
}

fn run_hook(option: &str, commands: &[String]) -> String {
    let separator = format!(" &&{CONTINUATION}{RUN_INDENT}");
    format!("# {option}\nRUN {}", commands.join(&separator))
}

fn install(block: &InstallBlock) -> String {
    let mut out = format!("# Installing dependencies\nRUN {}", block.preamble);
    for package in &block.packages {
        out.push_str(CONTINUATION);
        out.push_str(RUN_INDENT);
        out.push_str(package);
    }
    if let Some(cleanup) = &block.cleanup {
        out.push_str(CONTINUATION);
        out.push_str(RUN_INDENT);
        out.push_str("&& ");
        out.push_str(cleanup);
    }
    out
}

impl Directive {
    pub fn section(&self) -> Section {
        match self {
            Self::From(_) => Section::From,
            Self::Maintainer(_) => Section::Maintainer,
            Self::Label(_) => Section::Label,
            Self::Env(_) => Section::Env,
            Self::Copy { .. } => Section::Copy,
            Self::Volume(_) => Section::Volume,
            Self::Expose(_) => Section::Expose,
            Self::PreDepends(_) => Section::PreDepends,
            Self::Dependencies(_) => Section::Dependencies,
            Self::User(_) => Section::User,
            Self::Workdir(_) => Section::Workdir,
            Self::PostDepends(_) => Section::PostDepends,
            Self::Onbuild(_) => Section::Onbuild,
            Self::Entrypoint(_) => Section::Entrypoint,
            Self::Cmd(_) => Section::Cmd,
        }
    }

    /// Render the directive without a trailing newline.
    pub fn render(&self) -> String {
        match self {
            Self::From(image) => format!("FROM {image}"),
            Self::Maintainer(m) => format!("MAINTAINER {m}"),
            Self::Label(entries) => continued("LABEL", entries),
            Self::Env(vars) => {
                let entries: Vec<String> = vars
                    .iter()
                    .map(|(k, v)| format!("{k}={}", quote(v)))
                    .collect();
                continued("ENV", &entries)
            }
            Self::Copy {
                source,
                destination,
            } => format!("COPY {source} {destination}"),
            Self::Volume(paths) => continued("VOLUME", paths),
            Self::Expose(ports) => continued("EXPOSE", ports),
            Self::PreDepends(commands) => run_hook(options::RUN_PREDEPENDS, commands),
            Self::Dependencies(block) => install(block),
            Self::User(user) => format!("USER {user}"),
            Self::Workdir(dir) => format!("WORKDIR {dir}"),
            Self::PostDepends(commands) => run_hook(options::RUN_POSTDEPENDS, commands),
            Self::Onbuild(instructions) => instructions
                .iter()
                .map(|i| format!("ONBUILD {i}"))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Entrypoint(args) => exec_form("ENTRYPOINT", args),
            Self::Cmd(args) => exec_form("CMD", args),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockerfileDocument {
    header: Option<String>,
    sections: BTreeMap<Section, Directive>,
}

impl DockerfileDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the comment line rendered above every directive.
    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// Place `directive` in its section, returning the one it replaced.
    pub fn set(&mut self, directive: Directive) -> Option<Directive> {
        self.sections.insert(directive.section(), directive)
    }

    pub fn get(&self, section: Section) -> Option<&Directive> {
        self.sections.get(&section)
    }

    pub fn contains(&self, section: Section) -> bool {
        self.sections.contains_key(&section)
    }

    /// Present sections in rendering order.
    pub fn sections(&self) -> impl Iterator<Item = Section> + '_ {
        self.sections.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(header) = &self.header {
            out.push_str("# ");
            out.push_str(header);
            out.push('\n');
        }
        for directive in self.sections.values() {
            out.push_str(&directive.render());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for DockerfileDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
