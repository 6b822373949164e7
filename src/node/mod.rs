//! The `Node` model: one filesystem entry, classified and annotated with the
//! presentation rules that apply to it.

pub mod classify;
pub mod detail;
pub mod owner;
pub mod spec;
pub mod symlink;

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use crate::config::{Config, Constants};
use crate::git::VcsStatusMap;
use crate::options::Options;

pub use classify::{classify, Classification};
pub use detail::{Cell, DetailField};
pub use owner::{Owner, Owners};
pub use spec::{Collapse, Matcher, NodeSpec, SpecMatches};
pub use symlink::{Dest, SymlinkHop, SymlinkState};

/// Index of a node in its listing's arena.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Dir,
    Symlink,
    Fifo,
    Socket,
    CharDevice,
    BlockDevice,
    File,
    Unknown,
}

impl NodeType {
    /// Name used for this type under `constants.types`.
    pub fn key(self) -> &'static str {
        match self {
            NodeType::Dir => "dir",
            NodeType::Symlink => "symlink",
            NodeType::Fifo => "fifo",
            NodeType::Socket => "socket",
            NodeType::CharDevice => "char_device",
            NodeType::BlockDevice => "block_device",
            NodeType::File => "file",
            NodeType::Unknown => "unknown",
        }
    }

    pub fn default_char(self) -> char {
        match self {
            NodeType::Dir => 'd',
            NodeType::Symlink => 'l',
            NodeType::Fifo => 'p',
            NodeType::Socket => 's',
            NodeType::CharDevice => 'c',
            NodeType::BlockDevice => 'b',
            NodeType::File => 'f',
            NodeType::Unknown => '?',
        }
    }

    /// Look up one of `char`, `suffix`, `icon`, `color` for this type.
    pub fn constant<'c>(self, constants: &'c Constants, field: &str) -> Option<&'c str> {
        constants.lookup(&["types", self.key(), field])
    }
}

/// Metadata of an existing node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    /// Device the node lives on.
    pub dev: u64,
    pub inode: u64,
    pub links: u64,
    /// Full `st_mode`, type bits included.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub btime: Option<OffsetDateTime>,
    pub ctime: Option<OffsetDateTime>,
    pub mtime: Option<OffsetDateTime>,
    pub atime: Option<OffsetDateTime>,
}

/// Attributes resolved from the spec catalog and the VCS status map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Presentation {
    pub importance: i64,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub collapse: Option<Collapse>,
    pub git: Option<String>,
}

impl Presentation {
    pub fn compute(name: &str, path: &Path, config: &Config) -> Self {
        let matches = config.specs.matches(name, path);
        Self {
            importance: matches.importance_for(name),
            icon: matches.icon().map(str::to_string),
            color: matches.color().map(str::to_string),
            collapse: matches.collapse().cloned(),
            git: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub path: PathBuf,
    pub exists: bool,
    pub node_type: NodeType,
    pub stat: Option<Stat>,
    pub error: Option<String>,
    hop: OnceCell<SymlinkHop>,

    pub presentation: Presentation,
    pub visible: bool,

    /// Node this one is nested under. Never owns it.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Tree glyphs drawn before the name.
    pub prefix: String,
}

impl Node {
    /// Classify `path`, naming the node after its last component.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::named(name, path)
    }

    pub fn named(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let Classification {
            node_type,
            exists,
            stat,
            error,
        } = classify(&path);
        Self {
            name: name.into(),
            path,
            exists,
            node_type,
            stat,
            error,
            hop: OnceCell::new(),
            presentation: Presentation::default(),
            visible: true,
            parent: None,
            children: Vec::new(),
            prefix: String::new(),
        }
    }

    pub fn is_sub(&self) -> bool {
        self.parent.is_some()
    }

    pub fn is_dir(&self) -> bool {
        self.node_type == NodeType::Dir
    }

    /// The next hop, resolved on first access. `None` unless this is a symlink.
    pub fn symlink(&self) -> Option<&SymlinkHop> {
        if self.node_type != NodeType::Symlink {
            return None;
        }
        Some(self.hop.get_or_init(|| symlink::resolve(&self.path)))
    }

    /// Resolve spec attributes and VCS status for this node.
    pub fn present(&mut self, config: &Config, vcs: &VcsStatusMap) {
        self.presentation = Presentation::compute(&self.name, &self.path, config);
        self.presentation.git = vcs.status_for(&self.path).map(str::to_string);
    }

    pub fn importance(&self) -> i64 {
        self.presentation.importance
    }

    /// Style tokens in application order; later tokens override earlier ones.
    pub fn format_rules(&self, constants: &Constants) -> Vec<String> {
        format_rules(self, &self.presentation, constants)
    }

    pub fn display_fields(
        &self,
        config: &Config,
        options: &Options,
        owners: &Owners,
    ) -> DisplayFields {
        let mut fields = fields_for(self, &self.presentation, config, options);
        fields.cells = options
            .details
            .iter()
            .map(|field| field.cell(self, config, options, owners))
            .collect();
        fields
    }
}

/// Everything the renderer needs to draw one node.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFields {
    pub name: String,
    pub suffix: String,
    /// Icon glyph, already looked up in the selected icon set.
    pub icon: Option<String>,
    pub color_tokens: Vec<String>,
    pub type_char: String,
    /// One value per requested detail column.
    pub cells: Vec<Cell>,
    pub link: Option<LinkDisplay>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkDisplay {
    pub state: SymlinkState,
    pub glyph: String,
    pub dest: LinkDest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkDest {
    Node(Box<DisplayFields>),
    Raw(String),
}

fn format_rules(node: &Node, presentation: &Presentation, constants: &Constants) -> Vec<String> {
    let mut rules = Vec::new();
    if let Some(color) = node.node_type.constant(constants, "color") {
        rules.push(color.to_string());
    }
    if presentation.git.as_deref() == Some("!!") {
        let style = constants.lookup(&["git", "ignored_style"]).unwrap_or("dim");
        rules.push(style.to_string());
    }
    match presentation.importance {
        i64::MIN..=-1 => rules.push("dim".to_string()),
        0 => {}
        1 => rules.push("bold".to_string()),
        2 => rules.push("underline".to_string()),
        _ => rules.push("bold underline".to_string()),
    }
    if let Some(color) = &presentation.color {
        rules.push(color.clone());
    }
    rules
}

fn fields_for(
    node: &Node,
    presentation: &Presentation,
    config: &Config,
    options: &Options,
) -> DisplayFields {
    let constants = &config.constants;
    let icon_key = presentation
        .icon
        .as_deref()
        .or_else(|| node.node_type.constant(constants, "icon"));
    let icon = icon_key
        .and_then(|key| config.icon(key, options.icon))
        .map(str::to_string);

    let link = node.symlink().map(|hop| {
        let glyph = constants
            .lookup(&["symlink", hop.state.key()])
            .unwrap_or("->")
            .to_string();
        let dest = match &hop.dest {
            Dest::Node(target) => {
                let presentation = Presentation::compute(&target.name, &target.path, config);
                LinkDest::Node(Box::new(fields_for(target, &presentation, config, options)))
            }
            Dest::Raw(raw) => LinkDest::Raw(raw.clone()),
        };
        LinkDisplay {
            state: hop.state,
            glyph,
            dest,
        }
    });

    DisplayFields {
        name: node.name.clone(),
        suffix: node
            .node_type
            .constant(constants, "suffix")
            .unwrap_or_default()
            .to_string(),
        icon,
        color_tokens: format_rules(node, presentation, constants),
        type_char: node
            .node_type
            .constant(constants, "char")
            .map(str::to_string)
            .unwrap_or_else(|| node.node_type.default_char().to_string()),
        cells: Vec::new(),
        link,
        error: node.error.clone(),
    }
}
