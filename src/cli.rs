use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::node::DetailField;
use crate::options::{IconStyle, Units};
use crate::tree::sort::SortKey;

/// Flags left unset here fall back to the `prefs` section of the nearest
/// `.pls.yml`, then to built-in defaults.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pls",
    version,
    about = "A directory lister that knows what your files are for"
)]
pub struct Args {
    /// Directory or file to list
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Show less important nodes; repeat to reveal more
    #[arg(short = 'a', long = "all", action = ArgAction::Count)]
    pub all: u8,

    /// Detail columns, comma separated (`std`, `all` and `none` are shorthands)
    #[arg(short = 'd', long = "det", value_enum, value_delimiter = ',')]
    pub details: Vec<DetailField>,

    /// Sort fields, comma separated, first dominant; append `-` for descending
    #[arg(short = 's', long = "sort", value_delimiter = ',')]
    pub sort: Vec<SortKey>,

    /// List directories before other nodes
    #[arg(long = "dirs-first", overrides_with = "no_dirs_first")]
    pub dirs_first: bool,

    /// Sort directories together with other nodes
    #[arg(long = "no-dirs-first")]
    pub no_dirs_first: bool,

    /// Hide directories
    #[arg(long = "no-dirs")]
    pub no_dirs: bool,

    /// Hide everything except directories
    #[arg(long = "no-files")]
    pub no_files: bool,

    /// Icon set
    #[arg(short = 'i', long = "icon", value_enum)]
    pub icon: Option<IconStyle>,

    /// Unit system for sizes
    #[arg(short = 'u', long = "units", value_enum)]
    pub units: Option<Units>,

    /// Timestamp format, in `time` format-description syntax
    #[arg(long = "time-fmt")]
    pub time_fmt: Option<String>,

    /// 0 lists everything flat, 1 nests generated files under their source, 2 hides them
    #[arg(short = 'c', long = "collapse", value_parser = clap::value_parser!(u8).range(0..=2))]
    pub collapse: Option<u8>,

    /// Expand directories recursively
    #[arg(short = 't', long = "tree")]
    pub tree: bool,

    /// Max expansion depth; implies --tree
    #[arg(short = 'L', long = "level")]
    pub depth: Option<usize>,

    /// Hide nodes whose name matches this regex
    #[arg(short = 'e', long = "exclude")]
    pub exclude: Option<String>,

    /// Show only nodes whose name matches this regex
    #[arg(short = 'o', long = "only")]
    pub only: Option<String>,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// More log output on stderr; repeat for more
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Enforce invariants after parsing.
    pub fn validated(mut self) -> Self {
        // Respect NO_COLOR env var
        if std::env::var_os("NO_COLOR").is_some() {
            self.no_color = true;
        }
        if self.no_dirs_first {
            self.dirs_first = false;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::sort::SortField;
    use clap::CommandFactory;

    #[test]
    fn command_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_lists_and_counts() {
        let args = Args::parse_from(["pls", "-aa", "-d", "perms,size", "-s", "size-,name", "src"]);
        assert_eq!(args.all, 2);
        assert_eq!(args.details, vec![DetailField::Perms, DetailField::Size]);
        assert_eq!(args.sort.len(), 2);
        assert_eq!(args.sort[0].field, SortField::Size);
        assert!(args.sort[0].descending);
        assert_eq!(args.path, PathBuf::from("src"));
    }

    #[test]
    fn collapse_is_bounded() {
        assert!(Args::try_parse_from(["pls", "-c", "3"]).is_err());
        assert_eq!(Args::parse_from(["pls", "-c", "0"]).collapse, Some(0));
    }
}
