#![forbid(unsafe_code)]

//! Write shell completions and the `pls(1)` man page. The output directory
//! defaults to `dist` and may be given as the only argument.

use clap::{Command, CommandFactory, ValueEnum};
use clap_complete::{generate_to, Shell};
use clap_mangen::Man;
use pls::cli::Args;
use pls::config::cascade::MAX_HEIGHT_ENV;
use pls::config::{CascadePolicy, CONFIG_FILE_NAME};
use pls::node::DetailField;
use pls::tree::sort::SortField;
use std::fs;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let out_dir = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from("dist"), PathBuf::from);
    let completions_dir = out_dir.join("completions");
    let man_dir = out_dir.join("man");

    fs::create_dir_all(&completions_dir)?;
    fs::create_dir_all(&man_dir)?;

    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell] {
        let mut cmd = Args::command();
        generate_to(shell, &mut cmd, "pls", &completions_dir)?;
    }

    let man = Man::new(man_command());
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    fs::write(man_dir.join("pls.1"), buffer)?;

    eprintln!(
        "generated shell completions and man page under {}",
        out_dir.display()
    );
    Ok(())
}

/// The CLI with the accepted `-d` and `-s` values, configuration lookup and
/// environment appended after the options.
fn man_command() -> Command {
    let extra = format!(
        "DETAIL COLUMNS (-d)\n{details}\n\n\
         SORT FIELDS (-s, append - to reverse)\n{sorts}\n\n\
         FILES\n\
         {CONFIG_FILE_NAME} in the listed directory and its ancestors, up to the \
         repository root or {height} levels, then ~/.config/pls/{CONFIG_FILE_NAME} \
         and ~/{CONFIG_FILE_NAME}.\n\n\
         ENVIRONMENT\n\
         PLS_LOG  tracing filter for diagnostics on stderr\n\
         {MAX_HEIGHT_ENV}  levels searched for {CONFIG_FILE_NAME} outside a repository",
        details = value_list::<DetailField>(),
        sorts = value_list::<SortField>(),
        height = CascadePolicy::DEFAULT_MAX_HEIGHT,
    );
    Args::command().after_help(extra)
}

/// One line per accepted value, with its aliases.
fn value_list<T: ValueEnum>() -> String {
    T::value_variants()
        .iter()
        .filter_map(ValueEnum::to_possible_value)
        .map(|value| {
            let names: Vec<&str> = value.get_name_and_aliases().collect();
            format!("  {}", names.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
