//! Argument partitioner (§4.D).
//!
//! Splits process `argv` into a launcher slice and a passthrough slice using
//! the `--` sentinel protocol, then merges the launcher slice with the
//! embedded `.args` defaults file.

/// The sentinel token that separates launcher arguments from the
/// passthrough slice on the command line.
const SENTINEL: &str = "--";

/// The `.args` token that marks where the CLI-supplied launcher slice is
/// spliced into the defaults file.
const ARGS_SPLICE_POINT: &str = "...";

/// The result of partitioning CLI `argv` (§4.D, invariants 1–2 of §8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partitioned {
    /// Arguments consumed by the launcher itself.
    pub launcher_args: Vec<String>,
    /// Arguments forwarded verbatim to the entry point.
    pub passthrough: Vec<String>,
}

/// Partitions `argv` (including `argv[0]`, the program name) per the `--`
/// sentinel protocol:
///
/// - If `argv[1] != "--"`, the entire tail is passthrough and the launcher
///   sees no CLI arguments (invariant 1).
/// - If `argv[1] == "--"`, the launcher slice begins at `argv[2]`; the first
///   subsequent `--` terminates it, and everything after that is
///   passthrough (invariant 2: no second `--` means an empty passthrough).
pub fn partition_cli(argv: &[String]) -> Partitioned {
    if argv.len() < 2 || argv[1] != SENTINEL {
        return Partitioned {
            launcher_args: Vec::new(),
            passthrough: argv.get(1..).map(|s| s.to_vec()).unwrap_or_default(),
        };
    }

    let rest = &argv[2..];
    match rest.iter().position(|a| a == SENTINEL) {
        Some(idx) => Partitioned {
            launcher_args: rest[..idx].to_vec(),
            passthrough: rest[idx + 1..].to_vec(),
        },
        None => Partitioned {
            launcher_args: rest.to_vec(),
            passthrough: Vec::new(),
        },
    }
}

/// Parses the `.args` file format: one whitespace-stripped token per line,
/// blank lines ignored.
pub fn parse_args_file(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Merges the CLI-supplied launcher slice with `.args` defaults per §4.D:
///
/// - No `.args` file: the CLI slice is used as-is.
/// - Empty CLI slice: `.args` wholly supplies the launcher arguments (any
///   literal `...` sentinel is replaced by nothing, since there is no CLI
///   slice to splice in).
/// - Non-empty CLI slice: `.args` is consulted only if it contains the `...`
///   sentinel, which is replaced by the CLI slice; otherwise the CLI slice
///   wins outright.
pub fn merge_launcher_args(cli: Vec<String>, args_file: Option<Vec<String>>) -> Vec<String> {
    let Some(defaults) = args_file else {
        return cli;
    };

    if cli.is_empty() {
        splice_sentinel(&defaults, &[])
    } else if defaults.iter().any(|t| t == ARGS_SPLICE_POINT) {
        splice_sentinel(&defaults, &cli)
    } else {
        cli
    }
}

fn splice_sentinel(tokens: &[String], replacement: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(tokens.len() + replacement.len());
    for token in tokens {
        if token == ARGS_SPLICE_POINT {
            out.extend(replacement.iter().cloned());
        } else {
            out.push(token.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_leading_sentinel_is_all_passthrough() {
        let p = partition_cli(&v(&["prog", "a", "b"]));
        assert_eq!(p.launcher_args, Vec::<String>::new());
        assert_eq!(p.passthrough, v(&["a", "b"]));
    }

    #[test]
    fn leading_sentinel_no_second_is_empty_passthrough() {
        let p = partition_cli(&v(&["prog", "--", "-u", "none"]));
        assert_eq!(p.launcher_args, v(&["-u", "none"]));
        assert_eq!(p.passthrough, Vec::<String>::new());
    }

    #[test]
    fn leading_sentinel_with_second_splits_passthrough() {
        let p = partition_cli(&v(&["prog", "--", "-u", "none", "--", "x"]));
        assert_eq!(p.launcher_args, v(&["-u", "none"]));
        assert_eq!(p.passthrough, v(&["x"]));
    }

    #[test]
    fn single_token_argv_is_all_passthrough() {
        let p = partition_cli(&v(&["prog"]));
        assert_eq!(p.launcher_args, Vec::<String>::new());
        assert_eq!(p.passthrough, Vec::<String>::new());
    }

    #[test]
    fn parses_args_file_ignoring_blank_lines() {
        let parsed = parse_args_file("-u\n\n  new  \n...\n\n");
        assert_eq!(parsed, v(&["-u", "new", "..."]));
    }

    #[test]
    fn empty_cli_uses_args_file_wholly() {
        let merged = merge_launcher_args(vec![], Some(v(&["-u", "new"])));
        assert_eq!(merged, v(&["-u", "new"]));
    }

    #[test]
    fn sentinel_spliced_with_cli_slice() {
        // S5: .args = "-u\nnew\n...\n", CLI launcher slice = "-u all"
        let merged = merge_launcher_args(v(&["-u", "all"]), Some(v(&["-u", "new", "..."])));
        assert_eq!(merged, v(&["-u", "new", "-u", "all"]));
    }

    #[test]
    fn non_empty_cli_without_sentinel_wins_outright() {
        let merged = merge_launcher_args(v(&["-u", "all"]), Some(v(&["-u", "new"])));
        assert_eq!(merged, v(&["-u", "all"]));
    }

    #[test]
    fn no_args_file_uses_cli_as_is() {
        let merged = merge_launcher_args(v(&["-u", "all"]), None);
        assert_eq!(merged, v(&["-u", "all"]));
    }
}
