//! Command-line argument normalization shared by the binaries
//!
//! Both tools accept their long options with a single dash as well, in
//! either `-password secret` or `-password=secret` form. Clap would read
//! `-password` as `-p assword`, so such tokens are rewritten to the double
//! dash form before parsing.

use std::ffi::OsString;

/// Rewrite single-dash spellings of `long_flags` into `--flag` form.
///
/// Short flags, positionals and anything after a bare `--` pass through
/// untouched, as do arguments that are not valid UTF-8.
pub fn normalize_args<I, T>(args: I, long_flags: &[&str]) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut past_separator = false;
    args.into_iter()
        .map(|arg| {
            let arg = arg.into();
            if past_separator {
                return arg;
            }
            match arg.to_str() {
                Some("--") => {
                    past_separator = true;
                    arg
                }
                Some(s) if is_single_dash_long(s, long_flags) => OsString::from(format!("-{}", s)),
                _ => arg,
            }
        })
        .collect()
}

fn is_single_dash_long(arg: &str, long_flags: &[&str]) -> bool {
    match arg.strip_prefix('-') {
        Some(body) if !body.starts_with('-') => {
            let name = body.split_once('=').map_or(body, |(name, _)| name);
            long_flags.contains(&name)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAGS: &[&str] = &["password", "password-stdin", "salt"];

    fn normalize(args: &[&str]) -> Vec<String> {
        normalize_args(args.iter().copied(), FLAGS)
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect()
    }

    #[test]
    fn test_single_dash_long_flags() {
        assert_eq!(
            normalize(&["fencrypt", "-password", "hello", "-salt=NaClNaCl", "in", "out"]),
            vec!["fencrypt", "--password", "hello", "--salt=NaClNaCl", "in", "out"]
        );
        assert_eq!(
            normalize(&["fdecrypt", "-password=hello", "-password-stdin"]),
            vec!["fdecrypt", "--password=hello", "--password-stdin"]
        );
    }

    #[test]
    fn test_short_and_double_dash_untouched() {
        assert_eq!(
            normalize(&["fencrypt", "-c", "-p", "pw", "--salt", "12345678", "-v", "in", "out"]),
            vec!["fencrypt", "-c", "-p", "pw", "--salt", "12345678", "-v", "in", "out"]
        );
        // Attached short values stay short.
        assert_eq!(normalize(&["fencrypt", "-ppassword"]), vec!["fencrypt", "-ppassword"]);
    }

    #[test]
    fn test_unknown_flags_untouched() {
        assert_eq!(normalize(&["fencrypt", "-verbose"]), vec!["fencrypt", "-verbose"]);
    }

    #[test]
    fn test_stops_at_separator() {
        assert_eq!(
            normalize(&["fencrypt", "-password", "x", "--", "-salt", "out"]),
            vec!["fencrypt", "--password", "x", "--", "-salt", "out"]
        );
    }
}
