use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::process;

use anyhow::{bail, Context, Result};
use bytes::{Buf, BufMut, BytesMut};
use log::{debug, warn};
use regrep::CompiledPattern;

const USAGE: &str = "usage: regrep [-o] [--backtrack-limit N] -E <pattern> [FILE...]\n\
                     Reads stdin when no FILE is given. Lines that are not valid UTF-8 are skipped.";

#[derive(Debug, Default)]
struct Options {
    pattern: String,
    only_matching: bool,
    backtrack_limit: Option<usize>,
    files: Vec<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options> {
    let mut options = Options::default();
    let mut pattern = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-E" => pattern = Some(args.next().context("-E needs a pattern")?),
            "-o" => options.only_matching = true,
            "--backtrack-limit" => {
                let raw = args.next().context("--backtrack-limit needs a value")?;
                let limit = raw
                    .parse()
                    .with_context(|| format!("invalid backtrack limit {raw:?}"))?;
                options.backtrack_limit = Some(limit);
            }
            other if other.starts_with('-') => bail!("unexpected argument {other:?}\n{USAGE}"),
            _ => options.files.push(arg),
        }
    }
    match pattern {
        Some(pattern) => options.pattern = pattern,
        None => bail!("Expected first argument to be '-E'\n{USAGE}"),
    }
    Ok(options)
}

// Splits off the next line, dropping its '\n'.
fn next_line(buf: &mut BytesMut) -> Option<BytesMut> {
    if buf.is_empty() {
        return None;
    }
    match buf.iter().position(|&b| b == b'\n') {
        Some(newline) => {
            let line = buf.split_to(newline);
            buf.advance(1);
            Some(line)
        }
        None => Some(buf.split()),
    }
}

fn read_all(mut input: impl Read) -> io::Result<BytesMut> {
    let mut writer = BytesMut::new().writer();
    io::copy(&mut input, &mut writer)?;
    Ok(writer.into_inner())
}

/// Greps the named files, or `input` when there are none. Returns whether any line matched.
fn run(options: &Options, input: impl Read, mut out: impl Write) -> Result<bool> {
    let pattern = CompiledPattern::builder(&options.pattern)
        .backtrack_limit(options.backtrack_limit)
        .build()
        .with_context(|| format!("invalid pattern {:?}", options.pattern))?;

    if options.files.is_empty() {
        let buf = read_all(input).context("failed to read stdin")?;
        return scan(&pattern, options, buf, None, &mut out);
    }

    let label_lines = options.files.len() > 1;
    let mut matched_any = false;
    for path in &options.files {
        let data = fs::read(path).with_context(|| format!("failed to read {path}"))?;
        let label = label_lines.then_some(path.as_str());
        matched_any |= scan(&pattern, options, BytesMut::from(&data[..]), label, &mut out)?;
    }
    Ok(matched_any)
}

fn scan(
    pattern: &CompiledPattern,
    options: &Options,
    mut input: BytesMut,
    label: Option<&str>,
    out: &mut impl Write,
) -> Result<bool> {
    let source = label.unwrap_or("<input>");
    debug!("scanning {} bytes from {}", input.len(), source);

    let mut matched_any = false;
    let mut line_no = 0;
    while let Some(raw) = next_line(&mut input) {
        line_no += 1;
        let Ok(line) = std::str::from_utf8(&raw) else {
            warn!("{source}: skipping line {line_no}, not valid UTF-8");
            continue;
        };
        if options.only_matching {
            for m in pattern.find_iter(line).filter(|m| !m.is_empty()) {
                matched_any = true;
                write_hit(out, label, m.as_str())?;
            }
        } else if pattern.matches(line) {
            matched_any = true;
            write_hit(out, label, line)?;
        }
    }
    Ok(matched_any)
}

fn write_hit(out: &mut impl Write, label: Option<&str>, text: &str) -> io::Result<()> {
    match label {
        Some(label) => writeln!(out, "{label}:{text}"),
        None => writeln!(out, "{text}"),
    }
}

// Usage: echo <input_text> | your_program.sh -E <pattern>
fn main() {
    env_logger::init();

    let outcome = parse_args(env::args().skip(1))
        .and_then(|options| run(&options, io::stdin().lock(), io::stdout().lock()));
    match outcome {
        Ok(true) => process::exit(0),
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("regrep: {err:#}");
            process::exit(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    fn options(pattern: &str) -> Options {
        Options {
            pattern: pattern.to_string(),
            ..Options::default()
        }
    }

    fn grep(options: &Options, input: &[u8]) -> (Result<bool>, String) {
        let mut out = Vec::new();
        let result = run(options, input, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    fn temp_file(name: &str, contents: &str) -> String {
        let path = env::temp_dir().join(format!("regrep-{}-{name}", process::id()));
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn parses_flags_in_any_order() {
        let options = parse_args(args(&["-o", "-E", "a+", "--backtrack-limit", "10"])).unwrap();
        assert_eq!(options.pattern, "a+");
        assert!(options.only_matching);
        assert_eq!(options.backtrack_limit, Some(10));
        assert!(options.files.is_empty());
    }

    #[test]
    fn operands_after_pattern_are_files() {
        let options = parse_args(args(&["-E", "a", "one.txt", "two.txt"])).unwrap();
        assert_eq!(options.files, vec!["one.txt", "two.txt"]);
    }

    #[test]
    fn pattern_is_required() {
        assert!(parse_args(args(&["-o"])).is_err());
        assert!(parse_args(args(&["-E"])).is_err());
        assert!(parse_args(args(&["-E", "a", "--backtrack-limit", "x"])).is_err());
        assert!(parse_args(args(&["-E", "a", "-x"])).is_err());
    }

    #[test]
    fn splits_lines_without_newlines() {
        let mut buf = BytesMut::from(&b"one\n\nthree"[..]);
        let lines: Vec<Vec<u8>> = std::iter::from_fn(|| next_line(&mut buf))
            .map(|line| line.to_vec())
            .collect();
        assert_eq!(lines, vec![b"one".to_vec(), Vec::new(), b"three".to_vec()]);
    }

    #[test]
    fn prints_only_matching_lines() {
        let (result, printed) = grep(&options(r"\d+"), b"apple\nbanana 42\ncherry\n");
        assert!(result.unwrap());
        assert_eq!(printed, "banana 42\n");
    }

    #[test]
    fn no_matching_line_returns_false() {
        let (result, printed) = grep(&options("^z"), b"apple\nbanana\n");
        assert!(!result.unwrap());
        assert!(printed.is_empty());
    }

    #[test]
    fn only_matching_prints_each_span() {
        let mut opts = options(r"\d+");
        opts.only_matching = true;
        let (result, printed) = grep(&opts, b"a1 b22\nnone\n333");
        assert!(result.unwrap());
        assert_eq!(printed, "1\n22\n333\n");
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let (result, printed) = grep(&options("(unclosed"), b"unclosed\n");
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("unterminated group"));
        assert!(printed.is_empty());
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let (result, printed) = grep(&options("ok"), b"\xff\xfe ok\nstill ok\n");
        assert!(result.unwrap());
        assert_eq!(printed, "still ok\n");
    }

    #[test]
    fn reads_files_instead_of_input() {
        let path = temp_file("single", "red\ngreen\n");
        let mut opts = options("gr");
        opts.files = vec![path.clone()];
        let (result, printed) = grep(&opts, b"gr from stdin\n");
        fs::remove_file(&path).unwrap();
        assert!(result.unwrap());
        assert_eq!(printed, "green\n");
    }

    #[test]
    fn several_files_label_their_lines() {
        let first = temp_file("first", "cat\ndog\n");
        let second = temp_file("second", "bird\ncatfish\n");
        let mut opts = options("^cat");
        opts.files = vec![first.clone(), second.clone()];
        let (result, printed) = grep(&opts, b"");
        fs::remove_file(&first).unwrap();
        fs::remove_file(&second).unwrap();
        assert!(result.unwrap());
        assert_eq!(printed, format!("{first}:cat\n{second}:catfish\n"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut opts = options("a");
        opts.files = vec!["/nonexistent/regrep/input.txt".to_string()];
        let (result, _) = grep(&opts, b"");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to read /nonexistent/regrep/input.txt"));
    }
}
