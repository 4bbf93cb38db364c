//! Resolution of command-line paths into input archives and the output path.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{MergerError, MergerResult};

/// Input archives and output path of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Input archives in argument order; the first one is the reference.
    pub inputs: Vec<PathBuf>,
    /// Path of the archive to create.
    pub output: PathBuf,
}

/// Splits `paths` into input patterns and the output path (the last element), then expands the
/// patterns.
pub fn resolve_paths(paths: &[String]) -> MergerResult<ResolvedPaths> {
    let [patterns @ .., output] = paths else {
        return Err(MergerError::MissingArguments);
    };
    if patterns.is_empty() {
        return Err(MergerError::MissingArguments);
    }

    let inputs = expand_input_patterns(patterns)?;

    Ok(ResolvedPaths {
        inputs,
        output: PathBuf::from(output),
    })
}

/// Expands shell-style glob patterns into paths.
///
/// Patterns are expanded in order and the matches of each pattern are sorted. A pattern without
/// glob metacharacters is taken literally, so a missing file surfaces when it is opened. A glob
/// that matches nothing is ignored with a warning.
pub fn expand_input_patterns(patterns: &[String]) -> MergerResult<Vec<PathBuf>> {
    let mut inputs = Vec::new();

    for pattern in patterns {
        if !is_glob(pattern) {
            inputs.push(PathBuf::from(pattern));
            continue;
        }

        let paths = glob::glob(pattern).map_err(|source| MergerError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;

        let mut matches = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) => matches.push(path),
                Err(err) => warn!(%pattern, error = %err, "skipping unreadable path"),
            }
        }
        matches.sort();

        if matches.is_empty() {
            warn!(%pattern, "input pattern matched no archive");
            continue;
        }

        debug!(%pattern, matches = matches.len(), "expanded input pattern");
        inputs.extend(matches);
    }

    if inputs.is_empty() {
        return Err(MergerError::NoInputsMatched {
            patterns: patterns.join(" "),
        });
    }

    Ok(inputs)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}
