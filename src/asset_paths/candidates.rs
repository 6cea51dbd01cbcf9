use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Generate the manifest files to probe during autodetection, in probing order.
///
/// The search starts in `start` and climbs one directory at a time. Within each directory
/// every candidate name is tried in the configured order before moving to the parent. The
/// walk stops once a directory is no longer `root` or one of its descendants, so a manifest
/// placed above the assets root is never considered.
pub fn generate_manifest_candidates(root: &Path, start: &Path, names: &[String]) -> Vec<PathBuf> {
    let mut builder = CandidateBuilder::new(names);

    for directory in start.ancestors() {
        if !directory.starts_with(root) {
            break;
        }
        builder.add_directory(directory);
    }

    builder.finish()
}

struct CandidateBuilder<'a> {
    names: Vec<&'a str>,
    seen: BTreeSet<PathBuf>,
    result: Vec<PathBuf>,
}

impl<'a> CandidateBuilder<'a> {
    fn new(names: &'a [String]) -> Self {
        let names = names
            .iter()
            .map(|name| name.trim_matches('/'))
            .filter(|name| !name.is_empty())
            .collect();

        Self {
            names,
            seen: BTreeSet::new(),
            result: Vec::new(),
        }
    }

    fn add_directory(&mut self, directory: &Path) {
        for name in self.names.clone() {
            self.push(directory.join(name));
        }
    }

    fn finish(self) -> Vec<PathBuf> {
        self.result
    }

    fn push(&mut self, candidate: PathBuf) {
        if self.seen.insert(candidate.clone()) {
            self.result.push(candidate);
        }
    }
}
