//! Package tree traversal.
//!
//! A package is a directory. Its units are the `.py` files directly inside
//! it, with `__init__.py` handled first, and its sub-packages are the
//! directories inside it other than hidden ones and `__pycache__`.
//!
//! Only paths that resolve inside the root are owned by the walk. Anything
//! reached through a symlink pointing elsewhere is neither processed nor
//! copied.

use crate::error::DocError;
use crate::processor::{UnitProcessor, UnitReport};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

const PACKAGE_INIT: &str = "__init__.py";
const UNIT_EXTENSION: &str = "py";
const BYTECODE_CACHE: &str = "__pycache__";

/// A unit that could not be read, scanned or written.
#[derive(Debug)]
pub struct UnitFailure {
    pub unit: PathBuf,
    pub error: DocError,
}

/// Everything a walk did, in processing order.
#[derive(Debug, Default)]
pub struct WalkReport {
    pub units: Vec<UnitReport>,
    pub failures: Vec<UnitFailure>,
    /// Children resolving outside the root.
    pub foreign: Vec<PathBuf>,
    /// Sub-packages left alone because recursion was off.
    pub untouched_packages: Vec<PathBuf>,
}

impl WalkReport {
    pub fn documented(&self) -> usize {
        self.units.iter().map(|u| u.documented.len()).sum()
    }

    pub fn entry_failures(&self) -> usize {
        self.units.iter().map(|u| u.failures.len()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.units.iter().all(UnitReport::is_success)
    }
}

/// Pre-flight checks for a tree walk: the root must be an existing
/// directory and the destination root, if any, must not be a file.
pub fn check_tree_paths(root: &Path, destination_root: Option<&Path>) -> Result<(), DocError> {
    if !root.exists() {
        return Err(DocError::NotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(DocError::NotAPackage {
            path: root.to_path_buf(),
        });
    }
    match destination_root {
        Some(dest) if dest.is_file() => Err(DocError::OutputConflict {
            path: dest.to_path_buf(),
            expected_not: "a file",
        }),
        _ => Ok(()),
    }
}

/// Paths fixed for the duration of one walk.
struct Tree<'p> {
    root: &'p Path,
    owner: PathBuf,
    destination: Option<&'p Path>,
    /// Canonical destination root, never treated as part of the source.
    excluded: Option<PathBuf>,
}

impl Tree<'_> {
    /// True when `path` resolves inside the root and outside the destination.
    fn owns(&self, path: &Path) -> bool {
        match fs::canonicalize(path) {
            Ok(real) => {
                real.starts_with(&self.owner)
                    && self.excluded.as_ref().map_or(true, |ex| !real.starts_with(ex))
            }
            Err(_) => false,
        }
    }

    fn destination_of(&self, unit: &Path) -> Option<PathBuf> {
        let dest = self.destination?;
        let relative = unit.strip_prefix(self.root).unwrap_or(unit);
        Some(dest.join(relative))
    }
}

/// Walks a package tree and documents every owned unit.
pub struct TreeWalker<'a> {
    processor: &'a UnitProcessor,
    recurse: bool,
}

impl<'a> TreeWalker<'a> {
    pub fn new(processor: &'a UnitProcessor, recurse: bool) -> Self {
        TreeWalker { processor, recurse }
    }

    /// Document the package at `root`, in place or mirrored under
    /// `destination_root`.
    ///
    /// A missing destination root receives a copy of the whole owned tree
    /// before any unit is written, so untouched files are carried over.
    pub fn walk(&self, root: &Path, destination_root: Option<&Path>) -> Result<WalkReport, DocError> {
        check_tree_paths(root, destination_root)?;
        let owner = fs::canonicalize(root).map_err(|e| DocError::load(root, e))?;

        let mut copy = false;
        if let Some(dest) = destination_root {
            if !dest.exists() {
                fs::create_dir_all(dest).map_err(|source| DocError::Write {
                    path: dest.to_path_buf(),
                    source,
                })?;
                copy = true;
            }
        }
        let excluded = destination_root
            .and_then(|d| fs::canonicalize(d).ok())
            .filter(|d| *d != owner);
        let tree = Tree {
            root,
            owner,
            destination: destination_root,
            excluded,
        };
        if let (true, Some(dest)) = (copy, destination_root) {
            info!("copying {} to {}", root.display(), dest.display());
            copy_tree(&tree, root, dest)?;
        }

        let mut report = WalkReport::default();
        self.walk_package(&tree, root, &mut report);
        Ok(report)
    }

    fn walk_package(&self, tree: &Tree<'_>, dir: &Path, report: &mut WalkReport) {
        let (units, packages) = match children(tree, dir, report) {
            Ok(found) => found,
            Err(error) => {
                warn!("{error}");
                report.failures.push(UnitFailure {
                    unit: dir.to_path_buf(),
                    error,
                });
                return;
            }
        };

        for unit in units {
            let destination = tree.destination_of(&unit);
            match self.processor.process(&unit, destination.as_deref()) {
                Ok(unit_report) => report.units.push(unit_report),
                Err(error) => {
                    warn!("{error}");
                    report.failures.push(UnitFailure { unit, error });
                }
            }
        }

        for package in packages {
            if self.recurse {
                self.walk_package(tree, &package, report);
            } else {
                debug!("not descending into {}", package.display());
                report.untouched_packages.push(package);
            }
        }
    }
}

fn is_listed(name: &str) -> bool {
    !name.starts_with('.') && name != BYTECODE_CACHE
}

/// Owned units (`__init__.py` first, then by name) and sub-packages of `dir`.
fn children(
    tree: &Tree<'_>,
    dir: &Path,
    report: &mut WalkReport,
) -> Result<(Vec<PathBuf>, Vec<PathBuf>), DocError> {
    let mut units = Vec::new();
    let mut packages = Vec::new();

    for entry in fs::read_dir(dir).map_err(|e| DocError::load(dir, e))? {
        let entry = entry.map_err(|e| DocError::load(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str().filter(|n| is_listed(n)) else {
            continue;
        };
        let path = dir.join(name);
        let is_unit = path.extension().is_some_and(|e| e == UNIT_EXTENSION) && path.is_file();
        if !path.is_dir() && !is_unit {
            continue;
        }
        if !tree.owns(&path) {
            debug!("{} is outside the package, skipping", path.display());
            report.foreign.push(path);
            continue;
        }
        if path.is_dir() {
            packages.push(path);
        } else {
            units.push(path);
        }
    }

    units.sort_by(|a, b| {
        let a_init = a.file_name().is_some_and(|n| n == PACKAGE_INIT);
        let b_init = b.file_name().is_some_and(|n| n == PACKAGE_INIT);
        b_init.cmp(&a_init).then_with(|| a.cmp(b))
    });
    packages.sort();
    Ok((units, packages))
}

/// Copy every owned entry under `src` to `dst`.
fn copy_tree(tree: &Tree<'_>, src: &Path, dst: &Path) -> Result<(), DocError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| DocError::Write { path, source }
    };
    fs::create_dir_all(dst).map_err(write_err(dst))?;

    for entry in fs::read_dir(src).map_err(|e| DocError::load(src, e))? {
        let entry = entry.map_err(|e| DocError::load(src, e))?;
        let path = entry.path();
        if !tree.owns(&path) {
            debug!("not copying {}", path.display());
            continue;
        }
        let target = dst.join(entry.file_name());
        if path.is_dir() {
            copy_tree(tree, &path, &target)?;
        } else {
            fs::copy(&path, &target).map_err(write_err(&target))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ProcessOptions;
    use tempfile::TempDir;

    const MARKED: &str = "@to_document()\ndef f(a: int):\n    pass\n";

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn package() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("pkg");
        write(&root.join("__init__.py"), MARKED);
        write(&root.join("b.py"), MARKED);
        write(&root.join("a.py"), "x = 1\n");
        write(&root.join("notes.txt"), "@to_document()\n");
        write(&root.join("sub/__init__.py"), "");
        write(&root.join("sub/inner.py"), MARKED);
        write(&root.join("__pycache__/b.cpython-312.pyc"), "");
        dir
    }

    fn documented(path: &Path) -> bool {
        fs::read_to_string(path).unwrap().contains("\"\"\"{DESCRIPTION}")
    }

    #[test]
    fn init_first_then_sorted_units() {
        let dir = package();
        let processor = UnitProcessor::new(ProcessOptions::default());
        let report = TreeWalker::new(&processor, false)
            .walk(&dir.path().join("pkg"), None)
            .unwrap();
        let names: Vec<_> = report
            .units
            .iter()
            .map(|u| u.unit.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["__init__.py", "a.py", "b.py"]);
        assert_eq!(report.untouched_packages.len(), 1);
        assert!(!documented(&dir.path().join("pkg/sub/inner.py")));
        assert!(report.is_success());
        assert_eq!(report.documented(), 2);
    }

    #[test]
    fn recursion_reaches_sub_packages() {
        let dir = package();
        let processor = UnitProcessor::new(ProcessOptions::default());
        let report = TreeWalker::new(&processor, true)
            .walk(&dir.path().join("pkg"), None)
            .unwrap();
        assert_eq!(report.units.len(), 5);
        assert!(documented(&dir.path().join("pkg/sub/inner.py")));
    }

    #[test]
    fn mirrors_into_missing_destination() {
        let dir = package();
        let root = dir.path().join("pkg");
        let out = dir.path().join("out");
        let processor = UnitProcessor::new(ProcessOptions::default());
        TreeWalker::new(&processor, false)
            .walk(&root, Some(&out))
            .unwrap();

        assert!(documented(&out.join("b.py")));
        assert_eq!(fs::read_to_string(out.join("notes.txt")).unwrap(), "@to_document()\n");
        assert_eq!(fs::read_to_string(out.join("sub/inner.py")).unwrap(), MARKED);
        assert_eq!(fs::read_to_string(root.join("b.py")).unwrap(), MARKED);
    }

    #[test]
    fn destination_inside_root_is_not_walked() {
        let dir = package();
        let root = dir.path().join("pkg");
        let out = root.join("documented");
        let processor = UnitProcessor::new(ProcessOptions::default());
        let report = TreeWalker::new(&processor, true)
            .walk(&root, Some(&out))
            .unwrap();
        assert!(documented(&out.join("sub/inner.py")));
        assert!(!out.join("documented").exists());
        assert!(report.units.iter().all(|u| !u.unit.starts_with(&out)));
    }

    #[test]
    fn unit_failure_does_not_stop_siblings() {
        let dir = package();
        let root = dir.path().join("pkg");
        write(&root.join("a.py"), "@to_document(\ndef broken(\n");
        let processor = UnitProcessor::new(ProcessOptions::default());
        let report = TreeWalker::new(&processor, false).walk(&root, None).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, DocError::Load { .. }));
        assert!(documented(&root.join("b.py")));
        assert!(!report.is_success());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_leaving_the_root_are_foreign() {
        let dir = package();
        let root = dir.path().join("pkg");
        let outside = dir.path().join("vendor.py");
        write(&outside, MARKED);
        std::os::unix::fs::symlink(&outside, root.join("vendor.py")).unwrap();

        let out = dir.path().join("out");
        let processor = UnitProcessor::new(ProcessOptions::default());
        let report = TreeWalker::new(&processor, true)
            .walk(&root, Some(&out))
            .unwrap();
        assert_eq!(report.foreign, vec![root.join("vendor.py")]);
        assert!(!out.join("vendor.py").exists());
        assert_eq!(fs::read_to_string(&outside).unwrap(), MARKED);
    }

    #[test]
    fn pre_flight_errors() {
        let dir = package();
        let root = dir.path().join("pkg");
        assert!(matches!(
            check_tree_paths(&dir.path().join("missing"), None),
            Err(DocError::NotFound { .. })
        ));
        assert!(matches!(
            check_tree_paths(&root.join("a.py"), None),
            Err(DocError::NotAPackage { .. })
        ));
        assert!(matches!(
            check_tree_paths(&root, Some(&root.join("a.py"))),
            Err(DocError::OutputConflict { .. })
        ));
        assert!(check_tree_paths(&root, Some(&dir.path().join("new"))).is_ok());
    }
}
