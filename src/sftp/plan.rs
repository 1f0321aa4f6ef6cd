//! Pull and removal planning
//!
//! Walking the remote tree, filtering it through the mask and resolving local
//! targets does not need a live connection. Only [`RemoteListing`] touches the
//! server, so the rest runs the same against an in-memory tree.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use super::client::PullRequest;
use super::error::SftpError;
use super::mask::FileMask;
use super::path_utils::{join_remote_path, local_target, split_remote_mask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks, devices and anything else the pull skips
    Other,
}

/// One directory entry as the server reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    pub modified: Option<NaiveDateTime>,
}

/// Directory listing on the remote side
#[async_trait]
pub trait RemoteListing: Send {
    async fn list(&mut self, dir: &str) -> Result<Vec<RemoteEntry>, SftpError>;
}

/// A regular file found under the pulled directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub full_path: String,
    /// `/`-separated, relative to the pulled directory
    pub relative: String,
    pub modified: Option<NaiveDateTime>,
}

/// One file the pull will copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    pub remote: String,
    pub local: PathBuf,
    pub remove_original: bool,
}

/// Every regular file under `root`, depth first.
///
/// Within a directory, files come in name order before its subdirectories,
/// which are also visited in name order.
pub async fn walk_tree(
    listing: &mut dyn RemoteListing,
    root: &str,
) -> Result<Vec<RemoteFile>, SftpError> {
    let mut files = Vec::new();
    let mut pending = vec![(root.to_string(), String::new())];

    while let Some((dir, relative_dir)) = pending.pop() {
        let mut entries = listing.list(&dir).await?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut subdirs = Vec::new();
        for entry in entries {
            if entry.name == "." || entry.name == ".." {
                continue;
            }
            let full_path = join_remote_path(&dir, &entry.name);
            let relative = join_remote_path(&relative_dir, &entry.name);
            match entry.kind {
                EntryKind::File => files.push(RemoteFile {
                    full_path,
                    relative,
                    modified: entry.modified,
                }),
                EntryKind::Directory => subdirs.push((full_path, relative)),
                EntryKind::Other => {}
            }
        }
        pending.extend(subdirs.into_iter().rev());
    }

    Ok(files)
}

/// Files of `listing` that pass the request's mask, with their local targets
pub fn plan_pull(
    listing: &[RemoteFile],
    request: &PullRequest,
    today: NaiveDate,
) -> Result<Vec<PlannedCopy>, SftpError> {
    listing
        .iter()
        .filter(|f| request.file_mask.matches(&f.relative, f.modified, today))
        .map(|f| {
            let local = local_target(&request.local_directory, &f.relative)
                .ok_or_else(|| SftpError::InvalidPath(f.relative.clone()))?;
            Ok(PlannedCopy {
                remote: f.full_path.clone(),
                local,
                remove_original: request.remove_originals,
            })
        })
        .collect()
}

/// Split `dir/mask` and parse the mask part
pub fn parse_removal(path_and_mask: &str) -> Result<(String, FileMask), SftpError> {
    let (dir, mask) = split_remote_mask(path_and_mask);
    let mask = FileMask::parse(&mask).map_err(|e| SftpError::InvalidPath(e.to_string()))?;
    Ok((dir, mask))
}

/// Full paths of the regular files in `dir` matched by `mask`
pub fn select_removals(
    dir: &str,
    mask: &FileMask,
    entries: &[RemoteEntry],
    today: NaiveDate,
) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.kind == EntryKind::File && mask.matches(&e.name, e.modified, today))
        .map(|e| join_remote_path(dir, &e.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    /// In-memory remote tree keyed by directory path
    #[derive(Default)]
    struct FakeTree {
        dirs: HashMap<String, Vec<RemoteEntry>>,
        listed: Vec<String>,
    }

    impl FakeTree {
        fn dir(mut self, path: &str, entries: Vec<RemoteEntry>) -> Self {
            self.dirs.insert(path.to_string(), entries);
            self
        }
    }

    #[async_trait]
    impl RemoteListing for FakeTree {
        async fn list(&mut self, dir: &str) -> Result<Vec<RemoteEntry>, SftpError> {
            self.listed.push(dir.to_string());
            self.dirs
                .get(dir)
                .cloned()
                .ok_or_else(|| SftpError::FileNotFound(dir.to_string()))
        }
    }

    fn file(name: &str, modified: Option<NaiveDateTime>) -> RemoteEntry {
        RemoteEntry {
            name: name.to_string(),
            kind: EntryKind::File,
            modified,
        }
    }

    fn dir(name: &str) -> RemoteEntry {
        RemoteEntry {
            name: name.to_string(),
            kind: EntryKind::Directory,
            modified: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn this_morning() -> Option<NaiveDateTime> {
        today().and_hms_opt(8, 0, 0)
    }

    fn yesterday() -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 4, 30).unwrap().and_hms_opt(23, 0, 0)
    }

    fn request(mask: &str, remove_originals: bool) -> PullRequest {
        PullRequest {
            remote_directory: "delivery_files".to_string(),
            local_directory: PathBuf::from("/data/in"),
            file_mask: FileMask::parse(mask).unwrap(),
            remove_originals,
        }
    }

    fn delivery_tree() -> FakeTree {
        FakeTree::default()
            .dir(
                "/home/svc/delivery_files",
                vec![
                    dir("."),
                    dir(".."),
                    file("LifeFile.txt", this_morning()),
                    dir("Reports"),
                    file("a.csv", this_morning()),
                    dir("2024"),
                    RemoteEntry {
                        name: "latest".to_string(),
                        kind: EntryKind::Other,
                        modified: None,
                    },
                ],
            )
            .dir(
                "/home/svc/delivery_files/Reports",
                vec![file("summary.csv", this_morning())],
            )
            .dir(
                "/home/svc/delivery_files/2024",
                vec![
                    file("old.csv", yesterday()),
                    dir("Events"),
                    file("data.csv", this_morning()),
                ],
            )
            .dir(
                "/home/svc/delivery_files/2024/Events",
                vec![file("e1.json", this_morning())],
            )
    }

    #[tokio::test]
    async fn test_walk_order_and_skips() {
        let mut tree = delivery_tree();
        let files = walk_tree(&mut tree, "/home/svc/delivery_files").await.unwrap();

        let relative: Vec<&str> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(
            relative,
            vec![
                "LifeFile.txt",
                "a.csv",
                "2024/data.csv",
                "2024/old.csv",
                "2024/Events/e1.json",
                "Reports/summary.csv",
            ]
        );
        assert_eq!(files[2].full_path, "/home/svc/delivery_files/2024/data.csv");
        assert_eq!(tree.listed.len(), 4);
    }

    #[tokio::test]
    async fn test_walk_propagates_listing_errors() {
        let mut tree = FakeTree::default().dir("/out", vec![dir("gone")]);
        assert!(matches!(
            walk_tree(&mut tree, "/out").await,
            Err(SftpError::FileNotFound(p)) if p == "/out/gone"
        ));
    }

    #[tokio::test]
    async fn test_personal_mask_selects_todays_files_outside_excluded_dirs() {
        let mut tree = delivery_tree();
        let files = walk_tree(&mut tree, "/home/svc/delivery_files").await.unwrap();

        let plan = plan_pull(&files, &request(">today|*/Reports/*; */Events/*", false), today())
            .unwrap();

        let remote: Vec<&str> = plan.iter().map(|p| p.remote.as_str()).collect();
        assert_eq!(
            remote,
            vec![
                "/home/svc/delivery_files/LifeFile.txt",
                "/home/svc/delivery_files/a.csv",
                "/home/svc/delivery_files/2024/data.csv",
            ]
        );
        assert_eq!(plan[2].local, Path::new("/data/in").join("2024").join("data.csv"));
        assert!(plan.iter().all(|p| !p.remove_original));
    }

    #[test]
    fn test_remove_originals_flag_is_carried() {
        let files = vec![RemoteFile {
            full_path: "/out/a.csv".to_string(),
            relative: "a.csv".to_string(),
            modified: None,
        }];
        let plan = plan_pull(&files, &request("", true), today()).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan[0].remove_original);
    }

    #[test]
    fn test_escaping_target_is_rejected() {
        let files = vec![RemoteFile {
            full_path: "/out/x".to_string(),
            relative: "../etc/passwd".to_string(),
            modified: None,
        }];
        assert!(matches!(
            plan_pull(&files, &request("", false), today()),
            Err(SftpError::InvalidPath(p)) if p == "../etc/passwd"
        ));
    }

    #[test]
    fn test_removal_selection() {
        let (dir_path, mask) = parse_removal("/outgoing/*.csv").unwrap();
        assert_eq!(dir_path, "/outgoing");

        let entries = vec![
            file("a.csv", None),
            file("B.CSV", None),
            file("notes.txt", None),
            dir("archive.csv"),
        ];
        assert_eq!(
            select_removals(&dir_path, &mask, &entries, today()),
            vec!["/outgoing/a.csv", "/outgoing/B.CSV"]
        );
    }

    #[test]
    fn test_removal_without_directory_uses_login_dir() {
        let (dir_path, mask) = parse_removal("*.tmp").unwrap();
        assert_eq!(dir_path, ".");
        assert_eq!(
            select_removals(&dir_path, &mask, &[file("x.tmp", None)], today()),
            vec!["./x.tmp"]
        );
        assert!(matches!(
            parse_removal("/out/[bad"),
            Err(SftpError::InvalidPath(_))
        ));
    }
}
