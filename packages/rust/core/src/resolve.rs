//! Link resolution: map every extracted link to its place in the output tree.
//!
//! Targets inside the manifest get an absolute destination and a plain path
//! relative to the linking file's new directory. Escaping that path for the
//! output text is left to [`LinkRecord::replacement`]. Targets outside the manifest, but
//! inside the working folder, become `external_file_prefix` URLs. Anything
//! else is reported as unresolved; all of them are collected in one pass.

use std::collections::HashMap;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Serialize;
use tracing::{error, info, instrument};

use docassembler_shared::{AssembleConfig, FileRecord, LinkRecord, ReturnCode, paths};

/// Characters escaped in external file URLs, on top of every non-ASCII byte.
const LINK_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'(')
    .add(b')');

/// Why a link could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnresolvedReason {
    /// Target not in the manifest and no external file prefix configured.
    NoExternalPrefix,
    /// Target not in the manifest and outside the working folder.
    OutsideWorkingFolder,
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedReason::NoExternalPrefix => {
                f.write_str("target is not assembled and no external file prefix is set")
            }
            UnresolvedReason::OutsideWorkingFolder => {
                f.write_str("target is not assembled and lies outside the working folder")
            }
        }
    }
}

/// A link that points nowhere usable, with its position in the source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedLink {
    pub source_path: String,
    pub line: usize,
    pub column: usize,
    pub url: String,
    pub target: String,
    pub reason: UnresolvedReason,
}

/// Result of the resolution stage.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub code: ReturnCode,
    /// Links pointing at other manifest files.
    pub internal: usize,
    /// Links turned into external-prefix URLs.
    pub external: usize,
    pub unresolved: Vec<UnresolvedLink>,
}

/// Resolve every link of every file in place.
#[instrument(skip_all, fields(files = files.len()))]
pub fn resolve_links(
    files: &mut [FileRecord],
    config: &AssembleConfig,
    working_folder: &str,
) -> Resolution {
    // source path -> destination path; first entry wins on (already reported) duplicates.
    let mut index: HashMap<String, String> = HashMap::with_capacity(files.len());
    for file in files.iter() {
        index
            .entry(file.source_path.clone())
            .or_insert_with(|| file.destination_path.clone());
    }

    let mut resolution = Resolution::default();

    for file in files.iter_mut() {
        let prefix = config
            .content
            .get(file.group)
            .map_or(config.external_file_prefix.as_deref(), |group| {
                config.external_prefix_for(group)
            });
        let owner_dir = paths::parent(&file.destination_path).to_string();

        for link in &mut file.links {
            if link.is_same_file_reference() {
                link.resolved_full_url = Some(link.original_url.clone());
                link.resolved_relative_url = Some(link.original_url.clone());
                continue;
            }

            if let Some(destination) = index.get(&link.url_full_path) {
                resolve_internal(link, destination, &owner_dir);
                resolution.internal += 1;
                continue;
            }

            match resolve_external(link, prefix, working_folder) {
                Ok(()) => resolution.external += 1,
                Err(reason) => {
                    error!(
                        file = %file.source_path,
                        line = link.line,
                        column = link.column,
                        url = %link.original_url,
                        target = %link.url_full_path,
                        %reason,
                        "unresolved link"
                    );
                    resolution.unresolved.push(UnresolvedLink {
                        source_path: file.source_path.clone(),
                        line: link.line,
                        column: link.column,
                        url: link.original_url.clone(),
                        target: link.url_full_path.clone(),
                        reason,
                    });
                }
            }
        }
    }

    if !resolution.unresolved.is_empty() {
        resolution.code = ReturnCode::Error;
    }

    info!(
        internal = resolution.internal,
        external = resolution.external,
        unresolved = resolution.unresolved.len(),
        "resolution complete"
    );

    resolution
}

fn resolve_internal(link: &mut LinkRecord, destination: &str, owner_dir: &str) {
    let relative = paths::relative(owner_dir, destination);

    link.resolved_full_url = Some(format!("{destination}{}", link.url_topic));
    link.resolved_relative_url = Some(format!("{relative}{}", link.url_topic));
}

fn resolve_external(
    link: &mut LinkRecord,
    prefix: Option<&str>,
    working_folder: &str,
) -> Result<(), UnresolvedReason> {
    let prefix = prefix.ok_or(UnresolvedReason::NoExternalPrefix)?;
    let relative = paths::strip_dir_ignore_case(&link.url_full_path, working_folder)
        .ok_or(UnresolvedReason::OutsideWorkingFolder)?;

    let encoded = utf8_percent_encode(relative, LINK_PATH);
    link.resolved_full_url = Some(format!(
        "{}/{encoded}{}",
        prefix.trim_end_matches('/'),
        link.url_topic
    ));
    link.resolved_relative_url = None;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::build_inventory;
    use docassembler_catalog::MemoryCatalog;
    use docassembler_shared::{ContentGroup, LinkType, ReplacementRule};

    fn link(url: &str, full_path: &str, topic: &str) -> LinkRecord {
        LinkRecord {
            original_url: url.into(),
            url: url.into(),
            link_type: LinkType::Local,
            span_start: 0,
            span_end: url.len() - 1,
            line: 4,
            column: 7,
            url_topic: topic.into(),
            url_full_path: full_path.into(),
            resolved_full_url: None,
            resolved_relative_url: None,
        }
    }

    fn config(prefix: Option<&str>) -> AssembleConfig {
        AssembleConfig {
            external_file_prefix: prefix.map(String::from),
            content: vec![ContentGroup {
                source_folder: "docs".into(),
                include_globs: vec!["**".into()],
                ..ContentGroup::default()
            }],
            ..AssembleConfig::default()
        }
    }

    fn manifest(links: Vec<LinkRecord>) -> Vec<FileRecord> {
        let mut owner = FileRecord::new(
            "/repo/docs/getting-started/README.md",
            "/out/general/getting-started/README.md",
            0,
        );
        owner.links = links;
        vec![
            owner,
            FileRecord::new(
                "/repo/tools/system-copilot/docs/README.md",
                "/out/general/tools/system-copilot/README.md",
                0,
            ),
        ]
    }

    #[test]
    fn internal_link_gets_relative_and_full_forms() {
        let mut files = manifest(vec![link(
            "../../tools/system-copilot/docs/README.md#usage",
            "/repo/tools/system-copilot/docs/README.md",
            "#usage",
        )]);
        let res = resolve_links(&mut files, &config(None), "/repo");

        assert_eq!(res.code, ReturnCode::Normal);
        assert_eq!(res.internal, 1);
        let l = &files[0].links[0];
        assert_eq!(
            l.resolved_relative_url.as_deref(),
            Some("../tools/system-copilot/README.md#usage")
        );
        assert_eq!(
            l.resolved_full_url.as_deref(),
            Some("/out/general/tools/system-copilot/README.md#usage")
        );
    }

    #[test]
    fn relative_form_joins_back_to_target_destination() {
        let mut files = manifest(vec![link(
            "../../tools/system-copilot/docs/README.md",
            "/repo/tools/system-copilot/docs/README.md",
            "",
        )]);
        resolve_links(&mut files, &config(None), "/repo");

        let owner_dir = paths::parent(&files[0].destination_path);
        let relative = files[0].links[0].resolved_relative_url.as_deref().unwrap();
        assert_eq!(paths::join(owner_dir, relative), files[1].destination_path);
    }

    #[test]
    fn same_file_fragment_is_left_alone() {
        let mut files = manifest(vec![link("#setup", "", "#setup")]);
        let res = resolve_links(&mut files, &config(None), "/repo");
        let l = &files[0].links[0];
        assert_eq!(res.code, ReturnCode::Normal);
        assert_eq!(l.resolved_full_url.as_deref(), Some("#setup"));
        assert_eq!(l.resolved_relative_url.as_deref(), Some("#setup"));
        assert!(!l.needs_rewrite());
    }

    #[test]
    fn missing_target_uses_external_prefix() {
        let mut files = manifest(vec![link(
            "../../src/My App/main.rs#L10",
            "/Repo/src/My App/main.rs",
            "#L10",
        )]);
        let res = resolve_links(
            &mut files,
            &config(Some("https://github.com/org/repo/blob/main/")),
            "/repo",
        );
        assert_eq!(res.code, ReturnCode::Normal);
        assert_eq!(res.external, 1);
        let l = &files[0].links[0];
        assert_eq!(
            l.resolved_full_url.as_deref(),
            Some("https://github.com/org/repo/blob/main/src/My%20App/main.rs#L10")
        );
        assert_eq!(l.resolved_relative_url, None);
    }

    #[test]
    fn group_prefix_overrides_global() {
        let mut cfg = config(Some("https://global/"));
        cfg.content[0].external_file_prefix = Some("https://group".into());
        let mut files = manifest(vec![link("../x.cs", "/repo/docs/x.cs", "")]);
        resolve_links(&mut files, &cfg, "/repo");
        assert_eq!(
            files[0].links[0].resolved_full_url.as_deref(),
            Some("https://group/docs/x.cs")
        );
    }

    #[test]
    fn all_unresolved_links_are_collected() {
        let mut files = manifest(vec![
            link("../missing.md", "/repo/docs/missing.md", ""),
            link("../../../elsewhere.md", "/elsewhere.md", ""),
        ]);
        let res = resolve_links(&mut files, &config(None), "/repo");
        assert_eq!(res.code, ReturnCode::Error);
        assert_eq!(res.unresolved.len(), 2);
        assert_eq!(res.unresolved[0].line, 4);
        assert_eq!(res.unresolved[0].column, 7);
        assert_eq!(res.unresolved[0].reason, UnresolvedReason::NoExternalPrefix);
    }

    #[test]
    fn target_outside_working_folder_is_unresolved_even_with_prefix() {
        let mut files = manifest(vec![link("../../../elsewhere.md", "/elsewhere.md", "")]);
        let res = resolve_links(&mut files, &config(Some("https://repo/")), "/repo");
        assert_eq!(res.code, ReturnCode::Error);
        assert_eq!(res.unresolved[0].reason, UnresolvedReason::OutsideWorkingFolder);
    }

    #[test]
    fn resolution_is_idempotent() {
        let links = vec![link(
            "../../tools/system-copilot/docs/README.md",
            "/repo/tools/system-copilot/docs/README.md",
            "",
        )];
        let mut first = manifest(links.clone());
        let mut second = manifest(links);
        resolve_links(&mut first, &config(None), "/repo");
        resolve_links(&mut second, &config(None), "/repo");
        resolve_links(&mut second, &config(None), "/repo");
        assert_eq!(first, second);
    }

    #[test]
    fn relative_form_is_a_plain_path_that_joins_back() {
        let mut owner = FileRecord::new("/repo/docs/guide/a.md", "/out/guide/a.md", 0);
        owner.links = vec![
            link("../my%20page.md", "/repo/docs/my page.md", ""),
            link("café.md", "/repo/docs/guide/café.md", ""),
            link("file(1).md", "/repo/docs/guide/file(1).md", ""),
        ];
        let mut files = vec![
            owner,
            FileRecord::new("/repo/docs/my page.md", "/out/my page.md", 0),
            FileRecord::new("/repo/docs/guide/café.md", "/out/guide/café.md", 0),
            FileRecord::new("/repo/docs/guide/file(1).md", "/out/guide/file(1).md", 0),
        ];
        let res = resolve_links(&mut files, &config(None), "/repo");
        assert_eq!(res.internal, 3);

        let owner_dir = paths::parent(&files[0].destination_path);
        let relatives: Vec<_> = files[0]
            .links
            .iter()
            .map(|l| l.resolved_relative_url.as_deref().unwrap())
            .collect();
        assert_eq!(relatives, vec!["../my page.md", "café.md", "file(1).md"]);

        for (l, target) in files[0].links.iter().zip(&files[1..]) {
            let relative = l.resolved_relative_url.as_deref().unwrap();
            assert_eq!(paths::join(owner_dir, relative), target.destination_path);
            assert!(!l.needs_rewrite(), "{} would be rewritten", l.original_url);
        }
    }

    #[test]
    fn inventory_and_resolution_are_idempotent() {
        let catalog = MemoryCatalog::new()
            .with_file(
                "/repo/docs/guide/README.md",
                "[tool](../../tools/copilot/docs/README.md#usage) ![img](../images/a%20b.png)\n",
            )
            .with_file("/repo/docs/images/a b.png", "png")
            .with_file(
                "/repo/tools/copilot/docs/README.md",
                "[back](../../../docs/guide/README.md)\n",
            )
            .with_file("/repo/tools/copilot/src/lib.rs", "");
        let cfg = AssembleConfig {
            destination_folder: "/out".into(),
            url_replacements: vec![ReplacementRule::new("/[Dd]ocs/", "/")],
            content: vec![
                ContentGroup {
                    source_folder: "docs".into(),
                    destination_folder: Some("general".into()),
                    include_globs: vec!["**".into()],
                    ..ContentGroup::default()
                },
                ContentGroup {
                    source_folder: "tools".into(),
                    destination_folder: Some("general/tools".into()),
                    include_globs: vec!["**/docs/**".into()],
                    ..ContentGroup::default()
                },
            ],
            ..AssembleConfig::default()
        };

        let inventory_and_resolve = || {
            let mut inventory = build_inventory(&cfg, "/repo", "/out", &catalog).unwrap();
            let res = resolve_links(&mut inventory.files, &cfg, "/repo");
            assert_eq!(res.code, ReturnCode::Normal);
            inventory.files
        };
        let first = inventory_and_resolve();
        let mut second = inventory_and_resolve();

        assert_eq!(first.len(), 3);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.destination_path, b.destination_path);
            for (la, lb) in a.links.iter().zip(&b.links) {
                assert!(la.resolved_full_url.is_some());
                assert_eq!(la.resolved_full_url, lb.resolved_full_url);
                assert_eq!(la.resolved_relative_url, lb.resolved_relative_url);
            }
        }
        assert_eq!(first[1].destination_path, "/out/general/images/a b.png");
        assert_eq!(first[2].destination_path, "/out/general/tools/copilot/README.md");

        // Resolving an already resolved manifest changes nothing.
        resolve_links(&mut second, &cfg, "/repo");
        assert_eq!(first, second);
    }
}
