//! Lifecycle tests
//!
//! Walk a monorepo through a realistic sequence of edits, routing each
//! filesystem change through the event router, and check after every step
//! that the written configs agree with the registry.

use std::collections::BTreeSet;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use wsync_core::{EventRouter, FsEvent, FsEventKind, SyncContext, SyncOptions};
use wsync_fs::NormalizedPath;
use wsync_test_utils::{BuildInfoBuilder, TestMonorepo};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    repo: TestMonorepo,
    router: EventRouter,
}

impl Harness {
    async fn start(repo: TestMonorepo) -> Self {
        let ctx = SyncContext::new(repo.root(), SyncOptions::default()).unwrap();
        let router = EventRouter::new(Arc::new(ctx));
        router.start().await.unwrap();
        let harness = Self { repo, router };
        harness.assert_consistent();
        harness
    }

    async fn event(&self, kind: FsEventKind, relative: &str) {
        self.router
            .handle(FsEvent::new(kind, self.repo.path(relative)))
            .await
            .unwrap();
        self.assert_consistent();
    }

    /// Every matching workspace's references point exactly at the matching
    /// workspaces its manifest declares, and the root config references
    /// exactly the matching workspaces.
    fn assert_consistent(&self) {
        let registry = self.router.context().registry();
        let matching = registry.all_matching();

        for workspace in &matching {
            let name = registry.name(workspace).unwrap();
            let expected: BTreeSet<String> = registry
                .workspace_dependencies(name)
                .unwrap()
                .iter()
                .filter_map(|dep| registry.try_path(dep))
                .filter(|path| matching.contains(*path) && *path != workspace)
                .map(|path| path.relative_to(workspace).as_str().to_string())
                .collect();
            let config = format!("{}/tsconfig.json", workspace.as_str());
            let actual: BTreeSet<String> = self.repo.references(&config).into_iter().collect();
            assert_eq!(actual, expected, "references of {workspace}");
        }

        // The root config is left alone while synchronization is paused.
        if !registry.is_empty() && self.repo.path("tsconfig.json").exists() {
            let root: BTreeSet<String> =
                self.repo.references("tsconfig.json").into_iter().collect();
            let expected: BTreeSet<String> =
                matching.iter().map(|ws| ws.as_str().to_string()).collect();
            assert_eq!(root, expected, "root references");
        }
    }

    fn is_watched(&self, workspace: &str) -> bool {
        self.router
            .context()
            .registry()
            .is_watched(&NormalizedPath::new(workspace))
    }

    fn is_matching(&self, workspace: &str) -> bool {
        self.router
            .context()
            .registry()
            .has_all_requirements(&NormalizedPath::new(workspace))
    }
}

fn add_workspace(repo: &TestMonorepo, dir: &str, name: &str, deps: &[&str]) {
    repo.write_workspace(dir, name, deps);
    repo.write_workspace_config(dir);
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_growing_monorepo() {
    let repo = TestMonorepo::new();
    repo.write_root_manifest(&["packages/*"]);
    add_workspace(&repo, "packages/core", "core", &[]);
    let h = Harness::start(repo).await;
    assert_eq!(h.repo.references("tsconfig.json"), vec!["packages/core"]);

    // A new workspace appears: manifest first, then its config.
    h.repo.write_workspace("packages/api", "api", &["core"]);
    h.event(FsEventKind::Create, "packages/api/package.json").await;
    assert!(h.is_watched("packages/api"));
    assert!(!h.is_matching("packages/api"), "no config yet");

    h.repo.write_workspace_config("packages/api");
    h.event(FsEventKind::Create, "packages/api/tsconfig.json").await;
    assert!(h.is_matching("packages/api"));
    assert_eq!(h.repo.references("packages/api/tsconfig.json"), vec!["../core"]);

    // Compiling api reveals a dependency on a workspace added later.
    add_workspace(&h.repo, "packages/db", "db", &[]);
    h.event(FsEventKind::Create, "packages/db/tsconfig.json").await;
    assert!(h.is_matching("packages/db"));
    h.repo.write_build_info(
        "packages/api",
        &BuildInfoBuilder::new().file("../src/server.ts").reference(
            "../src/server.ts",
            &["../../core/src/index.ts", "../../db/src/index.ts"],
        ),
    );
    h.event(FsEventKind::Create, "packages/api/.ts/tsconfig.tsbuildinfo")
        .await;
    h.repo.assert_json_at(
        "packages/api/package.json",
        "/dependencies",
        &json!({ "core": "*", "db": "*" }),
    );
}

#[tokio::test]
async fn test_rename_and_remove() {
    let repo = TestMonorepo::new();
    repo.write_root_manifest(&["packages/*", "apps/*"]);
    add_workspace(&repo, "packages/core", "core", &[]);
    add_workspace(&repo, "packages/ui", "ui", &["core"]);
    add_workspace(&repo, "apps/web", "web", &["ui", "core"]);
    let h = Harness::start(repo).await;

    // Rename core; both dependents follow.
    h.repo.write_workspace("packages/core", "@acme/core", &[]);
    h.event(FsEventKind::Update, "packages/core/package.json").await;
    for dependent in ["packages/ui", "apps/web"] {
        let manifest = h.repo.read_json(&format!("{dependent}/package.json"));
        assert_eq!(manifest.pointer("/dependencies/@acme~1core"), Some(&json!("*")));
        assert_eq!(manifest.pointer("/dependencies/core"), None);
    }
    h.repo.assert_json_at(
        "apps/web/tsconfig.json",
        "/compilerOptions/paths/@acme~1core",
        &json!(["../../packages/core"]),
    );

    // Drop ui from the workspace globs.
    h.repo.write_root_manifest(&["packages/core", "apps/*"]);
    h.event(FsEventKind::Update, "package.json").await;
    assert_eq!(
        h.repo.references("apps/web/tsconfig.json"),
        vec!["../../packages/core"]
    );

    // Removing the core config unlinks it everywhere; restoring relinks.
    h.repo.remove("packages/core/tsconfig.json");
    h.event(FsEventKind::Delete, "packages/core/tsconfig.json").await;
    assert!(h.repo.references("apps/web/tsconfig.json").is_empty());

    h.repo.write_workspace_config("packages/core");
    h.event(FsEventKind::Create, "packages/core/tsconfig.json").await;
    assert_eq!(
        h.repo.references("apps/web/tsconfig.json"),
        vec!["../../packages/core"]
    );
}

#[tokio::test]
async fn test_duplicate_names() {
    let repo = TestMonorepo::new();
    repo.write_root_manifest(&["packages/*"]);
    add_workspace(&repo, "packages/one", "shared", &[]);
    add_workspace(&repo, "packages/user", "user", &["shared"]);
    let h = Harness::start(repo).await;
    assert_eq!(h.repo.references("packages/user/tsconfig.json"), vec!["../one"]);

    // A second workspace claims the same name and takes it over.
    add_workspace(&h.repo, "packages/two", "shared", &[]);
    h.event(FsEventKind::Update, "package.json").await;

    let registry = h.router.context().registry();
    assert_eq!(
        registry.path("shared").unwrap(),
        &NormalizedPath::new("packages/two")
    );
    assert_eq!(registry.try_name(&NormalizedPath::new("packages/one")), None);
}

#[tokio::test]
async fn test_pause_and_resume() {
    let repo = TestMonorepo::new();
    repo.write_root_manifest(&["packages/*"]);
    add_workspace(&repo, "packages/a", "a", &[]);
    add_workspace(&repo, "packages/b", "b", &["a"]);
    let h = Harness::start(repo).await;

    h.repo.remove("package.json");
    h.event(FsEventKind::Delete, "package.json").await;
    assert!(h.router.context().registry().is_empty());

    // Edits while paused are not acted on.
    h.repo.write_workspace("packages/b", "b", &[]);
    h.event(FsEventKind::Update, "packages/b/package.json").await;
    assert_eq!(h.repo.references("packages/b/tsconfig.json"), vec!["../a"]);

    h.repo.write_root_manifest(&["packages/*"]);
    h.event(FsEventKind::Create, "package.json").await;
    assert!(h.repo.references("packages/b/tsconfig.json").is_empty());
}
