//! End-to-end integration test for the vertical slice
//!
//! Exercises the complete flow: doctor repair -> startup scan -> artifact
//! event -> manifest and config rewrite.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use wsync_core::{
    CheckStatus, Doctor, DoctorOptions, EventRouter, FsEvent, FsEventKind, SyncContext,
    SyncOptions,
};
use wsync_test_utils::{BuildInfoBuilder, TestMonorepo};

/// A fresh monorepo with three workspaces and no compiler configs.
fn setup_monorepo() -> TestMonorepo {
    let repo = TestMonorepo::new();
    repo.write_root_manifest(&["packages/*", "apps/*"]);
    repo.write_workspace("packages/core", "@acme/core", &[]);
    repo.write_workspace("packages/ui", "@acme/ui", &["@acme/core", "react"]);
    repo.write_workspace("apps/web", "web", &["@acme/ui"]);
    repo
}

#[tokio::test]
async fn test_doctor_then_watch() {
    let repo = setup_monorepo();

    // Repair the monorepo in one shot.
    let ctx = SyncContext::new(repo.root(), SyncOptions::default()).unwrap();
    let options = DoctorOptions {
        fix: true,
        ..DoctorOptions::default()
    };
    let report = Doctor::new(&ctx, options).run().await.unwrap();
    assert!(report.is_healthy(), "{report:#?}");
    assert!(report.count(CheckStatus::Fixed) > 0);

    assert_eq!(repo.references("packages/ui/tsconfig.json"), vec!["../core"]);
    assert_eq!(repo.references("apps/web/tsconfig.json"), vec!["../../packages/ui"]);
    repo.assert_json_at(
        "apps/web/tsconfig.json",
        "/compilerOptions/paths/@acme~1ui",
        &json!(["../../packages/ui"]),
    );
    assert_eq!(
        repo.references("tsconfig.json"),
        vec!["apps/web", "packages/core", "packages/ui"]
    );

    // Start watching from the repaired state; nothing should change.
    let web_config = repo.read_text("apps/web/tsconfig.json");
    let router = EventRouter::new(Arc::new(
        SyncContext::new(repo.root(), SyncOptions::default()).unwrap(),
    ));
    router.start().await.unwrap();
    assert_eq!(repo.read_text("apps/web/tsconfig.json"), web_config);

    // The compiler reports that web also imports core directly.
    repo.write_build_info(
        "apps/web",
        &BuildInfoBuilder::new().file("../src/main.tsx").reference(
            "../src/main.tsx",
            &[
                "../../../packages/ui/src/index.ts",
                "../../../packages/core/src/index.ts",
            ],
        ),
    );
    router
        .handle(FsEvent::new(
            FsEventKind::Create,
            repo.path("apps/web/.ts/tsconfig.tsbuildinfo"),
        ))
        .await
        .unwrap();

    repo.assert_json_at(
        "apps/web/package.json",
        "/dependencies",
        &json!({ "@acme/core": "*", "@acme/ui": "*" }),
    );
    assert_eq!(
        repo.references("apps/web/tsconfig.json"),
        vec!["../../packages/ui", "../../packages/core"]
    );
}

#[tokio::test]
async fn test_external_dependencies_are_untouched() {
    let repo = setup_monorepo();
    let router = EventRouter::new(Arc::new(
        SyncContext::new(repo.root(), SyncOptions::default()).unwrap(),
    ));
    repo.write_workspace_config("packages/core");
    repo.write_workspace_config("packages/ui");
    repo.write_build_info(
        "packages/ui",
        &BuildInfoBuilder::new().file("../src/index.ts").reference(
            "../src/index.ts",
            &[
                "../../core/src/index.ts",
                "../../../node_modules/react/index.d.ts",
            ],
        ),
    );

    router.start().await.unwrap();

    repo.assert_json_at(
        "packages/ui/package.json",
        "/dependencies",
        &json!({ "@acme/core": "*", "react": "*" }),
    );
    assert_eq!(repo.references("packages/ui/tsconfig.json"), vec!["../core"]);
}
