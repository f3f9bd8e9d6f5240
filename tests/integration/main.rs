//! Integration tests for weft

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LOCAL_CONFIG: &str = r#"
[pipeline]
cache_dir = ".weft-cache"
exclude_paths = ["vendor"]

[extensions]
enabled = ["strip-debug-asserts"]
"#;

/// Project with a local weft.toml, a transformable module and an excluded one
fn project() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("net")).unwrap();
    fs::create_dir_all(root.join("vendor")).unwrap();
    fs::write(root.join("weft.toml"), LOCAL_CONFIG).unwrap();
    fs::write(
        root.join("app.rs"),
        "fn run() { debug_assert!(ready()); go(); }",
    )
    .unwrap();
    fs::write(root.join("net/tcp.rs"), "pub fn connect() {}").unwrap();
    fs::write(root.join("vendor/dep.rs"), "fn dep() { debug_assert!(x); }").unwrap();
    fs::write(root.join("broken.rs"), "fn broken( {").unwrap();
    (temp, root)
}

fn cache_dir(root: &Path) -> PathBuf {
    root.join(".weft-cache")
}

mod cli_tests {
    use super::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn weft(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("weft");
        cmd.current_dir(dir).env_remove("WEFT_CONFIG");
        cmd
    }

    #[test]
    fn help_displays() {
        let (_temp, root) = project();
        weft(&root)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Load-time source transformation"));
    }

    #[test]
    fn version_displays() {
        let (_temp, root) = project();
        weft(&root)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("weft"));
    }

    #[test]
    fn config_show_uses_local_config() {
        let (_temp, root) = project();
        weft(&root)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[pipeline]"))
            .stdout(predicate::str::contains(".weft-cache"));
    }

    #[test]
    fn config_path_finds_ancestor() {
        let (_temp, root) = project();
        weft(&root.join("net"))
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("weft.toml"));
    }

    #[test]
    fn resolve_defers_eligible_module() {
        let (_temp, root) = project();
        weft(&root)
            .args(["resolve", "app"])
            .assert()
            .success()
            .stdout(predicate::str::contains("transform://"));
    }

    #[test]
    fn resolve_passes_excluded_module_through() {
        let (_temp, root) = project();
        weft(&root)
            .args(["resolve", "vendor::dep"])
            .assert()
            .success()
            .stdout(predicate::str::contains("original"))
            .stdout(predicate::str::contains("transform://").not());
    }

    #[test]
    fn resolve_missing_module_fails() {
        let (_temp, root) = project();
        weft(&root)
            .args(["resolve", "net::udp"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Module not found"));
    }

    #[test]
    fn load_transforms_and_caches() {
        let (_temp, root) = project();
        weft(&root)
            .args(["load", "app"])
            .assert()
            .success()
            .stdout(predicate::str::contains("fn run"))
            .stdout(predicate::str::contains("debug_assert").not());

        let cached = fs::read_to_string(cache_dir(&root).join("app.rs")).unwrap();
        assert!(!cached.contains("debug_assert"));
        assert!(cache_dir(&root).join("_file.path.cache.json").is_file());
    }

    #[test]
    fn load_excluded_module_is_untouched() {
        let (_temp, root) = project();
        weft(&root)
            .args(["load", "vendor::dep"])
            .assert()
            .success()
            .stdout(predicate::str::contains("debug_assert"));
        assert!(!cache_dir(&root).join("vendor/dep.rs").exists());
    }

    #[test]
    fn load_syntax_error_fails() {
        let (_temp, root) = project();
        weft(&root)
            .args(["load", "broken"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Syntax error"));
    }

    #[test]
    fn production_serves_cached_copy() {
        let (_temp, root) = project();
        weft(&root).args(["load", "app"]).assert().success();

        weft(&root)
            .args(["--production", "resolve", "app"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cached"))
            .stdout(predicate::str::contains(".weft-cache"));

        // Modules never transformed still go through the pipeline
        weft(&root)
            .args(["--production", "resolve", "net::tcp"])
            .assert()
            .success()
            .stdout(predicate::str::contains("transform://"));
    }

    #[test]
    fn cache_show_marks_stale_records() {
        let (_temp, root) = project();
        weft(&root).args(["load", "app"]).assert().success();

        weft(&root)
            .args(["cache", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("app.rs"))
            .stdout(predicate::str::contains("fresh"));

        fs::write(root.join("app.rs"), "fn run() {}").unwrap();
        weft(&root)
            .args(["cache", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("stale"));
    }

    #[test]
    fn cache_show_json() {
        let (_temp, root) = project();
        weft(&root).args(["load", "app"]).assert().success();

        weft(&root)
            .args(["cache", "show", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"source_hash\""));
    }

    #[test]
    fn cache_path_maps_into_cache_dir() {
        let (_temp, root) = project();
        weft(&root)
            .args(["cache", "path", "net/tcp.rs"])
            .assert()
            .success()
            .stdout(predicate::str::contains(".weft-cache"));
    }
}

mod pipeline_tests {
    use super::*;
    use std::sync::Arc;
    use weft::cache::{CacheStore, CACHE_STATE_FILE};
    use weft::config::Config;
    use weft::hook::{DirectoryResolver, LoaderRegistry, ResolvedModule};
    use weft::PipelineContext;

    fn config(cache: bool) -> Config {
        let mut config = Config::default();
        if cache {
            config.pipeline.cache_dir = Some(PathBuf::from(".weft-cache"));
        }
        config.pipeline.exclude_paths = vec![PathBuf::from("vendor")];
        config.extensions.enabled = vec!["strip-debug-asserts".to_string()];
        config
    }

    fn activate(root: &Path, config: &Config, production: bool) -> LoaderRegistry {
        let context = Arc::new(PipelineContext::from_config(config, root).unwrap());
        let mut registry = LoaderRegistry::new();
        registry.register_resolver(DirectoryResolver::new(root, "rs"));
        registry.activate(context, production).unwrap();
        registry
    }

    fn load_and_flush(root: &Path, config: &Config, module: &str) -> String {
        let context = Arc::new(PipelineContext::from_config(config, root).unwrap());
        let mut registry = LoaderRegistry::new();
        registry.register_resolver(DirectoryResolver::new(root, "rs"));
        registry.activate(Arc::clone(&context), false).unwrap();

        let guard = context.flush_on_exit();
        let content = registry.load(module).unwrap().unwrap();
        guard.finish().unwrap();
        String::from_utf8(content).unwrap()
    }

    #[test]
    fn cache_survives_reopen() {
        let (_temp, root) = project();
        let config = config(true);
        let first = load_and_flush(&root, &config, "app");
        let state_before = fs::read_to_string(cache_dir(&root).join(CACHE_STATE_FILE)).unwrap();

        // Reopening and flushing without changes keeps the state intact
        let mut store = CacheStore::open(&root, Some(cache_dir(&root))).unwrap();
        store.flush_cache_state().unwrap();
        let state_after = fs::read_to_string(cache_dir(&root).join(CACHE_STATE_FILE)).unwrap();
        assert_eq!(state_before, state_after);

        let record = store.query_cache_state(&root.join("app.rs")).unwrap();
        assert_eq!(record.cache_uri, Some(cache_dir(&root).join("app.rs")));
        assert_eq!(fs::read_to_string(cache_dir(&root).join("app.rs")).unwrap(), first);
    }

    #[test]
    fn state_file_is_portable() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();
        let (_project, original) = project();
        let first = base.join("first");
        fs::create_dir_all(&first).unwrap();
        for name in ["app.rs", "weft.toml"] {
            fs::copy(original.join(name), first.join(name)).unwrap();
        }

        load_and_flush(&first, &config(true), "app");
        let state = fs::read_to_string(cache_dir(&first).join(CACHE_STATE_FILE)).unwrap();
        assert!(!state.contains(base.to_str().unwrap()));

        let moved = base.join("moved");
        fs::rename(&first, &moved).unwrap();

        let store = CacheStore::open(&moved, Some(cache_dir(&moved))).unwrap();
        let record = store.query_cache_state(&moved.join("app.rs")).unwrap();
        assert_eq!(record.source_path, moved.join("app.rs"));
        assert_eq!(record.cache_uri, Some(cache_dir(&moved).join("app.rs")));
    }

    #[test]
    fn production_and_development_resolution() {
        let (_temp, root) = project();
        let config = config(true);
        load_and_flush(&root, &config, "app");

        let development = activate(&root, &config, false);
        assert_eq!(
            development.resolve("app"),
            Some(ResolvedModule::Deferred(root.join("app.rs")))
        );

        let production = activate(&root, &config, true);
        assert_eq!(
            production.resolve("app"),
            Some(ResolvedModule::Cached {
                source: root.join("app.rs"),
                cache_uri: cache_dir(&root).join("app.rs"),
            })
        );
        let served = String::from_utf8(production.load("app").unwrap().unwrap()).unwrap();
        assert!(!served.contains("debug_assert"));
    }

    #[test]
    fn disabled_cache_still_transforms() {
        let (_temp, root) = project();
        let config = config(false);

        let loaded = load_and_flush(&root, &config, "app");
        assert!(!loaded.contains("debug_assert"));
        assert!(!cache_dir(&root).exists());

        let production = activate(&root, &config, true);
        assert_eq!(
            production.resolve("app"),
            Some(ResolvedModule::Deferred(root.join("app.rs")))
        );
    }

    #[test]
    fn transform_is_deterministic() {
        let (_temp, root) = project();
        let config = config(false);
        let first = load_and_flush(&root, &config, "app");
        let second = load_and_flush(&root, &config, "app");
        assert_eq!(first, second);
    }
}
