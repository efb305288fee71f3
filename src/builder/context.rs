//! Build context: the environment channel to the runtime crate.
//!
//! The runtime manifest's build script reads the project configuration from
//! environment variables. The names and encodings here are a stable contract:
//! booleans are `0`/`1` and lists are joined with [`LIST_SEPARATOR`].

use std::collections::BTreeMap;
use std::path::Path;

use uuid::Uuid;

use crate::core::platform::TargetPlatform;
use crate::core::project::ProjectDescriptor;

/// Separator for list-valued variables.
pub const LIST_SEPARATOR: &str = ";";

/// Variable prefix for everything the runtime reads.
pub const ENV_PREFIX: &str = "SHIPWRIGHT_";

/// Typed set of variables exported to the compiler process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildContext {
    vars: BTreeMap<String, String>,
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn path_str(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}

impl BuildContext {
    /// Build the context for one target.
    ///
    /// `build_id` must be fresh for every build; the runtime reinstalls
    /// when it sees an id it has not installed before.
    pub fn new(
        project: &ProjectDescriptor,
        target: &TargetPlatform,
        release_name: &str,
        build_id: Uuid,
    ) -> Self {
        let mut ctx = BuildContext::default();

        ctx.set("PROJECT", project.build_json(target, build_id));
        ctx.set("BUILD_ID", build_id.to_string());

        let app = &project.app;
        ctx.set("APP_NAME", &app.name);
        ctx.set("APP_AUTHOR", &app.author);
        ctx.set("APP_VERSION", &app.version);
        ctx.set("APP_ABOUT", &app.about);
        ctx.set("APP_ICON", path_str(app.icon.as_deref()));
        ctx.set("KEEP_OPEN", flag(app.keep_open));

        let deps = &project.dependencies;
        ctx.set("DEPS_WHEELS", deps.wheels.join(LIST_SEPARATOR));
        ctx.set("DEPS_PYPI", deps.pypi.join(LIST_SEPARATOR));
        ctx.set("DEPS_REQTXT", path_str(deps.requirements.as_deref()));
        ctx.set("DEPS_ROLLING", flag(deps.rolling));

        ctx.set("COMMON_DIR", &project.directories.common);
        ctx.set("VERSIONS_DIR", &project.directories.versions);

        ctx.set("PYTHON_VERSION", &project.python.version);
        ctx.set("PYTHON_BUNDLE", flag(project.python.bundle));
        ctx.set("UV_VERSION", &project.uv.version);
        ctx.set("UV_BUNDLE", flag(project.uv.bundle));
        ctx.set("TORCH_VERSION", &project.torch.version);
        ctx.set("TORCH_BACKEND", &project.torch.backend);

        match project.entry.resolve() {
            Some(entry) => {
                ctx.set("ENTRY_KIND", entry.kind());
                ctx.set("ENTRY_VALUE", entry.value());
            }
            None => {
                ctx.set("ENTRY_KIND", "");
                ctx.set("ENTRY_VALUE", "");
            }
        }

        ctx.set("STANDALONE", flag(project.release.standalone));
        ctx.set("TARGET_OS", target.os().as_str());
        ctx.set("TARGET_ARCH", target.arch().as_str());
        ctx.set("TARGET_TRIPLE", target.triple());

        // Windows version resource, read by the runtime's resource compiler
        ctx.vars.insert("ProductName".to_string(), app.name.clone());
        ctx.vars.insert("CompanyName".to_string(), app.author.clone());
        ctx.vars.insert("FileVersion".to_string(), app.version.clone());
        ctx.vars.insert("FileDescription".to_string(), app.about.clone());
        ctx.vars
            .insert("OriginalFilename".to_string(), release_name.to_string());

        ctx
    }

    fn set(&mut self, key: &str, value: impl Into<String>) {
        self.vars.insert(format!("{}{}", ENV_PREFIX, key), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// Variables in a stable order.
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{resolve, Abi, Arch, Os};
    use crate::core::project::TargetSpec;
    use std::path::PathBuf;

    fn demo() -> ProjectDescriptor {
        let mut project = ProjectDescriptor::default();
        project.app.name = "Demo".to_string();
        project.app.version = "1.2.3".to_string();
        project.dependencies.pypi = vec!["numpy>=2".to_string(), "rich".to_string()];
        project.dependencies.wheels = vec!["/w/a.whl".to_string(), "/w/b.whl".to_string()];
        project.entry.module = Some("demo".to_string());
        project.entry.command = Some("demo --help".to_string());
        project
    }

    #[test]
    fn test_lists_use_semicolon() {
        let target = resolve(Os::Linux, Arch::Amd64, None).unwrap();
        let ctx = BuildContext::new(&demo(), &target, "demo-linux-amd64-v1.2.3", Uuid::nil());

        assert_eq!(ctx.get("SHIPWRIGHT_DEPS_PYPI"), Some("numpy>=2;rich"));
        assert_eq!(ctx.get("SHIPWRIGHT_DEPS_WHEELS"), Some("/w/a.whl;/w/b.whl"));
    }

    #[test]
    fn test_entry_and_flags() {
        let target = resolve(Os::Linux, Arch::Amd64, None).unwrap();
        let ctx = BuildContext::new(&demo(), &target, "demo-linux-amd64-v1.2.3", Uuid::nil());

        assert_eq!(ctx.get("SHIPWRIGHT_ENTRY_KIND"), Some("module"));
        assert_eq!(ctx.get("SHIPWRIGHT_ENTRY_VALUE"), Some("demo"));
        assert_eq!(ctx.get("SHIPWRIGHT_KEEP_OPEN"), Some("0"));
        assert_eq!(ctx.get("SHIPWRIGHT_STANDALONE"), Some("0"));
        assert_eq!(ctx.get("SHIPWRIGHT_DEPS_REQTXT"), Some(""));
    }

    #[test]
    fn test_target_and_resource_metadata() {
        let mut project = demo();
        project.app.icon = Some(PathBuf::from("/icons/demo.ico"));
        let target = resolve(Os::Windows, Arch::Arm64, None).unwrap();
        let ctx = BuildContext::new(&project, &target, "demo-windows-arm64-v1.2.3.exe", Uuid::nil());

        assert_eq!(ctx.get("SHIPWRIGHT_TARGET_OS"), Some("windows"));
        assert_eq!(ctx.get("SHIPWRIGHT_TARGET_ARCH"), Some("arm64"));
        assert_eq!(
            ctx.get("SHIPWRIGHT_TARGET_TRIPLE"),
            Some("aarch64-pc-windows-gnullvm")
        );
        assert_eq!(ctx.get("SHIPWRIGHT_APP_ICON"), Some("/icons/demo.ico"));
        assert_eq!(ctx.get("FileVersion"), Some("1.2.3"));
        assert_eq!(
            ctx.get("OriginalFilename"),
            Some("demo-windows-arm64-v1.2.3.exe")
        );
    }

    #[test]
    fn test_project_json_round_trips() {
        let target = resolve(Os::Linux, Arch::Amd64, None).unwrap();
        let project = demo();
        let ctx = BuildContext::new(&project, &target, "x", Uuid::nil());

        let json = ctx.get("SHIPWRIGHT_PROJECT").unwrap();
        let parsed: ProjectDescriptor = serde_json::from_str(json).unwrap();

        let mut expected = project;
        expected.release.target = TargetSpec::resolved(&target);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_project_json_carries_build_id_and_target() {
        let target = resolve(Os::Windows, Arch::Amd64, Some(Abi::Msvc)).unwrap();
        let build_id = Uuid::new_v4();
        let ctx = BuildContext::new(&demo(), &target, "x", build_id);

        let json: serde_json::Value =
            serde_json::from_str(ctx.get("SHIPWRIGHT_PROJECT").unwrap()).unwrap();
        assert_eq!(json["uuid"], build_id.to_string());
        assert_eq!(json["release"]["target"]["os"], "windows");
        assert_eq!(json["release"]["target"]["abi"], "msvc");
        assert_eq!(json["release"]["target"]["triple"], "x86_64-pc-windows-msvc");
        assert_eq!(ctx.get("SHIPWRIGHT_BUILD_ID"), Some(build_id.to_string().as_str()));
    }

    #[test]
    fn test_build_ids_differ_between_builds() {
        let target = resolve(Os::Linux, Arch::Amd64, None).unwrap();
        let first = BuildContext::new(&demo(), &target, "x", Uuid::new_v4());
        let second = BuildContext::new(&demo(), &target, "x", Uuid::new_v4());
        assert_ne!(
            first.get("SHIPWRIGHT_PROJECT"),
            second.get("SHIPWRIGHT_PROJECT")
        );
    }
}
